/*
 * Responsibility
 * - API Gateway authorizer event DTOs (REST payload 1.0, HTTP API payload 2.0)
 * - Unpack each into (authorization header, method, path, resource)
 */
use std::collections::HashMap;

use serde::Deserialize;

fn header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// REST API Lambda authorizer event, `TOKEN` or `REQUEST` type.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApiAuthorizerEvent {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub method_arn: String,
    // TOKEN authorizers carry the header value here.
    #[serde(default)]
    pub authorization_token: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl RestApiAuthorizerEvent {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.method_arn.trim().is_empty() {
            return Err("methodArn is required");
        }
        Ok(())
    }

    pub fn authorization(&self) -> Option<&str> {
        self.authorization_token
            .as_deref()
            .or_else(|| header(&self.headers, "authorization"))
    }

    /// Method and path from the event, falling back to the method ARN (TOKEN events).
    pub fn method_and_path(&self) -> (String, String) {
        let (arn_method, arn_path) = method_and_path_from_arn(&self.method_arn);
        (
            self.http_method.clone().unwrap_or(arn_method),
            self.path.clone().unwrap_or(arn_path),
        )
    }
}

/// `arn:aws:execute-api:{region}:{account}:{api}/{stage}/{METHOD}/{path...}`
pub fn method_and_path_from_arn(arn: &str) -> (String, String) {
    let resource = arn.rsplit(':').next().unwrap_or_default();
    let mut parts = resource.splitn(4, '/');
    let _api = parts.next();
    let _stage = parts.next();
    let method = parts.next().unwrap_or_default().to_string();
    let path = format!("/{}", parts.next().unwrap_or_default());
    (method, path)
}

/// HTTP API Lambda authorizer event, payload format 2.0.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiAuthorizerEvent {
    #[serde(default)]
    pub version: Option<String>,
    pub route_arn: String,
    #[serde(default)]
    pub identity_source: Vec<String>,
    #[serde(default)]
    pub raw_path: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub request_context: HttpApiRequestContext,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiRequestContext {
    #[serde(default)]
    pub http: HttpDescription,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpDescription {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
}

impl HttpApiAuthorizerEvent {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.route_arn.trim().is_empty() {
            return Err("routeArn is required");
        }
        if let Some(version) = &self.version
            && version != "2.0"
        {
            return Err("unsupported payload version (expected 2.0)");
        }
        Ok(())
    }

    pub fn authorization(&self) -> Option<&str> {
        header(&self.headers, "authorization")
            .or_else(|| self.identity_source.first().map(String::as_str))
    }

    pub fn method(&self) -> &str {
        &self.request_context.http.method
    }

    pub fn path(&self) -> &str {
        let path = self.request_context.http.path.as_str();
        if path.is_empty() {
            self.raw_path.as_deref().unwrap_or_default()
        } else {
            path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_request_event_reads_headers_case_insensitively() {
        let event: RestApiAuthorizerEvent = serde_json::from_value(serde_json::json!({
            "type": "REQUEST",
            "methodArn": "arn:aws:execute-api:us-east-1:123456789012:abc/prod/GET/google",
            "path": "/google",
            "httpMethod": "GET",
            "headers": {"authorization": "Bearer a.b.c"}
        }))
        .unwrap();

        assert!(event.validate().is_ok());
        assert_eq!(event.authorization(), Some("Bearer a.b.c"));
        assert_eq!(event.method_and_path(), ("GET".into(), "/google".into()));
    }

    #[test]
    fn rest_token_event_takes_method_and_path_from_arn() {
        let event: RestApiAuthorizerEvent = serde_json::from_value(serde_json::json!({
            "type": "TOKEN",
            "authorizationToken": "Bearer a.b.c",
            "methodArn": "arn:aws:execute-api:us-east-1:123456789012:abc/prod/POST/pets/42"
        }))
        .unwrap();

        assert_eq!(event.authorization(), Some("Bearer a.b.c"));
        assert_eq!(event.method_and_path(), ("POST".into(), "/pets/42".into()));
    }

    #[test]
    fn http_api_event_falls_back_to_identity_source() {
        let event: HttpApiAuthorizerEvent = serde_json::from_value(serde_json::json!({
            "version": "2.0",
            "type": "REQUEST",
            "routeArn": "arn:aws:execute-api:us-east-1:123456789012:abc/$default/GET/bing",
            "identitySource": ["Bearer x.y.z"],
            "rawPath": "/bing",
            "requestContext": {"http": {"method": "GET", "path": ""}}
        }))
        .unwrap();

        assert!(event.validate().is_ok());
        assert_eq!(event.authorization(), Some("Bearer x.y.z"));
        assert_eq!(event.method(), "GET");
        assert_eq!(event.path(), "/bing");
    }

    #[test]
    fn http_api_event_rejects_other_versions() {
        let event: HttpApiAuthorizerEvent = serde_json::from_value(serde_json::json!({
            "version": "1.0",
            "routeArn": "arn"
        }))
        .unwrap();

        assert!(event.validate().is_err());
    }
}
