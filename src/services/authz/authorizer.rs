use std::fmt;

use tracing::{info, warn};

use super::bearer::bearer_token;
use super::response::{AuthorizationResponse, GatewayContract, adapt};
use crate::services::jwks::KeySetCache;
use crate::services::policy::{Decision, DecisionError, PolicyContext, PolicyInput, decide};
use crate::services::token::{FailureKind, TokenValidator};

/// Principal reported on the legacy contract when the token carries no subject.
pub const UNKNOWN_PRINCIPAL: &str = "unknown";

/// One inbound request, already unpacked from the gateway event.
#[derive(Clone, Copy)]
pub struct AuthorizationRequest<'a> {
    pub authorization: Option<&'a str>,
    pub method: &'a str,
    pub path: &'a str,
    // Method/route ARN the legacy document grants or denies.
    pub resource: &'a str,
    pub contract: GatewayContract,
}

impl fmt::Debug for AuthorizationRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the credential
        f.debug_struct("AuthorizationRequest")
            .field("has_authorization", &self.authorization.is_some())
            .field("method", &self.method)
            .field("path", &self.path)
            .field("resource", &self.resource)
            .field("contract", &self.contract)
            .finish()
    }
}

/// Token validation AND policy evaluation, shaped for the calling gateway.
pub struct Authorizer {
    keys: KeySetCache,
    validator: TokenValidator,
    policy: PolicyContext,
    issuer: String,
    audience: Option<String>,
}

impl fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("keys", &self.keys)
            .field("validator", &self.validator)
            .field("policy", &self.policy)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl Authorizer {
    pub fn new(
        keys: KeySetCache,
        validator: TokenValidator,
        policy: PolicyContext,
        issuer: impl Into<String>,
        audience: Option<String>,
    ) -> Self {
        Self {
            keys,
            validator,
            policy,
            issuer: issuer.into(),
            audience,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn keys(&self) -> &KeySetCache {
        &self.keys
    }

    /// Decide one request.
    ///
    /// Untrusted or malformed credentials and key fetch failures produce a
    /// well-formed negative response.
    ///
    /// # Errors
    /// `DecisionError` only when the policy itself is broken.
    pub async fn authorize(
        &self,
        request: AuthorizationRequest<'_>,
    ) -> Result<AuthorizationResponse, DecisionError> {
        let deny = || adapt(Decision::Deny, request.contract, UNKNOWN_PRINCIPAL, request.resource);

        let token = match bearer_token(request.authorization) {
            Ok(token) => token,
            Err(err) => {
                info!(
                    kind = err.kind().as_str(),
                    reason = %err,
                    method = request.method,
                    path = request.path,
                    "request denied"
                );
                return Ok(deny());
            }
        };

        let keys = match self.keys.get(&self.issuer).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(
                    kind = FailureKind::FetchFailed.as_str(),
                    error = %err,
                    method = request.method,
                    path = request.path,
                    "request denied"
                );
                return Ok(deny());
            }
        };

        let outcome =
            self.validator
                .validate(&token, &keys, &self.issuer, self.audience.as_deref());
        if let Err(err) = &outcome {
            info!(
                kind = err.kind().as_str(),
                reason = %err,
                method = request.method,
                path = request.path,
                "token rejected"
            );
        }

        let principal = outcome
            .as_ref()
            .ok()
            .and_then(|claims| claims.subject())
            .unwrap_or(UNKNOWN_PRINCIPAL)
            .to_string();

        let input = PolicyInput::build(&token, request.method, request.path);
        let decision = decide(&outcome, &input, &self.policy).inspect_err(|err| {
            warn!(
                kind = err.kind().as_str(),
                error = %err,
                query = self.policy.query(),
                "policy evaluation failed"
            );
        })?;

        info!(
            decision = ?decision,
            principal = %principal,
            method = request.method,
            path = request.path,
            "authorization decided"
        );

        Ok(adapt(decision, request.contract, &principal, request.resource))
    }
}
