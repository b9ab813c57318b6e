//! Gateway response contracts.
//!
//! A Deny on the legacy contract is always an explicit `Deny` statement for the
//! requested resource, never an empty statement list.
use serde::Serialize;

use crate::services::policy::Decision;

pub const POLICY_VERSION: &str = "2012-10-17";
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Which gateway integration invoked the authorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayContract {
    // REST API authorizer: full IAM policy document per request.
    Legacy,
    // HTTP API authorizer: `{ "isAuthorized": bool }`.
    Simple,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AuthorizationResponse {
    Legacy(IamPolicyResponse),
    Simple(SimpleResponse),
}

impl AuthorizationResponse {
    pub fn is_authorized(&self) -> bool {
        match self {
            Self::Legacy(doc) => {
                let statement = &doc.policy_document.statement;
                !statement.is_empty() && statement.iter().all(|s| s.effect == Effect::Allow)
            }
            Self::Simple(simple) => simple.is_authorized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IamPolicyResponse {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub action: Vec<String>,
    pub effect: Effect,
    pub resource: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleResponse {
    pub is_authorized: bool,
}

/// Map a decision onto the wire shape of `contract`. Pure; never evaluates anything.
pub fn adapt(
    decision: Decision,
    contract: GatewayContract,
    principal_id: &str,
    resource: &str,
) -> AuthorizationResponse {
    match contract {
        GatewayContract::Simple => AuthorizationResponse::Simple(SimpleResponse {
            is_authorized: decision.is_allow(),
        }),
        GatewayContract::Legacy => {
            let effect = match decision {
                Decision::Allow => Effect::Allow,
                Decision::Deny => Effect::Deny,
            };
            AuthorizationResponse::Legacy(IamPolicyResponse {
                principal_id: principal_id.to_string(),
                policy_document: PolicyDocument {
                    version: POLICY_VERSION.to_string(),
                    statement: vec![Statement {
                        action: vec![INVOKE_ACTION.to_string()],
                        effect,
                        resource: vec![resource.to_string()],
                    }],
                },
            })
        }
    }
}
