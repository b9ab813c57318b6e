//! Combines token validation with the policy verdict.
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::evaluator::PolicyContext;
use super::input::PolicyInput;
use crate::services::token::{FailureKind, ValidationOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// The policy produced something other than one boolean. This is a broken
/// policy or configuration, not an untrusted caller, so it is not a Deny.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("policy evaluation error: {0}")]
pub struct DecisionError(pub String);

impl DecisionError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::PolicyEvaluationError
    }
}

/// Decide a request.
///
/// An invalid token is a Deny and the evaluator is never called. Otherwise the
/// configured query must produce exactly one result set holding exactly one
/// boolean.
///
/// # Errors
/// `DecisionError` when evaluation fails or its result is not a single boolean.
pub fn decide(
    outcome: &ValidationOutcome,
    input: &PolicyInput,
    policy: &PolicyContext,
) -> Result<Decision, DecisionError> {
    if let Err(err) = outcome {
        debug!(kind = err.kind().as_str(), "invalid token, skipping policy evaluation");
        return Ok(Decision::Deny);
    }

    let results = policy
        .evaluator()
        .evaluate(policy.query(), input)
        .map_err(|e| DecisionError(e.to_string()))?;

    let value = match results.as_slice() {
        [set] => match set.expressions.as_slice() {
            [value] => value,
            other => {
                return Err(DecisionError(format!(
                    "query {} returned {} expressions, expected 1",
                    policy.query(),
                    other.len()
                )));
            }
        },
        [] => {
            return Err(DecisionError(format!(
                "query {} returned no results",
                policy.query()
            )));
        }
        other => {
            return Err(DecisionError(format!(
                "query {} returned {} result sets, expected 1",
                policy.query(),
                other.len()
            )));
        }
    };

    match value {
        Value::Bool(true) => Ok(Decision::Allow),
        Value::Bool(false) => Ok(Decision::Deny),
        other => Err(DecisionError(format!(
            "query {} returned non-boolean value {}",
            policy.query(),
            other
        ))),
    }
}
