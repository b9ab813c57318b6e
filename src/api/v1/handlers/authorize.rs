/*
 * Responsibility
 * - Unpack the gateway event and run the Authorizer
 * - REST API  -> IAM policy document
 * - HTTP API  -> { "isAuthorized": bool }
 * - Every denial is a 200 with a negative body; only a broken policy is a 500
 */
use axum::{Json, extract::State};

use crate::api::v1::dto::events::{HttpApiAuthorizerEvent, RestApiAuthorizerEvent};
use crate::error::AppError;
use crate::services::authz::{AuthorizationRequest, AuthorizationResponse, GatewayContract};
use crate::state::AppState;

pub async fn authorize_rest_api(
    State(state): State<AppState>,
    Json(event): Json<RestApiAuthorizerEvent>,
) -> Result<Json<AuthorizationResponse>, AppError> {
    event
        .validate()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;

    let (method, path) = event.method_and_path();
    tracing::debug!(kind = ?event.kind, method = %method, path = %path, "rest api authorizer event");

    let response = state
        .authorizer
        .authorize(AuthorizationRequest {
            authorization: event.authorization(),
            method: &method,
            path: &path,
            resource: &event.method_arn,
            contract: GatewayContract::Legacy,
        })
        .await?;

    Ok(Json(response))
}

pub async fn authorize_http_api(
    State(state): State<AppState>,
    Json(event): Json<HttpApiAuthorizerEvent>,
) -> Result<Json<AuthorizationResponse>, AppError> {
    event
        .validate()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;

    let response = state
        .authorizer
        .authorize(AuthorizationRequest {
            authorization: event.authorization(),
            method: event.method(),
            path: event.path(),
            resource: &event.route_arn,
            contract: GatewayContract::Simple,
        })
        .await?;

    Ok(Json(response))
}
