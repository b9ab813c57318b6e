/*
 * Responsibility
 * - v1 URL layout
 * - /authorize/rest: REST API (payload 1.0) authorizer, IAM policy document response
 * - /authorize/http: HTTP API (payload 2.0) authorizer, simple response
 */
use axum::{Router, routing::post};

use crate::api::v1::handlers::authorize::{authorize_http_api, authorize_rest_api};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().nest(
        "/api/v1",
        Router::new()
            .route("/authorize/rest", post(authorize_rest_api))
            .route("/authorize/http", post(authorize_http_api)),
    )
}
