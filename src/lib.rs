//! Bearer-token request authorizer.
//!
//! A request is allowed only when its JWT verifies against the issuer's key set
//! AND the Rego policy returns `true` for `{token, method, path}`. The answer is
//! shaped either as an IAM policy document (REST API gateways) or as a simple
//! `isAuthorized` flag (HTTP API gateways).
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
