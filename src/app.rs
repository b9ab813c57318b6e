/*
 * Responsibility
 * - Config load -> tracing -> dependency wiring -> Router assembly
 * - Apply cross-cutting middleware (request id, tracing, timeout)
 * - axum::serve()
 */
use std::{panic, process};

use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware;
use crate::services::authz::build_authorizer;
use crate::state::AppState;

fn init_tracing(log_level: &str) {
    // Prefer RUST_LOG if set; otherwise use LOG_LEVEL from config.
    // Ex:
    // RUST_LOG=info,opa_authorizer=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("{},tower_http=info", log_level))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development: crash the whole process so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<(), AppError> {
    let config = Config::from_env()?;
    init_tracing(&config.log_level);
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting authorizer in {:?} mode on {} (issuer {})",
        config.app_env,
        config.addr,
        config.issuer
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|e| AppError::Startup(format!("failed to bind {}: {}", config.addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|_| AppError::Internal)?;

    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState, AppError> {
    // Policy load failure refuses to serve; key fetch failure only warns and is retried per request.
    let authorizer = build_authorizer(config)?;
    authorizer.keys().warm(authorizer.issuer()).await;

    Ok(AppState::new(authorizer))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/health", get(api::v1::handlers::health::health))
        .merge(api::v1::routes())
        .with_state(state);

    middleware::http::apply(router, config.request_timeout)
}
