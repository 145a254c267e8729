use axum::{Router, routing::get};
use chrono::TimeDelta;
use std::{panic, process, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware::token_auth::{self, CookiePolicy};
use crate::services::auth::codec::TokenCodec;
use crate::services::auth::engine::AuthGate;
use crate::services::auth::validator::FixedUserValidator;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,reauth=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing so they don't get "lost"
        // (stderr can be hidden depending on how the process is launched.)
        tracing::error!(?info, "panic");

        // In development, fail fast: crash the whole process so we notice immediately.
        // In production, prefer the default behavior (stderr) and let the server keep running.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<(), AppError> {
    init_tracing();
    let config = Config::from_env()?;

    let abort_on_panic = !config.app_env.is_production();
    init_panic_hook(abort_on_panic);

    tracing::info!(
        "starting token gate in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config);
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|_| AppError::Internal)?;
    axum::serve(listener, app)
        .await
        .map_err(|_| AppError::Internal)?;

    Ok(())
}

/// Build process-level services and inject them into the shared state.
/// The codec owns the process-wide secret; the validator is the swappable
/// credential backend behind the gate.
pub fn build_state(config: &Config) -> AppState {
    let codec = TokenCodec::new(config.secret.as_bytes());
    let validator = Arc::new(FixedUserValidator::new(config.users.clone()));
    let session_ttl = TimeDelta::seconds(config.session_ttl_seconds as i64);
    let gate = AuthGate::new(
        codec,
        validator,
        TimeDelta::seconds(config.temporary_ttl_seconds as i64),
        session_ttl,
    );
    let cookies = CookiePolicy {
        secure: config.cookie_secure,
        lifetime: session_ttl,
    };

    AppState::new(Arc::new(gate), cookies)
}

pub fn build_router(state: AppState) -> Router {
    let protected = token_auth::apply(api::routes(state.clone()), state.clone());

    Router::new()
        .route("/health", get(api::handlers::health::health))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
