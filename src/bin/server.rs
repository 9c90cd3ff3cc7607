//! Banman HTTP API server
//!
//! Run with: cargo run --features server --bin banman-server
//!
//! Endpoints:
//!   POST /api/:operation   - Run a named operation with a JSON argument object
//!   GET  /status           - Bootstrap state
//!
//! Callers authenticate with `Authorization: Bearer <token>` or a
//! `banman-session` cookie. Every operation answers 200 with
//! `{data}` or `{data: null, errors: [{message, kind}]}`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use banman::{bootstrap, create_session, is_bootstrapped, respond, Config, Panel, Store};

const SESSION_COOKIE: &str = "banman-session";

// ============================================================================
// State
// ============================================================================

struct AppState {
    panel: Panel,
}

#[derive(Serialize)]
struct StatusRes {
    bootstrapped: bool,
}

// ============================================================================
// Helpers
// ============================================================================

/// Session token from the bearer header, else from the session cookie
fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(v) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(t) = v.strip_prefix("Bearer ") {
            return Some(t.trim().to_string());
        }
    }
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|c| c.trim().split_once('='))
        .find(|(k, _)| *k == SESSION_COOKIE)
        .map(|(_, v)| v.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

async fn post_operation(
    State(state): State<Arc<AppState>>,
    Path(operation): Path<String>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Json<Value> {
    let args = body.map(|Json(v)| v).unwrap_or_else(|| Value::Object(Default::default()));
    let token = session_token(&headers);

    // LMDB calls block; keep them off the async workers
    let result = tokio::task::spawn_blocking(move || {
        let ctx = state.panel.context(token.as_deref());
        state.panel.execute(&ctx, &operation, args)
    })
    .await
    .unwrap_or_else(|e| {
        error!(error = %e, "operation task failed");
        Err(banman::BanError::Storage(e.to_string()))
    });
    Json(respond(result))
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusRes> {
    let bootstrapped = is_bootstrapped(state.panel.store()).unwrap_or(false);
    Json(StatusRes { bootstrapped })
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    info!(path = %config.db_path, "opening database");
    let store = Arc::new(Store::open(&config.db_path)?);

    if !is_bootstrapped(&store)? {
        bootstrap(&store, config.root.as_ref())?;
        if let Some(root) = &config.root {
            let token = create_session(&store, root, config.session_ttl)?;
            info!(%root, "issued first admin session");
            println!("Admin session token for {}: {}", root, token);
        }
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = Arc::new(AppState { panel: Panel::new(store) });

    let app = Router::new()
        .route("/status", get(get_status))
        .route("/api/:operation", post(post_operation))
        .layer(cors)
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    info!(%addr, "banman server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
