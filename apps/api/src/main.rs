mod ai;
mod auth;
mod bypass;
mod config;
mod dashboard;
mod db;
mod errors;
mod invalidation;
mod jobs;
mod models;
mod profile;
mod resume;
mod routes;
mod state;
mod store;
mod subscription;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use tokio::sync::broadcast::error::RecvError;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai::ProviderClient;
use crate::auth::TokenManager;
use crate::config::Config;
use crate::db::{create_lazy_pool, create_pool};
use crate::invalidation::BroadcastInvalidator;
use crate::routes::build_router;
use crate::state::{AppState, Collaborators};
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    let pool = if config.bypass.is_enabled() {
        warn!("DEV_BYPASS_AUTH is on: every request acts as the fixture user");
        create_lazy_pool(&config.database_url)?
    } else {
        create_pool(&config.database_url).await?
    };

    let invalidator = Arc::new(BroadcastInvalidator::new());
    spawn_invalidation_log(&invalidator);

    let state = AppState::new(Collaborators {
        store: Arc::new(PgStore::new(pool)),
        invalidator,
        tokens: TokenManager::new(&config.jwt_secret),
        provider_client: ProviderClient::new().context("Failed to build HTTP client")?,
        provider_keys: config.provider_keys.clone(),
        bypass: config.bypass,
    });

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.allowed_origins)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Any origin when none are configured; otherwise only the listed ones, with
/// credentials so the session cookie is sent.
fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    if origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("Invalid origin '{o}'")))
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

/// Logs every invalidation batch. Page caches subscribe the same way.
fn spawn_invalidation_log(invalidator: &BroadcastInvalidator) {
    let mut rx = invalidator.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(paths) => {
                    let paths: Vec<&str> = paths.iter().map(|p| p.path.as_str()).collect();
                    debug!(?paths, "Views invalidated");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Invalidation log fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
