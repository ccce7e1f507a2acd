//!
//! strata HTTP API
//! ---------------
//! Axum router over the `projects` collection.
//!
//! Responsibilities:
//! - Bearer-token gate in front of every `/projects` route (see `auth`).
//! - CRUD handlers translating store results into JSON (see `projects`).
//! - Startup: open the store, build the verifier, bind, serve until Ctrl+C/SIGTERM,
//!   then flush the store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::get;
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{PatchPolicy, ServerConfig};
use crate::identity::{HmacTokenVerifier, TokenVerifier};
use crate::storage::{ProjectStore, SharedStore};

pub mod auth;
pub mod projects;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub projects: ProjectStore,
    pub verifier: Arc<dyn TokenVerifier>,
    pub patch_policy: PatchPolicy,
}

impl AppState {
    pub fn new(store: SharedStore, verifier: impl TokenVerifier + 'static, patch_policy: PatchPolicy) -> Self {
        Self { projects: store.projects(), verifier: Arc::new(verifier), patch_policy }
    }
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/projects", get(projects::list).post(projects::create))
        .route(
            "/projects/{id}",
            get(projects::fetch).patch(projects::update).delete(projects::remove),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("http server failed")
}

/// Start the API with the given configuration and block until shutdown.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let store = config.store.open().context("while opening the document store")?;
    let verifier = HmacTokenVerifier::new(&config.credential);
    info!(
        target: "startup",
        bucket = %config.store.bucket,
        project = config.credential.project_id.as_deref().unwrap_or("-"),
        client = config.credential.client_email.as_deref().unwrap_or("-"),
        patch_policy = ?config.patch_policy,
        "starting strata api"
    );
    let state = AppState::new(store.clone(), verifier, config.patch_policy);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Starting server on {}", addr);
    serve(listener, state, shutdown_signal()).await?;

    if let Err(e) = store.flush() {
        warn!(target: "storage", error = %e, "flush on shutdown failed");
    }
    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
