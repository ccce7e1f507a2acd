//!
//! strata web frontend
//! -------------------
//! Localized server-rendered pages over the HTTP API. The frontend never touches
//! the store; everything goes through `client::ApiClient` with the demo token.

use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{LocaleConfig, WebConfig};
use crate::server::shutdown_signal;

pub mod client;
pub mod i18n;
pub mod pages;

pub use client::ApiClient;
use i18n::Messages;

#[derive(Clone)]
pub struct WebState {
    pub api: ApiClient,
    pub locales: LocaleConfig,
}

impl WebState {
    pub fn new(api: ApiClient, locales: LocaleConfig) -> Self {
        Self { api, locales }
    }

    /// Bundle for a supported locale, or the rendered 404 page.
    fn messages(&self, locale: &str) -> Result<Messages, Response> {
        if self.locales.is_supported(locale) {
            Ok(Messages::new(locale, &self.locales.default))
        } else {
            let default = &self.locales.default;
            let msgs = Messages::new(default, default);
            Err((StatusCode::NOT_FOUND, Html(pages::not_found(default, &msgs))).into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub fn build_router(state: WebState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/{locale}", get(home))
        .route("/{locale}/projects", get(list).post(create))
        .route("/{locale}/projects/new", get(new_form))
        .route("/{locale}/projects/{id}", get(detail))
        .route("/{locale}/projects/{id}/delete", post(remove))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn upstream_failure(locale: &str, msgs: &Messages, key: &str, err: anyhow::Error) -> Response {
    warn!(target: "web", error = %err, "api call failed");
    (StatusCode::BAD_GATEWAY, Html(pages::error(locale, msgs, key))).into_response()
}

async fn root(State(state): State<WebState>, headers: HeaderMap) -> Redirect {
    let accept = headers.get(header::ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok());
    let locale = i18n::negotiate(accept, &state.locales);
    Redirect::temporary(&format!("/{}", urlencoding::encode(&locale)))
}

async fn home(State(state): State<WebState>, Path(locale): Path<String>) -> Response {
    match state.messages(&locale) {
        Ok(msgs) => Html(pages::home(&locale, &msgs)).into_response(),
        Err(resp) => resp,
    }
}

async fn list(State(state): State<WebState>, Path(locale): Path<String>) -> Response {
    let msgs = match state.messages(&locale) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    match state.api.list_projects().await {
        Ok(projects) => Html(pages::project_list(&locale, &msgs, &projects)).into_response(),
        Err(e) => upstream_failure(&locale, &msgs, "errors.unavailable", e),
    }
}

async fn new_form(State(state): State<WebState>, Path(locale): Path<String>) -> Response {
    match state.messages(&locale) {
        Ok(msgs) => Html(pages::new_project(&locale, &msgs)).into_response(),
        Err(resp) => resp,
    }
}

async fn create(State(state): State<WebState>, Path(locale): Path<String>, Form(form): Form<CreateForm>) -> Response {
    let msgs = match state.messages(&locale) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    match state.api.create_project(&form.name, &form.description).await {
        Ok(id) => {
            info!(target: "web", id = %id, "project created from form");
            Redirect::to(&format!("/{}/projects", urlencoding::encode(&locale))).into_response()
        }
        Err(e) => upstream_failure(&locale, &msgs, "errors.rejected", e),
    }
}

async fn detail(State(state): State<WebState>, Path((locale, id)): Path<(String, String)>) -> Response {
    let msgs = match state.messages(&locale) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    match state.api.get_project(&id).await {
        Ok(Some(p)) => Html(pages::project_detail(&locale, &msgs, &p)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, Html(pages::not_found(&locale, &msgs))).into_response(),
        Err(e) => upstream_failure(&locale, &msgs, "errors.unavailable", e),
    }
}

async fn remove(State(state): State<WebState>, Path((locale, id)): Path<(String, String)>) -> Response {
    let msgs = match state.messages(&locale) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    match state.api.delete_project(&id).await {
        Ok(()) => Redirect::to(&format!("/{}/projects", urlencoding::encode(&locale))).into_response(),
        Err(e) => upstream_failure(&locale, &msgs, "errors.rejected", e),
    }
}

pub async fn serve<F>(listener: TcpListener, state: WebState, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("web server failed")
}

pub async fn run(config: WebConfig) -> anyhow::Result<()> {
    let api = ApiClient::new(&config.api_base, &config.demo_token)?;
    if config.demo_token.is_empty() {
        warn!(target: "startup", "STRATA_DEMO_TOKEN is empty; API calls will be rejected");
    }
    let state = WebState::new(api, config.locales.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(api = %config.api_base, locales = ?config.locales.supported, "Starting web frontend on {}", addr);
    serve(listener, state, shutdown_signal()).await?;
    info!("web frontend stopped");
    Ok(())
}
