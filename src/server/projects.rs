//! `/projects` handlers. Bodies are taken as raw bytes and parsed here, so a
//! malformed payload renders the same JSON error shape as every other failure.

use axum::body::Bytes;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::AppState;
use crate::config::PatchPolicy;
use crate::error::{AppError, AppResult};
use crate::identity::Principal;
use crate::model::validate_create;

fn parse_json(body: &Bytes) -> AppResult<Value> {
    serde_json::from_slice(body).map_err(|e| {
        debug!(target: "projects", error = %e, "unparseable body");
        AppError::user("invalid_json", "Request body is not valid JSON")
    })
}

fn not_found() -> AppError {
    AppError::not_found("not_found", "Not found")
}

pub async fn list(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let docs = state.projects.list()?;
    let data: Vec<Value> = docs.iter().map(|d| d.to_json()).collect();
    Ok(Json(json!({ "data": data })))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let input = parse_json(&body)?;
    let project = validate_create(&input).map_err(AppError::validation)?;
    let id = state.projects.create(project)?;
    info!(target: "projects", id = %id, uid = %principal.uid, "project created");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn fetch(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    match state.projects.get(&id)? {
        Some(doc) => Ok(Json(doc.to_json())),
        None => Err(not_found()),
    }
}

pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let Value::Object(partial) = parse_json(&body)? else {
        return Err(AppError::user("invalid_body", "Expected a JSON object"));
    };
    match state.patch_policy {
        PatchPolicy::RequireExisting => {
            if !state.projects.update_existing(&id, partial)? {
                return Err(not_found());
            }
        }
        PatchPolicy::Upsert => state.projects.update(&id, partial)?,
    }
    info!(target: "projects", id = %id, uid = %principal.uid, "project updated");
    Ok(Json(json!({ "ok": true })))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    state.projects.remove(&id)?;
    info!(target: "projects", id = %id, uid = %principal.uid, "project removed");
    Ok(Json(json!({ "ok": true })))
}
