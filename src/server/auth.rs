use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use super::AppState;
use crate::error::AppError;
use crate::identity::{bearer_token, AuthError, Principal};

fn authenticate(state: &AppState, req: &Request) -> Result<Principal, AuthError> {
    let header = match req.headers().get(AUTHORIZATION) {
        None => None,
        Some(v) => Some(v.to_str().map_err(|_| AuthError::BadScheme)?),
    };
    let token = bearer_token(header)?;
    state.verifier.verify(token)
}

/// Gate for protected routes. Runs before any extractor touches the body; on success
/// the caller's `Principal` is attached as a request extension.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, AppError> {
    match authenticate(&state, &req) {
        Ok(principal) => {
            debug!(target: "auth", uid = %principal.uid, "request authenticated");
            req.extensions_mut().insert(principal);
            Ok(next.run(req).await)
        }
        Err(reason) => {
            debug!(target: "auth", %reason, method = %req.method(), path = %req.uri().path(), "rejected");
            Err(AppError::unauthorized())
        }
    }
}
