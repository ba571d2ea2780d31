use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::warn;

use crate::server::types::ApiErrorType;
use crate::types::AppState;

/// Requires `Authorization: Bearer <token>` when an API token is configured.
pub async fn auth(State(s): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let Some(expected) = s.config.api_token.as_deref() else {
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if provided.map(str::trim) == Some(expected) {
        return next.run(req).await;
    }

    warn!(path = %req.uri().path(), "Rejected request with missing or invalid token");
    ApiErrorType::from((
        StatusCode::UNAUTHORIZED,
        "Missing or invalid API token",
        None,
    ))
    .into_response()
}
