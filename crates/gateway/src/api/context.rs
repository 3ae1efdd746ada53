//! `GET /context` — the current session as a propagation token.

use std::sync::Arc;

use axum::Extension;

use mdk_sessions::Session;

use crate::api::error::ApiError;

pub async fn get_context(Extension(session): Extension<Arc<Session>>) -> Result<String, ApiError> {
    Ok(session.externalize()?)
}
