//! `GET /timeout` — seconds left before the session deadline, `null` when
//! the session has none.

use std::sync::Arc;

use axum::response::Json;
use axum::Extension;

use mdk_sessions::Session;

pub async fn get_timeout(Extension(session): Extension<Arc<Session>>) -> Json<Option<f64>> {
    Json(session.remaining_time())
}
