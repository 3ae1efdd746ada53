//! `GET /resolve` — resolve the demo service and report its failure policy
//! counters as `{ "<address>": [successes, failures] }`.
//!
//! With an `error` query parameter the handler fails after resolving, so
//! the resolved node is charged with a failure.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Json;
use axum::Extension;
use serde::Deserialize;

use mdk_sessions::Session;

use crate::api::error::ApiError;
use crate::state::AppState;

pub const DEMO_SERVICE: &str = "service1";
pub const DEMO_VERSION: &str = "1.0";

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    #[serde(default)]
    pub error: Option<String>,
}

pub async fn resolve(
    State(state): State<AppState>,
    Extension(session): Extension<Arc<Session>>,
    Query(params): Query<ResolveParams>,
) -> Result<Json<HashMap<String, [u64; 2]>>, ApiError> {
    let node = session.resolve(DEMO_SERVICE, DEMO_VERSION).await?;

    if params.error.is_some() {
        return Err(ApiError::Synthetic("Erroring as requested.".into()));
    }

    let policy = state.mdk.discovery().failure_policy(&node).snapshot();
    Ok(Json(HashMap::from([(
        node.address,
        [policy.successes, policy.failures],
    )])))
}
