use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use mdk_domain::error::Error;

/// Response extension telling the session middleware the handler failed,
/// and why.
#[derive(Debug, Clone)]
pub struct InteractionFailure(pub String);

/// Error type returned by route handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Deliberate failure used to exercise the failure path.
    #[error("{0}")]
    Synthetic(String),

    #[error(transparent)]
    Mdk(#[from] Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Mdk(Error::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Mdk(Error::Stopped) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Standardized JSON error body `{ "error": "<message>" }`, tagged with an
/// [`InteractionFailure`] extension.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        tracing::debug!(%status, error = %message, "handler failed");
        let mut resp = (status, Json(serde_json::json!({ "error": message.clone() })))
            .into_response();
        resp.extensions_mut().insert(InteractionFailure(message));
        resp
    }
}
