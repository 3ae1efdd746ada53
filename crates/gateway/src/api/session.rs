//! Per-request session middleware.
//!
//! For every request: join (or start) a session from the context header,
//! put it in the request extensions, open an interaction, run the handler,
//! report a failed handler to the session and finish the interaction.
//! The finish happens in a drop guard so it also runs when the handler
//! panics or the request future is dropped.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use futures_util::FutureExt;

use mdk_domain::config::SessionConfig;
use mdk_sessions::{Mdk, Session};

use crate::api::error::InteractionFailure;
use crate::state::AppState;

/// Options applied once when the middleware is set up.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Default session deadline in seconds.
    pub timeout: Option<f64>,
}

impl From<&SessionConfig> for SessionOptions {
    fn from(cfg: &SessionConfig) -> Self {
        Self {
            timeout: cfg.default_timeout,
        }
    }
}

/// Start `mdk`, apply `options`, then hand the started client to `init` for
/// any further setup.
pub fn setup<F>(mdk: &Mdk, options: &SessionOptions, init: F)
where
    F: FnOnce(&Mdk),
{
    mdk.start();
    if let Some(timeout) = options.timeout {
        mdk.set_default_deadline(timeout);
    }
    init(mdk);
}

/// Finishes the interaction exactly once, when dropped.
struct InteractionScope {
    session: Arc<Session>,
}

impl InteractionScope {
    fn start(session: Arc<Session>) -> Self {
        session.start_interaction();
        Self { session }
    }

    fn fail(&self, message: &str) {
        self.session.fail_interaction(message);
    }
}

impl Drop for InteractionScope {
    fn drop(&mut self) {
        self.session.finish_interaction();
    }
}

/// Axum middleware. Attach via `axum::middleware::from_fn_with_state`.
pub async fn attach_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(state.config.session.context_header.as_str())
        .and_then(|v| v.to_str().ok());
    let session = state.mdk.join_or_create(token);
    req.extensions_mut().insert(session.clone());

    let scope = InteractionScope::start(session);

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => {
            if let Some(message) = failure_message(&response) {
                scope.fail(&message);
            }
            response
        }
        Err(payload) => {
            scope.fail(&panic_message(payload.as_ref()));
            drop(scope);
            std::panic::resume_unwind(payload)
        }
    }
}

/// The failure a handler reported, if any. Handlers returning
/// [`ApiError`](crate::api::error::ApiError) attach their message; any
/// other 5xx is reported by its status line.
fn failure_message(response: &Response) -> Option<String> {
    if let Some(failure) = response.extensions().get::<InteractionFailure>() {
        return Some(failure.0.clone());
    }
    let status = response.status();
    status.is_server_error().then(|| status.to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    }
}
