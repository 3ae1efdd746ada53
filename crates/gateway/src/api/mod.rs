pub mod context;
pub mod error;
pub mod resolve;
pub mod session;
pub mod timeout;

use axum::middleware;
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the demo router. Every route runs inside the session middleware.
///
/// `state` is needed to wire up the middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/context", get(context::get_context))
        .route("/resolve", get(resolve::resolve))
        .route("/timeout", get(timeout::get_timeout))
        .layer(middleware::from_fn_with_state(
            state,
            session::attach_session,
        ))
}
