use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session middleware
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Options for the per-request session middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Default deadline (seconds) applied to every session the client
    /// creates or joins. `None` leaves sessions without a deadline unless
    /// the startup hook sets one.
    #[serde(default)]
    pub default_timeout: Option<f64>,

    /// Name of the inbound propagation header.
    #[serde(default = "d_context_header")]
    pub context_header: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_timeout: None,
            context_header: d_context_header(),
        }
    }
}

fn d_context_header() -> String {
    "x-mdk-context".into()
}
