//! In-process MDK client: sessions, interactions, propagation tokens,
//! deadlines, service discovery and per-node failure policies.
//!
//! A process owns one [`Mdk`] handle. Every unit of inbound work gets its
//! own [`Session`], either fresh or joined from a propagation token that
//! another process produced with [`Session::externalize`].

pub mod client;
pub mod context;
pub mod discovery;
pub mod policy;
pub mod session;
pub mod time;

pub use client::Mdk;
pub use context::{LamportClock, SharedContext};
pub use discovery::Discovery;
pub use policy::{FailurePolicy, PolicySnapshot};
pub use session::Session;
pub use time::{ManualTime, SystemTime, TimeSource};
