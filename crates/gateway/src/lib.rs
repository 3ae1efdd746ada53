//! Demo HTTP server for the MDK session middleware.
//!
//! Every request gets its own [`mdk_sessions::Session`], joined from the
//! inbound context header, with one interaction wrapped around the handler.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod state;
