//! Shared types for the MDK workspace: configuration, errors and the
//! discovery `Node` record.

pub mod config;
pub mod error;
pub mod node;
