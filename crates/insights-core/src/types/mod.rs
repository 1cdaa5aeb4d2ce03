//! Core type definitions used across the Production Insights workspace.

pub mod id;
pub mod path;

pub use id::ContextId;
pub use path::PathPolicy;
