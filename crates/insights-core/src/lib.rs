//! # insights-core
//!
//! Core crate for Production Insights. Contains configuration schemas,
//! the unified error system, session domain events, path policy, and the
//! traits implemented by the auth crate and the application shell.
//!
//! This crate has **no** internal dependencies on other Production Insights crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
