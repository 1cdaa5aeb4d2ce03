//! Convenience result type alias for Production Insights.

use crate::error::AppError;

/// A specialized `Result` type for Production Insights operations.
pub type AppResult<T> = Result<T, AppError>;
