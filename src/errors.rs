/*!
 * Error Types
 * Error handling with thiserror, miette, and serde support
 */

use crate::sync::ApiLevel;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for wait operations
pub type WaitResult<T> = Result<T, WaitError>;

/// Wait subsystem errors with serialization support
///
/// Timeouts are ordinary outcomes; capability problems surface only through
/// the diagnostic API-level hooks.
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum WaitError {
    #[error("Wait operation timed out")]
    #[diagnostic(
        code(wait::timeout),
        help("The deadline passed before the value changed. Retry or give up.")
    )]
    Timeout,

    #[error("API level {0:?} cannot be requested")]
    #[diagnostic(
        code(wait::invalid_api_level),
        help("Request either Fallback or NativeWait.")
    )]
    InvalidApiLevel(ApiLevel),

    #[error("API level {0:?} is not available on this host")]
    #[diagnostic(
        code(wait::api_level_unavailable),
        help("The host has no native wait-on-address primitive, or fallback mode was already forced.")
    )]
    ApiLevelUnavailable(ApiLevel),
}
