//! Error types for the assessment pipeline
//!
//! Every failure carries an [`ErrorKind`] so that callers (HTTP layer, CLI,
//! fallback generation) classify errors structurally instead of matching on
//! message text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PluginType;

/// Structural classification of an [`AssessError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    DuplicateRegistration,
    NoPlugin,
    CannotHandle,
    AnalysisFailed,
    AssessmentFailed,
    Network,
    NotFound,
    TooLarge,
    RateLimited,
    Timeout,
    Cancelled,
    InvalidResult,
    Plugin,
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::DuplicateRegistration => "DUPLICATE_REGISTRATION",
            ErrorKind::NoPlugin => "NO_PLUGIN",
            ErrorKind::CannotHandle => "CANNOT_HANDLE",
            ErrorKind::AnalysisFailed => "ANALYSIS_FAILED",
            ErrorKind::AssessmentFailed => "AI_ASSESSMENT_FAILED",
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::TooLarge => "TOO_LARGE",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::InvalidResult => "INVALID_RESULT",
            ErrorKind::Plugin => "PLUGIN_ERROR",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    /// Coarse grouping used in error records
    pub fn category(self) -> &'static str {
        match self {
            ErrorKind::Validation | ErrorKind::CannotHandle => "validation",
            ErrorKind::DuplicateRegistration | ErrorKind::NoPlugin => "registry",
            ErrorKind::AnalysisFailed | ErrorKind::InvalidResult | ErrorKind::Plugin => "analysis",
            ErrorKind::AssessmentFailed => "ai_assessment",
            ErrorKind::Network
            | ErrorKind::NotFound
            | ErrorKind::TooLarge
            | ErrorKind::RateLimited => "network",
            ErrorKind::Timeout | ErrorKind::Cancelled => "timeout",
            ErrorKind::Internal => "system",
        }
    }

    /// HTTP status the boundary layer answers with
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation | ErrorKind::CannotHandle => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Timeout => 408,
            ErrorKind::TooLarge => 413,
            ErrorKind::RateLimited => 429,
            _ => 500,
        }
    }

    /// Whether another attempt could succeed
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Network
                | ErrorKind::RateLimited
                | ErrorKind::Timeout
                | ErrorKind::InvalidResult
                | ErrorKind::Plugin
        )
    }
}

/// Errors produced by the registry, orchestrator and scoring engine
#[derive(Debug, Clone, Error)]
pub enum AssessError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("plugin already registered: {plugin_type}/{name}")]
    DuplicateRegistration { plugin_type: PluginType, name: String },

    #[error("no {0} plugin registered")]
    NoPlugin(PluginType),

    #[error("plugin {name} cannot handle {target}")]
    CannotHandle { name: String, target: String },

    #[error("analysis by {analyzer} failed after {attempts} attempt(s): {last}")]
    AnalysisFailed {
        analyzer: String,
        attempts: u32,
        #[source]
        last: Box<AssessError>,
    },

    #[error("AI assessment by {assessor} failed after {attempts} attempt(s): {last}")]
    AssessmentFailed {
        assessor: String,
        attempts: u32,
        #[source]
        last: Box<AssessError>,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("content too large: {0}")]
    TooLarge(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("assessment cancelled")]
    Cancelled,

    #[error("invalid result: {0}")]
    InvalidResult(String),

    #[error("plugin error: {0}")]
    Plugin(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, AssessError>;

impl AssessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssessError::Validation(_) => ErrorKind::Validation,
            AssessError::DuplicateRegistration { .. } => ErrorKind::DuplicateRegistration,
            AssessError::NoPlugin(_) => ErrorKind::NoPlugin,
            AssessError::CannotHandle { .. } => ErrorKind::CannotHandle,
            AssessError::AnalysisFailed { .. } => ErrorKind::AnalysisFailed,
            AssessError::AssessmentFailed { .. } => ErrorKind::AssessmentFailed,
            AssessError::Network(_) => ErrorKind::Network,
            AssessError::NotFound(_) => ErrorKind::NotFound,
            AssessError::TooLarge(_) => ErrorKind::TooLarge,
            AssessError::RateLimited(_) => ErrorKind::RateLimited,
            AssessError::Timeout(_) => ErrorKind::Timeout,
            AssessError::Cancelled => ErrorKind::Cancelled,
            AssessError::InvalidResult(_) => ErrorKind::InvalidResult,
            AssessError::Plugin(_) => ErrorKind::Plugin,
            AssessError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The innermost error, unwrapping exhausted-retry wrappers
    pub fn root_cause(&self) -> &AssessError {
        match self {
            AssessError::AnalysisFailed { last, .. } | AssessError::AssessmentFailed { last, .. } => {
                last.root_cause()
            }
            other => other,
        }
    }

    /// Status code derived from the root cause
    pub fn http_status(&self) -> u16 {
        self.root_cause().kind().http_status()
    }

    pub fn is_retryable(&self) -> bool {
        self.root_cause().kind().is_retryable()
    }

    /// Convert an error raised inside a plugin, keeping its kind when the plugin
    /// already produced an [`AssessError`] or a classifiable HTTP error.
    pub fn from_plugin(err: anyhow::Error) -> Self {
        let err = match err.downcast::<AssessError>() {
            Ok(assess) => return assess,
            Err(err) => err,
        };
        match err.downcast::<reqwest::Error>() {
            Ok(http) => AssessError::from(http),
            Err(err) => AssessError::Plugin(format!("{err:#}")),
        }
    }
}

impl From<reqwest::Error> for AssessError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return AssessError::Timeout(err.to_string());
        }
        match err.status().map(|s| s.as_u16()) {
            Some(404) => AssessError::NotFound(err.to_string()),
            Some(413) => AssessError::TooLarge(err.to_string()),
            Some(429) => AssessError::RateLimited(err.to_string()),
            _ => AssessError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AssessError {
    fn from(err: serde_json::Error) -> Self {
        AssessError::Internal(format!("serialization failed: {err}"))
    }
}
