use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use thiserror::Error;

/// Validation errors for user-supplied input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("city name cannot be empty")]
    EmptyCityName,
    #[error("city name length {len} exceeds max {max}")]
    CityNameTooLong { len: usize, max: usize },
    #[error("city name contains a control character at index {index}")]
    CityNameControlChar { index: usize },

    #[error("timestamp is out of range or not RFC3339: '{value}'")]
    InvalidTimestamp { value: String },

    #[error("invalid source '{value}', expected one of weather, air_quality, traffic_flow, traffic_incidents, energy, waste")]
    InvalidSource { value: String },
}

/// Errors raised while loading an injected city catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {name} must be a boolean, got '{value}'")]
    InvalidBool { name: String, value: String },

    #[error("environment variable {name} must be an unsigned integer, got '{value}'")]
    InvalidNumber { name: String, value: String },
}

/// Terminal outcome of one aggregation. Only the mandatory source can cause
/// `Failed`; every other source falls back locally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("failed to fetch data for {city}: {reason}")]
    Failed {
        city: String,
        reason: String,
        #[source]
        cause: FetchError,
    },

    #[error("invalid city: {0}")]
    InvalidCity(#[from] ValidationError),
}

impl AggregationError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Failed { .. } => "aggregation.failed",
            Self::InvalidCity(_) => "aggregation.invalid_city",
        }
    }
}

/// Error classification surfaced by the retry client and provider adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The city could not be resolved by a geo-bound source.
    NotFound,
    /// Network-policy failure; retrying cannot succeed.
    Blocked,
    Timeout,
    ClientError(u16),
    ServerError(u16),
    Unknown,
}

/// Structured fetch error used by adapters and the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
}

impl FetchError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::NotFound, message)
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Blocked, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Timeout, message)
    }

    pub fn client_error(status: u16, message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::ClientError(status), message)
    }

    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::ServerError(status), message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Unknown, message)
    }

    fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Timeouts, 5xx and unclassified transport failures are worth another attempt.
    pub const fn retryable(&self) -> bool {
        matches!(
            self.kind,
            FetchErrorKind::Timeout | FetchErrorKind::ServerError(_) | FetchErrorKind::Unknown
        )
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            FetchErrorKind::NotFound => "fetch.not_found",
            FetchErrorKind::Blocked => "fetch.blocked",
            FetchErrorKind::Timeout => "fetch.timeout",
            FetchErrorKind::ClientError(_) => "fetch.client_error",
            FetchErrorKind::ServerError(_) => "fetch.server_error",
            FetchErrorKind::Unknown => "fetch.unknown",
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for FetchError {}
