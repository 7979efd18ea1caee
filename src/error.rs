//! Error types for the market dashboard data layer

use thiserror::Error;

/// Errors raised by an HTTP transport before a status code is available
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    /// The host could not be reached (DNS, refused connection, TLS, timeout)
    #[error("Host unreachable: {0}")]
    Unreachable(String),

    /// The response body could not be read
    #[error("Failed to read response body: {0}")]
    Body(String),

    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Client(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}

/// Errors surfaced by the resilient fetch client
///
/// Retrying happens inside the client; once one of these is returned the
/// caller should show the message and offer an explicit retry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    /// Upstream throttling persisted across every attempt
    #[error("{message}")]
    RateLimited { message: String },

    /// Non-success, non-429 status
    #[error("Server Error: {status} {status_text}")]
    ServerError { status: u16, status_text: String },

    /// Transport failure persisted across every attempt
    #[error("{message}")]
    NetworkError { message: String },

    /// Success status but the body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Retry loop exited without a result
    #[error("{0}")]
    Unknown(String),

    /// The client or endpoint could not be set up
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FetchError {
    /// Creates a RateLimited error with the user-facing wait hint
    pub fn rate_limited() -> Self {
        Self::RateLimited {
            message: "API Rate Limit Exceeded. CoinGecko limits free tier requests. Please wait a minute."
                .to_string(),
        }
    }

    /// Creates a ServerError error
    pub fn server(status: u16, status_text: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            status_text: status_text.into(),
        }
    }

    /// Creates a NetworkError error with the connectivity hint
    pub fn network() -> Self {
        Self::NetworkError {
            message: "Network Connection Error. Check your internet or ad-blocker (CoinGecko might be blocked)."
                .to_string(),
        }
    }

    /// Creates an InvalidResponse error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Creates the Unknown error returned when the retry loop runs dry
    pub fn max_retries() -> Self {
        Self::Unknown("Maximum retries reached.".to_string())
    }

    /// Creates a Config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the failure came from upstream throttling
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Errors raised by the conversational assistant
#[derive(Debug, Error)]
pub enum AssistantError {
    /// No API credential was found in the environment
    #[error("Assistant API key not configured (set one of {0})")]
    MissingApiKey(String),

    /// The model backend could not be reached or returned a bad status
    #[error("Model backend error: {0}")]
    Backend(String),

    /// The model reply could not be understood
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    /// The model asked for a tool that is not declared
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A model turn did not complete before the deadline
    #[error("Model turn timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        Self::Backend(err.to_string())
    }
}
