//! Unified error handling for the ahub CLI and SDK
//!
//! Every error carries a unique `AXXX` code so failures can be referenced in
//! bug reports and docs without quoting the full message.

use std::fmt;
use thiserror::Error;

/// Unified Result type for all ahub operations
pub type Result<T> = std::result::Result<T, AhubError>;

/// Error codes for ahub operations
///
/// Each error has a unique code in the format `AXXX` where:
/// - A1XX: Authentication and authorization errors
/// - A2XX: Network and API errors
/// - A3XX: File and I/O errors
/// - A4XX: Configuration errors
/// - A5XX: Validation and input errors
/// - A7XX: Agent and resource errors
/// - A8XX: UI and interaction errors
/// - A9XX: Internal errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (A1XX)
    /// A101: Authentication failed
    AuthenticationFailed,
    /// A102: Authorization denied
    AuthorizationDenied,

    // Network (A2XX)
    /// A201: HTTP request failed
    HttpError,
    /// A202: Connection timeout
    ConnectionTimeout,
    /// A203: Connection refused
    ConnectionRefused,
    /// A204: API returned error response
    ApiError,
    /// A205: Invalid API response format
    InvalidResponse,

    // File/IO (A3XX)
    /// A301: File not found
    FileNotFound,
    /// A302: File read error
    FileReadError,
    /// A303: File write error
    FileWriteError,
    /// A304: File already exists
    FileAlreadyExists,

    // Configuration (A4XX)
    /// A401: Configuration error
    ConfigError,

    // Validation (A5XX)
    /// A501: Invalid input
    InvalidInput,
    /// A502: Validation failed
    ValidationFailed,

    // Agent/Resource (A7XX)
    /// A701: Agent not found
    AgentNotFound,
    /// A702: Download failed
    DownloadFailed,

    // UI (A8XX)
    /// A801: Dialog error
    DialogError,

    // Internal (A9XX)
    /// A901: Internal error
    InternalError,
    /// A902: Serialization error
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u16 {
        match self {
            ErrorCode::AuthenticationFailed => 101,
            ErrorCode::AuthorizationDenied => 102,

            ErrorCode::HttpError => 201,
            ErrorCode::ConnectionTimeout => 202,
            ErrorCode::ConnectionRefused => 203,
            ErrorCode::ApiError => 204,
            ErrorCode::InvalidResponse => 205,

            ErrorCode::FileNotFound => 301,
            ErrorCode::FileReadError => 302,
            ErrorCode::FileWriteError => 303,
            ErrorCode::FileAlreadyExists => 304,

            ErrorCode::ConfigError => 401,

            ErrorCode::InvalidInput => 501,
            ErrorCode::ValidationFailed => 502,

            ErrorCode::AgentNotFound => 701,
            ErrorCode::DownloadFailed => 702,

            ErrorCode::DialogError => 801,

            ErrorCode::InternalError => 901,
            ErrorCode::SerializationError => 902,
        }
    }

    /// Get the string code (e.g., "A101")
    pub fn as_str(&self) -> String {
        format!("A{}", self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.code())
    }
}

/// Main error type for all ahub operations
#[derive(Error, Debug)]
pub enum AhubError {
    /// Authentication failed
    #[error("[{code}] Authentication failed: {message}")]
    Authentication {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authorization denied
    #[error("[{code}] Authorization denied: {message}")]
    Authorization { code: ErrorCode, message: String },

    /// HTTP/Network error
    #[error("[{code}] Network error: {message}")]
    Network {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// API error with status code
    #[error("[{code}] API error ({status}): {message}")]
    Api {
        code: ErrorCode,
        status: u16,
        message: String,
    },

    /// File or IO error
    #[error("[{code}] {context}: {message}")]
    Io {
        code: ErrorCode,
        context: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration error
    #[error("[{code}] Configuration error: {message}")]
    Config {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<config::ConfigError>,
    },

    /// Validation error
    #[error("[{code}] Validation error: {message}")]
    Validation {
        code: ErrorCode,
        message: String,
        field: Option<String>,
    },

    /// Invalid input error
    #[error("[{code}] Invalid input: {message}")]
    InvalidInput { code: ErrorCode, message: String },

    /// Resource not found
    #[error("[{code}] Not found: {resource}")]
    NotFound { code: ErrorCode, resource: String },

    /// Download error
    #[error("[{code}] Download failed: {message}")]
    Download { code: ErrorCode, message: String },

    /// UI/Dialog error
    #[error("[{code}] UI error: {message}")]
    Ui { code: ErrorCode, message: String },

    /// Internal/Unexpected error
    #[error("[{code}] Internal error: {message}")]
    Internal { code: ErrorCode, message: String },

    /// JSON serialization error
    #[error("[{code}] Serialization error: {message}")]
    Serialization {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Timeout error
    #[error("[A202] Operation timed out")]
    Timeout,
}

impl AhubError {
    // --- Authentication ---

    /// Create authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::AuthenticationFailed,
            message: message.into(),
            source: None,
        }
    }

    /// Create authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            code: ErrorCode::AuthorizationDenied,
            message: message.into(),
        }
    }

    // --- Network ---

    /// Create network error from message
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            code: ErrorCode::HttpError,
            message: message.into(),
            source: None,
        }
    }

    /// Create network error from reqwest error
    pub fn network_from_reqwest(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            ErrorCode::ConnectionTimeout
        } else if err.is_connect() {
            ErrorCode::ConnectionRefused
        } else {
            ErrorCode::HttpError
        };

        Self::Network {
            code,
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::ApiError,
            status,
            message: message.into(),
        }
    }

    /// Create invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::InvalidResponse,
            status: 0,
            message: message.into(),
        }
    }

    // --- File/IO ---

    /// Create IO error from std::io::Error
    pub fn io_from_error(context: impl Into<String>, err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::FileWriteError,
            std::io::ErrorKind::AlreadyExists => ErrorCode::FileAlreadyExists,
            _ => ErrorCode::FileReadError,
        };

        Self::Io {
            code,
            context: context.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    // --- Configuration ---

    /// Create configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration error with source
    pub fn config_from_error(err: config::ConfigError) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: err.to_string(),
            source: Some(err),
        }
    }

    // --- Validation ---

    /// Create validation error with field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            code: ErrorCode::InvalidInput,
            message: message.into(),
        }
    }

    // --- Agent/Resource ---

    /// Create agent not found error
    pub fn agent_not_found(agent: impl Into<String>) -> Self {
        Self::NotFound {
            code: ErrorCode::AgentNotFound,
            resource: agent.into(),
        }
    }

    /// Create download error
    pub fn download(message: impl Into<String>) -> Self {
        Self::Download {
            code: ErrorCode::DownloadFailed,
            message: message.into(),
        }
    }

    // --- Internal ---

    /// Create internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: ErrorCode::InternalError,
            message: message.into(),
        }
    }

    // --- Utility Methods ---

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { code, .. } => *code,
            Self::Authorization { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Api { code, .. } => *code,
            Self::Io { code, .. } => *code,
            Self::Config { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::InvalidInput { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Download { code, .. } => *code,
            Self::Ui { code, .. } => *code,
            Self::Internal { code, .. } => *code,
            Self::Serialization { code, .. } => *code,
            Self::Timeout => ErrorCode::ConnectionTimeout,
        }
    }

    /// Check if this is a network error
    pub fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Api { .. } | Self::Timeout)
    }

    /// Surface message for per-card error display: the server-provided text
    /// when there is one, a generic fallback otherwise.
    pub fn display_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            Self::Download { message, .. } if !message.is_empty() => message.clone(),
            _ => "Download failed. Please try again.".to_string(),
        }
    }
}

impl From<std::io::Error> for AhubError {
    fn from(err: std::io::Error) -> Self {
        Self::io_from_error("IO operation", err)
    }
}

impl From<reqwest::Error> for AhubError {
    fn from(err: reqwest::Error) -> Self {
        Self::network_from_reqwest(err)
    }
}

impl From<serde_json::Error> for AhubError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            code: ErrorCode::SerializationError,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<config::ConfigError> for AhubError {
    fn from(err: config::ConfigError) -> Self {
        Self::config_from_error(err)
    }
}

impl From<dialoguer::Error> for AhubError {
    fn from(err: dialoguer::Error) -> Self {
        Self::Ui {
            code: ErrorCode::DialogError,
            message: format!("Dialog error: {}", err),
        }
    }
}
