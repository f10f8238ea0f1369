use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Backend request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Backend returned {status} for {url}")]
    BackendStatusError { status: u16, url: String },

    #[error("{section} item '{id}' not found")]
    NotFoundError { section: String, id: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Backend,
    Storage,
    Data,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl OrderError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) => ErrorCategory::Network,
            Self::BackendStatusError { .. } | Self::NotFoundError { .. } => ErrorCategory::Backend,
            Self::ZipError(_) | Self::IoError(_) => ErrorCategory::Storage,
            Self::CsvError(_) | Self::SerializationError(_) | Self::ProcessingError { .. } => {
                ErrorCategory::Data
            }
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFoundError { .. } | Self::ApiError(_) | Self::BackendStatusError { .. } => {
                ErrorSeverity::Medium
            }
            Self::CsvError(_) | Self::SerializationError(_) | Self::ProcessingError { .. } => {
                ErrorSeverity::High
            }
            Self::ZipError(_) | Self::IoError(_) => ErrorSeverity::Critical,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorSeverity::High,
        }
    }

    /// Whether running the same command again has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError(e) => e.is_timeout() || e.is_connect(),
            Self::BackendStatusError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check that the backend is running and reachable from this machine",
            ErrorCategory::Backend => match self {
                Self::NotFoundError { .. } => "List the section first to find a valid id",
                _ => "Inspect the backend logs; the request reached it but was rejected",
            },
            ErrorCategory::Storage => "Check that the output path exists and is writable",
            ErrorCategory::Data => "The backend returned data in an unexpected shape",
            ErrorCategory::Configuration => "Fix the configuration value and run again",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ApiError(_) => "Could not reach the portfolio backend".to_string(),
            Self::BackendStatusError { status, .. } => {
                format!("The portfolio backend answered with HTTP {}", status)
            }
            Self::NotFoundError { section, id } => {
                format!("No {} entry with id '{}'", section, id)
            }
            Self::IoError(e) => format!("File system error: {}", e),
            Self::ZipError(_) => "Could not build the output bundle".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrderError>;
