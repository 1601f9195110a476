use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketplaceError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API returned status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("No data sources matched query '{query}'")]
    NoSuggestions { query: String },

    #[error("No fields selected")]
    EmptySelection,

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Api,
    Input,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MarketplaceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) => ErrorCategory::Network,
            Self::ApiError { .. } | Self::Unauthorized { .. } | Self::NotFound { .. } => {
                ErrorCategory::Api
            }
            Self::NoSuggestions { .. } | Self::EmptySelection => ErrorCategory::Input,
            Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_) | Self::SerializationError(_) => ErrorCategory::Data,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NoSuggestions { .. } | Self::EmptySelection => ErrorSeverity::Low,
            Self::HttpError(_) | Self::ApiError { .. } => ErrorSeverity::Medium,
            Self::Unauthorized { .. }
            | Self::NotFound { .. }
            | Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorSeverity::High,
            Self::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// Transport failures and 5xx responses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(e) => e.is_timeout() || e.is_connect(),
            Self::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::HttpError(_) => "Check that the API server is reachable and try again",
            Self::ApiError { .. } => "The API rejected the request; retry later or check the server logs",
            Self::Unauthorized { .. } => {
                "Provide a valid API key with --api-key or OWNLY_API_KEY (demo keys start with 'demo_')"
            }
            Self::NotFound { .. } => "Check the identifier; list datasets with the 'catalog' command",
            Self::NoSuggestions { .. } => "Rephrase the query or try the demo query",
            Self::EmptySelection => "Select at least one field before generating a dataset",
            Self::CsvError(_) | Self::SerializationError(_) => {
                "The server response could not be processed; check the API version"
            }
            Self::IoError(_) => "Check file permissions and available disk space",
            Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => "Fix the configuration file or command line flags",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::HttpError(_) => "Could not reach the marketplace API".to_string(),
            Self::ApiError { status, message } => {
                format!("The marketplace API failed ({}): {}", status, message)
            }
            Self::Unauthorized { .. } => "Invalid or missing API key".to_string(),
            Self::NotFound { resource } => format!("{} does not exist", resource),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MarketplaceError>;
