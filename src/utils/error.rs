use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValuationError {
    #[error("API request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{name} not configured")]
    MissingCredential { name: String },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    /// A single marketplace fetch failed. Recovered inside the aggregator
    /// (the source is simply absent from the bundle); never reaches the
    /// caller of a valuation or comparison request.
    #[error("Marketplace fetch failed: {reason}")]
    SourceFetchError { reason: String },

    #[error("Analysis service returned status {status}")]
    AnalysisTransportError { status: u16 },

    #[error("Empty response from AI")]
    EmptyAnalysisResponse,

    #[error("Response parse error: {message}")]
    ParseError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("No market data found")]
    NoMarketData,
}

pub type Result<T> = std::result::Result<T, ValuationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Transport,
    Parsing,
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ValuationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ValuationError::MissingCredential { .. }
            | ValuationError::ConfigValidationError { .. }
            | ValuationError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            ValuationError::HttpError(_)
            | ValuationError::IoError(_)
            | ValuationError::SourceFetchError { .. }
            | ValuationError::AnalysisTransportError { .. }
            | ValuationError::EmptyAnalysisResponse => ErrorCategory::Transport,
            ValuationError::SerializationError(_) | ValuationError::ParseError { .. } => {
                ErrorCategory::Parsing
            }
            ValuationError::ValidationError { .. } | ValuationError::NoMarketData => {
                ErrorCategory::Validation
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ValuationError::MissingCredential { .. }
            | ValuationError::ConfigValidationError { .. }
            | ValuationError::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
            ValuationError::SourceFetchError { .. } => ErrorSeverity::Low,
            ValuationError::NoMarketData => ErrorSeverity::Medium,
            _ => ErrorSeverity::High,
        }
    }

    /// The message a user sees. Internal distinctions collapse to two
    /// request-level categories; only configuration problems stay specific
    /// since they are actionable before any network call.
    pub fn user_friendly_message(&self) -> String {
        match self {
            ValuationError::MissingCredential { .. }
            | ValuationError::ConfigValidationError { .. }
            | ValuationError::InvalidConfigValueError { .. } => self.to_string(),
            ValuationError::NoMarketData => {
                "Could not fetch market data. Please try again.".to_string()
            }
            _ => "Could not analyze device condition and determine value".to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ValuationError::MissingCredential { .. } => {
                "Set the credential in the environment or in the config file"
            }
            ValuationError::ConfigValidationError { .. }
            | ValuationError::InvalidConfigValueError { .. } => {
                "Fix the configuration value and re-run"
            }
            ValuationError::HttpError(_)
            | ValuationError::SourceFetchError { .. }
            | ValuationError::AnalysisTransportError { .. } => {
                "Check network connectivity and retry in a moment"
            }
            ValuationError::EmptyAnalysisResponse
            | ValuationError::ParseError { .. }
            | ValuationError::ValidationError { .. } => {
                "Retry the request; the analysis service output varies"
            }
            ValuationError::NoMarketData => {
                "Try a more common device model or retry later"
            }
            _ => "Re-run with --verbose for details",
        }
    }
}
