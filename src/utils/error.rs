use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComplianceError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Missing required fields for {entity}: {}", fields.join(", "))]
    MissingFields { entity: String, fields: Vec<String> },

    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Conflicting write to {table}: {message}")]
    Conflict { table: String, message: String },

    #[error("No row with id {id} in {table}")]
    NotFound { table: String, id: String },

    #[error("Could not generate certificate number for prefix '{prefix}': {reason}")]
    CertificateNumber { prefix: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Network,
    Backend,
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

impl ComplianceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::InvalidDate { .. } | Self::ValidationError { .. } | Self::MissingFields { .. } => {
                ErrorCategory::Validation
            }
            Self::ApiError(_) => ErrorCategory::Network,
            Self::Backend { .. }
            | Self::Conflict { .. }
            | Self::NotFound { .. }
            | Self::CertificateNumber { .. } => ErrorCategory::Backend,
            Self::CsvError(_) | Self::SerializationError(_) => ErrorCategory::Data,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound { .. } => ErrorSeverity::Low,
            Self::ApiError(_) | Self::Conflict { .. } => ErrorSeverity::Medium,
            Self::Backend { status, .. } if *status >= 500 => ErrorSeverity::Medium,
            Self::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// Transient failures the caller may try again unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError(e) => e.is_timeout() || e.is_connect(),
            Self::Backend { status, .. } => *status >= 500,
            Self::Conflict { .. } => true,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the configuration file and environment variables it references".to_string()
            }
            ErrorCategory::Validation => match self {
                Self::InvalidDate { .. } => "Dates must be written as YYYY-MM-DD".to_string(),
                Self::MissingFields { fields, .. } => {
                    format!("Fill in: {}", fields.join(", "))
                }
                _ => "Correct the highlighted value and submit again".to_string(),
            },
            ErrorCategory::Network => {
                "Check the network connection and the backend URL".to_string()
            }
            ErrorCategory::Backend => match self {
                Self::Conflict { .. } => {
                    "Another record was saved at the same time; submit again".to_string()
                }
                Self::Backend { status: 401, .. } | Self::Backend { status: 403, .. } => {
                    "Check the backend API key and row-level security policies".to_string()
                }
                Self::CertificateNumber { .. } => {
                    "Make sure the certificate sequence function exists on the backend"
                        .to_string()
                }
                _ => "Retry later or check the backend logs".to_string(),
            },
            ErrorCategory::Data => "Check the input file format".to_string(),
            ErrorCategory::System => "Check file permissions and disk space".to_string(),
        }
    }

    /// Single line suitable for a transient notification.
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ApiError(_) => "Could not reach the backend".to_string(),
            Self::MissingFields { entity, fields } => {
                format!("Please fill in all required {} fields: {}", entity, fields.join(", "))
            }
            Self::InvalidDate { value, .. } => format!("'{}' is not a valid date", value),
            Self::NotFound { table, id } => format!("Record {} no longer exists in {}", id, table),
            Self::CertificateNumber { prefix, .. } => {
                format!("Could not generate a {} certificate number", prefix)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ComplianceError>;
