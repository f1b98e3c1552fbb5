use thiserror::Error;

#[derive(Error, Debug)]
pub enum CutsheetError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("DXF error: {0}")]
    DxfError(#[from] dxf::DxfError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Invalid SKU '{sku}': {reason}")]
    InvalidSku { sku: String, reason: String },

    #[error("No drawing found for '{identifier}' in folder '{folder}'")]
    ObjectNotFound { folder: String, identifier: String },

    #[error("Fetching '{identifier}' timed out after {seconds}s")]
    FetchTimeout { identifier: String, seconds: u64 },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Nothing to compose: all {plans} plan(s) ended up empty")]
    EmptyComposition { plans: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Storage,
    Drawing,
    Composition,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CutsheetError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::ValidationError { .. } | Self::InvalidSku { .. } | Self::SerializationError(_) => {
                ErrorCategory::Input
            }
            Self::HttpError(_)
            | Self::ObjectNotFound { .. }
            | Self::FetchTimeout { .. }
            | Self::StorageError { .. } => ErrorCategory::Storage,
            Self::DxfError(_) => ErrorCategory::Drawing,
            Self::EmptyComposition { .. } => ErrorCategory::Composition,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidSku { .. } => ErrorSeverity::Low,
            Self::HttpError(_) | Self::FetchTimeout { .. } | Self::StorageError { .. } => {
                ErrorSeverity::Medium
            }
            Self::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the TOML configuration and command line flags",
            ErrorCategory::Input => "Check the request file: plan names, item ids and SKUs",
            ErrorCategory::Storage => "Check storage connectivity and retry the failed items",
            ErrorCategory::Drawing => "Re-export the drawing as a valid DXF file",
            ErrorCategory::Composition => {
                "Make sure at least one plan has a plan-info drawing or a reachable item"
            }
            ErrorCategory::System => "Check file permissions and free disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::EmptyComposition { .. } => {
                "No drawing was produced because every plan was empty".to_string()
            }
            Self::ObjectNotFound { identifier, .. } => {
                format!("Drawing for item '{}' could not be found", identifier)
            }
            Self::FetchTimeout { identifier, .. } => {
                format!("Downloading item '{}' took too long", identifier)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CutsheetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_and_severity() {
        let sku = CutsheetError::InvalidSku {
            sku: "X".to_string(),
            reason: "short".to_string(),
        };
        assert_eq!(sku.category(), ErrorCategory::Input);
        assert_eq!(sku.severity(), ErrorSeverity::Low);

        let timeout = CutsheetError::FetchTimeout {
            identifier: "abc".to_string(),
            seconds: 30,
        };
        assert_eq!(timeout.category(), ErrorCategory::Storage);
        assert_eq!(timeout.severity(), ErrorSeverity::Medium);
        assert!(timeout.user_friendly_message().contains("abc"));

        let empty = CutsheetError::EmptyComposition { plans: 2 };
        assert_eq!(empty.category(), ErrorCategory::Composition);
        assert_eq!(empty.severity(), ErrorSeverity::High);
    }
}
