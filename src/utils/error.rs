use thiserror::Error;

#[derive(Error, Debug)]
pub enum CopytoolError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Drive API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("malformed lustre fid: {fid}")]
    MalformedFid { fid: String },

    #[error("entry for lustre_fid {fid} not found")]
    EntryNotFound { fid: String },

    #[error("Unauthorized access: {reason}")]
    Unauthorized { reason: String },

    #[error("Upload protocol error: {message}")]
    UploadError { message: String },

    #[error("{operation}: aborting exponential backoff after {attempts} attempts: {source}")]
    BackoffExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<CopytoolError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Api,
    Authorization,
    Configuration,
    Input,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl CopytoolError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn upload(message: impl Into<String>) -> Self {
        Self::UploadError {
            message: message.into(),
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) => ErrorCategory::Network,
            Self::ApiError { .. } | Self::UploadError { .. } => ErrorCategory::Api,
            Self::BackoffExhausted { source, .. } => source.category(),
            Self::Unauthorized { .. } => ErrorCategory::Authorization,
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::MalformedFid { .. } | Self::EntryNotFound { .. } => ErrorCategory::Input,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::BackoffExhausted { .. } | Self::HttpError(_) => ErrorSeverity::Medium,
            Self::Unauthorized { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// Whether the Drive request that produced this error is worth retrying.
    ///
    /// 403 is how Drive reports user rate limits, so it is retried along with
    /// 429 and every 5xx. Other 4xx responses are fatal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(e) => !e.is_builder() && !e.is_redirect(),
            Self::ApiError { status, .. } => *status == 403 || *status == 429 || *status >= 500,
            Self::IoError(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }

    /// Process exit status reported back to lhsmtool_cmd.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MalformedFid { fid } => format!("malformed lustre fid: {}", fid),
            Self::EntryNotFound { fid } => {
                format!("no archived copy of {} found in Google Drive", fid)
            }
            Self::Unauthorized { .. } => "Google Drive credentials are missing or invalid".to_string(),
            Self::BackoffExhausted { operation, .. } => {
                format!("{} kept failing, giving up", operation)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "check network connectivity to www.googleapis.com",
            ErrorCategory::Api => "inspect the Drive error message; the HSM request can be retried",
            ErrorCategory::Authorization => {
                "run ct_gdrive_oauth2 --client-secret <file> --creds-dir <dir> to store new credentials"
            }
            ErrorCategory::Configuration => "check command line options and the --config file",
            ErrorCategory::Input => "check the FID passed by lhsmtool_cmd and the --gdrive-root folder",
            ErrorCategory::Storage => "check the inherited file descriptor and local permissions",
        }
    }
}

pub type Result<T> = std::result::Result<T, CopytoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_retry_classification() {
        assert!(CopytoolError::api(403, "rate limit").is_retryable());
        assert!(CopytoolError::api(429, "too many").is_retryable());
        assert!(CopytoolError::api(500, "backend").is_retryable());
        assert!(CopytoolError::api(503, "unavailable").is_retryable());
        assert!(!CopytoolError::api(404, "not found").is_retryable());
        assert!(!CopytoolError::api(400, "bad request").is_retryable());
        assert!(!CopytoolError::api(401, "invalid credentials").is_retryable());
    }

    #[test]
    fn test_exit_codes() {
        let not_found = CopytoolError::EntryNotFound {
            fid: "0x1:0x2:0x0".to_string(),
        };
        assert_eq!(not_found.exit_code(), 1);

        let exhausted = CopytoolError::BackoffExhausted {
            operation: "list_files".to_string(),
            attempts: 11,
            source: Box::new(CopytoolError::api(503, "unavailable")),
        };
        assert_eq!(exhausted.exit_code(), 2);
        assert_eq!(exhausted.category(), ErrorCategory::Api);

        assert_eq!(CopytoolError::unauthorized("no creds").exit_code(), 3);
    }
}
