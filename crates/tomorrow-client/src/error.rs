/// Errors returned by [`crate::api::ApiClient`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("cannot build request url for '{0}'")]
    InvalidUrl(String),

    #[error("what-if weight '{field}' must be between 0 and 100")]
    InvalidWeights { field: &'static str },

    #[error("scenario analysis still in progress after {attempts} attempts")]
    StillInProgress { attempts: u32 },
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Request(_) => "REQUEST_FAILED",
            ApiError::Status { .. } => "HTTP_STATUS",
            ApiError::InvalidUrl(_) => "INVALID_URL",
            ApiError::InvalidWeights { .. } => "INVALID_WEIGHTS",
            ApiError::StillInProgress { .. } => "STILL_IN_PROGRESS",
        }
    }

    /// True for failures of the network exchange itself, as opposed to
    /// requests rejected before being sent.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Request(_) | ApiError::Status { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("api_base_url '{0}' is not a valid http(s) URL")]
    InvalidBaseUrl(String),

    #[error("{field} must be > 0")]
    ZeroValue { field: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_display() {
        let error = ApiError::Status {
            path: "/api/system/status".to_string(),
            status: 503,
        };
        assert_eq!(error.to_string(), "/api/system/status returned HTTP 503");
        assert_eq!(error.error_code(), "HTTP_STATUS");
        assert!(error.is_transport());
    }

    #[test]
    fn invalid_weights_is_not_transport() {
        let error = ApiError::InvalidWeights { field: "energy" };
        assert_eq!(
            error.to_string(),
            "what-if weight 'energy' must be between 0 and 100"
        );
        assert!(!error.is_transport());
    }

    #[test]
    fn config_error_display() {
        let error = ConfigError::ZeroValue {
            field: "refresh_interval_secs",
        };
        assert_eq!(error.to_string(), "refresh_interval_secs must be > 0");
    }
}
