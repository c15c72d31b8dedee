//! API error types shared by every external collaborator

use std::fmt;

/// Errors that can occur when talking to the backend, OTP or geocoding services
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// 401 Unauthorized - key invalid or expired
    Unauthorized { service: String },
    /// 403 Forbidden - key lacks required permissions (e.g. row-level security)
    Forbidden { service: String },
    /// 429 Rate Limited
    RateLimited {
        service: String,
        retry_after_secs: Option<u64>,
    },
    /// Network or timeout error
    NetworkError { service: String, message: String },
    /// Other HTTP errors
    HttpError {
        service: String,
        status: u16,
        message: String,
    },
    /// Response body did not match the expected shape
    Parse { service: String, message: String },
    /// Service not configured (no URL or key)
    NotConfigured { service: String },
}

impl ApiError {
    /// Check if this is an authentication error (401 or 403)
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized { .. } | ApiError::Forbidden { .. }
        )
    }

    /// Whether the user can reasonably resubmit and expect a different outcome
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::NetworkError { .. } | ApiError::RateLimited { .. } => true,
            ApiError::HttpError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get the service name for this error
    pub fn service_name(&self) -> &str {
        match self {
            ApiError::Unauthorized { service }
            | ApiError::Forbidden { service }
            | ApiError::RateLimited { service, .. }
            | ApiError::NetworkError { service, .. }
            | ApiError::HttpError { service, .. }
            | ApiError::Parse { service, .. }
            | ApiError::NotConfigured { service } => service,
        }
    }

    /// Get retry-after seconds if rate limited
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::RateLimited {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }

    pub fn unauthorized(service: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            service: service.into(),
        }
    }

    pub fn forbidden(service: impl Into<String>) -> Self {
        ApiError::Forbidden {
            service: service.into(),
        }
    }

    pub fn rate_limited(service: impl Into<String>, retry_after: Option<u64>) -> Self {
        ApiError::RateLimited {
            service: service.into(),
            retry_after_secs: retry_after,
        }
    }

    pub fn network(service: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::NetworkError {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn http(service: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        ApiError::HttpError {
            service: service.into(),
            status,
            message: message.into(),
        }
    }

    pub fn parse(service: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Parse {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn not_configured(service: impl Into<String>) -> Self {
        ApiError::NotConfigured {
            service: service.into(),
        }
    }

    /// Map a non-success HTTP response to an error.
    ///
    /// Consumes the response to read its body for the error message.
    pub async fn from_response(service: &str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        let body = response.text().await.unwrap_or_default();

        match status {
            401 => ApiError::unauthorized(service),
            403 => ApiError::forbidden(service),
            404 => ApiError::http(service, 404, format!("Not found: {}", body)),
            429 => ApiError::rate_limited(service, retry_after),
            _ => ApiError::http(service, status, body),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized { service } => {
                write!(f, "{}: Unauthorized (401) - check the API key", service)
            }
            ApiError::Forbidden { service } => {
                write!(f, "{}: Forbidden (403) - insufficient permissions", service)
            }
            ApiError::RateLimited {
                service,
                retry_after_secs,
            } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "{}: Rate limited - retry after {}s", service, secs)
                } else {
                    write!(f, "{}: Rate limited", service)
                }
            }
            ApiError::NetworkError { service, message } => {
                write!(f, "{}: Network error - {}", service, message)
            }
            ApiError::HttpError {
                service,
                status,
                message,
            } => {
                write!(f, "{}: HTTP {} - {}", service, status, message)
            }
            ApiError::Parse { service, message } => {
                write!(f, "{}: Parse error - {}", service, message)
            }
            ApiError::NotConfigured { service } => {
                write!(f, "{}: Not configured (missing URL or key)", service)
            }
        }
    }
}

impl std::error::Error for ApiError {}
