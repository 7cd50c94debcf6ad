use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use keepsake_engine::{RateLimitError, SealFlowError, SessionApiError};
use log::error;
use thiserror::Error;

/// The server's error taxonomy. Every engine error is translated into one of these at the orchestrator boundary,
/// and the HTTP response body is derived from [`ServerError::client_message`], never from upstream error text.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Payment verification failed.")]
    PaymentVerificationFailed,
    #[error("Invalid or expired code.")]
    InvalidCode,
    #[error("Too many requests.")]
    RateLimited,
    #[error("Rate limiting is unavailable. {0}")]
    RateLimiterUnavailable(String),
    #[error("Session key generation exhausted its retries.")]
    CollisionExhausted,
    #[error("Payment gateway error. {0}")]
    GatewayError(String),
    #[error("The storage backend rejected the seal commit. {0}")]
    StorageCommitFailed(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ServerError {
    /// The message clients are allowed to see. Anything that could carry upstream error text, paths or secret
    /// material collapses to a fixed generic string; the full detail goes to the log instead.
    fn client_message(&self) -> &'static str {
        match self {
            Self::InvalidRequestBody(_) => "Invalid request.",
            Self::PaymentVerificationFailed => "Payment verification failed.",
            Self::InvalidCode => "Invalid or expired code.",
            Self::RateLimited => "Too many requests. Please try again later.",
            Self::RateLimiterUnavailable(_) => "Service temporarily unavailable. Please try again later.",
            Self::NoRecordFound(_) => "Not found.",
            Self::GatewayError(_) => "Payment gateway error. Please try again.",
            Self::StorageCommitFailed(_) => "Could not save your card. Please try again.",
            Self::InitializeError(_)
            | Self::ConfigurationError(_)
            | Self::CollisionExhausted
            | Self::BackendError(_)
            | Self::IOError(_)
            | Self::Unspecified(_) => "Internal server error.",
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::PaymentVerificationFailed => StatusCode::BAD_REQUEST,
            Self::InvalidCode => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::RateLimiterUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::StorageCommitFailed(_) => StatusCode::BAD_GATEWAY,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::CollisionExhausted => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            error!("💻️ {self}");
        }
        let body = match self {
            // The verification endpoint's failure contract includes the verified flag
            Self::PaymentVerificationFailed | Self::InvalidCode => {
                serde_json::json!({ "verified": false, "error": self.client_message() })
            },
            _ => serde_json::json!({ "error": self.client_message() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

impl From<SealFlowError> for ServerError {
    fn from(e: SealFlowError) -> Self {
        match e {
            SealFlowError::Validation(s) => Self::InvalidRequestBody(s),
            SealFlowError::SignatureMismatch => Self::PaymentVerificationFailed,
            SealFlowError::InvalidCode => Self::InvalidCode,
            SealFlowError::CollisionExhausted(_) => Self::CollisionExhausted,
            SealFlowError::StorageError(s) => Self::BackendError(s),
            SealFlowError::CommitFailed(s) => Self::StorageCommitFailed(s),
        }
    }
}

impl From<RateLimitError> for ServerError {
    fn from(e: RateLimitError) -> Self {
        match e {
            RateLimitError::LimitExceeded { .. } => Self::RateLimited,
            RateLimitError::Unavailable(s) => Self::RateLimiterUnavailable(s),
        }
    }
}

impl From<SessionApiError> for ServerError {
    fn from(e: SessionApiError) -> Self {
        match e {
            SessionApiError::InvalidKey => Self::InvalidRequestBody("malformed session key".to_string()),
            SessionApiError::NotFound => Self::NoRecordFound("session".to_string()),
            SessionApiError::StorageError(s) => Self::BackendError(s),
        }
    }
}
