//! Request errors and their HTTP mapping.

use accident_risk_database::DbError;
use accident_risk_features::EncodeError;
use accident_risk_model::ModelError;
use accident_risk_model_models::FormatError;
use accident_risk_server_models::{ApiErrorBody, ApiErrorKind};
use accident_risk_weather::WeatherError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

/// Everything a request handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested output format is not supported.
    #[error("{0}")]
    Format(String),

    /// The request or the data it resolved to is invalid.
    #[error("{0}")]
    Data(String),

    #[error("{0}")]
    NotFound(String),

    /// The weather provider failed.
    #[error("{0}")]
    Upstream(String),

    /// A database call did not finish in time.
    #[error("{what} timed out")]
    Timeout { what: &'static str },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub const fn kind(&self) -> ApiErrorKind {
        match self {
            Self::Format(_) => ApiErrorKind::InvalidFormat,
            Self::Data(_) => ApiErrorKind::InvalidData,
            Self::NotFound(_) => ApiErrorKind::NotFound,
            Self::Upstream(_) => ApiErrorKind::Upstream,
            Self::Timeout { .. } => ApiErrorKind::Timeout,
            Self::Internal(_) => ApiErrorKind::Internal,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Format(_) => StatusCode::BAD_REQUEST,
            Self::Data(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) | Self::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {self}");
        } else {
            log::debug!("Request rejected: {self}");
        }

        // Internal details stay in the log.
        let error = match self {
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(status).json(ApiErrorBody {
            error,
            kind: self.kind(),
        })
    }
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Format(e) => Self::Format(e.to_string()),
            e if e.is_data_error() => Self::Data(e.to_string()),
            e => Self::Internal(e.to_string()),
        }
    }
}

impl From<FormatError> for ApiError {
    fn from(e: FormatError) -> Self {
        Self::Format(e.to_string())
    }
}

impl From<EncodeError> for ApiError {
    fn from(e: EncodeError) -> Self {
        if e.is_data_error() {
            Self::Data(e.to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

impl From<WeatherError> for ApiError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::Format { .. } => Self::Format(e.to_string()),
            WeatherError::NotFound { .. } => Self::NotFound(e.to_string()),
            WeatherError::Config { .. } => Self::Internal(e.to_string()),
            WeatherError::Upstream { .. }
            | WeatherError::Rejected { .. }
            | WeatherError::Json(_)
            | WeatherError::Http(_) => Self::Upstream(e.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        Self::Internal(e.to_string())
    }
}
