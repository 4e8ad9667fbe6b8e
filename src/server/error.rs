use crate::core::error::{ProviderError, ValidationError};
use crate::server::models::ErrorBody;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Request failures, mapped onto HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Provider(ProviderError::Rejected { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Provider(ProviderError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Provider(ProviderError::Upstream { .. }) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
