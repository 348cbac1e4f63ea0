use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header::ContentType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidPinId(String),
    #[error("{0}")]
    InvalidPayload(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("GPIO error: {0}")]
    Gpio(String),
    #[error("Blocking task failed: {0}")]
    Blocking(String),
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidPinId(_) | AppError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_)
            | AppError::Gpio(_)
            | AppError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type(ContentType::plaintext())
            .body(self.to_string())
    }
}
