use actix_web::http::StatusCode;
use thiserror::Error;

use crate::db::StoreError;
use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Generation Error: {0}")]
    Generation(#[from] LlmError),
    #[error("Generation Error: {0}")]
    EmptyGeneration(String),
    #[error("Persistence Error: {0}")]
    Persistence(#[from] StoreError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Generation(_) | AppError::EmptyGeneration(_) | AppError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text suitable for showing to the person who made the request.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Generation(LlmError::Unauthorized(_)) => {
                "Invalid Anthropic API key. Please check your ANTHROPIC_API_KEY environment variable.".to_string()
            }
            AppError::Generation(LlmError::RateLimited) => "Rate limit exceeded. Please try again later.".to_string(),
            AppError::Generation(e) => e.provider_message(),
            AppError::EmptyGeneration(message) => message.clone(),
            AppError::Validation(message) | AppError::NotFound(message) => message.clone(),
            AppError::Persistence(e) => e.to_string(),
        }
    }
}
