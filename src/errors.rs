// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use uuid::Uuid;

pub const TRY_ON_FAILED: &str =
    "Failed to generate the virtual try-on image. Please try different images.";
pub const EDIT_FAILED: &str = "Failed to edit the image. Please try a different prompt.";
pub const ADVICE_FAILED: &str =
    "Sorry, I couldn't get any style advice at the moment. Please try again.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StyleError {
    #[error("Failed to read image: {0}")]
    Io(String),

    #[error("{0}")]
    Generation(String),

    #[error("{0}")]
    Advice(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),
}

impl From<std::io::Error> for StyleError {
    fn from(err: std::io::Error) -> Self {
        StyleError::Io(err.to_string())
    }
}

impl ResponseError for StyleError {
    fn error_response(&self) -> HttpResponse {
        match self {
            StyleError::Io(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Image read error",
                "message": self.to_string()
            })),
            StyleError::Generation(_) | StyleError::Advice(_) => {
                HttpResponse::BadGateway().json(serde_json::json!({
                    "error": "AI service error",
                    "message": self.to_string()
                }))
            }
            StyleError::Upstream(_) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "error": "AI service error",
                "message": "The AI service is unavailable"
            })),
            StyleError::Validation(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Validation error",
                "message": self.to_string()
            })),
            StyleError::PayloadTooLarge(_) => {
                HttpResponse::PayloadTooLarge().json(serde_json::json!({
                    "error": "Payload too large",
                    "message": self.to_string()
                }))
            }
            StyleError::SessionNotFound(_) => HttpResponse::NotFound().json(serde_json::json!({
                "error": "Not found",
                "message": self.to_string()
            })),
        }
    }
}
