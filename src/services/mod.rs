// src/services/mod.rs
pub mod gemini_service;
pub mod image_encoder;
pub mod session_store;
pub mod style_service;
#[cfg(test)]
pub mod testing;

pub use gemini_service::GeminiService;
pub use session_store::{SessionLimits, SessionStore};
pub use style_service::StyleService;
