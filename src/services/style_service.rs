// src/services/style_service.rs
use crate::errors::StyleError;
use crate::models::{EncodedImagePart, StyleAdvice};
use async_trait::async_trait;

/// The three generative operations the flows depend on. Each call is a single
/// attempt; failures come back as user-facing `Generation`/`Advice` errors.
#[async_trait]
pub trait StyleService: Send + Sync {
    async fn compose_try_on(
        &self,
        model: &EncodedImagePart,
        clothing: &EncodedImagePart,
    ) -> Result<EncodedImagePart, StyleError>;

    async fn edit_image(
        &self,
        base: &EncodedImagePart,
        instruction: &str,
    ) -> Result<EncodedImagePart, StyleError>;

    async fn style_advice(&self, prompt: &str) -> Result<StyleAdvice, StyleError>;

    fn name(&self) -> &str;
}
