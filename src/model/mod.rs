//! External multimodal model boundary

mod gemini;

use async_trait::async_trait;

use crate::error::Result;
use crate::imaging::NormalizedImage;

pub use gemini::GeminiClient;

/// A model that reads an image and answers a text prompt with free text
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send one prompt plus image and return the raw reply text
    async fn generate(&self, prompt: &str, image: &NormalizedImage) -> Result<String>;

    /// Model identifier for logs
    fn name(&self) -> &str;
}
