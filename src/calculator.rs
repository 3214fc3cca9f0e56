//! Sketch analysis: image in, answer records out

use std::sync::Arc;

use crate::error::Result;
use crate::imaging::{self, NormalizedImage};
use crate::model::VisionModel;
use crate::prompt;
use crate::repair::RepairPipeline;
use crate::types::{AnswerRecord, VariableMapping};

/// Runs one sketch through normalization, the model, and reply repair
pub struct Calculator {
    model: Arc<dyn VisionModel>,
    pipeline: RepairPipeline,
}

impl Calculator {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self {
            model,
            pipeline: RepairPipeline::standard(),
        }
    }

    /// Analyze a base64 data URI image.
    ///
    /// Image and model failures are returned as errors. An unparseable model
    /// reply is not an error: it comes back as the single sentinel record.
    pub async fn analyze_image(
        &self,
        image_uri: String,
        vars: &VariableMapping,
    ) -> Result<Vec<AnswerRecord>> {
        let image =
            tokio::task::spawn_blocking(move || imaging::normalize_data_uri(&image_uri)).await??;
        self.analyze_normalized(&image, vars).await
    }

    /// Analyze raw image file bytes
    pub async fn analyze_bytes(
        &self,
        bytes: Vec<u8>,
        vars: &VariableMapping,
    ) -> Result<Vec<AnswerRecord>> {
        let image = tokio::task::spawn_blocking(move || imaging::normalize_bytes(&bytes)).await??;
        self.analyze_normalized(&image, vars).await
    }

    async fn analyze_normalized(
        &self,
        image: &NormalizedImage,
        vars: &VariableMapping,
    ) -> Result<Vec<AnswerRecord>> {
        let prompt = prompt::build_prompt(vars)?;

        let text = self.model.generate(&prompt, image).await?;
        tracing::debug!("Reply from {}: {}", self.model.name(), text);

        let records = self.pipeline.normalize(&text);
        tracing::info!("Analyzed sketch: {} answer(s)", records.len());
        Ok(records)
    }
}
