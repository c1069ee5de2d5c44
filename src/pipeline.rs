//! Pipeline entry point.
//!
//! Validates inputs, sequences provisioning and generation, and relays
//! progress checkpoints to the caller. A pipeline run is not re-entrant:
//! callers guard against starting a new run while one is in flight.

use std::sync::Arc;

use crate::config::{PipelineConfig, PollingConfig};
use crate::error::PipelineError;
use crate::models::photo::Photo;
use crate::models::progress::ProgressCheckpoint;
use crate::models::template::Template;
use crate::services::dispatcher::GenerationDispatcher;
use crate::services::provisioner::{validate_photos, TrainingProvisioner};
use crate::services::transport::{HttpTransport, ReqwestTransport};

/// Externally visible portrait generation pipeline.
pub struct PortraitPipeline {
    transport: Arc<dyn HttpTransport>,
    config: PipelineConfig,
}

impl PortraitPipeline {
    /// Build a pipeline with the production HTTP transport.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let transport = ReqwestTransport::new(config.request_timeout())
            .map_err(|e| PipelineError::Network(e.to_string()))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build a pipeline over a caller-supplied transport (test seam).
    pub fn with_transport(config: PipelineConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport, config }
    }

    /// Replace the polling intervals and attempt budgets. Consumed by the
    /// settings surface; takes effect for subsequent runs.
    pub fn configure(&mut self, polling: PollingConfig) {
        self.config.apply_polling(polling);
    }

    /// Run the full pipeline: provision a training resource from `photos`,
    /// then generate portraits for every template.
    ///
    /// Returns the generated image URLs flattened in template order, or the
    /// first classified error. Checkpoints from the provisioning stage are
    /// relayed to `progress` as they occur.
    pub async fn run(
        &self,
        photos: &[Photo],
        templates: &[Template],
        progress: impl Fn(ProgressCheckpoint) + Send + Sync + 'static,
    ) -> Result<Vec<String>, PipelineError> {
        tracing::info!(
            photos = photos.len(),
            templates = templates.len(),
            "starting portrait generation"
        );

        validate_photos(photos)?;
        if templates.is_empty() {
            return Err(PipelineError::InvalidInput(
                "no templates available".to_string(),
            ));
        }

        // Each run gets freshly constructed stages with their own config
        // clone, so a reconfigure between runs can never tear a run in half.
        let provisioner =
            TrainingProvisioner::new(Arc::clone(&self.transport), self.config.clone());
        let resource_id = match provisioner.provision(photos, &progress).await {
            Ok(resource_id) => resource_id,
            Err(error) => {
                tracing::error!(error = %error, "training resource preparation failed");
                return Err(error);
            }
        };

        let dispatcher =
            GenerationDispatcher::new(Arc::clone(&self.transport), self.config.clone());
        dispatcher.generate(&resource_id, templates).await
    }
}
