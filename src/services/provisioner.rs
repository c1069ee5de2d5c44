//! Training resource provisioning.
//!
//! Drives the linear archive → upload → fine-tune → poll sequence that turns
//! a set of user photos into a trained face resource the generation endpoint
//! can reference. Each step returns its outcome and the sequence short-circuits
//! on the first failure.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::photo::Photo;
use crate::models::progress::{ProgressCheckpoint, ProgressHandler};
use crate::services::archive::{self, ArchiveEntry};
use crate::services::extract;
use crate::services::transport::{ApiRequest, HttpTransport, MultipartFile};

const FINE_TUNE_MODEL: &str = "facechain-finetune";
const UPLOAD_FIELD_NAME: &str = "files";
const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

#[derive(Serialize)]
struct FineTuneRequest<'a> {
    model: &'static str,
    training_file_ids: [&'a str; 1],
}

/// Provisions a trained face resource from a set of photos.
pub struct TrainingProvisioner {
    transport: Arc<dyn HttpTransport>,
    config: PipelineConfig,
}

impl TrainingProvisioner {
    pub fn new(transport: Arc<dyn HttpTransport>, config: PipelineConfig) -> Self {
        Self { transport, config }
    }

    /// Run the full provisioning sequence and return the trained resource id.
    ///
    /// Emits `ArchiveUploaded`, `FineTuneJobCreated` and
    /// `TrainingResourceReady` on `progress` as the stages complete.
    pub async fn provision(
        &self,
        photos: &[Photo],
        progress: &ProgressHandler,
    ) -> Result<String, PipelineError> {
        validate_photos(photos)?;

        tracing::info!(photos = photos.len(), "preparing training resource");

        let archive = build_training_archive(photos)?;
        tracing::debug!(archive_bytes = archive.len(), "training archive built");

        let file_id = self.upload_archive(archive).await?;
        tracing::info!(file_id = %file_id, "training archive uploaded");
        progress(ProgressCheckpoint::ArchiveUploaded);

        let job_id = self.create_fine_tune_job(&file_id).await?;
        tracing::info!(job_id = %job_id, "fine-tune job created");
        progress(ProgressCheckpoint::FineTuneJobCreated);

        let resource_id = self.poll_fine_tune_job(&job_id).await?;
        tracing::info!(job_id = %job_id, resource_id = %resource_id, "training resource ready");
        progress(ProgressCheckpoint::TrainingResourceReady);

        Ok(resource_id)
    }

    /// Upload the archive as a single multipart body and extract the file id.
    ///
    /// Takes the archive buffer by value: it is consumed by the request and
    /// released after the attempt, success or failure.
    async fn upload_archive(&self, archive: Vec<u8>) -> Result<String, PipelineError> {
        let file = MultipartFile {
            field_name: UPLOAD_FIELD_NAME.to_string(),
            file_name: format!("portrait-training-{}.zip", Uuid::new_v4()),
            content_type: ARCHIVE_CONTENT_TYPE.to_string(),
            bytes: archive,
        };

        let request = ApiRequest::post_multipart(self.config.files_url(), file)
            .bearer_auth(&self.config.api_key);

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;

        if !response.is_success() {
            return Err(PipelineError::Upload(format!(
                "file upload failed with status {}",
                response.status
            )));
        }

        let payload = response
            .json()
            .map_err(|e| PipelineError::Upload(format!("failed to parse upload response: {e}")))?;

        extract::uploaded_file_id(&payload)
            .ok_or_else(|| PipelineError::Upload("file upload response missing file_id".to_string()))
    }

    async fn create_fine_tune_job(&self, file_id: &str) -> Result<String, PipelineError> {
        let payload = FineTuneRequest {
            model: FINE_TUNE_MODEL,
            training_file_ids: [file_id],
        };
        let payload = serde_json::to_value(&payload)
            .map_err(|e| PipelineError::InvalidInput(format!("failed to encode fine-tune payload: {e}")))?;

        let request = ApiRequest::post_json(self.config.fine_tunes_url(), payload)
            .bearer_auth(&self.config.api_key);

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| PipelineError::Network(e.to_string()))?;

        if !response.is_success() {
            return Err(PipelineError::Api(format!(
                "fine-tune job creation failed with status {}",
                response.status
            )));
        }

        let payload = response
            .json()
            .map_err(|e| PipelineError::Api(format!("failed to parse fine-tune job response: {e}")))?;

        extract::fine_tune_job_id(&payload)
            .ok_or_else(|| PipelineError::Api("fine-tune job response missing job_id".to_string()))
    }

    /// Poll the fine-tune job until it reaches a terminal state or the
    /// attempt budget is exhausted.
    async fn poll_fine_tune_job(&self, job_id: &str) -> Result<String, PipelineError> {
        let max_attempts = self.config.max_training_poll_attempts;
        let interval = self.config.training_poll_interval();

        for attempt in 0..max_attempts {
            let request = ApiRequest::get(self.config.fine_tune_job_url(job_id))
                .bearer_auth(&self.config.api_key);

            let response = self
                .transport
                .execute(request)
                .await
                .map_err(|e| PipelineError::Network(e.to_string()))?;

            if !response.is_success() {
                return Err(PipelineError::Api(format!(
                    "failed to poll fine-tune job (status {})",
                    response.status
                )));
            }

            let payload = response.json().map_err(|e| {
                PipelineError::Api(format!("failed to parse fine-tune job response: {e}"))
            })?;
            let output = payload
                .get("output")
                .ok_or_else(|| PipelineError::Api("invalid fine-tune job response".to_string()))?;

            match extract::status(output).as_str() {
                "SUCCEEDED" => {
                    return extract::fine_tuned_resource_id(output).ok_or_else(|| {
                        PipelineError::Api(
                            "fine-tune job succeeded but no resource id returned".to_string(),
                        )
                    });
                }
                "FAILED" => {
                    let message = extract::error_message(output)
                        .unwrap_or_else(|| "fine-tune job failed".to_string());
                    return Err(PipelineError::Api(message));
                }
                status => {
                    tracing::debug!(job_id = %job_id, status = %status, attempt, "fine-tune job pending");
                    tokio::time::sleep(interval).await;
                }
            }
        }

        Err(PipelineError::Api(format!(
            "fine-tune job timeout after {max_attempts} attempts"
        )))
    }
}

/// Every photo must carry a payload before any network call is attempted.
pub(crate) fn validate_photos(photos: &[Photo]) -> Result<(), PipelineError> {
    if photos.is_empty() {
        return Err(PipelineError::InvalidInput(
            "at least one photo is required".to_string(),
        ));
    }
    for photo in photos {
        if !photo.has_payload() {
            return Err(PipelineError::InvalidInput(format!(
                "photo {} has no image data",
                photo.id
            )));
        }
    }
    Ok(())
}

/// Pack the photos into the upload container under index-based names.
fn build_training_archive(photos: &[Photo]) -> Result<Vec<u8>, PipelineError> {
    let entries: Vec<ArchiveEntry<'_>> = photos
        .iter()
        .enumerate()
        .map(|(index, photo)| ArchiveEntry::new(format!("photo_{index}.jpg"), &photo.bytes))
        .collect();

    archive::build_archive(&entries).map_err(|e| PipelineError::FileIo(e.to_string()))
}
