//! Concurrent generation dispatch.
//!
//! Submits one generation request per template against a trained resource,
//! polls any asynchronously queued task to completion, and aggregates the
//! per-template outcomes. All submissions run concurrently; the final URL
//! ordering is keyed by template index, never by completion order.

use std::sync::Arc;

use futures::future;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::template::Template;
use crate::services::extract;
use crate::services::transport::{ApiRequest, HttpTransport};

const GENERATION_MODEL: &str = "facechain-generation";
const RESOURCE_TYPE: &str = "facelora";
const ASYNC_MODE_HEADER: &str = "X-DashScope-Async";

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'static str,
    parameters: GenerationParameters<'a>,
    resources: [ResourceRef<'a>; 1],
}

#[derive(Serialize)]
struct GenerationParameters<'a> {
    style: &'a str,
    size: &'a str,
    n: u32,
}

#[derive(Serialize)]
struct ResourceRef<'a> {
    resource_id: &'a str,
    resource_type: &'static str,
}

/// Fans generation requests out across templates and collects the results.
pub struct GenerationDispatcher {
    transport: Arc<dyn HttpTransport>,
    config: PipelineConfig,
}

impl GenerationDispatcher {
    pub fn new(transport: Arc<dyn HttpTransport>, config: PipelineConfig) -> Self {
        Self { transport, config }
    }

    /// Generate portraits for every template concurrently and return the
    /// flattened URL list in template submission order.
    ///
    /// Any per-template failure degrades the whole call: the caller receives
    /// an aggregate error rather than a partial URL list.
    pub async fn generate(
        &self,
        resource_id: &str,
        templates: &[Template],
    ) -> Result<Vec<String>, PipelineError> {
        let template_count = templates.len();

        let workers = templates.iter().enumerate().map(|(index, template)| async move {
            tracing::debug!(
                index,
                template = %template.name,
                resource_id = %resource_id,
                "submitting generation request"
            );
            (index, self.run_template(resource_id, template).await)
        });

        // Completion barrier: every template reaches a terminal outcome
        // before aggregation. One writer per result slot, keyed by index.
        let outcomes = future::join_all(workers).await;

        let mut slots: Vec<Vec<String>> = vec![Vec::new(); template_count];
        let mut failures: Vec<String> = Vec::new();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(urls) => slots[index] = urls,
                Err(error) => failures.push(error.to_string()),
            }
        }

        let succeeded = slots.iter().filter(|urls| !urls.is_empty()).count();

        if !failures.is_empty() {
            let detail = failures.join("; ");
            if succeeded == 0 {
                tracing::error!(templates = template_count, "generation failed for all templates");
                return Err(PipelineError::Api(format!(
                    "generation failed for all templates: {detail}"
                )));
            }
            tracing::error!(
                succeeded,
                templates = template_count,
                "generation partially failed"
            );
            return Err(PipelineError::Api(format!(
                "generation partially failed ({succeeded} of {template_count} succeeded): {detail}"
            )));
        }

        let urls: Vec<String> = slots.into_iter().flatten().collect();
        if urls.is_empty() {
            return Err(PipelineError::Api(
                "generation completed but returned no images".to_string(),
            ));
        }

        tracing::info!(images = urls.len(), templates = template_count, "generation completed");
        Ok(urls)
    }

    /// Submit one template and drive it to a terminal outcome, polling if the
    /// service queued the request asynchronously.
    async fn run_template(
        &self,
        resource_id: &str,
        template: &Template,
    ) -> Result<Vec<String>, PipelineError> {
        let payload = GenerationRequest {
            model: GENERATION_MODEL,
            parameters: GenerationParameters {
                style: &template.style_code,
                size: &self.config.image_size,
                n: self.config.images_per_template,
            },
            resources: [ResourceRef {
                resource_id,
                resource_type: RESOURCE_TYPE,
            }],
        };
        let payload = serde_json::to_value(&payload).map_err(|e| {
            PipelineError::InvalidInput(format!("failed to encode generation payload: {e}"))
        })?;

        let request = ApiRequest::post_json(self.config.generation_url(), payload)
            .bearer_auth(&self.config.api_key)
            .header(ASYNC_MODE_HEADER, "enable");

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| PipelineError::Network(e.to_string()))?;

        if !response.is_success() {
            return Err(PipelineError::Api(format!(
                "generation request failed with status {}",
                response.status
            )));
        }

        let payload = response
            .json()
            .map_err(|e| PipelineError::Api(format!("failed to parse generation response: {e}")))?;

        match payload.get("output") {
            Some(output) => {
                let urls = extract::image_urls(output);
                if !urls.is_empty() {
                    let reported = extract::reported_image_count(&payload, urls.len());
                    tracing::debug!(
                        template = %template.name,
                        images = urls.len(),
                        reported,
                        "generation returned image URLs"
                    );
                    return Ok(urls);
                }
                if let Some(task_id) = extract::task_id(output) {
                    tracing::debug!(template = %template.name, task_id = %task_id, "generation queued");
                    return self.poll_task(&task_id, template).await;
                }
                Err(PipelineError::Api(
                    "unexpected generation response format".to_string(),
                ))
            }
            // Some deployments return the result at the root of the payload.
            None => {
                let urls = extract::image_urls(&payload);
                if urls.is_empty() {
                    return Err(PipelineError::Api(
                        "unable to parse generation response".to_string(),
                    ));
                }
                Ok(urls)
            }
        }
    }

    /// Poll a queued generation task until it reaches a terminal state or the
    /// attempt budget is exhausted.
    async fn poll_task(
        &self,
        task_id: &str,
        template: &Template,
    ) -> Result<Vec<String>, PipelineError> {
        let max_attempts = self.config.max_generation_poll_attempts;
        let interval = self.config.generation_poll_interval();

        for attempt in 0..max_attempts {
            let request =
                ApiRequest::get(self.config.task_url(task_id)).bearer_auth(&self.config.api_key);

            let response = self
                .transport
                .execute(request)
                .await
                .map_err(|e| PipelineError::Network(e.to_string()))?;

            if !response.is_success() {
                return Err(PipelineError::Api(format!(
                    "failed to poll generation task (status {})",
                    response.status
                )));
            }

            let payload = response
                .json()
                .map_err(|e| PipelineError::Api(format!("failed to parse task response: {e}")))?;
            let output = payload
                .get("output")
                .ok_or_else(|| PipelineError::Api("invalid task response".to_string()))?;

            match extract::status(output).as_str() {
                "SUCCEEDED" => {
                    let urls = extract::image_urls(output);
                    if urls.is_empty() {
                        return Err(PipelineError::Api(
                            "task succeeded but no image URL returned".to_string(),
                        ));
                    }
                    let reported = extract::reported_image_count(output, urls.len());
                    tracing::debug!(
                        task_id = %task_id,
                        template = %template.name,
                        images = urls.len(),
                        reported,
                        "generation task succeeded"
                    );
                    return Ok(urls);
                }
                "FAILED" => {
                    let message = extract::error_message(output)
                        .unwrap_or_else(|| "generation failed".to_string());
                    return Err(PipelineError::Api(message));
                }
                status => {
                    tracing::trace!(task_id = %task_id, status = %status, attempt, "task still running");
                    tokio::time::sleep(interval).await;
                }
            }
        }

        Err(PipelineError::Api(format!(
            "generation polling timeout after {max_attempts} attempts"
        )))
    }
}
