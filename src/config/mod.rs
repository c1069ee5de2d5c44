use std::time::Duration;

use serde::Deserialize;

/// Pipeline configuration.
///
/// Kept flat so it deserializes from the environment via `envy`; every stage
/// receives an owned clone at construction time, so concurrent runs can never
/// observe each other's settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// DashScope API key sent as a bearer credential on every request.
    pub api_key: String,

    /// Service base URL (no trailing slash).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout applied by the HTTP client.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Number of images requested per template.
    #[serde(default = "default_images_per_template")]
    pub images_per_template: u32,

    /// Output resolution in the service's "width*height" notation.
    #[serde(default = "default_image_size")]
    pub image_size: String,

    /// Seconds between fine-tune job status polls.
    #[serde(default = "default_training_poll_interval_secs")]
    pub training_poll_interval_secs: u64,

    /// Fine-tune polling attempt budget (~6 minutes at the default interval).
    #[serde(default = "default_max_training_poll_attempts")]
    pub max_training_poll_attempts: u32,

    /// Seconds between generation task status polls.
    #[serde(default = "default_generation_poll_interval_secs")]
    pub generation_poll_interval_secs: u64,

    /// Generation polling attempt budget (~90 seconds at the default interval).
    #[serde(default = "default_max_generation_poll_attempts")]
    pub max_generation_poll_attempts: u32,
}

fn default_base_url() -> String {
    "https://dashscope.aliyuncs.com/api/v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_images_per_template() -> u32 {
    4
}

fn default_image_size() -> String {
    "768*1024".to_string()
}

fn default_training_poll_interval_secs() -> u64 {
    10
}

fn default_max_training_poll_attempts() -> u32 {
    36
}

fn default_generation_poll_interval_secs() -> u64 {
    5
}

fn default_max_generation_poll_attempts() -> u32 {
    18
}

impl PipelineConfig {
    /// Load configuration from `FACECHAIN_`-prefixed environment variables
    /// (e.g. `FACECHAIN_API_KEY`), reading a `.env` file if present.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed("FACECHAIN_").from_env()
    }

    /// Construct a config with defaults for everything but the API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            images_per_template: default_images_per_template(),
            image_size: default_image_size(),
            training_poll_interval_secs: default_training_poll_interval_secs(),
            max_training_poll_attempts: default_max_training_poll_attempts(),
            generation_poll_interval_secs: default_generation_poll_interval_secs(),
            max_generation_poll_attempts: default_max_generation_poll_attempts(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn training_poll_interval(&self) -> Duration {
        Duration::from_secs(self.training_poll_interval_secs)
    }

    pub fn generation_poll_interval(&self) -> Duration {
        Duration::from_secs(self.generation_poll_interval_secs)
    }

    // ── Endpoint URLs ────────────────────────────────────────────────

    pub fn files_url(&self) -> String {
        format!("{}/files", self.base_url)
    }

    pub fn fine_tunes_url(&self) -> String {
        format!("{}/fine-tunes", self.base_url)
    }

    pub fn fine_tune_job_url(&self, job_id: &str) -> String {
        format!("{}/fine-tunes/{}", self.base_url, job_id)
    }

    pub fn generation_url(&self) -> String {
        format!("{}/services/aigc/album/gen_potrait", self.base_url)
    }

    pub fn task_url(&self, task_id: &str) -> String {
        format!("{}/tasks/{}", self.base_url, task_id)
    }

    /// Current polling settings as a standalone parameter object.
    pub fn polling(&self) -> PollingConfig {
        PollingConfig {
            training_poll_interval: self.training_poll_interval(),
            max_training_poll_attempts: self.max_training_poll_attempts,
            generation_poll_interval: self.generation_poll_interval(),
            max_generation_poll_attempts: self.max_generation_poll_attempts,
        }
    }

    /// Replace the polling settings. Consumed by the settings surface.
    pub fn apply_polling(&mut self, polling: PollingConfig) {
        self.training_poll_interval_secs = polling.training_poll_interval.as_secs();
        self.max_training_poll_attempts = polling.max_training_poll_attempts;
        self.generation_poll_interval_secs = polling.generation_poll_interval.as_secs();
        self.max_generation_poll_attempts = polling.max_generation_poll_attempts;
    }
}

/// Polling intervals and attempt budgets, grouped so the caller-facing
/// `configure` surface takes one explicit parameter object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub training_poll_interval: Duration,
    pub max_training_poll_attempts: u32,
    pub generation_poll_interval: Duration,
    pub max_generation_poll_attempts: u32,
}
