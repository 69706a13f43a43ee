use serde::{Deserialize, Serialize};

/// Default LM Studio endpoint (OpenAI-compatible, includes the `/v1` prefix).
pub const DEFAULT_LM_STUDIO_URL: &str = "http://localhost:1234/v1";

/// Which backend serves model invocations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelProvider {
    /// Deterministic canned responses, no network.
    #[default]
    Mock,
    /// A local LM Studio server speaking the OpenAI chat completions API.
    LmStudio,
}

/// Connection settings for the model gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Backend serving invocations.
    #[serde(default)]
    pub provider: ModelProvider,
    /// LM Studio accepts any model name.
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Sent as a Bearer token when set.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Overrides the default LM Studio URL.
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Completion token limit.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// HTTP request timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Answer from the mock model when the remote backend fails.
    #[serde(default = "default_fallback_to_mock")]
    pub fallback_to_mock: bool,
}

fn default_model_id() -> String {
    "local-model".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_fallback_to_mock() -> bool {
    true
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::default(),
            model_id: default_model_id(),
            api_key: None,
            api_base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            fallback_to_mock: default_fallback_to_mock(),
        }
    }
}

impl ModelConfig {
    /// Base URL of the OpenAI-compatible API, without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_LM_STUDIO_URL)
            .trim_end_matches('/')
    }

    /// Apply `USE_LM_STUDIO`, `LM_STUDIO_URL` and `LM_STUDIO_API_KEY` from the
    /// process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply the LM Studio overrides using an arbitrary variable lookup.
    ///
    /// `USE_LM_STUDIO=true` or any non-empty `LM_STUDIO_URL` switches the
    /// provider to [`ModelProvider::LmStudio`].
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let url = lookup("LM_STUDIO_URL").filter(|u| !u.trim().is_empty());
        let enabled = lookup("USE_LM_STUDIO").is_some_and(|v| v.eq_ignore_ascii_case("true"));

        if enabled || url.is_some() {
            self.provider = ModelProvider::LmStudio;
        }
        if let Some(url) = url {
            self.api_base_url = Some(url);
        }
        if let Some(key) = lookup("LM_STUDIO_API_KEY").filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        self
    }
}
