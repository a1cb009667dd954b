use std::time::Duration;

use crate::error::ProviderError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Provider {
    #[default]
    Gemini,
    Openai,
    Grok,
}

/// Wire dialect spoken by a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    /// `models/{model}:generateContent` with `responseSchema`.
    GeminiGenerateContent,
    /// `chat/completions` with a `json_schema` response format.
    ChatCompletions,
}

pub struct ProviderConfig {
    pub base_url: &'static str,
    pub model: &'static str,
    pub env_var: &'static str,
    pub dialect: Dialect,
}

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::Gemini => ProviderConfig {
                base_url: "https://generativelanguage.googleapis.com",
                model: "gemini-3-flash-preview",
                env_var: "GEMINI_API_KEY",
                dialect: Dialect::GeminiGenerateContent,
            },
            Provider::Openai => ProviderConfig {
                base_url: "https://api.openai.com",
                model: "gpt-5.1",
                env_var: "OPENAI_API_KEY",
                dialect: Dialect::ChatCompletions,
            },
            Provider::Grok => ProviderConfig {
                base_url: "https://api.x.ai",
                model: "grok-4-fast",
                env_var: "XAI_API_KEY",
                dialect: Dialect::ChatCompletions,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::Openai => "OpenAI",
            Provider::Grok => "Grok",
        }
    }
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_RETRIES: u32 = 1;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Explicit client configuration handed to the backend.
#[derive(Clone)]
pub struct ClientConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Extra attempts after a transient transport failure.
    pub max_retries: u32,
    /// Delay before retry `n` is `retry_backoff * n`.
    pub retry_backoff: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .finish()
    }
}

impl ClientConfig {
    /// Config with the provider's default endpoint and model.
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        let defaults = provider.config();
        Self {
            provider,
            api_key: api_key.into(),
            model: defaults.model.to_string(),
            base_url: defaults.base_url.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Resolve the API key through `lookup`, which maps a variable name to
    /// its value. The caller decides where variables come from.
    pub fn from_lookup<F>(provider: Provider, lookup: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_var = provider.config().env_var;
        let api_key = lookup(env_var)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingApiKey {
                provider_name: provider.name().to_string(),
                env_var: env_var.to_string(),
            })?;

        Ok(Self::new(provider, api_key))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.provider.config().dialect
    }

    /// Full URL of the generation endpoint.
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.dialect() {
            Dialect::GeminiGenerateContent => {
                format!("{}/v1beta/models/{}:generateContent", base, self.model)
            }
            Dialect::ChatCompletions => format!("{}/v1/chat/completions", base),
        }
    }
}
