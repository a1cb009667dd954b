use thiserror::Error;

/// Failure of a single repurposing cycle.
///
/// Every variant surfaces to the end user as the same "generation failed"
/// message; the variant itself is kept for logs and tests.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Transport failed{}: {reason}", status_suffix(.status))]
    Transport { status: Option<u16>, reason: String },

    #[error("Malformed payload: {reason}")]
    MalformedPayload { reason: String },

    #[error("Schema violation on `{field}`: {problem}")]
    SchemaViolation { field: String, problem: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// Fieldless tag of a [`GenerationError`], carried by failed request states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    MalformedPayload,
    SchemaViolation,
}

impl GenerationError {
    pub fn transport(status: Option<u16>, reason: impl Into<String>) -> Self {
        Self::Transport {
            status,
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }

    pub fn schema(field: impl Into<String>, problem: impl Into<String>) -> Self {
        Self::SchemaViolation {
            field: field.into(),
            problem: problem.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::Transport { .. } => ErrorKind::Transport,
            GenerationError::MalformedPayload { .. } => ErrorKind::MalformedPayload,
            GenerationError::SchemaViolation { .. } => ErrorKind::SchemaViolation,
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Only transport failures qualify, and of those only network errors,
    /// rate limiting and server-side statuses. Client errors (bad key, bad
    /// model) repeat deterministically.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Transport { status: None, .. } => true,
            GenerationError::Transport {
                status: Some(code), ..
            } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Transport {
            status: err.status().map(|s| s.as_u16()),
            reason: err.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Missing API key for {provider_name}: set {env_var}")]
    MissingApiKey {
        provider_name: String,
        env_var: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, GenerationError>;
