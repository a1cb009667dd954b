use serde::{Deserialize, Serialize};

/// Inputs of one repurposing cycle. Values are interpolated verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    pub video_title: String,
    pub platform: String,
    pub user_context: String,
}

impl GenerationRequest {
    pub fn new(
        video_title: impl Into<String>,
        platform: impl Into<String>,
        user_context: impl Into<String>,
    ) -> Self {
        Self {
            video_title: video_title.into(),
            platform: platform.into(),
            user_context: user_context.into(),
        }
    }
}

/// A validated repost kit. Only ever constructed with all four fields present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub captions: Vec<String>,
    pub hashtags: Vec<String>,
    pub description: String,
    pub analysis: String,
}
