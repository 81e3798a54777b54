use serde::{Deserialize, Serialize};

/// Body of `POST /generate`
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub prompt: Vec<String>,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl GenerationRequest {
    /// Single-turn chat request with the demo's sampling settings.
    pub fn chat(prompt: impl Into<String>) -> Self {
        Self {
            prompt: vec![prompt.into()],
            max_new_tokens: 500,
            temperature: 0.8,
            top_p: 0.95,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub generated_text: String,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}
