use crate::client::BackendClient;
use crate::error::ApiError;
use crate::models::GenerationRequest;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const EMPTY_REPLY: &str = "No response from the server.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Please set your API key before sending messages.")]
    MissingApiKey,

    #[error("Message is empty")]
    EmptyMessage,

    /// 401/403 from the generation endpoint.
    #[error("Your API key is invalid or revoked: {0}")]
    KeyRejected(String),

    #[error(transparent)]
    Api(ApiError),
}

impl From<ApiError> for ChatError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Unauthorized { detail, .. } => ChatError::KeyRejected(detail),
            other => ChatError::Api(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A single-user chat against `/generate`, authenticated by a project API key.
///
/// Each prompt is sent on its own; earlier turns are kept for display only.
pub struct Conversation {
    client: BackendClient,
    api_key: Option<String>,
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            api_key: None,
            messages: Vec::new(),
        }
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        let key = key.trim();
        self.api_key = (!key.is_empty()).then(|| key.to_string());
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Sends one prompt and appends the reply.
    ///
    /// The user message is recorded as soon as a request is made and stays
    /// there whatever happens to the request.
    pub async fn send(&mut self, text: &str) -> Result<&ChatMessage, ChatError> {
        let Some(api_key) = self.api_key.clone() else {
            return Err(ChatError::MissingApiKey);
        };
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        self.messages.push(ChatMessage::new(Role::User, text));

        let response = self.client.generate(&api_key, &GenerationRequest::chat(text)).await?;
        if let Some(usage) = response.usage {
            tracing::debug!("Generation usage: {:?}", usage);
        }

        let reply = match response.generated_text.trim() {
            "" => EMPTY_REPLY.to_string(),
            reply => reply.to_string(),
        };
        let index = self.messages.len();
        self.messages.push(ChatMessage::new(Role::Assistant, reply));
        Ok(&self.messages[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use reqwest::StatusCode;

    fn conversation() -> Conversation {
        let client = BackendClient::new(&BackendConfig {
            base_url: "http://127.0.0.1:9".into(),
            request_timeout_secs: Some(1),
        })
        .unwrap();
        Conversation::new(client)
    }

    #[tokio::test]
    async fn test_missing_key_sends_nothing() {
        let mut chat = conversation();
        let err = chat.send("hello").await.unwrap_err();
        assert!(matches!(err, ChatError::MissingApiKey));
        assert!(chat.messages().is_empty());
    }

    #[tokio::test]
    async fn test_blank_key_is_no_key() {
        let mut chat = conversation();
        chat.set_api_key("   ");
        assert!(!chat.has_api_key());
        chat.set_api_key(" sk-123 ");
        assert!(chat.has_api_key());

        let err = chat.send("  ").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
        assert!(chat.messages().is_empty());
    }

    #[test]
    fn test_unauthorized_maps_to_key_rejected() {
        let err: ChatError = ApiError::from_status(StatusCode::FORBIDDEN, r#"{"detail":"API key revoked"}"#).into();
        assert!(matches!(err, ChatError::KeyRejected(ref d) if d == "API key revoked"));

        let err: ChatError = ApiError::from_status(StatusCode::BAD_GATEWAY, "").into();
        assert!(matches!(err, ChatError::Api(_)));
    }
}
