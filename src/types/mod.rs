use serde::{Deserialize, Serialize};

use crate::tools::ToolError;

// ============= Model Conversation Types =============

/// Role of a message exchanged with the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

/// A single message sent to an LLM provider.
///
/// Assistant messages may carry the tool calls the model asked for; tool
/// messages carry the id of the call they answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn plain(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::Assistant, content)
    }

    /// Assistant turn that requested tool calls
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(MessageRole::Assistant, content)
        }
    }

    /// Result of one tool call, fed back to the model
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::plain(MessageRole::Tool, content)
        }
    }
}

/// Prior turn of the client conversation.
///
/// Only user and assistant turns with extractable text survive conversion
/// from the client payload; everything else is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ConversationMessage {
    User { text: String },
    Assistant { text: String },
}

impl ConversationMessage {
    pub fn text(&self) -> &str {
        match self {
            ConversationMessage::User { text } | ConversationMessage::Assistant { text } => text,
        }
    }
}

impl From<&ConversationMessage> for ChatMessage {
    fn from(message: &ConversationMessage) -> Self {
        match message {
            ConversationMessage::User { text } => ChatMessage::user(text.clone()),
            ConversationMessage::Assistant { text } => ChatMessage::assistant(text.clone()),
        }
    }
}

// ============= Client Request Types =============

/// Body of `POST /api/chat`, as sent by the AI SDK chat UI
#[derive(Debug, Clone, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<UiMessage>,
    /// Run deep research instead of a plain chat reply
    #[serde(default, rename = "webSearch")]
    pub web_search: bool,
}

/// One message of the client conversation.
///
/// Text is read from the first `text` part, falling back to `content` and
/// then `text`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UiMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<UiPart>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UiPart {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl UiMessage {
    pub fn user(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            role: Some("user".to_string()),
            parts: vec![UiPart {
                kind: "text".to_string(),
                text: Some(text.into()),
            }],
            ..Default::default()
        }
    }

    /// Extractable text, `None` when the message carries none
    pub fn extract_text(&self) -> Option<&str> {
        let from_parts = self
            .parts
            .iter()
            .find(|part| part.kind == "text")
            .and_then(|part| part.text.as_deref());

        [from_parts, self.content.as_deref(), self.text.as_deref()]
            .into_iter()
            .flatten()
            .find(|text| !text.is_empty())
    }

    /// Conversation turn for this message; unknown roles and empty messages
    /// yield `None`
    pub fn to_conversation(&self) -> Option<ConversationMessage> {
        let text = self.extract_text()?.to_string();
        match self.role.as_deref() {
            Some("user") => Some(ConversationMessage::User { text }),
            Some("assistant") => Some(ConversationMessage::Assistant { text }),
            _ => None,
        }
    }
}

/// A validated chat request: the prompt of the last message plus the
/// conversation that preceded it
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub prompt: String,
    pub message_id: String,
    pub history: Vec<ConversationMessage>,
    pub web_search: bool,
}

impl ChatRequest {
    /// Validate the request and split it into prompt and history
    pub fn into_turn(self) -> Result<ChatTurn> {
        let (last, earlier) = self
            .messages
            .split_last()
            .ok_or_else(|| AppError::InvalidInput("No messages provided".to_string()))?;

        let prompt = last
            .extract_text()
            .ok_or_else(|| AppError::InvalidInput("No user message found".to_string()))?
            .to_string();

        let message_id = last
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::InvalidInput("No message ID provided".to_string()))?;

        Ok(ChatTurn {
            prompt,
            message_id,
            history: earlier.iter().filter_map(UiMessage::to_conversation).collect(),
            web_search: self.web_search,
        })
    }
}

// ============= Tool Types =============

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("LLM error: {0}")]
    LLM(String),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output validation failed: {0}")]
    OutputValidation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::InvalidInput(_) => axum::http::StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match self {
            AppError::InvalidInput(msg) | AppError::NotFound(msg) => msg,
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
