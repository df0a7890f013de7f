//! AI advisor conversations. All reasoning happens server-side; this only moves text.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiClient, Page};
use crate::error::{ClientError, ClientResult};

pub const CONVERSATIONS_PATH: &str = "/ai/conversations/";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConversationMessage {
    pub content: String,
    #[serde(default)]
    pub is_user: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Conversation {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdvisorExchange {
    pub user_message: String,
    pub ai_response: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

pub fn send_message_path(conversation_id: i64) -> String {
    format!("{}{}/send_message/", CONVERSATIONS_PATH, conversation_id)
}

impl Conversation {
    pub fn from_value(v: Value) -> ClientResult<Self> {
        serde_json::from_value(v).map_err(|e| ClientError::decode(format!("conversation: {}", e)))
    }
}

impl ApiClient {
    pub async fn list_conversations(&self) -> ClientResult<Vec<Conversation>> {
        let page = self.get_page(CONVERSATIONS_PATH).await?;
        page.results.into_iter().map(Conversation::from_value).collect()
    }

    pub async fn create_conversation(&self) -> ClientResult<Conversation> {
        Conversation::from_value(self.post(CONVERSATIONS_PATH, &json!({})).await?)
    }

    /// Send one question. Blank input is rejected before any request is made.
    pub async fn send_message(&self, conversation_id: i64, message: &str) -> ClientResult<AdvisorExchange> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ClientError::invalid("Message content is required"));
        }
        let v = self.post(&send_message_path(conversation_id), &json!({ "message": message })).await?;
        serde_json::from_value(v).map_err(|e| ClientError::decode(format!("advisor reply: {}", e)))
    }

    /// Use the most recent conversation, creating one when none exists yet.
    pub async fn ensure_conversation(&self) -> ClientResult<i64> {
        if let Some(c) = self.list_conversations().await?.into_iter().next() {
            return Ok(c.id);
        }
        Ok(self.create_conversation().await?.id)
    }
}

/// Conversations come back as a page of raw records; keep only the ones that parse.
pub fn conversations_in(page: &Page) -> Vec<Conversation> {
    page.results.iter().filter_map(|v| Conversation::from_value(v.clone()).ok()).collect()
}
