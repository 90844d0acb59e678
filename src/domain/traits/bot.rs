use async_trait::async_trait;
use crate::domain::entities::BotPost;
use crate::application::errors::BotError;

/// Bot trait - abstraction for messaging platform adapters
#[async_trait]
pub trait Bot: Send + Sync {
    /// Prepare the adapter before the event loop starts
    async fn start(&self) -> Result<(), BotError>;

    /// Send a plain-text reply to a chat
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), BotError>;

    /// Submit a structured post (mentions, images). Delivery is not awaited.
    async fn post(&self, post: BotPost) -> Result<(), BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub platform: String,
}
