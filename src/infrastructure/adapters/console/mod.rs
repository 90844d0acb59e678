//! Console adapter for development/testing

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::domain::entities::{Attachment, BotPost};
use crate::domain::traits::{Bot, BotInfo};
use crate::application::errors::BotError;

/// Console bot adapter for local development
pub struct ConsoleAdapter {
    info: BotInfo,
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl ConsoleAdapter {
    pub fn new(bot_id: impl Into<String>) -> Self {
        Self {
            info: BotInfo {
                id: bot_id.into(),
                name: "allbot".to_string(),
                platform: "console".to_string(),
            },
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// Next line from stdin, `None` at end of input
    pub async fn read_line(&self) -> Option<String> {
        match self.lines.lock().await.next_line().await {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Failed to read console input: {}", e);
                None
            }
        }
    }
}

/// Render a post the way the console shows it
pub fn render_post(post: &BotPost) -> String {
    let mut out = format!("[BOT] {}", post.text);
    for attachment in &post.attachments {
        match attachment {
            Attachment::Mentions { user_ids, .. } => {
                out.push_str(&format!("\n  [Mentions] {}", user_ids.join(", ")));
            }
            Attachment::Image { url } => {
                out.push_str(&format!("\n  [Image] {}", url));
            }
        }
    }
    out
}

#[async_trait]
impl Bot for ConsoleAdapter {
    async fn start(&self) -> Result<(), BotError> {
        tracing::info!("Starting console bot (dev mode)");
        Ok(())
    }

    async fn send_message(&self, _chat_id: &str, text: &str) -> Result<(), BotError> {
        println!("[BOT] {}", text);
        Ok(())
    }

    async fn post(&self, post: BotPost) -> Result<(), BotError> {
        println!("{}", render_post(&post));
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
