//! Outbound bot post and its attachments, in the messaging API wire format

use serde::{Deserialize, Serialize};

/// Attachment carried by a bot post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Attachment {
    /// Inline @-mentions; `loci[i]` is the text range rendered for `user_ids[i]`
    Mentions {
        loci: Vec<[usize; 2]>,
        user_ids: Vec<String>,
    },
    Image {
        url: String,
    },
}

/// Message body for the bot post endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotPost {
    pub text: String,
    pub bot_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl BotPost {
    pub fn text(bot_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bot_id: bot_id.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_image(self, url: impl Into<String>) -> Self {
        self.with_attachment(Attachment::Image { url: url.into() })
    }

    /// Mentioned user ids, empty when the post carries no mentions attachment
    pub fn mentioned_user_ids(&self) -> &[String] {
        self.attachments
            .iter()
            .find_map(|a| match a {
                Attachment::Mentions { user_ids, .. } => Some(user_ids.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }
}
