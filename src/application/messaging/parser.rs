//! Message parser - turns raw console input into structured messages

use regex_lite::Regex;

use crate::domain::entities::{Message, User};

/// Parses console lines of the form `Name (id): text`. Lines without the
/// sender prefix are attributed to the default sender.
pub struct MessageParser {
    sender_prefix: Regex,
    default_sender: User,
}

impl MessageParser {
    pub fn new(default_sender: User) -> Result<Self, regex_lite::Error> {
        Ok(Self {
            sender_prefix: Regex::new(r"^\s*([^()]+?)\s*\(([^()\s]+)\):\s?(.*)$")?,
            default_sender,
        })
    }

    /// Parse a text message
    pub fn parse(&self, chat_id: impl Into<String>, line: &str) -> Message {
        let (sender, text) = match self.sender_prefix.captures(line) {
            Some(caps) => (User::new(&caps[2], &caps[1]), caps[3].to_string()),
            None => (self.default_sender.clone(), line.to_string()),
        };

        Message::new(chat_id, text)
            .with_sender(sender)
            .with_platform("console")
    }
}
