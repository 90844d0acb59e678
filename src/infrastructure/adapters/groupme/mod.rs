//! GroupMe adapter
//!
//! Replies and broadcasts go through the bot post endpoint as detached
//! tasks; inbound messages are polled from the group's message list.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Request, StatusCode};
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::application::errors::BotError;
use crate::domain::entities::{BotPost, Message, User};
use crate::domain::traits::{Bot, BotInfo};
use crate::infrastructure::config::Credentials;

const ACCESS_TOKEN_HEADER: &str = "X-Access-Token";

/// Page size when polling for new messages
const MESSAGE_LIMIT: u32 = 20;

/// Group message as returned by the messages endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GroupMeMessage {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    pub text: Option<String>,
    #[serde(default)]
    pub sender_type: String,
    #[serde(default)]
    pub created_at: i64,
}

impl GroupMeMessage {
    pub fn is_from_bot(&self) -> bool {
        self.sender_type == "bot"
    }

    pub fn into_message(self, room_id: &str) -> Message {
        let timestamp = DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_else(Utc::now);
        let sender = (!self.user_id.is_empty()).then(|| User::new(self.user_id, self.name));
        Message::new(room_id, self.text.unwrap_or_default())
            .with_id(self.id)
            .with_sender_opt(sender)
            .with_timestamp(timestamp)
            .with_platform("groupme")
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: T,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<GroupMeMessage>,
}

#[derive(Debug, Deserialize)]
struct GroupResponse {
    #[serde(default)]
    members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct Member {
    user_id: String,
    nickname: String,
}

/// GroupMe bot adapter
pub struct GroupMeAdapter {
    client: Client,
    api_base: String,
    credentials: Credentials,
}

impl GroupMeAdapter {
    pub fn new(credentials: Credentials, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.credentials.room_id
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/v3/{}", self.api_base, path)
    }

    /// Build the bot post request: JSON body plus explicit length and token headers
    pub fn post_request(&self, post: &BotPost) -> Result<Request, BotError> {
        let body = serde_json::to_vec(post).map_err(|e| BotError::Parse(e.to_string()))?;
        let length = body.len();

        let request = self
            .client
            .post(self.api_url("bots/post"))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(CONTENT_LENGTH, length)
            .header(ACCESS_TOKEN_HEADER, &self.credentials.token)
            .body(body)
            .build()?;

        Ok(request)
    }

    /// Submit a post on a detached task; the outcome is only logged.
    pub fn spawn_post(&self, post: BotPost) -> Result<JoinHandle<()>, BotError> {
        let request = self.post_request(&post)?;
        let client = self.client.clone();

        Ok(tokio::spawn(async move {
            match client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    if status.is_success() {
                        tracing::info!("[GROUPME RESPONSE] {} {}", status, body);
                    } else {
                        tracing::warn!("[GROUPME RESPONSE] {} {}", status, body);
                    }
                }
                Err(e) => tracing::warn!("GroupMe post failed: {}", e),
            }
        }))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, BotError> {
        let response = self
            .client
            .get(self.api_url(path))
            .header(ACCESS_TOKEN_HEADER, &self.credentials.token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Api { status, body });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;
        Ok(Some(envelope.response))
    }

    /// Id of the newest message in the group, if any
    pub async fn latest_message_id(&self) -> Result<Option<String>, BotError> {
        let path = format!("groups/{}/messages", self.credentials.room_id);
        let page: Option<MessagesResponse> = self.get_json(&path, &[("limit", "1".to_string())]).await?;
        Ok(page.and_then(|p| p.messages.into_iter().next()).map(|m| m.id))
    }

    /// Messages posted after `after_id`, oldest first
    pub async fn get_messages(&self, after_id: &str) -> Result<Vec<GroupMeMessage>, BotError> {
        let path = format!("groups/{}/messages", self.credentials.room_id);
        let query = [
            ("after_id", after_id.to_string()),
            ("limit", MESSAGE_LIMIT.to_string()),
        ];
        let mut messages = self
            .get_json::<MessagesResponse>(&path, &query)
            .await?
            .map(|p| p.messages)
            .unwrap_or_default();
        sort_oldest_first(&mut messages);
        Ok(messages)
    }

    /// Current group members as directory users
    pub async fn fetch_members(&self) -> Result<Vec<User>, BotError> {
        let path = format!("groups/{}", self.credentials.room_id);
        let group: Option<GroupResponse> = self.get_json(&path, &[]).await?;
        Ok(group
            .map(|g| g.members)
            .unwrap_or_default()
            .into_iter()
            .map(|m| User::new(m.user_id, m.nickname))
            .collect())
    }
}

fn sort_oldest_first(messages: &mut [GroupMeMessage]) {
    messages.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.len().cmp(&b.id.len()))
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[async_trait]
impl Bot for GroupMeAdapter {
    async fn start(&self) -> Result<(), BotError> {
        tracing::info!("Starting GroupMe bot for room {}", self.credentials.room_id);
        Ok(())
    }

    async fn send_message(&self, _chat_id: &str, text: &str) -> Result<(), BotError> {
        self.post(BotPost::text(&self.credentials.bot_id, text)).await
    }

    async fn post(&self, post: BotPost) -> Result<(), BotError> {
        self.spawn_post(post)?;
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        BotInfo {
            id: self.credentials.bot_id.clone(),
            name: "allbot".to_string(),
            platform: "groupme".to_string(),
        }
    }
}
