//! Message dispatcher - Routes messages to handlers

use std::sync::Arc;

use crate::application::errors::{BlacklistError, BotError};
use crate::application::services::{build_broadcast, BlacklistService};
use crate::domain::entities::{Action, BotPost, Message};
use crate::domain::traits::{Bot, Store, UserDirectory};
use super::router::{RouteMatch, Router};

const NOT_READY_REPLY: &str = "The blacklist is still loading. Try again in a moment.";
const EMPTY_BLACKLIST_REPLY: &str = "There are currently no users blacklisted.";

/// Runs every matching listener for one inbound message at a time
pub struct MessageDispatcher {
    router: Router,
    blacklist: BlacklistService,
    store: Arc<dyn Store>,
    directory: Arc<dyn UserDirectory>,
    bot: Arc<dyn Bot>,
    bot_id: String,
}

impl MessageDispatcher {
    pub fn new(
        router: Router,
        blacklist: BlacklistService,
        store: Arc<dyn Store>,
        directory: Arc<dyn UserDirectory>,
        bot: Arc<dyn Bot>,
    ) -> Self {
        let bot_id = bot.bot_info().id;
        Self {
            router,
            blacklist,
            store,
            directory,
            bot,
            bot_id,
        }
    }

    pub fn blacklist(&self) -> &BlacklistService {
        &self.blacklist
    }

    /// Handle one message. Returns the number of listeners that fired.
    pub async fn dispatch(&mut self, message: &Message) -> usize {
        tracing::debug!(
            "[{}] {} message {} at {}",
            message.chat_id,
            message.platform,
            message.id,
            message.timestamp.to_rfc3339()
        );
        if let Some(sender) = &message.sender {
            if self.directory.remember(sender.clone()).await {
                if let Err(e) = self.store.save().await {
                    tracing::warn!("Failed to save learned user {} ({}): {}", sender, sender.id, e);
                }
            }
        }

        let matches = self.router.route(&message.text);
        for route in &matches {
            tracing::debug!("[{}] listener {} matched", message.chat_id, route.listener);
            if let Err(e) = self.handle(route, message).await {
                tracing::warn!("[{}] listener {} failed: {}", message.chat_id, route.listener, e);
            }
        }
        matches.len()
    }

    async fn handle(&mut self, route: &RouteMatch, message: &Message) -> Result<(), BotError> {
        let chat_id = message.chat_id.as_str();
        match &route.action {
            Action::GetId => self.respond_to_id(chat_id, route.capture(1)).await,
            Action::GetName => self.respond_to_name(chat_id, route.capture(1)).await,
            Action::MentionAll => self.respond_to_mention_all(route).await,
            Action::ViewBlacklist => {
                let raw = !route.capture(1).is_empty();
                self.respond_to_view_blacklist(chat_id, raw).await
            }
            Action::Blacklist => self.respond_to_blacklist(chat_id, route.capture(1).trim()).await,
            Action::Whitelist => self.respond_to_whitelist(chat_id, route.capture(1).trim()).await,
            Action::Reply(text) => self.bot.send_message(chat_id, text).await,
            Action::Image { text, url } => {
                let post = BotPost::text(&self.bot_id, text).with_image(url);
                self.bot.post(post).await
            }
        }
    }

    async fn respond_to_id(&self, chat_id: &str, target: &str) -> Result<(), BotError> {
        tracing::info!("Looking for user ID by name: {}", target);
        let reply = match self.blacklist.resolve_by_name(target).await {
            Some(user) => {
                tracing::info!("Found ID {} by name {}", user.id, target);
                format!("{}: {}", target, user.id)
            }
            None => format!("Could not find a user with the name {}", target),
        };
        self.bot.send_message(chat_id, &reply).await
    }

    async fn respond_to_name(&self, chat_id: &str, target: &str) -> Result<(), BotError> {
        tracing::info!("Looking for user name by ID: {}", target);
        let reply = match self.blacklist.resolve_by_id(target).await {
            Some(user) => {
                tracing::info!("Found name {} by ID {}", user.name, target);
                format!("{}: {}", target, user.name)
            }
            None => format!("Could not find a user with the ID {}", target),
        };
        self.bot.send_message(chat_id, &reply).await
    }

    async fn respond_to_mention_all(&self, route: &RouteMatch) -> Result<(), BotError> {
        let users = self.directory.users().await;
        let post = build_broadcast(
            route.capture(0),
            route.capture(1),
            &users,
            self.blacklist.entries(),
            &self.bot_id,
        );
        tracing::info!("Mentioning {} users", post.mentioned_user_ids().len());
        self.bot.post(post).await
    }

    async fn respond_to_view_blacklist(&self, chat_id: &str, raw: bool) -> Result<(), BotError> {
        let entries = self.blacklist.entries();
        let reply = if raw {
            serde_json::to_string(entries).map_err(|e| BotError::Parse(e.to_string()))?
        } else if entries.is_empty() {
            EMPTY_BLACKLIST_REPLY.to_string()
        } else {
            let mut names = Vec::with_capacity(entries.len());
            for id in entries {
                let name = match self.blacklist.resolve_by_id(id).await {
                    Some(user) => user.name,
                    None => id.clone(),
                };
                names.push(name);
            }
            names.join(", ")
        };
        self.bot.send_message(chat_id, &reply).await
    }

    async fn respond_to_blacklist(&mut self, chat_id: &str, target: &str) -> Result<(), BotError> {
        let Some(user) = self.blacklist.resolve_by_name(target).await else {
            let reply = format!("Could not find a user with the name {}", target);
            return self.bot.send_message(chat_id, &reply).await;
        };

        tracing::info!("Blacklisting {} ({})", user, user.id);
        let result = self.blacklist.add(&user.id).await;
        let reply = match &result {
            Ok(true) => format!("Blacklisted {} successfully.", target),
            Ok(false) => format!("{} is already blacklisted.", target),
            Err(BlacklistError::NotReady) => NOT_READY_REPLY.to_string(),
            Err(_) => format!("Could not save the blacklist, {} was not added.", target),
        };
        self.bot.send_message(chat_id, &reply).await?;
        result.map(|_| ()).map_err(BotError::from)
    }

    async fn respond_to_whitelist(&mut self, chat_id: &str, target: &str) -> Result<(), BotError> {
        let Some(user) = self.blacklist.resolve_by_name(target).await else {
            let reply = format!("Could not find a user with the name {}", target);
            return self.bot.send_message(chat_id, &reply).await;
        };

        tracing::info!("Whitelisting {} ({})", user, user.id);
        let reply = match self.blacklist.remove(&user.id).await {
            Ok(()) => format!("Whitelisted {} successfully", target),
            Err(BlacklistError::NotFound(_)) => format!("{} is not blacklisted.", target),
            Err(BlacklistError::NotReady) => NOT_READY_REPLY.to_string(),
            Err(e) => {
                self.bot
                    .send_message(chat_id, &format!("Could not save the blacklist, {} was not removed.", target))
                    .await?;
                return Err(e.into());
            }
        };
        self.bot.send_message(chat_id, &reply).await
    }
}
