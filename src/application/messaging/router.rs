//! Command router - matches inbound text against the registered listeners

use crate::domain::entities::{Action, Listener};

/// A listener that matched, with its capture groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub listener: String,
    pub action: Action,
    pub captures: Vec<String>,
}

impl RouteMatch {
    /// Capture group `index`, empty when absent
    pub fn capture(&self, index: usize) -> &str {
        self.captures.get(index).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Default)]
pub struct Router {
    listeners: Vec<Listener>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with the built-in lookup, broadcast and blacklist listeners
    pub fn standard() -> Result<Self, regex_lite::Error> {
        let mut router = Self::new();
        router.hear(Listener::new("get-id", "get id (.+)", Action::GetId)?
            .with_description("Look up a user id by name"));
        router.hear(Listener::new("get-name", "get name (.+)", Action::GetName)?
            .with_description("Look up a user name by id"));
        router.hear(Listener::new("mention-all", r"(.*)@all(_yall)?\b(.*)", Action::MentionAll)?
            .with_description("Mention everyone not blacklisted"));
        router.hear(Listener::new("view-blacklist", r"^\s*view blacklist( raw)?\s*$", Action::ViewBlacklist)?
            .with_description("Show blacklisted users"));
        router.hear(Listener::new("blacklist", r"^\s*blacklist (.+)$", Action::Blacklist)?
            .with_description("Exclude a user from @all"));
        router.hear(Listener::new("whitelist", r"^\s*whitelist (.+)$", Action::Whitelist)?
            .with_description("Include a user in @all again"));
        Ok(router)
    }

    pub fn hear(&mut self, listener: Listener) {
        tracing::debug!("Registered listener {}", listener.name);
        self.listeners.push(listener);
    }

    /// Every listener matching `text`, in registration order
    pub fn route(&self, text: &str) -> Vec<RouteMatch> {
        self.listeners
            .iter()
            .filter_map(|listener| {
                listener.captures(text).map(|captures| RouteMatch {
                    listener: listener.name.clone(),
                    action: listener.action.clone(),
                    captures,
                })
            })
            .collect()
    }

    /// Registered listeners in registration order
    pub fn listeners(&self) -> impl Iterator<Item = &Listener> {
        self.listeners.iter()
    }

}
