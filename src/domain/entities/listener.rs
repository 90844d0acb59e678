use regex_lite::Regex;

/// What the bot does when a listener's pattern matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Look up a user id by display name
    GetId,
    /// Look up a display name by user id
    GetName,
    /// Mention every non-blacklisted user
    MentionAll,
    ViewBlacklist,
    Blacklist,
    Whitelist,
    /// Canned plain-text reply
    Reply(String),
    /// Canned post with an image attachment
    Image { text: String, url: String },
}

/// A text pattern the bot hears, bound to an action
#[derive(Debug, Clone)]
pub struct Listener {
    pub name: String,
    pub description: Option<String>,
    pub pattern: Regex,
    pub action: Action,
}

impl Listener {
    /// Build a listener; patterns are matched case-insensitively.
    pub fn new(name: impl Into<String>, pattern: &str, action: Action) -> Result<Self, regex_lite::Error> {
        Ok(Self {
            name: name.into(),
            description: None,
            pattern: Regex::new(&format!("(?i){}", pattern))?,
            action,
        })
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Capture groups of the first match; index 0 is the whole match and
    /// groups that did not participate are empty strings.
    pub fn captures(&self, text: &str) -> Option<Vec<String>> {
        let caps = self.pattern.captures(text)?;
        Some(
            caps.iter()
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_captures() {
        let listener = Listener::new("get-id", "get id (.+)", Action::GetId).unwrap();
        let caps = listener.captures("GET ID @Alice").unwrap();
        assert_eq!(caps, vec!["GET ID @Alice".to_string(), "@Alice".to_string()]);
    }

    #[test]
    fn test_missing_group_is_empty() {
        let listener = Listener::new("view", "^view blacklist( raw)?$", Action::ViewBlacklist).unwrap();
        let caps = listener.captures("view blacklist").unwrap();
        assert_eq!(caps[1], "");
        assert!(listener.captures("please view blacklist").is_none());
    }
}
