//! Mention broadcast builder
//!
//! Location pairs index into the emitted mention list: the i-th mentioned
//! user gets `[i, i + 1]` no matter how many blacklisted users were skipped
//! before it.

use crate::domain::entities::{Attachment, BotPost, User};

/// Pick the longer of the two trigger captures; ties go to the second.
pub fn select_broadcast_text<'a>(first: &'a str, second: &'a str) -> &'a str {
    if first.chars().count() > second.chars().count() {
        first
    } else {
        second
    }
}

/// Build a post that mentions every user in `users` not present in `blacklist`.
pub fn build_broadcast(
    first: &str,
    second: &str,
    users: &[User],
    blacklist: &[String],
    bot_id: &str,
) -> BotPost {
    let text = select_broadcast_text(first, second);

    let user_ids: Vec<String> = users
        .iter()
        .filter(|user| !blacklist.contains(&user.id))
        .map(|user| user.id.clone())
        .collect();
    let loci = (0..user_ids.len()).map(|i| [i, i + 1]).collect();

    tracing::debug!(
        "Broadcast mentions {} of {} users",
        user_ids.len(),
        users.len()
    );

    BotPost::text(bot_id, text).with_attachment(Attachment::Mentions { loci, user_ids })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mentions(post: &BotPost) -> (Vec<[usize; 2]>, Vec<String>) {
        match &post.attachments[..] {
            [Attachment::Mentions { loci, user_ids }] => (loci.clone(), user_ids.clone()),
            other => panic!("unexpected attachments: {:?}", other),
        }
    }

    #[test]
    fn test_skips_blacklisted_with_emitted_positions() {
        let users = vec![User::new("1", "A"), User::new("2", "B"), User::new("3", "C")];
        let post = build_broadcast("@all hi", "", &users, &["2".to_string()], "bot");

        let (loci, user_ids) = mentions(&post);
        assert_eq!(user_ids, vec!["1", "3"]);
        assert_eq!(loci, vec![[0usize, 1], [1, 2]]);
        assert_eq!(post.bot_id, "bot");
        assert_eq!(post.text, "@all hi");
    }

    #[test]
    fn test_empty_directory() {
        let post = build_broadcast("@all", "@all_yall extra", &[], &[], "bot");

        let (loci, user_ids) = mentions(&post);
        assert!(loci.is_empty());
        assert!(user_ids.is_empty());
        assert_eq!(post.text, "@all_yall extra");
    }

    #[test]
    fn test_select_text_tie_prefers_second() {
        assert_eq!(select_broadcast_text("abc", "xyz"), "xyz");
        assert_eq!(select_broadcast_text("abcd", "xyz"), "abcd");
        assert_eq!(select_broadcast_text("", ""), "");
    }

    #[test]
    fn test_select_text_counts_chars() {
        // 3 chars / 6 bytes vs 4 chars / 4 bytes
        assert_eq!(select_broadcast_text("ééé", "abcd"), "abcd");
    }

    #[test]
    fn test_all_blacklisted() {
        let users = vec![User::new("1", "A")];
        let post = build_broadcast("@all", "", &users, &["1".to_string()], "bot");
        assert!(post.mentioned_user_ids().is_empty());
    }
}
