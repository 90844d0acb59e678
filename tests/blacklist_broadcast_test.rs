//! Blacklist and broadcast integration tests
//! Run with: cargo test --test blacklist_broadcast_test

use std::path::PathBuf;
use std::sync::{Arc, Once};

use allbot::application::errors::{BlacklistError, ConfigError};
use allbot::application::services::{build_broadcast, BlacklistService, BLACKLIST_KEY};
use allbot::domain::entities::{Attachment, User};
use allbot::domain::traits::{Store, UserDirectory};
use allbot::infrastructure::config::{Credentials, BOT_ID_VAR, ROOM_ID_VAR, TOKEN_VAR};
use allbot::infrastructure::storage::BrainStore;

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

fn temp_brain() -> PathBuf {
    std::env::temp_dir().join(format!("allbot-it-{}.json", uuid::Uuid::new_v4()))
}

async fn open(path: &PathBuf) -> (Arc<BrainStore>, BlacklistService) {
    let brain = Arc::new(BrainStore::json(path));
    brain.load().await.expect("brain loads");
    let mut blacklist = BlacklistService::new(brain.clone(), brain.clone());
    blacklist.load().await.expect("blacklist loads");
    (brain, blacklist)
}

/// Persisted blacklist matches memory after every mutation
#[tokio::test]
async fn test_persisted_matches_memory_after_each_mutation() {
    ensure_init();
    let path = temp_brain();
    let (_brain, mut blacklist) = open(&path).await;

    let ops: [(bool, &str); 7] = [
        (true, "1"),
        (true, "2"),
        (true, "1"),
        (false, "1"),
        (true, "3"),
        (false, "9"),
        (false, "2"),
    ];

    for (add, id) in ops {
        let result = if add {
            blacklist.add(id).await.map(|_| ())
        } else {
            blacklist.remove(id).await
        };
        if let Err(e) = result {
            assert!(matches!(e, BlacklistError::NotFound(_)), "unexpected error: {}", e);
        }

        let (_reopened_brain, reopened) = open(&path).await;
        assert_eq!(reopened.entries(), blacklist.entries());
    }

    assert_eq!(blacklist.entries(), ["3".to_string()]);
    let _ = std::fs::remove_file(&path);
}

/// Removing an absent id leaves storage untouched
#[tokio::test]
async fn test_remove_absent_skips_save() {
    ensure_init();
    let brain = Arc::new(BrainStore::memory());
    brain.load().await.unwrap();
    let mut blacklist = BlacklistService::new(brain.clone(), brain.clone());
    blacklist.load().await.unwrap();

    assert!(blacklist.remove("404").await.is_err());
    assert_eq!(brain.save_count(), 0);
    assert_eq!(brain.get(BLACKLIST_KEY).await.unwrap(), None);
}

/// Order survives a save and reload
#[tokio::test]
async fn test_blacklist_order_round_trip() {
    ensure_init();
    let path = temp_brain();
    {
        let (_brain, mut blacklist) = open(&path).await;
        for id in ["30", "10", "20"] {
            blacklist.add(id).await.unwrap();
        }
    }

    let (_brain, blacklist) = open(&path).await;
    assert_eq!(blacklist.entries(), ["30".to_string(), "10".to_string(), "20".to_string()]);

    let raw = serde_json::to_string(blacklist.entries()).unwrap();
    let decoded: Vec<String> = serde_json::from_str(&raw).unwrap();
    assert_eq!(decoded, blacklist.entries());
    let _ = std::fs::remove_file(&path);
}

/// Broadcast over the directory skips blacklisted users
#[tokio::test]
async fn test_broadcast_from_directory() {
    ensure_init();
    let brain = Arc::new(BrainStore::memory());
    brain.load().await.unwrap();
    for (id, name) in [("1", "A"), ("2", "B"), ("3", "C")] {
        brain.remember(User::new(id, name)).await;
    }
    let mut blacklist = BlacklistService::new(brain.clone(), brain.clone());
    blacklist.load().await.unwrap();

    let b = blacklist.resolve_by_name(" @b ").await.expect("B is known");
    blacklist.add(&b.id).await.unwrap();

    let users = brain.users().await;
    let post = build_broadcast("hey @all", "hey ", &users, blacklist.entries(), "bot-9");

    assert_eq!(post.text, "hey @all");
    assert_eq!(
        post.attachments,
        vec![Attachment::Mentions {
            loci: vec![[0, 1], [1, 2]],
            user_ids: vec!["1".to_string(), "3".to_string()],
        }]
    );

    let json = serde_json::to_value(&post).unwrap();
    assert_eq!(json["bot_id"], "bot-9");
    assert_eq!(json["attachments"][0]["type"], "mentions");
}

/// Each missing credential blocks startup
#[test]
fn test_missing_credentials() {
    ensure_init();
    let vars = [ROOM_ID_VAR, BOT_ID_VAR, TOKEN_VAR];
    for missing in vars {
        let result = Credentials::from_lookup(|key| {
            (key != missing && vars.contains(&key)).then(|| format!("value-for-{}", key))
        });
        match result {
            Err(ConfigError::MissingField(fields)) => assert_eq!(fields, vec![missing.to_string()]),
            other => panic!("expected missing {}, got {:?}", missing, other),
        }
    }
}
