use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Channel every user lands in after logging in.
pub const DEFAULT_CHANNEL: &str = "general";

/// Channels that always exist, even in an empty snapshot.
pub const WELL_KNOWN_CHANNELS: &[&str] = &[DEFAULT_CHANNEL, "random", "gaming"];

pub const DIRECT_KEY_SEPARATOR: char = '_';

/// Canonical key of the direct conversation between two users.
///
/// The pair is sorted before joining, so `derive_direct_key(a, b)` and
/// `derive_direct_key(b, a)` name the same conversation. The separator is not escaped:
/// names containing it can map two different pairs onto one key.
pub fn derive_direct_key(user_a: &str, user_b: &str) -> String {
    let (first, second) = if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    };
    format!("{first}{DIRECT_KEY_SEPARATOR}{second}")
}

/// Trims a username, returning `None` if nothing is left.
pub fn normalize_username(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Unique message identifier; UUIDv7, so ids sort in creation order within a process.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    /// Lifecycle notices (joins, leaves); never has an author.
    System,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(rename = "username", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(rename = "content")]
    pub body: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

impl Message {
    pub fn user(author: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            author: Some(author.into()),
            body: body.into(),
            timestamp: Utc::now(),
            kind: MessageKind::User,
        }
    }

    pub fn system(body: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            author: None,
            body: body.into(),
            timestamp: Utc::now(),
            kind: MessageKind::System,
        }
    }

    pub fn is_system(&self) -> bool {
        self.kind == MessageKind::System
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }
}

/// Where a message is posted, or which conversation is being read.
///
/// `Direct` names the peer relative to whoever is acting; the conversation
/// itself is found with [`derive_direct_key`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Scope {
    Channel(String),
    Direct(String),
}

impl Scope {
    pub fn channel(name: impl Into<String>) -> Self {
        Self::Channel(name.into())
    }

    pub fn direct(peer: impl Into<String>) -> Self {
        Self::Direct(peer.into())
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Direct(_))
    }

    /// Channel name or peer username.
    pub fn id(&self) -> &str {
        match self {
            Self::Channel(id) | Self::Direct(id) => id,
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::channel(DEFAULT_CHANNEL)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(name) => write!(f, "#{name}"),
            Self::Direct(peer) => write!(f, "@{peer}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_key_is_symmetric() {
        let pairs = [
            ("alice", "bob"),
            ("bob", "alice"),
            ("Zed", "amy"),
            ("same", "same"),
            ("", "x"),
            ("émile", "eve"),
        ];
        for (a, b) in pairs {
            assert_eq!(derive_direct_key(a, b), derive_direct_key(b, a), "{a} / {b}");
        }
        assert_eq!(derive_direct_key("bob", "alice"), "alice_bob");
    }

    #[test]
    fn direct_key_keeps_stored_format() {
        // keys are written verbatim into `directMessages`, so their shape must not drift
        assert_eq!(derive_direct_key("a_b", "c"), "a_b_c");
        assert_eq!(derive_direct_key("a", "b_c"), "a_b_c");
        assert_eq!(derive_direct_key("bob", "Alice"), "Alice_bob");
    }

    #[test]
    fn usernames_are_trimmed() {
        assert_eq!(normalize_username("  alice \n").as_deref(), Some("alice"));
        assert_eq!(normalize_username("   "), None);
        assert_eq!(normalize_username(""), None);
    }

    #[test]
    fn system_messages_serialize_without_username() {
        let message = Message::system("alice joined the chat");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "system");
        assert_eq!(value["content"], "alice joined the chat");
        assert!(value.get("username").is_none());

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, message);
        assert!(back.is_system());
    }

    #[test]
    fn user_messages_use_persisted_field_names() {
        let message = Message::user("alice", "hi");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "user");
        assert_eq!(value["username"], "alice");
        assert_eq!(value["content"], "hi");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn message_ids_increase() {
        let first = Message::user("alice", "one");
        let second = Message::user("alice", "two");
        assert!(first.id < second.id);
    }

    #[test]
    fn default_scope_is_general() {
        assert_eq!(Scope::default(), Scope::channel(DEFAULT_CHANNEL));
        assert!(Scope::direct("bob").is_direct());
        assert_eq!(Scope::direct("bob").id(), "bob");
    }
}
