//! The persisted form of the whole chat state.

use std::collections::{BTreeMap, BTreeSet};

use parley_common::{Message, WELL_KNOWN_CHANNELS};
use serde::{Deserialize, Deserializer, Serialize};

/// Complete chat state: known users, channel histories and direct conversations.
///
/// This is both the in-memory state of a [`ConversationStore`](crate::ConversationStore)
/// and the JSON document written to its slot, so saving is a single serialization and
/// nothing is kept outside of it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: BTreeSet<String>,
    /// Channel name to messages, in append order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: BTreeMap<String, Vec<Message>>,
    /// Direct key (see [`parley_common::derive_direct_key`]) to messages, in append order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub direct_messages: BTreeMap<String, Vec<Message>>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            users: BTreeSet::new(),
            messages: WELL_KNOWN_CHANNELS
                .iter()
                .map(|name| (name.to_string(), Vec::new()))
                .collect(),
            direct_messages: BTreeMap::new(),
        }
    }
}

impl Snapshot {
    /// Parses a stored snapshot. Missing or `null` fields take their defaults, and the
    /// result is [reconciled](Self::reconcile).
    pub fn decode(json: &str) -> serde_json::Result<Self> {
        let mut snapshot: Self = serde_json::from_str(json)?;
        snapshot.reconcile();
        Ok(snapshot)
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Brings a loaded snapshot back in line with the invariants the store maintains:
    /// usernames are trimmed and non-empty, and every well-known channel exists.
    ///
    /// Returns whether anything had to change.
    pub fn reconcile(&mut self) -> bool {
        let users = std::mem::take(&mut self.users);
        let mut changed = false;
        for user in users {
            match parley_common::normalize_username(&user) {
                Some(name) => {
                    changed |= name != user;
                    self.users.insert(name);
                }
                None => changed = true,
            }
        }

        for name in WELL_KNOWN_CHANNELS {
            if !self.messages.contains_key(*name) {
                self.messages.insert(name.to_string(), Vec::new());
                changed = true;
            }
        }
        changed
    }

    pub fn message_count(&self) -> usize {
        self.messages
            .values()
            .chain(self.direct_messages.values())
            .map(Vec::len)
            .sum()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use parley_common::{derive_direct_key, Message};

    use super::*;

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::default();
        snapshot.users.extend(["alice".to_owned(), "bob".to_owned()]);
        snapshot
            .messages
            .get_mut("general")
            .unwrap()
            .extend([Message::system("alice joined the chat"), Message::user("alice", "hi")]);
        snapshot
            .messages
            .insert("books".to_owned(), vec![Message::user("bob", "anyone reading?")]);
        snapshot.direct_messages.insert(
            derive_direct_key("alice", "bob"),
            vec![Message::user("bob", "hey"), Message::user("alice", "hey yourself")],
        );
        snapshot
    }

    #[test]
    fn default_has_three_empty_channels() {
        let snapshot = Snapshot::default();
        assert!(snapshot.users.is_empty());
        assert!(snapshot.direct_messages.is_empty());
        let channels: Vec<_> = snapshot.messages.keys().map(String::as_str).collect();
        assert_eq!(channels, ["gaming", "general", "random"]);
        assert!(snapshot.messages.values().all(Vec::is_empty));
    }

    #[test]
    fn decode_reproduces_encoded_state() {
        let snapshot = sample();
        let json = snapshot.encode().unwrap();
        assert_eq!(Snapshot::decode(&json).unwrap(), snapshot);
    }

    #[test]
    fn persisted_field_names() {
        let value: serde_json::Value = serde_json::from_str(&sample().encode().unwrap()).unwrap();
        assert!(value["users"].is_array());
        assert!(value["messages"]["general"].is_array());
        assert!(value["directMessages"]["alice_bob"].is_array());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let snapshot = Snapshot::decode(r#"{"users": ["carol"]}"#).unwrap();
        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.messages, Snapshot::default().messages);
        assert!(snapshot.direct_messages.is_empty());

        let snapshot = Snapshot::decode(r#"{"users": null, "messages": null}"#).unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn reconcile_drops_blank_users_and_restores_channels() {
        let json = r#"{"users": ["  alice ", "", "   "], "messages": {"random": []}}"#;
        let snapshot = Snapshot::decode(json).unwrap();
        assert_eq!(snapshot.users.iter().collect::<Vec<_>>(), ["alice"]);
        for name in WELL_KNOWN_CHANNELS {
            assert!(snapshot.messages.contains_key(*name), "{name}");
        }
    }

    #[test]
    fn reconcile_leaves_reachable_state_alone() {
        let original = sample();
        let mut snapshot = original.clone();
        assert!(!snapshot.reconcile());
        assert_eq!(snapshot, original);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(Snapshot::decode("{not json").is_err());
        assert!(Snapshot::decode(r#"{"users": 7}"#).is_err());
        assert!(Snapshot::decode("null").is_err());
    }

    #[test]
    fn counts_messages_everywhere() {
        assert_eq!(sample().message_count(), 5);
    }
}
