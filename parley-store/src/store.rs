use std::collections::{BTreeMap, BTreeSet};

use parley_common::{derive_direct_key, normalize_username, Message, Scope};

use crate::{Result, Snapshot, SnapshotSlot, StoreError};

/// What [`ConversationStore::load_snapshot`] found in the slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadOutcome {
    /// A stored snapshot was read and is now the in-memory state.
    Restored,
    /// The slot was empty; the store holds the default snapshot.
    Empty,
    /// The slot could not be read or parsed; the store holds the default snapshot.
    Recovered,
}

/// Where a new message is appended.
enum Target {
    Channel(String),
    Direct(String),
}

impl Target {
    fn key(&self) -> &str {
        match self {
            Self::Channel(key) | Self::Direct(key) => key,
        }
    }
}

/// All chat state for a session, mirrored to a [`SnapshotSlot`] after every mutation.
///
/// Mutations are all-or-nothing: when the slot cannot be written, the in-memory change
/// is undone before the error is returned, so the two never disagree.
#[derive(Debug)]
pub struct ConversationStore<S> {
    slot: S,
    state: Snapshot,
    /// Set inside [`transaction`](Self::transaction); mutations skip their own write.
    deferred: bool,
}

impl<S: SnapshotSlot> ConversationStore<S> {
    /// Creates a store holding the default snapshot, without touching the slot.
    pub fn new(slot: S) -> Self {
        Self {
            slot,
            state: Snapshot::default(),
            deferred: false,
        }
    }

    /// Creates a store and loads whatever the slot holds.
    pub fn open(slot: S) -> (Self, LoadOutcome) {
        let mut store = Self::new(slot);
        let outcome = store.load_snapshot();
        (store, outcome)
    }

    /// Replaces the in-memory state with the slot's contents.
    ///
    /// Never fails: a missing, unreadable or malformed value leaves the store holding the
    /// default snapshot.
    pub fn load_snapshot(&mut self) -> LoadOutcome {
        let (state, outcome) = match self.slot.read() {
            Ok(Some(json)) => match Snapshot::decode(&json) {
                Ok(state) => (state, LoadOutcome::Restored),
                Err(err) => {
                    tracing::warn!(slot = self.slot.key(), "discarding malformed snapshot: {err}");
                    (Snapshot::default(), LoadOutcome::Recovered)
                }
            },
            Ok(None) => (Snapshot::default(), LoadOutcome::Empty),
            Err(err) => {
                tracing::warn!(slot = self.slot.key(), "failed to read snapshot: {err}");
                (Snapshot::default(), LoadOutcome::Recovered)
            }
        };
        tracing::info!(
            slot = self.slot.key(),
            ?outcome,
            users = state.users.len(),
            messages = state.message_count(),
            "loaded snapshot"
        );
        self.state = state;
        outcome
    }

    /// Overwrites the slot with the full in-memory state.
    pub fn save_snapshot(&mut self) -> Result<()> {
        let json = self.state.encode()?;
        self.slot.write(&json)?;
        tracing::debug!(slot = self.slot.key(), bytes = json.len(), "saved snapshot");
        Ok(())
    }

    /// Runs several mutations as one: the slot is written once at the end, and if any
    /// step or the final write fails, the state from before the transaction is restored.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let before = self.state.clone();
        let outer = std::mem::replace(&mut self.deferred, true);
        let result = f(self);
        self.deferred = outer;
        let result = result.and_then(|value| self.persist().map(|()| value));
        if result.is_err() {
            self.state = before;
        }
        result
    }

    fn persist(&mut self) -> Result<()> {
        if self.deferred {
            return Ok(());
        }
        self.save_snapshot()
    }

    /// Discards everything and persists the default snapshot.
    pub fn reset(&mut self) -> Result<()> {
        let previous = std::mem::take(&mut self.state);
        if let Err(err) = self.persist() {
            self.state = previous;
            return Err(err);
        }
        tracing::info!(slot = self.slot.key(), "reset to default snapshot");
        Ok(())
    }

    /// Adds a user to the known set. Returns `false` if they were already known.
    pub fn register_user(&mut self, username: &str) -> Result<bool> {
        let username = normalize_username(username).ok_or(StoreError::EmptyUsername)?;
        if !self.state.users.insert(username.clone()) {
            return Ok(false);
        }
        if let Err(err) = self.persist() {
            self.state.users.remove(&username);
            return Err(err);
        }
        tracing::debug!(%username, "registered user");
        Ok(true)
    }

    /// Removes a user from the known set. Their messages stay where they are.
    pub fn unregister_user(&mut self, username: &str) -> Result<bool> {
        let username = normalize_username(username).ok_or(StoreError::EmptyUsername)?;
        if !self.state.users.remove(&username) {
            return Ok(false);
        }
        if let Err(err) = self.persist() {
            self.state.users.insert(username);
            return Err(err);
        }
        tracing::debug!(%username, "unregistered user");
        Ok(true)
    }

    /// Appends a message written by `author`.
    ///
    /// The body is trimmed. For [`Scope::Direct`], the conversation is the one between
    /// `author` and the peer.
    pub fn append_user_message(&mut self, scope: &Scope, author: &str, body: &str) -> Result<Message> {
        let body = body.trim();
        if body.is_empty() {
            return Err(StoreError::EmptyBody);
        }
        let author = normalize_username(author).ok_or(StoreError::NotAuthenticated)?;
        if !self.is_known_user(&author) {
            return Err(StoreError::UnknownUser(author));
        }
        let target = match scope {
            Scope::Channel(name) => Target::Channel(channel_name(name)?),
            Scope::Direct(peer) => {
                let peer = normalize_username(peer).ok_or(StoreError::EmptyUsername)?;
                if peer == author {
                    return Err(StoreError::SelfDirect);
                }
                if !self.is_known_user(&peer) {
                    return Err(StoreError::UnknownUser(peer));
                }
                Target::Direct(derive_direct_key(&author, &peer))
            }
        };
        self.append(target, Message::user(author, body))
    }

    /// Appends an authorless notice to a channel.
    pub fn append_system_message(&mut self, channel: &str, content: &str) -> Result<Message> {
        let channel = channel_name(channel)?;
        self.append(Target::Channel(channel), Message::system(content))
    }

    fn append(&mut self, target: Target, message: Message) -> Result<Message> {
        let key = target.key().to_owned();
        let conversations = self.conversations_mut(&target);
        let created = !conversations.contains_key(&key);
        conversations
            .entry(key.clone())
            .or_default()
            .push(message.clone());

        if let Err(err) = self.persist() {
            let conversations = self.conversations_mut(&target);
            if created {
                conversations.remove(&key);
            } else if let Some(sequence) = conversations.get_mut(&key) {
                sequence.pop();
            }
            return Err(err);
        }
        tracing::debug!(
            conversation = %key,
            id = %message.id,
            kind = ?message.kind,
            "appended message"
        );
        Ok(message)
    }

    fn conversations_mut(&mut self, target: &Target) -> &mut BTreeMap<String, Vec<Message>> {
        match target {
            Target::Channel(_) => &mut self.state.messages,
            Target::Direct(_) => &mut self.state.direct_messages,
        }
    }

    /// Messages in `scope` as seen by `viewer`, in append order.
    pub fn messages(&self, scope: &Scope, viewer: &str) -> &[Message] {
        match scope {
            Scope::Channel(name) => self.channel_messages(name),
            Scope::Direct(peer) => self.direct_messages(viewer, peer),
        }
    }

    pub fn channel_messages(&self, channel: &str) -> &[Message] {
        self.state
            .messages
            .get(channel.trim())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn direct_messages(&self, user_a: &str, user_b: &str) -> &[Message] {
        self.state
            .direct_messages
            .get(&derive_direct_key(user_a.trim(), user_b.trim()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn users(&self) -> &BTreeSet<String> {
        &self.state.users
    }

    pub fn is_known_user(&self, username: &str) -> bool {
        self.state.users.contains(username.trim())
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.state.messages.keys().map(String::as_str)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.state
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }
}

fn channel_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(StoreError::EmptyChannel);
    }
    Ok(name.to_owned())
}
