//! The commands a front end issues on behalf of whoever is at the keyboard.

use parley_common::{normalize_username, Message, Scope, DEFAULT_CHANNEL};

use crate::{ConversationStore, Result, SnapshotSlot, StoreError};

/// Whether logging out removes the user from the known-user set.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LogoutPolicy {
    /// The user stays listed and can still receive direct messages.
    #[default]
    Retain,
    /// The user is unregistered; their messages are kept.
    Forget,
}

/// Who is logged in and which conversation they are looking at.
///
/// A session owns no chat state; every command borrows the store it acts on.
#[derive(Clone, Debug, Default)]
pub struct Session {
    current_user: Option<String>,
    current_scope: Scope,
    logout_policy: LogoutPolicy,
}

impl Session {
    pub fn new(logout_policy: LogoutPolicy) -> Self {
        Self {
            logout_policy,
            ..Self::default()
        }
    }

    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    pub fn current_scope(&self) -> &Scope {
        &self.current_scope
    }

    pub fn logout_policy(&self) -> LogoutPolicy {
        self.logout_policy
    }

    /// Logs `username` in, announcing it in the default channel.
    ///
    /// Registration and the join notice are written together; on failure neither happens.
    pub fn login<S: SnapshotSlot>(
        &mut self,
        store: &mut ConversationStore<S>,
        username: &str,
    ) -> Result<Message> {
        let username = normalize_username(username).ok_or(StoreError::EmptyUsername)?;
        let notice = store.transaction(|store| {
            store.register_user(&username)?;
            store.append_system_message(DEFAULT_CHANNEL, &format!("{username} joined the chat"))
        })?;
        tracing::info!(%username, "logged in");
        self.current_user = Some(username);
        self.current_scope = Scope::default();
        Ok(notice)
    }

    /// Picks up as an already-known user, without announcing anything.
    pub fn resume<S: SnapshotSlot>(
        &mut self,
        store: &ConversationStore<S>,
        username: &str,
    ) -> Result<()> {
        let username = normalize_username(username).ok_or(StoreError::EmptyUsername)?;
        if !store.is_known_user(&username) {
            return Err(StoreError::UnknownUser(username));
        }
        tracing::debug!(%username, "resumed session");
        self.current_user = Some(username);
        Ok(())
    }

    /// Logs the current user out, announcing it where they were.
    ///
    /// A leave notice always goes to a channel: to the current one, or to the default
    /// channel when a direct conversation is open. Returns `None` if nobody was logged in.
    pub fn logout<S: SnapshotSlot>(
        &mut self,
        store: &mut ConversationStore<S>,
    ) -> Result<Option<Message>> {
        let Some(username) = self.current_user.clone() else {
            return Ok(None);
        };
        let channel = match &self.current_scope {
            Scope::Channel(name) => name.as_str(),
            Scope::Direct(_) => DEFAULT_CHANNEL,
        };
        let forget = self.logout_policy == LogoutPolicy::Forget;
        let notice = store.transaction(|store| {
            let notice = store.append_system_message(channel, &format!("{username} left the chat"))?;
            if forget {
                store.unregister_user(&username)?;
            }
            Ok(notice)
        })?;
        tracing::info!(%username, policy = ?self.logout_policy, "logged out");
        self.current_user = None;
        self.current_scope = Scope::default();
        Ok(Some(notice))
    }

    /// Posts to the current scope as the current user.
    pub fn send<S: SnapshotSlot>(
        &self,
        store: &mut ConversationStore<S>,
        body: &str,
    ) -> Result<Message> {
        let author = self.current_user().ok_or(StoreError::NotAuthenticated)?;
        store.append_user_message(&self.current_scope, author, body)
    }

    pub fn switch_scope(&mut self, scope: Scope) {
        tracing::debug!(%scope, "switched scope");
        self.current_scope = scope;
    }

    /// Switches to the direct conversation with `peer`.
    pub fn open_direct(&mut self, peer: &str) -> Result<()> {
        let peer = normalize_username(peer).ok_or(StoreError::EmptyUsername)?;
        if self.current_user() == Some(peer.as_str()) {
            return Err(StoreError::SelfDirect);
        }
        self.switch_scope(Scope::Direct(peer));
        Ok(())
    }

    /// Messages in the current scope, as the current user sees them.
    pub fn visible_messages<'s, S: SnapshotSlot>(
        &self,
        store: &'s ConversationStore<S>,
    ) -> &'s [Message] {
        store.messages(&self.current_scope, self.current_user().unwrap_or_default())
    }

    /// Known users other than the current one.
    pub fn roster<'s, S: SnapshotSlot>(
        &self,
        store: &'s ConversationStore<S>,
    ) -> impl Iterator<Item = &'s str> + use<'s, S> {
        let me = self.current_user.clone();
        store
            .users()
            .iter()
            .map(String::as_str)
            .filter(move |user| Some(*user) != me.as_deref())
    }
}
