#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("message body is empty")]
    EmptyBody,
    #[error("username is empty")]
    EmptyUsername,
    #[error("channel name is empty")]
    EmptyChannel,
    #[error("no user is logged in")]
    NotAuthenticated,
    #[error("unknown user `{0}`")]
    UnknownUser(String),
    #[error("cannot open a direct conversation with yourself")]
    SelfDirect,
    #[error("failed to encode snapshot")]
    Encode(#[from] serde_json::Error),
    #[error("failed to persist snapshot")]
    Persist(#[from] std::io::Error),
}

impl StoreError {
    /// Whether the error is a rejected user input, as opposed to a storage failure.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Encode(_) | Self::Persist(_))
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
