mod error;
pub mod session;
pub mod slot;
pub mod snapshot;
pub mod store;

pub use error::{Result, StoreError};
pub use parley_common::derive_direct_key;
pub use session::{LogoutPolicy, Session};
pub use slot::{FileSlot, MemorySlot, SnapshotSlot, DEFAULT_SLOT_KEY};
pub use snapshot::Snapshot;
pub use store::{ConversationStore, LoadOutcome};
