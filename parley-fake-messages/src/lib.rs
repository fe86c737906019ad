use std::time::Duration;

use parley_common::{Scope, WELL_KNOWN_CHANNELS};
use parley_store::{ConversationStore, SnapshotSlot};
use rand::prelude::{Rng, SliceRandom};
use tokio::sync::mpsc;

pub const USER_NAMES: &[&str] = &["Alice", "Bob", "Charlie", "Diana"];

const PHRASES: &[&str] = &[
    "Hello everyone!",
    "How is everyone doing?",
    "Anyone want to play a game?",
    "Great weather today!",
    "What are you all up to?",
    "Check out this cool website I found",
    "Anyone here good at coding?",
    "Love this chat app!",
];

const SEED_MESSAGES_PER_CHANNEL: usize = 3;

/// Upper bound on the pause between two simulated posts.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(5000);

/// A message some simulated user wants to post.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SimulatedPost {
    pub author: String,
    pub channel: String,
    pub body: String,
}

impl SimulatedPost {
    pub fn scope(&self) -> Scope {
        Scope::channel(&self.channel)
    }
}

/// Makes sure every simulated user is known to the store.
pub fn register_users<S: SnapshotSlot>(store: &mut ConversationStore<S>) -> parley_store::Result<()> {
    for name in USER_NAMES {
        store.register_user(name)?;
    }
    Ok(())
}

/// Fills a fresh store with some demo chatter.
pub fn seed<S: SnapshotSlot>(store: &mut ConversationStore<S>) -> parley_store::Result<()> {
    seed_with_rng(store, &mut rand::thread_rng())
}

pub fn seed_with_rng<S: SnapshotSlot>(
    store: &mut ConversationStore<S>,
    rng: &mut impl Rng,
) -> parley_store::Result<()> {
    register_users(store)?;
    for channel in WELL_KNOWN_CHANNELS {
        let scope = Scope::channel(*channel);
        for _ in 0..SEED_MESSAGES_PER_CHANNEL {
            let author = pick(USER_NAMES, rng);
            let body = pick(PHRASES, rng);
            store.append_user_message(&scope, author, body)?;
        }
    }
    tracing::info!(
        users = USER_NAMES.len(),
        messages = WELL_KNOWN_CHANNELS.len() * SEED_MESSAGES_PER_CHANNEL,
        "seeded demo content"
    );
    Ok(())
}

/// Sends a simulated post every now and then until the receiver is dropped.
pub async fn message_sender(channel: mpsc::UnboundedSender<SimulatedPost>, max_delay: Duration) {
    loop {
        let (post, delay) = generate_post(max_delay);
        if channel.send(post).is_err() {
            tracing::debug!("simulated post receiver dropped, stopping");
            return;
        }
        tokio::time::sleep(delay).await;
    }
}

fn generate_post(max_delay: Duration) -> (SimulatedPost, Duration) {
    const MIN_MESSAGE_WORDS: usize = 1;
    const MAX_MESSAGE_WORDS: usize = 15;
    let mut rng = rand::thread_rng();
    let author = pick(USER_NAMES, &mut rng).to_owned();
    let channel = pick(WELL_KNOWN_CHANNELS, &mut rng).to_owned();
    let message_len = rng.gen_range(MIN_MESSAGE_WORDS..=MAX_MESSAGE_WORDS);
    let body = lipsum::lipsum_words_with_rng(&mut rng, message_len);
    let max_millis = u64::try_from(max_delay.as_millis()).unwrap_or(u64::MAX);
    let delay = Duration::from_millis(rng.gen_range(0..=max_millis));
    (
        SimulatedPost {
            author,
            channel,
            body,
        },
        delay,
    )
}

fn pick<'a>(options: &[&'a str], rng: &mut impl Rng) -> &'a str {
    // every caller passes a non-empty constant list
    options.choose(rng).copied().unwrap_or_default()
}
