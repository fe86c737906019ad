use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parley_common::Scope;
use parley_store::{LoadOutcome, LogoutPolicy, DEFAULT_SLOT_KEY};

/// Local chat rooms, kept in a single snapshot file.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// Directory holding the snapshot file.
    #[arg(long, env = "PARLEY_DATA_DIR", default_value = ".", global = true)]
    pub data_dir: PathBuf,
    /// Name of the snapshot slot; the file is `<data-dir>/<slot>.json`.
    #[arg(long, env = "PARLEY_SLOT", default_value = DEFAULT_SLOT_KEY, global = true)]
    pub slot: String,
    /// Act as this (already logged in) user.
    #[arg(long, short, env = "PARLEY_USER", global = true)]
    pub user: Option<String>,
    #[arg(long, env = "PARLEY_LOG_FILE", default_value = "parley.log", global = true)]
    pub log_file: PathBuf,
    /// Remove users from the known-user list when they log out.
    #[arg(long, global = true)]
    pub forget_on_logout: bool,
    /// Don't fill a brand new snapshot with demo users and messages.
    #[arg(long, global = true)]
    pub no_seed: bool,
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn logout_policy(&self) -> LogoutPolicy {
        if self.forget_on_logout {
            LogoutPolicy::Forget
        } else {
            LogoutPolicy::Retain
        }
    }

    /// Demo content only goes into a slot that has never been written.
    pub fn should_seed(&self, outcome: LoadOutcome) -> bool {
        outcome == LoadOutcome::Empty && !self.no_seed && !matches!(self.command, Command::Reset)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in, announcing it in #general.
    Login { username: String },
    /// Log `--user` out.
    Logout,
    /// Post a message as `--user`.
    Send {
        #[command(flatten)]
        target: Target,
        #[arg(required = true, num_args = 1..)]
        body: Vec<String>,
    },
    /// Print a conversation.
    Show {
        #[command(flatten)]
        target: Target,
        /// Only print the last N messages.
        #[arg(long, short = 'n')]
        last: Option<usize>,
    },
    /// List known users.
    Users,
    /// List channels and how many messages each holds.
    Channels,
    /// Let the demo users chat until interrupted.
    Simulate {
        /// Stop after this many posts.
        #[arg(long)]
        count: Option<usize>,
        #[arg(long, default_value_t = 5000)]
        max_delay_ms: u64,
    },
    /// Throw away all users and messages.
    Reset,
}

#[derive(Debug, clap::Args)]
#[group(multiple = false)]
pub struct Target {
    /// Channel to use (default: general).
    #[arg(long, short)]
    pub channel: Option<String>,
    /// Direct conversation with this user.
    #[arg(long = "to", short = 't')]
    pub direct: Option<String>,
}

impl Target {
    pub fn scope(&self) -> Scope {
        match (&self.channel, &self.direct) {
            (_, Some(peer)) => Scope::direct(peer.as_str()),
            (Some(channel), None) => Scope::channel(channel.as_str()),
            (None, None) => Scope::default(),
        }
    }
}
