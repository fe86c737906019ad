use std::{
    fs::OpenOptions,
    io::{self, Write},
    time::Duration,
};

use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use parley_common::Scope;
use parley_store::{ConversationStore, FileSlot, Session, StoreError};
use tokio::sync::mpsc;
use tracing_subscriber::prelude::*;

mod cli;
mod render;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)
        .wrap_err_with(|| format!("failed to open log file {}", args.log_file.display()))?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::sync::Mutex::new(log_file)))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let slot = FileSlot::new(&args.data_dir, args.slot.as_str());
    let (mut store, outcome) = ConversationStore::open(slot);
    if args.should_seed(outcome) {
        parley_fake_messages::seed(&mut store).wrap_err("failed to seed demo content")?;
    }
    let mut session = Session::new(args.logout_policy());

    match run(&args, &mut store, &mut session).await {
        Err(report) if report.downcast_ref::<StoreError>().is_some_and(StoreError::is_validation) => {
            // rejected input, not a failure worth a report
            eprintln!("error: {report}");
            std::process::exit(2);
        }
        result => result,
    }
}

async fn run(
    args: &Args,
    store: &mut ConversationStore<FileSlot>,
    session: &mut Session,
) -> color_eyre::Result<()> {
    let mut out = io::stdout().lock();
    if let Some(user) = &args.user {
        if !matches!(args.command, Command::Login { .. }) {
            session.resume(store, user)?;
        }
    }

    match &args.command {
        Command::Login { username } => {
            session.login(store, username)?;
            print_scope(&mut out, store, session)?;
        }
        Command::Logout => {
            require_user(session)?;
            if let Some(notice) = session.logout(store)? {
                writeln!(out, "{}", render::message_line(&notice, None))?;
            }
        }
        Command::Send { target, body } => {
            require_user(session)?;
            switch(session, target.scope())?;
            session.send(store, &body.join(" "))?;
            print_scope(&mut out, store, session)?;
        }
        Command::Show { target, last } => {
            let scope = target.scope();
            if scope.is_direct() {
                require_user(session)?;
            }
            switch(session, scope)?;
            let messages = session.visible_messages(store);
            let skip = last.map_or(0, |last| messages.len().saturating_sub(last));
            render::write_conversation(
                &mut out,
                session.current_scope(),
                &messages[skip..],
                session.current_user(),
            )?;
        }
        Command::Users => {
            if let Some(me) = session.current_user() {
                writeln!(out, "{me} (you)")?;
            }
            for user in session.roster(store) {
                writeln!(out, "{}", render::sanitize(user))?;
            }
        }
        Command::Channels => {
            for channel in store.channels() {
                let count = store.channel_messages(channel).len();
                writeln!(out, "#{:<16} {count:>5}", render::sanitize(channel))?;
            }
        }
        Command::Simulate {
            count,
            max_delay_ms,
        } => simulate(&mut out, store, session, *count, *max_delay_ms).await?,
        Command::Reset => {
            store.reset()?;
            writeln!(out, "cleared {}", store.slot().path().display())?;
        }
    }
    Ok(())
}

async fn simulate(
    out: &mut impl Write,
    store: &mut ConversationStore<FileSlot>,
    session: &Session,
    count: Option<usize>,
    max_delay_ms: u64,
) -> color_eyre::Result<()> {
    parley_fake_messages::register_users(store)?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(parley_fake_messages::message_sender(
        tx,
        Duration::from_millis(max_delay_ms),
    ));

    let mut posted = 0;
    while count.is_none_or(|count| posted < count) {
        let post = tokio::select! {
            post = rx.recv() => post,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                None
            }
        };
        let Some(post) = post else {
            break;
        };
        let message = store.append_user_message(&post.scope(), &post.author, &post.body)?;
        writeln!(
            out,
            "{:<8} {}",
            post.scope().to_string(),
            render::message_line(&message, session.current_user())
        )?;
        posted += 1;
    }
    tracing::info!(posted, "simulation finished");
    Ok(())
}

fn require_user(session: &Session) -> color_eyre::Result<()> {
    match session.current_user() {
        Some(_) => Ok(()),
        None => Err(eyre!(StoreError::NotAuthenticated)
            .wrap_err("pass --user (or set PARLEY_USER) to act as a logged in user")),
    }
}

fn switch(session: &mut Session, scope: Scope) -> color_eyre::Result<()> {
    match scope {
        Scope::Direct(peer) => session.open_direct(&peer)?,
        scope => session.switch_scope(scope),
    }
    Ok(())
}

fn print_scope(
    out: &mut impl Write,
    store: &ConversationStore<FileSlot>,
    session: &Session,
) -> io::Result<()> {
    render::write_conversation(
        out,
        session.current_scope(),
        session.visible_messages(store),
        session.current_user(),
    )
}
