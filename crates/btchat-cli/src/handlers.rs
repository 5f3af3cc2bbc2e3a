//! Command handlers
//!
//! Each invocation runs one command against the journal and returns the
//! text to print. Reads render as pretty JSON.

use crate::cli::{Cli, Commands, ShowCommand};
use anyhow::{anyhow, Context, Result};
use btchat_ledger::{
    replay_journal, Address, CommandOutcome, DurableLedger, LedgerConfig, LedgerEngine, PostId,
    PostView, StoreError, SystemTimeSource, Timestamp,
};
use chrono::{TimeZone, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Run a parsed invocation and return its output.
///
/// Mutations open the journal for appending; reads only replay it, so they
/// never create the journal or its directory.
pub fn run(cli: Cli) -> Result<String> {
    let config = LedgerConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Config => handle_config(&config),
        Commands::Show(ShowCommand::Feed { start, limit }) => {
            let ledger = load_snapshot(&cli.journal, config)?;
            handle_feed(&ledger, start, limit)
        }
        command => {
            let command = command
                .into_ledger_command()
                .ok_or_else(|| anyhow!("command is not handled by the ledger"))?;
            let name = command.name();
            let result = if command.is_mutation() {
                open_ledger(&cli.journal, config)?.execute(command)
            } else {
                load_snapshot(&cli.journal, config)?
                    .execute(command)
                    .map_err(StoreError::from)
            };
            let outcome = result.map_err(|err| match err.as_rejection() {
                Some(rejection) => anyhow!("{name} rejected [{}]: {rejection}", rejection.code()),
                None => anyhow::Error::new(err).context(format!("{name} failed")),
            })?;
            render_outcome(outcome)
        }
    }
}

fn open_ledger(journal: &Path, config: LedgerConfig) -> Result<DurableLedger> {
    DurableLedger::open(journal, config)
        .with_context(|| format!("failed to open journal {}", journal.display()))
}

/// In-memory ledger rebuilt from the journal, for reads.
fn load_snapshot(journal: &Path, config: LedgerConfig) -> Result<LedgerEngine> {
    let state = replay_journal(journal)
        .with_context(|| format!("failed to replay journal {}", journal.display()))?;
    Ok(LedgerEngine::from_state(config, Arc::new(SystemTimeSource), state))
}

fn handle_config(config: &LedgerConfig) -> Result<String> {
    toml::to_string_pretty(config).context("failed to render configuration")
}

/// Render a command outcome for the terminal.
pub fn render_outcome(outcome: CommandOutcome) -> Result<String> {
    let text = match outcome {
        CommandOutcome::Registered(address) => format!("registered {address}"),
        CommandOutcome::ProfileUpdated => "profile updated".to_string(),
        CommandOutcome::PostCreated(receipt) => {
            let quota = if receipt.used_free_quota {
                "free post"
            } else {
                "free posts exhausted"
            };
            format!("post {} created ({quota})", receipt.post_id)
        }
        CommandOutcome::Liked => "liked".to_string(),
        CommandOutcome::CommentAdded(id) => format!("comment {id} added"),
        CommandOutcome::PostsCount(count) => count.to_string(),
        CommandOutcome::FreePostsRemaining(count) => count.to_string(),
        CommandOutcome::User(user) => to_json(&user)?,
        CommandOutcome::Post(post) => to_json(&post)?,
        CommandOutcome::Comment(comment) => to_json(&comment)?,
        CommandOutcome::Stats(stats) => to_json(&stats)?,
        CommandOutcome::Posts(posts) => to_json(&posts)?,
        CommandOutcome::Comments(comments) => to_json(&comments)?,
    };
    Ok(text)
}

/// One line of the feed, with a readable timestamp.
#[derive(Debug, Serialize)]
struct FeedEntry {
    id: PostId,
    author: Address,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    posted_at: String,
    likes: u64,
    comments: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    repost_of: Option<PostId>,
}

impl From<PostView> for FeedEntry {
    fn from(post: PostView) -> Self {
        Self {
            id: post.id,
            author: post.author,
            content: post.content,
            image: post.image,
            posted_at: rfc3339(post.timestamp),
            likes: post.like_count,
            comments: post.comment_count,
            repost_of: post.original_post_id,
        }
    }
}

fn handle_feed(ledger: &LedgerEngine, start: u64, limit: usize) -> Result<String> {
    let entries: Vec<FeedEntry> = ledger
        .list_posts(start, limit)
        .into_iter()
        .map(FeedEntry::from)
        .collect();
    to_json(&entries)
}

fn rfc3339(timestamp: Timestamp) -> String {
    i64::try_from(timestamp.ts_ms)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to render output")
}
