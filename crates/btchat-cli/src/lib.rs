//! BTChat CLI Library
//!
//! Argument parsing and command handlers for the `btchat` binary. Every
//! invocation replays the journal, runs a single command through the
//! durable ledger and returns the text to print.

#![allow(missing_docs)]

pub mod cli;
pub mod handlers;

pub use cli::{Cli, Commands, ProfileCommand, ShowCommand, DEFAULT_JOURNAL};
pub use handlers::{render_outcome, run};
