//! File-backed journal
//!
//! The durable form of the ledger is an append-only file of
//! [`VersionedLedgerFact`](crate::facts::VersionedLedgerFact) records, one
//! JSON document per line. Opening a journal replays every line through the
//! same structural checks as live mutations; each committed mutation is
//! written and synced before it is applied in memory.
//!
//! [`DurableLedger`] exposes reads directly and mutations only through
//! [`DurableLedger::execute`], so nothing reaches memory without the journal.

use crate::command::{CommandOutcome, LedgerCommand};
use crate::config::LedgerConfig;
use crate::engine::{FactSink, LedgerEngine};
use crate::error::LedgerError;
use crate::facts::{LedgerFact, LEDGER_FACT_SCHEMA_VERSION};
use crate::identifiers::{Address, PostId};
use crate::records::{CommentView, PostView, UserStats, UserView};
use crate::state::LedgerState;
use crate::time::{SystemTimeSource, TimeSource};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors from the file-backed ledger.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Journal file could not be read or written.
    #[error("journal I/O error on {path}: {source}")]
    Io {
        /// Journal path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A fact could not be encoded.
    #[error("failed to encode fact: {0}")]
    Encode(#[source] serde_json::Error),

    /// A journal line is not a valid fact record.
    #[error("journal line {line} is malformed: {source}")]
    Malformed {
        /// One-based line number
        line: usize,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// A journal line was written by an unknown schema.
    #[error("journal line {line} has unsupported schema version {version}")]
    UnsupportedSchema {
        /// One-based line number
        line: usize,
        /// Version found on the line
        version: u32,
    },

    /// A journal line describes a transition the ledger would reject.
    #[error("journal line {line} violates ledger invariants: {source}")]
    CorruptJournal {
        /// One-based line number
        line: usize,
        /// Invariant that failed
        #[source]
        source: LedgerError,
    },

    /// An earlier append could not be rolled back; the writer refuses
    /// further appends until the journal is reopened.
    #[error("journal {path} is poisoned by an incomplete append")]
    Poisoned {
        /// Journal path
        path: String,
    },

    /// The mutation was rejected; nothing was written.
    #[error(transparent)]
    Rejected(#[from] LedgerError),
}

impl StoreError {
    /// The rejection carried by this error, if it is one.
    pub fn as_rejection(&self) -> Option<&LedgerError> {
        match self {
            Self::Rejected(err) => Some(err),
            _ => None,
        }
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Read and decode every fact in a journal. A missing file is an empty journal.
pub fn read_journal(path: &Path) -> Result<Vec<LedgerFact>, StoreError> {
    Ok(read_numbered(path)?
        .into_iter()
        .map(|(_, fact)| fact)
        .collect())
}

/// Rebuild ledger state from a journal file.
pub fn replay_journal(path: &Path) -> Result<LedgerState, StoreError> {
    let mut state = LedgerState::new();
    for (line, fact) in read_numbered(path)? {
        state
            .apply(fact)
            .map_err(|source| StoreError::CorruptJournal { line, source })?;
    }
    Ok(state)
}

fn read_numbered(path: &Path) -> Result<Vec<(usize, LedgerFact)>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(StoreError::io(path, err)),
    };

    let mut facts = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|e| StoreError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let versioned = LedgerFact::from_json_line(&line).map_err(|source| {
            StoreError::Malformed {
                line: line_no,
                source,
            }
        })?;
        if versioned.schema_version != LEDGER_FACT_SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                line: line_no,
                version: versioned.schema_version,
            });
        }
        facts.push((line_no, versioned.fact));
    }
    Ok(facts)
}

/// Appends facts to a journal file.
///
/// An append either lands as one complete, synced line or leaves the file at
/// its previous length. If that cannot be guaranteed the writer is poisoned.
#[derive(Debug)]
pub struct JournalWriter {
    path: PathBuf,
    file: File,
    written: u64,
    poisoned: bool,
}

impl JournalWriter {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StoreError::io(path, e))?;
        Ok(Self::from_file(path, file))
    }

    fn from_file(path: &Path, file: File) -> Self {
        Self {
            path: path.to_path_buf(),
            file,
            written: 0,
            poisoned: false,
        }
    }

    /// Journal path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Facts appended through this writer.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Whether a failed append could not be undone.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn append_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.file.write_all(line)?;
        self.file.sync_data()
    }

    /// Cut the file back to `len` bytes after a failed append.
    fn rollback(&mut self, len: u64) {
        let restored = self
            .file
            .set_len(len)
            .and_then(|()| self.file.sync_data());
        if let Err(err) = restored {
            error!(path = %self.path.display(), %err, "journal rollback failed");
            self.poisoned = true;
        } else {
            warn!(path = %self.path.display(), len, "journal append rolled back");
        }
    }
}

impl FactSink for JournalWriter {
    type Error = StoreError;

    fn persist(&mut self, fact: &LedgerFact) -> Result<(), StoreError> {
        if self.poisoned {
            return Err(StoreError::Poisoned {
                path: self.path.display().to_string(),
            });
        }
        let mut line = fact.to_json_line().map_err(StoreError::Encode)?;
        line.push('\n');

        let len = match self.file.metadata() {
            Ok(meta) => meta.len(),
            Err(err) => return Err(StoreError::io(&self.path, err)),
        };
        if let Err(err) = self.append_line(line.as_bytes()) {
            self.rollback(len);
            return Err(StoreError::io(&self.path, err));
        }
        self.written += 1;
        Ok(())
    }
}

/// A ledger whose every committed mutation is journaled to disk.
#[derive(Debug)]
pub struct DurableLedger {
    engine: LedgerEngine,
    writer: Mutex<JournalWriter>,
}

impl DurableLedger {
    /// Open (or create) the journal at `path` using the wall clock.
    pub fn open(path: &Path, config: LedgerConfig) -> Result<Self, StoreError> {
        Self::open_with_time_source(path, config, Arc::new(SystemTimeSource))
    }

    /// Open (or create) the journal at `path` using the given clock.
    pub fn open_with_time_source(
        path: &Path,
        config: LedgerConfig,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, StoreError> {
        let state = replay_journal(path)?;
        info!(
            path = %path.display(),
            facts = state.fact_count(),
            users = state.users_count(),
            posts = state.posts_count(),
            "journal replayed"
        );
        let writer = JournalWriter::open(path)?;
        Ok(Self {
            engine: LedgerEngine::from_state(config, clock, state),
            writer: Mutex::new(writer),
        })
    }

    /// Execute a command, journaling its fact before applying it.
    pub fn execute(&self, command: LedgerCommand) -> Result<CommandOutcome, StoreError> {
        if !command.is_mutation() {
            return Ok(self.engine.execute(command)?);
        }
        let mut writer = self.writer.lock();
        self.engine.execute_with(command, &mut *writer)
    }

    /// Consistent copy of the whole state.
    pub fn snapshot(&self) -> LedgerState {
        self.engine.snapshot()
    }

    /// Active configuration.
    pub fn config(&self) -> &LedgerConfig {
        self.engine.config()
    }

    /// Read a user.
    pub fn user_by_address(&self, address: &Address) -> Result<UserView, LedgerError> {
        self.engine.user_by_address(address)
    }

    /// Number of posts.
    pub fn posts_count(&self) -> u64 {
        self.engine.posts_count()
    }

    /// Read a post.
    pub fn post(&self, post_id: PostId) -> Result<PostView, LedgerError> {
        self.engine.post(post_id)
    }

    /// Read a comment.
    pub fn comment(&self, post_id: PostId, index: u64) -> Result<CommentView, LedgerError> {
        self.engine.comment(post_id, index)
    }

    /// Read a user's free post allowance.
    pub fn free_posts_remaining(&self, address: &Address) -> Result<u32, LedgerError> {
        self.engine.free_posts_remaining(address)
    }

    /// Read a user's activity counters.
    pub fn user_stats(&self, address: &Address) -> Result<UserStats, LedgerError> {
        self.engine.user_stats(address)
    }

    /// Posts `start..start + limit`, with `limit` capped by the page size.
    pub fn list_posts(&self, start: u64, limit: usize) -> Vec<PostView> {
        self.engine.list_posts(start, limit)
    }

    /// Journal path.
    pub fn path(&self) -> PathBuf {
        self.writer.lock().path().to_path_buf()
    }
}
