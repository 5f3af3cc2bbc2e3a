//! BTChat Ledger - Social Feed Record Store
//!
//! This crate owns the authoritative state of the BTChat social feed:
//! registered users, their posts, comments and likes, and the per-user free
//! posting quota. Every mutation is validated and applied atomically.
//!
//! # Architecture
//!
//! - Facts: `LedgerFact` describes one committed transition; state is the
//!   fold of facts in commit order
//! - State: `LedgerState` prepares facts from caller input and applies them
//!   after checking structural invariants
//! - Engine: `LedgerEngine` serializes mutations behind a lock and serves
//!   snapshot reads
//! - Surfaces: `LedgerCommand` for transports, `DurableLedger` for a
//!   journal file, `LedgerHandle` for async callers
//!
//! Media storage, wallets and pricing live outside the ledger. Media URIs and
//! addresses are opaque strings here, and the quota is only a counter.
//!
//! # Example
//!
//! ```
//! use btchat_ledger::{Address, LedgerConfig, LedgerEngine, LedgerError, PostId};
//!
//! let ledger = LedgerEngine::new(LedgerConfig::default());
//! let alice = Address::new("0xa11ce")?;
//! let bob = Address::new("0xb0b")?;
//!
//! ledger.register_user(&alice, "Alice")?;
//! ledger.register_user(&bob, "Bob")?;
//!
//! let receipt = ledger.create_post(&alice, "Hello World", None, None)?;
//! assert_eq!(receipt.post_id, PostId(0));
//!
//! ledger.like_post(&bob, receipt.post_id)?;
//! assert_eq!(ledger.like_post(&bob, receipt.post_id), Err(LedgerError::AlreadyLiked));
//! assert_eq!(ledger.post(receipt.post_id)?.like_count, 1);
//! # Ok::<(), LedgerError>(())
//! ```

pub mod actor;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod facts;
pub mod identifiers;
pub mod journal;
pub mod records;
pub mod state;
pub mod time;

pub use actor::{HandleError, LedgerActor, LedgerHandle};
pub use command::{CommandOutcome, LedgerCommand};
pub use config::{ConfigError, LedgerConfig};
pub use engine::{FactSink, LedgerEngine, NoopSink};
pub use error::{LedgerError, Result};
pub use facts::{LedgerFact, VersionedLedgerFact, LEDGER_FACT_SCHEMA_VERSION};
pub use identifiers::{Address, CommentId, PostId};
pub use journal::{read_journal, replay_journal, DurableLedger, JournalWriter, StoreError};
pub use records::{
    CommentView, PostReceipt, PostView, Profile, ProfileUpdate, UserStats, UserView,
};
pub use state::LedgerState;
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource, Timestamp};
