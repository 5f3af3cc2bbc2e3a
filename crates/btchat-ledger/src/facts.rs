//! Ledger facts
//!
//! Every committed mutation is recorded as exactly one [`LedgerFact`]. The
//! ledger state is the fold of its facts in commit order, which is also the
//! order they are written to the journal.
//!
//! Facts carry everything needed to replay them without consulting
//! configuration: a registration records the free post allowance granted at
//! the time, so changing `initial_free_posts` later does not rewrite history.

use crate::identifiers::{Address, CommentId, PostId};
use crate::records::Profile;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Schema version written alongside every journaled fact.
pub const LEDGER_FACT_SCHEMA_VERSION: u32 = 1;

/// On-disk envelope for a fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedLedgerFact {
    /// Schema version of `fact`
    pub schema_version: u32,
    /// The recorded fact
    pub fact: LedgerFact,
}

/// A committed ledger transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerFact {
    /// User registered
    UserRegistered {
        /// Registered address
        address: Address,
        /// Initial display name
        username: String,
        /// Free post allowance granted at registration
        free_posts: u32,
        /// Registration time
        registered_at: Timestamp,
    },
    /// Profile replaced wholesale
    ProfileEdited {
        /// Edited user
        address: Address,
        /// Replacement profile
        profile: Profile,
        /// Edit time
        edited_at: Timestamp,
    },
    /// Avatar changed
    ProfileImageSet {
        /// Edited user
        address: Address,
        /// New avatar URI, `None` clears it
        uri: Option<String>,
        /// Edit time
        set_at: Timestamp,
    },
    /// Banner changed
    CoverPhotoSet {
        /// Edited user
        address: Address,
        /// New banner URI, `None` clears it
        uri: Option<String>,
        /// Edit time
        set_at: Timestamp,
    },
    /// Post appended
    PostCreated {
        /// Assigned sequence id
        post_id: PostId,
        /// Author
        author: Address,
        /// Text
        content: String,
        /// Attached media URI
        image: Option<String>,
        /// Reposted post, if any
        original_post_id: Option<PostId>,
        /// Creation time
        created_at: Timestamp,
    },
    /// Post liked
    PostLiked {
        /// Liked post
        post_id: PostId,
        /// Liker
        liker: Address,
        /// Like time
        liked_at: Timestamp,
    },
    /// Comment appended
    CommentAdded {
        /// Assigned comment id
        comment_id: CommentId,
        /// Author
        commenter: Address,
        /// Text
        content: String,
        /// Attached media URI
        image: Option<String>,
        /// Creation time
        created_at: Timestamp,
    },
    /// Comment liked
    CommentLiked {
        /// Liked comment
        comment_id: CommentId,
        /// Liker
        liker: Address,
        /// Like time
        liked_at: Timestamp,
    },
}

impl LedgerFact {
    /// Address whose action produced this fact.
    pub fn actor(&self) -> &Address {
        match self {
            LedgerFact::UserRegistered { address, .. }
            | LedgerFact::ProfileEdited { address, .. }
            | LedgerFact::ProfileImageSet { address, .. }
            | LedgerFact::CoverPhotoSet { address, .. } => address,
            LedgerFact::PostCreated { author, .. } => author,
            LedgerFact::PostLiked { liker, .. } | LedgerFact::CommentLiked { liker, .. } => liker,
            LedgerFact::CommentAdded { commenter, .. } => commenter,
        }
    }

    /// Commit time of this fact.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            LedgerFact::UserRegistered { registered_at, .. } => *registered_at,
            LedgerFact::ProfileEdited { edited_at, .. } => *edited_at,
            LedgerFact::ProfileImageSet { set_at, .. } => *set_at,
            LedgerFact::CoverPhotoSet { set_at, .. } => *set_at,
            LedgerFact::PostCreated { created_at, .. } => *created_at,
            LedgerFact::PostLiked { liked_at, .. } => *liked_at,
            LedgerFact::CommentAdded { created_at, .. } => *created_at,
            LedgerFact::CommentLiked { liked_at, .. } => *liked_at,
        }
    }

    /// Short name of the fact kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerFact::UserRegistered { .. } => "user-registered",
            LedgerFact::ProfileEdited { .. } => "profile-edited",
            LedgerFact::ProfileImageSet { .. } => "profile-image-set",
            LedgerFact::CoverPhotoSet { .. } => "cover-photo-set",
            LedgerFact::PostCreated { .. } => "post-created",
            LedgerFact::PostLiked { .. } => "post-liked",
            LedgerFact::CommentAdded { .. } => "comment-added",
            LedgerFact::CommentLiked { .. } => "comment-liked",
        }
    }

    /// Encode as a single journal line (no trailing newline).
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&VersionedLedgerFact {
            schema_version: LEDGER_FACT_SCHEMA_VERSION,
            fact: self.clone(),
        })
    }

    /// Decode a journal line, returning the schema version it was written with.
    pub fn from_json_line(line: &str) -> Result<VersionedLedgerFact, serde_json::Error> {
        serde_json::from_str(line)
    }
}
