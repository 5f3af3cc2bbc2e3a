//! Ledger error types
//!
//! Every rejected mutation or failed lookup is reported as a [`LedgerError`].
//! All variants are precondition failures: nothing is applied when one is
//! returned and retrying the same input yields the same error.

use crate::identifiers::{Address, CommentId, PostId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum LedgerError {
    /// Address already has a user record.
    #[error("User is already registered: {0}")]
    AlreadyRegistered(Address),

    /// Address has no user record.
    #[error("User is not registered: {0}")]
    NotRegistered(Address),

    /// Post or comment content is empty.
    #[error("Content should not be empty")]
    EmptyContent,

    /// Post or comment content exceeds the configured limit.
    #[error("Content is too long ({length} characters, max {max})")]
    ContentTooLong {
        /// Submitted length in characters
        length: usize,
        /// Configured maximum
        max: usize,
    },

    /// Post id does not exist.
    #[error("Post {0} not found")]
    PostNotFound(PostId),

    /// Comment id does not exist on an existing post.
    #[error("Comment {0} not found")]
    CommentNotFound(CommentId),

    /// Address already liked this post or comment.
    #[error("User has already liked this post")]
    AlreadyLiked,

    /// Username is empty.
    #[error("Username should not be empty")]
    EmptyUsername,

    /// Address is empty.
    #[error("Address should not be empty")]
    InvalidAddress,

    /// Record id does not extend its sequence (journal replay only).
    #[error("Record id {found} out of sequence (expected {expected})")]
    OutOfSequence {
        /// Next id the sequence would accept
        expected: u64,
        /// Id carried by the rejected fact
        found: u64,
    },

    /// Bio exceeds the configured limit.
    #[error("Bio is too long ({length} characters, max {max})")]
    BioTooLong {
        /// Submitted length in characters
        length: usize,
        /// Configured maximum
        max: usize,
    },
}

impl LedgerError {
    /// Create a content too long error.
    pub fn content_too_long(length: usize, max: usize) -> Self {
        Self::ContentTooLong { length, max }
    }

    /// Create a bio too long error.
    pub fn bio_too_long(length: usize, max: usize) -> Self {
        Self::BioTooLong { length, max }
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered(_) => "ALREADY_REGISTERED",
            Self::NotRegistered(_) => "NOT_REGISTERED",
            Self::EmptyContent => "EMPTY_CONTENT",
            Self::ContentTooLong { .. } => "CONTENT_TOO_LONG",
            Self::PostNotFound(_) => "POST_NOT_FOUND",
            Self::CommentNotFound(_) => "COMMENT_NOT_FOUND",
            Self::AlreadyLiked => "ALREADY_LIKED",
            Self::EmptyUsername => "EMPTY_USERNAME",
            Self::InvalidAddress => "INVALID_ADDRESS",
            Self::OutOfSequence { .. } => "OUT_OF_SEQUENCE",
            Self::BioTooLong { .. } => "BIO_TOO_LONG",
        }
    }

    /// Whether the ledger itself would ever succeed on a retry.
    ///
    /// Always `false`: callers must correct their input instead.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Whether this error reports a missing record rather than a rejected mutation.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotRegistered(_) | Self::PostNotFound(_) | Self::CommentNotFound(_)
        )
    }
}

/// Result alias for ledger operations.
pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_keeps_revert_reasons() {
        let addr = Address::new("0xabc").unwrap();

        let err = LedgerError::AlreadyRegistered(addr);
        assert!(err.to_string().starts_with("User is already registered"));

        assert_eq!(
            LedgerError::EmptyContent.to_string(),
            "Content should not be empty"
        );
        assert_eq!(
            LedgerError::AlreadyLiked.to_string(),
            "User has already liked this post"
        );

        let err = LedgerError::content_too_long(300, 280);
        assert!(err.to_string().contains("300"));
        assert!(err.to_string().contains("280"));
    }

    #[test]
    fn test_codes_are_distinct() {
        let addr = Address::new("0xabc").unwrap();
        let errors = [
            LedgerError::AlreadyRegistered(addr.clone()),
            LedgerError::NotRegistered(addr),
            LedgerError::EmptyContent,
            LedgerError::content_too_long(1, 0),
            LedgerError::PostNotFound(PostId(0)),
            LedgerError::CommentNotFound(CommentId::new(PostId(0), 0)),
            LedgerError::AlreadyLiked,
            LedgerError::EmptyUsername,
            LedgerError::InvalidAddress,
            LedgerError::OutOfSequence {
                expected: 1,
                found: 2,
            },
            LedgerError::bio_too_long(1, 0),
        ];

        let mut codes: Vec<_> = errors.iter().map(LedgerError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(errors.iter().all(|e| !e.is_retryable()));
    }

    #[test]
    fn test_not_found_classification() {
        assert!(LedgerError::PostNotFound(PostId(3)).is_not_found());
        assert!(!LedgerError::AlreadyLiked.is_not_found());
    }
}
