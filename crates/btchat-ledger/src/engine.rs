//! Ledger engine
//!
//! [`LedgerEngine`] is the single owner of ledger state. Mutations hold the
//! write lock for the whole prepare → check → persist → apply sequence, so
//! they are applied one at a time and never observed half-done. Reads take
//! the read lock and return detached views.
//!
//! Durable callers pass a [`FactSink`] that sees each fact after it has been
//! validated and before it is applied; a sink failure aborts the mutation
//! with the state untouched.

use crate::command::{CommandOutcome, LedgerCommand};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::facts::LedgerFact;
use crate::identifiers::{Address, CommentId, PostId};
use crate::records::{CommentView, PostReceipt, PostView, ProfileUpdate, UserStats, UserView};
use crate::state::LedgerState;
use crate::time::{SystemTimeSource, TimeSource, Timestamp};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Receives validated facts before they are applied.
pub trait FactSink {
    /// Error returned by the sink; must be able to carry a rejection.
    type Error: From<LedgerError>;

    /// Record a fact. Returning an error aborts the mutation.
    fn persist(&mut self, fact: &LedgerFact) -> std::result::Result<(), Self::Error>;
}

/// Sink for purely in-memory ledgers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl FactSink for NoopSink {
    type Error = LedgerError;

    fn persist(&mut self, _fact: &LedgerFact) -> Result<()> {
        Ok(())
    }
}

/// The social-feed ledger.
pub struct LedgerEngine {
    state: RwLock<LedgerState>,
    config: LedgerConfig,
    clock: Arc<dyn TimeSource>,
}

impl std::fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("config", &self.config)
            .field("facts", &self.state.read().fact_count())
            .finish_non_exhaustive()
    }
}

impl LedgerEngine {
    /// Empty ledger using the wall clock.
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_time_source(config, Arc::new(SystemTimeSource))
    }

    /// Empty ledger using the given clock.
    pub fn with_time_source(config: LedgerConfig, clock: Arc<dyn TimeSource>) -> Self {
        Self::from_state(config, clock, LedgerState::new())
    }

    /// Ledger resuming from an existing state (e.g. a replayed journal).
    pub fn from_state(
        config: LedgerConfig,
        clock: Arc<dyn TimeSource>,
        state: LedgerState,
    ) -> Self {
        Self {
            state: RwLock::new(state),
            config,
            clock,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Consistent copy of the whole state.
    pub fn snapshot(&self) -> LedgerState {
        self.state.read().clone()
    }

    /// Prepare, check, persist and apply one fact under the write lock.
    ///
    /// `prepare` returns the fact together with the value the caller reports
    /// on success, both computed from the same locked state.
    fn commit<S, T, P>(&self, sink: &mut S, prepare: P) -> std::result::Result<Committed<T>, S::Error>
    where
        S: FactSink,
        P: FnOnce(&LedgerState, &LedgerConfig, Timestamp) -> Result<(LedgerFact, T)>,
    {
        let mut state = self.state.write();
        let now = self.clock.now();

        let (fact, value) = prepare(&*state, &self.config, now)
            .and_then(|(fact, value)| state.check(&fact).map(|()| (fact, value)))
            .map_err(|err| {
                debug!(code = err.code(), %err, "mutation rejected");
                err
            })?;

        sink.persist(&fact)?;

        let used_free_quota = state.uses_free_quota(&fact);
        debug!(
            kind = fact.kind(),
            actor = %fact.actor(),
            ts_ms = now.ts_ms,
            "fact committed"
        );
        state.apply_checked(fact);
        Ok(Committed {
            value,
            used_free_quota,
        })
    }

    /// [`Self::commit`] for mutations that report nothing beyond success.
    fn commit_unit<S, P>(&self, sink: &mut S, prepare: P) -> std::result::Result<(), S::Error>
    where
        S: FactSink,
        P: FnOnce(&LedgerState, &LedgerConfig, Timestamp) -> Result<LedgerFact>,
    {
        self.commit(sink, |state, config, now| {
            prepare(state, config, now).map(|fact| (fact, ()))
        })
        .map(|_| ())
    }

    fn commit_post<S, P>(&self, sink: &mut S, prepare: P) -> std::result::Result<PostReceipt, S::Error>
    where
        S: FactSink,
        P: FnOnce(&LedgerState, &LedgerConfig, Timestamp) -> Result<LedgerFact>,
    {
        self.commit(sink, |state, config, now| {
            // `check` rejects any other id, so the appended post gets this one.
            let post_id = PostId(state.posts_count());
            prepare(state, config, now).map(|fact| (fact, post_id))
        })
        .map(|committed| PostReceipt {
            post_id: committed.value,
            used_free_quota: committed.used_free_quota,
        })
    }

    fn commit_comment<S, P>(
        &self,
        sink: &mut S,
        post_id: PostId,
        prepare: P,
    ) -> std::result::Result<CommentId, S::Error>
    where
        S: FactSink,
        P: FnOnce(&LedgerState, &LedgerConfig, Timestamp) -> Result<LedgerFact>,
    {
        self.commit(sink, |state, config, now| {
            let fact = prepare(state, config, now)?;
            let index = state.post(post_id)?.comment_count();
            Ok((fact, CommentId::new(post_id, index)))
        })
        .map(|committed| committed.value)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Register `address` with an initial username.
    pub fn register_user(&self, address: &Address, username: &str) -> Result<Address> {
        self.commit_unit(&mut NoopSink, |state, config, now| {
            state.prepare_register_user(config, now, address, username)
        })
        .map(|()| address.clone())
    }

    /// Replace a user's profile wholesale.
    pub fn edit_profile(&self, address: &Address, update: ProfileUpdate) -> Result<()> {
        self.commit_unit(&mut NoopSink, |state, config, now| {
            state.prepare_edit_profile(config, now, address, update)
        })
    }

    /// Replace a user's avatar URI. An empty URI clears it.
    pub fn set_profile_image(&self, address: &Address, uri: &str) -> Result<()> {
        self.commit_unit(&mut NoopSink, |state, _, now| {
            state.prepare_set_profile_image(now, address, uri)
        })
    }

    /// Replace a user's banner URI. An empty URI clears it.
    pub fn set_cover_photo(&self, address: &Address, uri: &str) -> Result<()> {
        self.commit_unit(&mut NoopSink, |state, _, now| {
            state.prepare_set_cover_photo(now, address, uri)
        })
    }

    /// Append a post, optionally marking it as a repost of `original_post_id`.
    pub fn create_post(
        &self,
        author: &Address,
        content: &str,
        image: Option<&str>,
        original_post_id: Option<PostId>,
    ) -> Result<PostReceipt> {
        self.commit_post(&mut NoopSink, |state, config, now| {
            state.prepare_create_post(config, now, author, content, image, original_post_id)
        })
    }

    /// Repost `post_id`, optionally replacing its text with `comment`.
    pub fn repost(
        &self,
        author: &Address,
        post_id: PostId,
        comment: Option<&str>,
    ) -> Result<PostReceipt> {
        self.commit_post(&mut NoopSink, |state, config, now| {
            state.prepare_repost(config, now, author, post_id, comment)
        })
    }

    /// Like a post once per address.
    pub fn like_post(&self, liker: &Address, post_id: PostId) -> Result<()> {
        self.commit_unit(&mut NoopSink, |state, _, now| {
            state.prepare_like_post(now, liker, post_id)
        })
    }

    /// Append a comment to a post.
    pub fn add_comment(
        &self,
        commenter: &Address,
        post_id: PostId,
        content: &str,
        image: Option<&str>,
    ) -> Result<CommentId> {
        self.commit_comment(&mut NoopSink, post_id, |state, config, now| {
            state.prepare_add_comment(config, now, commenter, post_id, content, image)
        })
    }

    /// Like a comment once per address.
    pub fn like_comment(&self, liker: &Address, comment_id: CommentId) -> Result<()> {
        self.commit_unit(&mut NoopSink, |state, _, now| {
            state.prepare_like_comment(now, liker, comment_id)
        })
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Read a user.
    pub fn user_by_address(&self, address: &Address) -> Result<UserView> {
        self.state.read().user(address).map(|u| u.view())
    }

    /// Whether `address` is registered.
    pub fn is_registered(&self, address: &Address) -> bool {
        self.state.read().is_registered(address)
    }

    /// Number of registered users.
    pub fn users_count(&self) -> u64 {
        self.state.read().users_count()
    }

    /// Number of posts.
    pub fn posts_count(&self) -> u64 {
        self.state.read().posts_count()
    }

    /// Read a post.
    pub fn post(&self, post_id: PostId) -> Result<PostView> {
        self.state.read().post(post_id).map(|p| p.view())
    }

    /// Read a comment.
    pub fn comment(&self, post_id: PostId, index: u64) -> Result<CommentView> {
        self.state
            .read()
            .comment(CommentId::new(post_id, index))
            .map(|c| c.view())
    }

    /// Read a user's free post allowance.
    pub fn free_posts_remaining(&self, address: &Address) -> Result<u32> {
        self.state
            .read()
            .user(address)
            .map(|u| u.free_posts_remaining)
    }

    /// Read a user's activity counters.
    pub fn user_stats(&self, address: &Address) -> Result<UserStats> {
        self.state.read().user(address).map(|u| u.stats)
    }

    /// Whether `address` liked `post_id`.
    pub fn has_liked(&self, address: &Address, post_id: PostId) -> Result<bool> {
        self.state
            .read()
            .post(post_id)
            .map(|p| p.is_liked_by(address))
    }

    /// Posts `start..start + limit`, with `limit` capped by the page size.
    pub fn list_posts(&self, start: u64, limit: usize) -> Vec<PostView> {
        let limit = self.config.page_limit(limit);
        self.state
            .read()
            .posts_range(start, limit)
            .iter()
            .map(|p| p.view())
            .collect()
    }

    /// Comments `start..start + limit` of a post, with `limit` capped by the
    /// page size.
    pub fn list_comments(
        &self,
        post_id: PostId,
        start: u64,
        limit: usize,
    ) -> Result<Vec<CommentView>> {
        let limit = self.config.page_limit(limit);
        let state = self.state.read();
        Ok(state
            .comments_range(post_id, start, limit)?
            .iter()
            .map(|c| c.view())
            .collect())
    }

    // ------------------------------------------------------------------
    // Command surface
    // ------------------------------------------------------------------

    /// Execute a command against the in-memory ledger.
    pub fn execute(&self, command: LedgerCommand) -> Result<CommandOutcome> {
        self.execute_with(command, &mut NoopSink)
    }

    /// Execute a command, handing the resulting fact (if any) to `sink`
    /// before it is applied.
    pub fn execute_with<S: FactSink>(
        &self,
        command: LedgerCommand,
        sink: &mut S,
    ) -> std::result::Result<CommandOutcome, S::Error> {
        let outcome = match command {
            LedgerCommand::RegisterUser { address, username } => {
                self.commit_unit(sink, |state, config, now| {
                    state.prepare_register_user(config, now, &address, &username)
                })?;
                CommandOutcome::Registered(address)
            }
            LedgerCommand::EditProfile { address, update } => {
                self.commit_unit(sink, |state, config, now| {
                    state.prepare_edit_profile(config, now, &address, update)
                })?;
                CommandOutcome::ProfileUpdated
            }
            LedgerCommand::SetProfileImage { address, uri } => {
                self.commit_unit(sink, |state, _, now| {
                    state.prepare_set_profile_image(now, &address, &uri)
                })?;
                CommandOutcome::ProfileUpdated
            }
            LedgerCommand::SetCoverPhoto { address, uri } => {
                self.commit_unit(sink, |state, _, now| {
                    state.prepare_set_cover_photo(now, &address, &uri)
                })?;
                CommandOutcome::ProfileUpdated
            }
            LedgerCommand::CreatePost {
                address,
                content,
                image,
                original_post_id,
            } => {
                let receipt = self.commit_post(sink, |state, config, now| {
                    state.prepare_create_post(
                        config,
                        now,
                        &address,
                        &content,
                        image.as_deref(),
                        original_post_id,
                    )
                })?;
                CommandOutcome::PostCreated(receipt)
            }
            LedgerCommand::Repost {
                address,
                post_id,
                comment,
            } => {
                let receipt = self.commit_post(sink, |state, config, now| {
                    state.prepare_repost(config, now, &address, post_id, comment.as_deref())
                })?;
                CommandOutcome::PostCreated(receipt)
            }
            LedgerCommand::LikePost { address, post_id } => {
                self.commit_unit(sink, |state, _, now| {
                    state.prepare_like_post(now, &address, post_id)
                })?;
                CommandOutcome::Liked
            }
            LedgerCommand::AddComment {
                address,
                post_id,
                content,
                image,
            } => {
                let comment_id = self.commit_comment(sink, post_id, |state, config, now| {
                    state.prepare_add_comment(
                        config,
                        now,
                        &address,
                        post_id,
                        &content,
                        image.as_deref(),
                    )
                })?;
                CommandOutcome::CommentAdded(comment_id)
            }
            LedgerCommand::LikeComment {
                address,
                comment_id,
            } => {
                self.commit_unit(sink, |state, _, now| {
                    state.prepare_like_comment(now, &address, comment_id)
                })?;
                CommandOutcome::Liked
            }
            LedgerCommand::GetUserByAddress { address } => {
                CommandOutcome::User(self.user_by_address(&address)?)
            }
            LedgerCommand::GetPostsCount => CommandOutcome::PostsCount(self.posts_count()),
            LedgerCommand::GetPost { post_id } => CommandOutcome::Post(self.post(post_id)?),
            LedgerCommand::GetComment { comment_id } => {
                CommandOutcome::Comment(self.comment(comment_id.post_id, comment_id.index)?)
            }
            LedgerCommand::GetFreePostsRemaining { address } => {
                CommandOutcome::FreePostsRemaining(self.free_posts_remaining(&address)?)
            }
            LedgerCommand::GetUserStats { address } => {
                CommandOutcome::Stats(self.user_stats(&address)?)
            }
            LedgerCommand::ListPosts { start, limit } => {
                CommandOutcome::Posts(self.list_posts(start, limit))
            }
            LedgerCommand::ListComments {
                post_id,
                start,
                limit,
            } => CommandOutcome::Comments(self.list_comments(post_id, start, limit)?),
        };
        Ok(outcome)
    }
}

/// Outcome of a commit: the caller's value plus quota bookkeeping.
struct Committed<T> {
    value: T,
    used_free_quota: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualTimeSource;

    #[derive(Debug, PartialEq)]
    enum SinkError {
        Full,
        Rejected(LedgerError),
    }

    impl From<LedgerError> for SinkError {
        fn from(err: LedgerError) -> Self {
            Self::Rejected(err)
        }
    }

    /// Accepts a fixed number of facts, then fails.
    struct BoundedSink {
        seen: Vec<LedgerFact>,
        capacity: usize,
    }

    impl FactSink for BoundedSink {
        type Error = SinkError;

        fn persist(&mut self, fact: &LedgerFact) -> std::result::Result<(), SinkError> {
            if self.seen.len() == self.capacity {
                return Err(SinkError::Full);
            }
            self.seen.push(fact.clone());
            Ok(())
        }
    }

    fn engine() -> LedgerEngine {
        LedgerEngine::with_time_source(
            LedgerConfig::default(),
            Arc::new(ManualTimeSource::new(1_000)),
        )
    }

    fn alice() -> Address {
        Address::new("0xa11ce").unwrap()
    }

    #[test]
    fn sink_failure_leaves_state_untouched() {
        let engine = engine();
        let mut sink = BoundedSink {
            seen: Vec::new(),
            capacity: 1,
        };
        let register = LedgerCommand::RegisterUser {
            address: alice(),
            username: "Alice".into(),
        };
        engine.execute_with(register, &mut sink).unwrap();

        let post = LedgerCommand::CreatePost {
            address: alice(),
            content: "Hello".into(),
            image: None,
            original_post_id: None,
        };
        assert_eq!(engine.execute_with(post, &mut sink), Err(SinkError::Full));
        assert_eq!(engine.posts_count(), 0);
        assert_eq!(engine.user_stats(&alice()).unwrap().post_count, 0);
        assert_eq!(engine.snapshot().fact_count(), 1);
    }

    #[test]
    fn rejected_commands_never_reach_the_sink() {
        let engine = engine();
        let mut sink = BoundedSink {
            seen: Vec::new(),
            capacity: 10,
        };
        let like = LedgerCommand::LikePost {
            address: alice(),
            post_id: PostId(0),
        };
        assert_eq!(
            engine.execute_with(like, &mut sink),
            Err(SinkError::Rejected(LedgerError::NotRegistered(alice())))
        );
        assert!(sink.seen.is_empty());
    }

    #[test]
    fn reported_ids_match_committed_facts() {
        let engine = engine();
        let mut sink = BoundedSink {
            seen: Vec::new(),
            capacity: 10,
        };
        engine.register_user(&alice(), "Alice").unwrap();
        engine.create_post(&alice(), "first", None, None).unwrap();
        engine.add_comment(&alice(), PostId(0), "one", None).unwrap();

        let post = LedgerCommand::Repost {
            address: alice(),
            post_id: PostId(0),
            comment: None,
        };
        let receipt = match engine.execute_with(post, &mut sink).unwrap() {
            CommandOutcome::PostCreated(receipt) => receipt,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert!(matches!(
            sink.seen.last(),
            Some(LedgerFact::PostCreated { post_id, .. }) if *post_id == receipt.post_id
        ));
        assert_eq!(receipt.post_id, PostId(1));

        let comment = LedgerCommand::AddComment {
            address: alice(),
            post_id: PostId(0),
            content: "two".into(),
            image: None,
        };
        let comment_id = match engine.execute_with(comment, &mut sink).unwrap() {
            CommandOutcome::CommentAdded(id) => id,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert!(matches!(
            sink.seen.last(),
            Some(LedgerFact::CommentAdded { comment_id: id, .. }) if *id == comment_id
        ));
        assert_eq!(comment_id, CommentId::new(PostId(0), 1));
    }

    #[test]
    fn commit_stamps_facts_with_the_clock() {
        let clock = Arc::new(ManualTimeSource::new(5_000));
        let engine = LedgerEngine::with_time_source(LedgerConfig::default(), clock.clone());
        engine.register_user(&alice(), "Alice").unwrap();
        clock.advance(250);
        let receipt = engine.create_post(&alice(), "hi", None, None).unwrap();

        assert_eq!(engine.user_by_address(&alice()).unwrap().registered_at.ts_ms, 5_000);
        assert_eq!(engine.post(receipt.post_id).unwrap().timestamp.ts_ms, 5_250);
    }
}
