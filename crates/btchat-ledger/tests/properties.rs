//! Property tests over random command sequences
//!
//! Whatever mix of accepted and rejected commands is applied, the counters
//! kept on users must agree with the records they summarize, and ids stay
//! dense.

use btchat_ledger::{
    Address, CommentId, LedgerCommand, LedgerConfig, LedgerEngine, LedgerState, ManualTimeSource,
    PostId,
};
use proptest::prelude::*;
use std::sync::Arc;

const USERS: u8 = 4;

fn address(seed: u8) -> Address {
    Address::new(format!("user-{seed}")).unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Register(u8),
    Post(u8, String),
    Repost(u8, u64),
    Like(u8, u64),
    Comment(u8, u64, String),
    LikeComment(u8, u64, u64),
}

impl Op {
    fn into_command(self) -> LedgerCommand {
        match self {
            Op::Register(u) => LedgerCommand::RegisterUser {
                address: address(u),
                username: format!("User {u}"),
            },
            Op::Post(u, content) => LedgerCommand::CreatePost {
                address: address(u),
                content,
                image: None,
                original_post_id: None,
            },
            Op::Repost(u, post) => LedgerCommand::Repost {
                address: address(u),
                post_id: PostId(post),
                comment: None,
            },
            Op::Like(u, post) => LedgerCommand::LikePost {
                address: address(u),
                post_id: PostId(post),
            },
            Op::Comment(u, post, content) => LedgerCommand::AddComment {
                address: address(u),
                post_id: PostId(post),
                content,
                image: None,
            },
            Op::LikeComment(u, post, index) => LedgerCommand::LikeComment {
                address: address(u),
                comment_id: CommentId::new(PostId(post), index),
            },
        }
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let user = 0..USERS;
    let post = 0u64..6;
    // Empty strings are included so rejections are part of the mix.
    let text = "[a-z ]{0,12}";
    prop_oneof![
        user.clone().prop_map(Op::Register),
        (user.clone(), text).prop_map(|(u, c)| Op::Post(u, c)),
        (user.clone(), post.clone()).prop_map(|(u, p)| Op::Repost(u, p)),
        (user.clone(), post.clone()).prop_map(|(u, p)| Op::Like(u, p)),
        (user.clone(), post.clone(), text).prop_map(|(u, p, c)| Op::Comment(u, p, c)),
        (user, post, 0u64..3).prop_map(|(u, p, i)| Op::LikeComment(u, p, i)),
    ]
}

fn run(ops: Vec<Op>, config: LedgerConfig) -> LedgerState {
    let engine =
        LedgerEngine::with_time_source(config, Arc::new(ManualTimeSource::new(1_000)));
    for op in ops {
        let _ = engine.execute(op.into_command());
    }
    engine.snapshot()
}

proptest! {
    #[test]
    fn counters_match_records(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let config = LedgerConfig { initial_free_posts: 2, ..LedgerConfig::default() };
        let state = run(ops, config);
        let posts = state.posts_range(0, usize::MAX);

        for user in state.users() {
            let authored = posts.iter().filter(|p| p.author == user.address).count() as u64;
            let commented = posts
                .iter()
                .flat_map(|p| p.comments())
                .filter(|c| c.commenter == user.address)
                .count() as u64;
            let liked = posts.iter().filter(|p| p.is_liked_by(&user.address)).count() as u64
                + posts
                    .iter()
                    .flat_map(|p| p.comments())
                    .filter(|c| c.is_liked_by(&user.address))
                    .count() as u64;

            prop_assert_eq!(user.stats.post_count, authored);
            prop_assert_eq!(user.stats.comment_count, commented);
            prop_assert_eq!(user.stats.likes_given, liked);
            prop_assert_eq!(
                u64::from(user.free_posts_remaining),
                2u64.saturating_sub(authored)
            );
        }
    }

    #[test]
    fn ids_are_dense_and_references_point_back(
        ops in prop::collection::vec(op_strategy(), 0..60)
    ) {
        let state = run(ops, LedgerConfig::default());
        let posts = state.posts_range(0, usize::MAX);

        prop_assert_eq!(posts.len() as u64, state.posts_count());
        for (i, post) in posts.iter().enumerate() {
            prop_assert_eq!(post.id, PostId(i as u64));
            prop_assert!(!post.content.is_empty());
            prop_assert!(state.is_registered(&post.author));
            if let Some(original) = post.original_post_id {
                prop_assert!(original.0 < post.id.0);
                let root = &posts[original.0 as usize];
                prop_assert_eq!(root.original_post_id, None);
            }
            for (j, comment) in post.comments().iter().enumerate() {
                prop_assert_eq!(comment.id, CommentId::new(post.id, j as u64));
            }
        }
    }

    #[test]
    fn replaying_the_same_commands_is_deterministic(
        ops in prop::collection::vec(op_strategy(), 0..40)
    ) {
        let first = run(ops.clone(), LedgerConfig::default());
        let second = run(ops, LedgerConfig::default());
        prop_assert_eq!(first, second);
    }
}
