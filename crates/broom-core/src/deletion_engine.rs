//! Batch deletion engine.
//!
//! Candidates are processed strictly in listing order. Each one lands in exactly one
//! outcome counter; a failed delete never aborts the batch and nothing is retried.

use std::collections::HashMap;

use crate::platform::{CandidatePost, ChatPlatform, PostList};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Validated deletion request; built once per invocation and never mutated afterwards.
pub struct DeletionRequest {
    pub channel_id: String,
    pub requesting_user_id: String,
    pub trigger_id: String,
    pub post_count: Option<u32>,
    pub delete_pinned_posts: bool,
    pub skip_confirmation: bool,
    pub can_delete_others_posts: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Public struct `DeletionOutcome` used across broom components.
pub struct DeletionOutcome {
    pub deleted: usize,
    pub technical_errors: usize,
    pub not_permitted: usize,
    pub pinned_skipped: usize,
}

impl DeletionOutcome {
    pub fn total(&self) -> usize {
        self.deleted + self.technical_errors + self.not_permitted + self.pinned_skipped
    }
}

/// Posts selected for deletion, in listing order.
///
/// Built from a [`PostList`] keeping only the posts its `order` names, so the extra
/// thread posts a listing call attaches are neither counted nor deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSelection {
    order: Vec<String>,
    posts: HashMap<String, CandidatePost>,
}

impl CandidateSelection {
    pub fn from_post_list(list: PostList) -> Self {
        let PostList { order, mut posts } = list;
        let mut selected = HashMap::with_capacity(order.len());
        for post_id in &order {
            if let Some(post) = posts.remove(post_id) {
                selected.insert(post_id.clone(), post);
            }
        }
        Self {
            order,
            posts: selected,
        }
    }

    /// Drops the posts rejected by `keep`. Ids without a listed post stay so the engine
    /// can report them.
    pub fn retain(&mut self, mut keep: impl FnMut(&CandidatePost) -> bool) {
        let posts = &mut self.posts;
        self.order.retain(|post_id| match posts.get(post_id) {
            Some(post) if !keep(post) => {
                posts.remove(post_id);
                false
            }
            _ => true,
        });
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, post_id: &str) -> Option<&CandidatePost> {
        self.posts.get(post_id)
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.posts.contains_key(post_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Deletes the selected posts on behalf of `request.requesting_user_id`.
///
/// The caller must already have checked that the user may delete their own posts.
/// A reply whose thread root is also selected is counted as deleted without a delete
/// call: removing the root removes the whole thread, so the count can overstate the
/// independent deletions when roots and replies are selected together.
pub async fn batch_delete_posts(
    platform: &dyn ChatPlatform,
    selection: &CandidateSelection,
    request: &DeletionRequest,
) -> DeletionOutcome {
    tracing::info!(
        channel_id = %request.channel_id,
        user_id = %request.requesting_user_id,
        post_ids = ?selection.order(),
        "batch deleting posts"
    );
    let mut outcome = DeletionOutcome::default();

    for post_id in selection.order() {
        let Some(post) = selection.get(post_id) else {
            outcome.technical_errors += 1;
            tracing::error!(post_id = %post_id, "listed post id has no matching post");
            continue;
        };

        if !request.can_delete_others_posts && post.author_id != request.requesting_user_id {
            outcome.not_permitted += 1;
            continue;
        }

        if !request.delete_pinned_posts && post.is_pinned {
            outcome.pinned_skipped += 1;
            continue;
        }

        if post.is_thread_reply() && selection.contains(&post.root_id) {
            outcome.deleted += 1;
            continue;
        }

        match platform.delete_post(&post.id).await {
            Ok(()) => outcome.deleted += 1,
            Err(error) => {
                outcome.technical_errors += 1;
                tracing::error!(post_id = %post.id, %error, "unable to delete post");
            }
        }
    }

    tracing::info!(
        channel_id = %request.channel_id,
        deleted = outcome.deleted,
        technical_errors = outcome.technical_errors,
        not_permitted = outcome.not_permitted,
        pinned_skipped = outcome.pinned_skipped,
        "batch deletion finished"
    );
    outcome
}
