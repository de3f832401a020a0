//! Chat platform collaborator contract and the post/channel/user models it exchanges.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dialog::OpenDialogRequest;

/// Page size used when the listing is bounded by filters instead of a post count.
pub const FILTER_LISTING_PAGE_SIZE: u32 = 200;

#[derive(Debug, Error)]
/// Enumerates supported `PlatformError` values.
pub enum PlatformError {
    #[error("{resource} not found")]
    NotFound { resource: String },
    #[error("platform returned non-success status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("platform request failed: {0}")]
    Transport(String),
    #[error("invalid platform response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Public struct `ChannelStats` used across broom components.
pub struct ChannelStats {
    pub channel_id: String,
    pub total_msg_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A post as listed by the platform. `root_id` is empty outside of threads.
pub struct CandidatePost {
    pub id: String,
    pub channel_id: String,
    pub author_id: String,
    #[serde(default)]
    pub root_id: String,
    #[serde(default)]
    pub is_pinned: bool,
    pub created_at: i64,
}

impl CandidatePost {
    pub fn is_thread_reply(&self) -> bool {
        !self.root_id.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Public struct `PlatformUser` used across broom components.
pub struct PlatformUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub roles: String,
}

impl PlatformUser {
    pub fn is_system_admin(&self) -> bool {
        self.roles
            .split_whitespace()
            .any(|role| role == "system_admin")
    }
}

/// Result of one listing call.
///
/// `order` is the selection the caller asked for. `posts` may hold more entries than
/// `order` names because the platform eagerly attaches the other posts of every thread
/// touched by the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostList {
    pub order: Vec<String>,
    pub posts: HashMap<String, CandidatePost>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `PostListQuery` used across broom components.
pub struct PostListQuery {
    pub page: u32,
    pub per_page: u32,
    pub after: Option<String>,
    pub before: Option<String>,
}

impl PostListQuery {
    pub fn latest(per_page: u32) -> Self {
        Self {
            page: 0,
            per_page,
            after: None,
            before: None,
        }
    }

    pub fn after(post_id: impl Into<String>, per_page: u32) -> Self {
        Self {
            after: Some(post_id.into()),
            ..Self::latest(per_page)
        }
    }

    pub fn before(post_id: impl Into<String>, per_page: u32) -> Self {
        Self {
            before: Some(post_id.into()),
            ..Self::latest(per_page)
        }
    }
}

#[async_trait]
/// Trait contract for the host chat platform.
///
/// Calls are awaited one at a time by the runtime; implementations never see two
/// concurrent calls from the same invocation.
pub trait ChatPlatform: Send + Sync {
    async fn get_channel_stats(&self, channel_id: &str) -> Result<ChannelStats, PlatformError>;

    async fn get_post(&self, post_id: &str) -> Result<CandidatePost, PlatformError>;

    async fn get_user_by_username(&self, username: &str) -> Result<PlatformUser, PlatformError>;

    async fn list_channel_posts(
        &self,
        channel_id: &str,
        query: &PostListQuery,
    ) -> Result<PostList, PlatformError>;

    async fn delete_post(&self, post_id: &str) -> Result<(), PlatformError>;

    async fn send_ephemeral_message(
        &self,
        user_id: &str,
        channel_id: &str,
        text: &str,
    ) -> Result<(), PlatformError>;

    async fn open_confirmation_dialog(
        &self,
        request: &OpenDialogRequest,
    ) -> Result<(), PlatformError>;

    async fn can_delete_own_posts(
        &self,
        user_id: &str,
        channel_id: &str,
    ) -> Result<bool, PlatformError>;

    async fn can_delete_others_posts(
        &self,
        user_id: &str,
        channel_id: &str,
    ) -> Result<bool, PlatformError>;

    async fn is_system_admin(&self, user_id: &str) -> Result<bool, PlatformError>;
}
