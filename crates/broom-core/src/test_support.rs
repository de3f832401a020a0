//! In-memory chat platform used by the runtime and engine tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::dialog::OpenDialogRequest;
use crate::platform::{
    CandidatePost, ChannelStats, ChatPlatform, PlatformError, PlatformUser, PostList,
    PostListQuery,
};

pub(crate) const CHANNEL_ID: &str = "chan-1";
pub(crate) const OWNER_ID: &str = "user-owner";
pub(crate) const OTHER_ID: &str = "user-other";

pub(crate) fn post(id: &str, author_id: &str, created_at: i64) -> CandidatePost {
    CandidatePost {
        id: id.to_string(),
        channel_id: CHANNEL_ID.to_string(),
        author_id: author_id.to_string(),
        root_id: String::new(),
        is_pinned: false,
        created_at,
    }
}

pub(crate) fn reply(id: &str, author_id: &str, root_id: &str, created_at: i64) -> CandidatePost {
    CandidatePost {
        root_id: root_id.to_string(),
        ..post(id, author_id, created_at)
    }
}

pub(crate) fn pinned(id: &str, author_id: &str, created_at: i64) -> CandidatePost {
    CandidatePost {
        is_pinned: true,
        ..post(id, author_id, created_at)
    }
}

#[derive(Default)]
struct FakeState {
    channel_posts: Vec<CandidatePost>,
    thread_context: Vec<CandidatePost>,
    foreign_posts: Vec<CandidatePost>,
    total_msg_count: Option<i64>,
    users: Vec<PlatformUser>,
    can_delete_own: bool,
    can_delete_others: bool,
    admins: BTreeSet<String>,
    failing_deletes: BTreeSet<String>,
    fail_listing: bool,
    fail_dialog: bool,
    deleted: Vec<String>,
    ephemeral: Vec<(String, String, String)>,
    dialogs: Vec<OpenDialogRequest>,
    list_queries: Vec<PostListQuery>,
}

/// Channel posts are stored oldest first and listed newest first like the platform does.
pub(crate) struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    pub(crate) fn new(channel_posts: Vec<CandidatePost>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                channel_posts,
                can_delete_own: true,
                ..FakeState::default()
            }),
        }
    }

    fn with_state(self, apply: impl FnOnce(&mut FakeState)) -> Self {
        if let Ok(mut state) = self.state.lock() {
            apply(&mut state);
        }
        self
    }

    pub(crate) fn with_total_msg_count(self, count: i64) -> Self {
        self.with_state(|state| state.total_msg_count = Some(count))
    }

    pub(crate) fn with_thread_context(self, posts: Vec<CandidatePost>) -> Self {
        self.with_state(|state| state.thread_context = posts)
    }

    pub(crate) fn with_foreign_post(self, post: CandidatePost) -> Self {
        self.with_state(|state| state.foreign_posts.push(post))
    }

    pub(crate) fn with_user(self, id: &str, username: &str) -> Self {
        self.with_state(|state| {
            state.users.push(PlatformUser {
                id: id.to_string(),
                username: username.to_string(),
                roles: "system_user".to_string(),
            })
        })
    }

    pub(crate) fn with_permissions(self, own: bool, others: bool) -> Self {
        self.with_state(|state| {
            state.can_delete_own = own;
            state.can_delete_others = others;
        })
    }

    pub(crate) fn with_admin(self, user_id: &str) -> Self {
        self.with_state(|state| {
            state.admins.insert(user_id.to_string());
        })
    }

    pub(crate) fn with_failing_delete(self, post_id: &str) -> Self {
        self.with_state(|state| {
            state.failing_deletes.insert(post_id.to_string());
        })
    }

    pub(crate) fn with_failing_listing(self) -> Self {
        self.with_state(|state| state.fail_listing = true)
    }

    pub(crate) fn with_failing_dialog(self) -> Self {
        self.with_state(|state| state.fail_dialog = true)
    }

    fn read<T>(&self, read: impl FnOnce(&FakeState) -> T) -> T {
        let state = self.state.lock().expect("fake platform lock");
        read(&state)
    }

    pub(crate) fn deleted(&self) -> Vec<String> {
        self.read(|state| state.deleted.clone())
    }

    pub(crate) fn ephemeral_texts(&self) -> Vec<String> {
        self.read(|state| {
            state
                .ephemeral
                .iter()
                .map(|(_, _, text)| text.clone())
                .collect()
        })
    }

    pub(crate) fn ephemeral_messages(&self) -> Vec<(String, String, String)> {
        self.read(|state| state.ephemeral.clone())
    }

    pub(crate) fn dialogs(&self) -> Vec<OpenDialogRequest> {
        self.read(|state| state.dialogs.clone())
    }

    pub(crate) fn list_queries(&self) -> Vec<PostListQuery> {
        self.read(|state| state.list_queries.clone())
    }

    fn find_post(state: &FakeState, post_id: &str) -> Option<CandidatePost> {
        state
            .channel_posts
            .iter()
            .chain(state.thread_context.iter())
            .chain(state.foreign_posts.iter())
            .find(|post| post.id == post_id)
            .cloned()
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn get_channel_stats(&self, channel_id: &str) -> Result<ChannelStats, PlatformError> {
        self.read(|state| {
            Ok(ChannelStats {
                channel_id: channel_id.to_string(),
                total_msg_count: state
                    .total_msg_count
                    .unwrap_or(state.channel_posts.len() as i64),
            })
        })
    }

    async fn get_post(&self, post_id: &str) -> Result<CandidatePost, PlatformError> {
        self.read(|state| {
            Self::find_post(state, post_id)
                .ok_or_else(|| PlatformError::not_found(format!("post {post_id}")))
        })
    }

    async fn get_user_by_username(&self, username: &str) -> Result<PlatformUser, PlatformError> {
        self.read(|state| {
            state
                .users
                .iter()
                .find(|user| user.username == username)
                .cloned()
                .ok_or_else(|| PlatformError::not_found(format!("user {username}")))
        })
    }

    async fn list_channel_posts(
        &self,
        _channel_id: &str,
        query: &PostListQuery,
    ) -> Result<PostList, PlatformError> {
        let mut state = self.state.lock().expect("fake platform lock");
        state.list_queries.push(query.clone());
        if state.fail_listing {
            return Err(PlatformError::Transport("connection reset".to_string()));
        }

        let mut newest_first = state.channel_posts.clone();
        newest_first.reverse();
        let anchored = if let Some(after) = &query.after {
            let anchor = newest_first
                .iter()
                .position(|post| &post.id == after)
                .unwrap_or(0);
            newest_first[..anchor].to_vec()
        } else if let Some(before) = &query.before {
            let anchor = newest_first
                .iter()
                .position(|post| &post.id == before)
                .map(|index| index + 1)
                .unwrap_or(newest_first.len());
            newest_first[anchor..].to_vec()
        } else {
            newest_first
        };
        let selected = anchored
            .into_iter()
            .take(query.per_page as usize)
            .collect::<Vec<_>>();

        let mut posts = HashMap::new();
        for post in selected.iter().chain(state.thread_context.iter()) {
            posts.insert(post.id.clone(), post.clone());
        }
        Ok(PostList {
            order: selected.into_iter().map(|post| post.id).collect(),
            posts,
        })
    }

    async fn delete_post(&self, post_id: &str) -> Result<(), PlatformError> {
        let mut state = self.state.lock().expect("fake platform lock");
        if state.failing_deletes.contains(post_id) {
            return Err(PlatformError::Status {
                status: 500,
                body: format!("failed to delete {post_id}"),
            });
        }
        state.deleted.push(post_id.to_string());
        Ok(())
    }

    async fn send_ephemeral_message(
        &self,
        user_id: &str,
        channel_id: &str,
        text: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().expect("fake platform lock");
        state.ephemeral.push((
            user_id.to_string(),
            channel_id.to_string(),
            text.to_string(),
        ));
        Ok(())
    }

    async fn open_confirmation_dialog(
        &self,
        request: &OpenDialogRequest,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().expect("fake platform lock");
        if state.fail_dialog {
            return Err(PlatformError::Status {
                status: 400,
                body: "trigger expired".to_string(),
            });
        }
        state.dialogs.push(request.clone());
        Ok(())
    }

    async fn can_delete_own_posts(
        &self,
        _user_id: &str,
        _channel_id: &str,
    ) -> Result<bool, PlatformError> {
        self.read(|state| Ok(state.can_delete_own))
    }

    async fn can_delete_others_posts(
        &self,
        _user_id: &str,
        _channel_id: &str,
    ) -> Result<bool, PlatformError> {
        self.read(|state| Ok(state.can_delete_others))
    }

    async fn is_system_admin(&self, user_id: &str) -> Result<bool, PlatformError> {
        self.read(|state| Ok(state.admins.contains(user_id)))
    }
}
