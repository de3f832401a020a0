//! Mattermost REST client used by the broom server as its chat platform.
//!
//! Every call is a single request: failures are reported to the caller and never
//! retried, since a deletion batch already tolerates per-post failures.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use broom_core::{
    CandidatePost, ChannelStats, ChatPlatform, OpenDialogRequest, PlatformError, PlatformUser,
    PostList, PostListQuery,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

pub const PERMISSION_DELETE_POST: &str = "delete_post";
pub const PERMISSION_DELETE_OTHERS_POSTS: &str = "delete_others_posts";
const API_PREFIX: [&str; 2] = ["api", "v4"];

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `MattermostClientConfig` used across broom components.
pub struct MattermostClientConfig {
    /// Site URL, without the `/api/v4` suffix.
    pub api_base: String,
    pub access_token: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct MattermostChannel {
    id: String,
    #[serde(default)]
    team_id: String,
    #[serde(default)]
    total_msg_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct MattermostPost {
    id: String,
    channel_id: String,
    user_id: String,
    #[serde(default)]
    root_id: String,
    #[serde(default)]
    is_pinned: bool,
    #[serde(default)]
    create_at: i64,
}

impl From<MattermostPost> for CandidatePost {
    fn from(post: MattermostPost) -> Self {
        Self {
            id: post.id,
            channel_id: post.channel_id,
            author_id: post.user_id,
            root_id: post.root_id,
            is_pinned: post.is_pinned,
            created_at: post.create_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct MattermostPostList {
    #[serde(default)]
    order: Vec<String>,
    #[serde(default)]
    posts: HashMap<String, MattermostPost>,
}

#[derive(Debug, Clone, Deserialize)]
struct MattermostUser {
    id: String,
    username: String,
    #[serde(default)]
    roles: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MattermostMember {
    #[serde(default)]
    roles: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MattermostRole {
    #[serde(default)]
    permissions: Vec<String>,
}

#[derive(Clone)]
pub struct MattermostApiClient {
    http: reqwest::Client,
    api_base: reqwest::Url,
}

impl MattermostApiClient {
    pub fn new(config: &MattermostClientConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("broom-server"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let mut authorization = reqwest::header::HeaderValue::from_str(&format!(
            "Bearer {}",
            config.access_token.trim()
        ))
        .context("mattermost access token is not a valid header value")?;
        authorization.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, authorization);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .context("failed to create mattermost api client")?;

        let api_base = reqwest::Url::parse(config.api_base.trim())
            .with_context(|| format!("invalid mattermost api base '{}'", config.api_base))?;
        if api_base.cannot_be_a_base() {
            anyhow::bail!(
                "invalid mattermost api base '{}': expected an http(s) URL",
                config.api_base
            );
        }

        Ok(Self { http, api_base })
    }

    /// API URL made of `segments`. Each segment is percent-encoded on its own, so an
    /// identifier can never reach another resource. Empty and dot segments would be
    /// dropped or collapsed by the URL, so they name nothing.
    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, PlatformError> {
        if segments
            .iter()
            .any(|segment| matches!(*segment, "" | "." | ".."))
        {
            return Err(PlatformError::not_found(segments.join("/")));
        }
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(API_PREFIX).extend(segments);
        }
        Ok(url)
    }

    async fn send(
        &self,
        resource: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, PlatformError> {
        let response = request
            .send()
            .await
            .map_err(|error| PlatformError::Transport(format!("{resource}: {error}")))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PlatformError::not_found(resource));
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(resource, status = status.as_u16(), "mattermost request rejected");
        Err(PlatformError::Status {
            status: status.as_u16(),
            body: truncate_for_error(&body, 800),
        })
    }

    async fn request_json<T>(
        &self,
        resource: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PlatformError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(resource, request).await?;
        response.json::<T>().await.map_err(|error| {
            PlatformError::InvalidResponse(format!("failed to decode {resource}: {error}"))
        })
    }

    async fn get_channel(&self, channel_id: &str) -> Result<MattermostChannel, PlatformError> {
        self.request_json(
            &format!("channel {channel_id}"),
            self.http.get(self.url(&["channels", channel_id])?),
        )
        .await
    }

    async fn get_user(&self, user_id: &str) -> Result<MattermostUser, PlatformError> {
        self.request_json(
            &format!("user {user_id}"),
            self.http.get(self.url(&["users", user_id])?),
        )
        .await
    }

    /// Member roles, or none when the user is not a member.
    async fn member_roles(
        &self,
        resource: &str,
        segments: &[&str],
    ) -> Result<String, PlatformError> {
        match self
            .request_json::<MattermostMember>(resource, self.http.get(self.url(segments)?))
            .await
        {
            Ok(member) => Ok(member.roles),
            Err(error) if error.is_not_found() => Ok(String::new()),
            Err(error) => Err(error),
        }
    }

    /// Union of the permissions granted by the user's system, team and channel roles.
    async fn effective_permissions(
        &self,
        user_id: &str,
        channel_id: &str,
    ) -> Result<Option<BTreeSet<String>>, PlatformError> {
        let user = self.get_user(user_id).await?;
        if has_system_admin_role(&user.roles) {
            return Ok(None);
        }
        let channel = self.get_channel(channel_id).await?;

        let mut role_names = split_roles(&user.roles);
        if !channel.team_id.is_empty() {
            let team_roles = self
                .member_roles(
                    &format!("team member {user_id}"),
                    &["teams", channel.team_id.as_str(), "members", user_id],
                )
                .await?;
            role_names.extend(split_roles(&team_roles));
        }
        let channel_roles = self
            .member_roles(
                &format!("channel member {user_id}"),
                &["channels", channel.id.as_str(), "members", user_id],
            )
            .await?;
        role_names.extend(split_roles(&channel_roles));
        if role_names.is_empty() {
            return Ok(Some(BTreeSet::new()));
        }

        let roles: Vec<MattermostRole> = self
            .request_json(
                "roles",
                self.http
                    .post(self.url(&["roles", "names"])?)
                    .json(&role_names.iter().collect::<Vec<_>>()),
            )
            .await?;
        Ok(Some(
            roles
                .into_iter()
                .flat_map(|role| role.permissions)
                .collect(),
        ))
    }

    async fn has_channel_permission(
        &self,
        user_id: &str,
        channel_id: &str,
        permission: &str,
    ) -> Result<bool, PlatformError> {
        Ok(match self.effective_permissions(user_id, channel_id).await? {
            None => true,
            Some(granted) => granted.contains(permission),
        })
    }
}

fn split_roles(roles: &str) -> BTreeSet<String> {
    roles.split_whitespace().map(str::to_string).collect()
}

fn has_system_admin_role(roles: &str) -> bool {
    roles.split_whitespace().any(|role| role == "system_admin")
}

fn truncate_for_error(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let truncated = body.chars().take(max_chars).collect::<String>();
    format!("{truncated}...")
}

#[async_trait]
impl ChatPlatform for MattermostApiClient {
    async fn get_channel_stats(&self, channel_id: &str) -> Result<ChannelStats, PlatformError> {
        let channel = self.get_channel(channel_id).await?;
        Ok(ChannelStats {
            channel_id: channel.id,
            total_msg_count: channel.total_msg_count,
        })
    }

    async fn get_post(&self, post_id: &str) -> Result<CandidatePost, PlatformError> {
        let post: MattermostPost = self
            .request_json(
                &format!("post {post_id}"),
                self.http.get(self.url(&["posts", post_id])?),
            )
            .await?;
        Ok(post.into())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<PlatformUser, PlatformError> {
        let user: MattermostUser = self
            .request_json(
                &format!("user @{username}"),
                self.http
                    .get(self.url(&["users", "username", username])?),
            )
            .await?;
        Ok(PlatformUser {
            id: user.id,
            username: user.username,
            roles: user.roles,
        })
    }

    async fn list_channel_posts(
        &self,
        channel_id: &str,
        query: &PostListQuery,
    ) -> Result<PostList, PlatformError> {
        let mut params = vec![
            ("page", query.page.to_string()),
            ("per_page", query.per_page.to_string()),
        ];
        if let Some(after) = &query.after {
            params.push(("after", after.clone()));
        }
        if let Some(before) = &query.before {
            params.push(("before", before.clone()));
        }
        let list: MattermostPostList = self
            .request_json(
                &format!("posts of channel {channel_id}"),
                self.http
                    .get(self.url(&["channels", channel_id, "posts"])?)
                    .query(&params),
            )
            .await?;
        Ok(PostList {
            order: list.order,
            posts: list
                .posts
                .into_iter()
                .map(|(post_id, post)| (post_id, post.into()))
                .collect(),
        })
    }

    async fn delete_post(&self, post_id: &str) -> Result<(), PlatformError> {
        self.send(
            &format!("post {post_id}"),
            self.http.delete(self.url(&["posts", post_id])?),
        )
        .await?;
        Ok(())
    }

    async fn send_ephemeral_message(
        &self,
        user_id: &str,
        channel_id: &str,
        text: &str,
    ) -> Result<(), PlatformError> {
        let payload = json!({
            "user_id": user_id,
            "post": {
                "channel_id": channel_id,
                "message": text,
            },
        });
        self.send(
            "ephemeral post",
            self.http.post(self.url(&["posts", "ephemeral"])?).json(&payload),
        )
        .await?;
        Ok(())
    }

    async fn open_confirmation_dialog(
        &self,
        request: &OpenDialogRequest,
    ) -> Result<(), PlatformError> {
        self.send(
            "interactive dialog",
            self.http
                .post(self.url(&["actions", "dialogs", "open"])?)
                .json(request),
        )
        .await?;
        Ok(())
    }

    async fn can_delete_own_posts(
        &self,
        user_id: &str,
        channel_id: &str,
    ) -> Result<bool, PlatformError> {
        self.has_channel_permission(user_id, channel_id, PERMISSION_DELETE_POST)
            .await
    }

    async fn can_delete_others_posts(
        &self,
        user_id: &str,
        channel_id: &str,
    ) -> Result<bool, PlatformError> {
        self.has_channel_permission(user_id, channel_id, PERMISSION_DELETE_OTHERS_POSTS)
            .await
    }

    async fn is_system_admin(&self, user_id: &str) -> Result<bool, PlatformError> {
        let user = self.get_user(user_id).await?;
        Ok(has_system_admin_role(&user.roles))
    }
}
