//! Resolves raw `--after` / `--before` / `--from` values into canonical identifiers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::broom_error::{BroomError, BroomResult};
use crate::command_parser::{FilterArg, FilterFlag};
use crate::deletion_engine::CandidateSelection;
use crate::platform::{
    CandidatePost, ChatPlatform, PlatformError, PostListQuery, FILTER_LISTING_PAGE_SIZE,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Resolved filter criteria. Authors in `from_user_ids` are OR-ed together.
pub struct DeletionFilters {
    #[serde(default, rename = "after", skip_serializing_if = "Option::is_none")]
    pub after_post_id: Option<String>,
    #[serde(default, rename = "before", skip_serializing_if = "Option::is_none")]
    pub before_post_id: Option<String>,
    #[serde(default, rename = "from", skip_serializing_if = "BTreeSet::is_empty")]
    pub from_user_ids: BTreeSet<String>,
}

impl DeletionFilters {
    pub fn is_empty(&self) -> bool {
        self.after_post_id.is_none()
            && self.before_post_id.is_none()
            && self.from_user_ids.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(after) = &self.after_post_id {
            parts.push(format!("after post {after}"));
        }
        if let Some(before) = &self.before_post_id {
            parts.push(format!("before post {before}"));
        }
        if !self.from_user_ids.is_empty() {
            let authors = self
                .from_user_ids
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("from {authors}"));
        }
        if parts.is_empty() {
            "no filter".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Accepts a bare post id or a permalink of the form `<site>/<team>/pl/<post_id>`.
pub fn extract_post_id(reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    if !reference.starts_with("http") {
        return Some(reference.to_string());
    }
    let parsed = Url::parse(reference).ok()?;
    let segments = parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();
    let permalink_marker = segments.iter().position(|segment| *segment == "pl")?;
    segments
        .get(permalink_marker + 1)
        .map(|post_id| post_id.to_string())
}

/// Resolves every filter argument in order of appearance and checks the
/// chronological order of `after` and `before`.
pub async fn resolve_filters(
    platform: &dyn ChatPlatform,
    channel_id: &str,
    args: &[FilterArg],
) -> BroomResult<DeletionFilters> {
    let mut filters = DeletionFilters::default();
    let mut after_post = None;
    let mut before_post = None;

    for arg in args {
        match arg.flag {
            FilterFlag::After | FilterFlag::Before => {
                let slot = if arg.flag == FilterFlag::After {
                    &mut after_post
                } else {
                    &mut before_post
                };
                if let Some(existing) = slot.as_ref().map(|post: &CandidatePost| post.id.clone())
                {
                    return Err(BroomError::user(format!(
                        "Argument `--{}` can only be used once. It is already defined to `{existing}`",
                        arg.flag.as_str()
                    )));
                }
                let post = resolve_post_reference(platform, channel_id, arg).await?;
                *slot = Some(post);
            }
            FilterFlag::From => {
                let user_id = resolve_user_reference(platform, arg).await?;
                filters.from_user_ids.insert(user_id);
            }
        }
    }

    if let (Some(after), Some(before)) = (&after_post, &before_post) {
        if before.created_at < after.created_at {
            return Err(BroomError::user(format!(
                "Post `{}` is older than post `{}`: no post can be after the first and before the last",
                before.id, after.id
            )));
        }
    }

    filters.after_post_id = after_post.map(|post| post.id);
    filters.before_post_id = before_post.map(|post| post.id);
    Ok(filters)
}

async fn resolve_post_reference(
    platform: &dyn ChatPlatform,
    channel_id: &str,
    arg: &FilterArg,
) -> BroomResult<CandidatePost> {
    let flag = arg.flag.as_str();
    let Some(post_id) = extract_post_id(&arg.value) else {
        return Err(BroomError::user(format!(
            "Incorrect value for `--{flag}`: `{}` is neither a post id nor a post link",
            arg.value
        )));
    };

    let post = match platform.get_post(&post_id).await {
        Ok(post) => post,
        Err(error) if error.is_not_found() => {
            return Err(BroomError::user(format!(
                "Incorrect value for `--{flag}`: unknown post `{post_id}`"
            )));
        }
        Err(error) => {
            tracing::error!(post_id = %post_id, %error, "unable to get post");
            return Err(error.into());
        }
    };

    if post.channel_id != channel_id {
        return Err(BroomError::user(format!(
            "Incorrect value for `--{flag}`: post `{post_id}` is not in this channel"
        )));
    }
    Ok(post)
}

async fn resolve_user_reference(
    platform: &dyn ChatPlatform,
    arg: &FilterArg,
) -> BroomResult<String> {
    let flag = arg.flag.as_str();
    let username = arg.value.trim_start_matches('@');
    let unknown = || {
        BroomError::user(format!(
            "Invalid value for argument `--{flag}`: user `{}` is unknown",
            arg.value
        ))
    };
    if username.is_empty() {
        return Err(unknown());
    }

    match platform.get_user_by_username(username).await {
        Ok(user) => Ok(user.id),
        Err(error) if error.is_not_found() => Err(unknown()),
        Err(error) => {
            tracing::error!(username, %error, "unable to get user");
            Err(error.into())
        }
    }
}

/// Lists the channel posts matching `filters` with a single listing call.
///
/// The listing is anchored after `--after` when set, otherwise before `--before`, otherwise
/// it is the most recent page. With both bounds, posts not strictly older than the
/// `--before` post are dropped. Anchor posts are never candidates.
pub async fn select_filtered_posts(
    platform: &dyn ChatPlatform,
    channel_id: &str,
    filters: &DeletionFilters,
) -> Result<CandidateSelection, PlatformError> {
    let query = match (&filters.after_post_id, &filters.before_post_id) {
        (Some(after), _) => PostListQuery::after(after.as_str(), FILTER_LISTING_PAGE_SIZE),
        (None, Some(before)) => PostListQuery::before(before.as_str(), FILTER_LISTING_PAGE_SIZE),
        (None, None) => PostListQuery::latest(FILTER_LISTING_PAGE_SIZE),
    };
    let list = platform.list_channel_posts(channel_id, &query).await?;
    let mut selection = CandidateSelection::from_post_list(list);

    let before_created_at = match (&filters.after_post_id, &filters.before_post_id) {
        (Some(_), Some(before)) => Some(platform.get_post(before).await?.created_at),
        _ => None,
    };

    selection.retain(|post| {
        let is_anchor = filters.after_post_id.as_deref() == Some(post.id.as_str())
            || filters.before_post_id.as_deref() == Some(post.id.as_str());
        let within_bounds = before_created_at
            .map(|created_at| post.created_at < created_at)
            .unwrap_or(true);
        let from_author =
            filters.from_user_ids.is_empty() || filters.from_user_ids.contains(&post.author_id);
        !is_anchor && within_bounds && from_author
    });
    Ok(selection)
}
