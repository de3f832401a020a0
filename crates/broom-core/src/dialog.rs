//! Confirmation dialog payloads.
//!
//! The dialog is the only link between the command invocation and the later
//! submission. Everything needed to rebuild the deletion request travels in the
//! opaque `state` string: the post count for `last`, the resolved filters as JSON for
//! `filter`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use url::form_urlencoded;

use crate::deletion_report::plural_suffix;
use crate::filter_resolver::DeletionFilters;

pub const ROUTE_DIALOG_DELETE_LAST: &str = "/dialog/delete-last";
pub const ROUTE_DIALOG_DELETE_FILTERS: &str = "/dialog/delete-filters";
pub const ROUTE_AUTOCOMPLETE_POST_ID: &str = "/autocomplete/postid";
pub const DIALOG_CALLBACK_ID: &str = "confirmPostDeletion";
pub const ELEMENT_DELETE_PINNED_POSTS: &str = "deletePinnedPosts";
/// Query parameter carrying the shared secret on dialog callback URLs.
pub const DIALOG_TOKEN_PARAM: &str = "token";

#[derive(Debug, Error)]
/// Enumerates supported `DialogPayloadError` values.
pub enum DialogPayloadError {
    #[error("failed to decode dialog submission: {0}")]
    Malformed(String),
    #[error("dialog submission is missing `{0}`")]
    MissingField(&'static str),
    #[error("invalid {kind} dialog state `{state}`: {reason}")]
    InvalidState {
        kind: &'static str,
        state: String,
        reason: String,
    },
    #[error("failed to encode dialog state: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `DialogKind` values.
pub enum DialogKind {
    DeleteLast,
    DeleteFilters,
}

impl DialogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeleteLast => "delete_last",
            Self::DeleteFilters => "delete_filters",
        }
    }

    pub fn route(self) -> &'static str {
        match self {
            Self::DeleteLast => ROUTE_DIALOG_DELETE_LAST,
            Self::DeleteFilters => ROUTE_DIALOG_DELETE_FILTERS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Public struct `DialogElement` used across broom components.
pub struct DialogElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub help_text: String,
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Public struct `DialogSpec` used across broom components.
pub struct DialogSpec {
    pub callback_id: String,
    pub title: String,
    #[serde(default)]
    pub introduction_text: String,
    pub submit_label: String,
    pub notify_on_cancel: bool,
    pub state: String,
    pub elements: Vec<DialogElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Public struct `OpenDialogRequest` used across broom components.
pub struct OpenDialogRequest {
    pub trigger_id: String,
    pub url: String,
    pub dialog: DialogSpec,
}

fn dialog_callback_url(public_url: &str, callback_token: &str, kind: DialogKind) -> String {
    let url = format!("{}{}", public_url.trim_end_matches('/'), kind.route());
    if callback_token.is_empty() {
        return url;
    }
    let token = form_urlencoded::byte_serialize(callback_token.as_bytes()).collect::<String>();
    format!("{url}?{DIALOG_TOKEN_PARAM}={token}")
}

fn delete_pinned_posts_element(delete_pinned_posts: bool) -> DialogElement {
    DialogElement {
        kind: "bool".to_string(),
        name: ELEMENT_DELETE_PINNED_POSTS.to_string(),
        display_name: "Delete pinned posts?".to_string(),
        help_text: String::new(),
        default: delete_pinned_posts.to_string(),
        optional: true,
    }
}

pub fn build_delete_last_dialog(
    public_url: &str,
    callback_token: &str,
    trigger_id: &str,
    post_count: u32,
    delete_pinned_posts: bool,
) -> OpenDialogRequest {
    OpenDialogRequest {
        trigger_id: trigger_id.to_string(),
        url: dialog_callback_url(public_url, callback_token, DialogKind::DeleteLast),
        dialog: DialogSpec {
            callback_id: DIALOG_CALLBACK_ID.to_string(),
            title: format!(
                "Do you want to delete the last {post_count} post{} in this channel?",
                plural_suffix(post_count as usize)
            ),
            introduction_text: String::new(),
            submit_label: "Confirm".to_string(),
            notify_on_cancel: false,
            state: post_count.to_string(),
            elements: vec![delete_pinned_posts_element(delete_pinned_posts)],
        },
    }
}

pub fn build_delete_filters_dialog(
    public_url: &str,
    callback_token: &str,
    trigger_id: &str,
    filters: &DeletionFilters,
    delete_pinned_posts: bool,
) -> Result<OpenDialogRequest, DialogPayloadError> {
    let state = serde_json::to_string(filters)
        .map_err(|error| DialogPayloadError::Encode(error.to_string()))?;
    Ok(OpenDialogRequest {
        trigger_id: trigger_id.to_string(),
        url: dialog_callback_url(public_url, callback_token, DialogKind::DeleteFilters),
        dialog: DialogSpec {
            callback_id: DIALOG_CALLBACK_ID.to_string(),
            title: "Do you want to delete the posts matching your filters?".to_string(),
            introduction_text: format!("Posts {}", filters.summary()),
            submit_label: "Confirm".to_string(),
            notify_on_cancel: false,
            state,
            elements: vec![delete_pinned_posts_element(delete_pinned_posts)],
        },
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
/// Dialog submission posted back by the platform.
pub struct DialogSubmission {
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub submission: Map<String, Value>,
    #[serde(default)]
    pub cancelled: bool,
}

impl DialogSubmission {
    /// Bool elements arrive as JSON booleans from current clients and as strings from
    /// older ones.
    pub fn delete_pinned_posts(&self) -> bool {
        match self.submission.get(ELEMENT_DELETE_PINNED_POSTS) {
            Some(Value::Bool(value)) => *value,
            Some(Value::String(value)) => value == "true",
            _ => false,
        }
    }
}

pub fn decode_dialog_submission(body: &[u8]) -> Result<DialogSubmission, DialogPayloadError> {
    let submission = serde_json::from_slice::<DialogSubmission>(body)
        .map_err(|error| DialogPayloadError::Malformed(error.to_string()))?;
    if submission.cancelled {
        return Ok(submission);
    }
    if submission.channel_id.trim().is_empty() {
        return Err(DialogPayloadError::MissingField("channel_id"));
    }
    if submission.user_id.trim().is_empty() {
        return Err(DialogPayloadError::MissingField("user_id"));
    }
    Ok(submission)
}

pub fn decode_delete_last_state(state: &str) -> Result<u32, DialogPayloadError> {
    let invalid = |reason: String| DialogPayloadError::InvalidState {
        kind: DialogKind::DeleteLast.as_str(),
        state: state.to_string(),
        reason,
    };
    let count = state
        .trim()
        .parse::<u32>()
        .map_err(|error| invalid(error.to_string()))?;
    if count == 0 {
        return Err(invalid("post count must be at least 1".to_string()));
    }
    Ok(count)
}

pub fn decode_delete_filters_state(state: &str) -> Result<DeletionFilters, DialogPayloadError> {
    let invalid = |reason: String| DialogPayloadError::InvalidState {
        kind: DialogKind::DeleteFilters.as_str(),
        state: state.to_string(),
        reason,
    };
    let filters = serde_json::from_str::<DeletionFilters>(state)
        .map_err(|error| invalid(error.to_string()))?;
    if filters.is_empty() {
        return Err(invalid("at least one filter is required".to_string()));
    }
    Ok(filters)
}
