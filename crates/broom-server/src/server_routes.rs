use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use broom_core::{
    command_autocomplete, decode_dialog_submission, execute_command, handle_dialog_submission,
    post_id_autocomplete_items, CommandInvocation, CommandResponse, DialogKind,
    COMMAND_TRIGGER, DIALOG_TOKEN_PARAM, ROUTE_AUTOCOMPLETE_POST_ID,
    ROUTE_DIALOG_DELETE_FILTERS, ROUTE_DIALOG_DELETE_LAST,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::server_state::BroomServerState;

pub const ROUTE_COMMAND: &str = "/command";
pub const ROUTE_COMMAND_AUTOCOMPLETE: &str = "/command/autocomplete";
pub const ROUTE_HEALTH: &str = "/healthz";
pub const ROUTE_CONFIG_RELOAD: &str = "/config/reload";

#[derive(Debug, Default, Deserialize)]
/// Form fields of the slash-command webhook. Unknown fields are ignored.
struct SlashCommandForm {
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    trigger_id: String,
    #[serde(default)]
    command: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    token: String,
}

#[derive(Debug, Deserialize)]
/// Query string of dialog callbacks and admin routes.
struct TokenQuery {
    #[serde(default)]
    token: Option<String>,
}

impl SlashCommandForm {
    fn command_line(&self) -> String {
        let command = match self.command.trim() {
            "" => format!("/{COMMAND_TRIGGER}"),
            command => command.to_string(),
        };
        format!("{command} {}", self.text.trim()).trim_end().to_string()
    }
}

pub fn build_broom_router(state: Arc<BroomServerState>) -> Router {
    Router::new()
        .route(ROUTE_HEALTH, get(handle_health))
        .route(ROUTE_COMMAND, post(handle_command))
        .route(ROUTE_COMMAND_AUTOCOMPLETE, get(handle_command_autocomplete))
        .route(ROUTE_AUTOCOMPLETE_POST_ID, get(handle_post_id_autocomplete))
        .route(ROUTE_DIALOG_DELETE_LAST, post(handle_delete_last_dialog))
        .route(ROUTE_DIALOG_DELETE_FILTERS, post(handle_delete_filters_dialog))
        .route(ROUTE_CONFIG_RELOAD, post(handle_config_reload))
        .with_state(state)
}

async fn handle_health(State(state): State<Arc<BroomServerState>>) -> Response {
    let config = state.config_snapshot();
    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "restrict_to_admins_only": config.restrict_to_admins_only,
            "confirmation_policy": config.confirmation_policy.as_str(),
        })),
    )
        .into_response()
}

async fn handle_command(
    State(state): State<Arc<BroomServerState>>,
    Form(form): Form<SlashCommandForm>,
) -> Response {
    if !state.accepts_command_token(&form.token) {
        tracing::warn!(
            user_id = %form.user_id,
            channel_id = %form.channel_id,
            "rejecting slash command with an unexpected verification token"
        );
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid command token" })),
        )
            .into_response();
    }

    let config = state.config_snapshot();
    let invocation = CommandInvocation {
        command: form.command_line(),
        channel_id: form.channel_id,
        user_id: form.user_id,
        trigger_id: form.trigger_id,
    };
    let response = execute_command(state.command_context(&config), &invocation).await;
    (StatusCode::OK, Json(command_response_body(&response))).into_response()
}

fn command_response_body(response: &CommandResponse) -> Value {
    match &response.text {
        Some(text) => json!({ "response_type": "ephemeral", "text": text }),
        None => json!({}),
    }
}

async fn handle_command_autocomplete(State(state): State<Arc<BroomServerState>>) -> Response {
    let config = state.config_snapshot();
    (StatusCode::OK, Json(command_autocomplete(&config))).into_response()
}

async fn handle_post_id_autocomplete() -> Response {
    (StatusCode::OK, Json(post_id_autocomplete_items())).into_response()
}

async fn handle_delete_last_dialog(
    State(state): State<Arc<BroomServerState>>,
    Query(query): Query<TokenQuery>,
    body: Bytes,
) -> Response {
    handle_dialog(&state, DialogKind::DeleteLast, &query, &body).await
}

async fn handle_delete_filters_dialog(
    State(state): State<Arc<BroomServerState>>,
    Query(query): Query<TokenQuery>,
    body: Bytes,
) -> Response {
    handle_dialog(&state, DialogKind::DeleteFilters, &query, &body).await
}

fn unauthorized(route: &str) -> Response {
    tracing::warn!(route, "rejecting request without the dialog secret");
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": format!("missing or invalid `{DIALOG_TOKEN_PARAM}`") })),
    )
        .into_response()
}

/// Submissions are only trusted when they come back through the callback URL the
/// server handed out, which carries the dialog secret.
async fn handle_dialog(
    state: &BroomServerState,
    kind: DialogKind,
    query: &TokenQuery,
    body: &[u8],
) -> Response {
    if !state.accepts_dialog_token(query.token.as_deref()) {
        return unauthorized(kind.route());
    }
    let submission = match decode_dialog_submission(body) {
        Ok(submission) => submission,
        Err(error) => {
            tracing::warn!(dialog = kind.as_str(), %error, "rejecting dialog submission");
            return dialog_error_response(&error.to_string());
        }
    };

    let config = state.config_snapshot();
    match handle_dialog_submission(state.command_context(&config), kind, &submission).await {
        Ok(()) => (StatusCode::OK, Json(json!({}))).into_response(),
        Err(error) => {
            tracing::warn!(
                dialog = kind.as_str(),
                user_id = %submission.user_id,
                %error,
                "rejecting dialog submission"
            );
            dialog_error_response(&error.to_string())
        }
    }
}

fn dialog_error_response(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message })),
    )
        .into_response()
}

async fn handle_config_reload(
    State(state): State<Arc<BroomServerState>>,
    Query(query): Query<TokenQuery>,
) -> Response {
    if !state.accepts_dialog_token(query.token.as_deref()) {
        return unauthorized(ROUTE_CONFIG_RELOAD);
    }
    match state.reload_config() {
        Ok(config) => (
            StatusCode::OK,
            Json(json!({
                "status": "reloaded",
                "restrict_to_admins_only": config.restrict_to_admins_only,
                "confirmation_policy": config.confirmation_policy.as_str(),
            })),
        )
            .into_response(),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("{error:#}") })),
        )
            .into_response(),
    }
}
