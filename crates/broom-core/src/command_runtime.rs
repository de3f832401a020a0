//! Two-phase `/broom` runtime.
//!
//! Phase one answers the slash-command invocation. It either deletes right away or
//! opens a confirmation dialog. Phase two handles the dialog submission and rebuilds
//! everything it needs from the submission itself; nothing is retained between the two.

use crate::broom_config::BroomConfig;
use crate::broom_error::{BroomError, BroomResult};
use crate::command_help::render_help;
use crate::command_parser::{
    parse_command_line, ParsedCommand, Subcommand, ARG_CONFIRM, ARG_DELETE_PINNED_POSTS,
};
use crate::command_validation::{
    ensure_post_count_within_channel, validate_filter_command, validate_last_command,
};
use crate::confirmation_gate::{decide_confirmation, ConfirmationDecision};
use crate::deletion_engine::{
    batch_delete_posts, CandidateSelection, DeletionOutcome, DeletionRequest,
};
use crate::deletion_report::render_deletion_report;
use crate::dialog::{
    build_delete_filters_dialog, build_delete_last_dialog, decode_delete_filters_state,
    decode_delete_last_state, DialogKind, DialogPayloadError, DialogSubmission,
    OpenDialogRequest,
};
use crate::filter_resolver::{resolve_filters, select_filtered_posts, DeletionFilters};
use crate::platform::{ChatPlatform, PostListQuery};

pub const MESSAGE_NOT_PERMITTED: &str = "Sorry, you are not permitted to delete posts";
pub const MESSAGE_DIALOG_FAILED: &str = "Failed to open confirmation dialog";

#[derive(Clone, Copy)]
/// Per-request view of the collaborators: one configuration snapshot and the platform.
pub struct CommandContext<'a> {
    pub config: &'a BroomConfig,
    pub platform: &'a dyn ChatPlatform,
    /// Externally reachable base URL that dialog callbacks are sent to.
    pub public_url: &'a str,
    /// Secret appended to dialog callback URLs. Empty leaves the URLs bare.
    pub dialog_token: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `CommandInvocation` used across broom components.
pub struct CommandInvocation {
    pub channel_id: String,
    pub user_id: String,
    pub trigger_id: String,
    /// Full command line including the leading trigger.
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Synchronous answer to the invocation. `None` means nothing is shown from the webhook.
pub struct CommandResponse {
    pub text: Option<String>,
}

impl CommandResponse {
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DeletionScope {
    Last(u32),
    Filters(DeletionFilters),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DeletionTarget<'a> {
    channel_id: &'a str,
    user_id: &'a str,
    trigger_id: &'a str,
}

pub async fn execute_command(
    ctx: CommandContext<'_>,
    invocation: &CommandInvocation,
) -> CommandResponse {
    if ctx.config.restrict_to_admins_only
        && !is_admin(ctx.platform, &invocation.user_id).await
    {
        tracing::info!(
            user_id = %invocation.user_id,
            "ignoring command from non admin user"
        );
        return CommandResponse::empty();
    }

    let parsed = match parse_command_line(&invocation.command) {
        Ok(parsed) => parsed,
        Err(error) => return error_response(error, invocation),
    };

    let result = match parsed.subcommand {
        Subcommand::Help => Ok(CommandResponse::ephemeral(render_help(ctx.config))),
        Subcommand::Last => execute_last(ctx, invocation, &parsed).await,
        Subcommand::Filter => execute_filter(ctx, invocation, &parsed).await,
    };
    result.unwrap_or_else(|error| error_response(error, invocation))
}

async fn execute_last(
    ctx: CommandContext<'_>,
    invocation: &CommandInvocation,
    parsed: &ParsedCommand,
) -> BroomResult<CommandResponse> {
    let post_count =
        validate_last_command(ctx.platform, &invocation.channel_id, parsed).await?;
    let delete_pinned_posts = parsed.flag(ARG_DELETE_PINNED_POSTS);
    let skip_confirmation = parsed.flag(ARG_CONFIRM);

    match decide_confirmation(ctx.config.confirmation_policy, skip_confirmation) {
        ConfirmationDecision::DeferViaDialog => {
            let request = build_delete_last_dialog(
                ctx.public_url,
                ctx.dialog_token,
                &invocation.trigger_id,
                post_count,
                delete_pinned_posts,
            );
            Ok(open_dialog(ctx, invocation, &request).await)
        }
        ConfirmationDecision::ExecuteImmediately => {
            delete_and_report(
                ctx,
                &target_of(invocation),
                DeletionScope::Last(post_count),
                delete_pinned_posts,
                skip_confirmation,
            )
            .await?;
            Ok(CommandResponse::empty())
        }
    }
}

async fn execute_filter(
    ctx: CommandContext<'_>,
    invocation: &CommandInvocation,
    parsed: &ParsedCommand,
) -> BroomResult<CommandResponse> {
    validate_filter_command(parsed)?;
    let filters =
        resolve_filters(ctx.platform, &invocation.channel_id, &parsed.filter_args).await?;
    let delete_pinned_posts = parsed.flag(ARG_DELETE_PINNED_POSTS);
    let skip_confirmation = parsed.flag(ARG_CONFIRM);

    match decide_confirmation(ctx.config.confirmation_policy, skip_confirmation) {
        ConfirmationDecision::DeferViaDialog => {
            let request = match build_delete_filters_dialog(
                ctx.public_url,
                ctx.dialog_token,
                &invocation.trigger_id,
                &filters,
                delete_pinned_posts,
            ) {
                Ok(request) => request,
                Err(error) => {
                    tracing::error!(%error, "unable to build filter confirmation dialog");
                    return Ok(CommandResponse::ephemeral(MESSAGE_DIALOG_FAILED));
                }
            };
            Ok(open_dialog(ctx, invocation, &request).await)
        }
        ConfirmationDecision::ExecuteImmediately => {
            delete_and_report(
                ctx,
                &target_of(invocation),
                DeletionScope::Filters(filters),
                delete_pinned_posts,
                skip_confirmation,
            )
            .await?;
            Ok(CommandResponse::empty())
        }
    }
}

/// Handles a confirmation dialog submission.
///
/// Cancelled submissions do nothing. Deletion failures are reported to the user as an
/// ephemeral message; only an undecodable state is returned as an error.
pub async fn handle_dialog_submission(
    ctx: CommandContext<'_>,
    kind: DialogKind,
    submission: &DialogSubmission,
) -> Result<(), DialogPayloadError> {
    if submission.cancelled {
        tracing::info!(dialog = kind.as_str(), "confirmation dialog cancelled");
        return Ok(());
    }

    let scope = match kind {
        DialogKind::DeleteLast => {
            DeletionScope::Last(decode_delete_last_state(&submission.state)?)
        }
        DialogKind::DeleteFilters => {
            DeletionScope::Filters(decode_delete_filters_state(&submission.state)?)
        }
    };

    if ctx.config.restrict_to_admins_only && !is_admin(ctx.platform, &submission.user_id).await {
        tracing::warn!(
            user_id = %submission.user_id,
            dialog = kind.as_str(),
            "ignoring dialog submission from non admin user"
        );
        return Ok(());
    }

    let target = DeletionTarget {
        channel_id: &submission.channel_id,
        user_id: &submission.user_id,
        trigger_id: "",
    };
    let result = match scope {
        // The channel may have shrunk since the dialog was opened.
        DeletionScope::Last(count) => {
            ensure_post_count_within_channel(ctx.platform, target.channel_id, i64::from(count))
                .await
                .map(DeletionScope::Last)
        }
        scope => Ok(scope),
    };
    let result = match result {
        Ok(scope) => {
            delete_and_report(ctx, &target, scope, submission.delete_pinned_posts(), false)
                .await
                .map(|_| ())
        }
        Err(error) => Err(error),
    };
    if let Err(error) = result {
        log_error(&error, target.user_id);
        send_ephemeral(ctx.platform, &target, &error.user_message()).await;
    }
    Ok(())
}

async fn delete_and_report(
    ctx: CommandContext<'_>,
    target: &DeletionTarget<'_>,
    scope: DeletionScope,
    delete_pinned_posts: bool,
    skip_confirmation: bool,
) -> BroomResult<DeletionOutcome> {
    let platform = ctx.platform;
    let can_delete_own = platform
        .can_delete_own_posts(target.user_id, target.channel_id)
        .await
        .unwrap_or_else(|error| {
            tracing::error!(
                user_id = %target.user_id,
                %error,
                "unable to check delete_post permission"
            );
            false
        });
    if !can_delete_own {
        return Err(BroomError::permission_denied(MESSAGE_NOT_PERMITTED));
    }
    let can_delete_others_posts = platform
        .can_delete_others_posts(target.user_id, target.channel_id)
        .await
        .unwrap_or_else(|error| {
            tracing::error!(
                user_id = %target.user_id,
                %error,
                "unable to check delete_others_posts permission"
            );
            false
        });

    let (post_count, selection) = match &scope {
        DeletionScope::Last(count) => {
            let list = platform
                .list_channel_posts(target.channel_id, &PostListQuery::latest(*count))
                .await?;
            (Some(*count), CandidateSelection::from_post_list(list))
        }
        DeletionScope::Filters(filters) => (
            None,
            select_filtered_posts(platform, target.channel_id, filters).await?,
        ),
    };

    let request = DeletionRequest {
        channel_id: target.channel_id.to_string(),
        requesting_user_id: target.user_id.to_string(),
        trigger_id: target.trigger_id.to_string(),
        post_count,
        delete_pinned_posts,
        skip_confirmation,
        can_delete_others_posts,
    };
    let outcome = batch_delete_posts(platform, &selection, &request).await;
    send_ephemeral(platform, target, &render_deletion_report(&outcome)).await;
    Ok(outcome)
}

async fn open_dialog(
    ctx: CommandContext<'_>,
    invocation: &CommandInvocation,
    request: &OpenDialogRequest,
) -> CommandResponse {
    match ctx.platform.open_confirmation_dialog(request).await {
        Ok(()) => CommandResponse::empty(),
        Err(error) => {
            tracing::error!(
                user_id = %invocation.user_id,
                channel_id = %invocation.channel_id,
                %error,
                "unable to open confirmation dialog"
            );
            CommandResponse::ephemeral(MESSAGE_DIALOG_FAILED)
        }
    }
}

async fn is_admin(platform: &dyn ChatPlatform, user_id: &str) -> bool {
    platform.is_system_admin(user_id).await.unwrap_or_else(|error| {
        tracing::error!(user_id, %error, "unable to check system admin role");
        false
    })
}

async fn send_ephemeral(platform: &dyn ChatPlatform, target: &DeletionTarget<'_>, text: &str) {
    if let Err(error) = platform
        .send_ephemeral_message(target.user_id, target.channel_id, text)
        .await
    {
        tracing::error!(user_id = %target.user_id, %error, "unable to send ephemeral message");
    }
}

fn target_of(invocation: &CommandInvocation) -> DeletionTarget<'_> {
    DeletionTarget {
        channel_id: &invocation.channel_id,
        user_id: &invocation.user_id,
        trigger_id: &invocation.trigger_id,
    }
}

fn log_error(error: &BroomError, user_id: &str) {
    if let BroomError::Technical(cause) = error {
        tracing::error!(user_id, error = %cause, "command failed on a platform call");
    }
}

fn error_response(error: BroomError, invocation: &CommandInvocation) -> CommandResponse {
    log_error(&error, &invocation.user_id);
    CommandResponse::ephemeral(error.user_message())
}
