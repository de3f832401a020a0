//! Argument checks for `last` and `filter` before any post is touched.

use crate::broom_error::{BroomError, BroomResult};
use crate::command_parser::{learn_usage_hint, ParsedCommand, Subcommand, COMMAND_TRIGGER};
use crate::platform::ChatPlatform;

pub const MESSAGE_MISSING_POST_COUNT: &str =
    "Please specify the [number-of-posts] you want to delete";
pub const MESSAGE_POST_COUNT_NOT_INTEGER: &str =
    "Incorrect argument. [number-of-posts] must be an integer";
pub const MESSAGE_POST_COUNT_BELOW_ONE: &str = "You may want to delete at least one post :wink:";
pub const MESSAGE_POST_COUNT_EXCEEDS_CHANNEL: &str =
    "Cannot delete more posts than exist in this channel";

/// Reads the post count from the positional arguments of `last`.
pub fn parse_post_count(positional_args: &[String]) -> BroomResult<i64> {
    let Some(first) = positional_args.first() else {
        return Err(BroomError::user(MESSAGE_MISSING_POST_COUNT));
    };
    let count = first
        .parse::<i64>()
        .map_err(|_| BroomError::user(MESSAGE_POST_COUNT_NOT_INTEGER))?;
    if count < 1 {
        return Err(BroomError::user(MESSAGE_POST_COUNT_BELOW_ONE));
    }
    if let Some(extra) = positional_args.get(1) {
        return Err(BroomError::user(format!("Invalid argument `{extra}`")));
    }
    Ok(count)
}

/// Validates `last` and returns the number of posts to delete.
///
/// The count is bounded by the channel's total message count so the listing call is
/// never asked for more posts than the channel holds.
pub async fn validate_last_command(
    platform: &dyn ChatPlatform,
    channel_id: &str,
    parsed: &ParsedCommand,
) -> BroomResult<u32> {
    if parsed.has_filters() {
        return Err(BroomError::user(format!(
            "Sorry, you can't use filters with `/{COMMAND_TRIGGER} {}`",
            Subcommand::Last.as_str()
        )));
    }
    let count = parse_post_count(&parsed.positional_args)?;
    ensure_post_count_within_channel(platform, channel_id, count).await
}

/// Bounds `count` by the channel's total message count.
pub async fn ensure_post_count_within_channel(
    platform: &dyn ChatPlatform,
    channel_id: &str,
    count: i64,
) -> BroomResult<u32> {
    let stats = platform
        .get_channel_stats(channel_id)
        .await
        .map_err(|error| {
            tracing::error!(channel_id, %error, "unable to get channel statistics");
            BroomError::from(error)
        })?;
    if count > stats.total_msg_count {
        return Err(BroomError::user(MESSAGE_POST_COUNT_EXCEEDS_CHANNEL));
    }
    u32::try_from(count).map_err(|_| BroomError::user(MESSAGE_POST_COUNT_EXCEEDS_CHANNEL))
}

/// Validates `filter`: selection comes from named flags only, never from a count.
pub fn validate_filter_command(parsed: &ParsedCommand) -> BroomResult<()> {
    if let Some(first) = parsed.positional_args.first() {
        let subcommand = Subcommand::Filter.as_str();
        if first.parse::<i64>().is_ok() {
            return Err(BroomError::user(format!(
                "Invalid argument `{first}` with `/{COMMAND_TRIGGER} {subcommand}`. {}",
                learn_usage_hint()
            )));
        }
        return Err(BroomError::user(format!("Invalid argument `{first}`")));
    }
    if !parsed.has_filters() {
        return Err(BroomError::user(format!(
            "Please specify at least one filter (`--after`, `--before` or `--from`) with `/{COMMAND_TRIGGER} {}`",
            Subcommand::Filter.as_str()
        )));
    }
    Ok(())
}
