//! Command grammar and permission-gated batch deletion for the `/broom` slash command.
//!
//! A raw command line flows through parsing, argument validation, filter resolution
//! and the confirmation gate before the batch deletion engine runs against the posts
//! selected in a channel. The chat platform itself is reached only through the
//! [`ChatPlatform`] trait so the same runtime serves live and test collaborators.

pub mod broom_config;
pub mod broom_error;
pub mod command_help;
pub mod command_parser;
pub mod command_runtime;
pub mod command_validation;
pub mod confirmation_gate;
pub mod deletion_engine;
pub mod deletion_report;
pub mod dialog;
pub mod filter_resolver;
pub mod platform;

#[cfg(test)]
mod test_support;

pub use broom_config::{
    load_broom_config_file, BroomConfig, ConfirmationPolicy, BROOM_CONFIG_FILE_NAME,
    BROOM_CONFIG_SCHEMA_VERSION,
};
pub use broom_error::{BroomError, BroomResult, TECHNICAL_ERROR_MESSAGE};
pub use command_help::{
    command_autocomplete, post_id_autocomplete_items, render_help, AutocompleteArgument,
    AutocompleteData, AutocompleteListItem,
};
pub use command_parser::{
    parse_command_line, FilterArg, FilterFlag, ParsedCommand, Subcommand, ARG_CONFIRM,
    ARG_DELETE_PINNED_POSTS, COMMAND_TRIGGER,
};
pub use command_runtime::{
    execute_command, handle_dialog_submission, CommandContext, CommandInvocation,
    CommandResponse,
};
pub use command_validation::{
    ensure_post_count_within_channel, parse_post_count, validate_filter_command,
    validate_last_command,
};
pub use confirmation_gate::{decide_confirmation, ConfirmationDecision};
pub use deletion_engine::{batch_delete_posts, CandidateSelection, DeletionOutcome, DeletionRequest};
pub use deletion_report::{plural_suffix, render_deletion_report, MESSAGE_NOTHING_TO_DELETE};
pub use dialog::{
    decode_dialog_submission, DialogElement, DialogKind, DialogPayloadError, DialogSpec,
    DialogSubmission, OpenDialogRequest, DIALOG_TOKEN_PARAM, ROUTE_AUTOCOMPLETE_POST_ID,
    ROUTE_DIALOG_DELETE_FILTERS, ROUTE_DIALOG_DELETE_LAST,
};
pub use filter_resolver::{extract_post_id, resolve_filters, DeletionFilters};
pub use platform::{
    CandidatePost, ChannelStats, ChatPlatform, PlatformError, PlatformUser, PostList,
    PostListQuery,
};
