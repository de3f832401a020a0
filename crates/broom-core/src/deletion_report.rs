use crate::deletion_engine::DeletionOutcome;

pub const MESSAGE_NOTHING_TO_DELETE: &str = "No post matches your request: this channel looks clean!";
pub const MESSAGE_ONLY_OWN_POSTS: &str = "Sorry, you are only allowed to delete your own posts";

/// Exactly one is singular; zero and everything above one take the `s`.
pub fn plural_suffix(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Renders the summary sent to the requesting user after a batch.
///
/// Only non-zero categories appear, in a fixed order: technical errors, pinned skips,
/// permission skips, then successes.
pub fn render_deletion_report(outcome: &DeletionOutcome) -> String {
    let mut lines = Vec::new();

    if outcome.technical_errors > 0 {
        lines.push(format!(
            "Because of a technical error, {} post{} could not be deleted",
            outcome.technical_errors,
            plural_suffix(outcome.technical_errors)
        ));
    }
    if outcome.pinned_skipped > 0 {
        lines.push(format!(
            "{} post{} not deleted because pinned to channel",
            outcome.pinned_skipped,
            plural_suffix(outcome.pinned_skipped)
        ));
    }
    if outcome.not_permitted > 0 {
        if outcome.deleted == 0 {
            lines.push(MESSAGE_ONLY_OWN_POSTS.to_string());
        } else {
            lines.push(format!(
                "{} post{} not deleted because you are not allowed to do so",
                outcome.not_permitted,
                plural_suffix(outcome.not_permitted)
            ));
        }
    }
    if outcome.deleted > 0 {
        lines.push(format!(
            "Successfully deleted {} post{}",
            outcome.deleted,
            plural_suffix(outcome.deleted)
        ));
    }

    if lines.is_empty() {
        return MESSAGE_NOTHING_TO_DELETE.to_string();
    }
    lines.join("\n")
}
