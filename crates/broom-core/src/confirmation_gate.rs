use crate::broom_config::ConfirmationPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `ConfirmationDecision` values.
pub enum ConfirmationDecision {
    ExecuteImmediately,
    DeferViaDialog,
}

impl ConfirmationDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExecuteImmediately => "execute_immediately",
            Self::DeferViaDialog => "defer_via_dialog",
        }
    }
}

/// `skip_confirmation` is only honoured when the policy leaves the choice to the caller.
pub fn decide_confirmation(
    policy: ConfirmationPolicy,
    skip_confirmation: bool,
) -> ConfirmationDecision {
    match policy {
        ConfirmationPolicy::Never => ConfirmationDecision::ExecuteImmediately,
        ConfirmationPolicy::Optional if skip_confirmation => {
            ConfirmationDecision::ExecuteImmediately
        }
        ConfirmationPolicy::Optional | ConfirmationPolicy::Always => {
            ConfirmationDecision::DeferViaDialog
        }
    }
}
