//! Help text and the slash-command autocomplete descriptor.

use serde::{Deserialize, Serialize};

use crate::broom_config::{BroomConfig, ConfirmationPolicy};
use crate::command_parser::{
    ARG_CONFIRM, ARG_DELETE_PINNED_POSTS, COMMAND_TRIGGER, FILTER_ARG_AFTER, FILTER_ARG_BEFORE,
    FILTER_ARG_FROM,
};
use crate::dialog::ROUTE_AUTOCOMPLETE_POST_ID;

pub const COMMAND_HINT: &str = "[subcommand]";
pub const COMMAND_DESCRIPTION: &str =
    "Clean the channel by removing posts. Available commands: last, filter, help";
pub const SYSTEM_ADMIN_ROLE_ID: &str = "system_admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubcommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    pub example: &'static str,
}

pub const SUBCOMMAND_SPECS: &[SubcommandSpec] = &[
    SubcommandSpec {
        name: "last",
        usage: "last [number-of-posts]",
        description: "Delete the last [number-of-posts] posts in the current channel",
        example: "/broom last 20",
    },
    SubcommandSpec {
        name: "filter",
        usage: "filter --after [post] --before [post] --from [@user]",
        description: "Delete the posts matching every given filter in the current channel",
        example: "/broom filter --after 3wk9ndb7xbbf5e --from @alice",
    },
    SubcommandSpec {
        name: "help",
        usage: "help",
        description: "Learn how to broom",
        example: "/broom help",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NamedArgumentSpec {
    name: &'static str,
    help_text: &'static str,
    hint: &'static str,
}

const ARGUMENT_DELETE_PINNED_POSTS: NamedArgumentSpec = NamedArgumentSpec {
    name: ARG_DELETE_PINNED_POSTS,
    help_text: "Also delete pinned posts (disabled by default)",
    hint: "true",
};

const ARGUMENT_CONFIRM: NamedArgumentSpec = NamedArgumentSpec {
    name: ARG_CONFIRM,
    help_text: "Do not show confirmation dialog",
    hint: "true",
};

const FILTER_ARGUMENTS: &[NamedArgumentSpec] = &[
    NamedArgumentSpec {
        name: FILTER_ARG_AFTER,
        help_text: "Only delete posts created after this post (id or permalink)",
        hint: "[post-id]",
    },
    NamedArgumentSpec {
        name: FILTER_ARG_BEFORE,
        help_text: "Only delete posts created before this post (id or permalink)",
        hint: "[post-id]",
    },
    NamedArgumentSpec {
        name: FILTER_ARG_FROM,
        help_text: "Only delete posts written by this user; repeat for several authors",
        hint: "[@username]",
    },
];

fn global_arguments(config: &BroomConfig) -> Vec<NamedArgumentSpec> {
    let mut arguments = vec![ARGUMENT_DELETE_PINNED_POSTS];
    if config.confirmation_policy == ConfirmationPolicy::Optional {
        arguments.push(ARGUMENT_CONFIRM);
    }
    arguments
}

/// Markdown help answered for `help` and any unknown subcommand.
pub fn render_help(config: &BroomConfig) -> String {
    let mut lines = vec![
        "## Broom".to_string(),
        "Easily clean the current channel with this magic broom.".to_string(),
        String::new(),
    ];
    for spec in SUBCOMMAND_SPECS {
        lines.push(format!(
            " * `/{COMMAND_TRIGGER} {}` {}",
            spec.usage, spec.description
        ));
    }
    lines.push(String::new());
    lines.push("### Global arguments:".to_string());
    for argument in global_arguments(config) {
        lines.push(format!(" * `--{}` {}", argument.name, argument.help_text));
    }
    lines.push(String::new());
    lines.push("### Filter arguments:".to_string());
    for argument in FILTER_ARGUMENTS {
        lines.push(format!(" * `--{}` {}", argument.name, argument.help_text));
    }
    lines.join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Public struct `AutocompleteArgument` used across broom components.
pub struct AutocompleteArgument {
    pub name: String,
    pub help_text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub hint: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fetch_url: String,
    pub required: bool,
}

impl AutocompleteArgument {
    fn text(spec: &NamedArgumentSpec) -> Self {
        Self {
            name: spec.name.to_string(),
            help_text: spec.help_text.to_string(),
            kind: "TextInput".to_string(),
            hint: spec.hint.to_string(),
            fetch_url: String::new(),
            required: false,
        }
    }

    fn post_id(spec: &NamedArgumentSpec) -> Self {
        Self {
            kind: "DynamicList".to_string(),
            fetch_url: ROUTE_AUTOCOMPLETE_POST_ID.to_string(),
            ..Self::text(spec)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Slash-command descriptor registered with the chat platform.
pub struct AutocompleteData {
    pub trigger: String,
    pub hint: String,
    pub help_text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role_id: String,
    #[serde(default)]
    pub arguments: Vec<AutocompleteArgument>,
    #[serde(default)]
    pub sub_commands: Vec<AutocompleteData>,
}

impl AutocompleteData {
    fn leaf(trigger: &str, hint: &str, help_text: &str) -> Self {
        Self {
            trigger: trigger.to_string(),
            hint: hint.to_string(),
            help_text: help_text.to_string(),
            role_id: String::new(),
            arguments: Vec::new(),
            sub_commands: Vec::new(),
        }
    }
}

pub fn command_autocomplete(config: &BroomConfig) -> AutocompleteData {
    let global = global_arguments(config);
    let mut root = AutocompleteData::leaf(COMMAND_TRIGGER, COMMAND_HINT, COMMAND_DESCRIPTION);
    if config.restrict_to_admins_only {
        root.role_id = SYSTEM_ADMIN_ROLE_ID.to_string();
    }

    for spec in SUBCOMMAND_SPECS {
        let hint = spec
            .usage
            .strip_prefix(spec.name)
            .map(str::trim)
            .unwrap_or_default();
        let mut sub_command = AutocompleteData::leaf(spec.name, hint, spec.description);
        match spec.name {
            "last" => {
                sub_command.arguments = global.iter().map(AutocompleteArgument::text).collect();
            }
            "filter" => {
                sub_command.arguments = FILTER_ARGUMENTS
                    .iter()
                    .map(|argument| {
                        if argument.name == FILTER_ARG_FROM {
                            AutocompleteArgument::text(argument)
                        } else {
                            AutocompleteArgument::post_id(argument)
                        }
                    })
                    .chain(global.iter().map(AutocompleteArgument::text))
                    .collect();
            }
            _ => {}
        }
        root.sub_commands.push(sub_command);
    }
    root
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Entry of a dynamic autocomplete list, in the platform's field casing.
pub struct AutocompleteListItem {
    #[serde(rename = "Item")]
    pub item: String,
    #[serde(rename = "Hint", default)]
    pub hint: String,
    #[serde(rename = "HelpText", default)]
    pub help_text: String,
}

/// Static suggestion served for post-id arguments of `filter`.
pub fn post_id_autocomplete_items() -> Vec<AutocompleteListItem> {
    vec![AutocompleteListItem {
        item: "[postID|postURL]".to_string(),
        hint: String::new(),
        help_text: "Input the post ID".to_string(),
    }]
}
