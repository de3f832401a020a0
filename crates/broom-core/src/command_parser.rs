//! `/broom` command-line tokenizer.
//!
//! Tokens are whitespace separated. The trigger is dropped, the next token selects the
//! subcommand, every `--name` token consumes exactly one value token, and everything
//! else is positional. Value checks that need the chat platform happen later.

use std::collections::BTreeMap;

use crate::broom_error::{BroomError, BroomResult};

pub const COMMAND_TRIGGER: &str = "broom";
pub const ARG_DELETE_PINNED_POSTS: &str = "delete-pinned-posts";
pub const ARG_CONFIRM: &str = "confirm";
pub const FILTER_ARG_AFTER: &str = "after";
pub const FILTER_ARG_BEFORE: &str = "before";
pub const FILTER_ARG_FROM: &str = "from";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Enumerates supported `Subcommand` values.
pub enum Subcommand {
    Last,
    Filter,
    #[default]
    Help,
}

impl Subcommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Last => "last",
            Self::Filter => "filter",
            Self::Help => "help",
        }
    }

    /// Unknown tokens fall back to `Help` so a mistyped subcommand shows usage.
    fn from_token(token: &str) -> Self {
        match token {
            "last" => Self::Last,
            "filter" => Self::Filter,
            _ => Self::Help,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `FilterFlag` values.
pub enum FilterFlag {
    After,
    Before,
    From,
}

impl FilterFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::After => FILTER_ARG_AFTER,
            Self::Before => FILTER_ARG_BEFORE,
            Self::From => FILTER_ARG_FROM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `FilterArg` used across broom components.
pub struct FilterArg {
    pub flag: FilterFlag,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Tokenized command line.
///
/// `named_flags` holds the boolean option flags. Filter flags keep their raw value
/// and their order of appearance in `filter_args` for the filter resolver.
pub struct ParsedCommand {
    pub subcommand: Subcommand,
    pub positional_args: Vec<String>,
    pub named_flags: BTreeMap<String, bool>,
    pub filter_args: Vec<FilterArg>,
}

impl ParsedCommand {
    pub fn flag(&self, name: &str) -> bool {
        self.named_flags.get(name).copied().unwrap_or(false)
    }

    pub fn has_filters(&self) -> bool {
        !self.filter_args.is_empty()
    }
}

pub(crate) fn learn_usage_hint() -> String {
    format!("Type `/{COMMAND_TRIGGER} help` to learn how to broom")
}

pub fn parse_command_line(raw: &str) -> BroomResult<ParsedCommand> {
    let mut tokens = raw.split_whitespace();
    let _trigger = tokens.next();
    let Some(subcommand_token) = tokens.next() else {
        return Ok(ParsedCommand::default());
    };
    let subcommand = Subcommand::from_token(subcommand_token);
    let mut parsed = ParsedCommand {
        subcommand,
        ..ParsedCommand::default()
    };
    if subcommand == Subcommand::Help {
        return Ok(parsed);
    }

    let tokens = tokens.collect::<Vec<_>>();
    let mut index = 0_usize;
    while index < tokens.len() {
        let token = tokens[index];
        let Some(name) = token.strip_prefix("--") else {
            parsed.positional_args.push(token.to_string());
            index += 1;
            continue;
        };

        let Some(value) = tokens.get(index + 1).copied() else {
            return Err(BroomError::user(format!(
                "Argument `--{name}` should have a value. {}",
                learn_usage_hint()
            )));
        };
        match name {
            ARG_DELETE_PINNED_POSTS | ARG_CONFIRM => {
                let flag_value = parse_bool_flag_value(name, value)?;
                parsed.named_flags.insert(name.to_string(), flag_value);
            }
            FILTER_ARG_AFTER => parsed.filter_args.push(FilterArg {
                flag: FilterFlag::After,
                value: value.to_string(),
            }),
            FILTER_ARG_BEFORE => parsed.filter_args.push(FilterArg {
                flag: FilterFlag::Before,
                value: value.to_string(),
            }),
            FILTER_ARG_FROM => parsed.filter_args.push(FilterArg {
                flag: FilterFlag::From,
                value: value.to_string(),
            }),
            _ => {
                return Err(BroomError::user(format!(
                    "Unknown argument `--{name}`. {}",
                    learn_usage_hint()
                )));
            }
        }
        index += 2;
    }

    Ok(parsed)
}

fn parse_bool_flag_value(name: &str, value: &str) -> BroomResult<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(BroomError::user(format!(
            "Invalid value for `--{name}`, `{value}` should be `true` or `false`"
        ))),
    }
}
