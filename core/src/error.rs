//! Error types for command-tree construction and dispatch.
//!
//! Two failure domains are kept apart:
//!
//! - [`ConfigError`]: mistakes in how the tree was declared, such as
//!   duplicate names or malformed defaults. Returned by the registration
//!   methods at startup, before any user input is seen.
//! - [`RunError`]: what a dispatch returns. User-input problems surface as
//!   [`RunError::Parse`] (wrapping a [`ParseError`]) or as a missing required
//!   command/flag; action and pre-run failures are forwarded unchanged.

use thiserror::Error;

use crate::kind::ScalarKind;

/// A token that could not be converted into its destination kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse {token:?} as {kind}: {reason}")]
pub struct ValueError {
    /// Kind the token was parsed as.
    pub kind: ScalarKind,
    /// The offending token.
    pub token: String,
    /// Why the conversion failed.
    pub reason: String,
}

impl ValueError {
    pub(crate) fn new(kind: ScalarKind, token: &str, reason: impl ToString) -> Self {
        Self {
            kind,
            token: token.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Construction-time errors raised while declaring commands and flags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Command, flag or shortcut name is empty, contains whitespace or `=`,
    /// or starts with a dash.
    #[error("invalid name {0:?}")]
    InvalidName(String),
    /// Two flags on the same command share a name.
    #[error("duplicate flag '{name}' on command '{path}'")]
    DuplicateFlag { path: String, name: String },
    /// Two sibling commands share a name.
    #[error("duplicate subcommand '{name}' under '{path}'")]
    DuplicateCommand { path: String, name: String },
    /// A flag shortcut collides with another flag name or shortcut.
    #[error("duplicate shortcut '{shortcut}' on command '{path}'")]
    DuplicateShortcut { path: String, shortcut: String },
    /// Two destinations were bound to the same positional index.
    #[error("positional index {index} on command '{path}' is already bound to '{field}'")]
    DuplicatePosition {
        path: String,
        index: usize,
        field: String,
    },
    /// Positional indexes are 1-based; `0` is rejected.
    #[error("positional index 0 for '{field}' on command '{path}' (indexes start at 1)")]
    InvalidPosition { path: String, field: String },
    /// A declared default literal does not parse into the field's kind.
    #[error("invalid default value {literal:?} for field '{field}': {source}")]
    InvalidDefault {
        field: String,
        literal: String,
        #[source]
        source: ValueError,
    },
    /// Shortcut or required marker set on a flag that was never registered.
    #[error("flag '{name}' is not defined on command '{path}'")]
    UnknownFlag { path: String, name: String },
    /// No command exists at the given path.
    #[error("no command at path '{0}'")]
    UnknownCommand(String),
}

/// User-input errors produced while parsing one command's tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// `-name` does not match any flag of the command.
    #[error("flag provided but not defined: -{0}")]
    UnknownFlag(String),
    /// Malformed flag token such as `---x` or `-=x`.
    #[error("bad flag syntax: {0}")]
    BadSyntax(String),
    /// A value-taking flag was the last token.
    #[error("flag needs an argument: -{0}")]
    MissingValue(String),
    /// The flag's value did not convert into its kind.
    #[error("invalid value {token:?} for flag -{flag}: {source}")]
    InvalidValue {
        flag: String,
        token: String,
        #[source]
        source: ValueError,
    },
    /// The positional token did not convert into the bound field's kind.
    #[error("invalid value {token:?} for argument {index}: {source}")]
    InvalidPositional {
        index: usize,
        token: String,
        #[source]
        source: ValueError,
    },
}

/// Errors returned by [`Cli::run`](crate::Cli::run) and
/// [`Cli::run_args`](crate::Cli::run_args).
#[derive(Debug, Error)]
pub enum RunError {
    /// Flag or positional parsing failed on the command at `path`.
    ///
    /// `message` is either the default rendering or whatever the
    /// error-formatting hook returned.
    #[error("{message}")]
    Parse {
        path: String,
        message: String,
        #[source]
        source: ParseError,
    },
    /// Required subcommands were not supplied.
    #[error("missing required command for '{path}': {}", .names.join(", "))]
    MissingCommand { path: String, names: Vec<String> },
    /// Required flags were not supplied.
    #[error("missing required flag for '{path}': {}", dashed(.names))]
    MissingFlags { path: String, names: Vec<String> },
    /// The pre-run hook refused to continue.
    #[error("pre-run failed: {0}")]
    PreRun(#[source] anyhow::Error),
    /// The selected command's action failed.
    #[error(transparent)]
    Action(anyhow::Error),
    /// Writing help text failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunError {
    /// Path of the command the error originated on, when known.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Parse { path, .. }
            | Self::MissingCommand { path, .. }
            | Self::MissingFlags { path, .. } => Some(path),
            _ => None,
        }
    }
}

fn dashed(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("-{name}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type returned by command actions.
pub type ActionResult = anyhow::Result<()>;
