//! Serializable snapshot of a command tree.
//!
//! [`CommandInfo`] is what the help renderer consumes and what
//! [`Cli::info_json`](crate::Cli::info_json) exports. It is a plain data copy:
//! building one never touches the bound destinations beyond rendering their
//! registration-time defaults.

use serde::{Deserialize, Serialize};

use crate::kind::Kind;

/// Metadata for one registered flag.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{FlagInfo, Kind, ScalarKind};
///
/// let flag = FlagInfo {
///     name: "count".into(),
///     kind: Kind::Scalar(ScalarKind::U16),
///     description: "How many".into(),
///     default: Some("3".into()),
///     shortcut: Some("c".into()),
///     required: false,
/// };
/// assert!(flag.matches("c"));
/// assert!(flag.matches("count"));
/// assert!(!flag.matches("cnt"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagInfo {
    pub name: String,
    pub kind: Kind,
    pub description: String,
    /// Rendered default, `None` when it is the kind's zero value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl FlagInfo {
    /// Whether `token` (without dashes) names this flag or its shortcut.
    pub fn matches(&self, token: &str) -> bool {
        self.name == token || self.shortcut.as_deref() == Some(token)
    }
}

/// A positional slot: 1-based index, the field it fills, and its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionalInfo {
    pub index: usize,
    pub field: String,
    pub kind: Kind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

/// Metadata for one command and, recursively, its subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInfo {
    pub name: String,
    /// Space-separated names from the root down to this command.
    pub path: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub hidden: bool,
    /// Set on the application's default command.
    #[serde(default)]
    pub is_default: bool,
    /// Number of flags registered directly on the command, the implicit
    /// help flag included. Inherited flags do not count.
    pub flag_count: usize,
    #[serde(default)]
    pub flags: Vec<FlagInfo>,
    #[serde(default)]
    pub positionals: Vec<PositionalInfo>,
    #[serde(default)]
    pub subcommands: Vec<CommandInfo>,
}

impl CommandInfo {
    /// Whether this is the root of its tree (its path is its own name).
    pub fn is_root(&self) -> bool {
        self.path == self.name
    }

    pub fn find_subcommand(&self, name: &str) -> Option<&CommandInfo> {
        self.subcommands
            .iter()
            .find(|sub| sub.name == name || sub.shortcut.as_deref() == Some(name))
    }

    pub fn find_flag(&self, token: &str) -> Option<&FlagInfo> {
        self.flags.iter().find(|flag| flag.matches(token))
    }

    /// Subcommands that appear in help listings.
    pub fn visible_subcommands(&self) -> impl Iterator<Item = &CommandInfo> {
        self.subcommands.iter().filter(|sub| !sub.hidden)
    }

    /// Walks a whitespace-separated path of names below this command.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdtree_core::Cli;
    ///
    /// let mut cli = Cli::new("git", "Version control", "v2.0.0");
    /// cli.new_sub_command("remote", "Manage remotes")
    ///     .unwrap()
    ///     .new_sub_command("add", "Add a remote")
    ///     .unwrap();
    ///
    /// let info = cli.info();
    /// assert_eq!(info.descend("remote add").unwrap().path, "git remote add");
    /// assert!(info.descend("remote rm").is_none());
    /// ```
    pub fn descend(&self, path: &str) -> Option<&CommandInfo> {
        path.split_whitespace()
            .try_fold(self, |node, name| node.find_subcommand(name))
    }
}
