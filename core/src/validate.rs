//! Name and tree validation.
//!
//! [`check_name`] guards every registration path (command names, flag names,
//! shortcuts). [`validate_tree`] runs over a [`CommandInfo`] snapshot, so it
//! also works on trees read back from JSON, and catches problems that only
//! show up once siblings are known.
//!
//! # Examples
//!
//! ```
//! use cmdtree_core::*;
//!
//! let mut cli = Cli::new("git", "Version control", "v2.0.0");
//! cli.new_sub_command("commit", "Record changes").unwrap();
//! assert!(validate_tree(&cli.info()).is_empty());
//!
//! // A hand-edited snapshot with two `commit` entries
//! let mut info = cli.info();
//! info.subcommands.push(info.subcommands[0].clone());
//! let errors = validate_tree(&info);
//! assert!(matches!(errors[0], ConfigError::DuplicateCommand { .. }));
//! ```

use std::collections::HashSet;

use crate::error::ConfigError;
use crate::info::{CommandInfo, FlagInfo};

/// Rejects names that could never be matched as a single token.
///
/// A valid name is non-empty, contains no whitespace or `=`, and does not
/// start with a dash.
pub fn check_name(name: &str) -> Result<(), ConfigError> {
    let bad = name.is_empty()
        || name.starts_with('-')
        || name.contains('=')
        || name.chars().any(char::is_whitespace);
    if bad {
        return Err(ConfigError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Validates a command tree snapshot.
///
/// Checks every name, sibling uniqueness of subcommand names and shortcuts,
/// flag name/shortcut collisions, and positional index uniqueness. Stops at
/// the first problem found.
pub fn validate_tree(info: &CommandInfo) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if let Err(err) = check_name(&info.name) {
        errors.push(err);
        return errors;
    }

    errors.extend(validate_flags(&info.path, &info.flags));
    if !errors.is_empty() {
        return errors;
    }

    errors.extend(validate_positionals(info));
    if !errors.is_empty() {
        return errors;
    }

    errors.extend(validate_subcommands(info));
    errors
}

fn validate_subcommands(info: &CommandInfo) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for sub in &info.subcommands {
        if !seen.insert(sub.name.as_str()) {
            errors.push(ConfigError::DuplicateCommand {
                path: info.path.clone(),
                name: sub.name.clone(),
            });
            return errors;
        }
    }

    for sub in &info.subcommands {
        if let Some(shortcut) = &sub.shortcut {
            let clashes = seen.contains(shortcut.as_str())
                || info
                    .subcommands
                    .iter()
                    .any(|other| other.name != sub.name && other.shortcut == sub.shortcut);
            if clashes || check_name(shortcut).is_err() {
                errors.push(ConfigError::DuplicateShortcut {
                    path: info.path.clone(),
                    shortcut: shortcut.clone(),
                });
                return errors;
            }
        }

        errors.extend(validate_tree(sub));
        if !errors.is_empty() {
            return errors;
        }
    }

    errors
}

fn validate_flags(path: &str, flags: &[FlagInfo]) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    let mut names: HashSet<&str> = HashSet::new();

    for flag in flags {
        if let Err(err) = check_name(&flag.name) {
            errors.push(err);
            return errors;
        }
        if !names.insert(flag.name.as_str()) {
            errors.push(ConfigError::DuplicateFlag {
                path: path.to_string(),
                name: flag.name.clone(),
            });
            return errors;
        }
    }

    let mut shortcuts: HashSet<&str> = HashSet::new();
    for shortcut in flags.iter().filter_map(|flag| flag.shortcut.as_deref()) {
        if names.contains(shortcut) || !shortcuts.insert(shortcut) || check_name(shortcut).is_err()
        {
            errors.push(ConfigError::DuplicateShortcut {
                path: path.to_string(),
                shortcut: shortcut.to_string(),
            });
            return errors;
        }
    }

    errors
}

fn validate_positionals(info: &CommandInfo) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<usize> = HashSet::new();

    for slot in &info.positionals {
        if slot.index == 0 {
            errors.push(ConfigError::InvalidPosition {
                path: info.path.clone(),
                field: slot.field.clone(),
            });
            return errors;
        }
        if !seen.insert(slot.index) {
            errors.push(ConfigError::DuplicatePosition {
                path: info.path.clone(),
                index: slot.index,
                field: slot.field.clone(),
            });
            return errors;
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::PositionalInfo;
    use crate::kind::{Kind, ScalarKind};

    fn node(name: &str, path: &str) -> CommandInfo {
        CommandInfo {
            name: name.to_string(),
            path: path.to_string(),
            description: String::new(),
            long_description: None,
            shortcut: None,
            required: false,
            hidden: false,
            is_default: false,
            flag_count: 0,
            flags: Vec::new(),
            positionals: Vec::new(),
            subcommands: Vec::new(),
        }
    }

    fn flag(name: &str, shortcut: Option<&str>) -> FlagInfo {
        FlagInfo {
            name: name.to_string(),
            kind: Kind::Scalar(ScalarKind::Bool),
            description: String::new(),
            default: None,
            shortcut: shortcut.map(str::to_string),
            required: false,
        }
    }

    #[test]
    fn test_check_name() {
        assert!(check_name("create").is_ok());
        assert!(check_name("dry_run").is_ok());
        for bad in ["", "-x", "two words", "a=b", "tab\tbed"] {
            assert_eq!(
                check_name(bad),
                Err(ConfigError::InvalidName(bad.to_string()))
            );
        }
    }

    #[test]
    fn test_validate_tree_rejects_duplicate_subcommands() {
        let mut root = node("app", "app");
        root.subcommands.push(node("run", "app run"));
        root.subcommands.push(node("run", "app run"));

        assert_eq!(
            validate_tree(&root),
            vec![ConfigError::DuplicateCommand {
                path: "app".to_string(),
                name: "run".to_string()
            }]
        );
    }

    #[test]
    fn test_validate_tree_rejects_shortcut_shadowing_sibling() {
        let mut root = node("app", "app");
        let mut build = node("build", "app build");
        build.shortcut = Some("test".to_string());
        root.subcommands.push(build);
        root.subcommands.push(node("test", "app test"));

        assert!(matches!(
            validate_tree(&root).as_slice(),
            [ConfigError::DuplicateShortcut { shortcut, .. }] if shortcut == "test"
        ));
    }

    #[test]
    fn test_validate_tree_rejects_flag_shortcut_equal_to_flag_name() {
        let mut root = node("app", "app");
        root.flags.push(flag("verbose", Some("quiet")));
        root.flags.push(flag("quiet", None));

        assert!(matches!(
            validate_tree(&root).as_slice(),
            [ConfigError::DuplicateShortcut { .. }]
        ));
    }

    #[test]
    fn test_validate_tree_checks_nested_positionals() {
        let mut root = node("app", "app");
        let mut sub = node("copy", "app copy");
        for field in ["src", "dst"] {
            sub.positionals.push(PositionalInfo {
                index: 1,
                field: field.to_string(),
                kind: Kind::Scalar(ScalarKind::String),
                separator: None,
            });
        }
        root.subcommands.push(sub);

        assert_eq!(
            validate_tree(&root),
            vec![ConfigError::DuplicatePosition {
                path: "app copy".to_string(),
                index: 1,
                field: "dst".to_string()
            }]
        );
    }

    #[test]
    fn test_validate_tree_accepts_valid_tree() {
        let mut root = node("app", "app");
        root.flags.push(flag("help", None));
        root.flags.push(flag("name", Some("n")));
        let mut nc = node("namecommand", "app namecommand");
        nc.shortcut = Some("nc".to_string());
        root.subcommands.push(nc);

        assert!(validate_tree(&root).is_empty());
    }
}
