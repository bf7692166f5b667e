//! Help page rendering.
//!
//! Pure text formatting over a [`CommandInfo`]; nothing here looks at the
//! live tree.

use std::fmt::Write;

use crate::info::{CommandInfo, FlagInfo};
use crate::kind::ScalarKind;

/// Renders the help page for one command, banner first.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{Cli, render_help};
///
/// let mut cli = Cli::new("app", "Demo", "v0.1.0");
/// cli.new_sub_command("build", "Build the project").unwrap();
///
/// let text = render_help(&cli.info(), "app v0.1.0 - Demo");
/// assert!(text.starts_with("app v0.1.0 - Demo\n\n"));
/// assert!(text.contains("   build   Build the project\n"));
/// assert!(text.contains("  -help\n"));
/// ```
pub fn render_help(info: &CommandInfo, banner: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{banner}\n");

    if !info.is_root() {
        if info.description.is_empty() {
            let _ = writeln!(out, "{}", info.path);
        } else {
            let _ = writeln!(out, "{} - {}", info.path, info.description);
        }
    }
    if let Some(long) = info.long_description.as_deref().filter(|l| !l.is_empty()) {
        let _ = writeln!(out, "{long}\n");
    }

    let visible: Vec<&CommandInfo> = info.visible_subcommands().collect();
    if !visible.is_empty() {
        out.push_str("Available commands:\n\n");
        let width = visible.iter().map(|sub| sub.name.len()).max().unwrap_or(0);
        for sub in visible {
            let mut line = format!("   {:<width$}   {}", sub.name, sub.description);
            if sub.is_default {
                line.push_str(" [default]");
            }
            let _ = writeln!(out, "{}", line.trim_end());
        }
        out.push('\n');
    }

    if info.flag_count > 0 {
        out.push_str("Flags:\n\n");
        for flag in &info.flags {
            write_flag(&mut out, flag);
        }
    }
    out.push('\n');
    out
}

fn write_flag(out: &mut String, flag: &FlagInfo) {
    let _ = write!(out, "  -{}", flag.name);
    if flag.kind.element() != ScalarKind::Bool || flag.kind.is_list() {
        let _ = write!(out, " {}", flag.kind);
    }
    out.push('\n');

    let mut usage = flag.description.clone();
    if let Some(default) = &flag.default {
        let _ = write!(usage, " (default {default})");
    }
    if let Some(shortcut) = &flag.shortcut {
        let _ = write!(usage, " (shortcut -{shortcut})");
    }
    if flag.required {
        usage.push_str(" (required)");
    }
    let _ = writeln!(out, "    \t{}", usage.trim_start());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Kind;

    fn info() -> CommandInfo {
        CommandInfo {
            name: "add".to_string(),
            path: "app add".to_string(),
            description: "Add a thing".to_string(),
            long_description: Some("Adds a thing to the list.".to_string()),
            shortcut: None,
            required: false,
            hidden: false,
            is_default: false,
            flag_count: 3,
            flags: vec![
                FlagInfo {
                    name: "force".to_string(),
                    kind: Kind::Scalar(ScalarKind::Bool),
                    description: "Overwrite".to_string(),
                    default: None,
                    shortcut: Some("f".to_string()),
                    required: true,
                },
                FlagInfo {
                    name: "help".to_string(),
                    kind: Kind::Scalar(ScalarKind::Bool),
                    description: "Get help on the 'app add' command.".to_string(),
                    default: None,
                    shortcut: None,
                    required: false,
                },
                FlagInfo {
                    name: "tags".to_string(),
                    kind: Kind::List(ScalarKind::String),
                    description: "Tags".to_string(),
                    default: Some("[\"a\"]".to_string()),
                    shortcut: None,
                    required: false,
                },
            ],
            positionals: Vec::new(),
            subcommands: Vec::new(),
        }
    }

    #[test]
    fn test_render_subcommand_page() {
        let text = render_help(&info(), "app v1 - Demo");
        let expected = "\
app v1 - Demo

app add - Add a thing
Adds a thing to the list.

Flags:

  -force
    \tOverwrite (shortcut -f) (required)
  -help
    \tGet help on the 'app add' command.
  -tags [string]
    \tTags (default [\"a\"])

";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_lists_commands_aligned_without_hidden() {
        let mut root = info();
        root.name = "app".to_string();
        root.path = "app".to_string();
        root.long_description = None;
        root.flags.clear();
        root.flag_count = 0;

        let mut build = info();
        build.name = "build".to_string();
        build.description = "Build it".to_string();
        build.is_default = true;
        let mut secret = info();
        secret.name = "secret".to_string();
        secret.hidden = true;
        let mut ls = info();
        ls.name = "ls".to_string();
        ls.description = String::new();
        root.subcommands = vec![build, secret, ls];

        let text = render_help(&root, "banner");
        assert_eq!(
            text,
            "banner\n\nAvailable commands:\n\n   build   Build it [default]\n   ls\n\n\n"
        );
    }
}
