//! Hierarchical command-line interfaces built from typed flags.
//!
//! This crate lets a program declare its command line as a tree:
//!
//! - [`Cli`]: the application object. It owns the root command and holds
//!   global settings (default command, banner, error hook, pre-run hook).
//! - [`Command`]: one node of the tree, with subcommands, flags, positional
//!   bindings and an optional action.
//! - [`Var`]: a caller-owned destination that flags and positional
//!   arguments write into.
//! - [`Flags`] / [`Field`]: a per-type descriptor table that binds a whole
//!   record (including nested records) in one call.
//!
//! Dispatch walks the argument vector down the tree, interleaves flag and
//! positional parsing at the selected command, and runs its action.
//! Declaration mistakes are reported as [`ConfigError`] at registration
//! time; bad user input is reported as [`RunError`] from
//! [`Cli::run`]/[`Cli::run_args`].
//!
//! # Example
//!
//! ```
//! use cmdtree_core::*;
//!
//! #[derive(Default)]
//! struct Create {
//!     mode: String,
//!     tags: Vec<String>,
//! }
//!
//! impl Flags for Create {
//!     fn fields() -> Vec<Field<Self>> {
//!         vec![
//!             Field::value("mode", |c: &mut Self| &mut c.mode).pos(1),
//!             Field::value("tags", |c: &mut Self| &mut c.tags)
//!                 .pos(2)
//!                 .sep(",")
//!                 .default("a,b,c"),
//!         ]
//!     }
//! }
//!
//! let mut cli = Cli::new("app", "An example", "v0.1.0");
//! cli.set_output(std::io::sink());
//!
//! let created = Var::new(Vec::new());
//! let log = created.clone();
//! cli.new_sub_command_function("create", "Create something", move |c: &mut Create| {
//!     log.update(|l: &mut Vec<String>| l.push(format!("{} {:?}", c.mode, c.tags)));
//!     Ok(())
//! })?;
//!
//! cli.run_args(["create", "123"])?;
//! cli.run_args(["create", "456", "x,y"])?;
//! cli.run_args(["create", "-mode", "789"])?;
//! assert_eq!(
//!     created.get(),
//!     vec![
//!         r#"123 ["a", "b", "c"]"#,
//!         r#"456 ["x", "y"]"#,
//!         r#"789 ["x", "y"]"#,
//!     ]
//! );
//!
//! // Unknown flags come back as errors tagged with the command path.
//! let err = cli.run_args(["create", "-nope"]).unwrap_err();
//! assert_eq!(err.path(), Some("app create"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cli;
mod command;
mod error;
mod field;
mod flagset;
mod help;
mod info;
mod kind;
mod place;
mod validate;
mod var;

pub use cli::Cli;
pub use command::Command;
pub use error::{ActionResult, ConfigError, ParseError, RunError, ValueError};
pub use field::{Field, Flags};
pub use flagset::{Flag, FlagSet};
pub use help::render_help;
pub use info::{CommandInfo, FlagInfo, PositionalInfo};
pub use kind::{Bindable, Kind, ScalarKind, Scalar};
pub use validate::{check_name, validate_tree};
pub use var::Var;
