//! Command tree nodes and the recursive dispatcher.
//!
//! A [`Command`] owns its subcommands, its [`FlagSet`], its positional
//! bindings and an optional action. Registration methods return
//! `Result<_, ConfigError>` so that declaration mistakes surface at startup;
//! dispatch only ever writes into the variables the caller bound.
//!
//! # Examples
//!
//! ```
//! use cmdtree_core::{Cli, Var};
//!
//! let mut cli = Cli::new("app", "Demo", "v0.1.0");
//! let mode = Var::new(String::new());
//!
//! let sub = cli.new_sub_command("sub", "A subcommand").unwrap();
//! sub.string_flag("mode", "Mode to use", &mode).unwrap();
//!
//! cli.run_args(["sub", "-mode", "123"]).unwrap();
//! assert_eq!(mode.get(), "123");
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::cli::Cli;
use crate::error::{ActionResult, ConfigError, ParseError, RunError};
use crate::field::{self, Flags};
use crate::flagset::{Flag, FlagSet, Token, classify};
use crate::info::{CommandInfo, FlagInfo, PositionalInfo};
use crate::kind::Bindable;
use crate::place::{Bound, Destination, Place};
use crate::validate::check_name;
use crate::var::Var;

type Action = RefCell<Box<dyn FnMut() -> ActionResult>>;

struct Positional {
    field: String,
    separator: Option<String>,
    value: Rc<dyn Destination>,
}

/// One node of the command tree.
pub struct Command {
    name: String,
    path: String,
    description: String,
    long_description: Option<String>,
    children: Vec<Command>,
    index: HashMap<String, usize>,
    flags: FlagSet,
    flag_count: usize,
    positionals: BTreeMap<usize, Positional>,
    action: Option<Action>,
    help: Var<bool>,
    other_args: Var<Vec<String>>,
    shortcut: Option<String>,
    required: bool,
    hidden: bool,
}

macro_rules! typed_flags {
    ($($(#[$doc:meta])* $method:ident => $ty:ty;)*) => {$(
        $(#[$doc])*
        pub fn $method(
            &mut self,
            name: &str,
            description: &str,
            variable: &Var<$ty>,
        ) -> Result<&mut Self, ConfigError> {
            self.flag(name, description, variable)
        }
    )*};
}

impl Command {
    /// Creates a detached command. Its path is its name until it is attached
    /// with [`add_command`](Self::add_command).
    pub fn new(name: &str, description: &str) -> Self {
        let help = Var::new(false);
        let mut flags = FlagSet::new(name);
        flags.install_help(Flag::new(
            "help",
            &help_description(name),
            Rc::new(Bound::from_var(&help)),
        ));
        Self {
            name: name.to_string(),
            path: name.to_string(),
            description: description.to_string(),
            long_description: None,
            children: Vec::new(),
            index: HashMap::new(),
            flags,
            flag_count: 1,
            positionals: BTreeMap::new(),
            action: None,
            help,
            other_args: Var::default(),
            shortcut: None,
            required: false,
            hidden: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Space-separated names from the root down to this command.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn long_description(&self) -> Option<&str> {
        self.long_description.as_deref()
    }

    pub fn set_long_description(&mut self, text: &str) -> &mut Self {
        self.long_description = Some(text.to_string());
        self
    }

    /// Hides the command from help listings. Dispatch is unaffected.
    pub fn hide(&mut self) -> &mut Self {
        self.hidden = true;
        self
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn shortcut(&self) -> Option<&str> {
        self.shortcut.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    /// Number of flags registered directly on this command, help included.
    pub fn flag_count(&self) -> usize {
        self.flag_count
    }

    /// Sets the action run when this command is selected. A later call
    /// replaces the earlier action.
    pub fn action<F>(&mut self, action: F) -> &mut Self
    where
        F: FnMut() -> ActionResult + 'static,
    {
        self.action = Some(RefCell::new(Box::new(action)));
        self
    }

    /// Positional tokens from the last dispatch that no index binding took.
    pub fn other_args(&self) -> Vec<String> {
        self.other_args.get()
    }

    /// Shared handle to the other-args list, for capture in actions.
    pub fn other_args_var(&self) -> Var<Vec<String>> {
        self.other_args.clone()
    }

    // ---- tree ----

    /// Attaches `command` as a child and returns it.
    ///
    /// The child's path (and those of its own descendants) is rebuilt from
    /// this command's path.
    pub fn add_command(&mut self, mut command: Command) -> Result<&mut Command, ConfigError> {
        check_name(&command.name)?;
        if self.index.contains_key(&command.name) || self.child_by_shortcut(&command.name).is_some()
        {
            return Err(ConfigError::DuplicateCommand {
                path: self.path.clone(),
                name: command.name,
            });
        }
        command.set_parent_path(&self.path);
        debug!(parent = %self.path, command = %command.path, "Attached subcommand");

        let slot = self.children.len();
        self.index.insert(command.name.clone(), slot);
        self.children.push(command);
        Ok(&mut self.children[slot])
    }

    pub fn new_sub_command(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<&mut Command, ConfigError> {
        self.add_command(Command::new(name, description))
    }

    /// Creates a subcommand that also recognises every flag currently
    /// registered here (except `help`). Flags added to this command later
    /// are not picked up.
    pub fn new_sub_command_inherit_flags(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<&mut Command, ConfigError> {
        let mut command = Command::new(name, description);
        for flag in self.flags.iter().filter(|flag| flag.name() != "help") {
            command.flags.insert(flag.clone())?;
        }
        self.add_command(command)
    }

    /// Creates a subcommand whose flags come from `R` and whose action calls
    /// `function` with the bound record.
    ///
    /// The record starts as `R::default()`, then [`Flags::defaults`] and the
    /// declared field defaults are applied, exactly as in
    /// [`add_flags`](Self::add_flags).
    pub fn new_sub_command_function<R, F>(
        &mut self,
        name: &str,
        description: &str,
        mut function: F,
    ) -> Result<&mut Command, ConfigError>
    where
        R: Flags + Default,
        F: FnMut(&mut R) -> ActionResult + 'static,
    {
        let record = Var::new(R::default());
        let command = self.new_sub_command(name, description)?;
        command.add_flags(&record)?;
        command.action(move || function(&mut record.borrow_mut()));
        Ok(command)
    }

    pub fn subcommand(&self, name: &str) -> Option<&Command> {
        self.index.get(name).map(|&slot| &self.children[slot])
    }

    pub fn subcommand_mut(&mut self, name: &str) -> Option<&mut Command> {
        let slot = *self.index.get(name)?;
        Some(&mut self.children[slot])
    }

    /// Subcommands in registration order.
    pub fn subcommands(&self) -> impl Iterator<Item = &Command> {
        self.children.iter()
    }

    /// Walks a whitespace-separated path of subcommand names.
    pub fn command(&self, path: &str) -> Option<&Command> {
        path.split_whitespace()
            .try_fold(self, |node, name| node.subcommand(name))
    }

    pub fn command_mut(&mut self, path: &str) -> Option<&mut Command> {
        path.split_whitespace()
            .try_fold(self, |node, name| node.subcommand_mut(name))
    }

    /// Accepts `shortcut` in place of the child's name.
    pub fn command_shortcut(
        &mut self,
        child: &str,
        shortcut: &str,
    ) -> Result<&mut Self, ConfigError> {
        check_name(shortcut)?;
        let taken = self.index.contains_key(shortcut)
            || self
                .child_by_shortcut(shortcut)
                .is_some_and(|other| other.name != child);
        if taken {
            return Err(ConfigError::DuplicateShortcut {
                path: self.path.clone(),
                shortcut: shortcut.to_string(),
            });
        }
        self.child_mut(child)?.shortcut = Some(shortcut.to_string());
        Ok(self)
    }

    /// Marks a child command as one that must be named whenever this
    /// command is dispatched.
    pub fn command_required(&mut self, child: &str) -> Result<&mut Self, ConfigError> {
        self.child_mut(child)?.required = true;
        Ok(self)
    }

    fn child_mut(&mut self, name: &str) -> Result<&mut Command, ConfigError> {
        let path = format!("{} {name}", self.path);
        self.subcommand_mut(name)
            .ok_or(ConfigError::UnknownCommand(path))
    }

    fn child_by_shortcut(&self, shortcut: &str) -> Option<&Command> {
        self.children
            .iter()
            .find(|child| child.shortcut.as_deref() == Some(shortcut))
    }

    fn set_parent_path(&mut self, parent: &str) {
        self.path = format!("{parent} {}", self.name);
        self.flags.set_name(&self.path);
        self.flags
            .set_description("help", help_description(&self.path));
        let path = self.path.clone();
        for child in &mut self.children {
            child.set_parent_path(&path);
        }
    }

    // ---- flags ----

    /// Registers a flag of any bindable kind. The variable's current value
    /// becomes the flag's default.
    pub fn flag<T: Bindable>(
        &mut self,
        name: &str,
        description: &str,
        variable: &Var<T>,
    ) -> Result<&mut Self, ConfigError> {
        self.register(name, description, Rc::new(Bound::from_var(variable)))?;
        Ok(self)
    }

    typed_flags! {
        bool_flag => bool;
        /// Boolean list flag; every occurrence appends one element.
        bools_flag => Vec<bool>;
        string_flag => String;
        /// String list flag. Values are never comma-split.
        strings_flag => Vec<String>;
        i8_flag => i8;
        i8s_flag => Vec<i8>;
        i16_flag => i16;
        i16s_flag => Vec<i16>;
        i32_flag => i32;
        i32s_flag => Vec<i32>;
        i64_flag => i64;
        i64s_flag => Vec<i64>;
        isize_flag => isize;
        isizes_flag => Vec<isize>;
        u8_flag => u8;
        u8s_flag => Vec<u8>;
        u16_flag => u16;
        u16s_flag => Vec<u16>;
        u32_flag => u32;
        u32s_flag => Vec<u32>;
        u64_flag => u64;
        u64s_flag => Vec<u64>;
        usize_flag => usize;
        usizes_flag => Vec<usize>;
        f32_flag => f32;
        f32s_flag => Vec<f32>;
        f64_flag => f64;
        f64s_flag => Vec<f64>;
    }

    /// Binds every field of the record held by `record`.
    ///
    /// When [`Flags::defaults`] returns a value it replaces the record first;
    /// declared field defaults are then written on top.
    pub fn add_flags<R: Flags>(&mut self, record: &Var<R>) -> Result<&mut Self, ConfigError> {
        if let Some(base) = R::defaults() {
            record.set(base);
        }
        let place: Rc<dyn Place<R>> = Rc::new(record.clone());
        field::bind_fields(self, place)?;
        Ok(self)
    }

    /// Binds `variable` to the 1-based positional `index`.
    ///
    /// For list variables the token replaces the list: split on `separator`
    /// when one is given, as a single element otherwise.
    pub fn positional<T: Bindable>(
        &mut self,
        index: usize,
        field: &str,
        variable: &Var<T>,
        separator: Option<&str>,
    ) -> Result<&mut Self, ConfigError> {
        self.bind_position(index, field, Rc::new(Bound::from_var(variable)), separator)?;
        Ok(self)
    }

    /// Accepts `-shortcut` in place of `-name`.
    pub fn flag_shortcut(&mut self, name: &str, shortcut: &str) -> Result<&mut Self, ConfigError> {
        check_name(shortcut)?;
        self.flags.set_shortcut(name, shortcut)?;
        Ok(self)
    }

    /// Marks a flag as one that must appear whenever this command runs.
    pub fn flag_required(&mut self, name: &str) -> Result<&mut Self, ConfigError> {
        self.flags.set_required(name)?;
        Ok(self)
    }

    pub(crate) fn register(
        &mut self,
        name: &str,
        description: &str,
        value: Rc<dyn Destination>,
    ) -> Result<(), ConfigError> {
        check_name(name)?;
        self.flags.insert(Flag::new(name, description, value))?;
        self.flag_count += 1;
        Ok(())
    }

    pub(crate) fn bind_position(
        &mut self,
        index: usize,
        field: &str,
        value: Rc<dyn Destination>,
        separator: Option<&str>,
    ) -> Result<(), ConfigError> {
        if index == 0 {
            return Err(ConfigError::InvalidPosition {
                path: self.path.clone(),
                field: field.to_string(),
            });
        }
        if self.positionals.contains_key(&index) {
            return Err(ConfigError::DuplicatePosition {
                path: self.path.clone(),
                index,
                field: field.to_string(),
            });
        }
        self.positionals.insert(
            index,
            Positional {
                field: field.to_string(),
                separator: separator.map(str::to_string),
                value,
            },
        );
        Ok(())
    }

    // ---- dispatch ----

    pub(crate) fn run(&self, cli: &Cli, mut args: Vec<String>) -> Result<(), RunError> {
        if let Some(first) = args.first_mut() {
            if let Some(child) = self.child_by_shortcut(first) {
                debug!(shortcut = %first, command = %child.name, "Rewrote command shortcut");
                *first = child.name.clone();
            }
        }
        if let Some((first, rest)) = args.split_first() {
            if let Some(child) = self.subcommand(first) {
                debug!(command = %child.path, "Dispatching to subcommand");
                return child.run(cli, rest.to_vec());
            }
        }
        self.rewrite_flag_shortcuts(&mut args);

        self.help.set(false);
        self.other_args.set(Vec::new());

        if !asks_for_help(&args) {
            if let Err(err) = self.check_required(&args) {
                cli.write_help(self)?;
                return Err(err);
            }
        }

        if !args.is_empty() {
            self.parse_args(&args)
                .map_err(|source| cli.parse_error(&self.path, source))?;
            if self.help.get() {
                return cli.write_help(self);
            }
        }

        if let Some(action) = &self.action {
            debug!(command = %self.path, "Running action");
            let mut action = action.borrow_mut();
            return (*action)().map_err(RunError::Action);
        }

        if args.is_empty() {
            if let Some(default) = cli.default_node() {
                if !std::ptr::eq(default, self) {
                    debug!(from = %self.path, to = %default.path, "Falling back to default command");
                    return default.run(cli, Vec::new());
                }
            }
        }

        cli.write_help(self)
    }

    fn rewrite_flag_shortcuts(&self, args: &mut [String]) {
        for token in args.iter_mut() {
            let rewritten = match classify(token) {
                Ok(Token::Terminator) => break,
                Ok(Token::Flag { name, value }) if self.flags.lookup(name).is_none() => {
                    self.flags.by_shortcut(name).map(|flag| match value {
                        Some(value) => format!("-{}={value}", flag.name()),
                        None => format!("-{}", flag.name()),
                    })
                }
                _ => None,
            };
            if let Some(rewritten) = rewritten {
                debug!(from = %token, to = %rewritten, "Rewrote flag shortcut");
                *token = rewritten;
            }
        }
    }

    /// Runs only once no child was selected, so every required child is
    /// missing at this point, whatever the later tokens name.
    fn check_required(&self, args: &[String]) -> Result<(), RunError> {
        let commands: Vec<String> = self
            .children
            .iter()
            .filter(|child| child.required)
            .map(|child| child.name.clone())
            .collect();
        if !commands.is_empty() {
            return Err(RunError::MissingCommand {
                path: self.path.clone(),
                names: commands,
            });
        }

        let supplied: Vec<&str> = args
            .iter()
            .map_while(|token| match classify(token) {
                Ok(Token::Terminator) => None,
                Ok(Token::Flag { name, .. }) => Some(name),
                _ => Some(""),
            })
            .collect();
        let flags: Vec<String> = self
            .flags
            .iter()
            .filter(|flag| flag.is_required())
            .filter(|flag| !supplied.contains(&flag.name()))
            .map(|flag| flag.name().to_string())
            .collect();
        if !flags.is_empty() {
            return Err(RunError::MissingFlags {
                path: self.path.clone(),
                names: flags,
            });
        }
        Ok(())
    }

    /// Interleaves flag parsing with positional collection, then assigns
    /// positionals by index.
    fn parse_args(&self, args: &[String]) -> Result<(), ParseError> {
        let mut positional: Vec<&String> = Vec::new();
        let mut rest = args;
        loop {
            let (tail, terminated) = self.flags.parse_prefix(rest)?;
            if terminated {
                positional.extend(tail);
                break;
            }
            let Some((token, tail)) = tail.split_first() else {
                break;
            };
            positional.push(token);
            rest = tail;
        }
        debug!(command = %self.path, count = positional.len(), "Collected positional arguments");

        let mut others = Vec::new();
        for (offset, token) in positional.into_iter().enumerate() {
            let index = offset + 1;
            match self.positionals.get(&index) {
                Some(slot) => slot
                    .value
                    .set_positional(token, slot.separator.as_deref())
                    .map_err(|source| ParseError::InvalidPositional {
                        index,
                        token: token.clone(),
                        source,
                    })?,
                None => others.push(token.clone()),
            }
        }
        self.other_args.set(others);
        Ok(())
    }

    // ---- metadata ----

    /// Metadata snapshot of this command and its descendants.
    pub fn info(&self) -> CommandInfo {
        self.describe(None)
    }

    pub(crate) fn describe(&self, default: Option<&str>) -> CommandInfo {
        CommandInfo {
            name: self.name.clone(),
            path: self.path.clone(),
            description: self.description.clone(),
            long_description: self.long_description.clone(),
            shortcut: self.shortcut.clone(),
            required: self.required,
            hidden: self.hidden,
            is_default: default == Some(self.path.as_str()),
            flag_count: self.flag_count,
            flags: self.flags.iter().map(flag_info).collect(),
            positionals: self
                .positionals
                .iter()
                .map(|(&index, slot)| PositionalInfo {
                    index,
                    field: slot.field.clone(),
                    kind: slot.value.kind(),
                    separator: slot.separator.clone(),
                })
                .collect(),
            subcommands: self
                .children
                .iter()
                .map(|child| child.describe(default))
                .collect(),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("path", &self.path)
            .field("flags", &self.flags)
            .field("positionals", &self.positionals.keys().collect::<Vec<_>>())
            .field("subcommands", &self.children)
            .field("has_action", &self.action.is_some())
            .finish_non_exhaustive()
    }
}

fn help_description(path: &str) -> String {
    format!("Get help on the '{}' command.", path.to_lowercase())
}

fn asks_for_help(args: &[String]) -> bool {
    args.iter()
        .map_while(|token| match classify(token) {
            Ok(Token::Terminator) => None,
            other => Some(other),
        })
        .any(|token| {
            matches!(token, Ok(Token::Flag { name: "help", value: None | Some("true") }))
        })
}

fn flag_info(flag: &Flag) -> FlagInfo {
    FlagInfo {
        name: flag.name().to_string(),
        kind: flag.kind(),
        description: flag.description().to_string(),
        default: (!flag.default_is_zero()).then(|| flag.default_value().to_string()),
        shortcut: flag.shortcut().map(str::to_string),
        required: flag.is_required(),
    }
}
