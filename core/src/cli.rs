//! The application object.
//!
//! [`Cli`] owns the root [`Command`] and the application-wide settings that
//! dispatch consults: the default command, the banner, the parse-error hook,
//! the pre-run hook and the sink help text is written to.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};

use tracing::debug;

use crate::command::Command;
use crate::error::{ActionResult, ConfigError, ParseError, RunError};
use crate::field::Flags;
use crate::help::render_help;
use crate::info::CommandInfo;
use crate::kind::Bindable;
use crate::validate::validate_tree;
use crate::var::Var;

type BannerFn = Box<dyn Fn(&Cli) -> String>;
type ErrorFn = Box<dyn Fn(&str, &ParseError) -> String>;
type PreRunFn = Box<dyn Fn(&Cli) -> ActionResult>;

/// A command-line application: a root command plus global settings.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{Cli, Var};
///
/// let mut cli = Cli::new("greet", "Says hello", "v1.0.0");
/// let name = Var::new(String::from("world"));
/// cli.string_flag("name", "Who to greet", &name).unwrap();
///
/// let seen = name.clone();
/// cli.action(move || {
///     assert_eq!(seen.get(), "Ferris");
///     Ok(())
/// });
///
/// cli.run_args(["-name", "Ferris"]).unwrap();
/// ```
pub struct Cli {
    version: String,
    root: Command,
    default_command: Option<String>,
    banner: BannerFn,
    error_handler: Option<ErrorFn>,
    pre_run: Option<PreRunFn>,
    output: RefCell<Box<dyn Write>>,
}

impl Cli {
    pub fn new(name: &str, description: &str, version: &str) -> Self {
        Self {
            version: version.to_string(),
            root: Command::new(name, description),
            default_command: None,
            banner: Box::new(default_banner),
            error_handler: None,
            pre_run: None,
            output: RefCell::new(Box::new(io::stdout())),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn name(&self) -> &str {
        self.root.name()
    }

    pub fn short_description(&self) -> &str {
        self.root.description()
    }

    pub fn long_description(&mut self, text: &str) -> &mut Self {
        self.root.set_long_description(text);
        self
    }

    pub fn root(&self) -> &Command {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Command {
        &mut self.root
    }

    /// Looks up a command by its path below the root. An empty path is the
    /// root itself.
    pub fn command(&self, path: &str) -> Option<&Command> {
        self.root.command(path)
    }

    pub fn command_mut(&mut self, path: &str) -> Option<&mut Command> {
        self.root.command_mut(path)
    }

    // ---- settings ----

    /// Replaces the banner printed above every help page.
    pub fn set_banner_function<F>(&mut self, banner: F) -> &mut Self
    where
        F: Fn(&Cli) -> String + 'static,
    {
        self.banner = Box::new(banner);
        self
    }

    /// Installs a hook that formats flag-parse errors.
    ///
    /// It receives the path of the failing command and the raw error; its
    /// return value becomes the message of the [`RunError::Parse`].
    pub fn set_error_function<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&str, &ParseError) -> String + 'static,
    {
        self.error_handler = Some(Box::new(handler));
        self
    }

    /// Runs `hook` before every dispatch. An error aborts the dispatch.
    pub fn pre_run<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Cli) -> ActionResult + 'static,
    {
        self.pre_run = Some(Box::new(hook));
        self
    }

    /// Sends help and banner output to `output` instead of stdout.
    pub fn set_output<W: Write + 'static>(&mut self, output: W) -> &mut Self {
        self.output = RefCell::new(Box::new(output));
        self
    }

    /// Selects the command run when no arguments are given. `path` is
    /// relative to the root; an empty path selects the root itself.
    pub fn default_command(&mut self, path: &str) -> Result<&mut Self, ConfigError> {
        let command = self
            .root
            .command(path)
            .ok_or_else(|| ConfigError::UnknownCommand(path.to_string()))?;
        self.default_command = Some(command.path().to_string());
        Ok(self)
    }

    pub(crate) fn default_node(&self) -> Option<&Command> {
        let path = self.default_command.as_deref()?;
        let relative = path.strip_prefix(self.root.path())?;
        self.root.command(relative)
    }

    // ---- root delegation ----

    pub fn add_command(&mut self, command: Command) -> Result<&mut Command, ConfigError> {
        self.root.add_command(command)
    }

    pub fn new_sub_command(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<&mut Command, ConfigError> {
        self.root.new_sub_command(name, description)
    }

    pub fn new_sub_command_inherit_flags(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<&mut Command, ConfigError> {
        self.root.new_sub_command_inherit_flags(name, description)
    }

    pub fn new_sub_command_function<R, F>(
        &mut self,
        name: &str,
        description: &str,
        function: F,
    ) -> Result<&mut Command, ConfigError>
    where
        R: Flags + Default,
        F: FnMut(&mut R) -> ActionResult + 'static,
    {
        self.root.new_sub_command_function(name, description, function)
    }

    pub fn add_flags<R: Flags>(&mut self, record: &Var<R>) -> Result<&mut Self, ConfigError> {
        self.root.add_flags(record)?;
        Ok(self)
    }

    pub fn action<F>(&mut self, action: F) -> &mut Self
    where
        F: FnMut() -> ActionResult + 'static,
    {
        self.root.action(action);
        self
    }

    /// Registers a root flag of any bindable kind. Only the bool and string
    /// shorthands are mirrored here; the other typed constructors are
    /// reached through [`root_mut`](Self::root_mut).
    pub fn flag<T: Bindable>(
        &mut self,
        name: &str,
        description: &str,
        variable: &Var<T>,
    ) -> Result<&mut Self, ConfigError> {
        self.root.flag(name, description, variable)?;
        Ok(self)
    }

    pub fn bool_flag(
        &mut self,
        name: &str,
        description: &str,
        variable: &Var<bool>,
    ) -> Result<&mut Self, ConfigError> {
        self.flag(name, description, variable)
    }

    pub fn string_flag(
        &mut self,
        name: &str,
        description: &str,
        variable: &Var<String>,
    ) -> Result<&mut Self, ConfigError> {
        self.flag(name, description, variable)
    }

    /// Positional tokens from the last dispatch that the root did not bind.
    pub fn other_args(&self) -> Vec<String> {
        self.root.other_args()
    }

    // ---- output ----

    /// Banner text as produced by the banner function.
    pub fn banner(&self) -> String {
        (self.banner)(self)
    }

    pub fn print_banner(&self) -> io::Result<()> {
        let banner = self.banner();
        let mut output = self.output.borrow_mut();
        writeln!(output, "{banner}")?;
        writeln!(output)
    }

    /// Prints the root command's help page.
    pub fn print_help(&self) -> io::Result<()> {
        self.write_page(&self.root)
    }

    /// Help page text for the command at `path`, as it would be printed.
    pub fn help_text(&self, path: &str) -> Option<String> {
        let command = self.root.command(path)?;
        Some(render_help(
            &command.describe(self.default_command.as_deref()),
            &self.banner(),
        ))
    }

    fn write_page(&self, command: &Command) -> io::Result<()> {
        let text = render_help(
            &command.describe(self.default_command.as_deref()),
            &self.banner(),
        );
        let mut output = self.output.borrow_mut();
        output.write_all(text.as_bytes())?;
        output.flush()
    }

    pub(crate) fn write_help(&self, command: &Command) -> Result<(), RunError> {
        self.write_page(command)?;
        Ok(())
    }

    pub(crate) fn parse_error(&self, path: &str, source: ParseError) -> RunError {
        let message = match &self.error_handler {
            Some(handler) => handler(path, &source),
            None => format!("Error: {source}\nSee '{path} --help' for usage"),
        };
        RunError::Parse {
            path: path.to_string(),
            message,
            source,
        }
    }

    // ---- metadata ----

    /// Metadata snapshot of the whole tree, with the default command marked.
    pub fn info(&self) -> CommandInfo {
        self.root.describe(self.default_command.as_deref())
    }

    pub fn info_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.info())
    }

    /// Structural checks over the finished tree.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = validate_tree(&self.info());
        if let Some(path) = &self.default_command {
            if self.default_node().is_none() {
                errors.push(ConfigError::UnknownCommand(path.clone()));
            }
        }
        errors
    }

    // ---- dispatch ----

    /// Dispatches the process arguments, without the program name.
    pub fn run(&self) -> Result<(), RunError> {
        self.run_args(std::env::args().skip(1))
    }

    /// Dispatches an explicit argument list. An empty list means no
    /// arguments were given.
    pub fn run_args<I, S>(&self, args: I) -> Result<(), RunError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(hook) = &self.pre_run {
            hook(self).map_err(RunError::PreRun)?;
        }
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        debug!(app = %self.name(), args = ?args, "Dispatching");
        self.root.run(self, args)
    }
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("version", &self.version)
            .field("default_command", &self.default_command)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

fn default_banner(cli: &Cli) -> String {
    format!(
        "{} {} - {}",
        cli.name(),
        cli.version(),
        cli.short_description()
    )
}
