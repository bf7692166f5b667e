use anyhow::anyhow;
use cmdtree_core::{Cli, ConfigError, Field, Flags, Var};
use tracing::debug;

/// Flags for `foo`.
#[derive(Debug, Default)]
struct FooFlags {
    bar: i64,
    loud: bool,
}

impl Flags for FooFlags {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::value("bar", |f: &mut Self| &mut f.bar)
                .description("How many bars")
                .default("1"),
            Field::value("loud", |f: &mut Self| &mut f.loud).description("Shout the result"),
        ]
    }
}

/// Output settings shared by commands that write files.
#[derive(Debug, Default)]
struct Output {
    dir: String,
    overwrite: bool,
}

impl Flags for Output {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::value("dir", |o: &mut Self| &mut o.dir)
                .description("Output directory")
                .default("out"),
            Field::value("overwrite", |o: &mut Self| &mut o.overwrite)
                .description("Replace existing files"),
        ]
    }
}

/// Arguments for `create`: `create [mode] [files,...]`.
#[derive(Debug, Default)]
struct Create {
    mode: String,
    files: Vec<String>,
    retries: u8,
    output: Output,
}

impl Flags for Create {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::value("mode", |c: &mut Self| &mut c.mode)
                .description("Creation mode")
                .pos(1),
            Field::value("files", |c: &mut Self| &mut c.files)
                .description("Files to create")
                .pos(2)
                .sep(","),
            Field::value("retries", |c: &mut Self| &mut c.retries)
                .description("Attempts before giving up")
                .default("3"),
            Field::nested("output", |c: &mut Self| &mut c.output),
        ]
    }

    fn defaults() -> Option<Self> {
        Some(Self {
            mode: "fast".to_string(),
            files: vec!["main.txt".to_string()],
            ..Self::default()
        })
    }
}

fn build_cli() -> Result<Cli, ConfigError> {
    let mut cli = Cli::new("cmdtree-demo", "A demo of nested commands", env!("CARGO_PKG_VERSION"));
    cli.long_description("Try `cmdtree-demo create slow a.txt,b.txt` or `cmdtree-demo -help`.");

    let name = Var::new(String::from("world"));
    cli.string_flag("name", "Who the demo is for", &name)?;
    cli.root_mut().flag_shortcut("name", "n")?;

    let foo = Var::new(FooFlags::default());
    let greeting = name.clone();
    let flags = foo.clone();
    cli.new_sub_command_inherit_flags("foo", "Prints some bars")?
        .add_flags(&foo)?
        .action(move || {
            let flags = flags.borrow();
            let bars = "bar ".repeat(usize::try_from(flags.bar).unwrap_or(0));
            let mut line = format!("hello {}: {bars}", greeting.get());
            if flags.loud {
                line = line.to_uppercase();
            }
            println!("{}", line.trim_end());
            Ok(())
        });

    cli.new_sub_command_function("create", "Creates files", |create: &mut Create| {
        println!(
            "mode={} files={:?} retries={} dir={} overwrite={}",
            create.mode, create.files, create.retries, create.output.dir, create.output.overwrite
        );
        Ok(())
    })?;

    let force = Var::new(false);
    let wildcard = Var::new(String::new());
    let add = cli.new_sub_command("add", "Adds paths (requires -force)")?;
    add.bool_flag("force", "Really add", &force)?
        .flag_required("force")?
        .flag_shortcut("force", "f")?
        .string_flag("wildcard", "Only add matching paths", &wildcard)?;
    let paths = add.other_args_var();
    add.action(move || {
        let pattern = wildcard.get();
        for path in paths.borrow().iter() {
            if pattern.is_empty() || path.contains(pattern.as_str()) {
                println!("added {path}");
            }
        }
        Ok(())
    });

    cli.new_sub_command("namecommand", "Prints its own name")?
        .action(|| {
            println!("namecommand");
            Ok(())
        });
    cli.root_mut().command_shortcut("namecommand", "nc")?;

    cli.new_sub_command("secret", "Not listed in help")?
        .hide()
        .action(|| {
            println!("you found it");
            Ok(())
        });

    cli.new_sub_command("schema", "Prints the command tree as JSON")?;

    cli.default_command("foo")?;
    cli.set_error_function(|path, err| format!("{path}: {err}\nRun '{path} -help' for usage."));
    cli.pre_run(|cli| {
        debug!(app = cli.name(), version = cli.version(), "Starting");
        Ok(())
    });

    Ok(cli)
}

fn run() -> anyhow::Result<()> {
    let mut cli = build_cli().map_err(|err| anyhow!("invalid command tree: {err}"))?;
    if let Some(err) = cli.validate().into_iter().next() {
        return Err(anyhow!("invalid command tree: {err}"));
    }

    let schema = cli.info_json()?;
    if let Some(command) = cli.command_mut("schema") {
        command.action(move || {
            println!("{schema}");
            Ok(())
        });
    }

    cli.run()?;
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
