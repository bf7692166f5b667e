use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use cmdtree_core::*;

/// Cloneable in-memory sink for capturing help output.
#[derive(Clone, Default)]
struct Captured(Rc<RefCell<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn app() -> (Cli, Captured) {
    let mut cli = Cli::new("app", "Test application", "v1.0.0");
    let out = Captured::default();
    cli.set_output(out.clone());
    (cli, out)
}

fn counter() -> (Var<usize>, impl FnMut() -> ActionResult + 'static) {
    let calls = Var::new(0usize);
    let handle = calls.clone();
    (calls, move || {
        handle.update(|n| *n += 1);
        Ok(())
    })
}

#[test]
fn test_sub_flag_parsed_at_sub_not_root() {
    let (mut cli, _) = app();
    let root_mode = Var::new(String::from("root"));
    let sub_mode = Var::new(0i32);
    cli.string_flag("mode", "Root mode", &root_mode).unwrap();
    let (calls, action) = counter();
    cli.new_sub_command("sub", "Sub")
        .unwrap()
        .i32_flag("mode", "Sub mode", &sub_mode)
        .unwrap()
        .action(action);

    cli.run_args(["sub", "-mode", "123"]).unwrap();
    assert_eq!(sub_mode.get(), 123);
    assert_eq!(root_mode.get(), "root");
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_root_default_command_does_not_recurse() {
    let (mut cli, out) = app();
    cli.default_command("").unwrap();

    cli.run_args(Vec::<String>::new()).unwrap();
    assert!(out.text().starts_with("app v1.0.0 - Test application\n\n"));
}

#[test]
fn test_default_command_runs_on_empty_args_only() {
    let (mut cli, out) = app();
    let (calls, action) = counter();
    cli.new_sub_command("foo", "Foo").unwrap().action(action);
    cli.default_command("foo").unwrap();

    cli.run_args(Vec::<String>::new()).unwrap();
    assert_eq!(calls.get(), 1);

    // Unbound positional at the root: no fallback, help is printed.
    cli.run_args(["stray"]).unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(cli.other_args(), vec!["stray"]);
    assert!(out.text().contains("   foo   Foo [default]"));
}

#[test]
fn test_command_shortcut_matches_full_name() {
    let (mut cli, _) = app();
    let (calls, action) = counter();
    cli.new_sub_command("namecommand", "Named").unwrap().action(action);
    cli.root_mut().command_shortcut("namecommand", "nc").unwrap();

    cli.run_args(["nc"]).unwrap();
    cli.run_args(["namecommand"]).unwrap();
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_flag_shortcut_with_inline_value() {
    let (mut cli, _) = app();
    let name = Var::new(String::new());
    cli.string_flag("name", "Your name", &name).unwrap();
    cli.root_mut().flag_shortcut("name", "n").unwrap();
    cli.action(|| Ok(()));

    cli.run_args(["-n", "Ada"]).unwrap();
    assert_eq!(name.get(), "Ada");
    cli.run_args(["--n=Grace"]).unwrap();
    assert_eq!(name.get(), "Grace");
}

#[derive(Debug, Default)]
struct Create {
    mode: String,
}

impl Flags for Create {
    fn fields() -> Vec<Field<Self>> {
        vec![Field::value("mode", |c: &mut Self| &mut c.mode)
            .description("Creation mode")
            .pos(1)]
    }
}

#[test]
fn test_create_by_position_and_by_flag() {
    for tokens in [vec!["create", "123"], vec!["create", "-mode", "123"]] {
        let (mut cli, _) = app();
        let seen = Var::new(String::new());
        let sink = seen.clone();
        cli.new_sub_command_function("create", "Create", move |c: &mut Create| {
            sink.set(c.mode.clone());
            Ok(())
        })
        .unwrap();

        cli.run_args(tokens).unwrap();
        assert_eq!(seen.get(), "123");
    }
}

#[derive(Debug, Default)]
struct Slices {
    tags: Vec<String>,
}

impl Flags for Slices {
    fn fields() -> Vec<Field<Self>> {
        vec![Field::value("tags", |s: &mut Self| &mut s.tags)
            .pos(1)
            .sep(",")
            .default("a,b,c")]
    }
}

#[test]
fn test_positional_slice_default_and_override() {
    let (mut cli, _) = app();
    let record = Var::new(Slices::default());
    cli.new_sub_command("tag", "Tag")
        .unwrap()
        .add_flags(&record)
        .unwrap()
        .action(|| Ok(()));

    cli.run_args(["tag"]).unwrap();
    assert_eq!(record.borrow().tags, vec!["a", "b", "c"]);

    cli.run_args(["tag", "x,y"]).unwrap();
    assert_eq!(record.borrow().tags, vec!["x", "y"]);

    // Flags append single elements and never split.
    cli.run_args(["tag", "-tags", "z,w"]).unwrap();
    assert_eq!(record.borrow().tags, vec!["x", "y", "z,w"]);
}

#[derive(Debug, Default)]
struct Files {
    files: Vec<String>,
}

impl Flags for Files {
    fn fields() -> Vec<Field<Self>> {
        vec![Field::value("files", |f: &mut Self| &mut f.files)
            .pos(1)
            .default("a")]
    }
}

#[test]
fn test_positional_slice_without_separator_replaces_default() {
    let (mut cli, _) = app();
    let seen = Var::new(Vec::new());
    let sink = seen.clone();
    cli.new_sub_command_function("open", "Open", move |f: &mut Files| {
        sink.set(f.files.clone());
        Ok(())
    })
    .unwrap();

    cli.run_args(["open"]).unwrap();
    assert_eq!(seen.get(), vec!["a"]);

    cli.run_args(["open", "x"]).unwrap();
    assert_eq!(seen.get(), vec!["x"]);
}

#[derive(Debug, Default, PartialEq)]
struct Server {
    host: String,
    port: u16,
    verbose: bool,
}

impl Flags for Server {
    fn fields() -> Vec<Field<Self>> {
        vec![
            Field::value("host", |s: &mut Self| &mut s.host),
            Field::value("port", |s: &mut Self| &mut s.port).default("8080"),
            Field::value("verbose", |s: &mut Self| &mut s.verbose),
        ]
    }

    fn defaults() -> Option<Self> {
        Some(Self {
            host: "localhost".to_string(),
            port: 1,
            verbose: true,
        })
    }
}

#[test]
fn test_defaults_factory_then_declared_defaults() {
    let (mut cli, _) = app();
    let seen = Var::new(None);
    let sink = seen.clone();
    cli.new_sub_command_function("serve", "Serve", move |s: &mut Server| {
        sink.set(Some((s.host.clone(), s.port, s.verbose)));
        Ok(())
    })
    .unwrap();

    cli.run_args(["serve"]).unwrap();
    assert_eq!(seen.get(), Some(("localhost".to_string(), 8080, true)));

    let info = cli.info();
    let serve = info.find_subcommand("serve").unwrap();
    assert_eq!(serve.find_flag("port").unwrap().default.as_deref(), Some("8080"));
    assert_eq!(
        serve.find_flag("host").unwrap().default.as_deref(),
        Some("\"localhost\"")
    );
}

#[test]
fn test_add_flags_on_root_applies_defaults() {
    let (mut cli, _) = app();
    let record = Var::new(Server::default());
    cli.add_flags(&record).unwrap();
    assert_eq!(
        *record.borrow(),
        Server {
            host: "localhost".to_string(),
            port: 8080,
            verbose: true
        }
    );
}

#[test]
fn test_other_args_skip_bound_positions() {
    let (mut cli, _) = app();
    let first = Var::new(String::new());
    let third = Var::new(0u8);
    let sub = cli.new_sub_command("copy", "Copy").unwrap();
    sub.positional(1, "first", &first, None)
        .unwrap()
        .positional(3, "third", &third, None)
        .unwrap()
        .action(|| Ok(()));
    let others = sub.other_args_var();

    cli.run_args(["copy", "a", "b", "7", "c"]).unwrap();
    assert_eq!(first.get(), "a");
    assert_eq!(third.get(), 7);
    assert_eq!(others.get(), vec!["b", "c"]);
    assert_eq!(cli.command("copy").unwrap().other_args(), vec!["b", "c"]);

    // Reset on the next dispatch.
    cli.run_args(["copy"]).unwrap();
    assert!(others.get().is_empty());
}

#[test]
fn test_parse_error_default_message() {
    let (mut cli, _) = app();
    cli.new_sub_command("sub", "").unwrap();

    let err = cli.run_args(["sub", "-bogus"]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error: flag provided but not defined: -bogus\nSee 'app sub --help' for usage"
    );
    assert!(matches!(
        err,
        RunError::Parse { source: ParseError::UnknownFlag(ref name), .. } if name == "bogus"
    ));
}

#[test]
fn test_out_of_range_float_flags_are_parse_errors() {
    let (mut cli, _) = app();
    let ratio = Var::new(1.0f32);
    let big = Var::new(1.0f64);
    cli.flag("ratio", "Ratio", &ratio).unwrap();
    cli.root_mut().f64_flag("big", "Big", &big).unwrap();
    let (calls, action) = counter();
    cli.action(action);

    let err = cli.run_args(["-ratio", "1e40"]).unwrap_err();
    assert!(matches!(
        err,
        RunError::Parse { source: ParseError::InvalidValue { ref flag, .. }, .. } if flag == "ratio"
    ));
    assert!(cli.run_args(["-big", "1e400"]).is_err());
    assert_eq!(ratio.get(), 1.0);
    assert_eq!(big.get(), 1.0);
    assert_eq!(calls.get(), 0);

    cli.run_args(["-ratio", "-inf", "-big", "1e300"]).unwrap();
    assert!(ratio.get().is_infinite());
    assert_eq!(big.get(), 1e300);
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_error_hook_rewrites_message() {
    let (mut cli, _) = app();
    let count = Var::new(3u8);
    cli.new_sub_command("sub", "")
        .unwrap()
        .u8_flag("count", "", &count)
        .unwrap();
    cli.set_error_function(|path, err| format!("[{path}] {err}"));

    let err = cli.run_args(["sub", "-count", "300"]).unwrap_err();
    assert!(err.to_string().starts_with("[app sub] invalid value \"300\" for flag -count"));
    assert_eq!(count.get(), 3);
}

#[test]
fn test_required_flag_missing_prints_help_and_errors() {
    let (mut cli, out) = app();
    let force = Var::new(false);
    let (calls, action) = counter();
    cli.new_sub_command("add", "Add")
        .unwrap()
        .bool_flag("force", "Force it", &force)
        .unwrap()
        .flag_required("force")
        .unwrap()
        .action(action);

    let err = cli.run_args(["add"]).unwrap_err();
    assert!(matches!(err, RunError::MissingFlags { ref names, .. } if names == &["force"]));
    assert!(out.text().contains("app add - Add"));
    assert!(out.text().contains("Force it (required)"));
    assert_eq!(calls.get(), 0);

    cli.run_args(["add", "-force"]).unwrap();
    assert_eq!(calls.get(), 1);
    assert!(force.get());
}

#[test]
fn test_help_bypasses_required_flags() {
    let (mut cli, out) = app();
    cli.new_sub_command("add", "Add")
        .unwrap()
        .bool_flag("force", "", &Var::new(false))
        .unwrap()
        .flag_required("force")
        .unwrap();

    cli.run_args(["add", "-help"]).unwrap();
    assert!(out.text().contains("Get help on the 'app add' command."));
}

#[test]
fn test_required_command_missing() {
    let (mut cli, _) = app();
    let remote = cli.new_sub_command("remote", "Remotes").unwrap();
    remote.new_sub_command("add", "Add remote").unwrap();
    remote.command_required("add").unwrap();

    let err = cli.run_args(["remote"]).unwrap_err();
    assert_eq!(err.to_string(), "missing required command for 'app remote': add");
    assert!(cli.run_args(["remote", "add"]).is_ok());
}

#[test]
fn test_required_command_after_flags_is_not_selected() {
    let (mut cli, _) = app();
    let (add_calls, add_action) = counter();
    let (all_calls, all_action) = counter();
    let add = cli.new_sub_command("add", "Add").unwrap();
    add.bool_flag("force", "", &Var::new(false))
        .unwrap()
        .action(add_action);
    add.new_sub_command("all", "Add everything")
        .unwrap()
        .action(all_action);
    add.command_required("all").unwrap();

    let err = cli.run_args(["add", "-force", "all"]).unwrap_err();
    assert!(matches!(
        err,
        RunError::MissingCommand { ref names, .. } if names == &["all"]
    ));
    assert_eq!(add_calls.get(), 0);
    assert_eq!(all_calls.get(), 0);

    cli.run_args(["add", "all"]).unwrap();
    assert_eq!(all_calls.get(), 1);
}

#[test]
fn test_help_flag_takes_precedence_over_action() {
    let (mut cli, out) = app();
    let (calls, action) = counter();
    cli.new_sub_command("run", "Run it").unwrap().action(action);

    cli.run_args(["run", "--help"]).unwrap();
    assert_eq!(calls.get(), 0);
    assert!(out.text().contains("app run - Run it"));

    // The help flag is reset between dispatches.
    out.clear();
    cli.run_args(["run"]).unwrap();
    assert_eq!(calls.get(), 1);
    assert!(out.text().is_empty());
}

#[test]
fn test_inherited_flags_fill_parent_variable() {
    let (mut cli, _) = app();
    let verbose = Var::new(false);
    cli.bool_flag("verbose", "", &verbose).unwrap();
    cli.new_sub_command_inherit_flags("child", "")
        .unwrap()
        .action(|| Ok(()));

    cli.run_args(["child", "-verbose"]).unwrap();
    assert!(verbose.get());
}

#[test]
fn test_hidden_command_dispatches_but_is_not_listed() {
    let (mut cli, out) = app();
    let (calls, action) = counter();
    cli.new_sub_command("secret", "Shh").unwrap().hide().action(action);
    cli.new_sub_command("open", "Visible").unwrap();

    cli.run_args(["secret"]).unwrap();
    assert_eq!(calls.get(), 1);

    cli.print_help().unwrap();
    let text = out.text();
    assert!(text.contains("open"));
    assert!(!text.contains("secret"));
}

#[test]
fn test_action_error_is_forwarded() {
    let (mut cli, _) = app();
    cli.new_sub_command("fail", "")
        .unwrap()
        .action(|| Err(anyhow::anyhow!("disk full")));

    let err = cli.run_args(["fail"]).unwrap_err();
    assert!(matches!(err, RunError::Action(_)));
    assert_eq!(err.to_string(), "disk full");
}

#[test]
fn test_info_json_and_validate() {
    let (mut cli, _) = app();
    cli.long_description("Longer words.");
    cli.new_sub_command("foo", "Foo").unwrap();
    cli.default_command("foo").unwrap();
    assert!(cli.validate().is_empty());

    let json: serde_json::Value = serde_json::from_str(&cli.info_json().unwrap()).unwrap();
    assert_eq!(json["name"], "app");
    assert_eq!(json["long_description"], "Longer words.");
    assert_eq!(json["subcommands"][0]["path"], "app foo");
    assert_eq!(json["subcommands"][0]["is_default"], true);
}

#[test]
fn test_custom_banner() {
    let (mut cli, out) = app();
    cli.set_banner_function(|cli| format!("** {} **", cli.name().to_uppercase()));
    cli.print_banner().unwrap();
    assert_eq!(out.text(), "** APP **\n\n");
    assert!(cli.help_text("").unwrap().starts_with("** APP **"));
}
