use std::path::PathBuf;

use cmdforge::DialectKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Render,
    Init,
    Dialects,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Render(RenderArgs),
    Init(InitArgs),
    Dialects,
}

#[derive(Debug, Clone)]
pub struct RenderArgs {
    pub file: PathBuf,
    /// Overrides `dialect` in the command file.
    pub dialect: Option<DialectKind>,
    /// Forces identifier quoting on top of the file's `quote` setting.
    pub quote: bool,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct InitArgs {
    pub file: PathBuf,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    match first.as_str() {
        "-h" | "--help" => Ok(Command::Help(HelpTopic::Root)),
        "help" => parse_help(it.map(|s| s.as_str())),
        "render" => parse_render(it.map(|s| s.as_str())),
        "init" => parse_init(it.map(|s| s.as_str())),
        "dialects" => parse_dialects(it.map(|s| s.as_str())),
        _ => anyhow::bail!("unknown command: {first}"),
    }
}

fn parse_help<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let topic = match it.next() {
        None => HelpTopic::Root,
        Some("render") => HelpTopic::Render,
        Some("init") => HelpTopic::Init,
        Some("dialects") => HelpTopic::Dialects,
        Some(other) => anyhow::bail!("unknown help topic: {other}"),
    };
    Ok(Command::Help(topic))
}

fn parse_dialect(v: &str) -> anyhow::Result<DialectKind> {
    v.parse::<DialectKind>()
        .map_err(|e| anyhow::anyhow!("invalid --dialect: {e}"))
}

fn parse_render<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut file: Option<PathBuf> = None;
    let mut dialect: Option<DialectKind> = None;
    let mut quote = false;
    let mut json = false;

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Render)),
            "--dialect" | "-d" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--dialect requires a value");
                };
                dialect = Some(parse_dialect(v)?);
            }
            _ if token.starts_with("--dialect=") => {
                dialect = Some(parse_dialect(token.trim_start_matches("--dialect="))?);
            }
            "--quote" => quote = true,
            "--json" => json = true,
            other if other.starts_with('-') => anyhow::bail!("unknown argument: {other}"),
            other => {
                if file.is_some() {
                    anyhow::bail!("unexpected extra argument: {other}");
                }
                file = Some(PathBuf::from(other));
            }
        }
    }

    let Some(file) = file else {
        anyhow::bail!("render requires a command file");
    };

    Ok(Command::Render(RenderArgs {
        file,
        dialect,
        quote,
        json,
    }))
}

fn parse_init<'a>(it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut file = PathBuf::from("command.toml");
    let mut seen_file = false;

    for token in it {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Init)),
            other if other.starts_with('-') => anyhow::bail!("unknown argument: {other}"),
            other => {
                if seen_file {
                    anyhow::bail!("unexpected extra argument: {other}");
                }
                file = PathBuf::from(other);
                seen_file = true;
            }
        }
    }

    Ok(Command::Init(InitArgs { file }))
}

fn parse_dialects<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    match it.next() {
        None => Ok(Command::Dialects),
        Some("-h" | "--help") => Ok(Command::Help(HelpTopic::Dialects)),
        Some(other) => anyhow::bail!("unknown argument: {other}"),
    }
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
cmdforge - render data-access commands for SQL, document and search backends

USAGE:
  cmdforge <COMMAND> [OPTIONS]

COMMANDS:
  render <FILE>         Render a TOML command file
  init [FILE]           Write a template command file
  dialects              List built-in dialects and their capabilities
  help [COMMAND]        Print help

ENVIRONMENT:
  CMDFORGE_LOG          Log filter (default: warn), e.g. cmdforge=debug

Run `cmdforge help <command>` for more."
            );
        }
        HelpTopic::Render => {
            println!(
                "\
USAGE:
  cmdforge render <FILE> [OPTIONS]

OPTIONS:
  -d, --dialect <NAME>  Dialect to render for (overrides the file)
  --quote               Quote every identifier
  --json                Print {{\"sql\": ..., \"args\": [...]}} instead of text
  -h, --help            Print help"
            );
        }
        HelpTopic::Init => {
            println!(
                "\
USAGE:
  cmdforge init [FILE]

Writes a commented command file template (default: command.toml).
Refuses to overwrite an existing file.

OPTIONS:
  -h, --help            Print help"
            );
        }
        HelpTopic::Dialects => {
            println!(
                "\
USAGE:
  cmdforge dialects

Prints the built-in dialects with their quoting, alias, null-ordering,
insert-conflict and pagination capabilities."
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_args_prints_root_help() {
        let cmd = parse_args(&args(&["cmdforge"])).unwrap();
        assert!(matches!(cmd, Command::Help(HelpTopic::Root)));
    }

    #[test]
    fn parse_render_with_options() {
        let cmd = parse_args(&args(&[
            "cmdforge",
            "render",
            "q.toml",
            "--dialect",
            "postgresql",
            "--quote",
            "--json",
        ]))
        .unwrap();
        let Command::Render(r) = cmd else {
            panic!("expected render");
        };
        assert_eq!(r.file, PathBuf::from("q.toml"));
        assert_eq!(r.dialect, Some(DialectKind::Postgres));
        assert!(r.quote);
        assert!(r.json);
    }

    #[test]
    fn parse_render_dialect_equals_form() {
        let cmd = parse_args(&args(&["cmdforge", "render", "--dialect=mongo", "q.toml"])).unwrap();
        let Command::Render(r) = cmd else {
            panic!("expected render");
        };
        assert_eq!(r.dialect, Some(DialectKind::Mongo));
        assert!(!r.quote);
    }

    #[test]
    fn parse_render_errors() {
        assert!(parse_args(&args(&["cmdforge", "render"])).is_err());
        assert!(parse_args(&args(&["cmdforge", "render", "a.toml", "b.toml"])).is_err());
        assert!(parse_args(&args(&["cmdforge", "render", "a.toml", "--dialect", "db2"])).is_err());
        assert!(parse_args(&args(&["cmdforge", "render", "a.toml", "--dialect"])).is_err());
    }

    #[test]
    fn parse_init_default_file() {
        let cmd = parse_args(&args(&["cmdforge", "init"])).unwrap();
        let Command::Init(i) = cmd else {
            panic!("expected init");
        };
        assert_eq!(i.file, PathBuf::from("command.toml"));
    }

    #[test]
    fn parse_help_topics() {
        let cmd = parse_args(&args(&["cmdforge", "help", "render"])).unwrap();
        assert!(matches!(cmd, Command::Help(HelpTopic::Render)));
        let cmd = parse_args(&args(&["cmdforge", "dialects", "--help"])).unwrap();
        assert!(matches!(cmd, Command::Help(HelpTopic::Dialects)));
        assert!(parse_args(&args(&["cmdforge", "frobnicate"])).is_err());
    }
}
