//! # CodeSpark
//!
//! Command-line front end for CodeSpark projects. Project files are kept in
//! an on-disk store under the data directory; the project in use is
//! remembered between invocations.
//!
//! ## Usage
//!
//! ```bash
//! # Create a project and start using it
//! codespark create "Todo API" --language javascript
//! codespark use "Todo API"
//!
//! # Build and edit its tree
//! codespark new src --dir
//! codespark new src/index.js
//! echo "console.log('hi');" | codespark write src/index.js
//! codespark tree --search index
//!
//! # Run with debug logging
//! codespark --debug projects
//! ```

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use codespark_core::Config;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

mod app;

use app::{Action, Cli};

/// Command line arguments for CodeSpark
#[derive(Debug, Clone, PartialEq)]
pub struct AppArgs {
    /// Enable debug logging
    pub debug: bool,
    /// Configuration file overriding the default location
    pub config: Option<PathBuf>,
    /// Data directory overriding the configured one
    pub data_dir: Option<PathBuf>,
    /// What to do
    pub action: Action,
}

/// Build the command line interface.
fn cli() -> Command {
    let project = || {
        Arg::new("project")
            .required(true)
            .value_name("PROJECT")
            .help("Project id or name")
    };
    let path = || {
        Arg::new("path")
            .required(true)
            .value_name("PATH")
            .help("Path inside the project, e.g. src/main.js")
    };

    Command::new("codespark")
        .version(env!("CARGO_PKG_VERSION"))
        .author("CodeSpark Team")
        .about("AI-assisted multi-project code workspace")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .global(true)
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .value_name("FILE")
                .help("Configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .global(true)
                .value_name("DIR")
                .help("Directory holding project files")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .subcommand(
            Command::new("projects")
                .about("List projects, most recently updated first")
                .arg(Arg::new("search").short('s').long("search").value_name("TERM"))
                .arg(Arg::new("language").short('l').long("language").value_name("LANG")),
        )
        .subcommand(
            Command::new("create")
                .about("Create a project")
                .arg(Arg::new("name").required(true).value_name("NAME"))
                .arg(Arg::new("description").long("description").value_name("TEXT"))
                .arg(Arg::new("language").short('l').long("language").value_name("LANG"))
                .arg(Arg::new("public").long("public").action(ArgAction::SetTrue))
                .arg(Arg::new("repository").long("repository").value_name("URL")),
        )
        .subcommand(
            Command::new("update")
                .about("Change project metadata")
                .arg(project())
                .arg(Arg::new("name").long("name").value_name("NAME"))
                .arg(Arg::new("description").long("description").value_name("TEXT"))
                .arg(Arg::new("language").short('l').long("language").value_name("LANG"))
                .arg(Arg::new("public").long("public").action(ArgAction::SetTrue))
                .arg(
                    Arg::new("private")
                        .long("private")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("public"),
                )
                .arg(Arg::new("repository").long("repository").value_name("URL"))
                .arg(
                    Arg::new("no-repository")
                        .long("no-repository")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("repository"),
                ),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a project and all its files")
                .arg(project()),
        )
        .subcommand(
            Command::new("use")
                .about("Select the project later commands work on")
                .arg(project()),
        )
        .subcommand(
            Command::new("tree")
                .about("Show the file tree of the project in use")
                .arg(Arg::new("search").short('s').long("search").value_name("TERM")),
        )
        .subcommand(
            Command::new("new")
                .about("Create a file, or a directory with --dir")
                .arg(path())
                .arg(Arg::new("dir").long("dir").action(ArgAction::SetTrue)),
        )
        .subcommand(Command::new("rm").about("Remove a file or directory").arg(path()))
        .subcommand(
            Command::new("mv")
                .about("Rename a file or directory in place")
                .arg(path())
                .arg(Arg::new("name").required(true).value_name("NEW_NAME")),
        )
        .subcommand(Command::new("cat").about("Print a file").arg(path()))
        .subcommand(
            Command::new("write")
                .about("Replace a file's content (from --content or stdin)")
                .arg(path())
                .arg(Arg::new("content").long("content").value_name("TEXT")),
        )
}

fn string(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.get_one::<String>(id).cloned()
}

fn required(matches: &ArgMatches, id: &str) -> String {
    string(matches, id).unwrap_or_default()
}

/// Turn parsed matches into [`AppArgs`].
///
/// The flag is set when `write` came without `--content`; the caller then
/// fills the content from stdin.
fn parse_matches(matches: &ArgMatches) -> anyhow::Result<(AppArgs, bool)> {
    let mut needs_stdin = false;
    let action = match matches.subcommand() {
        Some(("projects", m)) => Action::Projects {
            search: string(m, "search"),
            language: string(m, "language"),
        },
        Some(("create", m)) => Action::Create {
            name: required(m, "name"),
            description: string(m, "description"),
            language: string(m, "language"),
            public: m.get_flag("public"),
            repository: string(m, "repository"),
        },
        Some(("update", m)) => Action::Update {
            project: required(m, "project"),
            name: string(m, "name"),
            description: string(m, "description"),
            language: string(m, "language"),
            public: match (m.get_flag("public"), m.get_flag("private")) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
            repository: if m.get_flag("no-repository") {
                Some(None)
            } else {
                string(m, "repository").map(Some)
            },
        },
        Some(("delete", m)) => Action::Delete {
            project: required(m, "project"),
        },
        Some(("use", m)) => Action::Use {
            project: required(m, "project"),
        },
        Some(("tree", m)) => Action::Tree {
            search: string(m, "search"),
        },
        Some(("new", m)) => Action::New {
            path: required(m, "path"),
            directory: m.get_flag("dir"),
        },
        Some(("rm", m)) => Action::Remove {
            path: required(m, "path"),
        },
        Some(("mv", m)) => Action::Move {
            path: required(m, "path"),
            name: required(m, "name"),
        },
        Some(("cat", m)) => Action::Cat {
            path: required(m, "path"),
        },
        Some(("write", m)) => {
            let content = string(m, "content");
            needs_stdin = content.is_none();
            Action::Write {
                path: required(m, "path"),
                content: content.unwrap_or_default(),
            }
        }
        Some((other, _)) => anyhow::bail!("unknown command '{}'", other),
        None => anyhow::bail!("a command is required"),
    };

    Ok((
        AppArgs {
            debug: matches.get_flag("debug"),
            config: matches.get_one::<PathBuf>("config").cloned(),
            data_dir: matches.get_one::<PathBuf>("data-dir").cloned(),
            action,
        },
        needs_stdin,
    ))
}

/// Initialize logging: `--debug` wins over the configured level.
fn init_logging(debug: bool, configured: &str) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        configured.parse().unwrap_or(tracing::Level::WARN)
    };
    let installed = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
    if installed.is_err() {
        codespark_core::init_tracing();
    }
}

fn load_config(args: &AppArgs) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("failed to load configuration from {:?}", path))?,
        None => Config::load_or_default()?,
    };
    if let Some(dir) = &args.data_dir {
        config.app.data_directory = Some(dir.clone());
    }
    Ok(config)
}

fn session_path(config: &Config) -> anyhow::Result<PathBuf> {
    Ok(config.data_directory()?.join("session.json"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (mut args, needs_stdin) = parse_matches(&cli().get_matches())?;
    let config = load_config(&args)?;
    init_logging(args.debug, &config.app.log_level);

    tracing::debug!("Starting CodeSpark v{}", env!("CARGO_PKG_VERSION"));

    if needs_stdin {
        if let Action::Write { content, .. } = &mut args.action {
            tokio::io::stdin()
                .read_to_string(content)
                .await
                .context("failed to read content from stdin")?;
        }
    }

    let data_dir = config.data_directory()?;
    let session_path = session_path(&config)?;

    let mut cli = Cli::open(config, data_dir, session_path).await?;
    let mut stdout = std::io::stdout();
    let outcome = cli.run(args.action, &mut stdout).await;
    cli.close().await?;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> (AppArgs, bool) {
        let matches = cli().try_get_matches_from(argv).unwrap();
        parse_matches(&matches).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn test_parse_create() {
        let (args, stdin) = parse(&[
            "codespark", "--debug", "create", "Todo API", "-l", "typescript", "--public",
        ]);
        assert!(args.debug);
        assert!(!stdin);
        assert_eq!(
            args.action,
            Action::Create {
                name: "Todo API".to_string(),
                description: None,
                language: Some("typescript".to_string()),
                public: true,
                repository: None,
            }
        );
    }

    #[test]
    fn test_parse_update_flags() {
        let (args, _) = parse(&["codespark", "update", "demo", "--private", "--no-repository"]);
        match args.action {
            Action::Update {
                public, repository, ..
            } => {
                assert_eq!(public, Some(false));
                assert_eq!(repository, Some(None));
            }
            other => panic!("unexpected action {:?}", other),
        }
        assert!(cli()
            .try_get_matches_from(["codespark", "update", "demo", "--public", "--private"])
            .is_err());
    }

    #[test]
    fn test_write_without_content_reads_stdin() {
        let (args, stdin) = parse(&["codespark", "write", "src/a.js", "--data-dir", "/tmp/x"]);
        assert!(stdin);
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/x")));

        let (_, stdin) = parse(&["codespark", "write", "src/a.js", "--content", "x"]);
        assert!(!stdin);
    }

    #[test]
    fn test_missing_command_is_rejected() {
        assert!(cli().try_get_matches_from(["codespark"]).is_err());
    }
}
