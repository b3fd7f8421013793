// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ludo_config::{LauncherConfig, load_config, validate_config};
use ludo_store::RunnerKind;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ludo", version, about = "Ludo game launcher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Library file (JSON). Overrides the configured path.
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List games in the library.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Add a game and print its id.
    Add {
        /// Display title.
        #[arg(long)]
        title: String,

        /// Executable path or URL.
        #[arg(long, default_value = "")]
        target: String,

        /// Launch options, shell-quoted.
        #[arg(long = "args", default_value = "", allow_hyphen_values = true)]
        args: String,

        /// Working directory.
        #[arg(long, default_value = "")]
        cwd: String,

        /// Force a runner instead of choosing from the target.
        #[arg(long, value_enum)]
        runner: Option<RunnerArg>,
    },

    /// Remove a game.
    Remove {
        /// Game id.
        id: String,
    },

    /// Play a game and follow it until it exits.
    Play {
        /// Game id.
        id: String,

        /// Launch without tracking (cannot be stopped).
        #[arg(long)]
        detached: bool,
    },

    /// Print the effective configuration.
    Config {
        /// Print the JSON schema instead.
        #[arg(long)]
        schema: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RunnerArg {
    Default,
    WebLink,
}

impl From<RunnerArg> for RunnerKind {
    fn from(v: RunnerArg) -> Self {
        match v {
            RunnerArg::Default => RunnerKind::Default,
            RunnerArg::WebLink => RunnerKind::WebLink,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("load configuration")?;
    let warnings = validate_config(&config).context("validate configuration")?;

    init_tracing(cli.debug, &config);
    for w in &warnings {
        warn!(target: "ludo.config", "{w}");
    }

    let library = commands::library_path(cli.library, &config);
    match cli.command {
        Commands::List { json } => commands::cmd_list(&library, json),
        Commands::Add {
            title,
            target,
            args,
            cwd,
            runner,
        } => commands::cmd_add(
            &library,
            commands::NewGame {
                title,
                target,
                args,
                cwd,
                runner: runner.map(RunnerKind::from),
            },
        ),
        Commands::Remove { id } => commands::cmd_remove(&library, &id),
        Commands::Play { id, detached } => {
            let config = LauncherConfig {
                detached: config.detached || detached,
                ..config
            };
            commands::cmd_play(&library, &config, &id).await
        }
        Commands::Config { schema } => commands::cmd_config(&config, &warnings, schema),
    }
}

fn init_tracing(debug: bool, config: &LauncherConfig) {
    let filter = if debug {
        EnvFilter::new("ludo=debug")
    } else {
        let level = config.log_level.as_deref().unwrap_or("info");
        // Game output is printed directly by `play`.
        EnvFilter::new(format!("ludo={level},ludo.game=off"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
