//! `adminpanel` command-line entry point.
//!
//! Usage:
//!   adminpanel --db admin.db init --seed bootstrap.xml
//!   adminpanel --config adminpanel.toml user add alice --password s3cret --role admin
//!   adminpanel --db admin.db user list --page 2
//!   adminpanel --db admin.db user login alice --password s3cret
//!   adminpanel --db admin.db menu alice
//!   adminpanel ping

mod commands;

use adminpanel_core::{init_logging_from_config, AppConfig};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use commands::{InitCommand, MenuCommand, UserCommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "adminpanel")]
#[command(about = "Admin panel backend: users, roles, menus and bootstrap data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML file with `db_path` and optional settings; `ADMINPANEL_*` overrides
    #[arg(short, long, global = true, conflicts_with = "db")]
    config: Option<PathBuf>,

    /// SQLite database file, used with built-in defaults
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or migrate the database, optionally seeding it
    Init(InitCommand),
    /// Manage user accounts
    User(UserCommand),
    /// Print a user's menu tree as JSON
    Menu(MenuCommand),
    /// Check that the core library links
    Ping,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Ping => {
            println!("adminpanel_core ping={}", adminpanel_core::ping());
            println!("adminpanel_core version={}", adminpanel_core::core_version());
            return Ok(());
        }
        _ => load_config(cli.config, cli.db)?,
    };
    if init_logging_from_config(&config).context("failed to initialize logging")? {
        log::info!("event=cli_start module=cli status=ok");
    }

    match cli.command {
        Commands::Init(cmd) => cmd.run(&config),
        Commands::User(cmd) => cmd.run(&config),
        Commands::Menu(cmd) => cmd.run(&config),
        Commands::Ping => Ok(()),
    }
}

fn load_config(config: Option<PathBuf>, db: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    match (config, db) {
        (Some(path), _) => AppConfig::from_file(&path)
            .with_context(|| format!("failed to load config `{}`", path.display())),
        (None, Some(db)) => AppConfig::with_db_path(db)
            .with_env_overrides()
            .context("failed to apply ADMINPANEL_* overrides"),
        (None, None) => bail!("either --config <file> or --db <path> is required"),
    }
}
