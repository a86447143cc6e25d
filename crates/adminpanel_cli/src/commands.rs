//! Subcommand implementations.

use adminpanel_core::{
    open_db, seed_from_file, AppConfig, AuthService, MenuCache, MenuService, NewUser,
    OnlineUserRegistry, PageSpec, SqliteSession, UserService,
};
use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitCommand {
    /// Bootstrap XML to apply; defaults to `bootstrap_file` from the config
    #[arg(long)]
    seed: Option<PathBuf>,
}

impl InitCommand {
    pub fn run(&self, config: &AppConfig) -> anyhow::Result<()> {
        let conn = open_db(&config.db_path)
            .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
        println!("database ready: {}", config.db_path.display());

        let Some(seed) = self.seed.as_ref().or(config.bootstrap_file.as_ref()) else {
            return Ok(());
        };
        let session = SqliteSession::try_new(&conn)?;
        let report = seed_from_file(&session, &MenuCache::new(), seed)
            .with_context(|| format!("failed to seed from `{}`", seed.display()))?;
        if report.skipped {
            println!("seed skipped: data already present");
        } else {
            println!(
                "seeded roles={} menus={} grants={} users={}",
                report.roles, report.menus, report.grants, report.users
            );
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct UserCommand {
    #[command(subcommand)]
    pub command: UserSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum UserSubcommand {
    /// Create a user account
    Add {
        /// Login name
        login: String,
        #[arg(short, long)]
        password: String,
        /// Display name; defaults to the login
        #[arg(short, long, default_value = "")]
        name: String,
        /// Role name
        #[arg(short, long)]
        role: Option<String>,
    },
    /// List user accounts
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Rows per page; defaults to `page_default_rows`
        #[arg(long)]
        rows: Option<u32>,
    },
    /// Replace a user's password
    Passwd {
        login: String,
        #[arg(short, long)]
        password: String,
    },
    /// Deactivate a user account
    Disable { login: String },
    /// Check credentials by opening an online session
    Login {
        login: String,
        #[arg(short, long)]
        password: String,
        /// Client address recorded on the session
        #[arg(long, default_value = "127.0.0.1")]
        ip: String,
    },
}

impl UserCommand {
    pub fn run(&self, config: &AppConfig) -> anyhow::Result<()> {
        let conn = open_db(&config.db_path)
            .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
        let session = SqliteSession::try_new(&conn)?;
        let users = UserService::new(&session);

        match &self.command {
            UserSubcommand::Add {
                login,
                password,
                name,
                role,
            } => {
                let mut request = NewUser::new(login, name, password);
                request.role = role.clone();
                let user = users.create_user(request)?;
                println!("created user {}", user.login_name);
            }
            UserSubcommand::List { page, rows } => {
                let page = PageSpec::new(*page, rows.unwrap_or(config.page_default_rows))?;
                let total = users.count_users()?;
                for user in users.list_users(page)? {
                    let status = if user.active { "active" } else { "inactive" };
                    println!("{}\t{}\t{}", user.login_name, user.display_name, status);
                }
                println!(
                    "page {} ({} rows/page), {} users total",
                    page.page(),
                    page.rows(),
                    total
                );
            }
            UserSubcommand::Passwd { login, password } => {
                let user_id = require_user_id(&users, login)?;
                users.change_password(user_id, password)?;
                println!("password changed for {login}");
            }
            UserSubcommand::Disable { login } => {
                let user_id = require_user_id(&users, login)?;
                users.deactivate_user(user_id)?;
                println!("deactivated {login}");
            }
            UserSubcommand::Login {
                login,
                password,
                ip,
            } => {
                let registry = OnlineUserRegistry::new();
                let auth = AuthService::from_config(&session, &registry, config);
                let Some(online) = auth.login(login, password, ip)? else {
                    bail!("login failed for {login}");
                };
                println!(
                    "logged in {} ({}) from {}, idle timeout {}s",
                    online.login_name,
                    online.display_name,
                    online.ip,
                    auth.idle_timeout().as_secs()
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct MenuCommand {
    /// Login whose menu tree is printed
    login: String,
}

impl MenuCommand {
    pub fn run(&self, config: &AppConfig) -> anyhow::Result<()> {
        let conn = open_db(&config.db_path)
            .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
        let session = SqliteSession::try_new(&conn)?;
        let user_id = require_user_id(&UserService::new(&session), &self.login)?;

        let cache = MenuCache::new();
        let json = MenuService::new(&session, &cache).render_user_menu_json(user_id)?;
        println!("{json}");
        Ok(())
    }
}

fn require_user_id(
    users: &UserService<'_, SqliteSession<'_>>,
    login: &str,
) -> anyhow::Result<adminpanel_core::EntityId> {
    match users.find_by_login(login)?.and_then(|user| user.id) {
        Some(id) => Ok(id),
        None => bail!("user not found: {login}"),
    }
}
