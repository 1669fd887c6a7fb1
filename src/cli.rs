use std::path::{Path, PathBuf};

mod config;
mod list;
mod render;
mod stats;
mod terminal;

use anyhow::Context;
use clap::ArgAction;
use config::Config;
use list::List;
use rolling_release::{
    ConfigStore, JsonRpcConnector, LinkStrategy, Reporter, ServerSettings, Settings, Strategy,
    TitleStrategy, TripleFlag,
};
use stats::Stats;

/// Environment variable holding the password for the main server.
const ODOO_PASSWORD_ENV: &str = "RR_ODOO_PASSWORD";
/// Environment variable holding the password for the upgrade platform.
const UPGRADE_PASSWORD_ENV: &str = "RR_UPGRADE_PASSWORD";

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// Path to the configuration file
    ///
    /// Defaults to `$XDG_CONFIG_HOME/rolling-release/config.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let config = self
            .config
            .or_else(ConfigStore::default_path)
            .context("cannot locate the configuration directory, pass --config")?;

        self.command
            .unwrap_or_else(|| Command::List(List::default()))
            .run(&config)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// List rolling-release tasks with their databases (default)
    List(List),

    /// Count the databases of rolling-release tasks
    ///
    /// One table per grouping: version, parent and subscription.
    Stats(Stats),

    /// Show or modify configuration settings
    Config(Config),
}

impl Command {
    fn run(self, config: &Path) -> anyhow::Result<()> {
        match self {
            Self::List(command) => command.run(config)?,
            Self::Stats(command) => command.run(config)?,
            Self::Config(command) => command.run(config)?,
        }
        Ok(())
    }
}

/// Filters shared by every command that searches tasks.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SearchArgs {
    /// Only tasks whose name contains NAME
    #[arg(short, long, value_name = "NAME")]
    task: Option<String>,

    /// Match databases by the link in the task description (experimental)
    #[arg(long, alias = "bs4")]
    by_link: bool,

    /// Only databases with a subscription
    #[arg(short, long, conflicts_with = "no_contract")]
    contract: bool,

    /// Only databases without a subscription
    #[arg(long)]
    no_contract: bool,

    /// Only databases with a parent
    #[arg(short, long, conflicts_with = "no_parent")]
    parent: bool,

    /// Only databases without a parent
    #[arg(long)]
    no_parent: bool,
}

/// Open connections to the servers a search needs.
pub struct Connections {
    odoo: JsonRpcConnector,
    upgrade: Option<JsonRpcConnector>,
}

impl Connections {
    /// Connects to the main server, prompting for missing credentials.
    pub fn open(settings: &Settings) -> anyhow::Result<Self> {
        let odoo = connector(
            &settings.odoo_url,
            &settings.odoo_database,
            &settings.odoo_login,
            ODOO_PASSWORD_ENV,
        )?;
        Ok(Self {
            odoo,
            upgrade: None,
        })
    }

    /// Also connects to the upgrade platform.
    pub fn with_upgrade(mut self, settings: &Settings) -> anyhow::Result<Self> {
        self.upgrade = Some(connector(
            &settings.upgrade_url,
            &settings.upgrade_database,
            &settings.upgrade_login,
            UPGRADE_PASSWORD_ENV,
        )?);
        Ok(self)
    }
}

/// The notice logged for a relation filter; nothing when it is not filtered.
fn flag_notice(label: &str, flag: TripleFlag) -> Option<String> {
    (flag != TripleFlag::Both).then(|| format!("Has {label}: {flag}"))
}

impl SearchArgs {
    const fn contract(&self) -> TripleFlag {
        TripleFlag::from_switches(self.contract, self.no_contract)
    }

    const fn parent(&self) -> TripleFlag {
        TripleFlag::from_switches(self.parent, self.no_parent)
    }

    fn strategy(&self) -> Box<dyn Strategy> {
        if self.by_link {
            Box::new(LinkStrategy)
        } else {
            Box::new(TitleStrategy)
        }
    }

    /// A reporter configured from these filters.
    pub fn reporter<'c>(&self, settings: &Settings, connections: &'c Connections) -> Reporter<'c> {
        let strategy = self.strategy();
        if strategy.experimental() {
            tracing::info!(
                "the {} strategy is experimental, results may differ from a search by name",
                strategy.name()
            );
        }

        for notice in [
            flag_notice("contract", self.contract()),
            flag_notice("parent", self.parent()),
        ]
        .into_iter()
        .flatten()
        {
            tracing::info!("{notice}");
        }

        let mut reporter = Reporter::new(
            strategy,
            &connections.odoo,
            settings.task_domain.clone(),
            settings.limit,
        )
        .with_base_url(connections.odoo.base_url())
        .with_contract(self.contract())
        .with_parent(self.parent());

        if let Some(task) = &self.task {
            tracing::info!("Searching by name: {task}");
            reporter = reporter.with_task_name(task.clone());
        }
        if let Some(upgrade) = &connections.upgrade {
            reporter = reporter.with_upgrade(upgrade);
        }
        reporter
    }
}

fn connector(
    url: &str,
    database: &str,
    login: &str,
    password_env: &str,
) -> anyhow::Result<JsonRpcConnector> {
    let login = if login.is_empty() {
        dialoguer::Input::<String>::new()
            .with_prompt(format!("Login on {url}"))
            .interact_text()
            .context("failed to read login")?
    } else {
        login.to_string()
    };

    let password = match std::env::var(password_env) {
        Ok(password) => password,
        Err(_) => dialoguer::Password::new()
            .with_prompt(format!("Password for {login} on {url}"))
            .interact()
            .context("failed to read password")?,
    };

    Ok(JsonRpcConnector::new(ServerSettings {
        url: url.to_string(),
        database: database.to_string(),
        login,
        password,
    })?)
}

/// Loads the settings from the configuration file at `path`.
fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut store = ConfigStore::open(path)?;
    store
        .settings()
        .with_context(|| format!("invalid configuration in {}", path.display()))
}
