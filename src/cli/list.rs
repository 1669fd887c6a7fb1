use std::path::Path;

use tracing::instrument;

use super::{
    Connections, SearchArgs, load_settings,
    render::{self, OutputFormat},
    terminal::{self, Colorize},
};

/// List rolling-release tasks with their database, subscription and
/// validity date.
#[derive(Debug, Default, clap::Parser)]
pub struct List {
    #[command(flatten)]
    pub(super) search: SearchArgs,

    /// Join upgrade requests from the upgrade platform
    #[arg(short, long)]
    upgrade: bool,

    /// Also show tasks whose database was not found
    #[arg(short, long)]
    ghosts: bool,

    /// Show the contract reference instead of YES
    #[arg(long)]
    explicit: bool,

    /// Show a single random task
    #[arg(short, long)]
    lucky: bool,

    /// Sort by database validity date, earliest first
    #[arg(short, long)]
    order_by_validity: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

impl List {
    #[instrument(skip(config))]
    pub fn run(self, config: &Path) -> anyhow::Result<()> {
        let settings = load_settings(config)?;
        let mut connections = Connections::open(&settings)?;
        if self.upgrade {
            connections = connections.with_upgrade(&settings)?;
        }

        let mut reporter = self.search.reporter(&settings, &connections);
        if self.ghosts {
            reporter = reporter.show_not_found();
        }
        if self.explicit {
            reporter = reporter.with_show_sub();
        }
        if self.lucky {
            reporter = reporter.only_luck();
        }
        if self.order_by_validity {
            reporter = reporter.with_order_by_validity();
        }

        let table = terminal::with_spinner("Loading RR Tickets...", || reporter.search())?;

        if table.is_empty() && self.output == OutputFormat::Table {
            println!("{}", "No rolling-release task found".warning());
            return Ok(());
        }
        render::print(&table, self.output)?;
        if self.output == OutputFormat::Table {
            println!("{}", format!("{} task(s)", table.rows.len()).dim());
        }
        Ok(())
    }
}
