use std::path::Path;

use rolling_release::stats::DEFAULT_GROUPINGS;
use serde_json::{Map, Value};
use tracing::instrument;

use super::{
    Connections, SearchArgs, load_settings,
    render::{self, OutputFormat},
    terminal::{self, Colorize},
};

/// Count the databases of rolling-release tasks by version, parent and
/// subscription.
#[derive(Debug, Default, clap::Parser)]
pub struct Stats {
    #[command(flatten)]
    pub(super) search: SearchArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

impl Stats {
    #[instrument(skip(config))]
    pub fn run(self, config: &Path) -> anyhow::Result<()> {
        let settings = load_settings(config)?;
        // Counts come from the main server only.
        let connections = Connections::open(&settings)?;
        let reporter = self.search.reporter(&settings, &connections);

        let mut json = Map::new();
        for (position, (field, grouping)) in DEFAULT_GROUPINGS.into_iter().enumerate() {
            tracing::info!("Stats by {field}");
            let table =
                terminal::with_spinner("Loading RR Stats...", || reporter.stats(field, grouping))?;

            match self.output {
                OutputFormat::Table => {
                    if position > 0 {
                        println!();
                    }
                    println!("{}", format!("Stats by {field}").emphasis());
                    print!("{}", render::text(&table));
                }
                OutputFormat::Csv => print!("{}", render::csv(&table)),
                OutputFormat::Json => {
                    json.insert(field.to_string(), render::json(&table));
                }
            }
        }

        if self.output == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&Value::Object(json))?);
        }
        Ok(())
    }
}
