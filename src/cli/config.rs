use std::path::Path;

use anyhow::Context;
use rolling_release::{
    ConfigStore, Table,
    domain::{Wrapper, config::default_key},
    report::Column,
    storage::Row,
};
use tracing::instrument;

use super::{render, terminal::Colorize};

/// Show or modify the configuration table
///
/// With no option, the table is shown.
#[derive(Debug, clap::Parser)]
pub struct Config {
    /// Show the configuration table
    #[arg(long)]
    show: bool,

    /// Delete every configuration row
    #[arg(long)]
    clean: bool,

    /// Update the value of KEY
    #[arg(long, value_name = "KEY")]
    update: Option<String>,

    /// New value for the updated key (prompted if omitted)
    #[arg(long, requires = "update")]
    value: Option<String>,

    /// New wrapper for the updated key: int or eval
    #[arg(long, requires = "value")]
    wrapper: Option<Wrapper>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
}

impl Config {
    #[instrument(skip(path))]
    pub fn run(self, path: &Path) -> anyhow::Result<()> {
        let mut store = ConfigStore::open(path)?;

        if self.clean {
            if self.confirm("Delete every configuration row?")? {
                store.clean()?;
                println!("{}", "Configuration cleaned".success());
            } else {
                println!("{}", "Cancelled".dim());
            }
        }

        if let Some(key) = &self.update {
            self.update(&mut store, key)?;
        }

        if self.show || (!self.clean && self.update.is_none()) {
            store.prepare()?;
            println!("{}", path.display().to_string().dim());
            print!("{}", render::text(&table(store.get_all())));
        }
        Ok(())
    }

    fn update(&self, store: &mut ConfigStore, key: &str) -> anyhow::Result<()> {
        let current = store.get_row(key).cloned();
        if current.is_none() && default_key(key).is_none() {
            anyhow::bail!("no key '{key}' in the default configuration");
        }

        let (value, wrapper) = match &self.value {
            Some(value) => (value.clone(), self.wrapper),
            None => prompt_value(key, current.as_ref())?,
        };

        let question = format!(
            "Set {key} to '{value}'{}?",
            wrapper.map(|w| format!(" ({w})")).unwrap_or_default()
        );
        if !self.confirm(&question)? {
            println!("{}", "Cancelled".dim());
            return Ok(());
        }

        store.set(key, &value, wrapper)?;
        println!("{}", format!("Updated {key}").success());
        Ok(())
    }

    fn confirm(&self, prompt: &str) -> anyhow::Result<bool> {
        if self.yes {
            return Ok(true);
        }
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("failed to read confirmation")
    }
}

fn prompt_value(key: &str, current: Option<&Row>) -> anyhow::Result<(String, Option<Wrapper>)> {
    let value = dialoguer::Input::<String>::new()
        .with_prompt(format!("New value for {key}"))
        .with_initial_text(current.and_then(|row| row.value.clone()).unwrap_or_default())
        .allow_empty(true)
        .interact_text()
        .context("failed to read value")?;

    let wrapper = dialoguer::Input::<String>::new()
        .with_prompt("Wrapper (int, eval, or empty)")
        .with_initial_text(
            current
                .and_then(|row| row.wrapper)
                .map(|wrapper| wrapper.to_string())
                .unwrap_or_default(),
        )
        .allow_empty(true)
        .interact_text()
        .context("failed to read wrapper")?;

    let wrapper = if wrapper.trim().is_empty() {
        None
    } else {
        Some(wrapper.parse()?)
    };
    Ok((value, wrapper))
}

fn table<'a>(rows: impl Iterator<Item = &'a Row>) -> Table {
    Table::new(
        vec![
            Column::emphasized("Key"),
            Column::new("Value"),
            Column::new("Wrapper"),
        ],
        rows.map(|row| {
            vec![
                row.key.clone(),
                row.value.clone().unwrap_or_default(),
                row.wrapper.map(|wrapper| wrapper.to_string()).unwrap_or_default(),
            ]
        })
        .collect(),
    )
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn run(args: &[&str], path: &Path) {
        Config::try_parse_from(std::iter::once("config").chain(args.iter().copied()))
            .unwrap()
            .run(path)
            .unwrap();
    }

    #[test]
    fn update_without_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        run(
            &["--update", "odoo_limit", "--value", "50", "--wrapper", "int", "-y"],
            &path,
        );

        let mut store = ConfigStore::open(&path).unwrap();
        assert_eq!(store.settings().unwrap().limit, 50);
    }

    #[test]
    fn update_rejects_unknown_key() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::try_parse_from(["config", "--update", "nope", "--value", "1", "-y"])
            .unwrap()
            .run(&dir.path().join("config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn clean_then_show_restores_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        run(&["--update", "odoo_url", "--value", "staging.odoo.com", "-y"], &path);
        run(&["--clean", "--show", "-y"], &path);

        let mut store = ConfigStore::open(&path).unwrap();
        assert_eq!(store.settings().unwrap().odoo_url, "www.odoo.com");
    }

    #[test]
    fn wrapper_requires_value() {
        assert!(Config::try_parse_from(["config", "--update", "odoo_limit", "--wrapper", "int"]).is_err());
    }

    #[test]
    fn table_lists_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path().join("config.toml")).unwrap();
        store.prepare().unwrap();

        let table = table(store.get_all());
        let limit = table.rows.iter().find(|row| row[0] == "odoo_limit").unwrap();
        assert_eq!(limit, &vec!["odoo_limit".to_string(), "700".to_string(), "int".to_string()]);
    }
}
