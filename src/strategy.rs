//! How tasks are matched to customer databases.
//!
//! A [`Strategy`] decides which task fields to read, which database field to
//! search on, and which keys join the two sides.

use chrono::{Days, NaiveDate};

use crate::domain::{Database, Domain, Leaf, Operator, Task, Term};

mod link;
mod title;

pub use link::LinkStrategy;
pub use title::TitleStrategy;

/// Databases that have not pinged within this window are ignored.
pub const PING_WINDOW_DAYS: u64 = 30;

/// A way of matching tasks to databases.
pub trait Strategy: std::fmt::Debug {
    /// Short name, for logs.
    fn name(&self) -> &'static str;

    /// Whether this strategy is experimental.
    fn experimental(&self) -> bool {
        false
    }

    /// Task fields to read, besides `id`.
    fn task_fields(&self) -> Vec<&'static str> {
        vec!["name"]
    }

    /// The database field matched against task keys.
    fn database_field(&self) -> &'static str;

    /// The join key of a task, if it has one.
    fn task_key(&self, task: &Task) -> Option<String>;

    /// The join key of a database, if it has one.
    fn database_key(&self, database: &Database) -> Option<String>;

    /// Databases matching `tasks` that pinged recently.
    fn database_domain(&self, tasks: &[Task], today: NaiveDate) -> Domain {
        let keys: Vec<String> = tasks.iter().filter_map(|task| self.task_key(task)).collect();
        let since = today
            .checked_sub_days(Days::new(PING_WINDOW_DAYS))
            .unwrap_or(today);
        Domain::from_terms(vec![
            Term::Operator(Operator::And),
            Leaf::new(self.database_field(), "in", keys).into(),
            Leaf::new("last_ping", ">", since.format("%Y-%m-%d").to_string()).into(),
        ])
    }
}
