use super::Strategy;
use crate::domain::{Database, Task};

/// Matches a task to the database named in its title.
///
/// `"[rr] acme-prod"` matches the database whose `db_name` is `acme-prod`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleStrategy;

impl Strategy for TitleStrategy {
    fn name(&self) -> &'static str {
        "title"
    }

    fn database_field(&self) -> &'static str {
        "db_name"
    }

    fn task_key(&self, task: &Task) -> Option<String> {
        Some(task.display_name())
    }

    fn database_key(&self, database: &Database) -> Option<String> {
        database.db_name.clone()
    }
}
