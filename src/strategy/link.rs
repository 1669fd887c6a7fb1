use super::Strategy;
use crate::domain::{Database, Task};

/// Matches a task to the database linked from its description.
///
/// The first link in the ticket body is taken as the database URL. Tickets
/// created by hand often have no link, so results can differ from
/// [`TitleStrategy`](super::TitleStrategy).
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkStrategy;

impl Strategy for LinkStrategy {
    fn name(&self) -> &'static str {
        "link"
    }

    fn experimental(&self) -> bool {
        true
    }

    fn task_fields(&self) -> Vec<&'static str> {
        vec!["name", "description"]
    }

    fn database_field(&self) -> &'static str {
        "url"
    }

    fn task_key(&self, task: &Task) -> Option<String> {
        task.database_url()
    }

    fn database_key(&self, database: &Database) -> Option<String> {
        database.url.clone()
    }
}
