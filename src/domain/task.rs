use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::fields;

/// Prefix marking rolling-release tickets.
pub const TASK_PREFIX: &str = "[rr] ";

/// Path segment appended to support links in ticket descriptions.
const SUPPORT_SUFFIX: &str = "/_odoo/support";

static ANCHOR_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\shref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .unwrap_or_else(|e| unreachable!("hard-coded pattern is valid: {e}"))
});

/// A support ticket (`project.task`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Task {
    /// Record id.
    pub id: i64,

    /// Ticket title, usually `"[rr] <database name>"`.
    pub name: String,

    /// HTML body of the ticket.
    #[serde(default, deserialize_with = "fields::optional_string")]
    pub description: Option<String>,
}

impl Task {
    /// The ticket title without the rolling-release prefix.
    ///
    /// By convention this is the name of the customer database.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name.replace(TASK_PREFIX, "")
    }

    /// The database URL linked from the ticket description.
    ///
    /// Taken from the first anchor with an `href`, with the support path
    /// removed. `None` when there is no description or no link.
    #[must_use]
    pub fn database_url(&self) -> Option<String> {
        let description = self.description.as_deref()?;
        let captures = ANCHOR_HREF.captures(description)?;
        let href = captures
            .get(1)
            .or_else(|| captures.get(2))
            .or_else(|| captures.get(3))?
            .as_str();
        Some(href.replace("&amp;", "&").replace(SUPPORT_SUFFIX, ""))
    }

    /// Link to the ticket in the web client.
    #[must_use]
    pub fn link(&self, base_url: &str) -> String {
        format!("{base_url}/odoo/my-tasks/{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, description: Option<&str>) -> Task {
        Task {
            id: 12,
            name: name.to_string(),
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn display_name_strips_prefix() {
        assert_eq!(task("[rr] acme-prod", None).display_name(), "acme-prod");
        assert_eq!(task("acme-prod", None).display_name(), "acme-prod");
    }

    #[test]
    fn database_url_comes_from_first_link() {
        let description = r#"<p>Customer: <a class="x" href="https://acme.odoo.com/_odoo/support">db</a>
            and <a href="https://other.example">other</a></p>"#;
        assert_eq!(
            task("[rr] acme", Some(description)).database_url().as_deref(),
            Some("https://acme.odoo.com")
        );
    }

    #[test]
    fn database_url_accepts_single_quotes() {
        let description = "<a href='https://acme.odoo.com'>db</a>";
        assert_eq!(
            task("[rr] acme", Some(description)).database_url().as_deref(),
            Some("https://acme.odoo.com")
        );
    }

    #[test]
    fn database_url_ignores_prefixed_href_attributes() {
        let description =
            r#"<a data-href="tracking" href="https://acme.odoo.com/_odoo/support">db</a>"#;
        assert_eq!(
            task("[rr] acme", Some(description)).database_url().as_deref(),
            Some("https://acme.odoo.com")
        );
    }

    #[test]
    fn database_url_is_none_without_link() {
        assert!(task("[rr] acme", None).database_url().is_none());
        assert!(task("[rr] acme", Some("<p>no link</p>")).database_url().is_none());
        assert!(task("[rr] acme", Some("<a name=\"x\">anchor</a>")).database_url().is_none());
    }

    #[test]
    fn link_points_to_my_tasks() {
        assert_eq!(
            task("[rr] acme", None).link("https://www.odoo.com"),
            "https://www.odoo.com/odoo/my-tasks/12"
        );
    }
}
