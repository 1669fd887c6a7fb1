//! Rolling-release reports.
//!
//! The [`Reporter`] fetches tasks, the databases they refer to, and
//! optionally their subscriptions and upgrade requests, joins everything in
//! memory and produces a [`Table`].

use std::{cmp::Ordering, collections::HashMap, hash::Hash};

use chrono::{Local, NaiveDate};
use rand::seq::SliceRandom;
use tracing::instrument;

use crate::{
    domain::{
        Database, Domain, DomainError, Subscription, Task, TripleFlag, UpgradeRequest, YesNo,
        filter,
    },
    rpc::Connector,
    service::{Service, ServiceError},
    stats::Grouping,
    strategy::Strategy,
};

mod table;
pub use table::{Column, Table};

/// Upgrade requests in these states are not reported.
pub const PENDING_UPGRADE_STATES: [&str; 4] = ["new", "pending", "progress", "cancelled"];

const DATABASE_FIELDS: [&str; 8] = [
    "subscription_id",
    "version",
    "url",
    "extra_apps",
    "db_name",
    "db_uuid",
    "parent_id",
    "date_valid",
];

/// A task joined with everything known about its database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedTask {
    /// The ticket.
    pub task: Task,
    /// Its database, or a placeholder if none was found.
    pub database: Database,
    /// The database's subscription, or a placeholder.
    pub subscription: Subscription,
    /// The latest upgrade request, when upgrade data was requested.
    pub upgrade_request: Option<UpgradeRequest>,
}

impl MergedTask {
    /// The table row for this task.
    #[must_use]
    pub fn row(&self, base_url: &str, show_sub: bool) -> Vec<String> {
        let mut row = vec![
            self.task.name.clone(),
            self.database.version().to_string(),
            self.subscription.display_value(show_sub),
            YesNo(self.database.has_parent()).to_string(),
        ];
        if let Some(request) = &self.upgrade_request {
            row.push(request.has_traceback().to_string());
        }
        row.push(self.database.date_valid_display());
        row.push(self.task.link(base_url));
        row
    }
}

/// Builds rolling-release reports from a remote server.
pub struct Reporter<'c> {
    strategy: Box<dyn Strategy>,
    odoo: &'c dyn Connector,
    upgrade: Option<&'c dyn Connector>,
    base_url: String,
    task_domain: Domain,
    limit: u32,
    today: NaiveDate,
    task_name: Option<String>,
    parent: TripleFlag,
    contract: TripleFlag,
    show_sub: bool,
    hide_not_found: bool,
    lucky: bool,
    order_by_validity: bool,
}

impl<'c> Reporter<'c> {
    /// A reporter over the tasks matching `task_domain`, at most `limit`
    /// records per query.
    #[must_use]
    pub fn new(
        strategy: Box<dyn Strategy>,
        odoo: &'c dyn Connector,
        task_domain: Domain,
        limit: u32,
    ) -> Self {
        Self {
            strategy,
            odoo,
            upgrade: None,
            base_url: String::new(),
            task_domain,
            limit,
            today: Local::now().date_naive(),
            task_name: None,
            parent: TripleFlag::Both,
            contract: TripleFlag::Both,
            show_sub: false,
            hide_not_found: true,
            lucky: false,
            order_by_validity: false,
        }
    }

    /// Joins upgrade requests read from `connector`.
    #[must_use]
    pub fn with_upgrade(mut self, connector: &'c dyn Connector) -> Self {
        self.upgrade = Some(connector);
        self
    }

    /// Base URL used to build task links.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the reference date for the ping window.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Only tasks whose name contains `task_name`.
    #[must_use]
    pub fn with_task_name(mut self, task_name: impl Into<String>) -> Self {
        self.task_name = Some(task_name.into());
        self
    }

    /// Filter on whether databases have a parent.
    #[must_use]
    pub fn with_parent(mut self, parent: TripleFlag) -> Self {
        self.parent = parent;
        self
    }

    /// Filter on whether databases have a subscription.
    #[must_use]
    pub fn with_contract(mut self, contract: TripleFlag) -> Self {
        self.contract = contract;
        self
    }

    /// Show the customer's contract reference instead of `YES`.
    #[must_use]
    pub fn with_show_sub(mut self) -> Self {
        self.show_sub = true;
        self
    }

    /// Keep tasks whose database could not be found.
    #[must_use]
    pub fn show_not_found(mut self) -> Self {
        self.hide_not_found = false;
        self
    }

    /// Report a single random task.
    #[must_use]
    pub fn only_luck(mut self) -> Self {
        self.lucky = true;
        self
    }

    /// Sort tasks by the validity date of their database.
    #[must_use]
    pub fn with_order_by_validity(mut self) -> Self {
        self.order_by_validity = true;
        self
    }

    /// The filter selecting tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured task filter is malformed.
    pub fn task_domain(&self) -> Result<Domain, DomainError> {
        match &self.task_name {
            Some(name) => filter::and(&[
                self.task_domain.clone(),
                Domain::leaf("name", "ilike", format!("%{name}%")),
            ]),
            None => Ok(self.task_domain.clone()),
        }
    }

    /// The filter selecting the databases of `tasks`.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cannot be combined.
    pub fn database_domain(&self, tasks: &[Task]) -> Result<Domain, DomainError> {
        let mut domain = self.strategy.database_domain(tasks, self.today);
        for (field, flag) in [("parent_id", self.parent), ("subscription_id", self.contract)] {
            if let Some(extra) = flag.presence_filter(field) {
                domain = filter::and(&[domain, extra])?;
            }
        }
        Ok(domain)
    }

    fn subscription_domain(databases: &[Database]) -> Domain {
        let ids: Vec<i64> = databases
            .iter()
            .filter_map(|database| database.subscription_id)
            .collect();
        Domain::leaf("id", "in", ids)
    }

    fn upgrade_request_domain(databases: &[Database]) -> Domain {
        let uuids: Vec<&str> = databases
            .iter()
            .map(|database| database.db_uuid.as_str())
            .filter(|uuid| !uuid.is_empty())
            .collect();
        Domain::from_terms(
            [
                Domain::leaf("db_uuid", "in", uuids),
                Domain::leaf("state", "not in", PENDING_UPGRADE_STATES.to_vec()),
                Domain::leaf("active", "in", vec![true, false]),
            ]
            .into_iter()
            .flat_map(|domain| domain.terms().to_vec())
            .collect(),
        )
    }

    fn fetch_tasks(&self) -> Result<Vec<Task>, ServiceError> {
        Service::<Task>::new(self.odoo)
            .with_fields(self.strategy.task_fields())
            .with_domain(self.task_domain()?)
            .with_limit(self.limit)
            .fetch()
    }

    /// Fetches and joins everything, returning the merged tasks in report
    /// order.
    ///
    /// # Errors
    ///
    /// Returns an error if any remote query fails.
    #[instrument(level = "debug", skip(self), fields(strategy = self.strategy.name()))]
    pub fn merged_tasks(&self) -> Result<Vec<MergedTask>, ServiceError> {
        let tasks = self.fetch_tasks()?;

        let databases = Service::<Database>::new(self.odoo)
            .with_fields(DATABASE_FIELDS)
            .with_domain(self.database_domain(&tasks)?)
            .with_limit(self.limit)
            .fetch()?;

        let subscriptions = Service::<Subscription>::new(self.odoo)
            .with_fields(["client_order_ref"])
            .with_domain(Self::subscription_domain(&databases))
            .with_limit(self.limit)
            .fetch()?;

        let upgrade_requests = match self.upgrade {
            Some(connector) => Some(
                Service::<UpgradeRequest>::new(connector)
                    .with_fields(["db_uuid", "last_traceback"])
                    .with_domain(Self::upgrade_request_domain(&databases))
                    .with_limit(self.limit)
                    .fetch()?,
            ),
            None => None,
        };

        tracing::info!(
            tasks = tasks.len(),
            databases = databases.len(),
            subscriptions = subscriptions.len(),
            "fetched rolling-release records"
        );

        let mut merged = self.merge(tasks, databases, subscriptions, upgrade_requests);
        if self.order_by_validity {
            sort_by_validity(&mut merged);
        }
        Ok(merged)
    }

    /// Joins tasks with their databases, subscriptions and upgrade requests.
    ///
    /// Tasks are deduplicated by join key (the last one wins, at the position
    /// of the first). Tasks without a database are dropped unless
    /// [`show_not_found`](Self::show_not_found) was set.
    #[must_use]
    pub fn merge(
        &self,
        tasks: Vec<Task>,
        databases: Vec<Database>,
        subscriptions: Vec<Subscription>,
        upgrade_requests: Option<Vec<UpgradeRequest>>,
    ) -> Vec<MergedTask> {
        let mut databases = index_by(databases, |database| self.strategy.database_key(database));
        let subscriptions = index_by(subscriptions, |subscription| subscription.id);
        let upgrade_requests = upgrade_requests.map(|requests| {
            index_by(requests, |request| {
                Some(request.db_uuid.clone()).filter(|uuid| !uuid.is_empty())
            })
        });

        let mut merged = Vec::new();
        for (key, task) in dedup_tasks(tasks, |task| self.strategy.task_key(task)) {
            let database = key.and_then(|key| databases.remove(&key));
            if database.is_none() && self.hide_not_found {
                tracing::debug!(task = %task.name, "no database found");
                continue;
            }
            let database = database.unwrap_or_default();

            let subscription = database
                .subscription_id
                .and_then(|id| subscriptions.get(&id).cloned())
                .unwrap_or_default();

            let upgrade_request = upgrade_requests.as_ref().map(|requests| {
                requests
                    .get(&database.db_uuid)
                    .cloned()
                    .unwrap_or_default()
            });

            merged.push(MergedTask {
                task,
                database,
                subscription,
                upgrade_request,
            });
        }
        merged
    }

    /// The column headers of the task report.
    #[must_use]
    pub fn columns(&self) -> Vec<Column> {
        let mut columns = vec![
            Column::new("Task Name"),
            Column::new("Version"),
            Column::new("Sub"),
            Column::new("Parent"),
        ];
        if self.upgrade.is_some() {
            columns.push(Column::new("Traceback"));
        }
        columns.push(Column::new("Exp Date"));
        columns.push(Column::emphasized("Link"));
        columns
    }

    /// Builds the task report.
    ///
    /// # Errors
    ///
    /// Returns an error if any remote query fails.
    pub fn search(&self) -> Result<Table, ServiceError> {
        let mut rows: Vec<Vec<String>> = self
            .merged_tasks()?
            .iter()
            .map(|task| task.row(&self.base_url, self.show_sub))
            .collect();

        if self.lucky {
            rows = rows
                .choose(&mut rand::thread_rng())
                .cloned()
                .into_iter()
                .collect();
        }

        Ok(Table::new(self.columns(), rows))
    }

    /// Counts the databases of the reported tasks, grouped by `field`.
    ///
    /// # Errors
    ///
    /// Returns an error if any remote query fails.
    #[instrument(level = "debug", skip(self))]
    pub fn stats(&self, field: &str, grouping: Grouping) -> Result<Table, ServiceError> {
        let tasks = self.fetch_tasks()?;
        let groups = Service::<Database>::new(self.odoo)
            .with_domain(self.database_domain(&tasks)?)
            .with_limit(self.limit)
            .fetch_group(field, grouping)?;

        Ok(Table::new(
            vec![Column::new(field), Column::emphasized("Count")],
            groups
                .into_iter()
                .map(|group| vec![group.group, group.count.to_string()])
                .collect(),
        ))
    }
}

fn index_by<K, T>(items: Vec<T>, key: impl Fn(&T) -> Option<K>) -> HashMap<K, T>
where
    K: Eq + Hash,
{
    items
        .into_iter()
        .filter_map(|item| key(&item).map(|k| (k, item)))
        .collect()
}

/// Deduplicates tasks by key; a later duplicate replaces an earlier one in
/// place. Tasks without a key are kept as they are.
fn dedup_tasks(
    tasks: Vec<Task>,
    key: impl Fn(&Task) -> Option<String>,
) -> Vec<(Option<String>, Task)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut ordered: Vec<(Option<String>, Task)> = Vec::with_capacity(tasks.len());
    for task in tasks {
        match key(&task) {
            Some(k) => {
                if let Some(&position) = positions.get(&k) {
                    ordered[position].1 = task;
                } else {
                    positions.insert(k.clone(), ordered.len());
                    ordered.push((Some(k), task));
                }
            }
            None => ordered.push((None, task)),
        }
    }
    ordered
}

/// Earliest validity first; databases without a date go last.
fn sort_by_validity(tasks: &mut [MergedTask]) {
    tasks.sort_by(|a, b| match (a.database.date_valid, b.database.date_valid) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        rpc::testing::FakeConnector,
        strategy::{LinkStrategy, TitleStrategy},
    };

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn main_server() -> FakeConnector {
        FakeConnector::default()
            .with(
                "project.task",
                "search_read",
                json!([
                    {"id": 1, "name": "[rr] acme"},
                    {"id": 2, "name": "[rr] globex"},
                    {"id": 3, "name": "[rr] dropped"},
                ]),
            )
            .with(
                "openerp.enterprise.database",
                "search_read",
                json!([
                    {
                        "id": 10, "db_name": "acme", "version": "17.0", "db_uuid": "uuid-acme",
                        "parent_id": false, "subscription_id": [100, "S100"],
                        "date_valid": "2025-01-31 00:00:00", "url": "https://acme.odoo.com"
                    },
                    {
                        "id": 11, "db_name": "globex", "version": "16.0", "db_uuid": "uuid-globex",
                        "parent_id": [9, "globex-main"], "subscription_id": false,
                        "date_valid": "2024-09-01 00:00:00", "url": "https://globex.odoo.com"
                    },
                ]),
            )
            .with(
                "sale.order",
                "search_read",
                json!([{"id": 100, "client_order_ref": "PO-ACME"}]),
            )
    }

    fn reporter(connector: &FakeConnector) -> Reporter<'_> {
        Reporter::new(
            Box::new(TitleStrategy),
            connector,
            Domain::leaf("name", "ilike", "[rr]%"),
            700,
        )
        .with_base_url("https://www.odoo.com")
        .with_today(today())
    }

    #[test]
    fn task_domain_adds_name_filter() {
        let connector = FakeConnector::default();
        let domain = reporter(&connector).with_task_name("acme").task_domain().unwrap();
        assert_eq!(
            domain.to_string(),
            r#"["&",["name","ilike","[rr]%"],["name","ilike","%acme%"]]"#
        );
    }

    #[test]
    fn database_domain_applies_presence_filters() {
        let connector = FakeConnector::default();
        let tasks = vec![Task {
            id: 1,
            name: "[rr] acme".to_string(),
            description: None,
        }];

        let domain = reporter(&connector)
            .with_parent(TripleFlag::No)
            .with_contract(TripleFlag::Yes)
            .database_domain(&tasks)
            .unwrap();

        assert_eq!(
            domain.to_string(),
            concat!(
                r#"["&","&","&",["db_name","in",["acme"]],["last_ping",">","2024-05-31"],"#,
                r#"["parent_id","=",false],["subscription_id","!=",false]]"#
            )
        );
    }

    #[test]
    fn search_joins_tasks_databases_and_subscriptions() {
        let connector = main_server();
        let table = reporter(&connector).search().unwrap();

        let titles: Vec<&str> = table.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, [
            "Task Name", "Version", "Sub", "Parent", "Exp Date", "Link"
        ]);
        assert_eq!(table.rows, vec![
            vec![
                "[rr] acme",
                "17.0",
                "YES",
                "NO",
                "31-01-2025",
                "https://www.odoo.com/odoo/my-tasks/1"
            ],
            vec![
                "[rr] globex",
                "16.0",
                "NO",
                "YES",
                "01-09-2024",
                "https://www.odoo.com/odoo/my-tasks/2"
            ],
        ]);

        let subscription_call = &connector.calls_to("sale.order")[0];
        assert_eq!(subscription_call.kwargs["domain"], json!([["id", "in", [100]]]));
    }

    #[test]
    fn ghosts_are_kept_with_placeholders() {
        let connector = main_server();
        let table = reporter(&connector).show_not_found().search().unwrap();

        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[2], vec![
            "[rr] dropped",
            "NO VERSION",
            "NO",
            "NO",
            "",
            "https://www.odoo.com/odoo/my-tasks/3"
        ]);
    }

    #[test]
    fn explicit_contract_shows_reference() {
        let connector = main_server();
        let table = reporter(&connector).with_show_sub().search().unwrap();
        assert_eq!(table.rows[0][2], "PO-ACME");
        assert_eq!(table.rows[1][2], "NO");
    }

    #[test]
    fn order_by_validity_sorts_earliest_first() {
        let connector = main_server();
        let table = reporter(&connector)
            .show_not_found()
            .with_order_by_validity()
            .search()
            .unwrap();

        let names: Vec<&str> = table.rows.iter().map(|row| row[0].as_str()).collect();
        assert_eq!(names, ["[rr] globex", "[rr] acme", "[rr] dropped"]);
    }

    #[test]
    fn lucky_keeps_one_row() {
        let connector = main_server();
        let table = reporter(&connector).only_luck().search().unwrap();
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn lucky_with_no_rows_is_empty() {
        let connector = FakeConnector::default();
        let table = reporter(&connector).only_luck().search().unwrap();
        assert!(table.rows.is_empty());
    }

    #[test]
    fn upgrade_data_adds_traceback_column() {
        let connector = main_server();
        let upgrade = FakeConnector::default().with(
            "upgrade.request",
            "search_read",
            json!([
                {"id": 5, "db_uuid": "uuid-acme", "last_traceback": false},
                {"id": 8, "db_uuid": "uuid-acme", "last_traceback": "Traceback (most recent call last)"},
            ]),
        );

        let table = reporter(&connector).with_upgrade(&upgrade).search().unwrap();

        assert_eq!(table.columns[4].title, "Traceback");
        assert_eq!(table.rows[0][4], "YES");
        assert_eq!(table.rows[1][4], "NO");

        let call = &upgrade.calls_to("upgrade.request")[0];
        assert_eq!(
            call.kwargs["domain"],
            json!([
                ["db_uuid", "in", ["uuid-acme", "uuid-globex"]],
                ["state", "not in", ["new", "pending", "progress", "cancelled"]],
                ["active", "in", [true, false]],
            ])
        );
        assert!(connector.calls_to("upgrade.request").is_empty());
    }

    #[test]
    fn duplicate_tasks_keep_first_position_and_last_value() {
        let connector = FakeConnector::default();
        let reporter = reporter(&connector).show_not_found();
        let task = |id, name: &str| Task {
            id,
            name: name.to_string(),
            description: None,
        };

        let merged = reporter.merge(
            vec![task(1, "[rr] a"), task(2, "[rr] b"), task(3, "[rr] a")],
            Vec::new(),
            Vec::new(),
            None,
        );

        let ids: Vec<i64> = merged.iter().map(|m| m.task.id).collect();
        assert_eq!(ids, [3, 2]);
    }

    #[test]
    fn link_strategy_joins_on_url() {
        let connector = FakeConnector::default()
            .with(
                "project.task",
                "search_read",
                json!([{
                    "id": 7,
                    "name": "[rr] renamed ticket",
                    "description": "<p><a href=\"https://acme.odoo.com/_odoo/support\">db</a></p>"
                }]),
            )
            .with(
                "openerp.enterprise.database",
                "search_read",
                json!([{"id": 10, "db_name": "acme", "version": "17.0", "url": "https://acme.odoo.com"}]),
            );

        let table = Reporter::new(Box::new(LinkStrategy), &connector, Domain::new(), 10)
            .with_today(today())
            .search()
            .unwrap();

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], "17.0");
        assert_eq!(
            connector.calls_to("project.task")[0].kwargs["fields"],
            json!(["id", "name", "description"])
        );
    }

    #[test]
    fn stats_group_databases() {
        let connector = main_server().with(
            "openerp.enterprise.database",
            "read_group",
            json!([
                {"subscription_id": [100, "S100"], "__count": 4},
                {"subscription_id": false, "__count": 6},
                {"subscription_id": [101, "S101"], "__count": 1},
            ]),
        );

        let table = reporter(&connector)
            .stats("subscription_id", Grouping::RecordExists)
            .unwrap();

        assert_eq!(table.columns[0].title, "subscription_id");
        assert_eq!(table.columns[1].title, "Count");
        assert_eq!(table.rows, vec![vec!["YES", "5"], vec!["NO", "6"]]);
    }
}
