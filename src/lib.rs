//! Rolling-release reporting
//!
//! Reads rolling-release support tasks from an Odoo server, joins them with
//! the customer databases they concern, their subscriptions and (optionally)
//! the upgrade requests on the upgrade platform, and turns the result into
//! tables or grouped statistics.

pub mod domain;
pub use domain::{Database, Domain, Settings, Subscription, Task, TripleFlag, UpgradeRequest};

/// Remote procedure calls against an Odoo server.
pub mod rpc;
pub use rpc::{Connector, JsonRpcConnector, RpcError, ServerSettings};

/// Typed reads of one model at a time.
pub mod service;
pub use service::{Record, Service, ServiceError};

/// Grouped counts over a model.
pub mod stats;

/// Ways of matching a task to its database.
pub mod strategy;
pub use strategy::{LinkStrategy, Strategy, TitleStrategy};

/// The join of tasks, databases, subscriptions and upgrade requests.
pub mod report;
pub use report::{MergedTask, Reporter, Table};

/// Persistent configuration.
pub mod storage;
pub use storage::ConfigStore;
