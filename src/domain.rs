//! Domain models for rolling-release reporting.
//!
//! This module contains the records read from the server (tasks, databases,
//! subscriptions and upgrade requests), the search filter combinator, and the
//! configuration keys.

/// Search filters and the combinators that build them.
pub mod filter;
pub use filter::{Domain, DomainError, Leaf, Operator, Term};

/// Configuration keys, defaults and value wrappers.
pub mod config;
pub use config::{ConfigValue, Settings, Wrapper};

pub(crate) mod fields;

mod flag;
pub use flag::{TripleFlag, YesNo};

mod task;
pub use task::Task;

mod database;
pub use database::Database;

mod subscription;
pub use subscription::Subscription;

mod upgrade_request;
pub use upgrade_request::UpgradeRequest;
