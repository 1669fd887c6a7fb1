/// The persistent key/value configuration table.
pub mod config_store;
pub use config_store::{ConfigStore, ConfigStoreError, Row};
