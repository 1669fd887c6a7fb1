//! Typed queries against one model at a time.
//!
//! A [`Service`] is built fluently (filter, fields, limit) and then fetched.
//! Each record type declares the model it is read from through [`Record`].

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::{
    domain::{Database, Domain, DomainError, Subscription, Task, UpgradeRequest, filter},
    rpc::{Connector, Model, RpcError},
    stats::{self, Grouping, StatRow},
};

/// A record type backed by a remote model.
pub trait Record: DeserializeOwned {
    /// Technical name of the model.
    const MODEL: &'static str;

    /// Post-processes fetched records.
    #[must_use]
    fn clean(records: Vec<Self>) -> Vec<Self> {
        records
    }
}

impl Record for Task {
    const MODEL: &'static str = "project.task";
}

impl Record for Database {
    const MODEL: &'static str = "openerp.enterprise.database";
}

impl Record for Subscription {
    const MODEL: &'static str = "sale.order";
}

impl Record for UpgradeRequest {
    const MODEL: &'static str = "upgrade.request";

    fn clean(records: Vec<Self>) -> Vec<Self> {
        Self::latest_per_database(records)
    }
}

/// Errors raised while fetching records.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The remote call failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The filter could not be built.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A returned record did not match the expected shape.
    #[error("failed to decode {model} record")]
    Decode {
        /// Model being read.
        model: &'static str,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// A query on the model behind `T`.
pub struct Service<'c, T> {
    connector: &'c dyn Connector,
    domains: Vec<Domain>,
    fields: Vec<String>,
    limit: Option<u32>,
    record: PhantomData<T>,
}

impl<'c, T: Record> Service<'c, T> {
    /// An unfiltered query reading only `id`.
    #[must_use]
    pub fn new(connector: &'c dyn Connector) -> Self {
        Self {
            connector,
            domains: Vec::new(),
            fields: vec!["id".to_string()],
            limit: None,
            record: PhantomData,
        }
    }

    /// Narrows the query; successive filters are AND-ed together.
    #[must_use]
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domains.push(domain);
        self
    }

    /// Reads these fields in addition to the ones already requested.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            if !self.fields.contains(&field) {
                self.fields.push(field);
            }
        }
        self
    }

    /// Caps the number of records.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The effective filter.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the filters is malformed.
    pub fn domain(&self) -> Result<Domain, DomainError> {
        match self.domains.as_slice() {
            [] => Ok(Domain::new()),
            [only] => Ok(only.clone()),
            many => filter::and(many),
        }
    }

    fn model(&self) -> Model<'c> {
        Model::new(self.connector, T::MODEL)
    }

    /// Runs the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or a record cannot be decoded.
    pub fn fetch(&self) -> Result<Vec<T>, ServiceError> {
        let rows = self
            .model()
            .search_read(&self.domain()?, &self.fields, self.limit)?;
        tracing::debug!(model = T::MODEL, count = rows.len(), "fetched records");

        let records = rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|source| ServiceError::Decode {
                model: T::MODEL,
                source,
            })?;
        Ok(T::clean(records))
    }

    /// Counts matching records grouped by `field`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub fn fetch_group(&self, field: &str, grouping: Grouping) -> Result<Vec<StatRow>, ServiceError> {
        let group_by = vec![field.to_string()];
        let rows = self
            .model()
            .read_group(&self.domain()?, &group_by, &group_by, self.limit)?;
        Ok(stats::collect(&rows, field, grouping))
    }
}
