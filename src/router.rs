//! Table routing.
//!
//! Maps the table name of a request onto the query to run and the transform
//! that prepares its parameters.
use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    config::MiscConfig,
    transform::{Transform, TransformError},
};

/// A lookup table exposed to the MTA.
#[derive(Clone)]
pub struct TableDefinition {
    name: String,
    query: String,
    transform_name: String,
    transform: Arc<dyn Transform>,
}

impl TableDefinition {
    pub fn new(
        name: impl Into<String>,
        query: impl Into<String>,
        transform_name: impl Into<String>,
        transform: Arc<dyn Transform>,
    ) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            transform_name: transform_name.into(),
            transform,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn transform_name(&self) -> &str {
        &self.transform_name
    }

    /// Parameters to bind into [`query`](Self::query) for `key`.
    pub fn parameters(&self, key: &str, misc: &MiscConfig) -> Result<Vec<String>, TransformError> {
        self.transform.apply(key, misc)
    }
}

impl fmt::Debug for TableDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableDefinition")
            .field("name", &self.name)
            .field("query", &self.query)
            .field("transform", &self.transform_name)
            .finish()
    }
}

/// Immutable set of tables, keyed by exact name.
#[derive(Debug, Clone, Default)]
pub struct TableRouter {
    tables: HashMap<String, TableDefinition>,
}

impl TableRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, returning the definition it replaced, if any.
    pub fn insert(&mut self, table: TableDefinition) -> Option<TableDefinition> {
        self.tables.insert(table.name.clone(), table)
    }

    pub fn resolve(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.get(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl FromIterator<TableDefinition> for TableRouter {
    fn from_iter<I: IntoIterator<Item = TableDefinition>>(iter: I) -> Self {
        let mut router = TableRouter::new();
        for table in iter {
            router.insert(table);
        }
        router
    }
}
