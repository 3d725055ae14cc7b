//! Schema catalog: table names plus optional free-text context for ranking

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("table not registered: {0}")]
    UnknownTable(String),

    #[error("table registered twice: {0}")]
    DuplicateTable(String),
}

/// Static description of one table in the store.
///
/// `context` is optional ranking metadata, not required for correctness; a
/// descriptor without it is ranked on its name alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub context: Option<String>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: None,
        }
    }

    pub fn with_context(name: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: Some(context.into()),
        }
    }

    /// Text handed to the embedding service for this descriptor.
    pub fn embedding_text(&self) -> String {
        match &self.context {
            Some(context) => format!("{}: {}", self.name, context),
            None => self.name.clone(),
        }
    }
}

/// In-memory registry of table descriptors. Built once at startup;
/// descriptors are immutable after registration and iteration order is
/// registration order.
#[derive(Debug, Default, Clone)]
pub struct SchemaCatalog {
    tables: Vec<TableDescriptor>,
    by_name: HashMap<String, usize>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptors: Vec<TableDescriptor>) -> Result<(), CatalogError> {
        for descriptor in descriptors {
            if self.by_name.contains_key(&descriptor.name) {
                return Err(CatalogError::DuplicateTable(descriptor.name));
            }
            self.by_name.insert(descriptor.name.clone(), self.tables.len());
            self.tables.push(descriptor);
        }
        Ok(())
    }

    pub fn describe(&self, name: &str) -> Result<&TableDescriptor, CatalogError> {
        self.by_name
            .get(name)
            .map(|&i| &self.tables[i])
            .ok_or_else(|| CatalogError::UnknownTable(name.to_string()))
    }

    /// All descriptors, in registration order.
    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
