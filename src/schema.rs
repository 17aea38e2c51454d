//! Table schema: column definitions and secondary indexes.

pub mod column;
pub mod index;

pub use column::{ColumnDefinition, ColumnKind};
pub use index::{
    AllowLocalIndex, IndexCatalog, IndexMetadata, IndexTargetKind, SecondaryIndex,
    SecondaryIndexManager,
};

use crate::types::DataType;
use std::sync::Arc;

/// Columns of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub keyspace: String,
    pub table: String,
    columns: Vec<Arc<ColumnDefinition>>,
}

impl Schema {
    pub fn new(keyspace: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            table: table.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column; key columns get the next free position of their kind
    pub fn with_column(mut self, name: impl Into<String>, kind: ColumnKind, data_type: DataType) -> Self {
        let id = match kind {
            ColumnKind::PartitionKey | ColumnKind::ClusteringKey => {
                self.columns.iter().filter(|c| c.kind == kind).count()
            }
            ColumnKind::Static | ColumnKind::Regular => 0,
        };
        self.columns
            .push(Arc::new(ColumnDefinition::new(name, kind, id, data_type)));
        self
    }

    pub fn columns(&self) -> &[Arc<ColumnDefinition>] {
        &self.columns
    }

    pub fn get_column_definition(&self, name: &str) -> Option<Arc<ColumnDefinition>> {
        self.columns.iter().find(|c| c.name == name).cloned()
    }

    /// Static and regular columns, in definition order
    pub fn non_pk_columns(&self) -> impl Iterator<Item = &Arc<ColumnDefinition>> {
        self.columns.iter().filter(|c| !c.is_primary_key())
    }
}
