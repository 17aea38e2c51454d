//! Secondary index metadata and the index catalog.

use crate::expression::Operator;
use crate::schema::ColumnDefinition;
use parking_lot::RwLock;
use std::sync::Arc;

/// Which part of the target column an index covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexTargetKind {
    /// Plain value of a non-collection column
    Regular,
    /// Map keys
    Keys,
    /// List/set elements or map values
    Values,
    /// Map entries, queried as `m[k] = v`
    Entries,
    /// Whole frozen collection
    Full,
}

/// Information about an index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexMetadata {
    /// Name of the index
    pub name: String,
    /// Name of the indexed column
    pub target_column: String,
    pub kind: IndexTargetKind,
    /// Whether the index is local to a partition
    pub local: bool,
}

impl IndexMetadata {
    pub fn new(name: impl Into<String>, target_column: impl Into<String>, kind: IndexTargetKind) -> Self {
        Self {
            name: name.into(),
            target_column: target_column.into(),
            kind,
            local: false,
        }
    }

    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }
}

/// A secondary index over one column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecondaryIndex {
    metadata: IndexMetadata,
}

impl SecondaryIndex {
    pub fn new(metadata: IndexMetadata) -> Self {
        Self { metadata }
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    /// True iff a lookup in this index can serve `column <op> ...`
    pub fn supports_expression(&self, column: &ColumnDefinition, op: Operator) -> bool {
        if column.name != self.metadata.target_column {
            return false;
        }
        match self.metadata.kind {
            IndexTargetKind::Regular | IndexTargetKind::Full | IndexTargetKind::Entries => {
                op == Operator::Eq
            }
            IndexTargetKind::Values => op == Operator::Contains,
            IndexTargetKind::Keys => op == Operator::ContainsKey,
        }
    }
}

/// Source of the indexes defined on a table
pub trait IndexCatalog {
    fn list_indexes(&self) -> Vec<Arc<SecondaryIndex>>;
}

/// Whether local indexes may be considered when looking for a supporting index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowLocalIndex {
    No,
    Yes,
}

/// Thread-safe in-memory registry of a table's secondary indexes
#[derive(Debug, Default)]
pub struct SecondaryIndexManager {
    indexes: RwLock<Vec<Arc<SecondaryIndex>>>,
}

impl SecondaryIndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an index; an index with the same name is replaced
    pub fn add_index(&self, metadata: IndexMetadata) -> Arc<SecondaryIndex> {
        let index = Arc::new(SecondaryIndex::new(metadata));
        let mut indexes = self.indexes.write();
        indexes.retain(|i| i.metadata.name != index.metadata.name);
        indexes.push(index.clone());
        index
    }

    /// Remove an index by name, returning whether it existed
    pub fn drop_index(&self, name: &str) -> bool {
        let mut indexes = self.indexes.write();
        let before = indexes.len();
        indexes.retain(|i| i.metadata.name != name);
        indexes.len() != before
    }

    pub fn get_index(&self, name: &str) -> Option<Arc<SecondaryIndex>> {
        self.indexes
            .read()
            .iter()
            .find(|i| i.metadata.name == name)
            .cloned()
    }
}

impl IndexCatalog for SecondaryIndexManager {
    fn list_indexes(&self) -> Vec<Arc<SecondaryIndex>> {
        self.indexes.read().clone()
    }
}
