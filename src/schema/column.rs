//! Column definitions.

use crate::types::DataType;
use std::fmt;

/// Where a column lives in the row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    PartitionKey,
    ClusteringKey,
    Static,
    Regular,
}

/// Definition of a single table column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnDefinition {
    pub name: String,
    pub kind: ColumnKind,
    /// Position inside the partition or clustering key; 0 for other columns
    pub id: usize,
    pub data_type: DataType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, kind: ColumnKind, id: usize, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            kind,
            id,
            data_type,
        }
    }

    pub fn partition_key(name: impl Into<String>, id: usize, data_type: DataType) -> Self {
        Self::new(name, ColumnKind::PartitionKey, id, data_type)
    }

    pub fn clustering_key(name: impl Into<String>, id: usize, data_type: DataType) -> Self {
        Self::new(name, ColumnKind::ClusteringKey, id, data_type)
    }

    pub fn static_column(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, ColumnKind::Static, 0, data_type)
    }

    pub fn regular(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, ColumnKind::Regular, 0, data_type)
    }

    pub fn name_as_text(&self) -> &str {
        &self.name
    }

    pub fn is_primary_key(&self) -> bool {
        matches!(self.kind, ColumnKind::PartitionKey | ColumnKind::ClusteringKey)
    }

    /// Type used to compare this column's fetched values
    pub fn value_comparator(&self) -> &DataType {
        self.data_type.without_reversed()
    }
}

impl fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
