//! Column selection of a scan and the materialized row views it produces.

use crate::schema::{ColumnDefinition, ColumnKind, Schema};
use bytes::Bytes;
use std::sync::Arc;

/// Ordered list of the columns fetched by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    columns: Vec<Arc<ColumnDefinition>>,
}

impl Selection {
    pub fn new(columns: Vec<Arc<ColumnDefinition>>) -> Self {
        Self { columns }
    }

    /// Select every static and regular column of the schema
    pub fn non_pk_columns_of(schema: &Schema) -> Self {
        Self::new(schema.non_pk_columns().cloned().collect())
    }

    pub fn get_columns(&self) -> &[Arc<ColumnDefinition>] {
        &self.columns
    }

    /// Position of `column` in this selection
    pub fn index_of(&self, column: &ColumnDefinition) -> Option<usize> {
        self.columns.iter().position(|c| c.as_ref() == column)
    }

    /// Values of the selected non-primary-key columns for one row.
    ///
    /// The k-th element corresponds to the k-th selected column. Static
    /// columns take their cells from `static_row`, regular columns from
    /// `row`; both views hold cells in selection order. Without a regular row
    /// (a partition with only static data) regular columns are null.
    pub fn non_pk_values(&self, static_row: &ResultRowView, row: Option<&ResultRowView>) -> Vec<Option<Bytes>> {
        let mut static_cells = static_row.iter();
        let mut regular_cells = row.map(|r| r.iter());
        self.columns
            .iter()
            .map(|col| match col.kind {
                ColumnKind::Static => static_cells.next().flatten(),
                ColumnKind::Regular => regular_cells.as_mut().and_then(|cells| cells.next()).flatten(),
                ColumnKind::PartitionKey | ColumnKind::ClusteringKey => None,
            })
            .collect()
    }
}

/// Cells of either the static row or a clustering row, in selection order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultRowView {
    cells: Vec<Option<Bytes>>,
}

impl ResultRowView {
    pub fn new(cells: Vec<Option<Bytes>>) -> Self {
        Self { cells }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<Bytes>> + '_ {
        self.cells.iter().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Value};

    #[test]
    fn test_non_pk_values_interleave_static_and_regular() {
        let s1 = Arc::new(ColumnDefinition::static_column("s1", DataType::Int));
        let r1 = Arc::new(ColumnDefinition::regular("r1", DataType::Int));
        let s2 = Arc::new(ColumnDefinition::static_column("s2", DataType::Int));
        let r2 = Arc::new(ColumnDefinition::regular("r2", DataType::Int));
        let selection = Selection::new(vec![s1.clone(), r1.clone(), s2, r2.clone()]);

        let static_row = ResultRowView::new(vec![Some(Value::Int(1).serialize()), None]);
        let row = ResultRowView::new(vec![Some(Value::Int(10).serialize()), Some(Value::Int(20).serialize())]);

        let values = selection.non_pk_values(&static_row, Some(&row));
        assert_eq!(
            values,
            vec![
                Some(Value::Int(1).serialize()),
                Some(Value::Int(10).serialize()),
                None,
                Some(Value::Int(20).serialize()),
            ]
        );

        // Static-only partition: regular cells are null
        let values = selection.non_pk_values(&static_row, None);
        assert_eq!(values[1], None);
        assert_eq!(values[3], None);

        assert_eq!(selection.index_of(&r2), Some(3));
        assert_eq!(selection.index_of(&ColumnDefinition::regular("zz", DataType::Int)), None);
        assert_eq!(selection.index_of(&s1), Some(0));
        assert_eq!(selection.index_of(&r1), Some(1));
    }
}
