//! Per-row evaluation of restrictions.

use crate::expression::error::on_internal_error;
use crate::expression::like::like;
use crate::expression::{
    BinaryOperator, ColumnValue, ColumnValueTuple, ComparisonOrder, Expression, ExpressionError,
    ExpressionResult, Operator, QueryOptions, RawValue, Term,
};
use crate::schema::{ColumnDefinition, ColumnKind};
use crate::selection::{ResultRowView, Selection};
use crate::types::codec::{split_collection, split_map};
use crate::types::DataType;
use bytes::Bytes;
use std::cmp::Ordering;

/// Materialized values of one row
#[derive(Debug, Clone, Copy)]
pub struct RowData<'a> {
    pub partition_key: &'a [Bytes],
    pub clustering_key: &'a [Bytes],
    /// Non-primary-key values, positioned as in `selection`
    pub other_columns: &'a [Option<Bytes>],
    pub selection: &'a Selection,
}

/// Evaluator for restrictions against a single row
pub struct RestrictionEvaluator<'a> {
    row: RowData<'a>,
    options: &'a dyn QueryOptions,
}

impl<'a> RestrictionEvaluator<'a> {
    /// Create a new evaluator over a row
    pub fn new(row: RowData<'a>, options: &'a dyn QueryOptions) -> Self {
        Self { row, options }
    }

    /// True if the row satisfies `restriction`
    pub fn is_satisfied_by(&self, restriction: &Expression) -> ExpressionResult<bool> {
        match restriction {
            Expression::Constant(b) => Ok(*b),
            Expression::Conjunction(conj) => {
                for child in conj.children() {
                    if !self.is_satisfied_by(child)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expression::BinaryOperator(opr) => self.evaluate_binary_operator(opr),
            other => Err(on_internal_error(format!(
                "{} cannot serve as a restriction by itself",
                other
            ))),
        }
    }

    fn evaluate_binary_operator(&self, opr: &BinaryOperator) -> ExpressionResult<bool> {
        match opr.lhs.as_ref() {
            Expression::ColumnValue(cv) => self.evaluate_column(cv, opr),
            Expression::ColumnValueTuple(tuple) => self.evaluate_tuple(tuple, opr),
            // Token ranges are enforced by the scan bounds
            Expression::Token => Ok(true),
            other => Err(on_internal_error(format!(
                "{} is not a legal left-hand side of {}",
                other, opr.op
            ))),
        }
    }

    fn evaluate_column(&self, cv: &ColumnValue, opr: &BinaryOperator) -> ExpressionResult<bool> {
        match opr.op {
            Operator::Eq => self.equal(cv, &opr.rhs),
            Operator::Neq => Ok(!self.equal(cv, &opr.rhs)?),
            Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => self.limits(cv, opr),
            Operator::In => self.is_one_of(cv, &opr.rhs),
            Operator::Contains => self.contains(cv, &opr.rhs),
            Operator::ContainsKey => self.contains_key(cv, &opr.rhs),
            Operator::Like => self.like(cv, &opr.rhs),
            Operator::IsNot => Err(ExpressionError::unsupported(format!(
                "IS NOT restriction on column {}",
                cv.col.name
            ))),
        }
    }

    fn evaluate_tuple(&self, tuple: &ColumnValueTuple, opr: &BinaryOperator) -> ExpressionResult<bool> {
        let arity = tuple.elements.len();
        match opr.op {
            Operator::Eq => {
                let rhs = bind_tuple_rhs(&opr.rhs, self.options, arity)?;
                self.tuple_equals(tuple, &rhs)
            }
            Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
                let rhs = bind_tuple_rhs(&opr.rhs, self.options, arity)?;
                self.tuple_limits(tuple, opr.op, &rhs, opr.order)
            }
            Operator::In => {
                for candidate in opr.rhs.bind_tuple_in_values(self.options, arity)? {
                    if self.tuple_equals(tuple, &candidate)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            other => Err(ExpressionError::unsupported(format!(
                "multi-column relation with operator {}",
                other
            ))),
        }
    }

    /// Serialized value of a column in this row, resolving any subscript
    fn get_value(&self, cv: &ColumnValue) -> ExpressionResult<Option<Bytes>> {
        let Some(sub) = &cv.sub else {
            return self.column_value(&cv.col);
        };
        let DataType::Map(key_type, _) = cv.col.data_type.without_reversed() else {
            return Err(subscript_on_non_map(&cv.col));
        };
        let Some(map) = self.column_value(&cv.col)? else {
            return Ok(None);
        };
        let RawValue::Value(key) = sub.bind_and_get(self.options)? else {
            return Ok(None);
        };
        Ok(split_map(&map)?
            .into_iter()
            .find(|(k, _)| key_type.equal(k, &key))
            .map(|(_, v)| v))
    }

    fn column_value(&self, col: &ColumnDefinition) -> ExpressionResult<Option<Bytes>> {
        match col.kind {
            ColumnKind::PartitionKey => match self.row.partition_key.get(col.id) {
                Some(value) => Ok(Some(value.clone())),
                None => Err(on_internal_error(format!(
                    "partition key has no component {} for column {}",
                    col.id, col.name
                ))),
            },
            // Static rows carry no clustering key
            ColumnKind::ClusteringKey => Ok(self.row.clustering_key.get(col.id).cloned()),
            ColumnKind::Static | ColumnKind::Regular => {
                let index = self.row.selection.index_of(col).ok_or_else(|| {
                    on_internal_error(format!("column {} is not in the selection", col.name))
                })?;
                Ok(self.row.other_columns.get(index).cloned().flatten())
            }
        }
    }

    fn bind(&self, term: &Term) -> ExpressionResult<Option<Bytes>> {
        Ok(term.bind_and_get(self.options)?.into_bytes_opt())
    }

    fn equal(&self, cv: &ColumnValue, rhs: &Term) -> ExpressionResult<bool> {
        let ty = value_type(cv)?;
        let (Some(lhs), Some(rhs)) = (self.get_value(cv)?, self.bind(rhs)?) else {
            return Ok(false);
        };
        Ok(ty.equal(&lhs, &rhs))
    }

    fn limits(&self, cv: &ColumnValue, opr: &BinaryOperator) -> ExpressionResult<bool> {
        let ty = ordering_type(value_type(cv)?, opr.order);
        let (Some(lhs), Some(rhs)) = (self.get_value(cv)?, self.bind(&opr.rhs)?) else {
            return Ok(false);
        };
        ordering_satisfies(opr.op, ty.compare(&lhs, &rhs))
    }

    fn is_one_of(&self, cv: &ColumnValue, rhs: &Term) -> ExpressionResult<bool> {
        let ty = value_type(cv)?;
        let candidates = rhs.bind_in_values(self.options, &cv.col.name)?;
        let Some(lhs) = self.get_value(cv)? else {
            return Ok(false);
        };
        Ok(candidates.iter().flatten().any(|c| ty.equal(&lhs, c)))
    }

    fn contains(&self, cv: &ColumnValue, rhs: &Term) -> ExpressionResult<bool> {
        let ty = cv.col.data_type.without_reversed();
        let element_type = match ty.value_comparator() {
            Some(element_type) => element_type,
            None => {
                return Err(ExpressionError::invalid_request(format!(
                    "CONTAINS is only supported on collections, but column {} is {}",
                    cv.col.name, cv.col.data_type
                )))
            }
        };
        if cv.sub.is_some() {
            return Err(ExpressionError::unsupported(format!("CONTAINS lhs is subscripted: {}", cv)));
        }
        let Some(collection) = self.get_value(cv)? else {
            return Ok(false);
        };
        // A null needle matches any collection, kept for compatibility
        let Some(needle) = self.bind(rhs)? else {
            return Ok(true);
        };
        if ty.is_map() {
            Ok(split_map(&collection)?
                .iter()
                .any(|(_, v)| element_type.equal(v, &needle)))
        } else {
            Ok(split_collection(&collection)?
                .iter()
                .flatten()
                .any(|e| element_type.equal(e, &needle)))
        }
    }

    fn contains_key(&self, cv: &ColumnValue, rhs: &Term) -> ExpressionResult<bool> {
        let DataType::Map(key_type, _) = cv.col.data_type.without_reversed() else {
            return Err(ExpressionError::invalid_request(format!(
                "CONTAINS KEY is only supported on maps, but column {} is {}",
                cv.col.name, cv.col.data_type
            )));
        };
        if cv.sub.is_some() {
            return Err(ExpressionError::unsupported(format!(
                "CONTAINS KEY lhs is subscripted: {}",
                cv
            )));
        }
        // A null key holds even for a null map, kept for compatibility
        let Some(key) = self.bind(rhs)? else {
            return Ok(true);
        };
        let Some(map) = self.get_value(cv)? else {
            return Ok(false);
        };
        Ok(split_map(&map)?.iter().any(|(k, _)| key_type.equal(k, &key)))
    }

    fn like(&self, cv: &ColumnValue, rhs: &Term) -> ExpressionResult<bool> {
        let ty = value_type(cv)?;
        if !ty.is_string() {
            return Err(ExpressionError::invalid_request(format!(
                "LIKE is allowed only on string types, which {} is not",
                cv
            )));
        }
        let (Some(value), Some(pattern)) = (self.get_value(cv)?, self.bind(rhs)?) else {
            return Ok(false);
        };
        like(&pattern, &value)
    }

    fn tuple_equals(&self, tuple: &ColumnValueTuple, rhs: &[Option<Bytes>]) -> ExpressionResult<bool> {
        for (cv, r) in tuple.elements.iter().zip(rhs) {
            let ty = value_type(cv)?;
            let (Some(l), Some(r)) = (self.get_value(cv)?, r) else {
                return Ok(false);
            };
            if !ty.equal(&l, r) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Lexicographic comparison; the first differing component decides
    fn tuple_limits(
        &self,
        tuple: &ColumnValueTuple,
        op: Operator,
        rhs: &[Option<Bytes>],
        order: ComparisonOrder,
    ) -> ExpressionResult<bool> {
        for (cv, r) in tuple.elements.iter().zip(rhs) {
            let ty = ordering_type(value_type(cv)?, order);
            let (Some(l), Some(r)) = (self.get_value(cv)?, r) else {
                return Ok(false);
            };
            let ord = ty.compare(&l, r);
            if ord != Ordering::Equal {
                return ordering_satisfies(op, ord);
            }
        }
        Ok(matches!(op, Operator::Lte | Operator::Gte))
    }
}

/// Type whose ordering applies to a column reference
fn value_type(cv: &ColumnValue) -> ExpressionResult<&DataType> {
    match &cv.sub {
        None => Ok(&cv.col.data_type),
        Some(_) => match cv.col.data_type.without_reversed() {
            DataType::Map(_, value) => Ok(value),
            _ => Err(subscript_on_non_map(&cv.col)),
        },
    }
}

pub(crate) fn ordering_type(ty: &DataType, order: ComparisonOrder) -> &DataType {
    match order {
        ComparisonOrder::Cql => ty.without_reversed(),
        ComparisonOrder::Clustering => ty,
    }
}

fn subscript_on_non_map(col: &ColumnDefinition) -> ExpressionError {
    ExpressionError::invalid_request(format!("subscripting non-map column {}", col.name))
}

fn ordering_satisfies(op: Operator, ord: Ordering) -> ExpressionResult<bool> {
    match op {
        Operator::Lt => Ok(ord == Ordering::Less),
        Operator::Lte => Ok(ord != Ordering::Greater),
        Operator::Gt => Ok(ord == Ordering::Greater),
        Operator::Gte => Ok(ord != Ordering::Less),
        Operator::Eq => Ok(ord == Ordering::Equal),
        other => Err(on_internal_error(format!("{} is not a compare operator", other))),
    }
}

pub(crate) fn bind_tuple_rhs(rhs: &Term, options: &dyn QueryOptions, arity: usize) -> ExpressionResult<Vec<Option<Bytes>>> {
    let components = rhs.bind_tuple(options)?.ok_or_else(|| {
        ExpressionError::invalid_request(format!("multi-column relation expects a tuple, got {}", rhs))
    })?;
    if components.len() != arity {
        return Err(ExpressionError::invalid_request(format!(
            "Expected {} elements in value tuple, but got {}",
            arity,
            components.len()
        )));
    }
    Ok(components)
}

/// Check whether a row satisfies a restriction.
///
/// `static_row` and `row` hold the non-primary-key cells fetched for
/// `selection`; `row` is `None` for a partition with only static data.
pub fn is_satisfied_by(
    restriction: &Expression,
    partition_key: &[Bytes],
    clustering_key: &[Bytes],
    static_row: &ResultRowView,
    row: Option<&ResultRowView>,
    selection: &Selection,
    options: &dyn QueryOptions,
) -> ExpressionResult<bool> {
    let other_columns = selection.non_pk_values(static_row, row);
    let row = RowData {
        partition_key,
        clustering_key,
        other_columns: &other_columns,
        selection,
    };
    RestrictionEvaluator::new(row, options).is_satisfied_by(restriction)
}
