//! Restriction analysis: the values a column may take under a restriction.
//!
//! [`possible_lhs_values`] is sound but not always tight. Whenever a row is
//! accepted by [`is_satisfied_by`](crate::expression::is_satisfied_by), its
//! value for the analyzed column lies in the returned set; the set may still
//! admit values the restriction rejects, so callers filter afterwards.

use crate::expression::error::{on_internal_error, LOG_TARGET};
use crate::expression::eval::bind_tuple_rhs;
use crate::expression::value_set::{intersection, range_from_operator, to_sorted_value_list, ValueSet};
use crate::expression::{
    BinaryOperator, ColumnValue, ColumnValueTuple, ComparisonOrder, Expression, ExpressionError,
    ExpressionResult, Operator, QueryOptions,
};
use crate::schema::ColumnDefinition;
use crate::types::{DataType, Value};

/// Computes the value set of one column, or of the token when `column` is `None`
struct RestrictionAnalyzer<'a> {
    column: Option<&'a ColumnDefinition>,
    data_type: &'a DataType,
    options: &'a dyn QueryOptions,
}

impl<'a> RestrictionAnalyzer<'a> {
    fn possible_values(&self, expr: &Expression) -> ExpressionResult<ValueSet> {
        match expr {
            Expression::Constant(true) => Ok(ValueSet::unbounded()),
            Expression::Constant(false) => Ok(ValueSet::empty()),
            Expression::Conjunction(conj) => {
                let mut acc = ValueSet::unbounded();
                for child in conj.children() {
                    acc = intersection(acc, self.possible_values(child)?, self.data_type);
                }
                Ok(acc)
            }
            Expression::BinaryOperator(opr) => match opr.lhs.as_ref() {
                Expression::ColumnValue(cv) => self.column_values(cv, opr),
                Expression::ColumnValueTuple(tuple) => self.tuple_values(tuple, opr),
                Expression::Token => self.token_values(opr),
                other => Err(on_internal_error(format!(
                    "{} is not a legal left-hand side of {}",
                    other, opr.op
                ))),
            },
            other => Err(on_internal_error(format!(
                "{} cannot serve as a restriction by itself",
                other
            ))),
        }
    }

    fn column_values(&self, cv: &ColumnValue, opr: &BinaryOperator) -> ExpressionResult<ValueSet> {
        let Some(target) = self.column else {
            return Ok(ValueSet::unbounded());
        };
        if cv.col.as_ref() != target || cv.sub.is_some() {
            return Ok(ValueSet::unbounded());
        }
        if opr.op.is_compare() {
            let Some(value) = opr.rhs.bind_and_get(self.options)?.into_bytes_opt() else {
                return Ok(ValueSet::empty());
            };
            if opr.op == Operator::Eq {
                return Ok(ValueSet::List(vec![value]));
            }
            let op = cql_order_operator(opr.op, opr.order, &cv.col.data_type);
            return Ok(ValueSet::Range(range_from_operator(op, value)?));
        }
        if opr.op == Operator::In {
            let values = opr
                .rhs
                .bind_in_values(self.options, &cv.col.name)?
                .into_iter()
                .flatten()
                .collect();
            return Ok(to_sorted_value_list(values, self.data_type));
        }
        Ok(ValueSet::unbounded())
    }

    fn tuple_values(&self, tuple: &ColumnValueTuple, opr: &BinaryOperator) -> ExpressionResult<ValueSet> {
        let Some(target) = self.column else {
            return Ok(ValueSet::unbounded());
        };
        let Some(k) = tuple.elements.iter().position(|cv| cv.col.as_ref() == target) else {
            return Ok(ValueSet::unbounded());
        };
        let arity = tuple.elements.len();
        if opr.op.is_compare() {
            let mut components = bind_tuple_rhs(&opr.rhs, self.options, arity)?;
            let component = components.swap_remove(k);
            if opr.op == Operator::Eq {
                return Ok(component.map_or_else(ValueSet::empty, |v| ValueSet::List(vec![v])));
            }
            // Lexicographic order bounds only the leading column
            if k > 0 {
                return Ok(ValueSet::unbounded());
            }
            let Some(value) = component else {
                return Ok(ValueSet::empty());
            };
            let mut op = cql_order_operator(opr.op, opr.order, &tuple.elements[0].col.data_type);
            if arity > 1 {
                // (a, b) > (1, 2) admits a = 1, so a strict bound would drop matching rows
                op = match op {
                    Operator::Gt => Operator::Gte,
                    Operator::Lt => Operator::Lte,
                    other => other,
                };
            }
            return Ok(ValueSet::Range(range_from_operator(op, value)?));
        }
        if opr.op == Operator::In {
            let values = opr
                .rhs
                .bind_tuple_in_values(self.options, arity)?
                .into_iter()
                .filter_map(|mut t| t.swap_remove(k))
                .collect();
            return Ok(to_sorted_value_list(values, self.data_type));
        }
        Ok(ValueSet::unbounded())
    }

    fn token_values(&self, opr: &BinaryOperator) -> ExpressionResult<ValueSet> {
        if self.column.is_some() {
            return Ok(ValueSet::unbounded());
        }
        let Some(value) = opr.rhs.bind_and_get(self.options)?.into_bytes_opt() else {
            return Ok(ValueSet::empty());
        };
        match opr.op {
            Operator::Eq => Ok(ValueSet::List(vec![value])),
            Operator::Gt | Operator::Gte => Ok(ValueSet::Range(range_from_operator(opr.op, value)?)),
            Operator::Lt | Operator::Lte => {
                // An upper bound of the minimum token reads as the maximum token
                let value = if value == Value::BigInt(i64::MIN).serialize() {
                    Value::BigInt(i64::MAX).serialize()
                } else {
                    value
                };
                Ok(ValueSet::Range(range_from_operator(opr.op, value)?))
            }
            other => Err(ExpressionError::unsupported(format!(
                "token restriction with operator {}",
                other
            ))),
        }
    }
}

/// Slice operator in CQL order for a comparison made in `order`.
///
/// Clustering order inverts the comparison of descending columns, so the
/// operator is mirrored to stay sound against the CQL-ordered value set.
fn cql_order_operator(op: Operator, order: ComparisonOrder, column_type: &DataType) -> Operator {
    if order == ComparisonOrder::Cql || !column_type.is_reversed() {
        return op;
    }
    match op {
        Operator::Lt => Operator::Gt,
        Operator::Lte => Operator::Gte,
        Operator::Gt => Operator::Lt,
        Operator::Gte => Operator::Lte,
        other => other,
    }
}

/// Values `column` may take for rows satisfying `expr`.
///
/// With `column == None` the partition token is analyzed instead.
pub fn possible_lhs_values(
    column: Option<&ColumnDefinition>,
    expr: &Expression,
    options: &dyn QueryOptions,
) -> ExpressionResult<ValueSet> {
    let data_type = match column {
        Some(col) => col.value_comparator(),
        None => &DataType::BigInt,
    };
    let analyzer = RestrictionAnalyzer {
        column,
        data_type,
        options,
    };
    let values = analyzer.possible_values(expr)?;
    log::trace!(
        target: LOG_TARGET,
        "possible values of {}: {}",
        column.map_or("token", |c| c.name_as_text()),
        values
    );
    Ok(values)
}

/// First binary operator in `expr` matching `pred`
pub fn find_atom<'e, F>(expr: &'e Expression, pred: F) -> Option<&'e BinaryOperator>
where
    F: Fn(&BinaryOperator) -> bool + Copy,
{
    match expr {
        Expression::BinaryOperator(opr) if pred(opr) => Some(opr),
        Expression::Conjunction(conj) => conj.children().iter().find_map(|c| find_atom(c, pred)),
        _ => None,
    }
}

/// True if `expr` holds a slice restriction anywhere
pub fn has_slice(expr: &Expression) -> bool {
    find_atom(expr, |opr| opr.op.is_slice()).is_some()
}

/// True if the restriction tests collection contents or elements
pub fn is_on_collection(opr: &BinaryOperator) -> bool {
    if matches!(opr.op, Operator::Contains | Operator::ContainsKey) {
        return true;
    }
    match opr.lhs.as_ref() {
        Expression::ColumnValueTuple(tuple) => tuple.elements.iter().any(|cv| cv.sub.is_some()),
        _ => false,
    }
}

/// Every restriction in `expr` whose left-hand side is exactly `column`
pub fn extract_single_column_restrictions_for_column(
    expr: &Expression,
    column: &ColumnDefinition,
) -> ExpressionResult<Vec<Expression>> {
    let mut found = Vec::new();
    collect_column_restrictions(expr, column, &mut found)?;
    Ok(found)
}

fn collect_column_restrictions(
    expr: &Expression,
    column: &ColumnDefinition,
    found: &mut Vec<Expression>,
) -> ExpressionResult<()> {
    match expr {
        Expression::Conjunction(conj) => {
            for child in conj.children() {
                collect_column_restrictions(child, column, found)?;
            }
        }
        Expression::BinaryOperator(opr) => match opr.lhs.as_ref() {
            Expression::ColumnValue(cv) if cv.col.as_ref() == column => found.push(expr.clone()),
            Expression::BinaryOperator(_) => {
                return Err(on_internal_error("binary operators cannot be nested"));
            }
            _ => {}
        },
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::expr::{CollectionConstructor, CollectionStyle};
    use crate::expression::value_set::{Interval, IntervalBound};
    use crate::expression::{make_conjunction, BindMarker, BoundValues, RawValue, Term};
    use bytes::Bytes;
    use std::sync::Arc;

    fn int(i: i32) -> Bytes {
        Value::Int(i).serialize()
    }

    fn token(t: i64) -> Bytes {
        Value::BigInt(t).serialize()
    }

    fn columns() -> (Arc<ColumnDefinition>, Arc<ColumnDefinition>) {
        (
            Arc::new(ColumnDefinition::clustering_key("a", 0, DataType::Int)),
            Arc::new(ColumnDefinition::clustering_key("b", 1, DataType::Int)),
        )
    }

    fn analyze(column: &ColumnDefinition, expr: &Expression) -> ExpressionResult<ValueSet> {
        possible_lhs_values(Some(column), expr, &BoundValues::none())
    }

    fn restrict(col: &Arc<ColumnDefinition>, op: Operator, value: i32) -> Expression {
        Expression::binary(Expression::column(col.clone()), op, Term::value(value))
    }

    #[test]
    fn test_scalar_restrictions() -> anyhow::Result<()> {
        let (a, b) = columns();
        assert_eq!(analyze(&a, &restrict(&a, Operator::Eq, 3))?, ValueSet::List(vec![int(3)]));
        assert_eq!(
            analyze(&a, &restrict(&a, Operator::Gt, 3))?,
            ValueSet::Range(Interval::make_starting_with(IntervalBound::new(int(3), false)))
        );
        assert!(analyze(&a, &restrict(&b, Operator::Eq, 3))?.is_unbounded());
        assert!(analyze(&a, &restrict(&a, Operator::Neq, 3))?.is_unbounded());

        let null = Expression::binary(Expression::column(a.clone()), Operator::Lt, Term::null());
        assert!(analyze(&a, &null)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_in_and_conjunction() -> anyhow::Result<()> {
        let (a, _) = columns();
        let in_list = Expression::binary(
            Expression::column(a.clone()),
            Operator::In,
            Term::InList(vec![Term::value(5), Term::value(1), Term::null(), Term::value(5), Term::value(9)]),
        );
        assert_eq!(analyze(&a, &in_list)?, ValueSet::List(vec![int(1), int(5), int(9)]));

        let bounded = make_conjunction(in_list, restrict(&a, Operator::Lte, 5));
        assert_eq!(analyze(&a, &bounded)?, ValueSet::List(vec![int(1), int(5)]));

        let disjoint = make_conjunction(restrict(&a, Operator::Gt, 5), restrict(&a, Operator::Lt, 2));
        assert!(analyze(&a, &disjoint)?.is_empty());
        assert!(analyze(&a, &Expression::Constant(false))?.is_empty());
        Ok(())
    }

    #[test]
    fn test_in_marker() -> anyhow::Result<()> {
        let (a, _) = columns();
        let expr = Expression::binary(Expression::column(a.clone()), Operator::In, Term::ListMarker(BindMarker::new(0)));
        let options = BoundValues::new(vec![RawValue::from(Value::List(vec![Value::Int(2), Value::Int(-4)]))]);
        assert_eq!(
            possible_lhs_values(Some(&a), &expr, &options)?,
            ValueSet::List(vec![int(-4), int(2)])
        );
        let options = BoundValues::new(vec![RawValue::Unset]);
        assert!(matches!(
            possible_lhs_values(Some(&a), &expr, &options),
            Err(ExpressionError::InvalidRequest(_))
        ));
        Ok(())
    }

    #[test]
    fn test_tuple_restrictions() -> anyhow::Result<()> {
        let (a, b) = columns();
        let ab = || Expression::column_tuple([a.clone(), b.clone()]);
        let tuple = Term::Tuple(vec![Term::value(2), Term::value(3)]);

        let eq = Expression::binary(ab(), Operator::Eq, tuple.clone());
        assert_eq!(analyze(&b, &eq)?, ValueSet::List(vec![int(3)]));

        let gt = Expression::binary(ab(), Operator::Gt, tuple.clone());
        assert_eq!(
            analyze(&a, &gt)?,
            ValueSet::Range(Interval::make_starting_with(IntervalBound::new(int(2), true)))
        );
        assert!(analyze(&b, &gt)?.is_unbounded());

        let single = Expression::binary(
            Expression::column_tuple([a.clone()]),
            Operator::Gt,
            Term::Tuple(vec![Term::value(2)]),
        );
        assert_eq!(
            analyze(&a, &single)?,
            ValueSet::Range(Interval::make_starting_with(IntervalBound::new(int(2), false)))
        );

        let in_list = Expression::binary(
            ab(),
            Operator::In,
            Term::InList(vec![tuple, Term::Tuple(vec![Term::value(1), Term::value(7)])]),
        );
        assert_eq!(analyze(&b, &in_list)?, ValueSet::List(vec![int(3), int(7)]));
        assert_eq!(analyze(&a, &in_list)?, ValueSet::List(vec![int(1), int(2)]));
        Ok(())
    }

    #[test]
    fn test_tuple_in_marker() -> anyhow::Result<()> {
        let (a, b) = columns();
        let expr = Expression::binary(
            Expression::column_tuple([a.clone(), b.clone()]),
            Operator::In,
            Term::TupleInMarker(BindMarker::new(0)),
        );
        let tuples = Value::List(vec![
            Value::Tuple(vec![Some(Value::Int(5)), Some(Value::Int(2))]),
            Value::Tuple(vec![Some(Value::Int(3)), None]),
            Value::Tuple(vec![Some(Value::Int(1)), Some(Value::Int(2))]),
        ]);
        let options = BoundValues::new(vec![RawValue::from(tuples)]);
        assert_eq!(
            possible_lhs_values(Some(&a), &expr, &options)?,
            ValueSet::List(vec![int(1), int(3), int(5)])
        );
        // The null component of (3, null) contributes nothing
        assert_eq!(possible_lhs_values(Some(&b), &expr, &options)?, ValueSet::List(vec![int(2)]));

        let options = BoundValues::new(vec![RawValue::Null]);
        assert!(matches!(
            possible_lhs_values(Some(&a), &expr, &options),
            Err(ExpressionError::InvalidRequest(_))
        ));
        Ok(())
    }

    #[test]
    fn test_clustering_order_on_descending_column() -> anyhow::Result<()> {
        let desc = Arc::new(ColumnDefinition::clustering_key("d", 0, DataType::reversed(DataType::Int)));
        let expr = Expression::from(
            BinaryOperator::new(Expression::column(desc.clone()), Operator::Gt, Term::value(4))
                .with_order(ComparisonOrder::Clustering),
        );
        assert_eq!(
            analyze(&desc, &expr)?,
            ValueSet::Range(Interval::make_ending_with(IntervalBound::new(int(4), false)))
        );
        Ok(())
    }

    #[test]
    fn test_token_restrictions() -> anyhow::Result<()> {
        let options = BoundValues::none();
        let tok = |op, t: i64| Expression::binary(Expression::Token, op, Term::value(t));

        assert_eq!(
            possible_lhs_values(None, &tok(Operator::Lt, i64::MIN), &options)?,
            ValueSet::Range(Interval::make_ending_with(IntervalBound::new(token(i64::MAX), false)))
        );
        assert_eq!(
            possible_lhs_values(None, &tok(Operator::Lte, i64::MIN), &options)?,
            ValueSet::Range(Interval::make_ending_with(IntervalBound::new(token(i64::MAX), true)))
        );

        // Bounds that are not well-formed tokens pass through untouched
        let short = Expression::binary(
            Expression::Token,
            Operator::Lt,
            Term::Constant(RawValue::Value(Bytes::from_static(&[1, 2, 3]))),
        );
        assert_eq!(
            possible_lhs_values(None, &short, &options)?,
            ValueSet::Range(Interval::make_ending_with(IntervalBound::new(
                Bytes::from_static(&[1, 2, 3]),
                false
            )))
        );

        let window = make_conjunction(tok(Operator::Gt, -10), tok(Operator::Lte, 10));
        let set = possible_lhs_values(None, &window, &options)?;
        assert!(set.contains(&token(10), &DataType::BigInt));
        assert!(!set.contains(&token(-10), &DataType::BigInt));

        // Token restrictions say nothing about regular columns
        let (a, _) = columns();
        assert!(analyze(&a, &window)?.is_unbounded());
        assert!(matches!(
            possible_lhs_values(None, &tok(Operator::Neq, 0), &options),
            Err(ExpressionError::UnsupportedOperation(_))
        ));
        Ok(())
    }

    #[test]
    fn test_structural_errors() {
        let (a, _) = columns();
        assert!(analyze(&a, &Expression::column(a.clone())).unwrap_err().is_internal());
        let bad_lhs = Expression::binary(Expression::Null, Operator::Eq, Term::value(1));
        assert!(analyze(&a, &bad_lhs).unwrap_err().is_internal());

        let malformed = Expression::CollectionConstructor(CollectionConstructor {
            style: CollectionStyle::Map,
            elements: vec![Expression::Null],
        });
        assert!(analyze(&a, &malformed).unwrap_err().is_internal());
        let err = possible_lhs_values(None, &malformed, &BoundValues::none()).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_atoms() -> anyhow::Result<()> {
        let (a, b) = columns();
        let expr = make_conjunction(restrict(&a, Operator::Eq, 1), restrict(&b, Operator::Gte, 2));
        assert!(has_slice(&expr));
        assert!(!has_slice(&restrict(&a, Operator::Eq, 1)));
        assert_eq!(
            find_atom(&expr, |o| o.op == Operator::Gte).map(|o| o.op),
            Some(Operator::Gte)
        );

        let restrictions = extract_single_column_restrictions_for_column(&expr, &b)?;
        assert_eq!(restrictions, vec![restrict(&b, Operator::Gte, 2)]);

        let m = Arc::new(ColumnDefinition::regular("m", DataType::map(DataType::Int, DataType::Int)));
        let contains = BinaryOperator::new(Expression::column(m.clone()), Operator::ContainsKey, Term::value(1));
        assert!(is_on_collection(&contains));
        let element = BinaryOperator::new(
            Expression::ColumnValueTuple(ColumnValueTuple {
                elements: vec![ColumnValue::with_subscript(m, Term::value(1))],
            }),
            Operator::Eq,
            Term::Tuple(vec![Term::value(1)]),
        );
        assert!(is_on_collection(&element));
        assert!(!is_on_collection(restrict(&a, Operator::Eq, 1).as_binary_operator().unwrap()));
        Ok(())
    }
}
