//! Builder for assembling restrictions from column names and native values.
//!
//! Values are checked against the type of the restricted column and
//! serialized up front, so the resulting trees carry only bytes.

use crate::expression::{make_conjunction, BindMarker, ColumnValue, Expression, ExpressionError, ExpressionResult};
use crate::expression::{BinaryOperator, ComparisonOrder, Operator, RawValue, Term};
use crate::schema::{ColumnDefinition, Schema};
use crate::types::{serialize_value, DataType, Value};
use std::sync::Arc;

/// Builder for restrictions over the columns of one table
pub struct RestrictionBuilder<'a> {
    schema: &'a Schema,
}

impl<'a> RestrictionBuilder<'a> {
    /// Create a new builder for `schema`
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    fn column_definition(&self, name: &str) -> ExpressionResult<Arc<ColumnDefinition>> {
        self.schema
            .get_column_definition(name)
            .ok_or_else(|| ExpressionError::invalid_request(format!("Unknown identifier {}", name)))
    }

    /// Create a column reference expression
    pub fn column(&self, name: &str) -> ExpressionResult<Expression> {
        Ok(Expression::column(self.column_definition(name)?))
    }

    /// Create a map element reference (`name[key]`)
    pub fn subscript(&self, name: &str, key: impl Into<Value>) -> ExpressionResult<Expression> {
        let col = self.column_definition(name)?;
        let DataType::Map(key_type, _) = col.data_type.without_reversed() else {
            return Err(ExpressionError::invalid_request(format!(
                "subscripting non-map column {}",
                name
            )));
        };
        let key = literal(key.into(), key_type)?;
        Ok(Expression::ColumnValue(ColumnValue::with_subscript(col, key)))
    }

    /// Create a multi-column reference (`(a, b, ...)`)
    pub fn tuple(&self, names: &[&str]) -> ExpressionResult<Expression> {
        let columns = names
            .iter()
            .map(|name| self.column_definition(name))
            .collect::<ExpressionResult<Vec<_>>>()?;
        Ok(Expression::column_tuple(columns))
    }

    /// Create a partition token reference
    pub fn token() -> Expression {
        Expression::Token
    }

    /// Create a comparison against a literal
    pub fn compare(&self, lhs: Expression, op: Operator, value: impl Into<Value>) -> ExpressionResult<Expression> {
        let rhs = literal(value.into(), &lhs_type(&lhs)?)?;
        Ok(Expression::binary(lhs, op, rhs))
    }

    /// Create an equality comparison (lhs = value)
    pub fn eq(&self, lhs: Expression, value: impl Into<Value>) -> ExpressionResult<Expression> {
        self.compare(lhs, Operator::Eq, value)
    }

    /// Create a not-equal comparison (lhs != value)
    pub fn neq(&self, lhs: Expression, value: impl Into<Value>) -> ExpressionResult<Expression> {
        self.compare(lhs, Operator::Neq, value)
    }

    /// Create a less-than comparison (lhs < value)
    pub fn lt(&self, lhs: Expression, value: impl Into<Value>) -> ExpressionResult<Expression> {
        self.compare(lhs, Operator::Lt, value)
    }

    /// Create a less-than-or-equal comparison (lhs <= value)
    pub fn lte(&self, lhs: Expression, value: impl Into<Value>) -> ExpressionResult<Expression> {
        self.compare(lhs, Operator::Lte, value)
    }

    /// Create a greater-than comparison (lhs > value)
    pub fn gt(&self, lhs: Expression, value: impl Into<Value>) -> ExpressionResult<Expression> {
        self.compare(lhs, Operator::Gt, value)
    }

    /// Create a greater-than-or-equal comparison (lhs >= value)
    pub fn gte(&self, lhs: Expression, value: impl Into<Value>) -> ExpressionResult<Expression> {
        self.compare(lhs, Operator::Gte, value)
    }

    /// Create a comparison against a bind marker
    pub fn compare_marker(lhs: Expression, op: Operator, bind_index: usize) -> Expression {
        let marker = BindMarker::new(bind_index);
        let rhs = match lhs {
            Expression::ColumnValueTuple(_) => Term::TupleMarker(marker),
            _ => Term::Marker(marker),
        };
        Expression::binary(lhs, op, rhs)
    }

    /// Create an IN restriction over explicit values
    pub fn in_values(&self, lhs: Expression, values: Vec<Value>) -> ExpressionResult<Expression> {
        let ty = lhs_type(&lhs)?;
        let terms = values
            .into_iter()
            .map(|v| literal(v, &ty))
            .collect::<ExpressionResult<Vec<_>>>()?;
        Ok(Expression::binary(lhs, Operator::In, Term::InList(terms)))
    }

    /// Create an IN restriction bound to a single marker (`lhs IN ?`)
    pub fn in_marker(lhs: Expression, bind_index: usize) -> Expression {
        let marker = BindMarker::new(bind_index);
        let rhs = match lhs {
            Expression::ColumnValueTuple(_) => Term::TupleInMarker(marker),
            _ => Term::ListMarker(marker),
        };
        Expression::binary(lhs, Operator::In, rhs)
    }

    /// Create a CONTAINS restriction on a collection column
    pub fn contains(&self, name: &str, value: impl Into<Value>) -> ExpressionResult<Expression> {
        let col = self.column_definition(name)?;
        let element_type = col.data_type.value_comparator().ok_or_else(|| {
            ExpressionError::invalid_request(format!("CONTAINS on non-collection column {}", name))
        })?;
        let rhs = literal(value.into(), element_type)?;
        Ok(Expression::binary(Expression::column(col), Operator::Contains, rhs))
    }

    /// Create a CONTAINS KEY restriction on a map column
    pub fn contains_key(&self, name: &str, key: impl Into<Value>) -> ExpressionResult<Expression> {
        let col = self.column_definition(name)?;
        let DataType::Map(key_type, _) = col.data_type.without_reversed() else {
            return Err(ExpressionError::invalid_request(format!(
                "CONTAINS KEY on non-map column {}",
                name
            )));
        };
        let rhs = literal(key.into(), key_type)?;
        Ok(Expression::binary(Expression::column(col), Operator::ContainsKey, rhs))
    }

    /// Create a LIKE restriction
    pub fn like(&self, lhs: Expression, pattern: &str) -> ExpressionResult<Expression> {
        self.compare(lhs, Operator::Like, pattern)
    }

    /// Create an AND expression
    pub fn and(left: Expression, right: Expression) -> Expression {
        make_conjunction(left, right)
    }

    /// AND together every restriction; `TRUE` when there are none
    pub fn all(restrictions: Vec<Expression>) -> Expression {
        restrictions
            .into_iter()
            .reduce(make_conjunction)
            .unwrap_or(Expression::Constant(true))
    }

    /// Set the comparison order of a binary operator
    pub fn with_order(expr: Expression, order: ComparisonOrder) -> Expression {
        match expr {
            Expression::BinaryOperator(opr) => Expression::BinaryOperator(BinaryOperator { order, ..opr }),
            other => other,
        }
    }
}

/// Type a right-hand side value must have for `lhs`
fn lhs_type(lhs: &Expression) -> ExpressionResult<DataType> {
    match lhs {
        Expression::ColumnValue(cv) => column_value_type(cv),
        Expression::ColumnValueTuple(tuple) => Ok(DataType::Tuple(
            tuple
                .elements
                .iter()
                .map(column_value_type)
                .collect::<ExpressionResult<Vec<_>>>()?,
        )),
        Expression::Token => Ok(DataType::BigInt),
        other => Err(ExpressionError::invalid_request(format!(
            "{} cannot be restricted",
            other
        ))),
    }
}

fn column_value_type(cv: &ColumnValue) -> ExpressionResult<DataType> {
    match (&cv.sub, cv.col.data_type.without_reversed()) {
        (None, _) => Ok(cv.col.data_type.clone()),
        (Some(_), DataType::Map(_, value_type)) => Ok(value_type.as_ref().clone()),
        (Some(_), _) => Err(ExpressionError::invalid_request(format!(
            "subscripting non-map column {}",
            cv.col.name
        ))),
    }
}

/// Serialize `value` as a term of type `ty`; tuples keep their components
fn literal(value: Value, ty: &DataType) -> ExpressionResult<Term> {
    let checked = |value: &Value, ty: &DataType| {
        serialize_value(value, ty).map_err(|e| ExpressionError::invalid_request(e.to_string()))
    };
    match (value, ty.without_reversed()) {
        (Value::Tuple(components), DataType::Tuple(types)) => {
            if components.len() != types.len() {
                return Err(ExpressionError::invalid_request(format!(
                    "Expected {} elements in value tuple, but got {}",
                    types.len(),
                    components.len()
                )));
            }
            let terms = components
                .iter()
                .zip(types)
                .map(|(c, ty)| -> ExpressionResult<Term> {
                    match c {
                        Some(c) => Ok(Term::Constant(RawValue::Value(checked(c, ty)?))),
                        None => Ok(Term::null()),
                    }
                })
                .collect::<ExpressionResult<Vec<_>>>()?;
            Ok(Term::Tuple(terms))
        }
        (value, _) => Ok(Term::Constant(RawValue::Value(checked(&value, ty)?))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnKind;

    fn schema() -> Schema {
        Schema::new("ks", "events")
            .with_column("id", ColumnKind::PartitionKey, DataType::BigInt)
            .with_column("day", ColumnKind::ClusteringKey, DataType::Int)
            .with_column("seq", ColumnKind::ClusteringKey, DataType::reversed(DataType::Int))
            .with_column("kind", ColumnKind::Regular, DataType::Text)
            .with_column("labels", ColumnKind::Regular, DataType::map(DataType::Text, DataType::Int))
    }

    #[test]
    fn test_build_restrictions() -> anyhow::Result<()> {
        let schema = schema();
        let b = RestrictionBuilder::new(&schema);

        let expr = RestrictionBuilder::and(
            b.eq(b.column("id")?, 7i64)?,
            b.gt(b.tuple(&["day", "seq"])?, Value::Tuple(vec![Some(Value::Int(1)), Some(Value::Int(2))]))?,
        );
        assert_eq!(
            expr.to_string(),
            "((id) = 0x0000000000000007) AND (((day,seq)) > (0x00000001, 0x00000002))"
        );

        let label = b.eq(b.subscript("labels", "prio")?, 1)?;
        assert_eq!(label.to_string(), "(labels[0x7072696f]) = 0x00000001");

        let contains = b.contains_key("labels", "prio")?;
        assert_eq!(contains.to_string(), "(labels) CONTAINS KEY 0x7072696f");
        assert_eq!(b.like(b.column("kind")?, "a%")?.to_string(), "(kind) LIKE 0x6125");
        Ok(())
    }

    #[test]
    fn test_markers() -> anyhow::Result<()> {
        let schema = schema();
        let b = RestrictionBuilder::new(&schema);
        let scalar = RestrictionBuilder::in_marker(b.column("day")?, 0);
        assert!(matches!(
            scalar.as_binary_operator().map(|o| o.rhs.as_ref()),
            Some(Term::ListMarker(_))
        ));
        let multi = RestrictionBuilder::in_marker(b.tuple(&["day", "seq"])?, 1);
        assert!(matches!(
            multi.as_binary_operator().map(|o| o.rhs.as_ref()),
            Some(Term::TupleInMarker(_))
        ));
        let single = RestrictionBuilder::compare_marker(b.tuple(&["day"])?, Operator::Lt, 2);
        assert_eq!(single.to_string(), "((day)) < ?");
        Ok(())
    }

    #[test]
    fn test_type_errors() -> anyhow::Result<()> {
        let schema = schema();
        let b = RestrictionBuilder::new(&schema);
        assert!(matches!(b.column("nope"), Err(ExpressionError::InvalidRequest(_))));
        assert!(matches!(b.eq(b.column("day")?, "x"), Err(ExpressionError::InvalidRequest(_))));
        assert!(matches!(b.subscript("kind", "x"), Err(ExpressionError::InvalidRequest(_))));
        assert!(matches!(b.contains("kind", "x"), Err(ExpressionError::InvalidRequest(_))));
        assert!(matches!(
            b.eq(b.tuple(&["day", "seq"])?, Value::Tuple(vec![Some(Value::Int(1))])),
            Err(ExpressionError::InvalidRequest(_))
        ));
        Ok(())
    }

    #[test]
    fn test_all_and_order() -> anyhow::Result<()> {
        let schema = schema();
        let b = RestrictionBuilder::new(&schema);
        assert_eq!(RestrictionBuilder::all(vec![]), Expression::Constant(true));

        let seq = RestrictionBuilder::with_order(b.lt(b.column("seq")?, 3)?, ComparisonOrder::Clustering);
        assert_eq!(
            seq.as_binary_operator().map(|o| o.order),
            Some(ComparisonOrder::Clustering)
        );

        let both = RestrictionBuilder::all(vec![seq.clone(), b.in_values(b.column("day")?, vec![1.into(), 2.into()])?]);
        match both {
            Expression::Conjunction(conj) => assert_eq!(conj.children().len(), 2),
            other => panic!("expected a conjunction, got {}", other),
        }
        Ok(())
    }
}
