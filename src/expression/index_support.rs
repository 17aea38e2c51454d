//! Secondary index applicability of restrictions.

use crate::expression::error::on_internal_error;
use crate::expression::{Expression, ExpressionResult};
use crate::schema::{AllowLocalIndex, IndexCatalog, SecondaryIndex};

/// True if `index` can serve every restriction in `expr`
pub fn is_supported_by(expr: &Expression, index: &SecondaryIndex) -> ExpressionResult<bool> {
    match expr {
        Expression::Conjunction(conj) => {
            for child in conj.children() {
                if !is_supported_by(child, index)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Expression::BinaryOperator(opr) => match opr.lhs.as_ref() {
            Expression::ColumnValue(cv) => Ok(index.supports_expression(&cv.col, opr.op)),
            // Multi-column restrictions always need filtering
            Expression::ColumnValueTuple(tuple) => match tuple.elements.as_slice() {
                [single] => Ok(index.supports_expression(&single.col, opr.op)),
                _ => Ok(false),
            },
            Expression::Token => Ok(false),
            other => Err(on_internal_error(format!(
                "{} is not a legal left-hand side of {}",
                other, opr.op
            ))),
        },
        _ => Ok(false),
    }
}

/// True if some index of `catalog` serves the whole of `expr`
pub fn has_supporting_index(
    expr: &Expression,
    catalog: &dyn IndexCatalog,
    allow_local: AllowLocalIndex,
) -> ExpressionResult<bool> {
    for index in catalog.list_indexes() {
        if allow_local == AllowLocalIndex::No && index.metadata().local {
            continue;
        }
        if is_supported_by(expr, &index)? {
            return Ok(true);
        }
    }
    Ok(false)
}
