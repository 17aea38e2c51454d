//! Bottom-up rewriting of expression trees.
//!
//! Rewrites never touch their input; they build a new tree that shares
//! columns and terms with the original through `Arc`.

use crate::expression::error::{on_internal_error, LOG_TARGET};
use crate::expression::expr::{
    Cast, CollectionConstructor, ColumnMutationAttribute, FieldSelection, FunctionCall, TupleConstructor,
    UsertypeConstructor,
};
use crate::expression::{
    BinaryOperator, ColumnValue, Conjunction, Expression, ExpressionError, ExpressionResult,
};
use crate::schema::{ColumnDefinition, Schema};
use std::convert::Infallible;
use std::sync::Arc;

/// Rewrite `expr`, offering every node to `replace` before descending.
///
/// When `replace` returns a node, it is used verbatim and the original
/// subtree is not visited. Otherwise the node is rebuilt from its rewritten
/// children. The first error aborts the rewrite.
pub fn try_search_and_replace<E, F>(expr: &Expression, replace: &mut F) -> Result<Expression, E>
where
    F: FnMut(&Expression) -> Result<Option<Expression>, E>,
{
    if let Some(replacement) = replace(expr)? {
        return Ok(replacement);
    }
    let rewritten = match expr {
        Expression::Conjunction(conj) => {
            Expression::Conjunction(Conjunction::new(rewrite_all(conj.children(), replace)?))
        }
        Expression::BinaryOperator(opr) => Expression::BinaryOperator(BinaryOperator {
            lhs: Box::new(try_search_and_replace(&opr.lhs, replace)?),
            op: opr.op,
            rhs: opr.rhs.clone(),
            order: opr.order,
        }),
        Expression::ColumnMutationAttribute(cma) => {
            Expression::ColumnMutationAttribute(ColumnMutationAttribute {
                kind: cma.kind,
                column: Box::new(try_search_and_replace(&cma.column, replace)?),
            })
        }
        Expression::FunctionCall(fc) => Expression::FunctionCall(FunctionCall {
            func: fc.func.clone(),
            args: rewrite_all(&fc.args, replace)?,
        }),
        Expression::Cast(c) => Expression::Cast(Cast {
            arg: Box::new(try_search_and_replace(&c.arg, replace)?),
            cast_type: c.cast_type.clone(),
        }),
        Expression::FieldSelection(fs) => Expression::FieldSelection(FieldSelection {
            structure: Box::new(try_search_and_replace(&fs.structure, replace)?),
            field: fs.field.clone(),
        }),
        Expression::TupleConstructor(tc) => Expression::TupleConstructor(TupleConstructor {
            elements: rewrite_all(&tc.elements, replace)?,
        }),
        Expression::CollectionConstructor(cc) => Expression::CollectionConstructor(CollectionConstructor {
            style: cc.style,
            elements: rewrite_all(&cc.elements, replace)?,
        }),
        Expression::UsertypeConstructor(uc) => {
            let mut elements = std::collections::BTreeMap::new();
            for (field, value) in &uc.elements {
                elements.insert(field.clone(), try_search_and_replace(value, replace)?);
            }
            Expression::UsertypeConstructor(UsertypeConstructor { elements })
        }
        Expression::Constant(_)
        | Expression::ColumnValue(_)
        | Expression::ColumnValueTuple(_)
        | Expression::Token
        | Expression::UnresolvedIdentifier(_)
        | Expression::Null
        | Expression::BindVariable(_)
        | Expression::UntypedConstant(_) => expr.clone(),
    };
    Ok(rewritten)
}

fn rewrite_all<E, F>(elements: &[Expression], replace: &mut F) -> Result<Vec<Expression>, E>
where
    F: FnMut(&Expression) -> Result<Option<Expression>, E>,
{
    elements
        .iter()
        .map(|e| try_search_and_replace(e, replace))
        .collect()
}

/// Infallible form of [`try_search_and_replace`]
pub fn search_and_replace<F>(expr: &Expression, mut replace: F) -> Expression
where
    F: FnMut(&Expression) -> Option<Expression>,
{
    match try_search_and_replace::<Infallible, _>(expr, &mut |e| Ok(replace(e))) {
        Ok(rewritten) => rewritten,
        Err(never) => match never {},
    }
}

/// Point every column reference at `new_column`, keeping subscripts
pub fn replace_column_def(expr: &Expression, new_column: &Arc<ColumnDefinition>) -> ExpressionResult<Expression> {
    try_search_and_replace(expr, &mut |e| match e {
        Expression::ColumnValue(cv) => Ok(Some(Expression::ColumnValue(ColumnValue {
            col: new_column.clone(),
            sub: cv.sub.clone(),
        }))),
        Expression::ColumnValueTuple(_) => Err(on_internal_error(format!(
            "cannot replace the column definition of a column tuple with {}",
            new_column.name
        ))),
        _ => Ok(None),
    })
}

/// Substitute `column` for every token pseudo-column
pub fn replace_token(expr: &Expression, column: &Arc<ColumnDefinition>) -> Expression {
    search_and_replace(expr, |e| match e {
        Expression::Token => Some(Expression::column(column.clone())),
        _ => None,
    })
}

/// Resolve every unresolved identifier against the columns of `schema`
pub fn resolve_identifiers(expr: &Expression, schema: &Schema) -> ExpressionResult<Expression> {
    try_search_and_replace(expr, &mut |e| match e {
        Expression::UnresolvedIdentifier(ui) => match schema.get_column_definition(&ui.ident) {
            Some(col) => Ok(Some(Expression::column(col))),
            None => {
                log::debug!(
                    target: LOG_TARGET,
                    "identifier {} not found in {}.{}",
                    ui.ident,
                    schema.keyspace,
                    schema.table
                );
                Err(ExpressionError::invalid_request(format!("Unknown identifier {}", ui.ident)))
            }
        },
        _ => Ok(None),
    })
}
