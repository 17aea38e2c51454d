//! Restriction expressions of CQL statements.
//!
//! This module provides:
//! - Expression tree representation and bindable terms
//! - Per-row evaluation of restrictions
//! - Restriction analysis into possible-value sets
//! - Secondary index applicability checks
//! - Tree rewriting

pub mod builder;
pub mod error;
pub mod eval;
pub mod expr;
pub mod index_support;
pub mod like;
pub mod operator;
pub mod restriction;
pub mod rewrite;
pub mod term;
pub mod value_set;

pub use builder::RestrictionBuilder;
pub use error::{on_internal_error, ExpressionError, ExpressionResult};
pub use eval::{is_satisfied_by, RestrictionEvaluator, RowData};
pub use expr::{
    make_conjunction, BinaryOperator, ColumnValue, ColumnValueTuple, Conjunction, Expression,
};
pub use index_support::{has_supporting_index, is_supported_by};
pub use operator::{ComparisonOrder, Operator};
pub use restriction::{
    extract_single_column_restrictions_for_column, find_atom, has_slice, is_on_collection,
    possible_lhs_values,
};
pub use rewrite::{
    replace_column_def, replace_token, resolve_identifiers, search_and_replace,
    try_search_and_replace,
};
pub use term::{BindMarker, BoundValues, QueryOptions, RawValue, Term};
pub use value_set::{intersection, to_range, Interval, IntervalBound, ValueSet};
