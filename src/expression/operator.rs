//! Relational operators of restrictions.

use std::fmt;

/// Operators a restriction can apply to its left-hand side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Contains,
    ContainsKey,
    IsNot,
    Like,
}

impl Operator {
    /// True for operators that bound a range: `<`, `<=`, `>`, `>=`
    pub fn is_slice(self) -> bool {
        matches!(self, Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte)
    }

    /// True for ordering-based operators: `=` and the slices
    pub fn is_compare(self) -> bool {
        self == Operator::Eq || self.is_slice()
    }

    /// Get the display string for this operator
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Neq => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::In => "IN",
            Operator::Contains => "CONTAINS",
            Operator::ContainsKey => "CONTAINS KEY",
            Operator::IsNot => "IS NOT",
            Operator::Like => "LIKE",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering a binary operator's comparison follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComparisonOrder {
    /// CQL ordering of the column's type
    #[default]
    Cql,
    /// Clustering order, which honors descending columns
    Clustering,
}
