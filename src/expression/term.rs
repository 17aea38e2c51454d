//! Bindable right-hand sides of restrictions.
//!
//! A `Term` resolves to serialized bytes once the bind values of the query
//! are known. The IN variants are told apart at construction time: an
//! explicit list of terms (`a IN (1, 2)`) binds element by element, while a
//! marker (`a IN ?`) binds to one serialized list that is split afterwards.

use crate::expression::error::on_internal_error;
use crate::expression::{ExpressionError, ExpressionResult};
use crate::types::codec::{build_collection, build_tuple, split_collection, split_tuple};
use crate::types::Value;
use bytes::Bytes;
use std::fmt;

/// A bound value as sent by the client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawValue {
    Null,
    Unset,
    Value(Bytes),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, RawValue::Unset)
    }

    /// The serialized value; null and unset both yield `None`
    pub fn into_bytes_opt(self) -> Option<Bytes> {
        match self {
            RawValue::Value(bytes) => Some(bytes),
            RawValue::Null | RawValue::Unset => None,
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        RawValue::Value(value.serialize())
    }
}

impl From<Option<Bytes>> for RawValue {
    fn from(value: Option<Bytes>) -> Self {
        value.map_or(RawValue::Null, RawValue::Value)
    }
}

/// Supplies the values bound to a statement's markers
pub trait QueryOptions {
    fn bound_value(&self, bind_index: usize) -> ExpressionResult<RawValue>;
}

/// Bind values held in memory, indexed by marker position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundValues {
    values: Vec<RawValue>,
}

impl BoundValues {
    pub fn new(values: Vec<RawValue>) -> Self {
        Self { values }
    }

    /// Options for statements without markers
    pub fn none() -> Self {
        Self::default()
    }
}

impl QueryOptions for BoundValues {
    fn bound_value(&self, bind_index: usize) -> ExpressionResult<RawValue> {
        self.values.get(bind_index).cloned().ok_or_else(|| {
            ExpressionError::invalid_request(format!(
                "No value bound for marker {} ({} values supplied)",
                bind_index,
                self.values.len()
            ))
        })
    }
}

/// Position of a `?` marker in the statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindMarker {
    pub index: usize,
}

impl BindMarker {
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

/// Right-hand side of a restriction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A literal, already serialized
    Constant(RawValue),
    /// `?` bound to a single value
    Marker(BindMarker),
    /// `(t1, t2, ...)` tuple literal
    Tuple(Vec<Term>),
    /// `?` bound to a serialized tuple
    TupleMarker(BindMarker),
    /// Explicit IN list `(t1, t2, ...)`
    InList(Vec<Term>),
    /// `a IN ?`, bound to a serialized list of values
    ListMarker(BindMarker),
    /// `(a, b) IN ?`, bound to a serialized list of tuples
    TupleInMarker(BindMarker),
}

impl Term {
    pub fn value(value: impl Into<Value>) -> Self {
        Term::Constant(RawValue::from(value.into()))
    }

    pub fn null() -> Self {
        Term::Constant(RawValue::Null)
    }

    /// Bind and return a single serialized value.
    ///
    /// Tuple and IN-list literals serialize their bound elements.
    pub fn bind_and_get(&self, options: &dyn QueryOptions) -> ExpressionResult<RawValue> {
        match self {
            Term::Constant(value) => Ok(value.clone()),
            Term::Marker(marker)
            | Term::TupleMarker(marker)
            | Term::ListMarker(marker)
            | Term::TupleInMarker(marker) => options.bound_value(marker.index),
            Term::Tuple(elements) => {
                let components = bind_elements(elements, options)?;
                Ok(RawValue::Value(build_tuple(components)))
            }
            Term::InList(elements) => {
                let values = bind_elements(elements, options)?;
                Ok(RawValue::Value(build_collection(values)))
            }
        }
    }

    /// Bind a tuple-valued term and return its components.
    ///
    /// Returns `None` if this term does not produce a tuple, including a tuple
    /// marker bound to null or unset.
    pub fn bind_tuple(&self, options: &dyn QueryOptions) -> ExpressionResult<Option<Vec<Option<Bytes>>>> {
        match self {
            Term::Tuple(elements) => Ok(Some(bind_elements(elements, options)?)),
            Term::TupleMarker(marker) => match options.bound_value(marker.index)? {
                RawValue::Value(bytes) => Ok(Some(split_tuple(&bytes)?)),
                RawValue::Null | RawValue::Unset => Ok(None),
            },
            Term::Constant(_)
            | Term::Marker(_)
            | Term::InList(_)
            | Term::ListMarker(_)
            | Term::TupleInMarker(_) => Ok(None),
        }
    }

    /// Bind the right-hand side of a single-column IN.
    ///
    /// Null elements of the list stay `None`; a marker bound to null or unset
    /// is rejected.
    pub fn bind_in_values(&self, options: &dyn QueryOptions, column: &str) -> ExpressionResult<Vec<Option<Bytes>>> {
        match self {
            Term::InList(elements) => bind_elements(elements, options),
            Term::ListMarker(marker) => match options.bound_value(marker.index)? {
                RawValue::Value(bytes) => Ok(split_collection(&bytes)?),
                RawValue::Null => Err(ExpressionError::invalid_request(format!(
                    "Invalid null value for column {}",
                    column
                ))),
                RawValue::Unset => Err(ExpressionError::invalid_request(format!(
                    "Invalid unset value for column {}",
                    column
                ))),
            },
            other => Err(on_internal_error(format!("IN right-hand side is not a list: {}", other))),
        }
    }

    /// Bind the right-hand side of a multi-column IN into tuples of `arity`
    pub fn bind_tuple_in_values(
        &self,
        options: &dyn QueryOptions,
        arity: usize,
    ) -> ExpressionResult<Vec<Vec<Option<Bytes>>>> {
        let tuples = match self {
            Term::InList(elements) => elements
                .iter()
                .map(|e| {
                    e.bind_tuple(options)?.ok_or_else(|| {
                        ExpressionError::invalid_request(format!("IN list element {} is not a tuple", e))
                    })
                })
                .collect::<ExpressionResult<Vec<_>>>()?,
            Term::TupleInMarker(marker) => match options.bound_value(marker.index)? {
                RawValue::Value(bytes) => split_collection(&bytes)?
                    .into_iter()
                    .map(|element| match element {
                        Some(tuple) => Ok(split_tuple(&tuple)?),
                        None => Err(ExpressionError::invalid_request("Invalid null value in IN tuple list")),
                    })
                    .collect::<ExpressionResult<Vec<_>>>()?,
                RawValue::Null | RawValue::Unset => {
                    return Err(ExpressionError::invalid_request("Invalid null value for IN tuple list"))
                }
            },
            other => {
                return Err(on_internal_error(format!(
                    "multi-column IN right-hand side is not a list: {}",
                    other
                )))
            }
        };
        if let Some(bad) = tuples.iter().find(|t| t.len() != arity) {
            return Err(ExpressionError::invalid_request(format!(
                "Expected {} elements in value tuple, but got {}",
                arity,
                bad.len()
            )));
        }
        Ok(tuples)
    }

    pub fn contains_bind_marker(&self) -> bool {
        match self {
            Term::Constant(_) => false,
            Term::Marker(_) | Term::TupleMarker(_) | Term::ListMarker(_) | Term::TupleInMarker(_) => {
                true
            }
            Term::Tuple(elements) | Term::InList(elements) => {
                elements.iter().any(Term::contains_bind_marker)
            }
        }
    }
}

fn bind_elements(elements: &[Term], options: &dyn QueryOptions) -> ExpressionResult<Vec<Option<Bytes>>> {
    elements
        .iter()
        .map(|e| e.bind_and_get(options).map(RawValue::into_bytes_opt))
        .collect()
}

/// Hex rendering of a serialized value
pub(crate) fn fmt_bytes(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    write!(f, "0x")?;
    for b in bytes {
        write!(f, "{:02x}", b)?;
    }
    Ok(())
}

fn fmt_list(f: &mut fmt::Formatter<'_>, elements: &[Term]) -> fmt::Result {
    write!(f, "(")?;
    for (i, e) in elements.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", e)?;
    }
    write!(f, ")")
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Constant(RawValue::Value(bytes)) => fmt_bytes(f, bytes),
            Term::Constant(RawValue::Null) => write!(f, "null"),
            Term::Constant(RawValue::Unset) => write!(f, "unset"),
            Term::Marker(_) | Term::TupleMarker(_) | Term::ListMarker(_) | Term::TupleInMarker(_) => {
                write!(f, "?")
            }
            Term::Tuple(elements) | Term::InList(elements) => fmt_list(f, elements),
        }
    }
}
