//! Possible-value sets of a restricted column.
//!
//! A value set is either a discrete, sorted list of serialized values or a
//! single non-wrapping interval. All ordering goes through the column's
//! [`DataType`] comparator, never raw byte order.

use crate::expression::error::on_internal_error;
use crate::expression::term::fmt_bytes;
use crate::expression::{ExpressionResult, Operator};
use crate::types::DataType;
use bytes::Bytes;
use std::cmp::Ordering;
use std::fmt;

/// One end of an interval
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntervalBound {
    pub value: Bytes,
    pub inclusive: bool,
}

impl IntervalBound {
    pub fn new(value: Bytes, inclusive: bool) -> Self {
        Self { value, inclusive }
    }
}

/// Interval over serialized values; `None` means unbounded on that side
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    pub start: Option<IntervalBound>,
    pub end: Option<IntervalBound>,
}

impl Interval {
    /// Create `[value, value]`
    pub fn make_singular(value: Bytes) -> Self {
        Self {
            start: Some(IntervalBound::new(value.clone(), true)),
            end: Some(IntervalBound::new(value, true)),
        }
    }

    pub fn make_starting_with(bound: IntervalBound) -> Self {
        Self {
            start: Some(bound),
            end: None,
        }
    }

    pub fn make_ending_with(bound: IntervalBound) -> Self {
        Self {
            start: None,
            end: Some(bound),
        }
    }

    pub fn make_open_ended_both_sides() -> Self {
        Self { start: None, end: None }
    }

    pub fn is_full(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// True if the interval holds exactly one value
    pub fn is_singular(&self, data_type: &DataType) -> bool {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => {
                start.inclusive && end.inclusive && data_type.equal(&start.value, &end.value)
            }
            _ => false,
        }
    }

    pub fn contains(&self, value: &[u8], data_type: &DataType) -> bool {
        if let Some(start) = &self.start {
            match data_type.compare(value, &start.value) {
                Ordering::Less => return false,
                Ordering::Equal if !start.inclusive => return false,
                _ => {}
            }
        }
        if let Some(end) = &self.end {
            match data_type.compare(value, &end.value) {
                Ordering::Greater => return false,
                Ordering::Equal if !end.inclusive => return false,
                _ => {}
            }
        }
        true
    }

    /// Intersect two intervals; `None` if they are disjoint
    pub fn intersection(&self, other: &Interval, data_type: &DataType) -> Option<Interval> {
        let start = tighter_bound(&self.start, &other.start, data_type, Ordering::Greater);
        let end = tighter_bound(&self.end, &other.end, data_type, Ordering::Less);
        if let (Some(s), Some(e)) = (&start, &end) {
            match data_type.compare(&s.value, &e.value) {
                Ordering::Greater => return None,
                Ordering::Equal if !(s.inclusive && e.inclusive) => return None,
                _ => {}
            }
        }
        Some(Interval { start, end })
    }
}

/// Pick the more restrictive of two bounds on the same side. `prefer` is the
/// ordering that makes the first bound tighter. On a tie, exclusive wins.
fn tighter_bound(
    a: &Option<IntervalBound>,
    b: &Option<IntervalBound>,
    data_type: &DataType,
    prefer: Ordering,
) -> Option<IntervalBound> {
    match (a, b) {
        (None, None) => None,
        (Some(x), None) | (None, Some(x)) => Some(x.clone()),
        (Some(x), Some(y)) => {
            let ord = data_type.compare(&x.value, &y.value);
            if ord == Ordering::Equal {
                Some(IntervalBound::new(x.value.clone(), x.inclusive && y.inclusive))
            } else if ord == prefer {
                Some(x.clone())
            } else {
                Some(y.clone())
            }
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.start {
            Some(b) => {
                f.write_str(if b.inclusive { "[" } else { "(" })?;
                fmt_bytes(f, &b.value)?;
            }
            None => f.write_str("(-inf")?,
        }
        f.write_str(", ")?;
        match &self.end {
            Some(b) => {
                fmt_bytes(f, &b.value)?;
                f.write_str(if b.inclusive { "]" } else { ")" })
            }
            None => f.write_str("+inf)"),
        }
    }
}

/// Values a column may take under a restriction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueSet {
    /// Sorted, deduplicated values
    List(Vec<Bytes>),
    Range(Interval),
}

impl ValueSet {
    /// No value satisfies the restriction
    pub fn empty() -> Self {
        ValueSet::List(Vec::new())
    }

    /// Nothing is known about the column
    pub fn unbounded() -> Self {
        ValueSet::Range(Interval::make_open_ended_both_sides())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ValueSet::List(values) if values.is_empty())
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, ValueSet::Range(interval) if interval.is_full())
    }

    /// True if `value` belongs to this set
    pub fn contains(&self, value: &[u8], data_type: &DataType) -> bool {
        match self {
            ValueSet::List(values) => values.iter().any(|v| data_type.equal(v, value)),
            ValueSet::Range(interval) => interval.contains(value, data_type),
        }
    }
}

impl fmt::Display for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSet::List(values) => {
                f.write_str("{")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt_bytes(f, v)?;
                }
                f.write_str("}")
            }
            ValueSet::Range(interval) => write!(f, "{}", interval),
        }
    }
}

/// Sort `values` by the type's ordering and drop duplicates
pub fn to_sorted_value_list(mut values: Vec<Bytes>, data_type: &DataType) -> ValueSet {
    values.sort_by(|a, b| data_type.compare(a, b));
    values.dedup_by(|a, b| data_type.equal(a, b));
    ValueSet::List(values)
}

/// Intersect two value sets under the ordering of `data_type`
pub fn intersection(a: ValueSet, b: ValueSet, data_type: &DataType) -> ValueSet {
    match (a, b) {
        (ValueSet::List(left), ValueSet::List(right)) => {
            let mut common = Vec::with_capacity(left.len().min(right.len()));
            let (mut i, mut j) = (0, 0);
            while i < left.len() && j < right.len() {
                match data_type.compare(&left[i], &right[j]) {
                    Ordering::Less => i += 1,
                    Ordering::Greater => j += 1,
                    Ordering::Equal => {
                        common.push(left[i].clone());
                        i += 1;
                        j += 1;
                    }
                }
            }
            ValueSet::List(common)
        }
        (ValueSet::List(values), ValueSet::Range(interval))
        | (ValueSet::Range(interval), ValueSet::List(values)) => ValueSet::List(
            values
                .into_iter()
                .filter(|v| interval.contains(v, data_type))
                .collect(),
        ),
        (ValueSet::Range(left), ValueSet::Range(right)) => match left.intersection(&right, data_type) {
            Some(interval) => ValueSet::Range(interval),
            None => ValueSet::empty(),
        },
    }
}

/// Convert a value set into a single interval.
///
/// Only ranges and one-element lists can be converted.
pub fn to_range(set: &ValueSet) -> ExpressionResult<Interval> {
    match set {
        ValueSet::Range(interval) => Ok(interval.clone()),
        ValueSet::List(values) if values.len() == 1 => Ok(Interval::make_singular(values[0].clone())),
        ValueSet::List(values) => Err(on_internal_error(format!(
            "to_range called on a list of {} values",
            values.len()
        ))),
    }
}

/// Interval admitted by `op value` for a compare operator
pub fn range_from_operator(op: Operator, value: Bytes) -> ExpressionResult<Interval> {
    match op {
        Operator::Eq => Ok(Interval::make_singular(value)),
        Operator::Gt => Ok(Interval::make_starting_with(IntervalBound::new(value, false))),
        Operator::Gte => Ok(Interval::make_starting_with(IntervalBound::new(value, true))),
        Operator::Lt => Ok(Interval::make_ending_with(IntervalBound::new(value, false))),
        Operator::Lte => Ok(Interval::make_ending_with(IntervalBound::new(value, true))),
        other => Err(on_internal_error(format!("{} is not a compare operator", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn int(i: i32) -> Bytes {
        Value::Int(i).serialize()
    }

    fn list(values: &[i32]) -> ValueSet {
        to_sorted_value_list(values.iter().map(|v| int(*v)).collect(), &DataType::Int)
    }

    fn range(op: Operator, v: i32) -> ValueSet {
        ValueSet::Range(range_from_operator(op, int(v)).unwrap())
    }

    #[test]
    fn test_sorted_value_list() {
        // -1 sorts before 2 under int ordering, though not bytewise
        assert_eq!(list(&[2, -1, 2, 0]), ValueSet::List(vec![int(-1), int(0), int(2)]));
    }

    #[test]
    fn test_list_intersections() {
        let ty = DataType::Int;
        assert_eq!(intersection(list(&[1, 2, 3]), list(&[2, 3, 4]), &ty), list(&[2, 3]));
        assert_eq!(intersection(list(&[1, 2, 3]), range(Operator::Gt, 1), &ty), list(&[2, 3]));
        assert_eq!(intersection(range(Operator::Lte, 2), list(&[1, 2, 3]), &ty), list(&[1, 2]));
        assert!(intersection(list(&[1]), list(&[2]), &ty).is_empty());
    }

    #[test]
    fn test_range_intersections() {
        let ty = DataType::Int;
        let both = intersection(range(Operator::Gte, -5), range(Operator::Lt, 7), &ty);
        assert_eq!(
            both,
            ValueSet::Range(Interval {
                start: Some(IntervalBound::new(int(-5), true)),
                end: Some(IntervalBound::new(int(7), false)),
            })
        );
        assert_eq!(both.to_string(), "[0xfffffffb, 0x00000007)");

        // Touching bounds survive only when both sides are inclusive
        let point = intersection(range(Operator::Gte, 3), range(Operator::Lte, 3), &ty);
        assert!(matches!(&point, ValueSet::Range(i) if i.is_singular(&ty)));
        assert!(intersection(range(Operator::Gt, 3), range(Operator::Lte, 3), &ty).is_empty());
        assert!(intersection(range(Operator::Gt, 5), range(Operator::Lt, 3), &ty).is_empty());

        // Equal bounds on the same side: exclusive wins
        let tie = intersection(range(Operator::Gt, 3), range(Operator::Gte, 3), &ty);
        assert_eq!(tie, range(Operator::Gt, 3));
    }

    #[test]
    fn test_identities() {
        let ty = DataType::Int;
        for set in [list(&[1, 4]), range(Operator::Lt, 0), ValueSet::empty()] {
            assert_eq!(intersection(ValueSet::unbounded(), set.clone(), &ty), set);
            assert!(intersection(ValueSet::empty(), set, &ty).is_empty());
        }
    }

    #[test]
    fn test_reversed_type_ordering() {
        let ty = DataType::reversed(DataType::Int);
        assert_eq!(
            to_sorted_value_list(vec![int(1), int(3), int(2)], &ty),
            ValueSet::List(vec![int(3), int(2), int(1)])
        );
        let interval = range_from_operator(Operator::Gt, int(2)).unwrap();
        assert!(interval.contains(&int(1), &ty));
        assert!(!interval.contains(&int(3), &ty));
    }

    #[test]
    fn test_to_range() -> anyhow::Result<()> {
        assert_eq!(to_range(&list(&[4]))?, Interval::make_singular(int(4)));
        assert!(to_range(&ValueSet::unbounded())?.is_full());
        let err = to_range(&list(&[1, 2])).unwrap_err();
        assert!(err.is_internal());
        assert!(range_from_operator(Operator::Like, int(1)).unwrap_err().is_internal());
        Ok(())
    }

    #[test]
    fn test_display() {
        assert_eq!(ValueSet::unbounded().to_string(), "(-inf, +inf)");
        assert_eq!(list(&[1, 2]).to_string(), "{0x00000001, 0x00000002}");
        assert_eq!(range(Operator::Lte, 1).to_string(), "(-inf, 0x00000001]");
    }
}
