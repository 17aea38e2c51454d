//! Column data types and their ordering over serialized values.

use crate::types::codec::{split_collection, split_map, split_tuple};
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use std::cmp::Ordering;
use std::fmt;

/// Data types a column (or a collection element) can have
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    Int,
    BigInt,
    Double,
    Ascii,
    Text,
    Blob,
    List(Box<DataType>),
    Set(Box<DataType>),
    Map(Box<DataType>, Box<DataType>),
    Tuple(Vec<DataType>),
    /// Descending clustering order over the inner type
    Reversed(Box<DataType>),
}

impl DataType {
    pub fn list(element: DataType) -> Self {
        DataType::List(Box::new(element))
    }

    pub fn set(element: DataType) -> Self {
        DataType::Set(Box::new(element))
    }

    pub fn map(key: DataType, value: DataType) -> Self {
        DataType::Map(Box::new(key), Box::new(value))
    }

    pub fn reversed(inner: DataType) -> Self {
        DataType::Reversed(Box::new(inner))
    }

    /// Strip any number of `Reversed` wrappers
    pub fn without_reversed(&self) -> &DataType {
        match self {
            DataType::Reversed(inner) => inner.without_reversed(),
            other => other,
        }
    }

    pub fn is_reversed(&self) -> bool {
        matches!(self, DataType::Reversed(_))
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self.without_reversed(),
            DataType::List(_) | DataType::Set(_) | DataType::Map(..)
        )
    }

    pub fn is_map(&self) -> bool {
        matches!(self.without_reversed(), DataType::Map(..))
    }

    pub fn is_set(&self) -> bool {
        matches!(self.without_reversed(), DataType::Set(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.without_reversed(), DataType::List(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self.without_reversed(), DataType::Ascii | DataType::Text)
    }

    /// Type ordering the "names" of a collection: set elements or map keys
    pub fn name_comparator(&self) -> Option<&DataType> {
        match self.without_reversed() {
            DataType::Set(element) => Some(element),
            DataType::Map(key, _) => Some(key),
            _ => None,
        }
    }

    /// Type ordering the values of a collection: list/set elements or map values
    pub fn value_comparator(&self) -> Option<&DataType> {
        match self.without_reversed() {
            DataType::List(element) | DataType::Set(element) => Some(element),
            DataType::Map(_, value) => Some(value),
            _ => None,
        }
    }

    /// Three-way comparison of two serialized values of this type.
    ///
    /// Empty values sort before any non-empty value. Encodings that cannot be
    /// decoded fall back to bytewise order so the result is always total.
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        if let DataType::Reversed(inner) = self {
            return inner.compare(b, a);
        }
        match (a.is_empty(), b.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        match self {
            DataType::Boolean | DataType::Ascii | DataType::Text | DataType::Blob => a.cmp(b),
            DataType::Int => {
                if a.len() == 4 && b.len() == 4 {
                    BigEndian::read_i32(a).cmp(&BigEndian::read_i32(b))
                } else {
                    compare_raw(a, b)
                }
            }
            DataType::BigInt => {
                if a.len() == 8 && b.len() == 8 {
                    BigEndian::read_i64(a).cmp(&BigEndian::read_i64(b))
                } else {
                    compare_raw(a, b)
                }
            }
            DataType::Double => {
                if a.len() == 8 && b.len() == 8 {
                    BigEndian::read_f64(a).total_cmp(&BigEndian::read_f64(b))
                } else {
                    compare_raw(a, b)
                }
            }
            DataType::List(element) | DataType::Set(element) => {
                let (Ok(left), Ok(right)) = (
                    split_collection(&Bytes::copy_from_slice(a)),
                    split_collection(&Bytes::copy_from_slice(b)),
                ) else {
                    return compare_raw(a, b);
                };
                compare_components(left.iter().map(|e| (element.as_ref(), e)), right.iter())
            }
            DataType::Map(key, value) => {
                let (Ok(left), Ok(right)) = (
                    split_map(&Bytes::copy_from_slice(a)),
                    split_map(&Bytes::copy_from_slice(b)),
                ) else {
                    return compare_raw(a, b);
                };
                for ((lk, lv), (rk, rv)) in left.iter().zip(right.iter()) {
                    let cmp = key.compare(lk, rk).then_with(|| value.compare(lv, rv));
                    if cmp != Ordering::Equal {
                        return cmp;
                    }
                }
                left.len().cmp(&right.len())
            }
            DataType::Tuple(types) => {
                let (Ok(left), Ok(right)) = (
                    split_tuple(&Bytes::copy_from_slice(a)),
                    split_tuple(&Bytes::copy_from_slice(b)),
                ) else {
                    return compare_raw(a, b);
                };
                if left.len() > types.len() || right.len() > types.len() {
                    return compare_raw(a, b);
                }
                compare_components(types.iter().zip(left.iter()), right.iter())
            }
            DataType::Reversed(_) => unreachable!("reversed types are handled above"),
        }
    }

    /// True iff both serialized values compare equal under this type
    pub fn equal(&self, a: &[u8], b: &[u8]) -> bool {
        self.compare(a, b) == Ordering::Equal
    }
}

/// Fallback ordering for values whose encoding does not match their type
fn compare_raw(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Lexicographic comparison of component sequences; nulls sort first and a
/// shorter sequence sorts before any extension of it.
fn compare_components<'a, L, R>(left: L, right: R) -> Ordering
where
    L: ExactSizeIterator<Item = (&'a DataType, &'a Option<Bytes>)>,
    R: ExactSizeIterator<Item = &'a Option<Bytes>>,
{
    let (left_len, right_len) = (left.len(), right.len());
    for ((ty, l), r) in left.zip(right) {
        let cmp = match (l, r) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(l), Some(r)) => ty.compare(l, r),
        };
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    left_len.cmp(&right_len)
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "boolean"),
            DataType::Int => write!(f, "int"),
            DataType::BigInt => write!(f, "bigint"),
            DataType::Double => write!(f, "double"),
            DataType::Ascii => write!(f, "ascii"),
            DataType::Text => write!(f, "text"),
            DataType::Blob => write!(f, "blob"),
            DataType::List(element) => write!(f, "list<{}>", element),
            DataType::Set(element) => write!(f, "set<{}>", element),
            DataType::Map(key, value) => write!(f, "map<{}, {}>", key, value),
            DataType::Tuple(types) => {
                write!(f, "tuple<")?;
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", ty)?;
                }
                write!(f, ">")
            }
            DataType::Reversed(inner) => write!(f, "reversed({})", inner),
        }
    }
}
