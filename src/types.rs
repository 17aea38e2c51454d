//! Type system for serialized column values.
//!
//! Values travel through the restriction core in their serialized form
//! (`bytes::Bytes`). This module provides:
//!
//! - **DataType**: column types with a type-aware three-way comparator
//! - **Value**: native values that serialize into the CQL wire format
//! - **codec**: zero-copy splitting of serialized collections and tuples

pub mod codec;
pub mod data_type;
pub mod value;

pub use data_type::DataType;
pub use value::{serialize_value, Value};
