pub mod expression;
pub mod schema;
pub mod selection;
pub mod types;
