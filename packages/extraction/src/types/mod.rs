//! Domain data types.

pub mod config;
pub mod schema;
pub mod table;
