//! SQLite storage for tasks and accounts

mod core;
pub mod mappers;
pub mod query_builders;
pub mod schema;
mod users;

pub use self::core::*;
