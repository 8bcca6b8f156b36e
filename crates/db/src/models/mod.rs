//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` input DTOs for creates and partial updates
//! - The validation function for the entity

pub mod movie;
pub mod user;
