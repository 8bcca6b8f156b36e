//! Pure domain logic for the movie catalog.
//!
//! Nothing in this crate performs I/O: validation, filter/sort handling,
//! pagination metadata and password hashing are all plain functions so they
//! can be shared by the persistence layer, the HTTP layer and tests.

pub mod error;
pub mod filters;
pub mod pagination;
pub mod password;
pub mod types;
pub mod validator;
