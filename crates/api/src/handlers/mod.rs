//! Request handlers.
//!
//! Each submodule provides async handler functions for one resource.
//! Handlers delegate to the repositories in `omdb_db` through a
//! request-scoped [`omdb_db::Stores`] and map errors via
//! [`crate::error::AppError`].

pub mod movies;
pub mod users;
