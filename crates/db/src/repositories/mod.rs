//! Repository layer.
//!
//! Each repository owns a pool handle and a [`crate::QueryScope`]; every
//! public method is one bounded store operation.

pub mod movie_repo;
pub mod user_repo;

pub use movie_repo::MovieRepo;
pub use user_repo::UserRepo;
