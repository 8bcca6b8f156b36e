//! Query-string and path parameter parsing shared by handlers.
//!
//! Query parameters are accepted as raw strings and converted here so that a
//! malformed number becomes a field error alongside every other validation
//! failure, rather than an extractor rejection.

use omdb_core::filters::{Filters, DEFAULT_PAGE_SIZE};
use omdb_core::types::DbId;
use omdb_core::validator::Validator;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Raw `GET /v1/movies` query parameters
/// (`?title=&genres=&page=&page_size=&sort=`).
#[derive(Debug, Default, Deserialize)]
pub struct ListMoviesParams {
    pub title: Option<String>,
    /// Comma-separated genre list.
    pub genres: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub sort: Option<String>,
}

/// Typed listing input after parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieListQuery {
    pub title: String,
    pub genres: Vec<String>,
    pub filters: Filters,
}

impl ListMoviesParams {
    /// Convert into typed values, recording unparseable numbers in `v`.
    ///
    /// Filter bounds are not checked here; run
    /// [`omdb_core::filters::validate_filters`] on the result.
    pub fn parse(
        self,
        v: &mut Validator,
        sort_safelist: &'static [&'static str],
    ) -> MovieListQuery {
        MovieListQuery {
            title: self.title.unwrap_or_default(),
            genres: read_csv(self.genres.as_deref()),
            filters: Filters {
                page: read_int(v, "page", self.page.as_deref(), 1),
                page_size: read_int(v, "page_size", self.page_size.as_deref(), DEFAULT_PAGE_SIZE),
                sort: self.sort.unwrap_or_else(|| "id".to_string()),
                sort_safelist,
            },
        }
    }
}

/// Split a comma-separated value, dropping blank entries.
fn read_csv(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Parse an integer parameter, falling back to `default` when absent.
fn read_int(v: &mut Validator, key: &str, raw: Option<&str>, default: i64) -> i64 {
    match raw {
        None | Some("") => default,
        Some(s) => s.parse().unwrap_or_else(|_| {
            v.add_error(key, "must be an integer value");
            default
        }),
    }
}

/// Parse a `{id}` path segment. Anything that is not a positive integer
/// cannot name a record, so it is reported as not found.
pub fn parse_id(raw: &str) -> AppResult<DbId> {
    match raw.parse::<DbId>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(AppError::not_found()),
    }
}
