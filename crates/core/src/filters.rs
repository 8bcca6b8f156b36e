//! Filter/sort parameters for paginated listings.
//!
//! SQL identifiers (column names, sort direction) cannot be bound as query
//! parameters, so the sort key is interpolated into the query text. The only
//! thing standing between a client and that interpolation is the closed
//! [`Filters::sort_safelist`], which is fixed at compile time by the caller.

use crate::validator::{permitted_value, Validator};

/// Largest accepted page number.
pub const MAX_PAGE: i64 = 10_000_000;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Page size used when the client does not supply one.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Page, page size and sort key of a listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
    /// Permitted `sort` values, each optionally prefixed with `-` for
    /// descending order.
    pub sort_safelist: &'static [&'static str],
}

impl Filters {
    /// Column name for `ORDER BY`, with any leading `-` stripped.
    ///
    /// # Panics
    ///
    /// Panics if `sort` is not in the safelist. That can only happen when a
    /// caller skipped [`validate_filters`], which is a bug, not a bad request.
    pub fn sort_column(&self) -> &str {
        if permitted_value(self.sort.as_str(), self.sort_safelist) {
            return self.sort.trim_start_matches('-');
        }
        panic!("unsafe sort parameter: {}", self.sort);
    }

    /// `"DESC"` when `sort` carries a leading `-`, otherwise `"ASC"`.
    pub fn sort_direction(&self) -> &'static str {
        if self.sort.starts_with('-') {
            "DESC"
        } else {
            "ASC"
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// Rows to skip before the requested page.
    ///
    /// Cannot overflow once validated: both factors are bounded by
    /// [`MAX_PAGE`] and [`MAX_PAGE_SIZE`].
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

/// Check page bounds and safelist membership of the sort key.
pub fn validate_filters(v: &mut Validator, f: &Filters) {
    v.check(f.page > 0, "page", "must be greater than zero");
    v.check(f.page <= MAX_PAGE, "page", "must be a maximum of 10 million");
    v.check(f.page_size > 0, "page_size", "must be greater than zero");
    v.check(
        f.page_size <= MAX_PAGE_SIZE,
        "page_size",
        "must be a maximum of 100",
    );
    v.check(
        permitted_value(f.sort.as_str(), f.sort_safelist),
        "sort",
        "invalid sort value",
    );
}
