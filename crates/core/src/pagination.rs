//! Pagination metadata for listing responses.

use serde::Serialize;

/// Summary of one page of a filtered listing.
///
/// All-zero (the `Default`) means "no results"; zero fields are omitted from
/// JSON, so an empty listing serializes as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_records: i64,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// Build pagination metadata from the total number of matching records.
pub fn calculate_metadata(total_records: i64, page: i64, page_size: i64) -> Metadata {
    if total_records == 0 {
        return Metadata::default();
    }

    Metadata {
        current_page: page,
        page_size,
        first_page: 1,
        last_page: (total_records as f64 / page_size as f64).ceil() as i64,
        total_records,
    }
}
