//! Movie entity model, DTOs and validation.

use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use omdb_core::types::{DbId, Timestamp};
use omdb_core::validator::{unique, Validator};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;

/// Earliest accepted release year (the first motion picture).
pub const MIN_YEAR: i32 = 1888;

/// Maximum title length in bytes.
pub const MAX_TITLE_LEN: usize = 500;

/// Maximum number of genres per movie.
pub const MAX_GENRES: usize = 5;

/// Sort keys accepted when listing movies. Each maps directly onto a column
/// of the `movies` table.
pub const MOVIE_SORT_SAFELIST: &[&str] = &[
    "id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime",
];

/// Returned when a runtime string is not of the form `"<n> mins"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid runtime format")]
pub struct InvalidRuntimeFormat;

/// Running time in minutes. JSON form is `"<n> mins"`; stored as an integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, sqlx::Type)]
#[sqlx(transparent)]
pub struct Runtime(pub i32);

impl Runtime {
    pub fn minutes(self) -> i32 {
        self.0
    }

    fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mins", self.0)
    }
}

impl FromStr for Runtime {
    type Err = InvalidRuntimeFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (minutes, unit) = s.split_once(' ').ok_or(InvalidRuntimeFormat)?;
        if unit != "mins" {
            return Err(InvalidRuntimeFormat);
        }
        minutes
            .parse::<i32>()
            .map(Runtime)
            .map_err(|_| InvalidRuntimeFormat)
    }
}

impl Serialize for Runtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A movie row from the `movies` table.
///
/// `id`, `created_at` and `version` are assigned by the database; a value
/// built with [`Movie::from_create`] carries zeroes until inserted.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct Movie {
    pub id: DbId,
    #[serde(skip)]
    pub created_at: Timestamp,
    pub title: String,
    #[serde(skip_serializing_if = "is_zero_year")]
    pub year: i32,
    #[serde(skip_serializing_if = "Runtime::is_zero")]
    pub runtime: Runtime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    pub version: i32,
}

fn is_zero_year(year: &i32) -> bool {
    *year == 0
}

impl Movie {
    /// An unsaved movie built from client input.
    pub fn from_create(input: CreateMovie) -> Self {
        Self {
            title: input.title,
            year: input.year,
            runtime: input.runtime,
            genres: input.genres,
            ..Self::default()
        }
    }

    /// Overwrite every field present in `input`, leaving the rest untouched.
    pub fn apply(&mut self, input: UpdateMovie) {
        if let Some(title) = input.title {
            self.title = title;
        }
        if let Some(year) = input.year {
            self.year = year;
        }
        if let Some(runtime) = input.runtime {
            self.runtime = runtime;
        }
        if let Some(genres) = input.genres {
            self.genres = genres;
        }
    }
}

/// DTO for creating a movie. Missing fields default to zero values so that
/// validation, not decoding, reports them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateMovie {
    pub title: String,
    pub year: i32,
    pub runtime: Runtime,
    pub genres: Vec<String>,
}

/// DTO for a partial update. Only the fields present are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMovie {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<Runtime>,
    pub genres: Option<Vec<String>>,
}

/// Check every client-supplied field of `movie`.
pub fn validate_movie(v: &mut Validator, movie: &Movie) {
    v.check(!movie.title.is_empty(), "title", "must be provided");
    v.check(
        movie.title.len() <= MAX_TITLE_LEN,
        "title",
        "must not be more than 500 bytes long",
    );

    v.check(movie.year != 0, "year", "must be provided");
    v.check(movie.year >= MIN_YEAR, "year", "must be greater than 1888");
    v.check(
        movie.year <= chrono::Utc::now().year(),
        "year",
        "must not be in the future",
    );

    v.check(movie.runtime.0 != 0, "runtime", "must be provided");
    v.check(movie.runtime.0 > 0, "runtime", "must be a positive integer");

    v.check(
        !movie.genres.is_empty(),
        "genres",
        "must contain at least 1 genre",
    );
    v.check(
        movie.genres.len() <= MAX_GENRES,
        "genres",
        "must not contain more than 5 genres",
    );
    v.check(
        unique(&movie.genres),
        "genres",
        "must not contain duplicate values",
    );
}
