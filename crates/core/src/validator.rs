//! Field-level validation accumulator.
//!
//! Validation functions elsewhere in the workspace take a `&mut Validator`
//! and append failures to it instead of returning early, so a single pass
//! reports every problem with a candidate value.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::Hash;

use serde::Serialize;
use validator::ValidateEmail;

use crate::error::CoreError;

/// Field name -> human-readable message.
///
/// Serializes as a flat JSON object, e.g. `{"title": "must be provided"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(pub BTreeMap<String, String>);

impl FieldErrors {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// Accumulates named validation failures.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` while no failure has been recorded.
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record a failure for `key`. Only the first message per key is kept.
    pub fn add_error(&mut self, key: &str, message: &str) {
        self.errors
            .0
            .entry(key.to_string())
            .or_insert_with(|| message.to_string());
    }

    /// Record a failure for `key` unless `ok` holds.
    pub fn check(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.add_error(key, message);
        }
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Convert the accumulated state into a `Result`, consuming the validator.
    pub fn into_result(self) -> Result<(), CoreError> {
        if self.valid() {
            Ok(())
        } else {
            Err(CoreError::Validation(self.errors))
        }
    }
}

/// `true` if `value` equals one of `permitted`.
pub fn permitted_value<T: PartialEq + ?Sized>(value: &T, permitted: &[&T]) -> bool {
    permitted.iter().any(|p| *p == value)
}

/// `true` if every element of `values` is distinct.
pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|v| seen.insert(v))
}

/// `true` if `value` looks like a deliverable email address.
pub fn is_email(value: &str) -> bool {
    value.validate_email()
}
