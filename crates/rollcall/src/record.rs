//! Core registration types for rollcall.
//!
//! This module defines the record persisted for each registration and the
//! raw submission received from a front end before validation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single student registration.
///
/// All fields are plain strings. `name` and `email` are guaranteed non-empty
/// for records built through [`Submission::into_record`]; `course` and
/// `phone` may be empty. Records carry no identifier and no timestamp, so
/// duplicate submissions are permitted and indistinguishable.
///
/// Field order here is also the key order in the persisted JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// The student's name (required, trimmed).
    pub name: String,
    /// The student's email address (required, trimmed).
    pub email: String,
    /// The course being registered for (optional, may be empty).
    #[serde(default)]
    pub course: String,
    /// A contact phone number (optional, may be empty).
    #[serde(default)]
    pub phone: String,
}

/// A raw registration submission as extracted by a front end.
///
/// Fields are untrimmed and unvalidated; absent form fields arrive as empty
/// strings. Conversion into a [`Record`] trims every field and enforces the
/// required-field rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Raw `name` field.
    #[serde(default)]
    pub name: String,
    /// Raw `email` field.
    #[serde(default)]
    pub email: String,
    /// Raw `course` field.
    #[serde(default)]
    pub course: String,
    /// Raw `phone` field.
    #[serde(default)]
    pub phone: String,
}

impl Submission {
    /// Create a submission from the four form fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        course: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            course: course.into(),
            phone: phone.into(),
        }
    }

    /// Validate this submission and build a [`Record`] from it.
    ///
    /// All fields are trimmed. `course` and `phone` default to the empty
    /// string when absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if `name` or `email` is empty after
    /// trimming.
    pub fn into_record(self) -> Result<Record> {
        let name = self.name.trim().to_string();
        let email = self.email.trim().to_string();

        if name.is_empty() {
            return Err(Error::missing_field("name"));
        }
        if email.is_empty() {
            return Err(Error::missing_field("email"));
        }

        Ok(Record {
            name,
            email,
            course: self.course.trim().to_string(),
            phone: self.phone.trim().to_string(),
        })
    }
}

impl Record {
    /// Check whether this record satisfies the required-field invariant.
    ///
    /// Records produced by [`Submission::into_record`] always do; this is
    /// only useful for records deserialized from external sources.
    #[must_use]
    pub fn has_required_fields(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }
}
