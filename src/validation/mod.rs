//! Form validation.
//!
//! Validators turn a raw submitted form into a typed value or a flat map of
//! field errors. They never touch the session; cross-entity rules read the
//! current [`FlowState`](crate::flow::FlowState) as context.

pub mod rules;
pub mod steps;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason a field was rejected. Rendering layers translate these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    Required,
    TooLong,
    Invalid,
    NotANumber,
    InvalidDate,
    DateInFuture,
    TooOld,
    InvalidSin,
    SinNotUnique,
    InvalidPostalCode,
    InvalidPhone,
    InvalidEmail,
    EmailMismatch,
    EmailRequired,
    UnknownCountry,
    UnknownProvince,
    UnknownProgram,
    ChildrenRequired,
    ChildIncomplete,
}

/// Field path to the ordered list of problems with that field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(transparent)]
#[error("{} field(s) failed validation", .0.len())]
pub struct FieldErrors(BTreeMap<String, Vec<ErrorCode>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, code: ErrorCode) {
        let codes = self.0.entry(field.into()).or_default();
        if !codes.contains(&code) {
            codes.push(code);
        }
    }

    pub fn get(&self, field: &str) -> &[ErrorCode] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(value)` if nothing was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    /// Finish a validator whose parsed value is only present when every
    /// field it depends on passed
    pub fn finish<T>(self, value: Option<T>) -> Result<T, FieldErrors> {
        match value {
            Some(value) if self.is_empty() => Ok(value),
            _ => Err(self),
        }
    }
}

/// What the user pressed to submit a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormAction {
    #[default]
    Continue,
    Cancel,
    Back,
}

/// Raw submitted form fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct FormInput(HashMap<String, String>);

impl FormInput {
    pub const ACTION_FIELD: &'static str = "_action";
    pub const CSRF_FIELD: &'static str = "_csrf";

    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by tests and fixtures
    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn action(&self) -> FormAction {
        match self.text(Self::ACTION_FIELD) {
            Some("cancel") => FormAction::Cancel,
            Some("back") => FormAction::Back,
            _ => FormAction::Continue,
        }
    }

    pub fn csrf(&self) -> Option<&str> {
        self.text(Self::CSRF_FIELD)
    }

    /// Trimmed value; blank counts as absent
    pub fn text(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Required text of at most `max_len` characters
    pub fn required_text(
        &self,
        errors: &mut FieldErrors,
        field: &str,
        max_len: usize,
    ) -> Option<String> {
        match self.text(field) {
            None => {
                errors.add(field, ErrorCode::Required);
                None
            }
            Some(value) => self.bounded(errors, field, value, max_len),
        }
    }

    /// Optional text of at most `max_len` characters
    pub fn optional_text(
        &self,
        errors: &mut FieldErrors,
        field: &str,
        max_len: usize,
    ) -> Option<String> {
        self.text(field)
            .and_then(|value| self.bounded(errors, field, value, max_len))
    }

    fn bounded(
        &self,
        errors: &mut FieldErrors,
        field: &str,
        value: &str,
        max_len: usize,
    ) -> Option<String> {
        if value.chars().count() > max_len {
            errors.add(field, ErrorCode::TooLong);
            return None;
        }
        Some(value.to_string())
    }

    /// Required `yes` / `no` radio
    pub fn yes_no(&self, errors: &mut FieldErrors, field: &str) -> Option<bool> {
        match self.text(field) {
            Some("yes") => Some(true),
            Some("no") => Some(false),
            Some(_) => {
                errors.add(field, ErrorCode::Invalid);
                None
            }
            None => {
                errors.add(field, ErrorCode::Required);
                None
            }
        }
    }

    /// Checked checkbox
    pub fn checkbox(&self, field: &str) -> bool {
        matches!(self.text(field), Some("yes" | "on" | "true"))
    }

    /// Required value mapped through `parse`; unknown values are invalid
    pub fn choice<T>(
        &self,
        errors: &mut FieldErrors,
        field: &str,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Option<T> {
        let Some(raw) = self.text(field) else {
            errors.add(field, ErrorCode::Required);
            return None;
        };
        let parsed = parse(raw);
        if parsed.is_none() {
            errors.add(field, ErrorCode::Invalid);
        }
        parsed
    }
}

impl From<HashMap<String, String>> for FormInput {
    fn from(fields: HashMap<String, String>) -> Self {
        Self(fields)
    }
}
