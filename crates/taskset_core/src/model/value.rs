//! Dynamic cell values exchanged with the backing store.
//!
//! # Responsibility
//! - Represent one stored cell (`Null`, integer, real or text).
//! - Provide typed coercions used by field accessors.
//!
//! # Invariants
//! - Coercion never panics; failures are reported as `CoercionError`.
//! - `Null` is the only value that coerces to `None`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Ordered key/value mapping used for baselines, pending deltas and rows.
pub type ValueMap = BTreeMap<String, Value>;

/// One stored cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// Storage class of a [`Value`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Integer,
    Real,
    Text,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
        }
    }
}

/// A present value could not be converted to the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionError {
    pub expected: &'static str,
    pub found: ValueKind,
}

impl Display for CoercionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot coerce {} value to {}",
            self.found.as_str(),
            self.expected
        )
    }
}

impl Error for CoercionError {}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Integer(_) => ValueKind::Integer,
            Self::Real(_) => ValueKind::Real,
            Self::Text(_) => ValueKind::Text,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view. Reals are truncated toward zero, text must be an
    /// integer literal.
    pub fn as_integer(&self) -> Result<Option<i64>, CoercionError> {
        match self {
            Self::Null => Ok(None),
            Self::Integer(value) => Ok(Some(*value)),
            Self::Real(value) if value.is_finite() => Ok(Some(value.trunc() as i64)),
            Self::Text(text) => text
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| self.mismatch("integer")),
            Self::Real(_) => Err(self.mismatch("integer")),
        }
    }

    pub fn as_real(&self) -> Result<Option<f64>, CoercionError> {
        match self {
            Self::Null => Ok(None),
            Self::Integer(value) => Ok(Some(*value as f64)),
            Self::Real(value) => Ok(Some(*value)),
            Self::Text(text) => text
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| self.mismatch("real")),
        }
    }

    /// Text view. Numbers are rendered the way the store would print them.
    pub fn as_text(&self) -> Result<Option<String>, CoercionError> {
        match self {
            Self::Null => Ok(None),
            Self::Integer(value) => Ok(Some(value.to_string())),
            Self::Real(value) => Ok(Some(value.to_string())),
            Self::Text(text) => Ok(Some(text.clone())),
        }
    }

    /// Boolean view: integer > 0 is true, null or <= 0 is false.
    pub fn as_bool(&self) -> Result<bool, CoercionError> {
        Ok(self
            .as_integer()
            .map_err(|_| self.mismatch("boolean"))?
            .is_some_and(|value| value > 0))
    }

    fn mismatch(&self, expected: &'static str) -> CoercionError {
        CoercionError {
            expected,
            found: self.kind(),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Integer(if value { 1 } else { 0 })
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
