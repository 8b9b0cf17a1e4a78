//! Composite timestamp + timezone + all-day accessor.
//!
//! # Invariants
//! - A missing timestamp reads as `None` regardless of the sibling keys.
//! - Writing a value updates all owned keys in one bulk update.
//! - Clearing writes only the timestamp; timezone and all-day stay, since
//!   other time fields may share them.
//! - All-day values are floating and are stored without timezone.

use super::{FieldAdapter, FieldError, FieldResult};
use crate::collaborator::RowReader;
use crate::constraint::{Constraint, ConstraintChain};
use crate::model::value::{Value, ValueMap};
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const HOUR_MS: i64 = 60 * 60 * 1000;
pub const DAY_MS: i64 = 24 * HOUR_MS;
const UTC: &str = "UTC";

/// Point in time as stored by task rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTime {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// IANA timezone id; `None` for floating times.
    pub timezone: Option<String>,
    pub all_day: bool,
}

impl TaskTime {
    pub fn new(timestamp_ms: i64, timezone: Option<String>) -> Self {
        Self {
            timestamp_ms,
            timezone,
            all_day: false,
        }
    }

    pub fn utc(timestamp_ms: i64) -> Self {
        Self::new(timestamp_ms, Some(UTC.to_string()))
    }

    /// All-day value on the UTC day containing `timestamp_ms`.
    pub fn all_day(timestamp_ms: i64) -> Self {
        Self::utc(timestamp_ms).to_all_day()
    }

    pub fn now(timezone: Option<String>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
            });
        Self::new(timestamp_ms, timezone)
    }

    /// Snaps to 00:00 UTC of the same day and drops the timezone.
    pub fn to_all_day(&self) -> Self {
        Self {
            timestamp_ms: self.timestamp_ms - self.timestamp_ms.rem_euclid(DAY_MS),
            timezone: None,
            all_day: true,
        }
    }

    pub fn is_midnight_utc(&self) -> bool {
        self.timestamp_ms.rem_euclid(DAY_MS) == 0
    }

    /// Moves by `delta_ms`; all-day values stay all-day.
    pub fn shifted(&self, delta_ms: i64) -> Self {
        let moved = Self {
            timestamp_ms: self.timestamp_ms.saturating_add(delta_ms),
            ..self.clone()
        };
        if self.all_day {
            moved.to_all_day()
        } else {
            moved
        }
    }

    pub fn is_before(&self, other: &TaskTime) -> bool {
        self.timestamp_ms < other.timestamp_ms
    }

    /// Distance used when a dependent time must be derived from this one.
    pub fn default_span_ms(&self) -> i64 {
        if self.all_day {
            DAY_MS
        } else {
            HOUR_MS
        }
    }
}

/// Accessor for a [`TaskTime`] spread over up to three keys.
pub struct DateTimeField {
    timestamp_key: String,
    timezone_key: Option<String>,
    all_day_key: Option<String>,
    constraints: ConstraintChain<TaskTime>,
}

impl DateTimeField {
    /// Without a timezone key, values are read as UTC.
    pub fn new(timestamp_key: impl Into<String>) -> Self {
        Self {
            timestamp_key: timestamp_key.into(),
            timezone_key: None,
            all_day_key: None,
            constraints: ConstraintChain::new(),
        }
    }

    pub fn with_timezone_key(mut self, key: impl Into<String>) -> Self {
        self.timezone_key = Some(key.into());
        self
    }

    pub fn with_all_day_key(mut self, key: impl Into<String>) -> Self {
        self.all_day_key = Some(key.into());
        self
    }

    pub fn with_constraint(mut self, constraint: impl Constraint<TaskTime> + 'static) -> Self {
        self.constraints.push(Arc::new(constraint));
        self
    }

    pub fn timestamp_key(&self) -> &str {
        &self.timestamp_key
    }

    fn decode(&self, cell: impl Fn(&str) -> Value) -> FieldResult<Option<TaskTime>> {
        let Some(timestamp_ms) = cell(&self.timestamp_key).as_integer()? else {
            return Ok(None);
        };
        let timezone = match &self.timezone_key {
            Some(key) => cell(key).as_text()?,
            None => Some(UTC.to_string()),
        };
        let all_day = match &self.all_day_key {
            Some(key) => cell(key).as_bool()?,
            None => false,
        };

        let time = TaskTime::new(timestamp_ms, timezone);
        Ok(Some(if all_day {
            TaskTime {
                timezone: None,
                all_day: true,
                ..time
            }
        } else {
            time
        }))
    }

    fn cells(&self, value: Option<TaskTime>) -> Vec<(&str, Value)> {
        let Some(time) = value else {
            return vec![(self.timestamp_key.as_str(), Value::Null)];
        };
        let mut cells = vec![(self.timestamp_key.as_str(), Value::Integer(time.timestamp_ms))];
        if let Some(key) = &self.timezone_key {
            let timezone = if time.all_day { None } else { time.timezone };
            cells.push((key.as_str(), Value::from(timezone)));
        }
        if let Some(key) = &self.all_day_key {
            cells.push((key.as_str(), Value::from(time.all_day)));
        }
        cells
    }
}

impl FieldAdapter for DateTimeField {
    type Value = TaskTime;

    fn field_names(&self) -> Vec<&str> {
        let mut names = vec![self.timestamp_key.as_str()];
        names.extend(self.timezone_key.as_deref());
        names.extend(self.all_day_key.as_deref());
        names
    }

    fn try_read(&self, record: &Record) -> FieldResult<Option<TaskTime>> {
        self.decode(|key| record.get(key).cloned().unwrap_or(Value::Null))
    }

    fn try_read_row(&self, row: &dyn RowReader) -> FieldResult<Option<TaskTime>> {
        if let Some(missing) = self
            .field_names()
            .into_iter()
            .find(|name| !row.has_column(name))
        {
            return Err(FieldError::SchemaMismatch {
                column: missing.to_string(),
            });
        }
        self.decode(|key| row.column_value(key))
    }

    /// Now, in the record's timezone; all-day if the record is all-day.
    fn default_for(&self, record: &Record) -> Option<TaskTime> {
        let timezone = match &self.timezone_key {
            Some(key) => record.get_as_text(key).ok().flatten(),
            None => Some(UTC.to_string()),
        };
        let all_day = self.all_day_key.as_deref().is_some_and(|key| {
            record
                .get(key)
                .is_some_and(|value| value.as_bool().unwrap_or(false))
        });
        let now = TaskTime::now(timezone);
        Some(if all_day { now.to_all_day() } else { now })
    }

    fn write(&self, record: &mut Record, value: Option<TaskTime>) {
        let cells = self.cells(value);
        let mut scope = record.bulk_update();
        for (key, cell) in cells {
            scope.put(key, cell);
        }
    }

    fn write_values(&self, values: &mut ValueMap, value: Option<TaskTime>) {
        for (key, cell) in self.cells(value) {
            values.insert(key.to_string(), cell);
        }
    }

    fn constraints(&self) -> &ConstraintChain<TaskTime> {
        &self.constraints
    }
}
