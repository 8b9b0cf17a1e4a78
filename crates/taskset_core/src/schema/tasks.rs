//! Column vocabulary of the `tasks` collection.

pub const COLLECTION: &str = "tasks";

pub const TITLE: &str = "title";
pub const LOCATION: &str = "location";
pub const DESCRIPTION: &str = "description";
pub const PRIORITY: &str = "priority";
pub const CLASSIFICATION: &str = "class";
pub const STATUS: &str = "status";
pub const PERCENT_COMPLETE: &str = "percent_complete";
pub const IS_ALLDAY: &str = "is_allday";
pub const TZ: &str = "tz";
pub const DTSTART: &str = "dtstart";
pub const DUE: &str = "due";
pub const COMPLETED: &str = "completed";
pub const PINNED: &str = "pinned";
pub const LIST_NAME: &str = "list_name";
pub const ACCOUNT_NAME: &str = "account_name";

/// Every writable column, in table order.
pub const COLUMNS: [&str; 15] = [
    TITLE,
    LOCATION,
    DESCRIPTION,
    PRIORITY,
    CLASSIFICATION,
    STATUS,
    PERCENT_COMPLETE,
    IS_ALLDAY,
    TZ,
    DTSTART,
    DUE,
    COMPLETED,
    PINNED,
    LIST_NAME,
    ACCOUNT_NAME,
];

pub const STATUS_NEEDS_ACTION: i64 = 0;
pub const STATUS_IN_PROCESS: i64 = 1;
pub const STATUS_COMPLETED: i64 = 2;
pub const STATUS_CANCELLED: i64 = 3;

pub const CLASSIFICATION_PUBLIC: i64 = 0;
pub const CLASSIFICATION_PRIVATE: i64 = 1;
pub const CLASSIFICATION_CONFIDENTIAL: i64 = 2;

/// Priorities follow RFC 5545: 0 undefined, 1 highest, 9 lowest.
pub const PRIORITY_MIN: i64 = 0;
pub const PRIORITY_MAX: i64 = 9;
