/// Project identifiers are opaque strings assigned by the project store.
pub type ProjectId = String;

/// User identifiers are opaque strings (an email for shared users).
pub type UserId = String;

/// Job identifiers are random v4 UUIDs.
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
