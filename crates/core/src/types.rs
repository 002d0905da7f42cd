/// Opaque user identifier issued by the identity provider.
pub type UserId = String;

/// Milestones are keyed by time-ordered UUIDs.
pub type MilestoneId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
