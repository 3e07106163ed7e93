/// Telegram user id. Primary key of the user store and subject of every
/// session token.
pub type Identity = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
