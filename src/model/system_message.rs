use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Append-only broadcast announcement.
#[derive(Debug, Clone, FromRow)]
pub struct SystemMessage {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
