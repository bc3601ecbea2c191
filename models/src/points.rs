use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Earned,
    Spent,
    Bonus,
}

/// Append-only ledger entry. The sum of `points` for a student always
/// equals their current `student_profiles.points`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PointTransaction {
    pub id: i64,
    pub student_id: i64,
    /// Null for transactions not tied to an event (e.g. purchases).
    pub event_id: Option<i64>,
    /// Signed delta.
    pub points: i64,
    pub kind: TransactionKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}
