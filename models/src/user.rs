use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Student,
    Manager,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    /// Stored in canonical national form, see `engage_utils::phone`.
    pub phone: Option<String>,
    pub university: Option<String>,
    pub telegram_id: Option<String>,
    pub interests: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input to the user factory. The role-specific profile row is created in
/// the same transaction as the user row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub university: Option<String>,
    pub telegram_id: Option<String>,
    pub interests: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StudentProfile {
    pub id: i64,
    pub user_id: i64,
    /// Point balance. Never negative; mutated only by settlement and the
    /// merchandise exchange.
    pub points: i64,
    pub last_activity: DateTime<Utc>,
}
