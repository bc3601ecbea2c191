use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Quiz,
    Minigame,
    Quest,
    Photo,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub event_type: EventType,
    pub manager_id: i64,
    pub points: i64,
    pub is_active: bool,
    pub qr_code: Option<String>,
    /// Unique viewers. Monotonically non-decreasing.
    pub views_count: i64,
    /// Distinct passing transitions. Monotonically non-decreasing.
    pub completion_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Quiz {
    pub id: i64,
    pub event_id: i64,
    /// Seconds.
    pub time_limit: i64,
    /// Percentage threshold, 0-100.
    pub passing_score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuizQuestion {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,
    pub ord: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuizAnswer {
    pub id: i64,
    pub question_id: i64,
    pub answer_text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Minigame {
    pub id: i64,
    pub event_id: i64,
    pub game_type: String,
    pub instructions: String,
}

/// Per (event, student) progress row. Exactly one ever exists per pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Participation {
    pub id: i64,
    pub event_id: i64,
    pub student_id: i64,
    /// Monotonic: once true, never reverts.
    pub completed: bool,
    pub score: i64,
    /// Whether points have been credited for this participation. Gates the
    /// settlement credit so resubmission never double-credits.
    pub credited: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub first_viewed: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Feedback {
    pub id: i64,
    pub event_id: i64,
    pub student_id: i64,
    /// 1-5.
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
