use chrono::Utc;
use engage_utils::phone::normalize_phone;
use engage_utils::scoring::{SubmittedAnswer, score_submission};
use models::{
    Event, EventType, Feedback, MerchOrder, Merchandise, Minigame, NewUser, Participation,
    PointTransaction, Quiz, QuizAnswer, QuizQuestion, StudentProfile, TransactionKind, User,
    UserRole,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Error;

/// Event with its quiz or minigame payload. Quiz answers are exposed
/// without their correctness flags.
#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub quiz: Option<QuizDetail>,
    pub minigame: Option<Minigame>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizDetail {
    pub id: i64,
    pub time_limit: i64,
    pub passing_score: i64,
    pub questions: Vec<QuestionDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionDetail {
    pub id: i64,
    pub question_text: String,
    pub ord: i64,
    pub answers: Vec<AnswerOption>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerOption {
    pub id: i64,
    pub answer_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub score: i64,
    pub total_questions: usize,
    pub correct_count: usize,
    pub passed: bool,
    /// 0 unless this submission newly credited the event's points.
    pub points_earned: i64,
    pub current_points: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRequest {
    pub quantity: i64,
    pub delivery_address: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOutcome {
    pub order: MerchOrder,
    pub remaining_points: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletedEvent {
    pub event: Event,
    pub participation: Participation,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointsOverview {
    pub points: i64,
    pub history: Vec<PointTransaction>,
}

/// Maps a UNIQUE constraint violation to `Conflict`, everything else to a
/// storage error.
fn unique_conflict(e: sqlx::Error, message: &str) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::Conflict(message.to_string())
        }
        _ => Error::Sqlx(e),
    }
}

fn require_student(user: &User) -> Result<(), Error> {
    if user.role != UserRole::Student {
        return Err(Error::PermissionDenied(format!(
            "user {} is not a student",
            user.id
        )));
    }
    Ok(())
}

/// Resolves the principal forwarded by the auth layer to a full user row.
#[tracing::instrument(skip_all, err(Debug))]
pub async fn require_user(pool: &SqlitePool, user_id: i64) -> Result<User, Error> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    user.ok_or_else(|| Error::PermissionDenied(format!("unknown principal {user_id}")))
}

/// Creates a user and its role-specific profile in one transaction. A
/// student always starts with a zero-point balance row; there is no
/// after-the-fact profile hook.
#[tracing::instrument(skip_all, err(Debug))]
pub async fn create_user(pool: &SqlitePool, new_user: NewUser) -> Result<User, Error> {
    let phone = match &new_user.phone {
        Some(raw) => Some(normalize_phone(raw).map_err(|e| Error::InvalidInput(e.to_string()))?),
        None => None,
    };

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let res = sqlx::query(
        "INSERT INTO users (username, email, role, phone, university, telegram_id, interests, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&new_user.username)
    .bind(&new_user.email)
    .bind(new_user.role)
    .bind(&phone)
    .bind(&new_user.university)
    .bind(&new_user.telegram_id)
    .bind(&new_user.interests)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| unique_conflict(e, "username or phone already registered"))?;
    let user_id = res.last_insert_rowid();

    match new_user.role {
        UserRole::Student => {
            sqlx::query("INSERT INTO student_profiles (user_id, points, last_activity) VALUES (?, 0, ?)")
                .bind(user_id)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }
        UserRole::Manager => {
            sqlx::query("INSERT INTO manager_profiles (user_id) VALUES (?)")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(user)
}

#[tracing::instrument(skip_all, err(Debug))]
pub async fn list_events(pool: &SqlitePool) -> Result<Vec<Event>, Error> {
    let events = sqlx::query_as("SELECT * FROM events WHERE is_active = 1 ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await?;
    Ok(events)
}

#[tracing::instrument(skip_all, err(Debug))]
pub async fn get_event_detail(pool: &SqlitePool, event_id: i64) -> Result<EventDetail, Error> {
    let event: Option<Event> = sqlx::query_as("SELECT * FROM events WHERE id = ?")
        .bind(event_id)
        .fetch_optional(pool)
        .await?;
    let event = event.ok_or_else(|| Error::NotFound(format!("event {event_id} does not exist")))?;

    let mut quiz_detail = None;
    let mut minigame = None;

    match event.event_type {
        EventType::Quiz => {
            let quiz: Option<Quiz> = sqlx::query_as("SELECT * FROM quizzes WHERE event_id = ?")
                .bind(event_id)
                .fetch_optional(pool)
                .await?;
            if let Some(quiz) = quiz {
                let questions: Vec<QuizQuestion> =
                    sqlx::query_as("SELECT * FROM quiz_questions WHERE quiz_id = ? ORDER BY ord, id")
                        .bind(quiz.id)
                        .fetch_all(pool)
                        .await?;

                let mut question_details = Vec::with_capacity(questions.len());
                for question in questions {
                    let answers: Vec<QuizAnswer> =
                        sqlx::query_as("SELECT * FROM quiz_answers WHERE question_id = ? ORDER BY id")
                            .bind(question.id)
                            .fetch_all(pool)
                            .await?;
                    question_details.push(QuestionDetail {
                        id: question.id,
                        question_text: question.question_text,
                        ord: question.ord,
                        answers: answers
                            .into_iter()
                            .map(|a| AnswerOption {
                                id: a.id,
                                answer_text: a.answer_text,
                            })
                            .collect(),
                    });
                }

                quiz_detail = Some(QuizDetail {
                    id: quiz.id,
                    time_limit: quiz.time_limit,
                    passing_score: quiz.passing_score,
                    questions: question_details,
                });
            }
        }
        EventType::Minigame => {
            minigame = sqlx::query_as("SELECT * FROM minigames WHERE event_id = ?")
                .bind(event_id)
                .fetch_optional(pool)
                .await?;
        }
        _ => {}
    }

    Ok(EventDetail {
        event,
        quiz: quiz_detail,
        minigame,
    })
}

/// Idempotent first-view tracking. The participation row is created only if
/// absent; an existing row's `completed`/`score` are never touched. The
/// event's `views_count` moves only when the row was actually created, so
/// it counts unique viewers.
#[tracing::instrument(skip_all, err(Debug))]
pub async fn record_view(pool: &SqlitePool, event_id: i64, student: &User) -> Result<(), Error> {
    require_student(student)?;

    let mut tx = pool.begin().await?;

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM events WHERE id = ?")
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(Error::NotFound(format!("event {event_id} does not exist")));
    }

    let res = sqlx::query(
        "INSERT INTO participations (event_id, student_id, completed, score, credited, completed_at, first_viewed)
         VALUES (?, ?, 0, 0, 0, NULL, ?)
         ON CONFLICT (event_id, student_id) DO NOTHING",
    )
    .bind(event_id)
    .bind(student.id)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    if res.rows_affected() == 1 {
        sqlx::query("UPDATE events SET views_count = views_count + 1 WHERE id = ?")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

#[tracing::instrument(skip_all, err(Debug))]
pub async fn start_event(
    pool: &SqlitePool,
    event_id: i64,
    student: &User,
) -> Result<EventDetail, Error> {
    record_view(pool, event_id, student).await?;
    get_event_detail(pool, event_id).await
}

/// Settlement: scores the submission and upserts the participation row.
/// Only the first passing submission credits the event's points, appends
/// the ledger entry, and bumps the completion counter. Everything happens
/// in one transaction.
#[tracing::instrument(skip_all, err(Debug))]
pub async fn submit_quiz(
    pool: &SqlitePool,
    event_id: i64,
    student: &User,
    submitted: &[SubmittedAnswer],
) -> Result<SubmitOutcome, Error> {
    require_student(student)?;

    let mut tx = pool.begin().await?;

    let event: Option<Event> = sqlx::query_as("SELECT * FROM events WHERE id = ?")
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;
    let event = event.ok_or_else(|| Error::NotFound(format!("event {event_id} does not exist")))?;
    if event.event_type != EventType::Quiz {
        return Err(Error::InvalidInput(format!(
            "event {event_id} is not a quiz"
        )));
    }

    let quiz: Option<Quiz> = sqlx::query_as("SELECT * FROM quizzes WHERE event_id = ?")
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;
    let quiz = quiz.ok_or_else(|| Error::InvalidInput(format!("event {event_id} has no quiz")))?;

    let questions: Vec<QuizQuestion> =
        sqlx::query_as("SELECT * FROM quiz_questions WHERE quiz_id = ? ORDER BY ord, id")
            .bind(quiz.id)
            .fetch_all(&mut *tx)
            .await?;
    let answers: Vec<QuizAnswer> = sqlx::query_as(
        "SELECT a.* FROM quiz_answers a
         JOIN quiz_questions q ON a.question_id = q.id
         WHERE q.quiz_id = ?",
    )
    .bind(quiz.id)
    .fetch_all(&mut *tx)
    .await?;

    let summary = score_submission(&questions, &answers, submitted, quiz.passing_score);

    let now = Utc::now();
    let prior: Option<Participation> =
        sqlx::query_as("SELECT * FROM participations WHERE event_id = ? AND student_id = ?")
            .bind(event_id)
            .bind(student.id)
            .fetch_optional(&mut *tx)
            .await?;
    let was_credited = prior.as_ref().map(|p| p.credited).unwrap_or(false);
    let was_completed = prior.as_ref().map(|p| p.completed).unwrap_or(false);

    // `completed` is monotonic; `completed_at` is set only on the
    // transition into the completed state.
    let completed = was_completed || summary.passed;
    let completed_at = match &prior {
        Some(p) if p.completed => p.completed_at,
        _ => summary.passed.then_some(now),
    };

    sqlx::query(
        "INSERT INTO participations (event_id, student_id, completed, score, credited, completed_at, first_viewed)
         VALUES (?, ?, ?, ?, 0, ?, ?)
         ON CONFLICT (event_id, student_id) DO UPDATE SET
             completed = excluded.completed,
             score = excluded.score,
             completed_at = excluded.completed_at",
    )
    .bind(event_id)
    .bind(student.id)
    .bind(completed)
    .bind(summary.score)
    .bind(completed_at)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let newly_credited = summary.passed && !was_credited;
    let points_earned = if newly_credited {
        sqlx::query("UPDATE participations SET credited = 1 WHERE event_id = ? AND student_id = ?")
            .bind(event_id)
            .bind(student.id)
            .execute(&mut *tx)
            .await?;

        let res = sqlx::query(
            "UPDATE student_profiles SET points = points + ?, last_activity = ? WHERE user_id = ?",
        )
        .bind(event.points)
        .bind(now)
        .bind(student.id)
        .execute(&mut *tx)
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "student {} has no points balance",
                student.id
            )));
        }

        sqlx::query(
            "INSERT INTO point_transactions (student_id, event_id, points, kind, description, timestamp)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(student.id)
        .bind(event_id)
        .bind(event.points)
        .bind(TransactionKind::Earned)
        .bind(format!("Completed event: {}", event.title))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE events SET completion_count = completion_count + 1 WHERE id = ?")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;

        event.points
    } else {
        0
    };

    let current_points: Option<i64> =
        sqlx::query_scalar("SELECT points FROM student_profiles WHERE user_id = ?")
            .bind(student.id)
            .fetch_optional(&mut *tx)
            .await?;
    let current_points = current_points.ok_or_else(|| {
        Error::NotFound(format!("student {} has no points balance", student.id))
    })?;

    tx.commit().await?;

    tracing::debug!(
        event = event_id,
        student = student.id,
        score = summary.score,
        passed = summary.passed,
        points_earned,
        "settled quiz submission"
    );

    Ok(SubmitOutcome {
        score: summary.score,
        total_questions: summary.total_questions,
        correct_count: summary.correct_count,
        passed: summary.passed,
        points_earned,
        current_points,
    })
}

#[tracing::instrument(skip_all, err(Debug))]
pub async fn submit_feedback(
    pool: &SqlitePool,
    event_id: i64,
    student: &User,
    rating: i64,
    comment: Option<String>,
) -> Result<Feedback, Error> {
    require_student(student)?;
    if !(1..=5).contains(&rating) {
        return Err(Error::InvalidInput(format!(
            "rating must be between 1 and 5, got {rating}"
        )));
    }

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM events WHERE id = ?")
        .bind(event_id)
        .fetch_optional(pool)
        .await?;
    if exists.is_none() {
        return Err(Error::NotFound(format!("event {event_id} does not exist")));
    }

    let res = sqlx::query(
        "INSERT INTO feedbacks (event_id, student_id, rating, comment, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(event_id)
    .bind(student.id)
    .bind(rating)
    .bind(&comment)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| unique_conflict(e, "feedback already submitted for this event"))?;

    let feedback = sqlx::query_as("SELECT * FROM feedbacks WHERE id = ?")
        .bind(res.last_insert_rowid())
        .fetch_one(pool)
        .await?;
    Ok(feedback)
}

#[tracing::instrument(skip_all, err(Debug))]
pub async fn my_feedbacks(pool: &SqlitePool, student: &User) -> Result<Vec<Feedback>, Error> {
    require_student(student)?;
    let feedbacks =
        sqlx::query_as("SELECT * FROM feedbacks WHERE student_id = ? ORDER BY created_at DESC, id DESC")
            .bind(student.id)
            .fetch_all(pool)
            .await?;
    Ok(feedbacks)
}

#[tracing::instrument(skip_all, err(Debug))]
pub async fn completed_events(
    pool: &SqlitePool,
    student: &User,
) -> Result<Vec<CompletedEvent>, Error> {
    require_student(student)?;

    let participations: Vec<Participation> = sqlx::query_as(
        "SELECT * FROM participations WHERE student_id = ? AND completed = 1
         ORDER BY completed_at DESC, id DESC",
    )
    .bind(student.id)
    .fetch_all(pool)
    .await?;

    let mut completed = Vec::with_capacity(participations.len());
    for participation in participations {
        let event: Option<Event> = sqlx::query_as("SELECT * FROM events WHERE id = ?")
            .bind(participation.event_id)
            .fetch_optional(pool)
            .await?;
        // Event rows cascade-delete; a missing one just drops out of the list.
        if let Some(event) = event {
            completed.push(CompletedEvent {
                event,
                participation,
            });
        }
    }
    Ok(completed)
}

#[tracing::instrument(skip_all, err(Debug))]
pub async fn list_merchandise(pool: &SqlitePool) -> Result<Vec<Merchandise>, Error> {
    let items =
        sqlx::query_as("SELECT * FROM merchandise WHERE is_available = 1 ORDER BY points_cost, id")
            .fetch_all(pool)
            .await?;
    Ok(items)
}

#[tracing::instrument(skip_all, err(Debug))]
pub async fn get_merchandise(pool: &SqlitePool, merch_id: i64) -> Result<Merchandise, Error> {
    let merch: Option<Merchandise> = sqlx::query_as("SELECT * FROM merchandise WHERE id = ?")
        .bind(merch_id)
        .fetch_optional(pool)
        .await?;
    merch.ok_or_else(|| Error::NotFound(format!("merchandise {merch_id} does not exist")))
}

/// Exchange: order creation, stock decrement, balance debit, and ledger
/// entry land together or not at all. The decrement and debit are guarded
/// conditional updates, so a concurrent purchase that raced past the
/// precondition reads still cannot oversell or overdraw.
#[tracing::instrument(skip_all, err(Debug))]
pub async fn purchase(
    pool: &SqlitePool,
    merch_id: i64,
    student: &User,
    request: PurchaseRequest,
) -> Result<PurchaseOutcome, Error> {
    require_student(student)?;

    let mut tx = pool.begin().await?;

    let merch: Option<Merchandise> = sqlx::query_as("SELECT * FROM merchandise WHERE id = ?")
        .bind(merch_id)
        .fetch_optional(&mut *tx)
        .await?;
    let merch = match merch {
        Some(m) if m.is_available => m,
        _ => {
            return Err(Error::NotFound(format!(
                "merchandise {merch_id} is not available"
            )));
        }
    };

    if request.quantity < 1 {
        return Err(Error::InvalidInput(format!(
            "quantity must be at least 1, got {}",
            request.quantity
        )));
    }
    if merch.stock_quantity < request.quantity {
        return Err(Error::InsufficientStock {
            available: merch.stock_quantity,
        });
    }

    let cost = merch.points_cost * request.quantity;
    let balance: Option<i64> =
        sqlx::query_scalar("SELECT points FROM student_profiles WHERE user_id = ?")
            .bind(student.id)
            .fetch_optional(&mut *tx)
            .await?;
    let balance = balance.ok_or_else(|| {
        Error::NotFound(format!("student {} has no points balance", student.id))
    })?;
    if balance < cost {
        return Err(Error::InsufficientBalance {
            required: cost,
            available: balance,
        });
    }

    let now = Utc::now();

    let res = sqlx::query(
        "UPDATE merchandise SET stock_quantity = stock_quantity - ?
         WHERE id = ? AND stock_quantity >= ?",
    )
    .bind(request.quantity)
    .bind(merch_id)
    .bind(request.quantity)
    .execute(&mut *tx)
    .await?;
    if res.rows_affected() == 0 {
        // Lost a race since the precondition read.
        let available: i64 =
            sqlx::query_scalar("SELECT stock_quantity FROM merchandise WHERE id = ?")
                .bind(merch_id)
                .fetch_one(&mut *tx)
                .await?;
        return Err(Error::InsufficientStock { available });
    }

    let res = sqlx::query(
        "UPDATE student_profiles SET points = points - ?, last_activity = ?
         WHERE user_id = ? AND points >= ?",
    )
    .bind(cost)
    .bind(now)
    .bind(student.id)
    .bind(cost)
    .execute(&mut *tx)
    .await?;
    if res.rows_affected() == 0 {
        return Err(Error::InsufficientBalance {
            required: cost,
            available: balance,
        });
    }

    let phone = match &request.phone {
        Some(raw) => Some(normalize_phone(raw).map_err(|e| Error::InvalidInput(e.to_string()))?),
        None => None,
    };

    let res = sqlx::query(
        "INSERT INTO merch_orders (student_id, merchandise_id, quantity, points_spent, status, delivery_address, phone, notes, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(student.id)
    .bind(merch_id)
    .bind(request.quantity)
    .bind(cost)
    .bind(models::OrderStatus::Pending)
    .bind(&request.delivery_address)
    .bind(&phone)
    .bind(&request.notes)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    let order_id = res.last_insert_rowid();

    sqlx::query(
        "INSERT INTO point_transactions (student_id, event_id, points, kind, description, timestamp)
         VALUES (?, NULL, ?, ?, ?, ?)",
    )
    .bind(student.id)
    .bind(-cost)
    .bind(TransactionKind::Spent)
    .bind(format!("Purchased {} x{}", merch.name, request.quantity))
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let order: MerchOrder = sqlx::query_as("SELECT * FROM merch_orders WHERE id = ?")
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::debug!(
        order = order.id,
        merchandise = merch_id,
        student = student.id,
        cost,
        "created merchandise order"
    );

    Ok(PurchaseOutcome {
        order,
        remaining_points: balance - cost,
    })
}

#[tracing::instrument(skip_all, err(Debug))]
pub async fn list_orders(pool: &SqlitePool, student: &User) -> Result<Vec<MerchOrder>, Error> {
    require_student(student)?;
    let orders = sqlx::query_as(
        "SELECT * FROM merch_orders WHERE student_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(student.id)
    .fetch_all(pool)
    .await?;
    Ok(orders)
}

#[tracing::instrument(skip_all, err(Debug))]
pub async fn get_order(
    pool: &SqlitePool,
    order_id: i64,
    student: &User,
) -> Result<MerchOrder, Error> {
    require_student(student)?;
    let order: Option<MerchOrder> =
        sqlx::query_as("SELECT * FROM merch_orders WHERE id = ? AND student_id = ?")
            .bind(order_id)
            .bind(student.id)
            .fetch_optional(pool)
            .await?;
    order.ok_or_else(|| Error::NotFound(format!("order {order_id} does not exist")))
}

#[tracing::instrument(skip_all, err(Debug))]
pub async fn get_balance(pool: &SqlitePool, student: &User) -> Result<i64, Error> {
    let profile = get_student_profile(pool, student).await?;
    Ok(profile.points)
}

#[tracing::instrument(skip_all, err(Debug))]
pub async fn get_student_profile(
    pool: &SqlitePool,
    student: &User,
) -> Result<StudentProfile, Error> {
    require_student(student)?;
    let profile: Option<StudentProfile> =
        sqlx::query_as("SELECT * FROM student_profiles WHERE user_id = ?")
            .bind(student.id)
            .fetch_optional(pool)
            .await?;
    profile.ok_or_else(|| Error::NotFound(format!("student {} has no points balance", student.id)))
}

#[tracing::instrument(skip_all, err(Debug))]
pub async fn points_overview(pool: &SqlitePool, student: &User) -> Result<PointsOverview, Error> {
    let points = get_balance(pool, student).await?;
    let history = sqlx::query_as(
        "SELECT * FROM point_transactions WHERE student_id = ? ORDER BY timestamp DESC, id DESC",
    )
    .bind(student.id)
    .fetch_all(pool)
    .await?;
    Ok(PointsOverview { points, history })
}
