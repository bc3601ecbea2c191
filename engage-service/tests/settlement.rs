use chrono::Utc;
use engage_service::db;
use engage_service::error::Error;
use engage_utils::scoring::SubmittedAnswer;
use models::{EventType, NewUser, Participation, PointTransaction, UserRole};
use sqlx::SqlitePool;

async fn seed_user(pool: &SqlitePool, username: &str, role: UserRole) -> models::User {
    db::create_user(
        pool,
        NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            role,
            phone: None,
            university: None,
            telegram_id: None,
            interests: None,
        },
    )
    .await
    .unwrap()
}

/// Creates a quiz event with `n` questions, each with one correct and one
/// incorrect answer. Returns the event id and per-question
/// (question_id, correct_answer_id, wrong_answer_id).
async fn seed_quiz_event(
    pool: &SqlitePool,
    manager_id: i64,
    points: i64,
    passing_score: i64,
    n: usize,
) -> (i64, Vec<(i64, i64, i64)>) {
    let now = Utc::now();
    let res = sqlx::query(
        "INSERT INTO events (title, description, event_type, manager_id, points, is_active, created_at, updated_at)
         VALUES (?, 'test quiz', ?, ?, ?, 1, ?, ?)",
    )
    .bind(format!("quiz-{points}-{passing_score}-{n}-{now}"))
    .bind(EventType::Quiz)
    .bind(manager_id)
    .bind(points)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
    let event_id = res.last_insert_rowid();

    let res = sqlx::query("INSERT INTO quizzes (event_id, time_limit, passing_score) VALUES (?, 300, ?)")
        .bind(event_id)
        .bind(passing_score)
        .execute(pool)
        .await
        .unwrap();
    let quiz_id = res.last_insert_rowid();

    let mut question_ids = Vec::with_capacity(n);
    for ord in 0..n {
        let res = sqlx::query("INSERT INTO quiz_questions (quiz_id, question_text, ord) VALUES (?, 'q', ?)")
            .bind(quiz_id)
            .bind(ord as i64)
            .execute(pool)
            .await
            .unwrap();
        let question_id = res.last_insert_rowid();

        let res = sqlx::query("INSERT INTO quiz_answers (question_id, answer_text, is_correct) VALUES (?, 'right', 1)")
            .bind(question_id)
            .execute(pool)
            .await
            .unwrap();
        let correct_id = res.last_insert_rowid();
        let res = sqlx::query("INSERT INTO quiz_answers (question_id, answer_text, is_correct) VALUES (?, 'wrong', 0)")
            .bind(question_id)
            .execute(pool)
            .await
            .unwrap();
        let wrong_id = res.last_insert_rowid();

        question_ids.push((question_id, correct_id, wrong_id));
    }

    (event_id, question_ids)
}

/// Answers the first `correct` questions correctly and the rest incorrectly.
fn answers_with(questions: &[(i64, i64, i64)], correct: usize) -> Vec<SubmittedAnswer> {
    questions
        .iter()
        .enumerate()
        .map(|(i, (question_id, correct_id, wrong_id))| SubmittedAnswer {
            question_id: *question_id,
            answer_id: if i < correct { *correct_id } else { *wrong_id },
        })
        .collect()
}

async fn completion_count(pool: &SqlitePool, event_id: i64) -> i64 {
    sqlx::query_scalar("SELECT completion_count FROM events WHERE id = ?")
        .bind(event_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn participation(pool: &SqlitePool, event_id: i64, student_id: i64) -> Participation {
    sqlx::query_as("SELECT * FROM participations WHERE event_id = ? AND student_id = ?")
        .bind(event_id)
        .bind(student_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn ledger(pool: &SqlitePool, student_id: i64) -> Vec<PointTransaction> {
    sqlx::query_as("SELECT * FROM point_transactions WHERE student_id = ? ORDER BY id")
        .bind(student_id)
        .fetch_all(pool)
        .await
        .unwrap()
}

/// Submit 3/5 correct (60%, passing 70) -> not completed, no points.
/// Resubmit 4/5 (80%) -> completed, credited once.
/// Resubmit 5/5 -> score overwritten, no additional credit.
#[tokio::test]
async fn passing_transition_credits_points_exactly_once() {
    let pool = models::db::connect_memory().await.unwrap();
    let manager = seed_user(&pool, "manager", UserRole::Manager).await;
    let student = seed_user(&pool, "student", UserRole::Student).await;
    let (event_id, questions) = seed_quiz_event(&pool, manager.id, 50, 70, 5).await;

    let outcome = db::submit_quiz(&pool, event_id, &student, &answers_with(&questions, 3))
        .await
        .unwrap();
    assert_eq!(outcome.score, 60);
    assert_eq!(outcome.correct_count, 3);
    assert_eq!(outcome.total_questions, 5);
    assert!(!outcome.passed);
    assert_eq!(outcome.points_earned, 0);
    assert_eq!(outcome.current_points, 0);
    assert_eq!(completion_count(&pool, event_id).await, 0);

    let p = participation(&pool, event_id, student.id).await;
    assert!(!p.completed);
    assert!(!p.credited);
    assert_eq!(p.score, 60);
    assert_eq!(p.completed_at, None);

    let outcome = db::submit_quiz(&pool, event_id, &student, &answers_with(&questions, 4))
        .await
        .unwrap();
    assert_eq!(outcome.score, 80);
    assert!(outcome.passed);
    assert_eq!(outcome.points_earned, 50);
    assert_eq!(outcome.current_points, 50);
    assert_eq!(completion_count(&pool, event_id).await, 1);

    let p = participation(&pool, event_id, student.id).await;
    assert!(p.completed);
    assert!(p.credited);
    let first_completed_at = p.completed_at.unwrap();

    let outcome = db::submit_quiz(&pool, event_id, &student, &answers_with(&questions, 5))
        .await
        .unwrap();
    assert_eq!(outcome.score, 100);
    assert!(outcome.passed);
    assert_eq!(outcome.points_earned, 0);
    assert_eq!(outcome.current_points, 50);
    assert_eq!(completion_count(&pool, event_id).await, 1);

    let p = participation(&pool, event_id, student.id).await;
    assert!(p.completed);
    assert_eq!(p.score, 100);
    // completed_at marks the first passing transition only
    assert_eq!(p.completed_at.unwrap(), first_completed_at);

    // Exactly one EARNED entry; ledger sum equals balance
    let entries = ledger(&pool, student.id).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].points, 50);
    assert_eq!(entries[0].event_id, Some(event_id));
    let sum: i64 = entries.iter().map(|t| t.points).sum();
    assert_eq!(sum, db::get_balance(&pool, &student).await.unwrap());
}

/// Unknown question/answer ids are skipped, never counted, never an error.
#[tokio::test]
async fn unknown_ids_are_skipped() {
    let pool = models::db::connect_memory().await.unwrap();
    let manager = seed_user(&pool, "manager", UserRole::Manager).await;
    let student = seed_user(&pool, "student", UserRole::Student).await;
    let (event_id, questions) = seed_quiz_event(&pool, manager.id, 50, 70, 2).await;

    let bogus = vec![
        SubmittedAnswer {
            question_id: 999_999,
            answer_id: questions[0].1,
        },
        SubmittedAnswer {
            question_id: questions[0].0,
            answer_id: 999_999,
        },
    ];
    let outcome = db::submit_quiz(&pool, event_id, &student, &bogus).await.unwrap();
    assert_eq!(outcome.score, 0);
    assert_eq!(outcome.correct_count, 0);
    assert!(!outcome.passed);
    assert_eq!(outcome.points_earned, 0);
}

/// Registering two users with equivalent phone spellings conflicts: both
/// spellings normalize to the same canonical national form, which is what
/// the unique constraint sees.
#[tokio::test]
async fn equivalent_phone_spellings_conflict() {
    let pool = models::db::connect_memory().await.unwrap();

    let first = db::create_user(
        &pool,
        NewUser {
            username: "first".to_string(),
            email: "first@example.com".to_string(),
            role: UserRole::Student,
            phone: Some("+7 (999) 123-45-67".to_string()),
            university: None,
            telegram_id: None,
            interests: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(first.phone.as_deref(), Some("9991234567"));

    let err = db::create_user(
        &pool,
        NewUser {
            username: "second".to_string(),
            email: "second@example.com".to_string(),
            role: UserRole::Student,
            phone: Some("89991234567".to_string()),
            university: None,
            telegram_id: None,
            interests: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "{err:?}");

    // The failed registration left no user or profile row behind
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(users, 1);
    let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student_profiles")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(profiles, 1);

    let err = db::create_user(
        &pool,
        NewUser {
            username: "third".to_string(),
            email: "third@example.com".to_string(),
            role: UserRole::Student,
            phone: Some("12345".to_string()),
            university: None,
            telegram_id: None,
            interests: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)), "{err:?}");
}

/// Starting an event twice leaves a single participation row and counts a
/// single view; a later view never resets submission state.
#[tokio::test]
async fn record_view_is_idempotent() {
    let pool = models::db::connect_memory().await.unwrap();
    let manager = seed_user(&pool, "manager", UserRole::Manager).await;
    let student = seed_user(&pool, "student", UserRole::Student).await;
    let (event_id, questions) = seed_quiz_event(&pool, manager.id, 50, 70, 2).await;

    db::start_event(&pool, event_id, &student).await.unwrap();
    db::start_event(&pool, event_id, &student).await.unwrap();

    let views: i64 = sqlx::query_scalar("SELECT views_count FROM events WHERE id = ?")
        .bind(event_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(views, 1);

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM participations WHERE event_id = ? AND student_id = ?",
    )
    .bind(event_id)
    .bind(student.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(rows, 1);

    db::submit_quiz(&pool, event_id, &student, &answers_with(&questions, 2))
        .await
        .unwrap();
    db::record_view(&pool, event_id, &student).await.unwrap();

    let p = participation(&pool, event_id, student.id).await;
    assert!(p.completed);
    assert_eq!(p.score, 100);
}

#[tokio::test]
async fn submit_rejects_missing_and_non_quiz_events() {
    let pool = models::db::connect_memory().await.unwrap();
    let manager = seed_user(&pool, "manager", UserRole::Manager).await;
    let student = seed_user(&pool, "student", UserRole::Student).await;

    let err = db::submit_quiz(&pool, 999, &student, &[]).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "{err:?}");

    let now = Utc::now();
    let res = sqlx::query(
        "INSERT INTO events (title, description, event_type, manager_id, points, is_active, created_at, updated_at)
         VALUES ('game', 'test minigame', ?, ?, 30, 1, ?, ?)",
    )
    .bind(EventType::Minigame)
    .bind(manager.id)
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await
    .unwrap();
    let minigame_event = res.last_insert_rowid();

    let err = db::submit_quiz(&pool, minigame_event, &student, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)), "{err:?}");

    // A QUIZ-type event without its quiz row is malformed, not missing
    let res = sqlx::query(
        "INSERT INTO events (title, description, event_type, manager_id, points, is_active, created_at, updated_at)
         VALUES ('bare', 'quiz row never created', ?, ?, 30, 1, ?, ?)",
    )
    .bind(EventType::Quiz)
    .bind(manager.id)
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await
    .unwrap();
    let bare_quiz_event = res.last_insert_rowid();

    let err = db::submit_quiz(&pool, bare_quiz_event, &student, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)), "{err:?}");
}

#[tokio::test]
async fn manager_cannot_submit() {
    let pool = models::db::connect_memory().await.unwrap();
    let manager = seed_user(&pool, "manager", UserRole::Manager).await;
    let (event_id, questions) = seed_quiz_event(&pool, manager.id, 50, 70, 2).await;

    let err = db::submit_quiz(&pool, event_id, &manager, &answers_with(&questions, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(_)), "{err:?}");
}

/// First feedback lands, a duplicate for the same (event, student) conflicts,
/// out-of-range ratings are rejected up front.
#[tokio::test]
async fn duplicate_feedback_conflicts() {
    let pool = models::db::connect_memory().await.unwrap();
    let manager = seed_user(&pool, "manager", UserRole::Manager).await;
    let student = seed_user(&pool, "student", UserRole::Student).await;
    let (event_id, _) = seed_quiz_event(&pool, manager.id, 50, 70, 1).await;

    let err = db::submit_feedback(&pool, event_id, &student, 0, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)), "{err:?}");
    let err = db::submit_feedback(&pool, event_id, &student, 6, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)), "{err:?}");

    let feedback = db::submit_feedback(&pool, event_id, &student, 5, Some("great".to_string()))
        .await
        .unwrap();
    assert_eq!(feedback.rating, 5);

    let err = db::submit_feedback(&pool, event_id, &student, 4, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "{err:?}");

    let mine = db::my_feedbacks(&pool, &student).await.unwrap();
    assert_eq!(mine.len(), 1);
}

/// Completed events listing shows only passed participations.
#[tokio::test]
async fn completed_events_lists_passed_participations() {
    let pool = models::db::connect_memory().await.unwrap();
    let manager = seed_user(&pool, "manager", UserRole::Manager).await;
    let student = seed_user(&pool, "student", UserRole::Student).await;
    let (passed_event, q1) = seed_quiz_event(&pool, manager.id, 50, 70, 2).await;
    let (failed_event, q2) = seed_quiz_event(&pool, manager.id, 40, 70, 2).await;

    db::submit_quiz(&pool, passed_event, &student, &answers_with(&q1, 2))
        .await
        .unwrap();
    db::submit_quiz(&pool, failed_event, &student, &answers_with(&q2, 1))
        .await
        .unwrap();

    let completed = db::completed_events(&pool, &student).await.unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].event.id, passed_event);
    assert!(completed[0].participation.completed);
}
