use anyhow::Context;
use chrono::Utc;
use models::EventType;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::util::get_or_create_manager;

struct QuizSpec {
    title: &'static str,
    description: &'static str,
    points: i64,
    time_limit: i64,
    passing_score: i64,
    questions: &'static [(&'static str, &'static [(&'static str, bool)])],
}

const DIGITAL_SKILLS: QuizSpec = QuizSpec {
    title: "Digital Skills Quiz",
    description: "Test your knowledge about digital technologies, programming, and modern IT trends. This quiz covers topics from basic programming concepts to advanced system architecture.",
    points: 50,
    time_limit: 600,
    passing_score: 70,
    questions: &[
        (
            "What is React?",
            &[
                ("A JavaScript library for building user interfaces", true),
                ("A database management system", false),
                ("A programming language", false),
                ("A web server framework", false),
            ],
        ),
        (
            "What does API stand for?",
            &[
                ("Application Programming Interface", true),
                ("Automated Program Integration", false),
                ("Advanced Programming Interface", false),
                ("Application Process Integration", false),
            ],
        ),
        (
            "Which HTTP method is used for creating resources?",
            &[
                ("POST", true),
                ("GET", false),
                ("PUT", false),
                ("DELETE", false),
            ],
        ),
        (
            "What is the purpose of JWT tokens?",
            &[
                ("Secure authentication and authorization", true),
                ("Database encryption", false),
                ("File compression", false),
                ("Network routing", false),
            ],
        ),
        (
            "What is Rust's borrow checker for?",
            &[
                ("Enforcing memory safety at compile time", true),
                ("Formatting source code", false),
                ("Scheduling async tasks", false),
                ("Managing package versions", false),
            ],
        ),
    ],
};

const PROGRAMMING_BASICS: QuizSpec = QuizSpec {
    title: "Programming Fundamentals Quiz",
    description: "Master the basics of programming. This quiz covers variables, data types, control structures, and functions.",
    points: 40,
    time_limit: 450,
    passing_score: 75,
    questions: &[
        (
            "What is the correct way to create a list in Python?",
            &[
                ("my_list = [1, 2, 3]", true),
                ("my_list = (1, 2, 3)", false),
                ("my_list = {1, 2, 3}", false),
                ("my_list = \"1, 2, 3\"", false),
            ],
        ),
        (
            "Which keyword is used to define a function in Python?",
            &[
                ("def", true),
                ("function", false),
                ("define", false),
                ("func", false),
            ],
        ),
        (
            "What does len() return?",
            &[
                ("The number of items in an object", true),
                ("The length of a string only", false),
                ("The maximum value in a list", false),
                ("The type of an object", false),
            ],
        ),
    ],
};

pub async fn seed_events(pool: &SqlitePool) -> anyhow::Result<()> {
    let manager_id = get_or_create_manager(pool).await?;

    for spec in [&DIGITAL_SKILLS, &PROGRAMMING_BASICS] {
        seed_quiz(pool, manager_id, spec).await?;
    }
    seed_minigame(pool, manager_id).await?;

    let active: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE is_active = 1")
        .fetch_one(pool)
        .await?;
    info!(active, "seeded sample events");

    Ok(())
}

async fn seed_quiz(pool: &SqlitePool, manager_id: i64, spec: &QuizSpec) -> anyhow::Result<()> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM events WHERE title = ?")
        .bind(spec.title)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        warn!(title = spec.title, "quiz event already exists");
        return Ok(());
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let res = sqlx::query(
        "INSERT INTO events (title, description, event_type, manager_id, points, is_active, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(spec.title)
    .bind(spec.description)
    .bind(EventType::Quiz)
    .bind(manager_id)
    .bind(spec.points)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("unable to insert quiz event")?;
    let event_id = res.last_insert_rowid();

    let res = sqlx::query(
        "INSERT INTO quizzes (event_id, time_limit, passing_score) VALUES (?, ?, ?)",
    )
    .bind(event_id)
    .bind(spec.time_limit)
    .bind(spec.passing_score)
    .execute(&mut *tx)
    .await?;
    let quiz_id = res.last_insert_rowid();

    for (ord, (question_text, answers)) in spec.questions.iter().enumerate() {
        let res = sqlx::query(
            "INSERT INTO quiz_questions (quiz_id, question_text, ord) VALUES (?, ?, ?)",
        )
        .bind(quiz_id)
        .bind(question_text)
        .bind(ord as i64 + 1)
        .execute(&mut *tx)
        .await?;
        let question_id = res.last_insert_rowid();

        for (answer_text, is_correct) in answers.iter() {
            sqlx::query(
                "INSERT INTO quiz_answers (question_id, answer_text, is_correct) VALUES (?, ?, ?)",
            )
            .bind(question_id)
            .bind(answer_text)
            .bind(is_correct)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    info!(title = spec.title, event = event_id, "created quiz event");

    Ok(())
}

async fn seed_minigame(pool: &SqlitePool, manager_id: i64) -> anyhow::Result<()> {
    let title = "Code Challenge Minigame";
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM events WHERE title = ?")
        .bind(title)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        warn!(title, "minigame event already exists");
        return Ok(());
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let res = sqlx::query(
        "INSERT INTO events (title, description, event_type, manager_id, points, is_active, created_at, updated_at)
         VALUES (?, ?, ?, ?, 30, 1, ?, ?)",
    )
    .bind(title)
    .bind("Complete coding challenges and puzzles to earn points. Test your problem-solving skills with fun interactive games.")
    .bind(EventType::Minigame)
    .bind(manager_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    let event_id = res.last_insert_rowid();

    sqlx::query("INSERT INTO minigames (event_id, game_type, instructions) VALUES (?, ?, ?)")
        .bind(event_id)
        .bind("coding_challenge")
        .bind("Solve the coding puzzles by writing correct code snippets. You have 3 attempts to complete each challenge. Good luck!")
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(title, event = event_id, "created minigame event");

    Ok(())
}
