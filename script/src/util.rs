use anyhow::Context;
use chrono::Utc;
use models::UserRole;
use sqlx::SqlitePool;
use tracing::info;

/// Returns the first manager user, creating a demo one if none exists.
pub async fn get_or_create_manager(pool: &SqlitePool) -> anyhow::Result<i64> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE role = ? LIMIT 1")
        .bind(UserRole::Manager)
        .fetch_optional(pool)
        .await
        .context("unable to look up manager")?;

    if let Some(id) = existing {
        info!(manager = id, "using existing manager");
        return Ok(id);
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    // Find an unused demo phone number
    let mut phone = "9991234567".to_string();
    let mut counter = 0;
    loop {
        let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE phone = ?")
            .bind(&phone)
            .fetch_optional(&mut *tx)
            .await?;
        if taken.is_none() {
            break;
        }
        counter += 1;
        phone = format!("999123456{counter}");
    }

    let res = sqlx::query(
        "INSERT INTO users (username, email, role, phone, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind("manager_demo")
    .bind("manager@example.com")
    .bind(UserRole::Manager)
    .bind(&phone)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("unable to create demo manager")?;
    let manager_id = res.last_insert_rowid();

    sqlx::query("INSERT INTO manager_profiles (user_id) VALUES (?)")
        .bind(manager_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(manager = manager_id, "created demo manager");

    Ok(manager_id)
}
