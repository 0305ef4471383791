use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::User;
use crate::paging::now_rfc3339;

/// Create a user with a fresh opaque bearer token. Credential issuance
/// proper (passwords, JWT) lives outside this service; seeding and tests go
/// through here.
pub async fn insert_user(db: &SqlitePool, username: &str) -> Result<User, sqlx::Error> {
    let token = Uuid::new_v4().to_string();
    let now = now_rfc3339();

    let result = sqlx::query("INSERT INTO users (username, token, created_at) VALUES (?, ?, ?)")
        .bind(username)
        .bind(&token)
        .bind(&now)
        .execute(db)
        .await?;

    Ok(User {
        id: result.last_insert_rowid(),
        username: username.to_string(),
        token,
        created_at: now,
    })
}

pub async fn find_by_token(db: &SqlitePool, token: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT id, username, token, created_at FROM users WHERE token = ?")
        .bind(token)
        .fetch_optional(db)
        .await
}
