use sqlx::{FromRow, SqlitePool};

use crate::paging::now_rfc3339;

/// A comment joined with its author, as one row.
#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub content: String,
    pub created_at: String,
    pub user_id: i64,
    pub username: String,
}

const COMMENT_ROW_SELECT: &str = "SELECT c.id, c.post_id, c.content, c.created_at, \
            u.id AS user_id, u.username \
     FROM comments c \
     JOIN users u ON u.id = c.user_id";

pub async fn insert_comment(
    db: &SqlitePool,
    post_id: i64,
    user_id: i64,
    content: &str,
) -> Result<CommentRow, sqlx::Error> {
    let now = now_rfc3339();
    let result =
        sqlx::query("INSERT INTO comments (post_id, user_id, content, created_at) VALUES (?, ?, ?, ?)")
            .bind(post_id)
            .bind(user_id)
            .bind(content)
            .bind(&now)
            .execute(db)
            .await?;

    sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_ROW_SELECT} WHERE c.id = ?"))
        .bind(result.last_insert_rowid())
        .fetch_one(db)
        .await
}

pub async fn find_comment(db: &SqlitePool, id: i64) -> Result<Option<CommentRow>, sqlx::Error> {
    sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_ROW_SELECT} WHERE c.id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

/// All of a post's comments, newest first, ids breaking timestamp ties.
pub async fn list_by_post(db: &SqlitePool, post_id: i64) -> Result<Vec<CommentRow>, sqlx::Error> {
    sqlx::query_as::<_, CommentRow>(&format!(
        "{COMMENT_ROW_SELECT} \
         WHERE c.post_id = ? \
         ORDER BY c.created_at DESC, c.id DESC"
    ))
    .bind(post_id)
    .fetch_all(db)
    .await
}

pub async fn update_content(db: &SqlitePool, id: i64, content: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE comments SET content = ? WHERE id = ?")
        .bind(content)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete_comment(db: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
