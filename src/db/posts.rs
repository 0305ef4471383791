use std::collections::HashMap;

use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::models::{Board, Post};
use crate::paging::{FeedCursor, now_rfc3339};

pub async fn insert_board(db: &SqlitePool, name: &str) -> Result<Board, sqlx::Error> {
    let now = now_rfc3339();
    let result = sqlx::query("INSERT INTO boards (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(&now)
        .execute(db)
        .await?;

    Ok(Board {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        created_at: now,
    })
}

pub async fn find_board(db: &SqlitePool, id: i64) -> Result<Option<Board>, sqlx::Error> {
    sqlx::query_as::<_, Board>("SELECT id, name, created_at FROM boards WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn insert_post(
    db: &SqlitePool,
    board_id: i64,
    user_id: i64,
    title: &str,
    content: &str,
) -> Result<Post, sqlx::Error> {
    let now = now_rfc3339();
    let result = sqlx::query(
        "INSERT INTO posts (board_id, user_id, title, content, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(board_id)
    .bind(user_id)
    .bind(title)
    .bind(content)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Post {
        id: result.last_insert_rowid(),
        board_id,
        user_id,
        title: title.to_string(),
        content: content.to_string(),
        created_at: now,
    })
}

/// A post joined with its author and board, as one row. Like counts come
/// from the separate bulk query so page assembly stays at two queries.
#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub user_id: i64,
    pub username: String,
    pub board_id: i64,
    pub board_name: String,
}

const POST_ROW_SELECT: &str = "SELECT p.id, p.title, p.content, p.created_at, \
            u.id AS user_id, u.username, b.id AS board_id, b.name AS board_name \
     FROM posts p \
     JOIN users u ON u.id = p.user_id \
     JOIN boards b ON b.id = p.board_id";

pub async fn find_post(db: &SqlitePool, id: i64) -> Result<Option<PostRow>, sqlx::Error> {
    sqlx::query_as::<_, PostRow>(&format!("{POST_ROW_SELECT} WHERE p.id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

/// One feed window: rows strictly after the cursor in
/// (created_at DESC, id DESC) order, `fetch` = limit + 1 for the lookahead.
pub async fn feed_page(
    db: &SqlitePool,
    board_id: i64,
    cursor: Option<&FeedCursor>,
    fetch: i64,
) -> Result<Vec<PostRow>, sqlx::Error> {
    match cursor {
        Some(cursor) => {
            sqlx::query_as::<_, PostRow>(&format!(
                "{POST_ROW_SELECT} \
                 WHERE p.board_id = ? \
                   AND (p.created_at < ? OR (p.created_at = ? AND p.id < ?)) \
                 ORDER BY p.created_at DESC, p.id DESC LIMIT ?"
            ))
            .bind(board_id)
            .bind(&cursor.created_at)
            .bind(&cursor.created_at)
            .bind(cursor.id)
            .bind(fetch)
            .fetch_all(db)
            .await
        }
        None => {
            sqlx::query_as::<_, PostRow>(&format!(
                "{POST_ROW_SELECT} \
                 WHERE p.board_id = ? \
                 ORDER BY p.created_at DESC, p.id DESC LIMIT ?"
            ))
            .bind(board_id)
            .bind(fetch)
            .fetch_all(db)
            .await
        }
    }
}

/// Bulk like counts for a page of posts, one GROUP BY query keyed by the
/// page's ids. Posts with no likes are simply absent from the map.
pub async fn like_counts(
    db: &SqlitePool,
    post_ids: &[i64],
) -> Result<HashMap<i64, i64>, sqlx::Error> {
    if post_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT post_id, COUNT(*) AS likes FROM post_likes WHERE post_id IN (");
    let mut separated = builder.separated(", ");
    for id in post_ids {
        separated.push_bind(*id);
    }
    builder.push(") GROUP BY post_id");

    let rows: Vec<(i64, i64)> = builder.build_query_as().fetch_all(db).await?;
    Ok(rows.into_iter().collect())
}

pub async fn like_count(db: &SqlitePool, post_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM post_likes WHERE post_id = ?")
        .bind(post_id)
        .fetch_one(db)
        .await
}

/// Idempotent like: a single insert-or-ignore against the
/// UNIQUE(post_id, user_id) index. Concurrent duplicates all succeed and
/// leave exactly one row.
pub async fn like(db: &SqlitePool, post_id: i64, user_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO post_likes (post_id, user_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(post_id)
    .bind(user_id)
    .bind(now_rfc3339())
    .execute(db)
    .await?;
    Ok(())
}

/// Idempotent unlike: deleting an absent row is a no-op success by
/// contract, so there is no row-count check.
pub async fn unlike(db: &SqlitePool, post_id: i64, user_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND user_id = ?")
        .bind(post_id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}
