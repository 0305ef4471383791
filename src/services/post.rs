use sqlx::SqlitePool;
use tracing::info;

use crate::db::posts;
use crate::error::AppError;
use crate::models::post::BoardSummary;
use crate::models::{CreatePostRequest, FeedResponse, PostDto, User, UserSummary};
use crate::paging::{self, FeedCursor};

/// Post reads and the engagement counter. Likes are idempotent single-
/// statement writes; the counter is always derived from the live rows.
pub struct PostService {
    db: SqlitePool,
}

impl PostService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        board_id: i64,
        user: &User,
        req: CreatePostRequest,
    ) -> Result<PostDto, AppError> {
        if req.title.trim().is_empty() || req.content.trim().is_empty() {
            return Err(AppError::BadRequest(
                "title and content must not be blank".to_string(),
            ));
        }
        let board = posts::find_board(&self.db, board_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let post = posts::insert_post(&self.db, board_id, user.id, &req.title, &req.content).await?;
        info!(post_id = post.id, board_id, "post created");

        Ok(PostDto {
            id: post.id,
            title: post.title,
            content: post.content,
            created_at: post.created_at,
            like_count: 0,
            user: UserSummary::from(user),
            board: BoardSummary {
                id: board.id,
                name: board.name,
            },
        })
    }

    pub async fn get(&self, post_id: i64) -> Result<PostDto, AppError> {
        let row = posts::find_post(&self.db, post_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let like_count = posts::like_count(&self.db, post_id).await?;
        Ok(to_dto(row, like_count))
    }

    /// One page of a board's feed: one query for the posts (joined with
    /// author and board), one bulk query for the like counts.
    pub async fn feed(
        &self,
        board_id: i64,
        cursor: Option<FeedCursor>,
        limit: Option<u32>,
    ) -> Result<FeedResponse, AppError> {
        posts::find_board(&self.db, board_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let limit = paging::clamp_limit(limit);
        let rows = posts::feed_page(&self.db, board_id, cursor.as_ref(), limit as i64 + 1).await?;
        let (rows, has_next) = paging::split_page(rows, limit);

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let counts = posts::like_counts(&self.db, &ids).await?;

        let paging = paging::feed_paging(&rows, has_next, |r| FeedCursor {
            created_at: r.created_at.clone(),
            id: r.id,
        });
        let data = rows
            .into_iter()
            .map(|row| {
                let likes = counts.get(&row.id).copied().unwrap_or(0);
                to_dto(row, likes)
            })
            .collect();

        Ok(FeedResponse { data, paging })
    }

    pub async fn like(&self, post_id: i64, user: &User) -> Result<(), AppError> {
        posts::find_post(&self.db, post_id)
            .await?
            .ok_or(AppError::NotFound)?;
        posts::like(&self.db, post_id, user.id).await?;
        Ok(())
    }

    /// Unliking something never liked is still a success.
    pub async fn unlike(&self, post_id: i64, user: &User) -> Result<(), AppError> {
        posts::find_post(&self.db, post_id)
            .await?
            .ok_or(AppError::NotFound)?;
        posts::unlike(&self.db, post_id, user.id).await?;
        Ok(())
    }
}

fn to_dto(row: posts::PostRow, like_count: i64) -> PostDto {
    PostDto {
        id: row.id,
        title: row.title,
        content: row.content,
        created_at: row.created_at,
        like_count,
        user: UserSummary {
            id: row.user_id,
            username: row.username,
        },
        board: BoardSummary {
            id: row.board_id,
            name: row.board_name,
        },
    }
}
