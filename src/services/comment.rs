use sqlx::SqlitePool;
use tracing::info;

use crate::db::{comments, posts};
use crate::error::AppError;
use crate::models::{CommentDto, CreateCommentRequest, UpdateCommentRequest, User, UserSummary};

/// Comments on posts. Listing is always newest-first; edits and deletes
/// are restricted to the comment's author.
pub struct CommentService {
    db: SqlitePool,
}

impl CommentService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn list(&self, post_id: i64) -> Result<Vec<CommentDto>, AppError> {
        posts::find_post(&self.db, post_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let rows = comments::list_by_post(&self.db, post_id).await?;
        Ok(rows.into_iter().map(to_dto).collect())
    }

    pub async fn create(
        &self,
        post_id: i64,
        user: &User,
        req: CreateCommentRequest,
    ) -> Result<CommentDto, AppError> {
        if req.content.trim().is_empty() {
            return Err(AppError::BadRequest("content must not be blank".to_string()));
        }
        posts::find_post(&self.db, post_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let row = comments::insert_comment(&self.db, post_id, user.id, &req.content).await?;
        info!(comment_id = row.id, post_id, "comment created");
        Ok(to_dto(row))
    }

    pub async fn update(
        &self,
        post_id: i64,
        comment_id: i64,
        user: &User,
        req: UpdateCommentRequest,
    ) -> Result<CommentDto, AppError> {
        let row = self.owned_comment(post_id, comment_id, user).await?;
        if req.content.trim().is_empty() {
            return Err(AppError::BadRequest("content must not be blank".to_string()));
        }

        comments::update_content(&self.db, row.id, &req.content).await?;
        Ok(CommentDto {
            content: req.content,
            ..to_dto(row)
        })
    }

    pub async fn delete(
        &self,
        post_id: i64,
        comment_id: i64,
        user: &User,
    ) -> Result<(), AppError> {
        let row = self.owned_comment(post_id, comment_id, user).await?;
        comments::delete_comment(&self.db, row.id).await?;
        info!(comment_id, post_id, "comment deleted");
        Ok(())
    }

    /// A comment under the given post, or NotFound; someone else's comment
    /// is Forbidden.
    async fn owned_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        user: &User,
    ) -> Result<comments::CommentRow, AppError> {
        let row = comments::find_comment(&self.db, comment_id)
            .await?
            .filter(|c| c.post_id == post_id)
            .ok_or(AppError::NotFound)?;
        if row.user_id != user.id {
            return Err(AppError::Forbidden);
        }
        Ok(row)
    }
}

fn to_dto(row: comments::CommentRow) -> CommentDto {
    CommentDto {
        id: row.id,
        content: row.content,
        created_at: row.created_at,
        user: UserSummary {
            id: row.user_id,
            username: row.username,
        },
    }
}
