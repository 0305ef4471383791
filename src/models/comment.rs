use serde::{Deserialize, Serialize};

use super::user::UserSummary;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

/// A comment as readers see it, with its author attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentDto {
    pub id: i64,
    pub content: String,
    pub created_at: String,
    pub user: UserSummary,
}
