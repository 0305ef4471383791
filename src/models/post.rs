use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::user::UserSummary;
use crate::paging::FeedPaging;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Board {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub board_id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSummary {
    pub id: i64,
    pub name: String,
}

/// A post as readers see it: author, board, and the derived like count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDto {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub like_count: i64,
    pub user: UserSummary,
    pub board: BoardSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResponse {
    pub data: Vec<PostDto>,
    pub paging: FeedPaging,
}
