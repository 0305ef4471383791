use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router, extract::State};
use chrono::DateTime;
use serde::Deserialize;

use crate::auth;
use crate::db::courses;
use crate::error::AppError;
use crate::models::*;
use crate::paging::FeedCursor;
use crate::services::{CommentService, PostService, TimetableService, timetable};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/timetables",
            get(list_timetables).post(create_timetable),
        )
        .route(
            "/api/v1/timetables/{id}",
            get(get_timetable)
                .patch(update_timetable)
                .delete(delete_timetable),
        )
        .route(
            "/api/v1/timetables/{id}/courses/{course_id}",
            axum::routing::post(add_course).delete(remove_course),
        )
        .route("/api/v1/courses", get(search_courses))
        .route("/api/v1/courses/{id}", get(get_course))
        .route("/api/v1/boards/{id}/posts", get(board_feed).post(create_post))
        .route("/api/v1/posts/{id}", get(get_post))
        .route(
            "/api/v1/posts/{id}/like",
            axum::routing::post(like_post).delete(unlike_post),
        )
        .route(
            "/api/v1/posts/{id}/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/api/v1/posts/{id}/comments/{comment_id}",
            axum::routing::put(update_comment).delete(delete_comment),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

// ---- timetables ----

async fn create_timetable(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateTimetableRequest>,
) -> Result<(StatusCode, Json<Timetable>), AppError> {
    let user = auth::current_user(&state, &headers).await?;
    let service = TimetableService::new(state.db.clone(), state.timetable_locks.clone());
    let timetable = service.create(&user, req).await?;
    Ok((StatusCode::CREATED, Json(timetable)))
}

async fn list_timetables(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Timetable>>, AppError> {
    let user = auth::current_user(&state, &headers).await?;
    let service = TimetableService::new(state.db.clone(), state.timetable_locks.clone());
    Ok(Json(service.list(&user).await?))
}

async fn get_timetable(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<TimetableDetailResponse>, AppError> {
    let user = auth::current_user(&state, &headers).await?;
    let service = TimetableService::new(state.db.clone(), state.timetable_locks.clone());
    Ok(Json(service.detail(id, &user).await?))
}

async fn update_timetable(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTimetableRequest>,
) -> Result<Json<Timetable>, AppError> {
    let user = auth::current_user(&state, &headers).await?;
    let service = TimetableService::new(state.db.clone(), state.timetable_locks.clone());
    Ok(Json(service.rename(id, &user, req).await?))
}

async fn delete_timetable(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let user = auth::current_user(&state, &headers).await?;
    let service = TimetableService::new(state.db.clone(), state.timetable_locks.clone());
    service.delete(id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_course(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, course_id)): Path<(i64, i64)>,
) -> Result<Json<EnrollmentResponse>, AppError> {
    let user = auth::current_user(&state, &headers).await?;
    let service = TimetableService::new(state.db.clone(), state.timetable_locks.clone());
    Ok(Json(service.add_course(id, course_id, &user).await?))
}

async fn remove_course(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, course_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    let user = auth::current_user(&state, &headers).await?;
    let service = TimetableService::new(state.db.clone(), state.timetable_locks.clone());
    service.remove_course(id, course_id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- course catalog ----

#[derive(Debug, Deserialize)]
struct CourseSearchParams {
    year: i64,
    semester: Semester,
    keyword: Option<String>,
    next_id: Option<i64>,
    limit: Option<u32>,
}

async fn search_courses(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CourseSearchParams>,
) -> Result<Json<CourseSearchResponse>, AppError> {
    auth::current_user(&state, &headers).await?;
    let limit = crate::paging::clamp_limit(params.limit);
    let response = timetable::search_courses(
        &state.db,
        params.year,
        params.semester,
        params.keyword.as_deref(),
        params.next_id,
        limit,
    )
    .await?;
    Ok(Json(response))
}

async fn get_course(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Course>, AppError> {
    auth::current_user(&state, &headers).await?;
    let course = courses::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

// ---- boards & posts ----

#[derive(Debug, Deserialize)]
struct FeedParams {
    limit: Option<u32>,
    next_created_at: Option<String>,
    next_id: Option<i64>,
}

impl FeedParams {
    /// Both cursor halves or neither; a lone half is a malformed cursor,
    /// and so is a timestamp half that is not RFC 3339. An unparsed string
    /// would still compare lexically in SQL, above every real timestamp.
    fn cursor(&self) -> Result<Option<FeedCursor>, AppError> {
        match (&self.next_created_at, self.next_id) {
            (Some(created_at), Some(id)) => {
                if DateTime::parse_from_rfc3339(created_at).is_err() {
                    return Err(AppError::BadRequest(
                        "next_created_at must be an RFC 3339 timestamp".to_string(),
                    ));
                }
                Ok(Some(FeedCursor {
                    created_at: created_at.clone(),
                    id,
                }))
            }
            (None, None) => Ok(None),
            _ => Err(AppError::BadRequest(
                "cursor requires both next_created_at and next_id".to_string(),
            )),
        }
    }
}

async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(board_id): Path<i64>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostDto>), AppError> {
    let user = auth::current_user(&state, &headers).await?;
    let post = PostService::new(state.db.clone())
        .create(board_id, &user, req)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn board_feed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(board_id): Path<i64>,
    Query(params): Query<FeedParams>,
) -> Result<Json<FeedResponse>, AppError> {
    auth::current_user(&state, &headers).await?;
    let cursor = params.cursor()?;
    let feed = PostService::new(state.db.clone())
        .feed(board_id, cursor, params.limit)
        .await?;
    Ok(Json(feed))
}

async fn get_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<PostDto>, AppError> {
    auth::current_user(&state, &headers).await?;
    Ok(Json(PostService::new(state.db.clone()).get(id).await?))
}

async fn like_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let user = auth::current_user(&state, &headers).await?;
    PostService::new(state.db.clone()).like(id, &user).await?;
    Ok(StatusCode::OK)
}

async fn unlike_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let user = auth::current_user(&state, &headers).await?;
    PostService::new(state.db.clone()).unlike(id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- comments ----

async fn list_comments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Vec<CommentDto>>, AppError> {
    auth::current_user(&state, &headers).await?;
    Ok(Json(CommentService::new(state.db.clone()).list(id).await?))
}

async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentDto>), AppError> {
    let user = auth::current_user(&state, &headers).await?;
    let comment = CommentService::new(state.db.clone())
        .create(id, &user, req)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, comment_id)): Path<(i64, i64)>,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<Json<CommentDto>, AppError> {
    let user = auth::current_user(&state, &headers).await?;
    let comment = CommentService::new(state.db.clone())
        .update(id, comment_id, &user, req)
        .await?;
    Ok(Json(comment))
}

async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, comment_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    let user = auth::current_user(&state, &headers).await?;
    CommentService::new(state.db.clone())
        .delete(id, comment_id, &user)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
