use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{Datelike, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use campusplan::api::router;
use campusplan::auth::{InMemoryRevocationList, NoRevocation};
use campusplan::db;
use campusplan::models::{Course, NewCourse, Semester, User};
use campusplan::schedule::{ClassSlot, DayOfWeek};
use campusplan::state::AppState;

async fn setup() -> (Router, SqlitePool) {
    // One connection: a pooled :memory: database is per-connection, and a
    // single connection still yields at every await point.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("create test db");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    let state = AppState::new(pool.clone(), Arc::new(NoRevocation));
    (router(state), pool)
}

fn this_year() -> i64 {
    Utc::now().year() as i64
}

async fn new_user(pool: &SqlitePool) -> User {
    db::users::insert_user(pool, &format!("user-{}", Uuid::new_v4()))
        .await
        .expect("insert user")
}

async fn new_course(
    pool: &SqlitePool,
    year: i64,
    semester: Semester,
    title: &str,
    credit: i64,
    slots: Vec<ClassSlot>,
) -> Course {
    db::courses::insert_course(
        pool,
        NewCourse {
            year,
            semester,
            course_number: format!("M{}", Uuid::new_v4().as_simple()),
            lecture_number: "001".to_string(),
            title: title.to_string(),
            credit,
            instructor: None,
            class_slots: slots,
        },
    )
    .await
    .expect("insert course")
}

fn slot(day: DayOfWeek, start: i64, end: i64) -> ClassSlot {
    ClassSlot::new(day, start, end).expect("valid slot")
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    };

    let response = app.clone().oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse body")
    };
    (status, json)
}

async fn create_timetable(app: &Router, token: &str, name: &str) -> (StatusCode, Value) {
    request(
        app,
        "POST",
        "/api/v1/timetables",
        token,
        Some(json!({ "name": name, "year": this_year(), "semester": "FALL" })),
    )
    .await
}

#[tokio::test]
async fn creates_a_timetable() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;

    let (status, body) = create_timetable(&app, &user.token, "fall schedule").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "fall schedule");
    assert_eq!(body["year"], this_year());
    assert_eq!(body["semester"], "FALL");
    assert!(body["id"].is_i64());
}

#[tokio::test]
async fn rejects_blank_timetable_name() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;

    let (status, _) = create_timetable(&app, &user.token, "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejects_out_of_range_year() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;

    for year in [2012, this_year() + 1] {
        let (status, _) = request(
            &app,
            "POST",
            "/api/v1/timetables",
            &user.token,
            Some(json!({ "name": "schedule", "year": year, "semester": "FALL" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "year {year}");
    }
}

#[tokio::test]
async fn rejects_duplicate_timetable() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;

    let (status, _) = create_timetable(&app, &user.token, "fall schedule").await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = create_timetable(&app, &user.token, "fall schedule").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn lists_only_own_timetables() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;
    let other = new_user(&pool).await;
    create_timetable(&app, &user.token, "first").await;
    create_timetable(&app, &user.token, "second").await;
    create_timetable(&app, &other.token, "theirs").await;

    let (status, body) = request(&app, "GET", "/api/v1/timetables", &user.token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn detail_sums_credits_over_enrolled_courses() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;
    let (_, timetable) = create_timetable(&app, &user.token, "fall schedule").await;
    let timetable_id = timetable["id"].as_i64().expect("timetable id");

    let specs = [
        ("data structures", 3, DayOfWeek::Monday),
        ("algorithms", 3, DayOfWeek::Tuesday),
        ("databases", 4, DayOfWeek::Wednesday),
    ];
    for (title, credit, day) in specs {
        let course = new_course(
            &pool,
            this_year(),
            Semester::Fall,
            title,
            credit,
            vec![slot(day, 540, 630)],
        )
        .await;
        let (status, _) = request(
            &app,
            "POST",
            &format!("/api/v1/timetables/{timetable_id}/courses/{}", course.id),
            &user.token,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/v1/timetables/{timetable_id}"),
        &user.token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["courses"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["credits"], 10);
    assert_eq!(body["timetable"]["id"], timetable_id);
}

#[tokio::test]
async fn detail_is_owner_only() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;
    let other = new_user(&pool).await;
    let (_, timetable) = create_timetable(&app, &user.token, "mine").await;
    let id = timetable["id"].as_i64().unwrap();

    let (status, _) = request(
        &app,
        "GET",
        &format!("/api/v1/timetables/{id}"),
        &other.token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(&app, "GET", "/api/v1/timetables/999999", &user.token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn renames_a_timetable() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;
    let (_, timetable) = create_timetable(&app, &user.token, "old name").await;
    let id = timetable["id"].as_i64().unwrap();

    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/v1/timetables/{id}"),
        &user.token,
        Some(json!({ "name": "new name" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "new name");
    assert_eq!(body["id"], id);
}

#[tokio::test]
async fn rename_validations() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;
    let other = new_user(&pool).await;
    create_timetable(&app, &user.token, "taken").await;
    let (_, timetable) = create_timetable(&app, &user.token, "mine").await;
    let id = timetable["id"].as_i64().unwrap();
    let uri = format!("/api/v1/timetables/{id}");

    let (status, _) = request(&app, "PATCH", &uri, &user.token, Some(json!({ "name": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(
        &app,
        "PATCH",
        &uri,
        &user.token,
        Some(json!({ "name": "taken" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = request(
        &app,
        "PATCH",
        &uri,
        &other.token,
        Some(json!({ "name": "stolen" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        "PATCH",
        "/api/v1/timetables/999999",
        &user.token,
        Some(json!({ "name": "ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deletes_a_timetable() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;
    let other = new_user(&pool).await;
    let (_, timetable) = create_timetable(&app, &user.token, "to delete").await;
    let id = timetable["id"].as_i64().unwrap();
    let uri = format!("/api/v1/timetables/{id}");

    let (status, _) = request(&app, "DELETE", &uri, &other.token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(&app, "DELETE", &uri, &user.token, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = request(&app, "GET", &uri, &user.token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(&app, "DELETE", "/api/v1/timetables/999999", &user.token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn adds_a_course() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;
    let (_, timetable) = create_timetable(&app, &user.token, "fall schedule").await;
    let timetable_id = timetable["id"].as_i64().unwrap();
    let course = new_course(
        &pool,
        this_year(),
        Semester::Fall,
        "data structures",
        3,
        vec![slot(DayOfWeek::Monday, 540, 630)],
    )
    .await;

    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/v1/timetables/{timetable_id}/courses/{}", course.id),
        &user.token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["course_title"], "data structures");
    assert_eq!(body["credit"], 3);
    assert!(body["id"].is_i64());
}

#[tokio::test]
async fn rejects_overlapping_course() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;
    let (_, timetable) = create_timetable(&app, &user.token, "fall schedule").await;
    let timetable_id = timetable["id"].as_i64().unwrap();

    let first = new_course(
        &pool,
        this_year(),
        Semester::Fall,
        "data structures",
        3,
        vec![slot(DayOfWeek::Monday, 540, 630)],
    )
    .await;
    let second = new_course(
        &pool,
        this_year(),
        Semester::Fall,
        "algorithms",
        3,
        vec![slot(DayOfWeek::Monday, 600, 690)],
    )
    .await;

    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/v1/timetables/{timetable_id}/courses/{}", first.id),
        &user.token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/v1/timetables/{timetable_id}/courses/{}", second.id),
        &user.token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn concurrent_overlapping_adds_resolve_to_one_success() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;

    // Not a single-run property: repeat with fresh timetables so the racing
    // interleavings vary across trials.
    for trial in 0..10 {
        let (_, timetable) = create_timetable(&app, &user.token, &format!("trial {trial}")).await;
        let timetable_id = timetable["id"].as_i64().unwrap();

        let first = new_course(
            &pool,
            this_year(),
            Semester::Fall,
            "data structures",
            3,
            vec![slot(DayOfWeek::Monday, 540, 630)],
        )
        .await;
        let second = new_course(
            &pool,
            this_year(),
            Semester::Fall,
            "algorithms",
            3,
            vec![slot(DayOfWeek::Monday, 600, 690)],
        )
        .await;

        let mut handles = Vec::new();
        for course_id in [first.id, second.id] {
            let app = app.clone();
            let token = user.token.clone();
            handles.push(tokio::spawn(async move {
                let (status, _) = request(
                    &app,
                    "POST",
                    &format!("/api/v1/timetables/{timetable_id}/courses/{course_id}"),
                    &token,
                    None,
                )
                .await;
                status
            }));
        }

        let mut statuses = Vec::new();
        for handle in handles {
            statuses.push(handle.await.expect("task finished"));
        }

        let successes = statuses.iter().filter(|s| **s == StatusCode::OK).count();
        let conflicts = statuses
            .iter()
            .filter(|s| **s == StatusCode::CONFLICT)
            .count();
        assert_eq!(successes, 1, "trial {trial}: {statuses:?}");
        assert_eq!(conflicts, 1, "trial {trial}: {statuses:?}");
    }
}

#[tokio::test]
async fn cannot_add_course_to_another_users_timetable() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;
    let other = new_user(&pool).await;
    let (_, timetable) = create_timetable(&app, &user.token, "mine").await;
    let timetable_id = timetable["id"].as_i64().unwrap();
    let course = new_course(
        &pool,
        this_year(),
        Semester::Fall,
        "data structures",
        3,
        vec![slot(DayOfWeek::Monday, 540, 630)],
    )
    .await;

    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/v1/timetables/{timetable_id}/courses/{}", course.id),
        &other.token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn rejects_mismatched_year_or_semester() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;
    let (_, timetable) = create_timetable(&app, &user.token, "fall schedule").await;
    let timetable_id = timetable["id"].as_i64().unwrap();

    // The course data itself is fine, it just belongs to a different term.
    let wrong_year = new_course(
        &pool,
        this_year() - 1,
        Semester::Fall,
        "old course",
        3,
        vec![slot(DayOfWeek::Monday, 540, 630)],
    )
    .await;
    let wrong_semester = new_course(
        &pool,
        this_year(),
        Semester::Spring,
        "spring course",
        3,
        vec![slot(DayOfWeek::Tuesday, 540, 630)],
    )
    .await;

    for course in [wrong_year, wrong_semester] {
        let (status, _) = request(
            &app,
            "POST",
            &format!("/api/v1/timetables/{timetable_id}/courses/{}", course.id),
            &user.token,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn add_course_missing_entities_are_not_found() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;
    let (_, timetable) = create_timetable(&app, &user.token, "fall schedule").await;
    let timetable_id = timetable["id"].as_i64().unwrap();
    let course = new_course(
        &pool,
        this_year(),
        Semester::Fall,
        "data structures",
        3,
        vec![slot(DayOfWeek::Monday, 540, 630)],
    )
    .await;

    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/v1/timetables/{timetable_id}/courses/999999"),
        &user.token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/v1/timetables/999999/courses/{}", course.id),
        &user.token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rejects_duplicate_enrollment() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;
    let (_, timetable) = create_timetable(&app, &user.token, "fall schedule").await;
    let timetable_id = timetable["id"].as_i64().unwrap();
    let course = new_course(
        &pool,
        this_year(),
        Semester::Fall,
        "data structures",
        3,
        vec![slot(DayOfWeek::Monday, 540, 630)],
    )
    .await;
    let uri = format!("/api/v1/timetables/{timetable_id}/courses/{}", course.id);

    let (status, _) = request(&app, "POST", &uri, &user.token, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = request(&app, "POST", &uri, &user.token, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn removes_a_course() {
    let (app, pool) = setup().await;
    let user = new_user(&pool).await;
    let other = new_user(&pool).await;
    let (_, timetable) = create_timetable(&app, &user.token, "fall schedule").await;
    let timetable_id = timetable["id"].as_i64().unwrap();
    let course = new_course(
        &pool,
        this_year(),
        Semester::Fall,
        "data structures",
        3,
        vec![slot(DayOfWeek::Monday, 540, 630)],
    )
    .await;
    let uri = format!("/api/v1/timetables/{timetable_id}/courses/{}", course.id);

    let (status, _) = request(&app, "POST", &uri, &user.token, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(&app, "DELETE", &uri, &other.token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(&app, "DELETE", &uri, &user.token, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Gone now, and the timetable itself is still valid: bad request.
    let (status, _) = request(&app, "DELETE", &uri, &user.token, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/v1/timetables/999999/courses/{}", course.id),
        &user.token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn revoked_or_missing_credentials_are_unauthorized() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("create test db");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    let revocation = Arc::new(InMemoryRevocationList::new());
    let state = AppState::new(pool.clone(), revocation.clone());
    let app = router(state);

    let user = new_user(&pool).await;

    let (status, _) = request(&app, "GET", "/api/v1/timetables", &user.token, None).await;
    assert_eq!(status, StatusCode::OK);

    revocation
        .revoke_until(&user.token, Utc::now() + chrono::Duration::hours(1))
        .await;
    let (status, _) = request(&app, "GET", "/api/v1/timetables", &user.token, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(&app, "GET", "/api/v1/timetables", "not-a-token", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/timetables")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
