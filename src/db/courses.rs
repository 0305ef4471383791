use sqlx::SqlitePool;

use crate::models::{Course, NewCourse, Semester};
use crate::paging::now_rfc3339;

const COURSE_COLUMNS: &str = "id, year, semester, course_number, lecture_number, title, credit, \
                              instructor, class_slots, created_at";

/// Insert a catalog course. Callers are the trusted ingestion path and
/// tests; slot ranges are validated where the slots are constructed.
pub async fn insert_course(db: &SqlitePool, new: NewCourse) -> Result<Course, sqlx::Error> {
    debug_assert!(
        new.class_slots
            .iter()
            .all(|s| s.start_minute < s.end_minute),
        "malformed class slot handed to ingestion"
    );
    let slots_json =
        serde_json::to_string(&new.class_slots).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    let now = now_rfc3339();

    let result = sqlx::query(
        "INSERT INTO courses \
         (year, semester, course_number, lecture_number, title, credit, instructor, class_slots, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(new.year)
    .bind(new.semester)
    .bind(&new.course_number)
    .bind(&new.lecture_number)
    .bind(&new.title)
    .bind(new.credit)
    .bind(&new.instructor)
    .bind(&slots_json)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Course {
        id: result.last_insert_rowid(),
        year: new.year,
        semester: new.semester,
        course_number: new.course_number,
        lecture_number: new.lecture_number,
        title: new.title,
        credit: new.credit,
        instructor: new.instructor,
        class_slots: new.class_slots,
        created_at: now,
    })
}

pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Catalog search window: ascending-id cursor, `fetch` rows (the caller
/// passes limit + 1 for the has-next lookahead). The keyword matches title
/// or instructor as a substring; an empty keyword matches everything.
pub async fn search(
    db: &SqlitePool,
    year: i64,
    semester: Semester,
    keyword: Option<&str>,
    next_id: Option<i64>,
    fetch: i64,
) -> Result<Vec<Course>, sqlx::Error> {
    let pattern = format!("%{}%", keyword.unwrap_or(""));
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses \
         WHERE year = ? AND semester = ? AND id > ? \
           AND (title LIKE ? OR COALESCE(instructor, '') LIKE ?) \
         ORDER BY id ASC LIMIT ?"
    ))
    .bind(year)
    .bind(semester)
    .bind(next_id.unwrap_or(0))
    .bind(&pattern)
    .bind(&pattern)
    .bind(fetch)
    .fetch_all(db)
    .await
}
