use sqlx::SqlitePool;

use crate::models::{Course, Enrollment, Semester, Timetable};
use crate::paging::now_rfc3339;

pub async fn insert_timetable(
    db: &SqlitePool,
    user_id: i64,
    name: &str,
    year: i64,
    semester: Semester,
) -> Result<Timetable, sqlx::Error> {
    let now = now_rfc3339();
    let result = sqlx::query(
        "INSERT INTO timetables (user_id, year, semester, name, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(year)
    .bind(semester)
    .bind(name)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Timetable {
        id: result.last_insert_rowid(),
        user_id,
        year,
        semester,
        name: name.to_string(),
        created_at: now,
    })
}

pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<Timetable>, sqlx::Error> {
    sqlx::query_as::<_, Timetable>(
        "SELECT id, user_id, year, semester, name, created_at FROM timetables WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn list_by_user(db: &SqlitePool, user_id: i64) -> Result<Vec<Timetable>, sqlx::Error> {
    sqlx::query_as::<_, Timetable>(
        "SELECT id, user_id, year, semester, name, created_at \
         FROM timetables WHERE user_id = ? ORDER BY id ASC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn rename(db: &SqlitePool, id: i64, name: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE timetables SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete(db: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM timetables WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// Courses currently enrolled in a timetable, the read side of the
/// check-then-act window.
pub async fn enrolled_courses(
    db: &SqlitePool,
    timetable_id: i64,
) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "SELECT c.id, c.year, c.semester, c.course_number, c.lecture_number, c.title, \
                c.credit, c.instructor, c.class_slots, c.created_at \
         FROM courses c \
         JOIN enrollments e ON e.course_id = c.id \
         WHERE e.timetable_id = ? \
         ORDER BY e.id ASC",
    )
    .bind(timetable_id)
    .fetch_all(db)
    .await
}

pub async fn enrollment_exists(
    db: &SqlitePool,
    timetable_id: i64,
    course_id: i64,
) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM enrollments WHERE timetable_id = ? AND course_id = ?",
    )
    .bind(timetable_id)
    .bind(course_id)
    .fetch_optional(db)
    .await?;
    Ok(found.is_some())
}

/// The write half of the enrollment commit. The UNIQUE(timetable_id,
/// course_id) index makes a racing duplicate surface as a constraint
/// violation rather than a second row.
pub async fn insert_enrollment(
    db: &SqlitePool,
    timetable_id: i64,
    course_id: i64,
) -> Result<Enrollment, sqlx::Error> {
    let now = now_rfc3339();
    let result = sqlx::query(
        "INSERT INTO enrollments (timetable_id, course_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(timetable_id)
    .bind(course_id)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Enrollment {
        id: result.last_insert_rowid(),
        timetable_id,
        course_id,
        created_at: now,
    })
}

/// Returns whether a row was actually removed.
pub async fn delete_enrollment(
    db: &SqlitePool,
    timetable_id: i64,
    course_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM enrollments WHERE timetable_id = ? AND course_id = ?")
        .bind(timetable_id)
        .bind(course_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
