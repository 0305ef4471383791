use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, sqlite::SqliteRow};

use crate::schedule::ClassSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Semester {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Semester {
    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::Spring => "SPRING",
            Semester::Summer => "SUMMER",
            Semester::Fall => "FALL",
            Semester::Winter => "WINTER",
        }
    }
}

/// A catalog course. Created by the ingestion collaborator and immutable
/// afterwards; the slot list is persisted as a JSON column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub year: i64,
    pub semester: Semester,
    pub course_number: String,
    pub lecture_number: String,
    pub title: String,
    pub credit: i64,
    pub instructor: Option<String>,
    pub class_slots: Vec<ClassSlot>,
    pub created_at: String,
}

// Manual FromRow: the slot list is a JSON TEXT column.
impl FromRow<'_, SqliteRow> for Course {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let slots_json: String = row.try_get("class_slots")?;
        let class_slots =
            serde_json::from_str(&slots_json).map_err(|e| sqlx::Error::ColumnDecode {
                index: "class_slots".to_string(),
                source: Box::new(e),
            })?;
        Ok(Self {
            id: row.try_get("id")?,
            year: row.try_get("year")?,
            semester: row.try_get("semester")?,
            course_number: row.try_get("course_number")?,
            lecture_number: row.try_get("lecture_number")?,
            title: row.try_get("title")?,
            credit: row.try_get("credit")?,
            instructor: row.try_get("instructor")?,
            class_slots,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
    pub year: i64,
    pub semester: Semester,
    pub course_number: String,
    pub lecture_number: String,
    pub title: String,
    pub credit: i64,
    pub instructor: Option<String>,
    pub class_slots: Vec<ClassSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSearchResponse {
    pub data: Vec<Course>,
    pub next_id: Option<i64>,
    pub has_next: bool,
}
