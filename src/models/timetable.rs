use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::course::{Course, Semester};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Timetable {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub year: i64,
    pub semester: Semester,
    pub name: String,
    pub created_at: String,
}

/// The join row stating a course is scheduled into a timetable. Its
/// existence is the sole source of truth for occupancy.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: i64,
    pub timetable_id: i64,
    pub course_id: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTimetableRequest {
    pub name: String,
    pub year: i64,
    pub semester: Semester,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTimetableRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentResponse {
    pub id: i64,
    pub course_id: i64,
    pub course_title: String,
    pub credit: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimetableDetailResponse {
    pub timetable: Timetable,
    pub courses: Vec<Course>,
    pub credits: i64,
}
