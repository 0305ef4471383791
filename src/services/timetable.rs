use std::sync::Arc;

use chrono::{Datelike, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::db::{courses, timetables};
use crate::error::AppError;
use crate::locks::KeyedLocks;
use crate::models::{
    CreateTimetableRequest, EnrollmentResponse, Semester, Timetable, TimetableDetailResponse,
    UpdateTimetableRequest, User,
};
use crate::schedule;

/// Oldest year the catalog covers.
const MIN_YEAR: i64 = 2013;

/// The enrollment engine plus timetable CRUD. All mutations verify
/// ownership; the add-course path serializes its read-check-write window
/// through the per-timetable keyed lock.
pub struct TimetableService {
    db: SqlitePool,
    locks: Arc<KeyedLocks>,
}

impl TimetableService {
    pub fn new(db: SqlitePool, locks: Arc<KeyedLocks>) -> Self {
        Self { db, locks }
    }

    pub async fn create(
        &self,
        user: &User,
        req: CreateTimetableRequest,
    ) -> Result<Timetable, AppError> {
        validate_name(&req.name)?;
        validate_year(req.year)?;

        let timetable = timetables::insert_timetable(
            &self.db,
            user.id,
            req.name.trim(),
            req.year,
            req.semester,
        )
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "a timetable with this name already exists"))?;

        info!(
            timetable_id = timetable.id,
            user_id = user.id,
            "timetable created"
        );
        Ok(timetable)
    }

    pub async fn list(&self, user: &User) -> Result<Vec<Timetable>, AppError> {
        Ok(timetables::list_by_user(&self.db, user.id).await?)
    }

    pub async fn detail(
        &self,
        timetable_id: i64,
        user: &User,
    ) -> Result<TimetableDetailResponse, AppError> {
        let timetable = self.owned_timetable(timetable_id, user).await?;
        let courses = timetables::enrolled_courses(&self.db, timetable_id).await?;
        let credits = courses.iter().map(|c| c.credit).sum();
        Ok(TimetableDetailResponse {
            timetable,
            courses,
            credits,
        })
    }

    pub async fn rename(
        &self,
        timetable_id: i64,
        user: &User,
        req: UpdateTimetableRequest,
    ) -> Result<Timetable, AppError> {
        validate_name(&req.name)?;
        let mut timetable = self.owned_timetable(timetable_id, user).await?;

        timetables::rename(&self.db, timetable_id, req.name.trim())
            .await
            .map_err(|e| {
                AppError::conflict_on_unique(e, "a timetable with this name already exists")
            })?;
        timetable.name = req.name.trim().to_string();
        Ok(timetable)
    }

    pub async fn delete(&self, timetable_id: i64, user: &User) -> Result<(), AppError> {
        self.owned_timetable(timetable_id, user).await?;
        timetables::delete(&self.db, timetable_id).await?;
        info!(timetable_id, user_id = user.id, "timetable deleted");
        Ok(())
    }

    /// Admit a course into a timetable. The keyed lock is held from before
    /// the first read until the insert commits, so two racing adds on the
    /// same timetable resolve to exactly one success and one conflict.
    pub async fn add_course(
        &self,
        timetable_id: i64,
        course_id: i64,
        user: &User,
    ) -> Result<EnrollmentResponse, AppError> {
        let _scope = self
            .locks
            .acquire(timetable_id)
            .await
            .ok_or_else(|| AppError::Unavailable("timetable is busy, retry".to_string()))?;

        let timetable = self.owned_timetable(timetable_id, user).await?;
        let course = courses::find_by_id(&self.db, course_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if course.year != timetable.year || course.semester != timetable.semester {
            return Err(AppError::BadRequest(
                "course year/semester does not match the timetable".to_string(),
            ));
        }
        if timetables::enrollment_exists(&self.db, timetable_id, course_id).await? {
            return Err(AppError::Conflict(
                "course is already in this timetable".to_string(),
            ));
        }

        let enrolled = timetables::enrolled_courses(&self.db, timetable_id).await?;
        if schedule::overlaps_any(
            &course.class_slots,
            enrolled.iter().map(|c| c.class_slots.as_slice()),
        ) {
            return Err(AppError::Conflict(
                "course overlaps an enrolled course".to_string(),
            ));
        }

        // The unique index backs the check above in case of a writer that
        // bypassed this lock.
        let enrollment = timetables::insert_enrollment(&self.db, timetable_id, course_id)
            .await
            .map_err(|e| AppError::conflict_on_unique(e, "course is already in this timetable"))?;

        info!(timetable_id, course_id, "course enrolled");
        Ok(EnrollmentResponse {
            id: enrollment.id,
            course_id: course.id,
            course_title: course.title,
            credit: course.credit,
        })
    }

    /// Removing an enrollment cannot violate the no-overlap invariant, so
    /// no lock is taken.
    pub async fn remove_course(
        &self,
        timetable_id: i64,
        course_id: i64,
        user: &User,
    ) -> Result<(), AppError> {
        self.owned_timetable(timetable_id, user).await?;

        let removed = timetables::delete_enrollment(&self.db, timetable_id, course_id).await?;
        if !removed {
            // The timetable itself is valid, so this is a bad request, not
            // a missing resource.
            return Err(AppError::BadRequest(
                "course is not in this timetable".to_string(),
            ));
        }
        info!(timetable_id, course_id, "course removed");
        Ok(())
    }

    async fn owned_timetable(&self, timetable_id: i64, user: &User) -> Result<Timetable, AppError> {
        let timetable = timetables::find_by_id(&self.db, timetable_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if timetable.user_id != user.id {
            return Err(AppError::Forbidden);
        }
        Ok(timetable)
    }
}

pub fn validate_year(year: i64) -> Result<(), AppError> {
    let current = Utc::now().year() as i64;
    if !(MIN_YEAR..=current).contains(&year) {
        return Err(AppError::BadRequest(format!(
            "year must be between {MIN_YEAR} and {current}"
        )));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be blank".to_string()));
    }
    Ok(())
}

/// Catalog search shares the year window with timetable creation.
pub async fn search_courses(
    db: &SqlitePool,
    year: i64,
    semester: Semester,
    keyword: Option<&str>,
    next_id: Option<i64>,
    limit: u32,
) -> Result<crate::models::CourseSearchResponse, AppError> {
    validate_year(year)?;
    let rows = courses::search(db, year, semester, keyword, next_id, limit as i64 + 1).await?;
    let (data, has_next) = crate::paging::split_page(rows, limit);
    let next_id = if has_next {
        data.last().map(|c| c.id)
    } else {
        None
    };
    Ok(crate::models::CourseSearchResponse {
        data,
        next_id,
        has_next,
    })
}
