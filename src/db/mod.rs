pub mod comments;
pub mod courses;
pub mod posts;
pub mod timetables;
pub mod users;
