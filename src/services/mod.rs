pub mod comment;
pub mod post;
pub mod timetable;

pub use comment::CommentService;
pub use post::PostService;
pub use timetable::TimetableService;
