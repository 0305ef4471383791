pub mod comment;
pub mod course;
pub mod post;
pub mod timetable;
pub mod user;

pub use comment::{CommentDto, CreateCommentRequest, UpdateCommentRequest};
pub use course::{Course, CourseSearchResponse, NewCourse, Semester};
pub use post::{Board, BoardSummary, CreatePostRequest, FeedResponse, Post, PostDto};
pub use timetable::{
    CreateTimetableRequest, Enrollment, EnrollmentResponse, Timetable, TimetableDetailResponse,
    UpdateTimetableRequest,
};
pub use user::{User, UserSummary};
