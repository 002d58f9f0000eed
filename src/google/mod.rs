//! Google Classroom and Drive access.
//!
//! [`ClassroomApi`] and [`DriveApi`] are the read-only remote surface the
//! capability adapters are written against. [`GoogleClient`] implements both
//! over REST; tests substitute an in-memory fake.

mod client;
pub mod models;

#[cfg(test)]
pub(crate) mod fake;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use crate::Result;

pub use client::GoogleClient;
pub use models::*;

/// File content streamed from Drive.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Scopes the stored user tokens must carry.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/classroom.courses.readonly",
    "https://www.googleapis.com/auth/classroom.coursework.me.readonly",
    "https://www.googleapis.com/auth/classroom.courseworkmaterials.readonly",
    "https://www.googleapis.com/auth/classroom.announcements.readonly",
    "https://www.googleapis.com/auth/drive.readonly",
];

#[async_trait]
pub trait ClassroomApi: Send + Sync {
    /// Active courses the user is enrolled in as a student.
    async fn list_courses(&self, user_id: &str) -> Result<Vec<Course>>;

    async fn get_course(&self, user_id: &str, course_id: &str) -> Result<Course>;

    async fn list_coursework(&self, user_id: &str, course_id: &str) -> Result<Vec<CourseWork>>;

    async fn get_coursework(
        &self,
        user_id: &str,
        course_id: &str,
        coursework_id: &str,
    ) -> Result<CourseWork>;

    /// The user's own submissions for one piece of coursework.
    async fn list_submissions(
        &self,
        user_id: &str,
        course_id: &str,
        coursework_id: &str,
    ) -> Result<Vec<StudentSubmission>>;

    async fn list_materials(&self, user_id: &str, course_id: &str)
        -> Result<Vec<CourseWorkMaterial>>;

    async fn list_announcements(&self, user_id: &str, course_id: &str) -> Result<Vec<Announcement>>;
}

#[async_trait]
pub trait DriveApi: Send + Sync {
    async fn get_file(&self, user_id: &str, file_id: &str) -> Result<DriveFile>;

    /// Raw bytes of a binary (non-Workspace) file.
    async fn open_media(&self, user_id: &str, file_id: &str) -> Result<ByteStream>;

    /// A Workspace document converted to `mime_type`.
    async fn export(&self, user_id: &str, file_id: &str, mime_type: &str) -> Result<ByteStream>;
}
