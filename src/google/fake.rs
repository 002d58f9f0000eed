//! In-memory Classroom/Drive used by tests

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bytes::Bytes;

use super::models::*;
use super::{ByteStream, ClassroomApi, DriveApi};
use crate::error::Error;
use crate::Result;

#[derive(Default)]
pub struct FakeGoogle {
    pub courses: Vec<Course>,
    pub coursework: HashMap<String, Vec<CourseWork>>,
    pub submissions: HashMap<String, Vec<StudentSubmission>>,
    pub materials: HashMap<String, Vec<CourseWorkMaterial>>,
    pub announcements: HashMap<String, Vec<Announcement>>,
    pub files: HashMap<String, (DriveFile, Vec<u8>)>,
    /// Courses whose coursework listing fails.
    pub failing_courses: HashSet<String>,
    /// Coursework ids whose submission listing fails.
    pub failing_submissions: HashSet<String>,
}

impl FakeGoogle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn course(mut self, id: &str, name: &str) -> Self {
        self.courses.push(Course {
            id: id.to_string(),
            name: name.to_string(),
            course_state: Some("ACTIVE".to_string()),
            ..Default::default()
        });
        self
    }

    /// Add published coursework due on `due` (`YYYY-MM-DD`), or with no due
    /// date when `due` is `None`.
    pub fn work(mut self, course_id: &str, id: &str, title: &str, due: Option<&str>) -> Self {
        let due_date = due.map(|d| {
            let mut parts = d.split('-').map(|p| p.parse::<u32>().unwrap_or(0));
            Date {
                year: parts.next().unwrap_or(0) as i32,
                month: parts.next().unwrap_or(0),
                day: parts.next().unwrap_or(0),
            }
        });
        self.coursework
            .entry(course_id.to_string())
            .or_default()
            .push(CourseWork {
                id: id.to_string(),
                course_id: course_id.to_string(),
                title: title.to_string(),
                state: "PUBLISHED".to_string(),
                work_type: "ASSIGNMENT".to_string(),
                creation_time: "2024-03-01T09:00:00Z".to_string(),
                update_time: "2024-03-01T09:00:00Z".to_string(),
                due_date,
                ..Default::default()
            });
        self
    }

    pub fn file(mut self, id: &str, name: &str, mime_type: &str, content: &[u8]) -> Self {
        let file = DriveFile {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size: Some(content.len().to_string()),
            ..Default::default()
        };
        self.files.insert(id.to_string(), (file, content.to_vec()));
        self
    }

    pub fn failing_course(mut self, course_id: &str) -> Self {
        self.failing_courses.insert(course_id.to_string());
        self
    }

    fn find_course(&self, course_id: &str) -> Result<&Course> {
        self.courses
            .iter()
            .find(|c| c.id == course_id)
            .ok_or_else(|| Error::NotFound(format!("Course {} not found", course_id)))
    }

    fn find_file(&self, file_id: &str) -> Result<&(DriveFile, Vec<u8>)> {
        self.files
            .get(file_id)
            .ok_or_else(|| Error::NotFound(format!("File not found: {}.", file_id)))
    }
}

fn bytes_stream(content: Vec<u8>) -> ByteStream {
    Box::pin(futures_util::stream::iter(vec![Ok(Bytes::from(content))]))
}

#[async_trait]
impl ClassroomApi for FakeGoogle {
    async fn list_courses(&self, _user_id: &str) -> Result<Vec<Course>> {
        Ok(self.courses.clone())
    }

    async fn get_course(&self, _user_id: &str, course_id: &str) -> Result<Course> {
        self.find_course(course_id).cloned()
    }

    async fn list_coursework(&self, _user_id: &str, course_id: &str) -> Result<Vec<CourseWork>> {
        if self.failing_courses.contains(course_id) {
            return Err(Error::Remote {
                status: 500,
                message: "Internal error encountered.".to_string(),
            });
        }
        Ok(self.coursework.get(course_id).cloned().unwrap_or_default())
    }

    async fn get_coursework(
        &self,
        user_id: &str,
        course_id: &str,
        coursework_id: &str,
    ) -> Result<CourseWork> {
        self.list_coursework(user_id, course_id)
            .await?
            .into_iter()
            .find(|w| w.id == coursework_id)
            .ok_or_else(|| Error::NotFound(format!("Coursework {} not found", coursework_id)))
    }

    async fn list_submissions(
        &self,
        _user_id: &str,
        _course_id: &str,
        coursework_id: &str,
    ) -> Result<Vec<StudentSubmission>> {
        if self.failing_submissions.contains(coursework_id) {
            return Err(Error::Remote {
                status: 403,
                message: "The caller does not have permission".to_string(),
            });
        }
        Ok(self.submissions.get(coursework_id).cloned().unwrap_or_default())
    }

    async fn list_materials(
        &self,
        _user_id: &str,
        course_id: &str,
    ) -> Result<Vec<CourseWorkMaterial>> {
        Ok(self.materials.get(course_id).cloned().unwrap_or_default())
    }

    async fn list_announcements(&self, _user_id: &str, course_id: &str) -> Result<Vec<Announcement>> {
        Ok(self.announcements.get(course_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl DriveApi for FakeGoogle {
    async fn get_file(&self, _user_id: &str, file_id: &str) -> Result<DriveFile> {
        Ok(self.find_file(file_id)?.0.clone())
    }

    async fn open_media(&self, _user_id: &str, file_id: &str) -> Result<ByteStream> {
        Ok(bytes_stream(self.find_file(file_id)?.1.clone()))
    }

    async fn export(&self, _user_id: &str, file_id: &str, mime_type: &str) -> Result<ByteStream> {
        let (_, content) = self.find_file(file_id)?;
        let mut exported = format!("[{}] ", mime_type).into_bytes();
        exported.extend_from_slice(content);
        Ok(bytes_stream(exported))
    }
}
