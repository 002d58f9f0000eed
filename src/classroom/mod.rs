//! Classroom and Drive capabilities for one caller
//!
//! A [`Classroom`] binds the remote APIs to a single user id. Every operation
//! is a read that goes straight to Google; nothing is cached.

mod files;
mod filters;
mod links;

use std::sync::Arc;

use futures_util::future::join_all;
use futures_util::TryStreamExt;
use serde::Serialize;

use crate::error::Error;
use crate::google::{
    Announcement, ClassroomApi, Course, CourseWork, CourseWorkMaterial, Date, DriveApi, DriveFile,
    Material, StudentSubmission, TimeOfDay,
};
use crate::Result;

pub use files::{download_name, BatchEntry, Delivery, DownloadableFile, ExportFormat, FileDownload};
pub use filters::AssignmentFilters;
pub use links::{DownloadLinks, SignedLink, DOWNLOAD_ROUTE};

/// Coursework tagged with the name of its course.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAssignment {
    #[serde(flatten)]
    pub work: CourseWork,
    pub course_name: String,
}

/// All coursework of one course.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCoursework {
    pub course_id: String,
    pub course_name: String,
    pub coursework: Vec<CourseWork>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionState {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turned_in_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<f64>,
}

impl From<&StudentSubmission> for SubmissionState {
    fn from(submission: &StudentSubmission) -> Self {
        Self {
            state: submission.state.clone(),
            turned_in_timestamp: submission.turned_in_timestamp().map(str::to_string),
            grade: submission.assigned_grade,
        }
    }
}

/// Coursework joined with its course name and the caller's submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDetails {
    pub id: String,
    pub course_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub state: String,
    pub creation_time: String,
    pub update_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_time: Option<TimeOfDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_points: Option<f64>,
    pub work_type: String,
    pub materials: Vec<Material>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_state: Option<SubmissionState>,
}

impl AssignmentDetails {
    fn join(
        work: CourseWork,
        course_name: Option<String>,
        submission: Option<&StudentSubmission>,
    ) -> Self {
        Self {
            id: work.id,
            course_id: work.course_id,
            course_name,
            title: work.title,
            description: work.description,
            state: work.state,
            creation_time: work.creation_time,
            update_time: work.update_time,
            due_date: work.due_date,
            due_time: work.due_time,
            max_points: work.max_points,
            work_type: work.work_type,
            materials: work.materials,
            submission_state: submission.map(SubmissionState::from),
        }
    }
}

#[derive(Clone)]
pub struct Classroom {
    classroom: Arc<dyn ClassroomApi>,
    drive: Arc<dyn DriveApi>,
    links: Arc<DownloadLinks>,
    user_id: String,
}

impl Classroom {
    pub fn new(
        classroom: Arc<dyn ClassroomApi>,
        drive: Arc<dyn DriveApi>,
        links: Arc<DownloadLinks>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            classroom,
            drive,
            links,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        self.classroom.list_courses(&self.user_id).await
    }

    pub async fn get_course_info(&self, course_id: &str) -> Result<Course> {
        self.classroom.get_course(&self.user_id, course_id).await
    }

    pub async fn list_coursework(&self, course_id: &str) -> Result<Vec<CourseWork>> {
        self.classroom.list_coursework(&self.user_id, course_id).await
    }

    /// Coursework across the matching courses. A course whose coursework
    /// cannot be fetched is logged and left out.
    pub async fn search_assignments(
        &self,
        filters: &AssignmentFilters,
    ) -> Result<Vec<CourseAssignment>> {
        let compiled = filters.compile()?;

        let courses: Vec<Course> = self
            .list_courses()
            .await?
            .into_iter()
            .filter(|c| compiled.matches_course(c))
            .collect();

        tracing::debug!(
            user = %self.user_id,
            courses = courses.len(),
            "Searching assignments"
        );

        let fetched = join_all(courses.iter().map(|c| self.list_coursework(&c.id))).await;

        let mut results = Vec::new();
        for (course, outcome) in courses.iter().zip(fetched) {
            match outcome {
                Ok(works) => results.extend(
                    works
                        .into_iter()
                        .filter(|w| compiled.matches_work(w))
                        .map(|work| CourseAssignment {
                            work,
                            course_name: course.name.clone(),
                        }),
                ),
                Err(e) => {
                    tracing::warn!(course = %course.id, "Skipping course in search: {}", e);
                }
            }
        }
        Ok(results)
    }

    /// The coursework itself is required; the course name and submission are
    /// best effort.
    pub async fn get_assignment_details(
        &self,
        course_id: &str,
        coursework_id: &str,
    ) -> Result<AssignmentDetails> {
        let work = self
            .classroom
            .get_coursework(&self.user_id, course_id, coursework_id)
            .await?;

        let course_name = match self.get_course_info(course_id).await {
            Ok(course) => Some(course.name),
            Err(e) => {
                tracing::warn!(course = course_id, "Course lookup failed: {}", e);
                None
            }
        };

        let submissions = match self
            .classroom
            .list_submissions(&self.user_id, course_id, coursework_id)
            .await
        {
            Ok(submissions) => submissions,
            Err(e) => {
                tracing::warn!(coursework = coursework_id, "Submission lookup failed: {}", e);
                Vec::new()
            }
        };

        Ok(AssignmentDetails::join(work, course_name, submissions.first()))
    }

    pub async fn list_course_materials(&self, course_id: &str) -> Result<Vec<CourseWorkMaterial>> {
        self.classroom.list_materials(&self.user_id, course_id).await
    }

    pub async fn get_announcements(&self, course_id: &str) -> Result<Vec<Announcement>> {
        self.classroom
            .list_announcements(&self.user_id, course_id)
            .await
    }

    /// Every course with its coursework; a failing course contributes an
    /// empty list.
    pub async fn get_all_coursework(&self) -> Result<Vec<CourseCoursework>> {
        let courses = self.list_courses().await?;
        let fetched = join_all(courses.iter().map(|c| self.list_coursework(&c.id))).await;

        Ok(courses
            .into_iter()
            .zip(fetched)
            .map(|(course, outcome)| {
                let coursework = outcome.unwrap_or_else(|e| {
                    tracing::warn!(course = %course.id, "Coursework fetch failed: {}", e);
                    Vec::new()
                });
                CourseCoursework {
                    course_id: course.id,
                    course_name: course.name,
                    coursework,
                }
            })
            .collect())
    }

    pub async fn get_file_info(&self, file_id: &str) -> Result<DriveFile> {
        self.drive.get_file(&self.user_id, file_id).await
    }

    /// Resolve a file and issue a signed same-origin reference to it.
    pub async fn generate_download_url(&self, file_id: &str) -> Result<DownloadableFile> {
        let file = self.get_file_info(file_id).await?;
        let delivery = Delivery::for_mime(&file.mime_type);
        if delivery == Delivery::Unsupported {
            return Err(unsupported(&file));
        }

        let link = self.links.sign(&self.user_id, &file.id);
        let exported_as = match delivery {
            Delivery::Export(format) => Some(format.mime_type.to_string()),
            _ => None,
        };

        Ok(DownloadableFile {
            name: download_name(&file.name, delivery),
            download_url: link.url,
            expires_at: link.expires_at.to_rfc3339(),
            exported_as,
            id: file.id,
            mime_type: file.mime_type,
            size: file.size,
            description: file.description,
            created_time: file.created_time,
            modified_time: file.modified_time,
            web_view_link: file.web_view_link,
        })
    }

    /// Resolve each id independently. Output order follows input order and a
    /// failing id yields its error in place.
    pub async fn batch_generate_download_urls(&self, file_ids: &[String]) -> Vec<BatchEntry> {
        let resolved = join_all(file_ids.iter().map(|id| self.generate_download_url(id))).await;

        file_ids
            .iter()
            .zip(resolved)
            .map(|(id, outcome)| match outcome {
                Ok(file) => BatchEntry::File(file),
                Err(e) => BatchEntry::Failed {
                    id: id.clone(),
                    error: e.to_string(),
                },
            })
            .collect()
    }

    /// Open the bytes behind a download reference, exporting Workspace
    /// documents on the way.
    pub async fn download_file(&self, file_id: &str) -> Result<FileDownload> {
        let file = self.get_file_info(file_id).await?;
        let delivery = Delivery::for_mime(&file.mime_type);

        let (stream, mime_type) = match delivery {
            Delivery::Media => (
                self.drive.open_media(&self.user_id, &file.id).await?,
                file.mime_type.clone(),
            ),
            Delivery::Export(format) => (
                self.drive
                    .export(&self.user_id, &file.id, format.mime_type)
                    .await?,
                format.mime_type.to_string(),
            ),
            Delivery::Unsupported => return Err(unsupported(&file)),
        };

        tracing::info!(user = %self.user_id, file = %file.id, mime = %mime_type, "Streaming file");

        Ok(FileDownload {
            filename: download_name(&file.name, delivery),
            mime_type,
            stream: Box::pin(stream.map_err(|e| {
                tracing::warn!("Download stream failed: {}", e);
                e
            })),
        })
    }
}

fn unsupported(file: &DriveFile) -> Error {
    Error::Other(format!(
        "Files of type {} cannot be downloaded ({})",
        file.mime_type, file.name
    ))
}
