//! REST client for Classroom v1 and Drive v3

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::models::*;
use super::{ByteStream, ClassroomApi, DriveApi};
use crate::auth::GoogleAuthProvider;
use crate::error::Error;
use crate::Result;

const CLASSROOM_API_URL: &str = "https://classroom.googleapis.com/v1";
const DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";

const DRIVE_FILE_FIELDS: &str = "id,name,mimeType,size,createdTime,modifiedTime,webViewLink,iconLink,thumbnailLink,description,owners(displayName,emailAddress)";

/// Guard against a misbehaving `nextPageToken`.
const MAX_PAGES: usize = 50;

#[derive(Clone)]
pub struct GoogleClient {
    auth: GoogleAuthProvider,
    http: Client,
    classroom_base: String,
    drive_base: String,
}

impl GoogleClient {
    pub fn new(auth: GoogleAuthProvider) -> Self {
        Self {
            auth,
            http: Client::new(),
            classroom_base: CLASSROOM_API_URL.to_string(),
            drive_base: DRIVE_API_URL.to_string(),
        }
    }

    /// Override both API roots (useful against a local stand-in).
    pub fn with_base_urls(mut self, classroom: impl Into<String>, drive: impl Into<String>) -> Self {
        self.classroom_base = classroom.into();
        self.drive_base = drive.into();
        self
    }

    fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(base)
            .map_err(|e| Error::Config(format!("Invalid API base URL {}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("API base URL cannot be a base: {}", base)))?
            .extend(segments);
        Ok(url)
    }

    fn classroom(&self, segments: &[&str]) -> Result<Url> {
        Self::endpoint(&self.classroom_base, segments)
    }

    fn drive(&self, segments: &[&str]) -> Result<Url> {
        Self::endpoint(&self.drive_base, segments)
    }

    /// Send an authenticated request. A 401 triggers one forced token
    /// refresh and a retry with the rotated token.
    async fn send<F>(&self, user_id: &str, build: F) -> Result<Response>
    where
        F: Fn(&str) -> RequestBuilder + Send + Sync,
    {
        let token = self.auth.access_token(user_id).await?;
        let mut response = build(&token).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::info!(user = user_id, "Google rejected access token, refreshing");
            let token = self.auth.force_refresh(user_id).await?;
            response = build(&token).send().await?;
        }

        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        user_id: &str,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .send(user_id, |token| {
                self.http.get(url.clone()).bearer_auth(token).query(query)
            })
            .await?;
        Ok(response.json().await?)
    }

    /// Collect every page of a Classroom list call. `field` names the array
    /// in the page body (`courses`, `courseWork`, ...); a missing field is an
    /// empty page.
    async fn list_all<T: DeserializeOwned>(
        &self,
        user_id: &str,
        url: Url,
        query: &[(&str, &str)],
        field: &str,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut params: Vec<(&str, &str)> = query.to_vec();
            if let Some(ref token) = page_token {
                params.push(("pageToken", token.as_str()));
            }

            let mut page: Value = self.get_json(user_id, url.clone(), &params).await?;

            if let Some(array) = page.get_mut(field).map(Value::take) {
                let batch: Vec<T> = serde_json::from_value(array)?;
                items.extend(batch);
            }

            page_token = page
                .get("nextPageToken")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string);

            if page_token.is_none() {
                return Ok(items);
            }
        }

        tracing::warn!(%url, "Stopped paginating after {} pages", MAX_PAGES);
        Ok(items)
    }

    async fn stream(&self, user_id: &str, url: Url, query: &[(&str, &str)]) -> Result<ByteStream> {
        let response = self
            .send(user_id, |token| {
                self.http.get(url.clone()).bearer_auth(token).query(query)
            })
            .await?;
        Ok(Box::pin(response.bytes_stream().map(|chunk| chunk.map_err(Error::from))))
    }
}

/// Map non-success statuses to typed errors, using Google's error message
/// when the body carries one.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        });

    if status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(message));
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Auth(message));
    }
    Err(Error::Remote {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ClassroomApi for GoogleClient {
    async fn list_courses(&self, user_id: &str) -> Result<Vec<Course>> {
        let url = self.classroom(&["courses"])?;
        self.list_all(
            user_id,
            url,
            &[("studentId", "me"), ("courseStates", "ACTIVE")],
            "courses",
        )
        .await
    }

    async fn get_course(&self, user_id: &str, course_id: &str) -> Result<Course> {
        let url = self.classroom(&["courses", course_id])?;
        self.get_json(user_id, url, &[]).await
    }

    async fn list_coursework(&self, user_id: &str, course_id: &str) -> Result<Vec<CourseWork>> {
        let url = self.classroom(&["courses", course_id, "courseWork"])?;
        self.list_all(user_id, url, &[], "courseWork").await
    }

    async fn get_coursework(
        &self,
        user_id: &str,
        course_id: &str,
        coursework_id: &str,
    ) -> Result<CourseWork> {
        let url = self.classroom(&["courses", course_id, "courseWork", coursework_id])?;
        self.get_json(user_id, url, &[]).await
    }

    async fn list_submissions(
        &self,
        user_id: &str,
        course_id: &str,
        coursework_id: &str,
    ) -> Result<Vec<StudentSubmission>> {
        let url = self.classroom(&[
            "courses",
            course_id,
            "courseWork",
            coursework_id,
            "studentSubmissions",
        ])?;
        self.list_all(user_id, url, &[("userId", "me")], "studentSubmissions")
            .await
    }

    async fn list_materials(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Vec<CourseWorkMaterial>> {
        let url = self.classroom(&["courses", course_id, "courseWorkMaterials"])?;
        self.list_all(user_id, url, &[], "courseWorkMaterial").await
    }

    async fn list_announcements(&self, user_id: &str, course_id: &str) -> Result<Vec<Announcement>> {
        let url = self.classroom(&["courses", course_id, "announcements"])?;
        self.list_all(user_id, url, &[], "announcements").await
    }
}

#[async_trait]
impl DriveApi for GoogleClient {
    async fn get_file(&self, user_id: &str, file_id: &str) -> Result<DriveFile> {
        let url = self.drive(&["files", file_id])?;
        self.get_json(
            user_id,
            url,
            &[("fields", DRIVE_FILE_FIELDS), ("supportsAllDrives", "true")],
        )
        .await
    }

    async fn open_media(&self, user_id: &str, file_id: &str) -> Result<ByteStream> {
        let url = self.drive(&["files", file_id])?;
        self.stream(user_id, url, &[("alt", "media"), ("supportsAllDrives", "true")])
            .await
    }

    async fn export(&self, user_id: &str, file_id: &str, mime_type: &str) -> Result<ByteStream> {
        let url = self.drive(&["files", file_id, "export"])?;
        self.stream(user_id, url, &[("mimeType", mime_type)]).await
    }
}
