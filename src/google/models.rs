//! Classroom and Drive resource shapes.
//!
//! Only the fields the agent reads or forwards are modelled; everything is
//! optional except identifiers, since Google omits empty fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_heading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_folder: Option<DriveFolder>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFolder {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_link: Option<String>,
}

/// Calendar date; Google leaves unknown parts at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Date {
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub month: u32,
    #[serde(default)]
    pub day: u32,
}

impl Date {
    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
}

/// One attachment on coursework, a material or an announcement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive_file: Option<SharedDriveFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_video: Option<YouTubeVideo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<Form>,
}

impl Material {
    pub fn drive_file_id(&self) -> Option<&str> {
        self.drive_file.as_ref().map(|f| f.drive_file.id.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedDriveFile {
    pub drive_file: DriveFileRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFileRef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeVideo {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub form_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseWork {
    pub id: String,
    #[serde(default)]
    pub course_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_link: Option<String>,
    #[serde(default)]
    pub creation_time: String,
    #[serde(default)]
    pub update_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_time: Option<TimeOfDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_points: Option<f64>,
    #[serde(default)]
    pub work_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSubmission {
    pub id: String,
    #[serde(default)]
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    #[serde(default)]
    pub late: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submission_history: Vec<SubmissionHistory>,
}

impl StudentSubmission {
    /// Most recent time the student turned the work in.
    pub fn turned_in_timestamp(&self) -> Option<&str> {
        self.submission_history
            .iter()
            .filter_map(|h| h.state_history.as_ref())
            .filter(|s| s.state == "TURNED_IN")
            .filter_map(|s| s.state_timestamp.as_deref())
            .max()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionHistory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_history: Option<StateHistory>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateHistory {
    #[serde(default)]
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseWorkMaterial {
    pub id: String,
    #[serde(default)]
    pub course_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub creation_time: String,
    #[serde(default)]
    pub update_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    #[serde(default)]
    pub course_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub creation_time: String,
    #[serde(default)]
    pub update_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    /// Bytes, as a decimal string. Absent for Workspace-native files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<Owner>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    #[serde(default)]
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coursework_from_api_json() {
        let work: CourseWork = serde_json::from_value(serde_json::json!({
            "courseId": "c1",
            "id": "w1",
            "title": "Problem Set 3",
            "state": "PUBLISHED",
            "dueDate": {"year": 2024, "month": 3, "day": 15},
            "dueTime": {"hours": 23, "minutes": 59},
            "maxPoints": 100,
            "workType": "ASSIGNMENT",
            "materials": [
                {"driveFile": {"driveFile": {"id": "f1", "title": "ps3.pdf"}, "shareMode": "VIEW"}},
                {"link": {"url": "https://example.com"}}
            ]
        }))
        .unwrap();

        assert_eq!(work.due_date.and_then(Date::to_naive), NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(work.due_time, Some(TimeOfDay { hours: 23, minutes: 59 }));
        assert_eq!(work.materials[0].drive_file_id(), Some("f1"));
        assert_eq!(work.materials[1].drive_file_id(), None);
    }

    #[test]
    fn test_partial_date_is_not_a_date() {
        let date = Date { year: 2024, month: 0, day: 0 };
        assert_eq!(date.to_naive(), None);
    }

    #[test]
    fn test_turned_in_timestamp_picks_latest() {
        let submission: StudentSubmission = serde_json::from_value(serde_json::json!({
            "id": "s1",
            "state": "TURNED_IN",
            "submissionHistory": [
                {"stateHistory": {"state": "CREATED", "stateTimestamp": "2024-03-01T10:00:00Z"}},
                {"stateHistory": {"state": "TURNED_IN", "stateTimestamp": "2024-03-02T10:00:00Z"}},
                {"gradeHistory": {"pointsEarned": 5}},
                {"stateHistory": {"state": "TURNED_IN", "stateTimestamp": "2024-03-04T10:00:00Z"}}
            ]
        }))
        .unwrap();
        assert_eq!(submission.turned_in_timestamp(), Some("2024-03-04T10:00:00Z"));
    }

    #[test]
    fn test_skips_absent_fields_when_serializing() {
        let file = DriveFile {
            id: "f".to_string(),
            name: "notes.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json, serde_json::json!({"id": "f", "name": "notes.pdf", "mimeType": "application/pdf"}));
    }
}
