//! Classroom tools - courses, coursework, materials and announcements

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{to_output, Tool};
use crate::classroom::{AssignmentFilters, Classroom};
use crate::Result;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseArgs {
    course_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignmentArgs {
    course_id: String,
    coursework_id: String,
}

fn no_params() -> Value {
    json!({"type": "object", "properties": {}})
}

fn course_id_params(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "courseId": {
                "type": "string",
                "description": description
            }
        },
        "required": ["courseId"]
    })
}

/// List active courses
pub struct ListCoursesTool {
    classroom: Classroom,
}

impl ListCoursesTool {
    pub fn new(classroom: Classroom) -> Self {
        Self { classroom }
    }
}

#[async_trait]
impl Tool for ListCoursesTool {
    fn name(&self) -> &str { "list_courses" }

    fn description(&self) -> &str {
        "Lists all active Google Classroom courses the student is enrolled in. \
         Use it for an overview of courses, to find course IDs for other tools, \
         and for questions like \"What classes do I have?\". \
         Returns course objects with id, name, section, description and other metadata."
    }

    fn parameters(&self) -> Value { no_params() }

    async fn execute(&self, _params: Value) -> Result<String> {
        to_output(&self.classroom.list_courses().await?)
    }
}

/// Full metadata for one course
pub struct GetCourseInfoTool {
    classroom: Classroom,
}

impl GetCourseInfoTool {
    pub fn new(classroom: Classroom) -> Self {
        Self { classroom }
    }
}

#[async_trait]
impl Tool for GetCourseInfoTool {
    fn name(&self) -> &str { "get_course_info" }

    fn description(&self) -> &str {
        "Gets detailed information about one Google Classroom course: description, \
         room, section, owner and other settings. \
         Input: courseId (from list_courses)."
    }

    fn parameters(&self) -> Value {
        course_id_params("The ID of the course to get information about")
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let args: CourseArgs = serde_json::from_value(params)?;
        to_output(&self.classroom.get_course_info(&args.course_id).await?)
    }
}

/// Filtered coursework search across courses
pub struct SearchAssignmentsTool {
    classroom: Classroom,
}

impl SearchAssignmentsTool {
    pub fn new(classroom: Classroom) -> Self {
        Self { classroom }
    }
}

#[async_trait]
impl Tool for SearchAssignmentsTool {
    fn name(&self) -> &str { "search_assignments" }

    fn description(&self) -> &str {
        "Searches assignments (coursework) across all courses or specific ones. \
         Use it for deadlines (\"due tomorrow\", \"homework this week\"), for \
         assignments of one class (\"assignments in Math\") and for pending work.\n\
         Filters, all optional:\n\
         - courseName: partial course name, case-insensitive\n\
         - courseId: exact course ID\n\
         - dueDateStart / dueDateEnd: inclusive ISO dates (YYYY-MM-DD)\n\
         - state: PUBLISHED, DRAFT or DELETED\n\
         Tips: for \"due tomorrow\" compute tomorrow's date and pass it as both \
         dueDateStart and dueDateEnd; for \"this week\" use the week's first and \
         last day; leave filters out to get everything. Assignments without a due \
         date are left out whenever a date bound is given.\n\
         Returns assignment objects with courseId, courseName, title, description, \
         dueDate, state and more."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "courseName": {
                    "type": "string",
                    "description": "Partial course name to filter by (e.g. \"Math\")"
                },
                "courseId": {
                    "type": "string",
                    "description": "Specific course ID to filter by"
                },
                "dueDateStart": {
                    "type": "string",
                    "description": "ISO date (YYYY-MM-DD) for the earliest due date"
                },
                "dueDateEnd": {
                    "type": "string",
                    "description": "ISO date (YYYY-MM-DD) for the latest due date"
                },
                "state": {
                    "type": "string",
                    "enum": ["PUBLISHED", "DRAFT", "DELETED"],
                    "description": "Assignment state filter"
                }
            }
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let filters: AssignmentFilters = serde_json::from_value(params)?;
        to_output(&self.classroom.search_assignments(&filters).await?)
    }
}

/// One assignment joined with the student's submission
pub struct GetAssignmentDetailsTool {
    classroom: Classroom,
}

impl GetAssignmentDetailsTool {
    pub fn new(classroom: Classroom) -> Self {
        Self { classroom }
    }
}

#[async_trait]
impl Tool for GetAssignmentDetailsTool {
    fn name(&self) -> &str { "get_assignment_details" }

    fn description(&self) -> &str {
        "Gets everything about one assignment: full description, attached materials \
         and files, due date, points and the student's own submission status and grade. \
         Use it for questions like \"What do I need to do for this assignment?\". \
         Input: courseId and courseworkId (from search_assignments)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "courseId": {
                    "type": "string",
                    "description": "The ID of the course"
                },
                "courseworkId": {
                    "type": "string",
                    "description": "The ID of the coursework/assignment"
                }
            },
            "required": ["courseId", "courseworkId"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let args: AssignmentArgs = serde_json::from_value(params)?;
        let details = self
            .classroom
            .get_assignment_details(&args.course_id, &args.coursework_id)
            .await?;
        to_output(&details)
    }
}

/// Non-assignment course resources
pub struct ListCourseMaterialsTool {
    classroom: Classroom,
}

impl ListCourseMaterialsTool {
    pub fn new(classroom: Classroom) -> Self {
        Self { classroom }
    }
}

#[async_trait]
impl Tool for ListCourseMaterialsTool {
    fn name(&self) -> &str { "list_course_materials" }

    fn description(&self) -> &str {
        "Lists the course materials (lecture slides, readings and other resources \
         shared by the teacher, not assignments) of one course. \
         Use it for requests like \"Show me the slides for Lecture 5\". \
         Input: courseId. Returns materials with titles, descriptions and attached files or links."
    }

    fn parameters(&self) -> Value {
        course_id_params("The ID of the course to get materials from")
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let args: CourseArgs = serde_json::from_value(params)?;
        to_output(&self.classroom.list_course_materials(&args.course_id).await?)
    }
}

pub struct GetAnnouncementsTool {
    classroom: Classroom,
}

impl GetAnnouncementsTool {
    pub fn new(classroom: Classroom) -> Self {
        Self { classroom }
    }
}

#[async_trait]
impl Tool for GetAnnouncementsTool {
    fn name(&self) -> &str { "get_announcements" }

    fn description(&self) -> &str {
        "Gets the announcements posted in one course. Use it for \"What's going on \
         in my Math class?\" or \"Any updates?\". Input: courseId. \
         Returns announcements with text, creation time and attached materials."
    }

    fn parameters(&self) -> Value {
        course_id_params("The ID of the course to get announcements from")
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let args: CourseArgs = serde_json::from_value(params)?;
        to_output(&self.classroom.get_announcements(&args.course_id).await?)
    }
}

pub struct GetAllCourseworkTool {
    classroom: Classroom,
}

impl GetAllCourseworkTool {
    pub fn new(classroom: Classroom) -> Self {
        Self { classroom }
    }
}

#[async_trait]
impl Tool for GetAllCourseworkTool {
    fn name(&self) -> &str { "get_all_coursework" }

    fn description(&self) -> &str {
        "Gets all coursework across ALL enrolled courses, for a complete overview \
         (\"What assignments do I have?\"). This returns a lot of data; prefer \
         search_assignments for queries filtered by course or date. \
         Returns one entry per course with courseId, courseName and its coursework."
    }

    fn parameters(&self) -> Value { no_params() }

    async fn execute(&self, _params: Value) -> Result<String> {
        to_output(&self.classroom.get_all_coursework().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classroom::DownloadLinks;
    use crate::google::fake::FakeGoogle;
    use crate::tools::ToolRunner;
    use std::sync::Arc;

    fn runner() -> ToolRunner {
        let fake = Arc::new(
            FakeGoogle::new()
                .course("c1", "Applied Mathematics")
                .course("c2", "Biology")
                .work("c1", "w1", "Limits", Some("2024-03-15"))
                .work("c2", "w2", "Cells", Some("2024-03-15")),
        );
        ToolRunner::for_user(Classroom::new(
            fake.clone(),
            fake,
            Arc::new(DownloadLinks::new("k", 60)),
            "alice",
        ))
    }

    #[tokio::test]
    async fn test_search_assignments_output() {
        let out = runner()
            .invoke(
                "search_assignments",
                json!({"courseName": "Math", "dueDateStart": "2024-03-15", "dueDateEnd": "2024-03-15"}),
            )
            .await;
        let parsed: Value = serde_json::from_str(&out).unwrap();
        let items = parsed.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "Limits");
        assert_eq!(items[0]["courseName"], "Applied Mathematics");
    }

    #[tokio::test]
    async fn test_search_rejects_unknown_state() {
        let out = runner()
            .invoke("search_assignments", json!({"state": "GRADED"}))
            .await;
        assert!(out.starts_with("Error: Invalid arguments"), "{out}");
    }

    #[tokio::test]
    async fn test_bad_date_is_error_string() {
        let out = runner()
            .invoke("search_assignments", json!({"dueDateStart": "next friday"}))
            .await;
        assert!(out.starts_with("Error: Invalid arguments: dueDateStart"), "{out}");
    }

    #[tokio::test]
    async fn test_missing_course_id_rejected() {
        let out = runner().invoke("get_course_info", json!({})).await;
        assert!(out.starts_with("Error: "));
        assert!(out.contains("courseId"));
    }

    #[tokio::test]
    async fn test_course_not_found() {
        let out = runner().invoke("get_course_info", json!({"courseId": "nope"})).await;
        assert_eq!(out, "Error: Not found: Course nope not found");
    }

    #[tokio::test]
    async fn test_all_coursework_shape() {
        let out = runner().invoke("get_all_coursework", json!({})).await;
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[1]["courseId"], "c2");
        assert_eq!(parsed[1]["coursework"][0]["title"], "Cells");
    }
}
