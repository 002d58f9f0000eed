//! Assignment search filters

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::google::{Course, CourseWork};
use crate::Result;

/// Every field is optional; an absent (or empty) field places no
/// constraint on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Filters with dates parsed, ready to apply.
#[derive(Debug, Clone, Default)]
pub(crate) struct CompiledFilters {
    course_id: Option<String>,
    course_name: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    state: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        Error::Validation(format!("{} must be an ISO date (YYYY-MM-DD), got {:?}", field, value))
    })
}

impl AssignmentFilters {
    pub(crate) fn compile(&self) -> Result<CompiledFilters> {
        let start = present(&self.due_date_start)
            .map(|v| parse_date("dueDateStart", v))
            .transpose()?;
        let end = present(&self.due_date_end)
            .map(|v| parse_date("dueDateEnd", v))
            .transpose()?;

        Ok(CompiledFilters {
            course_id: present(&self.course_id).map(str::to_string),
            course_name: present(&self.course_name).map(str::to_lowercase),
            start,
            end,
            state: present(&self.state).map(str::to_string),
        })
    }
}

impl CompiledFilters {
    /// Course-level constraints, checked before any coursework is fetched.
    pub(crate) fn matches_course(&self, course: &Course) -> bool {
        if let Some(ref id) = self.course_id {
            if &course.id != id {
                return false;
            }
        }
        if let Some(ref needle) = self.course_name {
            if !course.name.to_lowercase().contains(needle.as_str()) {
                return false;
            }
        }
        true
    }

    /// Coursework-level constraints. With any date bound set, work without a
    /// (complete) due date never matches.
    pub(crate) fn matches_work(&self, work: &CourseWork) -> bool {
        if self.start.is_some() || self.end.is_some() {
            let due = match work.due_date.and_then(|d| d.to_naive()) {
                Some(due) => due,
                None => return false,
            };
            if self.start.is_some_and(|start| due < start) {
                return false;
            }
            if self.end.is_some_and(|end| due > end) {
                return false;
            }
        }
        if let Some(ref state) = self.state {
            if &work.state != state {
                return false;
            }
        }
        true
    }
}
