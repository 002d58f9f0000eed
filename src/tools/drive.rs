//! Drive tools - file metadata and download references

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{to_output, Tool};
use crate::classroom::Classroom;
use crate::Result;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileArgs {
    file_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchArgs {
    file_ids: Vec<String>,
}

fn file_id_params(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "fileId": {
                "type": "string",
                "description": description
            }
        },
        "required": ["fileId"]
    })
}

/// Drive metadata only, no URL
pub struct GetFileInfoTool {
    classroom: Classroom,
}

impl GetFileInfoTool {
    pub fn new(classroom: Classroom) -> Self {
        Self { classroom }
    }
}

#[async_trait]
impl Tool for GetFileInfoTool {
    fn name(&self) -> &str { "get_file_info" }

    fn description(&self) -> &str {
        "Gets metadata about a Google Drive file: name, type, size, owners, \
         creation and modification dates. Use it to check that a file exists \
         and what it is before generating a download URL. \
         Input: fileId (from assignment materials, course materials or announcements)."
    }

    fn parameters(&self) -> Value {
        file_id_params("The Google Drive file ID")
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let args: FileArgs = serde_json::from_value(params)?;
        to_output(&self.classroom.get_file_info(&args.file_id).await?)
    }
}

pub struct GenerateDownloadUrlTool {
    classroom: Classroom,
}

impl GenerateDownloadUrlTool {
    pub fn new(classroom: Classroom) -> Self {
        Self { classroom }
    }
}

#[async_trait]
impl Tool for GenerateDownloadUrlTool {
    fn name(&self) -> &str { "generate_download_url" }

    fn description(&self) -> &str {
        "Generates a temporary download URL for a Google Drive file. Use it when \
         the user wants to download, fetch or open a file such as lecture slides \
         or documents.\n\
         The URL expires after a while. Google Docs, Slides and Drawings are \
         exported to PDF and Sheets to Excel automatically.\n\
         Input: fileId (from assignment or course materials). \
         Returns the file's downloadUrl, name, mimeType, size and other metadata; \
         mention the file in your answer so the user can download it."
    }

    fn parameters(&self) -> Value {
        file_id_params("The Google Drive file ID to generate a download URL for")
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let args: FileArgs = serde_json::from_value(params)?;
        to_output(&self.classroom.generate_download_url(&args.file_id).await?)
    }
}

pub struct BatchGenerateDownloadUrlsTool {
    classroom: Classroom,
}

impl BatchGenerateDownloadUrlsTool {
    pub fn new(classroom: Classroom) -> Self {
        Self { classroom }
    }
}

#[async_trait]
impl Tool for BatchGenerateDownloadUrlsTool {
    fn name(&self) -> &str { "batch_generate_download_urls" }

    fn description(&self) -> &str {
        "Generates temporary download URLs for several Google Drive files at once, \
         e.g. all attachments of an assignment or material, or when the user asks \
         for \"all files\". Prefer it over repeated generate_download_url calls.\n\
         Input: array of fileIds. Returns one entry per id in the same order: the \
         file with its downloadUrl, or {id, error} when that file failed."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "fileIds": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Google Drive file IDs to generate download URLs for"
                }
            },
            "required": ["fileIds"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let args: BatchArgs = serde_json::from_value(params)?;
        to_output(&self.classroom.batch_generate_download_urls(&args.file_ids).await)
    }
}
