//! Drive file resolution: Workspace export formats and download payloads

use serde::Serialize;

use crate::google::ByteStream;

const WORKSPACE_PREFIX: &str = "application/vnd.google-apps.";

const PDF: &str = "application/pdf";
const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Target format for a Workspace document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    pub mime_type: &'static str,
    pub extension: &'static str,
}

/// How a Drive file is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Bytes as stored.
    Media,
    /// Converted by Drive's export endpoint.
    Export(ExportFormat),
    /// A Workspace type Drive cannot export (folders, forms, ...).
    Unsupported,
}

impl Delivery {
    pub fn for_mime(mime_type: &str) -> Self {
        let kind = match mime_type.strip_prefix(WORKSPACE_PREFIX) {
            Some(kind) => kind,
            None => return Delivery::Media,
        };

        let format = match kind {
            "document" | "presentation" | "drawing" => ExportFormat {
                mime_type: PDF,
                extension: "pdf",
            },
            "spreadsheet" => ExportFormat {
                mime_type: XLSX,
                extension: "xlsx",
            },
            _ => return Delivery::Unsupported,
        };
        Delivery::Export(format)
    }
}

/// Name to offer the browser: exports get the target extension appended
/// unless it is already there.
pub fn download_name(name: &str, delivery: Delivery) -> String {
    match delivery {
        Delivery::Export(format) => {
            let suffix = format!(".{}", format.extension);
            if name.to_lowercase().ends_with(&suffix) {
                name.to_string()
            } else {
                format!("{}{}", name, suffix)
            }
        }
        _ => name.to_string(),
    }
}

/// Result of `generate_download_url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadableFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    /// Format the bytes are converted to, for Workspace documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exported_as: Option<String>,
    /// RFC 3339 expiry of `download_url`.
    pub expires_at: String,
}

/// One slot of a batch: the file, or why it failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchEntry {
    File(DownloadableFile),
    Failed { id: String, error: String },
}

/// Bytes plus the headers the download route needs.
pub struct FileDownload {
    pub filename: String,
    pub mime_type: String,
    pub stream: ByteStream,
}

impl std::fmt::Debug for FileDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDownload")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}
