//! Transcript post-processing: attachments and the thoughts trace
//!
//! Tool results are plain strings. Any message mentioning `downloadUrl` is
//! tried as JSON, either one file object or an array of them; anything that
//! does not parse or does not match is skipped.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::message::{Message, Role};
use super::response::FileAttachment;

const DOWNLOAD_URL_FIELD: &str = "downloadUrl";
const OBSERVATION_LIMIT: usize = 200;

/// Every distinct file surfaced in `transcript`, first occurrence wins.
pub fn extract_attachments(transcript: &[Message]) -> Vec<FileAttachment> {
    let mut files = Vec::new();

    for message in transcript {
        if message.tool_calls.is_some() || !message.content.contains(DOWNLOAD_URL_FIELD) {
            continue;
        }

        let parsed: Value = match serde_json::from_str(&message.content) {
            Ok(v) => v,
            Err(_) => continue,
        };

        match parsed {
            Value::Object(ref obj) => files.extend(attachment(obj)),
            Value::Array(items) => files.extend(
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(attachment),
            ),
            _ => {}
        }
    }

    let mut seen = HashSet::new();
    files.retain(|f: &FileAttachment| seen.insert(f.id.clone()));
    files
}

fn non_empty<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Drive reports sizes as decimal strings; leading digits are taken.
fn size(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let digits: String = s.trim().chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

fn attachment(obj: &Map<String, Value>) -> Option<FileAttachment> {
    let id = non_empty(obj, "id")?;
    let download_url = non_empty(obj, DOWNLOAD_URL_FIELD)?;

    Some(FileAttachment {
        id: id.to_string(),
        name: non_empty(obj, "name").unwrap_or("Unknown").to_string(),
        mime_type: non_empty(obj, "mimeType")
            .unwrap_or("application/octet-stream")
            .to_string(),
        download_url: download_url.to_string(),
        size: size(obj.get("size")),
        course_id: text(obj, "courseId"),
        course_name: text(obj, "courseName"),
        description: text(obj, "description"),
        created_time: text(obj, "createdTime"),
        modified_time: text(obj, "modifiedTime"),
    })
}

/// `Action: <tool> with <args>` for every call and `Observation: <result>`
/// (cut at 200 characters) for every tool result.
pub fn extract_thoughts(transcript: &[Message]) -> Vec<String> {
    let mut thoughts = Vec::new();

    for message in transcript {
        if let Some(ref calls) = message.tool_calls {
            for call in calls {
                if call.arguments.is_null() {
                    thoughts.push(format!("Action: {}", call.name));
                } else {
                    thoughts.push(format!("Action: {} with {}", call.name, call.arguments));
                }
            }
        }

        if message.role == Role::Tool {
            let content = &message.content;
            if content.chars().count() > OBSERVATION_LIMIT {
                let cut: String = content.chars().take(OBSERVATION_LIMIT).collect();
                thoughts.push(format!("Observation: {}...", cut));
            } else {
                thoughts.push(format!("Observation: {}", content));
            }
        }
    }

    thoughts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::ToolCallRequest;
    use serde_json::json;

    fn call(name: &str, args: Value) -> ToolCallRequest {
        ToolCallRequest {
            id: format!("call_{name}"),
            name: name.to_string(),
            arguments: args,
        }
    }

    fn file(id: &str) -> Value {
        json!({
            "id": id,
            "name": format!("{id}.pdf"),
            "mimeType": "application/pdf",
            "downloadUrl": format!("/api/classroom/files/download/{id}?expires=1&sig=x"),
            "size": "2048"
        })
    }

    #[test]
    fn test_single_and_batch_results() {
        let single = call("generate_download_url", json!({"fileId": "a"}));
        let batch = call("batch_generate_download_urls", json!({"fileIds": ["b", "c"]}));
        let transcript = vec![
            Message::user("get my files"),
            Message::assistant_with_tools("", vec![single.clone()]),
            Message::tool_result(&single, file("a").to_string()),
            Message::assistant_with_tools("", vec![batch.clone()]),
            Message::tool_result(
                &batch,
                json!([file("b"), {"id": "c", "error": "Not found: c"}]).to_string(),
            ),
            Message::assistant("Here are a.pdf and b.pdf"),
        ];

        let files = extract_attachments(&transcript);
        let ids: Vec<_> = files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(files[0].size, Some(2048));
        assert_eq!(files[0].mime_type, "application/pdf");
    }

    #[test]
    fn test_duplicates_collapse_to_first() {
        let c = call("generate_download_url", json!({"fileId": "a"}));
        let mut renamed = file("a");
        renamed["name"] = json!("second.pdf");
        let transcript = vec![
            Message::tool_result(&c, file("a").to_string()),
            Message::tool_result(&c, json!([renamed, file("a"), file("b")]).to_string()),
            Message::tool_result(&c, file("a").to_string()),
        ];

        let files = extract_attachments(&transcript);
        assert_eq!(files.len(), 2);
        assert_eq!(files.iter().filter(|f| f.id == "a").count(), 1);
        assert_eq!(files[0].name, "a.pdf");
    }

    #[test]
    fn test_defaults_and_non_json_skipped() {
        let c = call("generate_download_url", json!({}));
        let transcript = vec![
            Message::assistant("The downloadUrl is in the card below."),
            Message::tool_result(&c, "Error: downloadUrl could not be created"),
            Message::tool_result(&c, json!({"id": "x", "downloadUrl": "/api/classroom/files/download/x"}).to_string()),
            Message::tool_result(&c, json!({"id": "", "downloadUrl": "/y"}).to_string()),
        ];

        let files = extract_attachments(&transcript);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "Unknown");
        assert_eq!(files[0].mime_type, "application/octet-stream");
        assert_eq!(files[0].size, None);
    }

    #[test]
    fn test_thoughts() {
        let list = call("list_courses", json!({}));
        let long = "x".repeat(250);
        let transcript = vec![
            Message::system("prompt"),
            Message::user("List my courses"),
            Message::assistant_with_tools("", vec![list.clone(), call("noop", Value::Null)]),
            Message::tool_result(&list, long),
            Message::tool_result(&list, "[]"),
            Message::assistant("You have no courses."),
        ];

        let thoughts = extract_thoughts(&transcript);
        assert_eq!(thoughts[0], "Action: list_courses with {}");
        assert_eq!(thoughts[1], "Action: noop");
        assert_eq!(thoughts[2], format!("Observation: {}...", "x".repeat(200)));
        assert_eq!(thoughts[3], "Observation: []");
        assert_eq!(thoughts.len(), 4);
    }
}
