//! Download proxy behind every `downloadUrl` the tools hand out.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::Response,
    Extension,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;

use crate::error::Error;
use crate::server::auth::Caller;
use crate::server::error::ServerError;
use crate::server::state::AppState;

/// Everything outside RFC 5987 `attr-char` is escaped.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

#[derive(Debug, Default, Deserialize)]
pub struct DownloadParams {
    pub expires: Option<String>,
    pub sig: Option<String>,
}

/// GET /api/classroom/files/download/:file_id
///
/// A request carrying `expires`/`sig` must carry both, signed for the caller.
pub async fn download(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(file_id): Path<String>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, ServerError> {
    verify_reference(&state, &caller, &file_id, &params)?;

    let download = state
        .service
        .classroom_for(&caller.0)
        .download_file(&file_id)
        .await?;

    Response::builder()
        .header(CONTENT_TYPE, download.mime_type.as_str())
        .header(CONTENT_DISPOSITION, content_disposition(&download.filename))
        .body(Body::from_stream(download.stream))
        .map_err(|e| ServerError::Internal(format!("Failed to build download response: {}", e)))
}

fn verify_reference(
    state: &AppState,
    caller: &Caller,
    file_id: &str,
    params: &DownloadParams,
) -> Result<(), ServerError> {
    let invalid = || ServerError::Forbidden("Invalid download link".to_string());

    match (&params.expires, &params.sig) {
        (None, None) => Ok(()),
        (Some(expires), Some(sig)) => {
            let expires: i64 = expires.parse().map_err(|_| invalid())?;
            state
                .links
                .verify(&caller.0, file_id, expires, sig)
                .map_err(|e| match e {
                    Error::Auth(message) => ServerError::Forbidden(message),
                    other => other.into(),
                })
        }
        _ => Err(invalid()),
    }
}

/// `attachment` with an ASCII fallback name and the UTF-8 name in
/// `filename*`.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if fallback == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        utf8_percent_encode(filename, ATTR_CHAR)
    )
}
