//! Axum route handlers for the Extraction API.

use std::path::Path;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::config::parse_bool;
use crate::errors::AppError;
use crate::state::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Default, Deserialize)]
pub struct ExtractQuery {
    pub pretty: Option<String>,
}

impl ExtractQuery {
    /// Accepts the same spellings as boolean config values (`1`, `yes`, `on`, ...).
    fn pretty(&self) -> Result<bool, AppError> {
        match self.pretty.as_deref() {
            None => Ok(false),
            Some(raw) => parse_bool(raw)
                .map_err(|_| AppError::Validation(format!("invalid value for 'pretty': {raw}"))),
        }
    }
}

struct Upload {
    file_name: String,
    data: Bytes,
}

/// POST /api/v1/resumes/extract
///
/// Accepts a multipart upload (field `file`) of a PDF, DOC or DOCX résumé and
/// returns the extracted JSON with remapped field names. Returns `null` when
/// the model output could not be parsed.
pub async fn handle_extract(
    State(state): State<AppState>,
    Query(query): Query<ExtractQuery>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let pretty = query.pretty()?;
    let upload = read_upload(&mut multipart).await?;

    let request_id = Uuid::new_v4();
    info!(
        "[{request_id}] Received {} ({} bytes)",
        upload.file_name,
        upload.data.len()
    );

    let workdir = tempfile::tempdir().map_err(|e| AppError::Internal(e.into()))?;
    let path = workdir.path().join(&upload.file_name);
    tokio::fs::write(&path, &upload.data)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let outcome = state.extractor.extract(&path).await?;
    info!("[{request_id}] Extraction finished for {}", upload.file_name);

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "application/json")],
        outcome.render(pretty),
    )
        .into_response())
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .and_then(safe_file_name)
            .ok_or_else(|| AppError::Validation("uploaded file has no file name".to_string()))?;
        let data = field.bytes().await.map_err(multipart_error)?;
        if data.is_empty() {
            return Err(AppError::Validation(format!("{file_name} is empty")));
        }

        return Ok(Upload { file_name, data });
    }

    Err(AppError::Validation(format!(
        "multipart field '{FILE_FIELD}' is required"
    )))
}

/// Drops any directory components a client put in the file name.
fn safe_file_name(raw: &str) -> Option<String> {
    let name = Path::new(raw.trim()).file_name()?.to_str()?;
    (!name.is_empty()).then(|| name.to_string())
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(e.body_text())
    }
}
