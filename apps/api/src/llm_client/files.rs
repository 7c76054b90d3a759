//! Gemini Files API: upload a document once, reference it by URI in
//! `generateContent`, delete it afterwards.

use std::path::Path;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, info};

use crate::llm_client::{api_error_message, LlmClient, LlmError, API_VERSION};

const MAX_STATE_POLLS: u32 = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    StateUnspecified,
    Processing,
    Active,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Resource name, e.g. `files/abc123`.
    pub name: String,
    pub mime_type: String,
    pub uri: String,
    #[serde(default)]
    pub state: FileState,
}

#[derive(Debug, Deserialize)]
struct UploadFileResponse {
    file: UploadedFile,
}

impl LlmClient {
    fn file_url(&self, name: &str) -> String {
        format!("{}/{API_VERSION}/{name}", self.base_url)
    }

    /// Uploads a PDF with a single multipart/related request.
    pub async fn upload_file(&self, path: &Path) -> Result<UploadedFile, LlmError> {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        let data = tokio::fs::read(path).await?;

        let boundary = format!("cvjson-{}", uuid::Uuid::new_v4().simple());
        let metadata = serde_json::json!({ "file": { "displayName": display_name } });
        let body = multipart_related(&boundary, &metadata, "application/pdf", &data);

        let response = self
            .client
            .post(format!("{}/upload/{API_VERSION}/files", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "multipart")
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(body),
            });
        }

        let uploaded: UploadFileResponse = response.json().await?;
        info!(
            "Uploaded {} as {} ({} bytes)",
            display_name,
            uploaded.file.name,
            data.len()
        );
        Ok(uploaded.file)
    }

    pub async fn get_file(&self, name: &str) -> Result<UploadedFile, LlmError> {
        let response = self
            .client
            .get(self.file_url(name))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(body),
            });
        }

        Ok(response.json().await?)
    }

    /// Polls while the file is still `PROCESSING`. Any other non-failed state
    /// is treated as usable.
    pub async fn wait_until_active(&self, mut file: UploadedFile) -> Result<UploadedFile, LlmError> {
        for _ in 0..MAX_STATE_POLLS {
            match file.state {
                FileState::Processing => {
                    debug!("{} still processing", file.name);
                    tokio::time::sleep(self.poll_interval).await;
                    file = self.get_file(&file.name).await?;
                }
                FileState::Failed => break,
                _ => return Ok(file),
            }
        }

        Err(LlmError::FileProcessing {
            state: format!("{:?}", file.state),
            name: file.name,
        })
    }

    pub async fn delete_file(&self, name: &str) -> Result<(), LlmError> {
        let response = self
            .client
            .delete(self.file_url(name))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(body),
            });
        }
        Ok(())
    }
}

fn multipart_related(
    boundary: &str,
    metadata: &serde_json::Value,
    mime_type: &str,
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 512);

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}
