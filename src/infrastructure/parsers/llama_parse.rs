use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

use super::{source_for, MIME_PDF};
use crate::domain::{ports::DocumentParser, Credential, Document, DomainError};
use crate::infrastructure::config::ParserConfig;

/// Client for a LlamaParse-compatible document parsing service.
///
/// A file is uploaded as a parsing job, the job is polled until it settles,
/// and the result is fetched in the configured result type (`text` or
/// `markdown`). Polling has no deadline of its own; callers bound it.
pub struct LlamaParseParser {
    http: reqwest::Client,
    credential: Credential,
    base_url: String,
    result_type: String,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum JobStatus {
    Pending,
    Success,
    Failed(String),
}

impl JobStatus {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "SUCCESS" => Self::Success,
            "PENDING" => Self::Pending,
            other => Self::Failed(other.to_string()),
        }
    }
}

impl LlamaParseParser {
    pub fn new(credential: Credential, config: &ParserConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            credential,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            result_type: config.result_type.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    async fn upload(&self, path: &Path, bytes: Vec<u8>) -> Result<String, DomainError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(MIME_PDF)
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let job: JobResponse = self
            .http
            .post(format!("{}/api/parsing/upload", self.base_url))
            .bearer_auth(self.credential.expose())
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DomainError::external(format!("parse upload failed: {e}")))?
            .json()
            .await
            .map_err(|e| DomainError::external(format!("invalid upload response: {e}")))?;

        Ok(job.id)
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus, DomainError> {
        let job: JobResponse = self
            .http
            .get(format!("{}/api/parsing/job/{job_id}", self.base_url))
            .bearer_auth(self.credential.expose())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DomainError::external(format!("parse status failed: {e}")))?
            .json()
            .await
            .map_err(|e| DomainError::external(format!("invalid status response: {e}")))?;

        Ok(JobStatus::parse(job.status.as_deref().unwrap_or("PENDING")))
    }

    async fn result(&self, job_id: &str) -> Result<String, DomainError> {
        let body: serde_json::Value = self
            .http
            .get(format!(
                "{}/api/parsing/job/{job_id}/result/{}",
                self.base_url, self.result_type
            ))
            .bearer_auth(self.credential.expose())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DomainError::external(format!("parse result failed: {e}")))?
            .json()
            .await
            .map_err(|e| DomainError::external(format!("invalid result response: {e}")))?;

        body.get(&self.result_type)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                DomainError::external(format!("result has no '{}' field", self.result_type))
            })
    }
}

#[async_trait]
impl DocumentParser for LlamaParseParser {
    #[instrument(skip(self, bytes), fields(path = %path.display(), size = bytes.len()))]
    async fn parse(&self, path: &Path, bytes: Vec<u8>) -> Result<Vec<Document>, DomainError> {
        let job_id = self.upload(path, bytes).await?;
        tracing::debug!(job_id = %job_id, "parse job started");

        loop {
            match self.status(&job_id).await? {
                JobStatus::Success => break,
                JobStatus::Pending => tokio::time::sleep(self.poll_interval).await,
                JobStatus::Failed(status) => {
                    return Err(DomainError::ingestion(format!(
                        "parse job {job_id} for {} ended with status {status}",
                        path.display()
                    )))
                }
            }
        }

        let text = self.result(&job_id).await?;
        tracing::debug!(job_id = %job_id, chars = text.len(), "parse job finished");
        Ok(vec![Document::new(text, source_for(path))])
    }

    fn name(&self) -> &'static str {
        "llama_parse"
    }
}
