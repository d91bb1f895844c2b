use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use super::mapping::TaskDraft;
use crate::config::{LabelId, TrackerConfig};
use crate::document::PDF_CONTENT_TYPE;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Identifier of a task created in the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("tracker request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("tracker responded with status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Outbound calls against the project-management service.
#[async_trait]
pub trait TrackerGateway: Send + Sync {
    async fn create_task(&self, draft: &TaskDraft) -> Result<TaskId, TrackerError>;

    async fn attach_document(
        &self,
        task: TaskId,
        file_name: &str,
        pdf: Vec<u8>,
    ) -> Result<(), TrackerError>;
}

/// MeisterTask REST client creating tasks in one fixed section.
#[derive(Clone)]
pub struct MeisterTaskClient {
    api_base: String,
    token: String,
    section_id: u64,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct CreateTaskRequest<'a> {
    section_id: u64,
    name: &'a str,
    notes: &'a str,
    label_ids: &'a [LabelId],
}

#[derive(Deserialize)]
struct CreatedTask {
    id: u64,
}

impl MeisterTaskClient {
    pub fn new(config: &TrackerConfig) -> Result<Self, TrackerError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            section_id: config.section_id,
            client,
        })
    }

    fn tasks_url(&self) -> String {
        format!("{}/sections/{}/tasks", self.api_base, self.section_id)
    }

    fn attachments_url(&self, task: TaskId) -> String {
        format!("{}/tasks/{}/attachments", self.api_base, task)
    }
}

impl std::fmt::Debug for MeisterTaskClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeisterTaskClient")
            .field("api_base", &self.api_base)
            .field("section_id", &self.section_id)
            .finish_non_exhaustive()
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, TrackerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TrackerError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl TrackerGateway for MeisterTaskClient {
    async fn create_task(&self, draft: &TaskDraft) -> Result<TaskId, TrackerError> {
        let request = CreateTaskRequest {
            section_id: self.section_id,
            name: &draft.name,
            notes: &draft.notes,
            label_ids: &draft.labels,
        };

        let response = self
            .client
            .post(self.tasks_url())
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;
        let created: CreatedTask = ensure_success(response).await?.json().await?;
        Ok(TaskId(created.id))
    }

    async fn attach_document(
        &self,
        task: TaskId,
        file_name: &str,
        pdf: Vec<u8>,
    ) -> Result<(), TrackerError> {
        let part = Part::bytes(pdf)
            .file_name(file_name.to_string())
            .mime_str(PDF_CONTENT_TYPE)?;
        let form = Form::new()
            .text("name", file_name.to_string())
            .part("local", part);

        let response = self
            .client
            .post(self.attachments_url(task))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
