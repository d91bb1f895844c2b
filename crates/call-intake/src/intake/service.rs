use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::config::LabelTable;
use crate::document;
use crate::mailer::{ConfirmationMailer, MailOutcome};
use crate::storage::{self, StoreError, SubmissionStore};
use crate::submission::{self, FieldKey, FormDecodeError, RequestId, Submission, ValidationError};
use crate::tracker::{TaskDraft, TaskId, TrackerGateway};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("unsupported content type {0:?}")]
    UnsupportedContentType(Option<String>),
    #[error(transparent)]
    Decode(#[from] FormDecodeError),
    #[error("failed to serialize submission {request_id}: {source}")]
    Serialize {
        request_id: RequestId,
        #[source]
        source: StoreError,
    },
    #[error("submission {request_id} rejected: {source}")]
    Invalid {
        request_id: RequestId,
        #[source]
        source: ValidationError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("request id {0:?} is malformed")]
    InvalidRequestId(Option<String>),
    #[error("no archived submission for {0}")]
    NotFound(RequestId),
    #[error("failed to load submission {request_id}: {source}")]
    Store {
        request_id: RequestId,
        #[source]
        source: StoreError,
    },
}

/// Outcome of the detached task flow for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub request_id: RequestId,
    pub task_id: Option<TaskId>,
    pub attached: bool,
}

/// What the submit path started; the handles let callers await the
/// detached flows, the HTTP handler drops them.
#[derive(Debug)]
pub struct SubmitReceipt {
    pub request_id: RequestId,
    pub task: JoinHandle<TaskReport>,
    pub confirmation: Option<JoinHandle<MailOutcome>>,
}

/// Orchestrates archive, validation and the background task and mail flows.
#[derive(Clone)]
pub struct IntakeService {
    store: Arc<dyn SubmissionStore>,
    tracker: Arc<dyn TrackerGateway>,
    labels: LabelTable,
    mailer: Option<ConfirmationMailer>,
}

impl IntakeService {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        tracker: Arc<dyn TrackerGateway>,
        labels: LabelTable,
        mailer: Option<ConfirmationMailer>,
    ) -> Self {
        Self {
            store,
            tracker,
            labels,
            mailer,
        }
    }

    /// Accepts one webhook delivery.
    ///
    /// The raw body is archived before validation so that rejected
    /// submissions are kept as well. Archive failures are logged only.
    pub async fn submit(
        &self,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<SubmitReceipt, SubmitError> {
        if !is_form_encoded(content_type) {
            return Err(SubmitError::UnsupportedContentType(
                content_type.map(str::to_string),
            ));
        }
        let raw = submission::decode(body)?;
        let request_id = RequestId::generate();

        let bytes = storage::archive_bytes(&Value::Object(raw.clone())).map_err(|source| {
            SubmitError::Serialize {
                request_id: request_id.clone(),
                source,
            }
        })?;
        match storage::archive(self.store.as_ref(), &request_id, bytes).await {
            Ok(()) => tracing::debug!(request_id = %request_id, "submission archived"),
            Err(err) => {
                tracing::error!(
                    request_id = %request_id,
                    error = %err,
                    "failed to archive submission"
                )
            }
        }

        let submission = submission::validate(&raw).map_err(|source| SubmitError::Invalid {
            request_id: request_id.clone(),
            source,
        })?;

        let rendered_at = Utc::now();
        let task = tokio::spawn(file_task(
            Arc::clone(&self.tracker),
            self.labels.clone(),
            request_id.clone(),
            submission.clone(),
            rendered_at,
        ));

        let confirmation = self.mailer.clone().map(|mailer| {
            let request_id = request_id.clone();
            let address = submission.value(FieldKey::Email).to_string();
            tokio::spawn(async move {
                let outcome = mailer.confirm(&address).await;
                log_confirmation(&request_id, &outcome);
                outcome
            })
        });

        Ok(SubmitReceipt {
            request_id,
            task,
            confirmation,
        })
    }

    /// Loads an archived submission for re-rendering.
    pub async fn archived(
        &self,
        raw_id: Option<&str>,
    ) -> Result<(RequestId, Submission), ExportError> {
        let request_id = raw_id
            .and_then(RequestId::parse)
            .ok_or_else(|| ExportError::InvalidRequestId(raw_id.map(str::to_string)))?;

        match storage::load(self.store.as_ref(), &request_id).await {
            Ok(Some(raw)) => Ok((request_id, Submission::from_archive(&raw))),
            Ok(None) | Err(StoreError::NotFound(_)) => Err(ExportError::NotFound(request_id)),
            Err(source) => Err(ExportError::Store { request_id, source }),
        }
    }
}

impl std::fmt::Debug for IntakeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntakeService")
            .field("labels", &self.labels)
            .field("mailer", &self.mailer)
            .finish_non_exhaustive()
    }
}

fn is_form_encoded(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .map(|mime| mime.essence_str() == FORM_CONTENT_TYPE)
        .unwrap_or(false)
}

/// Render, create, attach. Task-creation failure ends the flow without an
/// attachment attempt.
async fn file_task(
    tracker: Arc<dyn TrackerGateway>,
    labels: LabelTable,
    request_id: RequestId,
    submission: Submission,
    rendered_at: DateTime<Utc>,
) -> TaskReport {
    let draft = TaskDraft::from_submission(&submission, &labels);
    let document =
        tokio::task::spawn_blocking(move || document::render_to_vec(&submission, rendered_at))
            .await;
    let document = match document {
        Ok(Ok(pdf)) => Some(pdf),
        Ok(Err(err)) => {
            tracing::error!(request_id = %request_id, error = %err, "failed to render summary");
            None
        }
        Err(err) => {
            tracing::error!(request_id = %request_id, error = %err, "summary renderer panicked");
            None
        }
    };

    let task_id = match tracker.create_task(&draft).await {
        Ok(task_id) => task_id,
        Err(err) => {
            tracing::error!(
                request_id = %request_id,
                error = %err,
                "could not create tracker task"
            );
            return TaskReport {
                request_id,
                task_id: None,
                attached: false,
            };
        }
    };
    tracing::info!(request_id = %request_id, task_id = %task_id, "tracker task created");

    let attached = match document {
        Some(pdf) => match tracker
            .attach_document(task_id, &request_id.document_name(), pdf)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(
                    request_id = %request_id,
                    task_id = %task_id,
                    error = %err,
                    "could not upload summary"
                );
                false
            }
        },
        None => false,
    };

    TaskReport {
        request_id,
        task_id: Some(task_id),
        attached,
    }
}

fn log_confirmation(request_id: &RequestId, outcome: &MailOutcome) {
    match outcome {
        MailOutcome::Sent => tracing::info!(request_id = %request_id, "confirmation sent"),
        MailOutcome::InvalidAddress => {
            tracing::info!(request_id = %request_id, "confirmation skipped, invalid address")
        }
        MailOutcome::NoMailExchange => {
            tracing::info!(request_id = %request_id, "confirmation skipped, domain has no mx")
        }
        MailOutcome::Failed(err) => {
            tracing::warn!(request_id = %request_id, error = %err, "confirmation failed")
        }
    }
}
