use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;

use crate::config::{LabelId, LabelTable};
use crate::intake::{intake_router, IntakeService};
use crate::mailer::{ConfirmationMailer, MailError, MailGateway, MxProbe, MxRecord, OutgoingMail};
use crate::storage::{StoreError, SubmissionStore};
use crate::tracker::{TaskDraft, TaskId, TrackerError, TrackerGateway};

pub(super) const FORM: &str = "application/x-www-form-urlencoded";

pub(super) fn labels() -> LabelTable {
    LabelTable {
        interested: LabelId(101),
        from_website: LabelId(102),
        packages: [LabelId(111), LabelId(112), LabelId(113), LabelId(114)],
        package_default: LabelId(110),
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    pub(super) objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub(super) fn with_object(key: &str, bytes: &[u8]) -> Self {
        let store = Self::default();
        store
            .objects
            .lock()
            .expect("lock")
            .insert(key.to_string(), bytes.to_vec());
        store
    }

    pub(super) fn keys(&self) -> Vec<String> {
        self.objects.lock().expect("lock").keys().cloned().collect()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.objects
            .lock()
            .expect("lock")
            .insert(key.to_string(), bytes);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.objects.lock().expect("lock").contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .lock()
            .expect("lock")
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

/// Reports every object as present but fails every transfer.
pub(super) struct BrokenStore;

#[async_trait]
impl SubmissionStore for BrokenStore {
    async fn put(&self, key: &str, _bytes: Vec<u8>) -> Result<(), StoreError> {
        Err(StoreError::Status {
            key: key.to_string(),
            status: 503,
            body: "backend unavailable".to_string(),
        })
    }

    async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        Err(StoreError::Status {
            key: key.to_string(),
            status: 503,
            body: "backend unavailable".to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub(super) struct Attachment {
    pub(super) task: TaskId,
    pub(super) file_name: String,
    pub(super) pdf: Vec<u8>,
}

#[derive(Default)]
pub(super) struct RecordingTracker {
    pub(super) down: bool,
    pub(super) rejects_attachments: bool,
    pub(super) drafts: Mutex<Vec<TaskDraft>>,
    pub(super) attachments: Mutex<Vec<Attachment>>,
}

impl RecordingTracker {
    pub(super) fn down() -> Self {
        Self {
            down: true,
            ..Self::default()
        }
    }

    /// Files tasks but refuses every upload.
    pub(super) fn rejecting_attachments() -> Self {
        Self {
            rejects_attachments: true,
            ..Self::default()
        }
    }
}

fn unavailable() -> TrackerError {
    TrackerError::Status {
        status: 503,
        body: "service unavailable".to_string(),
    }
}

#[async_trait]
impl TrackerGateway for RecordingTracker {
    async fn create_task(&self, draft: &TaskDraft) -> Result<TaskId, TrackerError> {
        if self.down {
            return Err(unavailable());
        }
        let mut drafts = self.drafts.lock().expect("lock");
        drafts.push(draft.clone());
        Ok(TaskId(9000 + drafts.len() as u64))
    }

    async fn attach_document(
        &self,
        task: TaskId,
        file_name: &str,
        pdf: Vec<u8>,
    ) -> Result<(), TrackerError> {
        if self.rejects_attachments {
            return Err(unavailable());
        }
        self.attachments.lock().expect("lock").push(Attachment {
            task,
            file_name: file_name.to_string(),
            pdf,
        });
        Ok(())
    }
}

pub(super) struct AcceptingProbe;

#[async_trait]
impl MxProbe for AcceptingProbe {
    async fn lookup(&self, domain: &str) -> Result<Vec<MxRecord>, MailError> {
        Ok(vec![MxRecord {
            preference: 10,
            exchange: format!("mx.{domain}"),
        }])
    }
}

#[derive(Default)]
pub(super) struct RecordingMail {
    pub(super) sent: Mutex<Vec<OutgoingMail>>,
}

#[async_trait]
impl MailGateway for RecordingMail {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        self.sent.lock().expect("lock").push(mail.clone());
        Ok(())
    }
}

pub(super) fn service(
    store: Arc<dyn SubmissionStore>,
    tracker: Arc<dyn TrackerGateway>,
) -> IntakeService {
    IntakeService::new(store, tracker, labels(), None)
}

pub(super) fn service_with_mail(
    store: Arc<dyn SubmissionStore>,
    tracker: Arc<dyn TrackerGateway>,
    mail: Arc<RecordingMail>,
) -> IntakeService {
    let mailer = ConfirmationMailer::new(
        Arc::new(AcceptingProbe),
        mail,
        "HausWirtschaft <info@hauswirtschaft.at>".to_string(),
    );
    IntakeService::new(store, tracker, labels(), Some(mailer))
}

pub(super) fn router(service: IntakeService) -> Router {
    intake_router(Arc::new(service))
}

fn field_pairs(key: &str, title: &str, value: &str) -> Vec<(String, String)> {
    [
        ("id", key),
        ("type", "text"),
        ("title", title),
        ("value", value),
        ("raw_value", value),
        ("required", "1"),
    ]
    .into_iter()
    .map(|(attribute, text)| (format!("fields[{key}][{attribute}]"), text.to_string()))
    .collect()
}

/// A complete delivery as the form builder posts it.
pub(super) fn application_pairs() -> Vec<(String, String)> {
    let mut pairs = vec![
        ("form[id]".to_string(), "c0ffee1".to_string()),
        ("form[name]".to_string(), "Call Gewerbeflächen".to_string()),
    ];
    pairs.extend(field_pairs("name", "Name", "Erika Muster"));
    pairs.extend(field_pairs("email", "E-Mail", "erika@example.org"));
    pairs.extend(field_pairs("website", "Website", "https://werkstatt.example"));
    pairs.extend(field_pairs("telefon", "Telefon", "+43 660 1234567"));
    pairs.extend(field_pairs("interessentin", "Interessent*in", "Ja"));
    pairs.extend(field_pairs("paket", "Paket", "Paket 2 (Atelier)"));
    pairs.extend(field_pairs(
        "gewerbe_nutzung",
        "Nutzung",
        "Eine offene Nähwerkstatt\nmit Kursen am Abend.",
    ));
    pairs.extend(field_pairs("einbringen", "Einbringen", "Reparaturcafé"));
    pairs.push(("meta[remote_ip]".to_string(), "203.0.113.7".to_string()));
    pairs
}

pub(super) fn encode(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

pub(super) fn application_body() -> String {
    encode(&application_pairs())
}

pub(super) fn post_form(uri: &str, content_type: &str, body: String) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .expect("request")
}

pub(super) fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

pub(super) async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body collects")
        .to_vec()
}

pub(super) async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).expect("utf8 body")
}
