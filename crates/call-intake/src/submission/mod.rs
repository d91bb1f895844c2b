//! The call application as posted by the website form.
//!
//! The wire body is form-urlencoded with bracketed keys; [`form::decode`]
//! turns it into a nested JSON object, which is what gets archived.
//! [`schema::validate`] checks that object strictly and yields a
//! [`Submission`], while [`Submission::from_archive`] reads archived objects
//! leniently because older submissions predate some fields.

pub mod form;
mod request_id;
pub mod sanitize;
pub mod schema;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use form::{decode, FormDecodeError};
pub use request_id::RequestId;
pub use sanitize::{escape_markup, escape_value};
pub use schema::{validate, ValidationError, ValidationIssue};

/// Maximum length of short field values, in characters.
pub const SHORT_FIELD_MAX_CHARS: usize = 100;

/// The fixed set of fields the form can post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    Name,
    Email,
    Website,
    Phone,
    AlreadyInterested,
    Package,
    CommercialUse,
    CommunityThoughts,
    Contribution,
    Other,
}

impl FieldKey {
    pub const ALL: [FieldKey; 10] = [
        FieldKey::Name,
        FieldKey::Email,
        FieldKey::Website,
        FieldKey::Phone,
        FieldKey::AlreadyInterested,
        FieldKey::Package,
        FieldKey::CommercialUse,
        FieldKey::CommunityThoughts,
        FieldKey::Contribution,
        FieldKey::Other,
    ];

    /// Key used by the form under `fields[...]`.
    pub fn wire_name(self) -> &'static str {
        match self {
            FieldKey::Name => "name",
            FieldKey::Email => "email",
            FieldKey::Website => "website",
            FieldKey::Phone => "telefon",
            FieldKey::AlreadyInterested => "interessentin",
            FieldKey::Package => "paket",
            FieldKey::CommercialUse => "gewerbe_nutzung",
            FieldKey::CommunityThoughts => "gedanken_community",
            FieldKey::Contribution => "einbringen",
            FieldKey::Other => "sonstiges",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.wire_name() == name)
    }

    /// Short fields are single-line inputs capped at [`SHORT_FIELD_MAX_CHARS`].
    pub fn is_short(self) -> bool {
        !matches!(
            self,
            FieldKey::CommercialUse
                | FieldKey::CommunityThoughts
                | FieldKey::Contribution
                | FieldKey::Other
        )
    }
}

/// One field as posted by the form builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub value: String,
    pub raw_value: String,
    pub required: String,
}

impl FieldRecord {
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Some(Self {
            id: text("id"),
            kind: text("type"),
            title: text("title"),
            value: text("value"),
            raw_value: text("raw_value"),
            required: text("required"),
        })
    }
}

/// Identity of the form that produced the submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInfo {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// A submission with every present field parsed into a [`FieldRecord`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submission {
    pub form: FormInfo,
    fields: BTreeMap<FieldKey, FieldRecord>,
    pub meta: Map<String, Value>,
}

impl Submission {
    pub fn new(form: FormInfo, meta: Map<String, Value>) -> Self {
        Self {
            form,
            fields: BTreeMap::new(),
            meta,
        }
    }

    pub fn with_field(mut self, key: FieldKey, record: FieldRecord) -> Self {
        self.fields.insert(key, record);
        self
    }

    pub fn insert_field(&mut self, key: FieldKey, record: FieldRecord) {
        self.fields.insert(key, record);
    }

    pub fn field(&self, key: FieldKey) -> Option<&FieldRecord> {
        self.fields.get(&key)
    }

    /// Display value of a field, empty when the field was not posted.
    pub fn value(&self, key: FieldKey) -> &str {
        self.field(key)
            .map(|record| record.value.as_str())
            .unwrap_or_default()
    }

    /// Reads an archived raw body without enforcing the schema.
    ///
    /// Unknown keys are ignored, non-object field entries are skipped and
    /// non-string attributes read as empty.
    pub fn from_archive(raw: &Value) -> Self {
        let form_object = raw.get("form").and_then(Value::as_object);
        let form_text = |key: &str| {
            form_object
                .and_then(|form| form.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let form = FormInfo {
            id: form_text("id"),
            name: form_text("name"),
        };

        let meta = raw
            .get("meta")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let mut submission = Submission::new(form, meta);
        if let Some(fields) = raw.get("fields").and_then(Value::as_object) {
            for key in FieldKey::ALL {
                if let Some(record) = fields.get(key.wire_name()).and_then(FieldRecord::from_value)
                {
                    submission.insert_field(key, record);
                }
            }
        }

        submission
    }
}
