use std::fmt;

use serde_json::{Map, Value};

use super::{FieldKey, FieldRecord, FormInfo, Submission, SHORT_FIELD_MAX_CHARS};

const FIELD_ATTRIBUTES: [&str; 6] = ["id", "type", "title", "value", "raw_value", "required"];
const NON_EMPTY_ATTRIBUTES: [&str; 3] = ["id", "type", "title"];
const CAPPED_ATTRIBUTES: [&str; 2] = ["value", "raw_value"];

/// A single schema violation, addressed by its dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" {}", self.path, self.message)
    }
}

/// The submission does not conform to the form schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid submission: ")?;
        for (index, issue) in self.issues.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Default)]
struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Checks a decoded body against the form schema.
///
/// Every key is optional, unknown keys are rejected, and either the whole
/// body conforms or every violation is reported.
pub fn validate(raw: &Map<String, Value>) -> Result<Submission, ValidationError> {
    let mut issues = Issues::default();
    let mut form = FormInfo::default();
    let mut meta = Map::new();
    let mut fields = Vec::new();

    for (key, value) in raw {
        match key.as_str() {
            "form" => form = validate_form(value, &mut issues),
            "fields" => fields = validate_fields(value, &mut issues),
            "meta" => match value.as_object() {
                Some(object) => meta = object.clone(),
                None => issues.push("meta", "must be of type object"),
            },
            other => issues.push(other, "is not allowed"),
        }
    }

    if !issues.0.is_empty() {
        return Err(ValidationError { issues: issues.0 });
    }

    let mut submission = Submission::new(form, meta);
    for (key, record) in fields {
        submission.insert_field(key, record);
    }
    Ok(submission)
}

fn validate_form(value: &Value, issues: &mut Issues) -> FormInfo {
    let Some(object) = value.as_object() else {
        issues.push("form", "must be of type object");
        return FormInfo::default();
    };

    let mut form = FormInfo::default();
    for (key, value) in object {
        let path = format!("form.{key}");
        let slot = match key.as_str() {
            "id" => &mut form.id,
            "name" => &mut form.name,
            _ => {
                issues.push(path, "is not allowed");
                continue;
            }
        };
        match value.as_str() {
            Some("") => issues.push(path, "is not allowed to be empty"),
            Some(text) => *slot = Some(text.to_string()),
            None => issues.push(path, "must be a string"),
        }
    }
    form
}

fn validate_fields(value: &Value, issues: &mut Issues) -> Vec<(FieldKey, FieldRecord)> {
    let Some(object) = value.as_object() else {
        issues.push("fields", "must be of type object");
        return Vec::new();
    };

    let mut records = Vec::new();
    for (name, value) in object {
        let path = format!("fields.{name}");
        let Some(key) = FieldKey::from_wire(name) else {
            issues.push(path, "is not allowed");
            continue;
        };
        if let Some(record) = validate_record(key, &path, value, issues) {
            records.push((key, record));
        }
    }
    records
}

fn validate_record(
    key: FieldKey,
    path: &str,
    value: &Value,
    issues: &mut Issues,
) -> Option<FieldRecord> {
    let Some(object) = value.as_object() else {
        issues.push(path, "must be of type object");
        return None;
    };

    let before = issues.0.len();
    for (attribute, value) in object {
        let attribute_path = format!("{path}.{attribute}");
        if !FIELD_ATTRIBUTES.contains(&attribute.as_str()) {
            issues.push(attribute_path, "is not allowed");
            continue;
        }

        let Some(text) = value.as_str() else {
            issues.push(attribute_path, "must be a string");
            continue;
        };

        if text.is_empty() && NON_EMPTY_ATTRIBUTES.contains(&attribute.as_str()) {
            issues.push(attribute_path, "is not allowed to be empty");
        } else if key.is_short()
            && CAPPED_ATTRIBUTES.contains(&attribute.as_str())
            && text.chars().count() > SHORT_FIELD_MAX_CHARS
        {
            issues.push(
                attribute_path,
                format!(
                    "length must be less than or equal to {SHORT_FIELD_MAX_CHARS} characters long"
                ),
            );
        }
    }

    if issues.0.len() > before {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}
