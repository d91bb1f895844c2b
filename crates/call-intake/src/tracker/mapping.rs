use std::ops::RangeInclusive;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::config::{LabelId, LabelTable};
use crate::submission::sanitize::escape_tracker_text;
use crate::submission::{FieldKey, Submission};

const EMAIL_CHARS: RangeInclusive<usize> = 6..=100;
const PHONE_CHARS: RangeInclusive<usize> = 8..=20;
const WEBSITE_CHARS: RangeInclusive<usize> = 6..=100;
const INTERESTED_NOTE: &str = "Ist bereits Interessent*In";

fn package_pattern() -> &'static Regex {
    static PACKAGE: OnceLock<Regex> = OnceLock::new();
    PACKAGE.get_or_init(|| Regex::new(r"(?i)Paket ([1-4])").expect("package pattern compiles"))
}

fn interest_pattern() -> &'static Regex {
    static INTEREST: OnceLock<Regex> = OnceLock::new();
    INTEREST.get_or_init(|| Regex::new(r"(?i)ja|yes").expect("interest pattern compiles"))
}

/// Everything needed to create the tracker task for one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDraft {
    pub name: String,
    pub notes: String,
    #[serde(rename = "label_ids")]
    pub labels: Vec<LabelId>,
}

impl TaskDraft {
    pub fn from_submission(submission: &Submission, labels: &LabelTable) -> Self {
        let interested = is_already_interested(submission.value(FieldKey::AlreadyInterested));

        let mut notes = vec![
            gated_line("E-Mail", submission.value(FieldKey::Email), EMAIL_CHARS),
            gated_line("Telefon", submission.value(FieldKey::Phone), PHONE_CHARS),
            gated_line("Website", submission.value(FieldKey::Website), WEBSITE_CHARS),
        ];

        let mut label_ids = vec![labels.from_website];
        if interested {
            notes.push(INTERESTED_NOTE.to_string());
            label_ids.push(labels.interested);
        }
        label_ids.push(package_label(submission.value(FieldKey::Package), labels));

        Self {
            name: escape_tracker_text(submission.value(FieldKey::Name)),
            notes: notes.join("\n"),
            labels: label_ids,
        }
    }
}

fn gated_line(label: &str, raw: &str, accepted: RangeInclusive<usize>) -> String {
    let value = escape_tracker_text(raw);
    if accepted.contains(&value.chars().count()) {
        format!("{label}: {value}")
    } else {
        format!("{label}: -")
    }
}

pub fn is_already_interested(value: &str) -> bool {
    interest_pattern().is_match(value)
}

/// The first `Paket <1-4>` mention picks the tier; anything else gets the
/// default package label.
pub fn package_label(value: &str, labels: &LabelTable) -> LabelId {
    package_pattern()
        .captures(value)
        .and_then(|captures| captures.get(1))
        .and_then(|digit| digit.as_str().parse::<u8>().ok())
        .map(|tier| labels.package(tier))
        .unwrap_or(labels.package_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::FieldRecord;

    fn labels() -> LabelTable {
        LabelTable {
            interested: LabelId(11),
            from_website: LabelId(12),
            packages: [LabelId(21), LabelId(22), LabelId(23), LabelId(24)],
            package_default: LabelId(20),
        }
    }

    fn submission(values: &[(FieldKey, &str)]) -> Submission {
        values
            .iter()
            .fold(Submission::default(), |submission, (key, value)| {
                submission.with_field(
                    *key,
                    FieldRecord {
                        value: value.to_string(),
                        ..FieldRecord::default()
                    },
                )
            })
    }

    fn note_line<'a>(draft: &'a TaskDraft, prefix: &str) -> &'a str {
        draft
            .notes
            .lines()
            .find(|line| line.starts_with(prefix))
            .expect("note line present")
    }

    #[test]
    fn package_mentions_select_their_tier() {
        let labels = labels();
        assert_eq!(package_label("Paket 3", &labels), LabelId(23));
        assert_eq!(package_label("paket 3 (Atelier)", &labels), LabelId(23));
        assert_eq!(package_label("PAKET 1", &labels), LabelId(21));
        assert_eq!(package_label("Ich nehme Paket 4", &labels), LabelId(24));
    }

    #[test]
    fn unknown_packages_fall_back_to_default() {
        let labels = labels();
        assert_eq!(package_label("Paket 9", &labels), LabelId(20));
        assert_eq!(package_label("Paket 0", &labels), LabelId(20));
        assert_eq!(package_label("Paket3", &labels), LabelId(20));
        assert_eq!(package_label("", &labels), LabelId(20));
    }

    #[test]
    fn first_package_mention_wins() {
        assert_eq!(package_label("Paket 2 oder Paket 4", &labels()), LabelId(22));
    }

    #[test]
    fn exactly_one_package_label_is_selected() {
        let labels = labels();
        for value in ["Paket 1", "Paket 9", "keine Angabe", "Paket 2, Paket 3"] {
            let draft =
                TaskDraft::from_submission(&submission(&[(FieldKey::Package, value)]), &labels);
            let package_labels = draft
                .labels
                .iter()
                .filter(|id| labels.packages.contains(*id) || **id == labels.package_default)
                .count();
            assert_eq!(package_labels, 1, "{value}");
        }
    }

    #[test]
    fn interested_applicants_get_note_and_label() {
        let labels = labels();
        let yes = TaskDraft::from_submission(
            &submission(&[(FieldKey::AlreadyInterested, "Ja")]),
            &labels,
        );
        assert!(yes.notes.lines().any(|line| line == INTERESTED_NOTE));
        assert!(yes.labels.contains(&LabelId(11)));

        let no = TaskDraft::from_submission(
            &submission(&[(FieldKey::AlreadyInterested, "Nein")]),
            &labels,
        );
        assert!(!no.notes.contains(INTERESTED_NOTE));
        assert!(!no.labels.contains(&LabelId(11)));
    }

    #[test]
    fn from_website_label_is_always_present() {
        let draft = TaskDraft::from_submission(&Submission::default(), &labels());
        assert_eq!(draft.labels, vec![LabelId(12), LabelId(20)]);
        assert_eq!(draft.notes, "E-Mail: -\nTelefon: -\nWebsite: -");
        assert_eq!(draft.name, "");
    }

    #[test]
    fn email_is_gated_by_length() {
        let labels = labels();
        let draft = |email: &str| {
            TaskDraft::from_submission(&submission(&[(FieldKey::Email, email)]), &labels)
        };

        assert_eq!(note_line(&draft("a@b.c"), "E-Mail"), "E-Mail: -");
        assert_eq!(note_line(&draft("a@b.at"), "E-Mail"), "E-Mail: a@b.at");
        let long = format!("{}@example.org", "x".repeat(89));
        assert_eq!(long.chars().count(), 101);
        assert_eq!(note_line(&draft(&long), "E-Mail"), "E-Mail: -");
    }

    #[test]
    fn phone_and_website_are_gated_by_length() {
        let draft = TaskDraft::from_submission(
            &submission(&[
                (FieldKey::Phone, "0660 12"),
                (FieldKey::Website, "https://werkstatt.example"),
            ]),
            &labels(),
        );
        assert_eq!(note_line(&draft, "Telefon"), "Telefon: -");
        assert_eq!(note_line(&draft, "Website"), "Website: https://werkstatt.example");

        let draft = TaskDraft::from_submission(
            &submission(&[(FieldKey::Phone, "+43 660 1234567")]),
            &labels(),
        );
        assert_eq!(note_line(&draft, "Telefon"), "Telefon: +43 660 1234567");
    }

    #[test]
    fn task_text_is_defanged_and_flattened() {
        let draft = TaskDraft::from_submission(
            &submission(&[
                (FieldKey::Name, "**Erika**\n- Muster"),
                (FieldKey::Email, " erika_m@example.org "),
            ]),
            &labels(),
        );
        assert_eq!(draft.name, "Erika Muster");
        assert_eq!(note_line(&draft, "E-Mail"), "E-Mail: erika m@example.org");
    }

    #[test]
    fn serializes_label_ids_for_the_api() {
        let draft = TaskDraft::from_submission(&Submission::default(), &labels());
        let json = serde_json::to_value(&draft).expect("serializes");
        assert_eq!(json["label_ids"], serde_json::json!([12, 20]));
    }
}
