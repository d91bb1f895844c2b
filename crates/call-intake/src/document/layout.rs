use chrono::{DateTime, Utc};
use chrono_tz::Europe::Vienna;

use super::fonts::Font;
use crate::submission::{escape_value, FieldKey, Submission};

/// A4 in points.
pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;
pub const MARGIN: f32 = 72.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const LINE_HEIGHT: f32 = 1.2;
const TITLE_SIZE: f32 = 18.0;
const BODY_SIZE: f32 = 12.0;
const FOOTER_SIZE: f32 = 8.0;
const PLACEHOLDER: &str = "-";
const TITLE: &str = "Call-Bewerbung";

const INLINE_ROWS: [(&str, FieldKey); 6] = [
    ("Name", FieldKey::Name),
    ("E-Mail", FieldKey::Email),
    ("Website", FieldKey::Website),
    ("Telefon", FieldKey::Phone),
    ("Paket", FieldKey::Package),
    ("Schon Interessent*in", FieldKey::AlreadyInterested),
];

const BLOCK_ROWS: [(&str, FieldKey); 4] = [
    (
        "Wie möchtest Du die Gewerbefläche nutzen?",
        FieldKey::CommercialUse,
    ),
    (
        "Was gefällt Dir an dem Gedanken, Teil der Genossenschaft die HausWirtschaft zu werden?",
        FieldKey::CommunityThoughts,
    ),
    (
        "Wie möchtest Du dich in die Gemeinschaft einbringen?",
        FieldKey::Contribution,
    ),
    ("Sonstige Fragen und Infos?", FieldKey::Other),
];

/// A piece of text placed at a baseline position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub font: Font,
    pub size: f32,
    pub x: f32,
    pub y: f32,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub runs: Vec<TextRun>,
}

/// Positioned text of the whole summary, page by page.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub pages: Vec<Page>,
}

impl Layout {
    /// Visible lines in reading order; runs sharing a baseline are joined.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for page in &self.pages {
            let mut current: Option<(f32, String)> = None;
            for run in &page.runs {
                match current.as_mut() {
                    Some((y, text)) if *y == run.y => text.push_str(&run.text),
                    _ => {
                        if let Some((_, text)) = current.take() {
                            lines.push(text);
                        }
                        current = Some((run.y, run.text.clone()));
                    }
                }
            }
            if let Some((_, text)) = current {
                lines.push(text);
            }
        }
        lines
    }
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
}

struct Cursor {
    finished: Vec<Page>,
    page: Page,
    top: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            finished: Vec::new(),
            page: Page::default(),
            top: PAGE_HEIGHT - MARGIN,
        }
    }

    fn reserve(&mut self, size: f32) {
        if self.top - size * LINE_HEIGHT < MARGIN {
            self.finished.push(std::mem::take(&mut self.page));
            self.top = PAGE_HEIGHT - MARGIN;
        }
    }

    fn move_down(&mut self, size: f32) {
        self.top -= size * LINE_HEIGHT;
    }

    fn place(&mut self, runs: Vec<(Font, f32, String)>, size: f32) {
        self.reserve(size);
        let baseline = self.top - size;
        for (font, x, text) in runs {
            self.page.runs.push(TextRun {
                font,
                size,
                x,
                y: baseline,
                text,
            });
        }
        self.move_down(size);
    }

    fn paragraph(&mut self, font: Font, size: f32, text: &str, align: Align) {
        for line in wrap(font, size, text, CONTENT_WIDTH, CONTENT_WIDTH) {
            let x = match align {
                Align::Left => MARGIN,
                Align::Center => MARGIN + (CONTENT_WIDTH - font.text_width(&line, size)) / 2.0,
            };
            self.place(vec![(font, x, line)], size);
        }
    }

    fn labelled(&mut self, label: &str, value: &str) {
        let label = format!("{label}:  ");
        let label_width = Font::Bold.text_width(&label, BODY_SIZE);
        let first_width = (CONTENT_WIDTH - label_width).max(0.0);
        let mut lines =
            wrap(Font::Regular, BODY_SIZE, value, first_width, CONTENT_WIDTH).into_iter();

        let first = lines.next().unwrap_or_default();
        self.place(
            vec![
                (Font::Bold, MARGIN, label),
                (Font::Regular, MARGIN + label_width, first),
            ],
            BODY_SIZE,
        );
        for line in lines {
            self.place(vec![(Font::Regular, MARGIN, line)], BODY_SIZE);
        }
    }

    fn finish(mut self) -> Layout {
        self.finished.push(self.page);
        Layout {
            pages: self.finished,
        }
    }
}

/// Greedy word wrap. Words wider than a whole line are split by character.
fn wrap(font: Font, size: f32, text: &str, first_width: f32, rest_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let width_for = |lines: &Vec<String>| if lines.is_empty() { first_width } else { rest_width };

    for word in text.split(' ').filter(|word| !word.is_empty()) {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if font.text_width(&candidate, size) <= width_for(&lines) {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        for ch in word.chars() {
            current.push(ch);
            if font.text_width(&current, size) > width_for(&lines) && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::replace(&mut current, ch.to_string()));
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn display(value: &str) -> String {
    let escaped = escape_value(value);
    if escaped.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        escaped
    }
}

/// Lays out the call summary. Absent fields render as a dash.
pub fn layout(submission: &Submission, rendered_at: DateTime<Utc>) -> Layout {
    let mut cursor = Cursor::new();

    cursor.paragraph(Font::Bold, TITLE_SIZE, TITLE, Align::Center);
    cursor.paragraph(
        Font::Bold,
        TITLE_SIZE,
        &display(submission.value(FieldKey::Name)),
        Align::Center,
    );
    cursor.move_down(TITLE_SIZE);

    for (label, key) in INLINE_ROWS {
        cursor.labelled(label, &display(submission.value(key)));
    }
    cursor.move_down(BODY_SIZE);

    for (label, key) in BLOCK_ROWS {
        cursor.paragraph(Font::Bold, BODY_SIZE, label, Align::Left);
        cursor.paragraph(
            Font::Regular,
            BODY_SIZE,
            &display(submission.value(key)),
            Align::Left,
        );
        cursor.move_down(BODY_SIZE);
    }

    cursor.move_down(BODY_SIZE);
    let local = rendered_at.with_timezone(&Vienna);
    cursor.paragraph(
        Font::Regular,
        FOOTER_SIZE,
        &format!("Generiert um {}", local.format("%d.%m.%Y, %H:%M:%S")),
        Align::Left,
    );

    cursor.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::{FieldRecord, FormInfo};
    use chrono::TimeZone;
    use serde_json::Map;

    fn rendered_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 12, 30, 5)
            .single()
            .expect("valid instant")
    }

    fn field(value: &str) -> FieldRecord {
        FieldRecord {
            value: value.to_string(),
            raw_value: value.to_string(),
            ..FieldRecord::default()
        }
    }

    #[test]
    fn empty_submission_renders_placeholders() {
        let lines = layout(&Submission::default(), rendered_at()).lines();
        assert_eq!(lines[0], "Call-Bewerbung");
        assert_eq!(lines[1], "-");
        for (label, _) in INLINE_ROWS {
            assert!(lines.contains(&format!("{label}:  -")), "{label}");
        }
        let dashes = lines.iter().filter(|line| line.as_str() == "-").count();
        assert_eq!(dashes, 1 + BLOCK_ROWS.len());
    }

    #[test]
    fn values_are_flattened_and_placed_after_labels() {
        let submission = Submission::new(FormInfo::default(), Map::new())
            .with_field(FieldKey::Name, field("  Erika\nMuster "))
            .with_field(FieldKey::Package, field("Paket 3"))
            .with_field(FieldKey::Other, field("Erste Zeile\n\nzweite   Zeile"));

        let lines = layout(&submission, rendered_at()).lines();
        assert_eq!(lines[1], "Erika Muster");
        assert!(lines.contains(&"Name:  Erika Muster".to_string()));
        assert!(lines.contains(&"Paket:  Paket 3".to_string()));
        let other = lines
            .iter()
            .position(|line| line == "Sonstige Fragen und Infos?")
            .expect("block label present");
        assert_eq!(lines[other + 1], "Erste Zeile zweite Zeile");
    }

    #[test]
    fn textarea_line_breaks_do_not_reach_the_page() {
        let submission = Submission::new(FormInfo::default(), Map::new())
            .with_field(FieldKey::Other, field("Zeile eins\r\nZeile zwei"));

        let lines = layout(&submission, rendered_at()).lines();
        assert!(lines.contains(&"Zeile eins Zeile zwei".to_string()));
        assert!(lines.iter().all(|line| !line.contains('\r')));
    }

    #[test]
    fn footer_uses_vienna_local_time() {
        let lines = layout(&Submission::default(), rendered_at()).lines();
        assert_eq!(
            lines.last().map(String::as_str),
            Some("Generiert um 15.10.2026, 14:30:05")
        );
    }

    #[test]
    fn title_is_centered() {
        let page = &layout(&Submission::default(), rendered_at()).pages[0];
        let title = &page.runs[0];
        let width = Font::Bold.text_width(TITLE, TITLE_SIZE);
        assert!((title.x - (MARGIN + (CONTENT_WIDTH - width) / 2.0)).abs() < 0.01);
        assert_eq!(title.font, Font::Bold);
    }

    #[test]
    fn long_answers_wrap_and_flow_onto_new_pages() {
        let essay = "Gemeinschaftliche Werkstatt mit offenen Abenden ".repeat(120);
        let submission =
            Submission::default().with_field(FieldKey::CommercialUse, field(&essay));

        let rendered = layout(&submission, rendered_at());
        assert!(rendered.pages.len() > 1);
        for page in &rendered.pages {
            for run in &page.runs {
                assert!(run.y >= MARGIN - run.size, "run below bottom margin");
                let right = run.x + run.font.text_width(&run.text, run.size);
                assert!(right <= PAGE_WIDTH - MARGIN + 0.01, "run past right margin");
            }
        }
    }

    #[test]
    fn overlong_words_are_split() {
        let word = "x".repeat(400);
        let lines = wrap(Font::Regular, BODY_SIZE, &word, CONTENT_WIDTH, CONTENT_WIDTH);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }
}
