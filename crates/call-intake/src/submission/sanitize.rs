use std::sync::OnceLock;

use regex::Regex;

fn line_breaks() -> &'static Regex {
    static BREAKS: OnceLock<Regex> = OnceLock::new();
    BREAKS.get_or_init(|| Regex::new(r"\r\n?|\n").expect("line break pattern compiles"))
}

fn space_runs() -> &'static Regex {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    SPACES.get_or_init(|| Regex::new(r" {2,}").expect("space pattern compiles"))
}

fn markup_syntax() -> &'static Regex {
    static MARKUP: OnceLock<Regex> = OnceLock::new();
    MARKUP.get_or_init(|| {
        Regex::new(r"[#*_~>`\[\]()]|\n(?:\d+\.|-) |-{3,}").expect("markup pattern compiles")
    })
}

/// Flattens a value onto one line. Line breaks of any style become spaces,
/// space runs collapse and the ends are trimmed.
pub fn escape_value(value: &str) -> String {
    let single_line = line_breaks().replace_all(value, " ");
    space_runs()
        .replace_all(&single_line, " ")
        .trim()
        .to_string()
}

/// Replaces syntax the tracker's note renderer would interpret (emphasis,
/// headings, links, list markers after a newline, rules) with a space.
pub fn escape_markup(value: &str) -> String {
    markup_syntax().replace_all(value, " ").into_owned()
}

/// Tracker text: markup defanged first, then flattened.
pub fn escape_tracker_text(value: &str) -> String {
    escape_value(&escape_markup(value))
}
