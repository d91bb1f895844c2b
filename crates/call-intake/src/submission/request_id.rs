use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use rand::Rng;
use regex::Regex;
use serde::Serialize;

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{13}-\d{4}$").expect("request id pattern compiles"))
}

/// Names one submission, its archive object and its rendered document.
///
/// Shaped `<unix millis>-<4 random digits>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self::generate_at(Utc::now(), &mut rand::thread_rng())
    }

    pub fn generate_at<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> Self {
        let disambiguator: u16 = rng.gen_range(0..10_000);
        Self(format!("{:013}-{disambiguator:04}", now.timestamp_millis()))
    }

    /// Accepts only identifiers of the generated shape.
    pub fn parse(raw: &str) -> Option<Self> {
        pattern().is_match(raw).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Object key of the archived raw body.
    pub fn archive_key(&self) -> String {
        format!("{}.json", self.0)
    }

    /// File name of the rendered summary.
    pub fn document_name(&self) -> String {
        format!("call-{}.pdf", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generated_ids_match_the_export_format() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc
            .with_ymd_and_hms(2026, 10, 15, 12, 0, 0)
            .single()
            .expect("valid instant");
        for _ in 0..200 {
            let id = RequestId::generate_at(now, &mut rng);
            assert!(RequestId::parse(id.as_str()).is_some(), "{id}");
            assert!(id.as_str().starts_with("1792065600000-"));
        }
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        for raw in [
            "abc",
            "1791979200000-12",
            "1791979200000-12345",
            "179197920000-1234",
            " 1791979200000-1234",
            "1791979200000_1234",
        ] {
            assert!(RequestId::parse(raw).is_none(), "{raw}");
        }
        assert!(RequestId::parse("1791979200000-0042").is_some());
    }

    #[test]
    fn derives_object_and_document_names() {
        let id = RequestId::parse("1791979200000-0042").expect("valid id");
        assert_eq!(id.archive_key(), "1791979200000-0042.json");
        assert_eq!(id.document_name(), "call-1791979200000-0042.pdf");
    }
}
