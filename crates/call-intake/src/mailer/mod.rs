//! Best-effort confirmation email to the applicant, sent only when the
//! address is well-formed and its domain publishes an MX record.

mod postmark;
mod probe;

use std::sync::{Arc, OnceLock};

use regex::Regex;

pub use postmark::{MailGateway, PostmarkClient};
pub use probe::{accepts_mail, HickoryMxProbe, MxProbe, MxRecord};

pub const CONFIRMATION_SUBJECT: &str = "Deine Bewerbung für die HausWirtschaft ist angekommen";
const CONFIRMATION_HTML: &str = include_str!("../../templates/confirmation.html");
const CONFIRMATION_TEXT: &str = include_str!("../../templates/confirmation.txt");

fn address_pattern() -> &'static Regex {
    static ADDRESS: OnceLock<Regex> = OnceLock::new();
    ADDRESS.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
        )
        .expect("address pattern compiles")
    })
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("mail api responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("mx lookup failed: {0}")]
    Dns(#[from] hickory_resolver::error::ResolveError),
}

/// A fully composed message ready for the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: &'static str,
    pub html_body: &'static str,
    pub text_body: &'static str,
}

impl OutgoingMail {
    pub fn confirmation(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: CONFIRMATION_SUBJECT,
            html_body: CONFIRMATION_HTML,
            text_body: CONFIRMATION_TEXT,
        }
    }
}

/// Syntactic check only; deliverability is left to the MX probe.
pub fn is_valid_address(address: &str) -> bool {
    address.len() <= 254 && address_pattern().is_match(address)
}

fn domain_of(address: &str) -> Option<&str> {
    address.rsplit_once('@').map(|(_, domain)| domain)
}

#[derive(Debug)]
pub enum MailOutcome {
    Sent,
    InvalidAddress,
    NoMailExchange,
    Failed(MailError),
}

/// Runs both gates and hands the confirmation to the gateway.
#[derive(Clone)]
pub struct ConfirmationMailer {
    probe: Arc<dyn MxProbe>,
    gateway: Arc<dyn MailGateway>,
    from: String,
}

impl ConfirmationMailer {
    pub fn new(probe: Arc<dyn MxProbe>, gateway: Arc<dyn MailGateway>, from: String) -> Self {
        Self {
            probe,
            gateway,
            from,
        }
    }

    pub async fn confirm(&self, address: &str) -> MailOutcome {
        let address = address.trim();
        if !is_valid_address(address) {
            return MailOutcome::InvalidAddress;
        }
        let Some(domain) = domain_of(address) else {
            return MailOutcome::InvalidAddress;
        };

        match self.probe.lookup(domain).await {
            Ok(records) if accepts_mail(&records) => {}
            Ok(_) => return MailOutcome::NoMailExchange,
            Err(err) => {
                tracing::debug!(domain, error = %err, "mx lookup failed");
                return MailOutcome::NoMailExchange;
            }
        }

        let mail = OutgoingMail::confirmation(&self.from, address);
        match self.gateway.send(&mail).await {
            Ok(()) => MailOutcome::Sent,
            Err(err) => MailOutcome::Failed(err),
        }
    }
}

impl std::fmt::Debug for ConfirmationMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationMailer")
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}
