use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;

use super::MailError;

/// One MX answer, reduced to what the acceptance rule looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

/// DNS plausibility check for a mail domain.
#[async_trait]
pub trait MxProbe: Send + Sync {
    /// MX records of `domain` in answer order.
    async fn lookup(&self, domain: &str) -> Result<Vec<MxRecord>, MailError>;
}

/// The first record decides: a named exchange or a nonzero preference
/// counts as a mail-capable domain.
pub fn accepts_mail(records: &[MxRecord]) -> bool {
    records
        .first()
        .map(|record| !record.exchange.is_empty() || record.preference != 0)
        .unwrap_or(false)
}

/// Resolver backed by the system configuration, falling back to public
/// defaults when none is readable.
#[derive(Clone)]
pub struct HickoryMxProbe {
    resolver: TokioAsyncResolver,
}

impl HickoryMxProbe {
    pub fn from_system() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "system resolver config unavailable, using defaults");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver }
    }
}

impl std::fmt::Debug for HickoryMxProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryMxProbe").finish_non_exhaustive()
    }
}

#[async_trait]
impl MxProbe for HickoryMxProbe {
    async fn lookup(&self, domain: &str) -> Result<Vec<MxRecord>, MailError> {
        let answer = self.resolver.mx_lookup(domain).await?;

        Ok(answer
            .iter()
            .map(|mx| MxRecord {
                preference: mx.preference(),
                exchange: mx.exchange().to_utf8().trim_end_matches('.').to_string(),
            })
            .collect())
    }
}
