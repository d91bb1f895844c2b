use call_intake::config::AppConfig;
use call_intake::error::AppError;
use call_intake::intake::IntakeService;
use call_intake::mailer::{ConfirmationMailer, HickoryMxProbe, PostmarkClient};
use call_intake::storage::store_from_config;
use call_intake::tracker::MeisterTaskClient;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wires the configured gateways into the intake service.
pub(crate) fn build_intake_service(config: &AppConfig) -> Result<IntakeService, AppError> {
    let store = store_from_config(&config.storage)?;
    let tracker = Arc::new(MeisterTaskClient::new(&config.tracker)?);
    info!(storage = ?config.storage, section_id = config.tracker.section_id, "gateways configured");

    let mailer = match &config.mail {
        Some(mail) => Some(ConfirmationMailer::new(
            Arc::new(HickoryMxProbe::from_system()),
            Arc::new(PostmarkClient::new(mail)?),
            mail.from.clone(),
        )),
        None => {
            warn!("MAIL_API_TOKEN not set, confirmation mails are disabled");
            None
        }
    };

    Ok(IntakeService::new(
        store,
        tracker,
        config.tracker.labels.clone(),
        mailer,
    ))
}
