use crate::config::ConfigError;
use crate::document::RenderError;
use crate::mailer::MailError;
use crate::storage::StoreError;
use crate::telemetry::TelemetryError;
use crate::tracker::TrackerError;
use std::fmt;

/// Failures that stop the service or the render command.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Store(StoreError),
    Tracker(TrackerError),
    Mail(MailError),
    Render(RenderError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Store(err) => write!(f, "storage error: {}", err),
            AppError::Tracker(err) => write!(f, "tracker error: {}", err),
            AppError::Mail(err) => write!(f, "mail error: {}", err),
            AppError::Render(err) => write!(f, "render error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Tracker(err) => Some(err),
            AppError::Mail(err) => Some(err),
            AppError::Render(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<TrackerError> for AppError {
    fn from(value: TrackerError) -> Self {
        Self::Tracker(value)
    }
}

impl From<MailError> for AppError {
    fn from(value: MailError) -> Self {
        Self::Mail(value)
    }
}

impl From<RenderError> for AppError {
    fn from(value: RenderError) -> Self {
        Self::Render(value)
    }
}
