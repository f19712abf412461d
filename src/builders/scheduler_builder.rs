//! Builder wiring configuration, client identity and audit into a scheduler.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::AdmissionConfig;
use crate::core::{AdmissionError, AuditSink, ClientIdFn, Scheduler};
use crate::util::ids::ClientId;

/// Builds a [`Scheduler`].
///
/// Defaults to keying clients by the IP of a [`SocketAddr`]; use
/// [`SchedulerBuilder::with_client_extractor`] for other request contexts.
pub struct SchedulerBuilder<R: ?Sized = SocketAddr> {
    config: AdmissionConfig,
    extract: ClientIdFn<R>,
    audit: Option<Box<dyn AuditSink>>,
}

impl SchedulerBuilder<SocketAddr> {
    /// Start from `config` with IP-based client identity.
    #[must_use]
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            config,
            extract: Arc::new(|addr: &SocketAddr| ClientId::from(*addr)),
            audit: None,
        }
    }

    /// Start from `WAITING_ROOM_*` environment variables.
    ///
    /// # Errors
    ///
    /// [`AdmissionError::InvalidConfig`] on unparsable or invalid values.
    pub fn from_env() -> Result<Self, AdmissionError> {
        AdmissionConfig::from_env()
            .map(Self::new)
            .map_err(AdmissionError::InvalidConfig)
    }
}

impl<R: ?Sized> SchedulerBuilder<R> {
    /// Derive client identity from a different request context type.
    #[must_use]
    pub fn with_client_extractor<R2, F>(self, extract: F) -> SchedulerBuilder<R2>
    where
        R2: ?Sized,
        F: Fn(&R2) -> ClientId + Send + Sync + 'static,
    {
        SchedulerBuilder {
            config: self.config,
            extract: Arc::new(extract),
            audit: self.audit,
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Configuration the scheduler will use.
    #[must_use]
    pub const fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Validate configuration and build.
    ///
    /// # Errors
    ///
    /// [`AdmissionError::InvalidConfig`] when validation fails.
    pub fn build(self) -> Result<Scheduler<R>, AdmissionError> {
        self.config
            .validate()
            .map_err(AdmissionError::InvalidConfig)?;
        tracing::debug!(
            max_client_requests = self.config.max_client_requests,
            max_processing = self.config.max_processing,
            max_waiting = self.config.max_waiting,
            poll_interval_ms = self.config.poll_interval_ms,
            "building admission scheduler"
        );
        Ok(Scheduler::from_parts(self.config, self.extract, self.audit))
    }
}
