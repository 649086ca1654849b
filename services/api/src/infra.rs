use async_trait::async_trait;
use hall_ticket::workflows::issuance::{DeliveryError, Mailer, OutboundMessage};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Mailer for offline commands; every send is refused.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct OfflineMailer;

#[async_trait]
impl Mailer for OfflineMailer {
    async fn send(&self, message: OutboundMessage) -> Result<(), DeliveryError> {
        Err(DeliveryError::Transport(format!(
            "mail delivery is disabled offline (recipient {})",
            message.to
        )))
    }
}
