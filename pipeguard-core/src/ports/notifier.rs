// pipeguard-core/src/ports/notifier.rs

// The outbound side of alerting: where an alert goes (chat webhook, pager,
// test double) is decided by whoever implements this trait.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::domain::alerting::Alert;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum DeliveryError {
    #[error("Alert delivery timed out after {0} ms")]
    #[diagnostic(
        code(pipeguard::delivery::timeout),
        help("The receiving endpoint did not answer in time. Raise --timeout-secs or check the endpoint.")
    )]
    Timeout(u64),

    #[error("Alert delivery failed: {0}")]
    #[diagnostic(code(pipeguard::delivery::transport))]
    Transport(String),

    #[error("Alert endpoint rejected the alert with status {status}")]
    #[diagnostic(
        code(pipeguard::delivery::rejected),
        help("Check the webhook URL and its expected payload.")
    )]
    Rejected { status: u16 },
}

#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Short name used in logs (e.g. "webhook").
    fn name(&self) -> &str;

    async fn notify(&self, run_id: &str, alert: &Alert) -> Result<(), DeliveryError>;
}
