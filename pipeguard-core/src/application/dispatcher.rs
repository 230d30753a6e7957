// pipeguard-core/src/application/dispatcher.rs

use futures::future::join_all;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::domain::alerting::{Alert, AlertKind};
use crate::ports::notifier::{AlertNotifier, DeliveryError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryFailure {
    pub alert_type: AlertKind,
    #[serde(serialize_with = "as_display")]
    pub error: DeliveryError,
}

fn as_display<S: Serializer>(error: &DeliveryError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchReport {
    /// Alerts logged (every alert is logged, delivered or not).
    pub logged: usize,
    pub delivered: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sends alerts to an optional channel. Delivery problems stay inside the
/// returned report: they never abort the run or the other deliveries.
#[derive(Clone)]
pub struct AlertDispatcher {
    notifier: Option<Arc<dyn AlertNotifier>>,
    deadline: Duration,
}

impl std::fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field("notifier", &self.notifier.as_ref().map(|n| n.name().to_string()))
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn AlertNotifier>, deadline: Duration) -> Self {
        Self {
            notifier: Some(notifier),
            deadline,
        }
    }

    /// Logs alerts without sending them anywhere.
    pub fn log_only() -> Self {
        Self {
            notifier: None,
            deadline: Duration::ZERO,
        }
    }

    pub async fn dispatch(&self, run_id: &str, alerts: &[Alert]) -> DispatchReport {
        for alert in alerts {
            warn!(
                run_id,
                alert_type = %alert.kind,
                severity = %alert.severity,
                alert_message = %alert.message,
                "Alert triggered"
            );
        }

        let mut report = DispatchReport {
            logged: alerts.len(),
            ..Default::default()
        };

        let Some(notifier) = &self.notifier else {
            return report;
        };

        // One deadline per alert; deliveries run concurrently, results keep alert order.
        let deliveries = alerts.iter().map(|alert| async move {
            let outcome = match timeout(self.deadline, notifier.notify(run_id, alert)).await {
                Ok(result) => result,
                Err(_) => Err(DeliveryError::Timeout(self.deadline.as_millis() as u64)),
            };
            (alert.kind, outcome)
        });

        for (kind, outcome) in join_all(deliveries).await {
            match outcome {
                Ok(()) => {
                    info!(run_id, alert_type = %kind, channel = notifier.name(), "Alert sent successfully");
                    report.delivered += 1;
                }
                Err(e) => {
                    error!(run_id, alert_type = %kind, channel = notifier.name(), error = %e, "Failed to send alert");
                    report.failures.push(DeliveryFailure {
                        alert_type: kind,
                        error: e,
                    });
                }
            }
        }

        report
    }
}
