// pipeguard-core/src/infrastructure/adapters/webhook.rs

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::alerting::Alert;
use crate::ports::notifier::{AlertNotifier, DeliveryError};

/// Body posted to chat-style incoming webhooks.
#[derive(Debug, Serialize, PartialEq)]
pub struct WebhookPayload {
    pub text: String,
    pub run_id: String,
    pub alert_type: String,
    pub severity: String,
    pub timestamp: String,
}

impl WebhookPayload {
    pub fn new(run_id: &str, alert: &Alert) -> Self {
        Self {
            text: format!(
                "🚨 {}: {}",
                alert.severity.to_string().to_uppercase(),
                alert.message
            ),
            run_id: run_id.to_string(),
            alert_type: alert.kind.to_string(),
            severity: alert.severity.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    /// `timeout` bounds each request at the HTTP layer; the dispatcher applies
    /// its own deadline on top.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl AlertNotifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, run_id: &str, alert: &Alert) -> Result<(), DeliveryError> {
        let payload = WebhookPayload::new(run_id, alert);
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!(run_id, alert_type = %alert.kind, "Webhook accepted alert");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::alerting::{AlertKind, AlertSeverity};

    fn alert() -> Alert {
        Alert {
            kind: AlertKind::ErrorRate,
            severity: AlertSeverity::Critical,
            message: "High error rate: 6.00% in pipeline claims_ingestion".into(),
            value: 0.06,
            threshold: 0.05,
        }
    }

    #[test]
    fn test_payload_shape() {
        let payload = WebhookPayload::new("run-42", &alert());
        assert_eq!(
            payload.text,
            "🚨 CRITICAL: High error rate: 6.00% in pipeline claims_ingestion"
        );
        assert_eq!(payload.alert_type, "error_rate");
        assert_eq!(payload.severity, "critical");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["run_id"], "run-42");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Port 9 (discard) on localhost: nothing listens in test environments.
        let notifier =
            WebhookNotifier::new("http://127.0.0.1:9/hook", Duration::from_millis(500)).unwrap();
        let err = notifier.notify("run-42", &alert()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)));
    }
}
