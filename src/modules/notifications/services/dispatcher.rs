use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;

/// Events pushed to the notification webhook
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum NotificationEvent {
    HoldPlaced {
        job_id: String,
        purpose: String,
        amount: Decimal,
    },
    QuoteReady {
        job_id: String,
        quote_id: String,
        total_amount: Decimal,
    },
    QuoteApproved {
        job_id: String,
        quote_id: String,
        total_amount: Decimal,
    },
    JobCompleted {
        job_id: String,
        total_captured: Decimal,
    },
}

impl NotificationEvent {
    fn name(&self) -> &'static str {
        match self {
            NotificationEvent::HoldPlaced { .. } => "hold-placed",
            NotificationEvent::QuoteReady { .. } => "quote-ready",
            NotificationEvent::QuoteApproved { .. } => "quote-approved",
            NotificationEvent::JobCompleted { .. } => "job-completed",
        }
    }
}

/// Fire-and-forget notification dispatcher.
///
/// Delivery is best-effort in a spawned task: a dead webhook must never roll
/// back or delay the lifecycle or payment operation that emitted the event.
/// Without a configured webhook URL events are only traced.
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    /// Dispatch an event; returns immediately
    pub fn notify(&self, event: NotificationEvent) {
        let name = event.name();
        tracing::info!(event = name, payload = ?event, "Dispatching notification");

        let Some(url) = self.webhook_url.clone() else {
            return;
        };

        let client = self.client.clone();
        let body = serde_json::json!({
            "event": name,
            "emitted_at": Utc::now(),
            "data": event,
        });

        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(response) if !response.status().is_success() => {
                    tracing::warn!(
                        event = name,
                        status = %response.status(),
                        "Notification webhook returned an error"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(event = name, error = %e, "Notification delivery failed");
                }
            }
        });
    }
}
