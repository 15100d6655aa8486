use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use crate::{
    config::WebhookConfig,
    domain::Booking,
    error::{AppError, Result},
    notifications::{BookingEvent, Notifier},
};

/// Body posted for every event. Receipt bytes never leave the ledger; the
/// ticket is base64 when present.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    event: &'static str,
    recipient: Option<&'a str>,
    booking: &'a Booking,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ticket: Option<String>,
}

pub struct WebhookNotifier {
    config: WebhookConfig,
    admin_email: Option<String>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// `None` when no webhook is configured or it is switched off.
    pub fn new(config: Option<WebhookConfig>, admin_email: Option<String>) -> Result<Option<Self>> {
        let Some(cfg) = config.filter(|c| c.enabled) else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        Ok(Some(Self {
            config: cfg,
            admin_email,
            client,
        }))
    }

    fn payload<'a>(&'a self, event: &'a BookingEvent) -> WebhookPayload<'a> {
        let booking = event.booking();
        let recipient = if event.is_for_admin() {
            self.admin_email.as_deref()
        } else {
            Some(booking.booking_email.as_str())
        };

        let (reason, ticket) = match event {
            BookingEvent::Rejected { reason, .. } => (Some(reason.as_str()), None),
            BookingEvent::Approved { ticket, .. } => (None, ticket.as_ref().map(|t| STANDARD.encode(t))),
            _ => (None, None),
        };

        WebhookPayload {
            event: event.kind(),
            recipient,
            booking,
            reason,
            ticket,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "Webhook"
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn health_check(&self) -> Result<()> {
        reqwest::Url::parse(&self.config.url)
            .map_err(|e| AppError::Integration(format!("invalid webhook url: {}", e)))?;
        Ok(())
    }

    async fn handle_event(&self, event: &BookingEvent) -> Result<()> {
        if event.is_for_admin() && self.admin_email.is_none() {
            tracing::warn!("No admin e-mail configured; {} goes out without a recipient", event.kind());
        }

        self.client
            .post(&self.config.url)
            .json(&self.payload(event))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
