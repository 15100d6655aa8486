use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// How long a transaction waits on another writer's lock before giving up.
    pub busy_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    /// Upper bound on the decoded receipt image size.
    pub max_receipt_bytes: usize,
    pub max_notes_len: usize,
    /// Whether rejecting a booking hands its seats back to the category.
    pub refund_on_reject: bool,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_receipt_bytes: 5 * 1024 * 1024,
            max_notes_len: 2000,
            refund_on_reject: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotificationConfig {
    /// Recipient of "new booking" and "receipt re-uploaded" notices.
    pub admin_email: Option<String>,
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub url: String,
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
}

fn default_webhook_timeout() -> u64 {
    10
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("database.url", "sqlite://boxoffice.db")?
            .set_default("database.max_connections", 10)?
            .set_default("database.busy_timeout_secs", 10)?
            .set_default("booking.max_receipt_bytes", 5 * 1024 * 1024)?
            .set_default("booking.max_notes_len", 2000)?
            .set_default("booking.refund_on_reject", true)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with BOXOFFICE__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("BOXOFFICE").separator("__"))

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://boxoffice.db".to_string(),
                max_connections: 10,
                busy_timeout_secs: 10,
            },
            booking: BookingConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_refund_rejected_bookings() {
        let settings = Settings::default();
        assert!(settings.booking.refund_on_reject);
        assert_eq!(settings.booking.max_notes_len, 2000);
        assert!(settings.notifications.webhook.is_none());
    }
}
