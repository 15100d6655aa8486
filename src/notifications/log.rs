use async_trait::async_trait;
use crate::{
    error::Result,
    notifications::{BookingEvent, Notifier},
};

/// Default notifier: writes every event to the tracing log. Stands in for
/// e-mail delivery when nothing else is configured.
pub struct LogNotifier {
    admin_email: Option<String>,
}

impl LogNotifier {
    pub fn new(admin_email: Option<String>) -> Self {
        Self { admin_email }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "Log"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn handle_event(&self, event: &BookingEvent) -> Result<()> {
        let booking = event.booking();
        match event {
            BookingEvent::Created(_) | BookingEvent::ReceiptReuploaded(_) => {
                tracing::info!(
                    booking_id = %booking.id,
                    admin = self.admin_email.as_deref().unwrap_or("<unset>"),
                    "{}: {} x {} for {} awaiting verification",
                    event.kind(),
                    booking.quantity,
                    booking.seat_type,
                    booking.booking_email
                );
            }
            BookingEvent::Approved { ticket, .. } => {
                tracing::info!(
                    booking_id = %booking.id,
                    to = %booking.booking_email,
                    ticket_bytes = ticket.as_ref().map(|t| t.len()).unwrap_or(0),
                    "{}",
                    event.kind()
                );
            }
            BookingEvent::Rejected { reason, .. } => {
                tracing::info!(
                    booking_id = %booking.id,
                    to = %booking.booking_email,
                    "{}: {}",
                    event.kind(),
                    reason
                );
            }
            BookingEvent::Cancelled(_) => {
                tracing::info!(
                    booking_id = %booking.id,
                    "{}: {} seat(s) of {} released",
                    event.kind(),
                    booking.quantity,
                    booking.seat_type
                );
            }
        }
        Ok(())
    }
}
