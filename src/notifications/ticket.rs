use chrono::Utc;
use crate::{
    domain::{Booking, BookingStatus},
    error::{AppError, Result},
};

/// Produces the e-ticket attached to an approval notice.
pub trait TicketRenderer: Send + Sync {
    fn render(&self, booking: &Booking) -> Result<Vec<u8>>;
}

pub struct PlainTextTicketRenderer {
    title: String,
}

impl PlainTextTicketRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }
}

impl Default for PlainTextTicketRenderer {
    fn default() -> Self {
        Self::new("E-TICKET")
    }
}

impl TicketRenderer for PlainTextTicketRenderer {
    fn render(&self, booking: &Booking) -> Result<Vec<u8>> {
        if booking.status != BookingStatus::Approved {
            return Err(AppError::Integration(format!(
                "refusing to issue a ticket for booking {} in status {}",
                booking.id, booking.status
            )));
        }

        let ticket = format!(
            "{title}\n\
             Booking ref: {id}\n\
             Booked by:   {email}\n\
             Seat type:   {seat_type}\n\
             Quantity:    {quantity}\n\
             Total:       {units}.{cents:02}\n\
             Issued:      {issued}\n",
            title = self.title,
            id = booking.id,
            email = booking.booking_email,
            seat_type = booking.seat_type,
            quantity = booking.quantity,
            units = booking.total_amount_cents / 100,
            cents = booking.total_amount_cents % 100,
            issued = Utc::now().format("%Y-%m-%d %H:%M UTC"),
        );

        Ok(ticket.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn booking(status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4(),
            concert_id: Uuid::new_v4(),
            booking_email: "guest@example.com".to_string(),
            status,
            payment_record_id: Uuid::new_v4(),
            receipt_image: vec![1, 2, 3],
            seat_category_id: Uuid::new_v4(),
            seat_type: "VIP".to_string(),
            quantity: 2,
            total_amount_cents: 12_050,
            seats_held: true,
            participant_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_renders_approved_booking() {
        let booking = booking(BookingStatus::Approved);
        let ticket = PlainTextTicketRenderer::default().render(&booking).unwrap();
        let text = String::from_utf8(ticket).unwrap();

        assert!(text.starts_with("E-TICKET"));
        assert!(text.contains(&booking.id.to_string()));
        assert!(text.contains("VIP"));
        assert!(text.contains("120.50"));
    }

    #[test]
    fn test_refuses_unapproved_booking() {
        let renderer = PlainTextTicketRenderer::default();
        assert!(renderer.render(&booking(BookingStatus::Verifying)).is_err());
    }
}
