use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::NewParticipant;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub concert_id: Uuid,
    pub booking_email: String,
    pub status: BookingStatus,
    pub payment_record_id: Uuid,
    #[serde(skip)]
    pub receipt_image: Vec<u8>,
    pub seat_category_id: Uuid,
    /// Copied from the locked seat category at creation, never from input.
    pub seat_type: String,
    pub quantity: i64,
    pub total_amount_cents: i64,
    /// Whether `quantity` is currently deducted from the seat category.
    /// Written together with the inventory change, so it never depends on
    /// the reject policy in force when the booking is read.
    pub seats_held: bool,
    pub participant_ids: Vec<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Verifying,
    PendingVerification,
    Approved,
    Rejected,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Verifying => "VERIFYING",
            BookingStatus::PendingVerification => "PENDING_VERIFICATION",
            BookingStatus::Approved => "APPROVED",
            BookingStatus::Rejected => "REJECTED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    /// Both "awaiting admin decision" states.
    pub fn is_awaiting_decision(&self) -> bool {
        matches!(self, BookingStatus::Verifying | BookingStatus::PendingVerification)
    }

    /// Terminal for the requester: no re-upload, no notes edits.
    pub fn is_final(&self) -> bool {
        matches!(self, BookingStatus::Approved | BookingStatus::Cancelled)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_participant_count"))]
pub struct CreateBookingRequest {
    pub concert_id: Uuid,
    #[validate(email)]
    pub booking_email: String,
    pub payment_record_id: Uuid,
    /// Base64 as sent by the client; decoded before it is stored.
    #[validate(length(min = 1))]
    pub receipt_image: String,
    pub seat_category_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i64,
    #[validate(range(min = 0))]
    pub total_amount_cents: i64,
    #[validate(nested)]
    pub participants: Vec<NewParticipant>,
}

fn validate_participant_count(request: &CreateBookingRequest) -> Result<(), ValidationError> {
    if request.participants.len() as i64 != request.quantity {
        let mut err = ValidationError::new("participant_count");
        err.message = Some(
            format!(
                "expected {} participants for {} seats, got {}",
                request.quantity,
                request.quantity,
                request.participants.len()
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}
