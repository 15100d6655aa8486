use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    pub contact_number: String,
    pub email: Option<String>,
    /// Flipped by the door check-in flow; everything else is write-once.
    pub attended: bool,
    pub created_at: DateTime<Utc>,
}

/// One attendee as entered by the requester at booking time.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewParticipant {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 3, max = 32))]
    pub contact_number: String,
    #[validate(email)]
    pub email: Option<String>,
}
