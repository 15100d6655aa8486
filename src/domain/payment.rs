use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A declared way of paying ("bank transfer to ...", "UPI id ..."). Bookings
/// point at one by id; several bookings may share a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub payment_type: String,
    pub details: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePaymentRecordRequest {
    #[validate(length(min = 1, max = 100))]
    pub payment_type: String,
    #[validate(length(min = 1))]
    pub details: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Validate)]
pub struct UpdatePaymentRecordRequest {
    #[validate(length(min = 1, max = 100))]
    pub payment_type: Option<String>,
    #[validate(length(min = 1))]
    pub details: Option<String>,
    pub notes: Option<String>,
}
