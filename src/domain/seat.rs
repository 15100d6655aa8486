use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A priced inventory bucket ("VIP", "General", ...) with a finite number of
/// seats left to sell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatCategory {
    pub id: Uuid,
    pub seat_type: String,
    pub price_gel_cents: i64,
    pub price_inr_cents: i64,
    pub available: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSeatCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub seat_type: String,
    #[validate(range(min = 0))]
    pub price_gel_cents: i64,
    #[validate(range(min = 0))]
    pub price_inr_cents: i64,
    #[validate(range(min = 0))]
    pub available: i64,
    pub notes: Option<String>,
}

/// Field-mask update: only the fields that are `Some` are written.
///
/// `available` here is an administrative override (e.g. a venue adding a row
/// of seats). Bookings never go through this path.
#[derive(Debug, Clone, Serialize, Deserialize, Default, Validate)]
pub struct UpdateSeatCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub seat_type: Option<String>,
    #[validate(range(min = 0))]
    pub price_gel_cents: Option<i64>,
    #[validate(range(min = 0))]
    pub price_inr_cents: Option<i64>,
    #[validate(range(min = 0))]
    pub available: Option<i64>,
    pub notes: Option<String>,
}

impl UpdateSeatCategoryRequest {
    pub fn is_empty(&self) -> bool {
        self.seat_type.is_none()
            && self.price_gel_cents.is_none()
            && self.price_inr_cents.is_none()
            && self.available.is_none()
            && self.notes.is_none()
    }
}
