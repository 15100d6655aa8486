use async_trait::async_trait;
use sqlx::SqliteConnection;
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;

pub mod seat_repository;
pub mod participant_repository;
pub mod payment_repository;
pub mod booking_repository;

pub use seat_repository::SqliteSeatCategoryRepository;
pub use participant_repository::SqliteParticipantRepository;
pub use payment_repository::SqlitePaymentRecordRepository;
pub use booking_repository::SqliteBookingRepository;

// Methods that take a `&mut SqliteConnection` run inside the caller's
// transaction. Pass `&mut *tx`; nothing they write is visible until the
// caller commits.

/// Inventory store.
#[async_trait]
pub trait SeatCategoryRepository: Send + Sync {
    async fn create(&self, request: CreateSeatCategoryRequest) -> Result<SeatCategory>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<SeatCategory>>;
    async fn list(&self) -> Result<Vec<SeatCategory>>;
    async fn update(&self, id: Uuid, update: UpdateSeatCategoryRequest) -> Result<SeatCategory>;
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Takes the row lock and returns the current row. Concurrent lockers of
    /// the same row wait until this transaction commits or rolls back.
    async fn lock_for_update(&self, conn: &mut SqliteConnection, id: Uuid) -> Result<SeatCategory>;

    /// Writes a new available count. Only valid after `lock_for_update` on
    /// the same row in the same transaction.
    async fn set_available(&self, conn: &mut SqliteConnection, id: Uuid, available: i64) -> Result<SeatCategory>;
}

#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// Inserts all rows inside the caller's transaction; the returned
    /// participants are in input order.
    async fn insert_many(&self, conn: &mut SqliteConnection, participants: &[NewParticipant]) -> Result<Vec<Participant>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Participant>>;
    /// Returns the participants that exist, in the order of `ids`.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Participant>>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Participant>>;
    async fn set_attended(&self, id: Uuid, attended: bool) -> Result<Participant>;
}

#[async_trait]
pub trait PaymentRecordRepository: Send + Sync {
    async fn create(&self, request: CreatePaymentRecordRequest) -> Result<PaymentRecord>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentRecord>>;
    async fn find_by_id_in(&self, conn: &mut SqliteConnection, id: Uuid) -> Result<Option<PaymentRecord>>;
    async fn list(&self) -> Result<Vec<PaymentRecord>>;
    async fn update(&self, id: Uuid, update: UpdatePaymentRecordRequest) -> Result<PaymentRecord>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Booking ledger.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(&self, conn: &mut SqliteConnection, booking: &Booking) -> Result<()>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>>;

    /// Transactional point read. Holds the row lock until the caller's
    /// transaction ends, so the status it returns stays current.
    async fn lock_for_update(&self, conn: &mut SqliteConnection, id: Uuid) -> Result<Booking>;

    /// Writes the status and the seat-hold flag together. The flag must
    /// match the inventory change made in the same transaction.
    async fn update_status(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        status: BookingStatus,
        seats_held: bool,
    ) -> Result<Booking>;
    async fn update_receipt(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        receipt_image: &[u8],
        status: BookingStatus,
        seats_held: bool,
    ) -> Result<Booking>;
    async fn update_notes(&self, conn: &mut SqliteConnection, id: Uuid, notes: Option<String>) -> Result<Booking>;

    async fn get_receipt(&self, id: Uuid) -> Result<Option<Vec<u8>>>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Booking>>;
    async fn list_by_email(&self, email: &str) -> Result<Vec<Booking>>;
    async fn list_by_seat_category(&self, seat_category_id: Uuid) -> Result<Vec<Booking>>;
    async fn list_by_status(&self, statuses: &[BookingStatus]) -> Result<Vec<Booking>>;
    /// Bookings for one concert, newest first. An empty `statuses` slice
    /// means every status.
    async fn list_by_concert(&self, concert_id: Uuid, statuses: &[BookingStatus]) -> Result<Vec<Booking>>;
    async fn has_bookings_for_concert(&self, concert_id: Uuid) -> Result<bool>;
}
