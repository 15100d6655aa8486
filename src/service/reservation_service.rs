use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::BookingConfig,
    domain::*,
    error::{AppError, Result},
    notifications::{BookingEvent, NotificationDispatcher, TicketRenderer},
    repository::{
        BookingRepository, ParticipantRepository, PaymentRecordRepository, SeatCategoryRepository,
    },
};

const DEFAULT_REJECTION_REASON: &str = "No reason provided";

/// Inventory-adjusting booking operations. Every mutation runs in one
/// transaction that locks the rows it touches; notifications go out on a
/// background task after commit and never affect the result.
///
/// Lock order inside a transaction is booking first, then seat category.
/// A lock is always the first statement touching its row.
pub struct ReservationEngine {
    pool: SqlitePool,
    seat_repo: Arc<dyn SeatCategoryRepository>,
    participant_repo: Arc<dyn ParticipantRepository>,
    payment_repo: Arc<dyn PaymentRecordRepository>,
    booking_repo: Arc<dyn BookingRepository>,
    dispatcher: Arc<NotificationDispatcher>,
    ticket_renderer: Arc<dyn TicketRenderer>,
    config: BookingConfig,
}

impl ReservationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: SqlitePool,
        seat_repo: Arc<dyn SeatCategoryRepository>,
        participant_repo: Arc<dyn ParticipantRepository>,
        payment_repo: Arc<dyn PaymentRecordRepository>,
        booking_repo: Arc<dyn BookingRepository>,
        dispatcher: Arc<NotificationDispatcher>,
        ticket_renderer: Arc<dyn TicketRenderer>,
        config: BookingConfig,
    ) -> Self {
        Self {
            pool,
            seat_repo,
            participant_repo,
            payment_repo,
            booking_repo,
            dispatcher,
            ticket_renderer,
            config,
        }
    }

    pub async fn create_booking(&self, request: CreateBookingRequest) -> Result<Booking> {
        request.validate()?;
        let receipt = self.decode_receipt(&request.receipt_image)?;

        let mut tx = self.begin().await?;
        let outcome = self.create_in(&mut *tx, &request, receipt).await;
        let booking = Self::finish(tx, outcome).await?;

        tracing::info!(
            booking_id = %booking.id,
            seat_category_id = %booking.seat_category_id,
            quantity = booking.quantity,
            "Booking created"
        );
        self.dispatcher.spawn(BookingEvent::Created(booking.clone()));

        Ok(booking)
    }

    pub async fn cancel_booking(&self, id: Uuid) -> Result<Booking> {
        let mut tx = self.begin().await?;
        let outcome = self.cancel_in(&mut *tx, id).await;
        let booking = Self::finish(tx, outcome).await?;

        tracing::info!(booking_id = %id, "Booking cancelled");
        self.dispatcher.spawn(BookingEvent::Cancelled(booking.clone()));

        Ok(booking)
    }

    pub async fn approve_booking(&self, id: Uuid) -> Result<Booking> {
        let mut tx = self.begin().await?;
        let outcome = self.decide_in(&mut *tx, id, BookingStatus::Approved).await;
        let booking = Self::finish(tx, outcome).await?;

        tracing::info!(booking_id = %id, "Booking approved");
        self.spawn_approval(booking.clone());

        Ok(booking)
    }

    /// A blank or missing reason becomes "No reason provided".
    pub async fn reject_booking(&self, id: Uuid, reason: Option<&str>) -> Result<Booking> {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REJECTION_REASON)
            .to_string();

        let mut tx = self.begin().await?;
        let outcome = self.decide_in(&mut *tx, id, BookingStatus::Rejected).await;
        let booking = Self::finish(tx, outcome).await?;

        tracing::info!(booking_id = %id, reason = %reason, "Booking rejected");
        self.dispatcher.spawn(BookingEvent::Rejected {
            booking: booking.clone(),
            reason,
        });

        Ok(booking)
    }

    /// Replaces the receipt and puts the booking back in front of the admin
    /// as PENDING_VERIFICATION.
    pub async fn reupload_receipt(&self, id: Uuid, receipt_base64: &str) -> Result<Booking> {
        let receipt = self.decode_receipt(receipt_base64)?;

        let mut tx = self.begin().await?;
        let outcome = self.reupload_in(&mut *tx, id, &receipt).await;
        let booking = Self::finish(tx, outcome).await?;

        tracing::info!(booking_id = %id, receipt_bytes = receipt.len(), "Receipt re-uploaded");
        self.dispatcher.spawn(BookingEvent::ReceiptReuploaded(booking.clone()));

        Ok(booking)
    }

    /// Blank notes clear the field. Approved bookings are read-only.
    pub async fn update_notes(&self, id: Uuid, notes: Option<&str>) -> Result<Booking> {
        let notes = notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        if let Some(text) = &notes {
            let len = text.chars().count();
            if len > self.config.max_notes_len {
                return Err(AppError::Validation(format!(
                    "notes too long: {} characters, limit is {}",
                    len, self.config.max_notes_len
                )));
            }
        }

        let mut tx = self.begin().await?;
        let outcome = self.notes_in(&mut *tx, id, notes).await;
        let booking = Self::finish(tx, outcome).await?;

        tracing::debug!(booking_id = %id, "Booking notes updated");
        Ok(booking)
    }

    pub async fn get_booking(&self, id: Uuid) -> Result<Booking> {
        self.booking_repo.find_by_id(id).await?
            .ok_or_else(|| AppError::not_found("Booking", id))
    }

    pub async fn get_receipt(&self, id: Uuid) -> Result<Vec<u8>> {
        self.booking_repo.get_receipt(id).await?
            .ok_or_else(|| AppError::not_found("Booking", id))
    }

    /// Participants in the order they were submitted.
    pub async fn participants_for_booking(&self, id: Uuid) -> Result<Vec<Participant>> {
        let booking = self.get_booking(id).await?;
        self.participant_repo.find_by_ids(&booking.participant_ids).await
    }

    /// Bookings awaiting an admin decision, newest first.
    pub async fn list_pending(&self) -> Result<Vec<Booking>> {
        self.booking_repo
            .list_by_status(&[BookingStatus::Verifying, BookingStatus::PendingVerification])
            .await
    }

    pub async fn list_bookings(&self, limit: i64, offset: i64) -> Result<Vec<Booking>> {
        self.booking_repo.list(limit, offset).await
    }

    pub async fn list_by_email(&self, email: &str) -> Result<Vec<Booking>> {
        self.booking_repo.list_by_email(email).await
    }

    pub async fn list_by_seat_category(&self, seat_category_id: Uuid) -> Result<Vec<Booking>> {
        self.booking_repo.list_by_seat_category(seat_category_id).await
    }

    pub async fn list_by_status(&self, statuses: &[BookingStatus]) -> Result<Vec<Booking>> {
        self.booking_repo.list_by_status(statuses).await
    }

    /// Every booking for a concert, newest first.
    pub async fn list_by_concert(&self, concert_id: Uuid) -> Result<Vec<Booking>> {
        self.booking_repo.list_by_concert(concert_id, &[]).await
    }

    /// A concert's bookings awaiting an admin decision, newest first.
    pub async fn list_pending_for_concert(&self, concert_id: Uuid) -> Result<Vec<Booking>> {
        self.booking_repo
            .list_by_concert(
                concert_id,
                &[BookingStatus::Verifying, BookingStatus::PendingVerification],
            )
            .await
    }

    /// Whether any booking in any status references the concert.
    pub async fn has_bookings_for_concert(&self, concert_id: Uuid) -> Result<bool> {
        self.booking_repo.has_bookings_for_concert(concert_id).await
    }

    async fn create_in(
        &self,
        conn: &mut SqliteConnection,
        request: &CreateBookingRequest,
        receipt: Vec<u8>,
    ) -> Result<Booking> {
        let seat = self.reserve_seats(conn, request.seat_category_id, request.quantity).await?;

        if self.payment_repo.find_by_id_in(conn, request.payment_record_id).await?.is_none() {
            return Err(AppError::not_found("Payment record", request.payment_record_id));
        }

        let participants = self.participant_repo
            .insert_many(conn, &request.participants)
            .await?;

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            concert_id: request.concert_id,
            booking_email: request.booking_email.trim().to_string(),
            status: BookingStatus::Verifying,
            payment_record_id: request.payment_record_id,
            receipt_image: receipt,
            seat_category_id: seat.id,
            seat_type: seat.seat_type,
            quantity: request.quantity,
            total_amount_cents: request.total_amount_cents,
            seats_held: true,
            participant_ids: participants.iter().map(|p| p.id).collect(),
            notes: None,
            created_at: now,
            updated_at: now,
        };

        self.booking_repo.insert(conn, &booking).await?;
        Ok(booking)
    }

    async fn cancel_in(&self, conn: &mut SqliteConnection, id: Uuid) -> Result<Booking> {
        let booking = self.booking_repo.lock_for_update(conn, id).await?;

        if booking.status == BookingStatus::Cancelled {
            return Err(AppError::Conflict(format!("Booking {} is already cancelled", id)));
        }

        if booking.seats_held {
            self.release_seats(conn, &booking).await?;
        }

        self.booking_repo
            .update_status(conn, id, BookingStatus::Cancelled, false)
            .await
    }

    async fn decide_in(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        decision: BookingStatus,
    ) -> Result<Booking> {
        let booking = self.booking_repo.lock_for_update(conn, id).await?;

        if !booking.status.is_awaiting_decision() {
            return Err(AppError::Conflict(format!(
                "Booking {} is {} and cannot be {}",
                id,
                booking.status,
                decision.as_str().to_lowercase()
            )));
        }

        let mut seats_held = booking.seats_held;
        if decision == BookingStatus::Rejected && self.config.refund_on_reject && seats_held {
            self.release_seats(conn, &booking).await?;
            seats_held = false;
        }

        self.booking_repo.update_status(conn, id, decision, seats_held).await
    }

    async fn reupload_in(&self, conn: &mut SqliteConnection, id: Uuid, receipt: &[u8]) -> Result<Booking> {
        let booking = self.booking_repo.lock_for_update(conn, id).await?;

        if booking.status.is_final() {
            return Err(AppError::Conflict(format!(
                "Booking {} is {}; its receipt can no longer change",
                id, booking.status
            )));
        }

        // Seats went back to the category on rejection; take them again.
        if !booking.seats_held {
            self.reserve_seats(conn, booking.seat_category_id, booking.quantity).await?;
        }

        self.booking_repo
            .update_receipt(conn, id, receipt, BookingStatus::PendingVerification, true)
            .await
    }

    async fn notes_in(&self, conn: &mut SqliteConnection, id: Uuid, notes: Option<String>) -> Result<Booking> {
        let booking = self.booking_repo.lock_for_update(conn, id).await?;

        if booking.status == BookingStatus::Approved {
            return Err(AppError::Conflict(format!("Booking {} is approved; notes are locked", id)));
        }

        self.booking_repo.update_notes(conn, id, notes).await
    }

    /// Lock, check, decrement. Returns the category as it was when locked.
    async fn reserve_seats(
        &self,
        conn: &mut SqliteConnection,
        seat_category_id: Uuid,
        quantity: i64,
    ) -> Result<SeatCategory> {
        let seat = self.seat_repo.lock_for_update(conn, seat_category_id).await?;

        let remaining = seat.available - quantity;
        if remaining < 0 {
            tracing::debug!(
                seat_category_id = %seat_category_id,
                requested = quantity,
                available = seat.available,
                "Not enough seats"
            );
            return Err(AppError::InsufficientInventory {
                requested: quantity,
                available: seat.available,
            });
        }

        self.seat_repo.set_available(conn, seat.id, remaining).await?;
        Ok(seat)
    }

    async fn release_seats(&self, conn: &mut SqliteConnection, booking: &Booking) -> Result<SeatCategory> {
        let seat = self.seat_repo.lock_for_update(conn, booking.seat_category_id).await?;
        self.seat_repo
            .set_available(conn, seat.id, seat.available + booking.quantity)
            .await
    }

    fn decode_receipt(&self, encoded: &str) -> Result<Vec<u8>> {
        let encoded = encoded.trim();
        // Accept data URLs as produced by browser file readers.
        let encoded = match encoded.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => encoded,
        };

        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| AppError::Validation(format!("invalid base64 receipt image: {}", e)))?;

        if bytes.is_empty() {
            return Err(AppError::Validation("receipt image is empty".to_string()));
        }
        if bytes.len() > self.config.max_receipt_bytes {
            return Err(AppError::Validation(format!(
                "receipt image is {} bytes, limit is {}",
                bytes.len(),
                self.config.max_receipt_bytes
            )));
        }

        Ok(bytes)
    }

    fn spawn_approval(&self, booking: Booking) {
        let renderer = Arc::clone(&self.ticket_renderer);

        self.dispatcher.spawn_with(move || {
            let ticket = match renderer.render(&booking) {
                Ok(ticket) => Some(ticket),
                Err(e) => {
                    tracing::error!(booking_id = %booking.id, "Ticket rendering failed: {:?}", e);
                    None
                }
            };
            BookingEvent::Approved { booking, ticket }
        });
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::Transaction(e.to_string()))
    }

    /// Commits on success. On failure rolls back and returns the error with
    /// storage failures re-tagged as transactional.
    async fn finish<T>(tx: Transaction<'static, Sqlite>, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| AppError::Transaction(e.to_string()))?;
                Ok(value)
            }
            Err(err) => {
                tracing::warn!("Rolling back: {}", err);
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!("Rollback failed: {}", rollback_err);
                }
                Err(err.into_transactional())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // decode_receipt only reads config, so the engine is built over a lazy
    // pool that never connects.
    fn engine_with_limit(max_receipt_bytes: usize) -> ReservationEngine {
        use crate::notifications::PlainTextTicketRenderer;
        use crate::repository::*;

        let pool = SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        ReservationEngine::new(
            pool.clone(),
            Arc::new(SqliteSeatCategoryRepository::new(pool.clone())),
            Arc::new(SqliteParticipantRepository::new(pool.clone())),
            Arc::new(SqlitePaymentRecordRepository::new(pool.clone())),
            Arc::new(SqliteBookingRepository::new(pool)),
            Arc::new(NotificationDispatcher::new()),
            Arc::new(PlainTextTicketRenderer::default()),
            BookingConfig {
                max_receipt_bytes,
                ..BookingConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_decode_receipt_accepts_plain_and_data_url() {
        let engine = engine_with_limit(1024);
        assert_eq!(engine.decode_receipt("cmVjZWlwdA==").unwrap(), b"receipt");
        assert_eq!(
            engine.decode_receipt("data:image/png;base64,cmVjZWlwdA==").unwrap(),
            b"receipt"
        );
    }

    #[tokio::test]
    async fn test_decode_receipt_rejects_garbage_and_oversize() {
        let engine = engine_with_limit(4);
        assert!(matches!(engine.decode_receipt("not base64!!"), Err(AppError::Validation(_))));
        assert!(matches!(engine.decode_receipt(""), Err(AppError::Validation(_))));
        assert!(matches!(engine.decode_receipt("cmVjZWlwdA=="), Err(AppError::Validation(_))));
    }
}
