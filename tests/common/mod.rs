#![allow(dead_code)]

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use boxoffice::{
    config::{BookingConfig, DatabaseConfig},
    db,
    domain::*,
    error::Result as AppResult,
    notifications::{BookingEvent, NotificationDispatcher, Notifier, PlainTextTicketRenderer},
    repository::*,
    service::ReservationEngine,
};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Concert every `booking_request` is filed under.
pub const CONCERT_ID: Uuid = Uuid::from_u128(0x5eed_c0ce_0000_4000_8000_0000_0000_0001);

/// File-backed database in a temp dir. In-memory SQLite cannot exercise
/// lock waits across pooled connections.
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn setup() -> anyhow::Result<TestDb> {
    let dir = tempfile::tempdir()?;
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("boxoffice-test.db").display()),
        max_connections: 16,
        busy_timeout_secs: 30,
    };
    let pool = db::init(&config).await?;

    Ok(TestDb { pool, _dir: dir })
}

pub async fn seat_category(pool: &SqlitePool, seat_type: &str, available: i64) -> anyhow::Result<SeatCategory> {
    let category = SqliteSeatCategoryRepository::new(pool.clone())
        .create(CreateSeatCategoryRequest {
            seat_type: seat_type.to_string(),
            price_gel_cents: 5_000,
            price_inr_cents: 150_000,
            available,
            notes: None,
        })
        .await?;
    Ok(category)
}

pub async fn payment_record(pool: &SqlitePool) -> anyhow::Result<PaymentRecord> {
    let record = SqlitePaymentRecordRepository::new(pool.clone())
        .create(CreatePaymentRecordRequest {
            payment_type: "BANK_TRANSFER".to_string(),
            details: "TBC ref 0042".to_string(),
            notes: None,
        })
        .await?;
    Ok(record)
}

pub async fn available(pool: &SqlitePool, seat_category_id: uuid::Uuid) -> anyhow::Result<i64> {
    let category = SqliteSeatCategoryRepository::new(pool.clone())
        .find_by_id(seat_category_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("seat category vanished"))?;
    Ok(category.available)
}

pub fn receipt(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn booking_request(seat: &SeatCategory, payment: &PaymentRecord, quantity: i64) -> CreateBookingRequest {
    CreateBookingRequest {
        concert_id: CONCERT_ID,
        booking_email: "buyer@example.com".to_string(),
        payment_record_id: payment.id,
        receipt_image: receipt(b"receipt-v1"),
        seat_category_id: seat.id,
        quantity,
        total_amount_cents: seat.price_gel_cents * quantity,
        participants: (0..quantity)
            .map(|i| NewParticipant {
                name: format!("Guest {}", i + 1),
                contact_number: format!("+99555500{:04}", i),
                email: None,
            })
            .collect(),
    }
}

pub fn engine(pool: &SqlitePool, config: BookingConfig, dispatcher: Arc<NotificationDispatcher>) -> ReservationEngine {
    engine_with_bookings(
        pool,
        Arc::new(SqliteBookingRepository::new(pool.clone())),
        config,
        dispatcher,
    )
}

pub fn engine_with_bookings(
    pool: &SqlitePool,
    booking_repo: Arc<dyn BookingRepository>,
    config: BookingConfig,
    dispatcher: Arc<NotificationDispatcher>,
) -> ReservationEngine {
    ReservationEngine::new(
        pool.clone(),
        Arc::new(SqliteSeatCategoryRepository::new(pool.clone())),
        Arc::new(SqliteParticipantRepository::new(pool.clone())),
        Arc::new(SqlitePaymentRecordRepository::new(pool.clone())),
        booking_repo,
        dispatcher,
        Arc::new(PlainTextTicketRenderer::default()),
        config,
    )
}

/// Forwards every event it sees to a channel.
pub struct RecordingNotifier {
    tx: mpsc::UnboundedSender<BookingEvent>,
}

impl RecordingNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BookingEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "Recording"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }

    async fn handle_event(&self, event: &BookingEvent) -> AppResult<()> {
        let _ = self.tx.send(event.clone());
        Ok(())
    }
}

pub async fn recording_dispatcher() -> (Arc<NotificationDispatcher>, mpsc::UnboundedReceiver<BookingEvent>) {
    let dispatcher = Arc::new(NotificationDispatcher::new());
    let (notifier, rx) = RecordingNotifier::new();
    dispatcher.register(Arc::new(notifier)).await;
    (dispatcher, rx)
}

/// Waits for the first event matching `pred`, skipping others.
pub async fn wait_for_event(
    rx: &mut mpsc::UnboundedReceiver<BookingEvent>,
    pred: impl Fn(&BookingEvent) -> bool,
) -> anyhow::Result<BookingEvent> {
    let deadline = std::time::Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        while let Some(event) = rx.recv().await {
            if pred(&event) {
                return Ok(event);
            }
        }
        Err(anyhow::anyhow!("notification channel closed"))
    })
    .await
    .map_err(|_| anyhow::anyhow!("timed out waiting for notification"))?
}
