pub mod reservation_service;

use std::sync::Arc;
use sqlx::SqlitePool;
use crate::config::{BookingConfig, Settings};
use crate::error::Result;
use crate::notifications::{
    LogNotifier, NotificationDispatcher, PlainTextTicketRenderer, TicketRenderer, WebhookNotifier,
};
use crate::repository::*;

pub use reservation_service::ReservationEngine;

pub struct ServiceContext {
    pub seat_repo: Arc<dyn SeatCategoryRepository>,
    pub participant_repo: Arc<dyn ParticipantRepository>,
    pub payment_repo: Arc<dyn PaymentRecordRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub reservations: Arc<ReservationEngine>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        db_pool: SqlitePool,
        dispatcher: Arc<NotificationDispatcher>,
        ticket_renderer: Arc<dyn TicketRenderer>,
        booking_config: BookingConfig,
    ) -> Self {
        let seat_repo: Arc<dyn SeatCategoryRepository> =
            Arc::new(SqliteSeatCategoryRepository::new(db_pool.clone()));
        let participant_repo: Arc<dyn ParticipantRepository> =
            Arc::new(SqliteParticipantRepository::new(db_pool.clone()));
        let payment_repo: Arc<dyn PaymentRecordRepository> =
            Arc::new(SqlitePaymentRecordRepository::new(db_pool.clone()));
        let booking_repo: Arc<dyn BookingRepository> =
            Arc::new(SqliteBookingRepository::new(db_pool.clone()));

        let reservations = Arc::new(ReservationEngine::new(
            db_pool.clone(),
            seat_repo.clone(),
            participant_repo.clone(),
            payment_repo.clone(),
            booking_repo.clone(),
            dispatcher.clone(),
            ticket_renderer,
            booking_config,
        ));

        Self {
            seat_repo,
            participant_repo,
            payment_repo,
            booking_repo,
            dispatcher,
            reservations,
            db_pool,
        }
    }

    /// Wires the notifiers named in `settings`: the log notifier always, the
    /// webhook when it is configured and enabled.
    pub async fn from_settings(db_pool: SqlitePool, settings: &Settings) -> Result<Self> {
        let notifications = &settings.notifications;
        let dispatcher = Arc::new(NotificationDispatcher::new());

        dispatcher
            .register(Arc::new(LogNotifier::new(notifications.admin_email.clone())))
            .await;

        if let Some(webhook) = WebhookNotifier::new(
            notifications.webhook.clone(),
            notifications.admin_email.clone(),
        )? {
            dispatcher.register(Arc::new(webhook)).await;
        }

        Ok(Self::new(
            db_pool,
            dispatcher,
            Arc::new(PlainTextTicketRenderer::default()),
            settings.booking.clone(),
        ))
    }
}
