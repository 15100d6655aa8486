use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use crate::domain::Booking;
use crate::error::Result;

pub mod log;
pub mod ticket;
pub mod webhook;

pub use log::LogNotifier;
pub use ticket::{PlainTextTicketRenderer, TicketRenderer};
pub use webhook::WebhookNotifier;

/// Something that happened to a booking after its transaction committed.
#[derive(Debug, Clone)]
pub enum BookingEvent {
    /// New booking awaiting verification; goes to the admin.
    Created(Booking),
    /// Fresh receipt on an existing booking; goes to the admin.
    ReceiptReuploaded(Booking),
    /// Goes to the requester. `ticket` is absent when rendering failed.
    Approved { booking: Booking, ticket: Option<Vec<u8>> },
    Rejected { booking: Booking, reason: String },
    Cancelled(Booking),
}

impl BookingEvent {
    pub fn booking(&self) -> &Booking {
        match self {
            BookingEvent::Created(booking)
            | BookingEvent::ReceiptReuploaded(booking)
            | BookingEvent::Cancelled(booking) => booking,
            BookingEvent::Approved { booking, .. }
            | BookingEvent::Rejected { booking, .. } => booking,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BookingEvent::Created(_) => "booking.created",
            BookingEvent::ReceiptReuploaded(_) => "booking.receipt_reuploaded",
            BookingEvent::Approved { .. } => "booking.approved",
            BookingEvent::Rejected { .. } => "booking.rejected",
            BookingEvent::Cancelled(_) => "booking.cancelled",
        }
    }

    /// Admin-facing events as opposed to decisions sent to the requester.
    pub fn is_for_admin(&self) -> bool {
        matches!(self, BookingEvent::Created(_) | BookingEvent::ReceiptReuploaded(_))
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    fn is_enabled(&self) -> bool;
    async fn health_check(&self) -> Result<()>;
    async fn handle_event(&self, event: &BookingEvent) -> Result<()>;
}

/// Fans booking events out to every registered notifier. A failing notifier
/// is logged and skipped; it never affects the others or the caller.
///
/// Background dispatches are tracked so a short-lived process can drain them
/// with [`NotificationDispatcher::wait_idle`] before exiting.
pub struct NotificationDispatcher {
    notifiers: RwLock<Vec<Arc<dyn Notifier>>>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self {
            notifiers: RwLock::new(Vec::new()),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    pub async fn register(&self, notifier: Arc<dyn Notifier>) {
        if notifier.is_enabled() {
            tracing::info!("Registered notifier: {}", notifier.name());
            self.notifiers.write().await.push(notifier);
        }
    }

    pub async fn notifier_count(&self) -> usize {
        self.notifiers.read().await.len()
    }

    pub async fn handle_event(&self, event: BookingEvent) {
        let notifiers = self.notifiers.read().await;

        for notifier in notifiers.iter() {
            if !notifier.is_enabled() {
                continue;
            }

            match notifier.handle_event(&event).await {
                Ok(_) => {
                    tracing::debug!(
                        "Notifier {} handled {} for booking {}",
                        notifier.name(),
                        event.kind(),
                        event.booking().id
                    );
                }
                Err(e) => {
                    tracing::error!(
                        "Notifier {} failed to handle {} for booking {}: {:?}",
                        notifier.name(),
                        event.kind(),
                        event.booking().id,
                        e
                    );
                }
            }
        }
    }

    /// Dispatches on a background task. Callers only do this after commit.
    pub fn spawn(self: &Arc<Self>, event: BookingEvent) {
        self.spawn_with(move || event);
    }

    /// Like `spawn`, but builds the event on the background task. Used when
    /// building it is slow, e.g. rendering a ticket.
    pub fn spawn_with<F>(self: &Arc<Self>, build: F)
    where
        F: FnOnce() -> BookingEvent + Send + 'static,
    {
        let dispatcher = Arc::clone(self);
        let handle = tokio::spawn(async move {
            dispatcher.handle_event(build()).await;
        });

        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
    }

    /// Waits for every dispatch spawned so far, including ones spawned while
    /// waiting.
    pub async fn wait_idle(&self) {
        loop {
            let pending = {
                let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
                std::mem::take(&mut *in_flight)
            };
            if pending.is_empty() {
                return;
            }

            for handle in pending {
                if let Err(e) = handle.await {
                    tracing::error!("Notification task failed: {}", e);
                }
            }
        }
    }

    pub async fn health_check_all(&self) -> Vec<(String, Result<()>)> {
        let notifiers = self.notifiers.read().await;
        let mut results = Vec::new();

        for notifier in notifiers.iter() {
            let name = notifier.name().to_string();
            let result = notifier.health_check().await;
            results.push((name, result));
        }

        results
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
