use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Booking, BookingStatus},
    error::{AppError, Result},
    repository::BookingRepository,
};

// The receipt is selected with every row: it is part of the booking and the
// engine hands it to notifiers. Serialization skips it.
#[derive(FromRow)]
struct BookingRow {
    id: String,
    concert_id: String,
    booking_email: String,
    status: String,
    payment_record_id: String,
    receipt_image: Vec<u8>,
    seat_category_id: String,
    seat_type: String,
    quantity: i64,
    total_amount_cents: i64,
    seats_held: bool,
    participant_ids: String,
    notes: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, concert_id, booking_email, status, payment_record_id, receipt_image,
           seat_category_id, seat_type, quantity, total_amount_cents,
           seats_held, participant_ids, notes, created_at, updated_at
    FROM bookings
"#;

pub struct SqliteBookingRepository {
    pool: SqlitePool,
}

impl SqliteBookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_status(status: &str) -> Result<BookingStatus> {
        match status {
            "VERIFYING" => Ok(BookingStatus::Verifying),
            "PENDING_VERIFICATION" => Ok(BookingStatus::PendingVerification),
            "APPROVED" => Ok(BookingStatus::Approved),
            "REJECTED" => Ok(BookingStatus::Rejected),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            _ => Err(AppError::Database(format!("Invalid booking status: {}", status))),
        }
    }

    fn parse_uuid(value: &str) -> Result<Uuid> {
        Uuid::parse_str(value).map_err(|e| AppError::Database(e.to_string()))
    }

    fn row_to_booking(row: BookingRow) -> Result<Booking> {
        let participant_ids: Vec<Uuid> = serde_json::from_str(&row.participant_ids)
            .map_err(|e| AppError::Database(format!("Corrupt participant list: {}", e)))?;

        Ok(Booking {
            id: Self::parse_uuid(&row.id)?,
            concert_id: Self::parse_uuid(&row.concert_id)?,
            booking_email: row.booking_email,
            status: Self::parse_status(&row.status)?,
            payment_record_id: Self::parse_uuid(&row.payment_record_id)?,
            receipt_image: row.receipt_image,
            seat_category_id: Self::parse_uuid(&row.seat_category_id)?,
            seat_type: row.seat_type,
            quantity: row.quantity,
            total_amount_cents: row.total_amount_cents,
            seats_held: row.seats_held,
            participant_ids,
            notes: row.notes,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    async fn fetch_in(conn: &mut SqliteConnection, id: Uuid) -> Result<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;

        row.map(Self::row_to_booking)
            .transpose()?
            .ok_or_else(|| AppError::not_found("Booking", id))
    }

    fn ensure_touched(rows_affected: u64, id: Uuid) -> Result<()> {
        if rows_affected == 0 {
            return Err(AppError::not_found("Booking", id));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn insert(&self, conn: &mut SqliteConnection, booking: &Booking) -> Result<()> {
        let participant_ids = serde_json::to_string(&booking.participant_ids)
            .map_err(|e| AppError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, concert_id, booking_email, status, payment_record_id, receipt_image,
                seat_category_id, seat_type, quantity, total_amount_cents,
                seats_held, participant_ids, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(booking.id.to_string())
        .bind(booking.concert_id.to_string())
        .bind(&booking.booking_email)
        .bind(booking.status.as_str())
        .bind(booking.payment_record_id.to_string())
        .bind(&booking.receipt_image)
        .bind(booking.seat_category_id.to_string())
        .bind(&booking.seat_type)
        .bind(booking.quantity)
        .bind(booking.total_amount_cents)
        .bind(booking.seats_held)
        .bind(participant_ids)
        .bind(&booking.notes)
        .bind(booking.created_at.naive_utc())
        .bind(booking.updated_at.naive_utc())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn lock_for_update(&self, conn: &mut SqliteConnection, id: Uuid) -> Result<Booking> {
        // Same write-lock trick as the seat category: must run before any
        // read in the transaction.
        let touched = sqlx::query("UPDATE bookings SET status = status WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
        Self::ensure_touched(touched.rows_affected(), id)?;

        Self::fetch_in(conn, id).await
    }

    async fn update_status(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        status: BookingStatus,
        seats_held: bool,
    ) -> Result<Booking> {
        let result = sqlx::query(
            "UPDATE bookings SET status = ?, seats_held = ?, updated_at = ? WHERE id = ?"
        )
        .bind(status.as_str())
        .bind(seats_held)
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
        Self::ensure_touched(result.rows_affected(), id)?;

        Self::fetch_in(conn, id).await
    }

    async fn update_receipt(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
        receipt_image: &[u8],
        status: BookingStatus,
        seats_held: bool,
    ) -> Result<Booking> {
        let result = sqlx::query(
            "UPDATE bookings SET receipt_image = ?, status = ?, seats_held = ?, updated_at = ? WHERE id = ?"
        )
        .bind(receipt_image)
        .bind(status.as_str())
        .bind(seats_held)
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
        Self::ensure_touched(result.rows_affected(), id)?;

        Self::fetch_in(conn, id).await
    }

    async fn update_notes(&self, conn: &mut SqliteConnection, id: Uuid, notes: Option<String>) -> Result<Booking> {
        let result = sqlx::query("UPDATE bookings SET notes = ?, updated_at = ? WHERE id = ?")
            .bind(notes)
            .bind(Utc::now().naive_utc())
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
        Self::ensure_touched(result.rows_affected(), id)?;

        Self::fetch_in(conn, id).await
    }

    async fn get_receipt(&self, id: Uuid) -> Result<Option<Vec<u8>>> {
        let receipt: Option<(Vec<u8>,)> = sqlx::query_as(
            "SELECT receipt_image FROM bookings WHERE id = ?"
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(receipt.map(|(bytes,)| bytes))
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            &format!("{} ORDER BY created_at DESC LIMIT ? OFFSET ?", SELECT_COLUMNS)
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Self::row_to_booking)
            .collect()
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            &format!("{} WHERE booking_email = ? ORDER BY created_at DESC", SELECT_COLUMNS)
        )
        .bind(email.trim())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Self::row_to_booking)
            .collect()
    }

    async fn list_by_seat_category(&self, seat_category_id: Uuid) -> Result<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            &format!("{} WHERE seat_category_id = ? ORDER BY created_at DESC", SELECT_COLUMNS)
        )
        .bind(seat_category_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Self::row_to_booking)
            .collect()
    }

    async fn list_by_status(&self, statuses: &[BookingStatus]) -> Result<Vec<Booking>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        builder.push(" WHERE status IN (");
        let mut in_list = builder.separated(", ");
        for status in statuses {
            in_list.push_bind(status.as_str());
        }
        in_list.push_unseparated(")");
        builder.push(" ORDER BY created_at DESC");

        let rows = builder.build_query_as::<BookingRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(Self::row_to_booking)
            .collect()
    }

    async fn list_by_concert(&self, concert_id: Uuid, statuses: &[BookingStatus]) -> Result<Vec<Booking>> {
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        builder.push(" WHERE concert_id = ");
        builder.push_bind(concert_id.to_string());
        if !statuses.is_empty() {
            builder.push(" AND status IN (");
            let mut in_list = builder.separated(", ");
            for status in statuses {
                in_list.push_bind(status.as_str());
            }
            in_list.push_unseparated(")");
        }
        builder.push(" ORDER BY created_at DESC");

        let rows = builder.build_query_as::<BookingRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(Self::row_to_booking)
            .collect()
    }

    async fn has_bookings_for_concert(&self, concert_id: Uuid) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM bookings WHERE concert_id = ?)"
        )
        .bind(concert_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_accepts_every_stored_name() {
        for status in [
            BookingStatus::Verifying,
            BookingStatus::PendingVerification,
            BookingStatus::Approved,
            BookingStatus::Rejected,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(SqliteBookingRepository::parse_status(status.as_str()).unwrap(), status);
        }
        assert!(SqliteBookingRepository::parse_status("pending").is_err());
    }
}
