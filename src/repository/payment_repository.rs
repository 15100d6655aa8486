use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::{CreatePaymentRecordRequest, PaymentRecord, UpdatePaymentRecordRequest},
    error::{AppError, Result},
    repository::PaymentRecordRepository,
};

#[derive(FromRow)]
struct PaymentRecordRow {
    id: String,
    payment_type: String,
    details: String,
    notes: Option<String>,
    created_at: NaiveDateTime,
}

pub struct SqlitePaymentRecordRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRecordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: PaymentRecordRow) -> Result<PaymentRecord> {
        Ok(PaymentRecord {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            payment_type: row.payment_type,
            details: row.details,
            notes: row.notes,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl PaymentRecordRepository for SqlitePaymentRecordRepository {
    async fn create(&self, request: CreatePaymentRecordRequest) -> Result<PaymentRecord> {
        request.validate()?;
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO payment_records (id, payment_type, details, notes, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(&request.payment_type)
        .bind(&request.details)
        .bind(&request.notes)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created payment record".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query_as::<_, PaymentRecordRow>(
            r#"
            SELECT id, payment_type, details, notes, created_at
            FROM payment_records
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn find_by_id_in(&self, conn: &mut SqliteConnection, id: Uuid) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query_as::<_, PaymentRecordRow>(
            r#"
            SELECT id, payment_type, details, notes, created_at
            FROM payment_records
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn list(&self) -> Result<Vec<PaymentRecord>> {
        let rows = sqlx::query_as::<_, PaymentRecordRow>(
            r#"
            SELECT id, payment_type, details, notes, created_at
            FROM payment_records
            ORDER BY created_at DESC
            "#
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Self::row_to_record)
            .collect()
    }

    async fn update(&self, id: Uuid, update: UpdatePaymentRecordRequest) -> Result<PaymentRecord> {
        update.validate()?;
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE payment_records SET ");
        let mut fields = builder.separated(", ");
        let mut any = false;
        if let Some(payment_type) = update.payment_type {
            fields.push("payment_type = ").push_bind_unseparated(payment_type);
            any = true;
        }
        if let Some(details) = update.details {
            fields.push("details = ").push_bind_unseparated(details);
            any = true;
        }
        if let Some(notes) = update.notes {
            fields.push("notes = ").push_bind_unseparated(notes);
            any = true;
        }

        if any {
            builder.push(" WHERE id = ").push_bind(id.to_string());
            let result = builder.build().execute(&self.pool).await?;
            if result.rows_affected() == 0 {
                return Err(AppError::not_found("Payment record", id));
            }
        }

        self.find_by_id(id).await?
            .ok_or_else(|| AppError::not_found("Payment record", id))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM payment_records WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
