use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::{CreateSeatCategoryRequest, SeatCategory, UpdateSeatCategoryRequest},
    error::{AppError, Result},
    repository::SeatCategoryRepository,
};

#[derive(FromRow)]
struct SeatCategoryRow {
    id: String,
    seat_type: String,
    price_gel_cents: i64,
    price_inr_cents: i64,
    available: i64,
    notes: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, seat_type, price_gel_cents, price_inr_cents, available, notes,
           created_at, updated_at
    FROM seat_categories
"#;

pub struct SqliteSeatCategoryRepository {
    pool: SqlitePool,
}

impl SqliteSeatCategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_category(row: SeatCategoryRow) -> Result<SeatCategory> {
        Ok(SeatCategory {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            seat_type: row.seat_type,
            price_gel_cents: row.price_gel_cents,
            price_inr_cents: row.price_inr_cents,
            available: row.available,
            notes: row.notes,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    async fn fetch_in(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<SeatCategory>> {
        let row = sqlx::query_as::<_, SeatCategoryRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;

        row.map(Self::row_to_category).transpose()
    }
}

#[async_trait]
impl SeatCategoryRepository for SqliteSeatCategoryRepository {
    async fn create(&self, request: CreateSeatCategoryRequest) -> Result<SeatCategory> {
        request.validate()?;
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO seat_categories (
                id, seat_type, price_gel_cents, price_inr_cents, available, notes,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(&request.seat_type)
        .bind(request.price_gel_cents)
        .bind(request.price_inr_cents)
        .bind(request.available)
        .bind(&request.notes)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created seat category".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SeatCategory>> {
        let row = sqlx::query_as::<_, SeatCategoryRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_category).transpose()
    }

    async fn list(&self) -> Result<Vec<SeatCategory>> {
        let rows = sqlx::query_as::<_, SeatCategoryRow>(&format!("{} ORDER BY seat_type ASC", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(Self::row_to_category)
            .collect()
    }

    async fn update(&self, id: Uuid, update: UpdateSeatCategoryRequest) -> Result<SeatCategory> {
        update.validate()?;
        if update.is_empty() {
            return self.find_by_id(id).await?
                .ok_or_else(|| AppError::not_found("Seat category", id));
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE seat_categories SET ");
        let mut fields = builder.separated(", ");
        if let Some(seat_type) = update.seat_type {
            fields.push("seat_type = ").push_bind_unseparated(seat_type);
        }
        if let Some(price) = update.price_gel_cents {
            fields.push("price_gel_cents = ").push_bind_unseparated(price);
        }
        if let Some(price) = update.price_inr_cents {
            fields.push("price_inr_cents = ").push_bind_unseparated(price);
        }
        if let Some(available) = update.available {
            fields.push("available = ").push_bind_unseparated(available);
        }
        if let Some(notes) = update.notes {
            fields.push("notes = ").push_bind_unseparated(notes);
        }
        fields.push("updated_at = ").push_bind_unseparated(Utc::now().naive_utc());
        builder.push(" WHERE id = ").push_bind(id.to_string());

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Seat category", id));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated seat category".to_string())
        })
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM seat_categories WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn lock_for_update(&self, conn: &mut SqliteConnection, id: Uuid) -> Result<SeatCategory> {
        // SQLite has no SELECT ... FOR UPDATE. A no-op write takes the write
        // lock (waiting out busy_timeout if another transaction holds it) and
        // keeps it until this transaction ends. It has to be the first
        // statement of the transaction: a deferred transaction that has
        // already read cannot wait for the lock, it fails with SQLITE_BUSY.
        let touched = sqlx::query("UPDATE seat_categories SET available = available WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;

        if touched.rows_affected() == 0 {
            return Err(AppError::not_found("Seat category", id));
        }

        Self::fetch_in(conn, id).await?
            .ok_or_else(|| AppError::not_found("Seat category", id))
    }

    async fn set_available(&self, conn: &mut SqliteConnection, id: Uuid, available: i64) -> Result<SeatCategory> {
        if available < 0 {
            return Err(AppError::Validation(format!(
                "available count cannot be negative (got {})",
                available
            )));
        }

        sqlx::query("UPDATE seat_categories SET available = ?, updated_at = ? WHERE id = ?")
            .bind(available)
            .bind(Utc::now().naive_utc())
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;

        Self::fetch_in(conn, id).await?
            .ok_or_else(|| AppError::not_found("Seat category", id))
    }
}
