use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{NewParticipant, Participant},
    error::{AppError, Result},
    repository::ParticipantRepository,
};

#[derive(FromRow)]
struct ParticipantRow {
    id: String,
    name: String,
    contact_number: String,
    email: Option<String>,
    attended: i32,
    created_at: NaiveDateTime,
}

pub struct SqliteParticipantRepository {
    pool: SqlitePool,
}

impl SqliteParticipantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_participant(row: ParticipantRow) -> Result<Participant> {
        Ok(Participant {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            name: row.name,
            contact_number: row.contact_number,
            email: row.email,
            attended: row.attended != 0,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl ParticipantRepository for SqliteParticipantRepository {
    async fn insert_many(&self, conn: &mut SqliteConnection, participants: &[NewParticipant]) -> Result<Vec<Participant>> {
        let now = Utc::now();
        let mut created = Vec::with_capacity(participants.len());

        for entry in participants {
            let participant = Participant {
                id: Uuid::new_v4(),
                name: entry.name.trim().to_string(),
                contact_number: entry.contact_number.trim().to_string(),
                email: entry.email.as_ref()
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty()),
                attended: false,
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO participants (id, name, contact_number, email, attended, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#
            )
            .bind(participant.id.to_string())
            .bind(&participant.name)
            .bind(&participant.contact_number)
            .bind(&participant.email)
            .bind(0i32)
            .bind(now.naive_utc())
            .execute(&mut *conn)
            .await?;

            created.push(participant);
        }

        tracing::debug!("Inserted {} participants", created.len());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Participant>> {
        let row = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT id, name, contact_number, email, attended, created_at
            FROM participants
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_participant).transpose()
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Participant>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, name, contact_number, email, attended, created_at FROM participants WHERE id IN ("
        );
        let mut in_list = builder.separated(", ");
        for id in ids {
            in_list.push_bind(id.to_string());
        }
        in_list.push_unseparated(")");

        let rows = builder.build_query_as::<ParticipantRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut by_id: HashMap<Uuid, Participant> = rows.into_iter()
            .map(Self::row_to_participant)
            .map(|p| p.map(|p| (p.id, p)))
            .collect::<Result<_>>()?;

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Participant>> {
        let rows = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT id, name, contact_number, email, attended, created_at
            FROM participants
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Self::row_to_participant)
            .collect()
    }

    async fn set_attended(&self, id: Uuid, attended: bool) -> Result<Participant> {
        let result = sqlx::query("UPDATE participants SET attended = ? WHERE id = ?")
            .bind(if attended { 1i32 } else { 0i32 })
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Participant", id));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated participant".to_string())
        })
    }
}
