mod common;

use boxoffice::{
    domain::*,
    error::AppError,
    repository::{
        ParticipantRepository, PaymentRecordRepository, SeatCategoryRepository,
        SqliteParticipantRepository, SqlitePaymentRecordRepository, SqliteSeatCategoryRepository,
    },
};
use uuid::Uuid;

use common::setup;

#[tokio::test]
async fn test_seat_category_crud() -> anyhow::Result<()> {
    let db = setup().await?;
    let repo = SqliteSeatCategoryRepository::new(db.pool.clone());

    let category = repo.create(CreateSeatCategoryRequest {
        seat_type: "Balcony".to_string(),
        price_gel_cents: 4_500,
        price_inr_cents: 135_000,
        available: 40,
        notes: Some("Left wing".to_string()),
    }).await?;
    assert_eq!(category.seat_type, "Balcony");
    assert_eq!(category.available, 40);

    // Only the fields that are present change.
    let updated = repo.update(category.id, UpdateSeatCategoryRequest {
        price_gel_cents: Some(5_000),
        ..Default::default()
    }).await?;
    assert_eq!(updated.price_gel_cents, 5_000);
    assert_eq!(updated.price_inr_cents, 135_000);
    assert_eq!(updated.notes.as_deref(), Some("Left wing"));

    let unchanged = repo.update(category.id, UpdateSeatCategoryRequest::default()).await?;
    assert_eq!(unchanged.price_gel_cents, 5_000);

    let err = repo.update(Uuid::new_v4(), UpdateSeatCategoryRequest {
        available: Some(3),
        ..Default::default()
    }).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert_eq!(repo.list().await?.len(), 1);

    repo.delete(category.id).await?;
    assert!(repo.find_by_id(category.id).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_seat_category_rejects_negative_inventory() -> anyhow::Result<()> {
    let db = setup().await?;
    let repo = SqliteSeatCategoryRepository::new(db.pool.clone());

    let err = repo.create(CreateSeatCategoryRequest {
        seat_type: "Ghost".to_string(),
        price_gel_cents: 0,
        price_inr_cents: 0,
        available: -1,
        notes: None,
    }).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let category = common::seat_category(&db.pool, "General", 2).await?;
    let mut tx = db.pool.begin().await?;
    let locked = repo.lock_for_update(&mut *tx, category.id).await?;
    assert_eq!(locked.available, 2);
    let err = repo.set_available(&mut *tx, category.id, -1).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    tx.rollback().await?;

    Ok(())
}

#[tokio::test]
async fn test_locked_write_is_invisible_until_commit() -> anyhow::Result<()> {
    let db = setup().await?;
    let repo = SqliteSeatCategoryRepository::new(db.pool.clone());
    let category = common::seat_category(&db.pool, "General", 10).await?;

    let mut tx = db.pool.begin().await?;
    repo.lock_for_update(&mut *tx, category.id).await?;
    repo.set_available(&mut *tx, category.id, 4).await?;

    // WAL readers see the last committed value.
    assert_eq!(repo.find_by_id(category.id).await?.unwrap().available, 10);

    tx.commit().await?;
    assert_eq!(repo.find_by_id(category.id).await?.unwrap().available, 4);

    let mut tx = db.pool.begin().await?;
    let err = repo.lock_for_update(&mut *tx, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    tx.rollback().await?;

    Ok(())
}

#[tokio::test]
async fn test_participants_keep_input_order() -> anyhow::Result<()> {
    let db = setup().await?;
    let repo = SqliteParticipantRepository::new(db.pool.clone());

    let input = vec![
        NewParticipant {
            name: " Tamar ".to_string(),
            contact_number: "+995599000001".to_string(),
            email: Some("tamar@example.com".to_string()),
        },
        NewParticipant {
            name: "Levan".to_string(),
            contact_number: "+995599000002".to_string(),
            email: Some("   ".to_string()),
        },
        NewParticipant {
            name: "Priya".to_string(),
            contact_number: "+919800000003".to_string(),
            email: None,
        },
    ];

    let mut tx = db.pool.begin().await?;
    let created = repo.insert_many(&mut *tx, &input).await?;
    tx.commit().await?;

    assert_eq!(created.len(), 3);
    assert_eq!(created[0].name, "Tamar");
    assert_eq!(created[1].email, None);
    assert!(created.iter().all(|p| !p.attended));

    // Lookup order follows the ids passed in, not insertion or storage order.
    let ids = vec![created[2].id, Uuid::new_v4(), created[0].id, created[1].id];
    let names: Vec<String> = repo.find_by_ids(&ids).await?.into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Priya", "Tamar", "Levan"]);

    assert!(repo.find_by_ids(&[]).await?.is_empty());

    let checked_in = repo.set_attended(created[1].id, true).await?;
    assert!(checked_in.attended);

    let err = repo.set_attended(Uuid::new_v4(), true).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_participant_insert_rolls_back_with_transaction() -> anyhow::Result<()> {
    let db = setup().await?;
    let repo = SqliteParticipantRepository::new(db.pool.clone());

    let mut tx = db.pool.begin().await?;
    repo.insert_many(&mut *tx, &[NewParticipant {
        name: "Dropped".to_string(),
        contact_number: "+995599000009".to_string(),
        email: None,
    }]).await?;
    tx.rollback().await?;

    assert!(repo.list(10, 0).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_payment_record_crud() -> anyhow::Result<()> {
    let db = setup().await?;
    let repo = SqlitePaymentRecordRepository::new(db.pool.clone());

    let record = repo.create(CreatePaymentRecordRequest {
        payment_type: "UPI".to_string(),
        details: "ref 88123".to_string(),
        notes: None,
    }).await?;

    let updated = repo.update(record.id, UpdatePaymentRecordRequest {
        notes: Some("confirmed by phone".to_string()),
        ..Default::default()
    }).await?;
    assert_eq!(updated.payment_type, "UPI");
    assert_eq!(updated.notes.as_deref(), Some("confirmed by phone"));

    let mut tx = db.pool.begin().await?;
    assert!(repo.find_by_id_in(&mut *tx, record.id).await?.is_some());
    assert!(repo.find_by_id_in(&mut *tx, Uuid::new_v4()).await?.is_none());
    tx.rollback().await?;

    assert_eq!(repo.list().await?.len(), 1);
    repo.delete(record.id).await?;
    assert!(repo.find_by_id(record.id).await?.is_none());

    let err = repo.create(CreatePaymentRecordRequest {
        payment_type: String::new(),
        details: "x".to_string(),
        notes: None,
    }).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}
