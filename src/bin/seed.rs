use base64::{engine::general_purpose::STANDARD, Engine as _};
use boxoffice::{
    config::Settings,
    db,
    domain::{CreateBookingRequest, CreatePaymentRecordRequest, CreateSeatCategoryRequest, NewParticipant},
    error::AppError,
    service::ServiceContext,
};
use clap::Parser;
use fake::{
    faker::{internet::en::SafeEmail, name::en::Name, phone_number::en::PhoneNumber},
    Fake,
};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "seed", about = "Fill the database with demo seat categories and bookings")]
struct Args {
    /// Number of bookings to create
    #[arg(long, default_value_t = 8)]
    bookings: usize,
}

/// Clamps a random party size to what the category has left; `None` once it
/// is sold out.
fn seats_to_request(wanted: i64, left: i64) -> Option<i64> {
    let quantity = wanted.min(left);
    (quantity > 0).then_some(quantity)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    println!("🌱 Starting database seeding...");

    let settings = Settings::new().unwrap_or_default();
    let db_pool = db::init(&settings.database).await?;
    let ctx = ServiceContext::from_settings(db_pool, &settings).await?;

    println!("🎫 Creating seat categories...");
    let mut categories = Vec::new();
    for (seat_type, gel, inr, available) in [
        ("VIP", 25_000, 750_000, 20),
        ("General", 8_000, 240_000, 150),
        ("Fan Zone", 12_000, 360_000, 60),
    ] {
        let category = ctx.seat_repo.create(CreateSeatCategoryRequest {
            seat_type: seat_type.to_string(),
            price_gel_cents: gel,
            price_inr_cents: inr,
            available,
            notes: None,
        }).await?;
        categories.push(category);
    }
    println!("  ✅ Created {} seat categories", categories.len());

    let concert_id = Uuid::new_v4();
    println!("📝 Creating bookings for concert {}...", concert_id);
    let receipt = STANDARD.encode(b"demo receipt image");
    let mut created = Vec::new();
    let mut skipped = 0;
    for i in 0..args.bookings {
        let category = &categories[i % categories.len()];
        let left = match ctx.seat_repo.find_by_id(category.id).await? {
            Some(current) => current.available,
            None => 0,
        };
        let Some(quantity) = seats_to_request((1i64..4).fake(), left) else {
            skipped += 1;
            continue;
        };

        let payment = ctx.payment_repo.create(CreatePaymentRecordRequest {
            payment_type: if i % 2 == 0 { "BANK_TRANSFER" } else { "UPI" }.to_string(),
            details: format!("Reference {:06}", (0..1_000_000).fake::<u32>()),
            notes: None,
        }).await?;

        let participants = (0..quantity)
            .map(|_| NewParticipant {
                name: Name().fake(),
                contact_number: PhoneNumber().fake(),
                email: Some(SafeEmail().fake()),
            })
            .collect();

        let request = CreateBookingRequest {
            concert_id,
            booking_email: SafeEmail().fake(),
            payment_record_id: payment.id,
            receipt_image: receipt.clone(),
            seat_category_id: category.id,
            quantity,
            total_amount_cents: category.price_gel_cents * quantity,
            participants,
        };
        match ctx.reservations.create_booking(request).await {
            Ok(booking) => created.push(booking),
            Err(AppError::InsufficientInventory { .. }) => skipped += 1,
            Err(e) => return Err(e.into()),
        }
    }
    println!("  ✅ Created {} bookings", created.len());
    if skipped > 0 {
        println!("  ⚠️  Skipped {} bookings for sold-out categories", skipped);
    }

    // A few decisions so every status shows up in listings.
    if let Some(booking) = created.first() {
        ctx.reservations.approve_booking(booking.id).await?;
    }
    if let Some(booking) = created.get(1) {
        ctx.reservations.reject_booking(booking.id, Some("Receipt amount does not match")).await?;
    }
    if let Some(booking) = created.get(2) {
        ctx.reservations.cancel_booking(booking.id).await?;
    }

    println!("\n✨ Database seeding complete!");
    for category in ctx.seat_repo.list().await? {
        println!("  {:<10} {} seats left", category.seat_type, category.available);
    }

    ctx.dispatcher.wait_idle().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_party_size_is_clamped_to_remaining_seats() {
        assert_eq!(seats_to_request(3, 20), Some(3));
        assert_eq!(seats_to_request(3, 2), Some(2));
        assert_eq!(seats_to_request(2, 0), None);
    }
}
