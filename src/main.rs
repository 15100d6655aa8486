use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use boxoffice::{
    config::Settings,
    db,
    domain::Booking,
    service::ServiceContext,
};

#[derive(Parser)]
#[command(name = "boxoffice")]
#[command(about = "Operator tool for the booking ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    Migrate,
    /// Show one booking and its participants
    Show {
        booking_id: Uuid,
    },
    /// List bookings waiting for an admin decision
    Pending {
        /// Only bookings for this concert
        #[arg(long)]
        concert: Option<Uuid>,
    },
    /// Approve a booking and send the ticket
    Approve {
        booking_id: Uuid,
    },
    /// Reject a booking
    Reject {
        booking_id: Uuid,

        /// Shown to the requester
        #[arg(long, short)]
        reason: Option<String>,
    },
    /// Cancel a booking and hand its seats back
    Cancel {
        booking_id: Uuid,
    },
    /// List seat categories with remaining inventory
    Categories,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boxoffice=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    let db_pool = db::init(&settings.database).await?;
    if matches!(cli.command, Commands::Migrate) {
        println!("Schema is up to date ({})", settings.database.url);
        return Ok(());
    }

    let ctx = ServiceContext::from_settings(db_pool, &settings).await?;

    for (name, result) in ctx.dispatcher.health_check_all().await {
        if let Err(e) = result {
            tracing::warn!("Notifier {} health check failed: {:?}", name, e);
        }
    }

    let engine = &ctx.reservations;
    match cli.command {
        Commands::Migrate => {}
        Commands::Show { booking_id } => {
            let booking = engine.get_booking(booking_id).await?;
            print_booking(&booking);
            if let Some(notes) = &booking.notes {
                println!("  notes: {}", notes);
            }
            for participant in engine.participants_for_booking(booking_id).await? {
                println!(
                    "  - {} ({}){}",
                    participant.name,
                    participant.contact_number,
                    participant.email.map(|e| format!(" <{}>", e)).unwrap_or_default()
                );
            }
        }
        Commands::Pending { concert } => {
            let pending = match concert {
                Some(concert_id) => engine.list_pending_for_concert(concert_id).await?,
                None => engine.list_pending().await?,
            };
            if pending.is_empty() {
                println!("No bookings awaiting verification");
            }
            for booking in &pending {
                print_booking(booking);
            }
        }
        Commands::Approve { booking_id } => {
            print_booking(&engine.approve_booking(booking_id).await?);
        }
        Commands::Reject { booking_id, reason } => {
            print_booking(&engine.reject_booking(booking_id, reason.as_deref()).await?);
        }
        Commands::Cancel { booking_id } => {
            print_booking(&engine.cancel_booking(booking_id).await?);
        }
        Commands::Categories => {
            for category in ctx.seat_repo.list().await? {
                println!(
                    "{}  {:<20} available {:>5}  GEL {}.{:02}  INR {}.{:02}",
                    category.id,
                    category.seat_type,
                    category.available,
                    category.price_gel_cents / 100,
                    category.price_gel_cents % 100,
                    category.price_inr_cents / 100,
                    category.price_inr_cents % 100,
                );
            }
        }
    }

    // Notifications run on spawned tasks; let them finish before exit.
    ctx.dispatcher.wait_idle().await;

    Ok(())
}

fn print_booking(booking: &Booking) {
    println!(
        "{}  {:<21} {} x {:<12} {}.{:02}  {}  {}",
        booking.id,
        booking.status,
        booking.quantity,
        booking.seat_type,
        booking.total_amount_cents / 100,
        booking.total_amount_cents % 100,
        booking.booking_email,
        booking.created_at.format("%Y-%m-%d %H:%M"),
    );
}
