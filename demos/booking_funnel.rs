// Walks one guest through the whole funnel against the simulated services:
// browse the weekly plan, book a tour, reload, get declined once, then pay.
//
// RUST_LOG=sandhu_travels=debug cargo run --example booking_funnel

use anyhow::{anyhow, Result};
use sandhu_travels::browse::price_label;
use sandhu_travels::config::FunnelConfig;
use sandhu_travels::contact::agency_chat_link;
use sandhu_travels::gateway::PaymentError;
use sandhu_travels::navigation::{Route, Shell, View};
use sandhu_travels::session::{FileStorage, StorageSlot};
use sandhu_travels::simulated::{SimulatedBackend, SimulatedPaymentGateway};
use sandhu_travels::{Catalog, DraftField};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = match std::env::var("FUNNEL_CONFIG") {
        Ok(json) => FunnelConfig::from_json(&json)?,
        Err(_) => FunnelConfig::default(),
    };
    let storage_dir = tempfile::tempdir()?;
    let catalog = Arc::new(Catalog::sandhu());
    let cancel = CancellationToken::new();

    // First visit: pick a tour from the weekly plan and submit the form
    {
        let slot = Arc::new(StorageSlot::new(
            Arc::new(FileStorage::open(storage_dir.path())?),
            config.storage_key.clone(),
        ));
        let mut shell = Shell::simulated(catalog.clone(), slot, config.clone());

        shell.navigate_path("#/weekly-tours");
        if let View::WeeklyTours { sections } = shell.view() {
            for section in sections {
                println!("{} (#{})", section.region, section.anchor);
                for tour in section.tours {
                    println!("  {:<40} {}", tour.name, price_label(u64::from(tour.price)));
                }
            }
        }

        let capture = shell.open_booking("hunza-skardu-8d")?;
        capture.update(DraftField::FullName, "Ali Khan")?;
        capture.update(DraftField::Email, "ali@x.com")?;
        capture.update(DraftField::Phone, "0300-1111111")?;
        capture.update(DraftField::TravelDate, "2025-07-04")?;
        capture.update(DraftField::Persons, "3")?;
        capture.update(DraftField::PackageType, "Premium")?;

        let receipt = shell.submit_booking(&cancel).await?;
        println!(
            "Booking held for {}: {}",
            receipt.booking.tour_name,
            price_label(receipt.booking.total_price)
        );
    }

    // Second visit after a reload: the pending booking is still there
    let slot = Arc::new(StorageSlot::new(
        Arc::new(FileStorage::open(storage_dir.path())?),
        config.storage_key.clone(),
    ));
    let backend = Arc::new(SimulatedBackend::new(config.submit_latency()));
    let gateway = Arc::new(SimulatedPaymentGateway::new(config.payment_latency()));
    gateway.fail_next(PaymentError::Declined("insufficient funds".into()));
    let mut shell = Shell::new(catalog, slot, backend, gateway.clone(), config);

    if shell.navigate(Route::Checkout) != Route::Checkout {
        return Err(anyhow!("pending booking was lost on reload"));
    }
    if let Some(checkout) = shell.checkout() {
        let summary = checkout.summary();
        println!(
            "Base fare {} + service fee {} = {}",
            price_label(summary.base_fare),
            price_label(summary.service_fee),
            price_label(summary.grand_total)
        );
    }

    if let Err(e) = shell.pay(&cancel).await {
        println!("First attempt failed: {}", e);
    }
    let confirmation = shell.pay(&cancel).await?;
    println!(
        "Paid {} for {}, order {} ({})",
        price_label(confirmation.amount_charged),
        confirmation.tour_name,
        confirmation.order_reference,
        confirmation.transaction_id
    );
    println!("Questions? {}", agency_chat_link());

    Ok(())
}
