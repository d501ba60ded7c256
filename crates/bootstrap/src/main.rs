//! Randolink smoke-run binary.
//!
//! Assembles a runtime against a small demo catalog, plays one short offline
//! session, and tears it down again. Useful for exercising the save and
//! message pipeline without a host game attached.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p randolink-bootstrap
//! ```
//!
//! Networked play additionally needs a wire transport, which only a real
//! game integration provides. With `RANDOLINK_SERVER` and `RANDOLINK_SLOT`
//! set, the session connect fails cleanly and shows up in the logs.

use std::sync::Arc;

use anyhow::Result;

use randolink_bootstrap::{BootstrapConfig, Randolink, logging};
use randolink_core::{
    ItemId, ItemInfo, LocationId, LocationInfo, MemoryItemCatalog, MemoryLocationCatalog,
    RandomizerEngine, SaveSlot,
};

fn demo_items() -> MemoryItemCatalog {
    MemoryItemCatalog::new([
        ItemInfo::new(ItemId(1), "Progressive Cannon"),
        ItemInfo::new(ItemId(2), "Boost"),
        ItemInfo::new(ItemId(3), "Supershot"),
    ])
}

fn demo_locations() -> MemoryLocationCatalog {
    MemoryLocationCatalog::new([
        LocationInfo::new(LocationId(10), "Green Grotto Chest", Some(ItemId(1))),
        LocationInfo::new(LocationId(11), "Sunken City Reward", Some(ItemId(2))),
        LocationInfo::new(LocationId(12), "Scarab Cache", Some(ItemId(3))),
    ])
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    logging::setup_logging();

    let config = BootstrapConfig::from_env();
    tracing::info!(
        context = %config.session_context().kind(),
        data_dir = %config.resolve_data_dir().display(),
        "starting randolink"
    );

    let runtime = Randolink::builder(config)
        .item_catalog(Arc::new(demo_items()))
        .location_catalog(Arc::new(demo_locations()))
        .build()?;

    let slot = SaveSlot(1);
    runtime.load_save(slot).await?;

    let engine = runtime.engine();
    for location in [LocationId(10), LocationId(11), LocationId(12)] {
        let item = engine.item_at(location)?;
        let checked = engine.is_location_checked(location)?;
        tracing::info!(%location, item = ?item, checked, "location status");
    }

    if !engine.is_location_checked(LocationId(10))? {
        engine.check_location(LocationId(10))?;
    }

    let report = runtime.consume();
    tracing::info!(
        handled = report.handled,
        dropped = report.dropped,
        failed = report.failed,
        "drained message queue"
    );

    runtime.exit_game().await?;
    tracing::info!("session closed");

    Ok(())
}
