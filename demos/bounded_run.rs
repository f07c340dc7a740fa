//! # Bounded Run Example
//!
//! A service that drains a prepared backlog with a budget and stops on its own.
//!
//! Demonstrates:
//! - Seeding the queue with `with_source`
//! - `remaining_events` budget; leftovers stay queued
//! - Refilling the budget and restarting
//! - Subscribing to faults
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example bounded_run
//! ```

use std::collections::VecDeque;

use serviceloop::{Service, ServiceConfig, ServiceHandler};
use tracing_subscriber::EnvFilter;

struct Importer;

impl ServiceHandler<u32> for Importer {
    fn on_event(&self, record: &u32) {
        println!(" ─► Imported record #{record}");
    }

    fn on_stop(&self) {
        println!(" ─► Batch finished");
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut cfg = ServiceConfig::named("importer");
    cfg.execute_active = false;
    cfg.remaining_events = Some(3);

    let backlog: VecDeque<u32> = (1..=7).collect();
    let service = Service::<u32>::builder(cfg)
        .with_source(backlog)
        .with_handler(Importer)
        .build()?;
    let mut faults = service.subscribe_faults();

    while !service.queue().is_empty() {
        service.set_remaining_events(Some(3));
        anyhow::ensure!(service.start(), "importer did not start");
        service.join();
        println!(" ─► {} records left", service.queue().len());
    }

    if let Ok(fault) = faults.try_recv() {
        println!(" ─► Fault during import: {}", fault.error);
    }
    println!(" ─► Runs: {}", service.runs());
    Ok(())
}
