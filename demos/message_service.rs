//! # Message Service Example
//!
//! A blocking message service traced by the built-in `LogWriter`.
//!
//! Demonstrates:
//! - Blocking queue: the worker parks until a message arrives
//! - Stopping with `InterruptLevel::Execute` while parked in poll
//! - Reading faults after the run
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example message_service --features logging
//! ```

use std::{sync::Arc, thread, time::Duration};

use serviceloop::{InterruptLevel, LogWriter, Service, ServiceConfig, ServiceHandler, Wait};
use tracing_subscriber::EnvFilter;

struct Shouter;

impl ServiceHandler<String> for Shouter {
    fn on_event(&self, message: &String) {
        println!(" ─► {}", message.to_uppercase());
    }

    fn name(&self) -> &'static str {
        "shouter"
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut cfg = ServiceConfig::named("messages");
    cfg.blocking = true;
    cfg.execute_active = false;

    let service = Service::<String>::builder(cfg)
        .with_listener(Arc::new(LogWriter::new()))
        .with_handler(Shouter)
        .build()?;

    anyhow::ensure!(service.start(), "service did not start");

    for message in ["hello", "from", "the", "producer"] {
        service.add_event(message.to_string());
        thread::sleep(Duration::from_millis(100));
    }

    anyhow::ensure!(
        service.stop_with(InterruptLevel::Execute, Wait::Timeout(Duration::from_secs(2))),
        "service did not stop in time"
    );
    service.join();

    match service.last_fault() {
        Some(fault) => println!(" ─► Last fault: {}", fault.error),
        None => println!(" ─► Finished without faults"),
    }
    Ok(())
}
