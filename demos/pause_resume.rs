//! # Pause / Resume Example
//!
//! A periodic sampler that is paused and resumed from the main thread.
//!
//! Demonstrates:
//! - Execute-only services (`events_active = false`)
//! - Pausing with different interrupt levels
//! - Observing state from a controller thread
//!
//! ## Run
//! ```bash
//! cargo run --example pause_resume
//! ```

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use serviceloop::{InterruptLevel, Service, ServiceConfig, ServiceListener, Wait};

#[derive(Default)]
struct Sampler {
    samples: AtomicU64,
}

impl ServiceListener<()> for Sampler {
    fn on_execute(&self, _service: &Service<()>) {
        self.samples.fetch_add(1, Ordering::Relaxed);
        thread::sleep(Duration::from_millis(10));
    }

    fn on_pause(&self, service: &Service<()>, level: InterruptLevel) {
        println!(" ─► [{}] paused ({level})", service.name());
    }

    fn on_resume(&self, service: &Service<()>, level: InterruptLevel) {
        println!(" ─► [{}] resumed after {level} pause", service.name());
    }

    fn name(&self) -> &'static str {
        "sampler"
    }
}

fn main() -> anyhow::Result<()> {
    let mut cfg = ServiceConfig::named("sampler");
    cfg.events_active = false;

    let sampler = Arc::new(Sampler::default());
    let service = Service::<()>::builder(cfg)
        .with_listener(sampler.clone())
        .build()?;

    service.start();
    thread::sleep(Duration::from_millis(200));

    // ============================================================
    // Demo 1: Pause immediately, nothing runs while paused
    // ============================================================
    service.pause();
    let frozen = sampler.samples.load(Ordering::Relaxed);
    thread::sleep(Duration::from_millis(200));
    println!(
        " ─► State {}, samples {} (unchanged: {})",
        service.state(),
        frozen,
        frozen == sampler.samples.load(Ordering::Relaxed)
    );
    service.resume();

    // ============================================================
    // Demo 2: Pause letting the current execute finish
    // ============================================================
    thread::sleep(Duration::from_millis(200));
    let rested =
        service.pause_with(InterruptLevel::Actions, Wait::Timeout(Duration::from_secs(1)));
    println!(" ─► Rested in time: {rested}, state {}", service.state());
    service.resume();

    thread::sleep(Duration::from_millis(100));
    service.stop();
    println!(
        " ─► Stopped after {} samples",
        sampler.samples.load(Ordering::Relaxed)
    );
    Ok(())
}
