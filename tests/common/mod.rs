#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serviceloop::{InterruptLevel, Service, ServiceConfig, ServiceListener};

/// One observed hook, in dispatch order. Executes are only counted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    Start,
    Event(String),
    Pause(InterruptLevel),
    Resume(InterruptLevel),
    Stop(InterruptLevel),
}

#[derive(Default)]
pub struct Recorder {
    records: Mutex<Vec<Record>>,
    executes: AtomicUsize,
    worker_thread_seen: AtomicUsize,
}

impl Recorder {
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Event(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: fn(&Record) -> bool) -> usize {
        self.records().iter().filter(|r| wanted(r)).count()
    }

    pub fn executes(&self) -> usize {
        self.executes.load(Ordering::SeqCst)
    }

    pub fn worker_thread_seen(&self) -> usize {
        self.worker_thread_seen.load(Ordering::SeqCst)
    }

    fn push(&self, record: Record) {
        self.records.lock().unwrap().push(record);
    }
}

impl ServiceListener<String> for Recorder {
    fn on_start(&self, service: &Service<String>) {
        if service.is_worker_thread() {
            self.worker_thread_seen.fetch_add(1, Ordering::SeqCst);
        }
        self.push(Record::Start);
    }

    fn on_event(&self, _service: &Service<String>, event: &String) {
        self.push(Record::Event(event.clone()));
    }

    fn on_execute(&self, _service: &Service<String>) {
        self.executes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_pause(&self, _service: &Service<String>, level: InterruptLevel) {
        self.push(Record::Pause(level));
    }

    fn on_resume(&self, _service: &Service<String>, level: InterruptLevel) {
        self.push(Record::Resume(level));
    }

    fn on_stop(&self, _service: &Service<String>, level: InterruptLevel) {
        self.push(Record::Stop(level));
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

/// Blocking queue, execute disabled: the worker parks in poll while idle.
pub fn event_config(name: &str) -> ServiceConfig {
    let mut cfg = ServiceConfig::named(name);
    cfg.blocking = true;
    cfg.execute_active = false;
    cfg
}

/// Polls `cond` until it holds or `timeout` elapses.
pub fn eventually(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One-shot gate a test opens to let a parked thread continue.
#[derive(Default)]
pub struct Latch {
    open: Mutex<bool>,
    changed: Condvar,
}

impl Latch {
    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.changed.notify_all();
    }

    pub fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.changed.wait(open).unwrap();
        }
    }

    /// Returns whether the latch opened within `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let open = self.open.lock().unwrap();
        let (open, _) = self
            .changed
            .wait_timeout_while(open, timeout, |open| !*open)
            .unwrap();
        *open
    }
}
