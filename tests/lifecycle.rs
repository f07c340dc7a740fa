mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use common::{event_config, eventually, init_tracing, Latch, Record, Recorder};
use serviceloop::{
    EventQueue, EventSink, Hook, InterruptLevel, LifecycleState, Service, ServiceConfig,
    ServiceHandler, ServiceListener, StateSet, Wait, Wakeable,
};

const PATIENCE: Duration = Duration::from_secs(5);

fn recorded(cfg: ServiceConfig) -> (Service<String>, Arc<Recorder>) {
    init_tracing();
    let recorder = Arc::new(Recorder::default());
    let service = Service::<String>::builder(cfg)
        .with_listener(recorder.clone())
        .build()
        .unwrap();
    (service, recorder)
}

#[test]
fn start_is_idempotent() {
    let (service, recorder) = recorded(event_config("idempotent"));

    assert!(service.start());
    assert!(service.start());
    assert_eq!(service.runs(), 1);
    assert!(eventually(PATIENCE, || recorder.count(|r| *r == Record::Start) == 1));

    assert!(service.stop());
    assert_eq!(recorder.count(|r| *r == Record::Start), 1);
    assert_eq!(
        recorder.count(|r| matches!(r, Record::Stop(_))),
        1,
        "stop must be delivered exactly once"
    );
}

#[test]
fn start_stop_cycles_deliver_hooks_once_per_run() {
    let (service, recorder) = recorded(event_config("cycles"));

    for run in 1..=3 {
        assert!(service.start());
        assert!(service.stop());
        assert_eq!(service.state(), LifecycleState::Stopped);
        assert_eq!(service.runs(), run);
    }
    assert_eq!(
        recorder.records(),
        vec![
            Record::Start,
            Record::Stop(InterruptLevel::Immediate),
            Record::Start,
            Record::Stop(InterruptLevel::Immediate),
            Record::Start,
            Record::Stop(InterruptLevel::Immediate),
        ]
    );
    assert_eq!(recorder.worker_thread_seen(), 3);
    assert!(!service.is_worker_thread());
}

#[test]
fn pause_then_resume_dispatches_held_events_afterwards() {
    let (service, recorder) = recorded(event_config("pause"));

    assert!(service.start());
    assert!(eventually(PATIENCE, || !recorder.records().is_empty()));

    assert!(service.pause());
    assert_eq!(service.state(), LifecycleState::Paused);
    assert!(service.is_resting());

    assert!(service.add_event("held".into()));
    thread::sleep(Duration::from_millis(30));
    assert!(recorder.events().is_empty(), "paused service dispatched an event");

    assert!(service.resume());
    assert!(eventually(PATIENCE, || recorder.events() == ["held"]));
    assert!(service.stop());

    assert_eq!(
        recorder.records(),
        vec![
            Record::Start,
            Record::Pause(InterruptLevel::Immediate),
            Record::Resume(InterruptLevel::Immediate),
            Record::Event("held".into()),
            Record::Stop(InterruptLevel::Immediate),
        ]
    );
}

#[test]
fn stop_from_paused_wakes_the_worker() {
    let (service, recorder) = recorded(event_config("paused-stop"));

    assert!(service.start());
    assert!(service.pause_with(InterruptLevel::Actions, Wait::Forever));
    assert!(service.stop_with(InterruptLevel::Execute, Wait::Forever));

    let records = recorder.records();
    assert_eq!(records.last(), Some(&Record::Stop(InterruptLevel::Execute)));
    assert!(records.contains(&Record::Resume(InterruptLevel::Actions)));
}

#[test]
fn disabled_acceptance_rejects_events() {
    let (service, recorder) = recorded(event_config("closed"));
    service.set_event_accept(false);
    assert!(!service.accepts_events());

    assert!(!service.add_event("dropped".into()));
    assert!(service.queue().is_empty());

    assert!(service.start());
    thread::sleep(Duration::from_millis(20));
    assert!(service.stop());
    assert!(recorder.events().is_empty());
}

#[test]
fn stop_immediate_interrupts_blocking_poll() {
    let (service, recorder) = recorded(event_config("blocked"));

    assert!(service.start());
    assert!(eventually(PATIENCE, || recorder.records() == [Record::Start]));
    thread::sleep(Duration::from_millis(20));

    let begun = Instant::now();
    assert!(service.stop_with(InterruptLevel::Immediate, Wait::Forever));
    assert!(begun.elapsed() < Duration::from_secs(1));
    assert_eq!(
        recorder.records().last(),
        Some(&Record::Stop(InterruptLevel::Immediate))
    );
}

#[test]
fn wait_no_on_resting_service_reports_current_state() {
    let (service, _recorder) = recorded(event_config("idle"));

    assert!(service.pause_with(InterruptLevel::Immediate, Wait::No));
    assert!(service.resume_with(Wait::No));
    assert!(service.stop_with(InterruptLevel::Immediate, Wait::No));
    assert!(service.wait_for(StateSet::RESTING, Some(Duration::ZERO)));
    assert_eq!(service.runs(), 0);
}

#[test]
fn timed_stop_of_stopped_service_returns_true() {
    let (service, _recorder) = recorded(event_config("timed"));
    assert!(service.stop_with(
        InterruptLevel::Immediate,
        Wait::Timeout(Duration::from_millis(10))
    ));
}

#[test]
fn stop_level_is_reported_to_listeners() {
    let (service, recorder) = recorded(event_config("levels"));

    assert!(service.start());
    assert!(service.stop_with(InterruptLevel::Actions, Wait::Forever));
    assert_eq!(
        recorder.records().last(),
        Some(&Record::Stop(InterruptLevel::Actions))
    );
    assert_eq!(service.interrupt_level(), InterruptLevel::Actions);
}

struct Exploding {
    trigger: &'static str,
}

impl ServiceListener<String> for Exploding {
    fn on_event(&self, _service: &Service<String>, event: &String) {
        if event == self.trigger {
            panic!("cannot handle {event}");
        }
    }

    fn name(&self) -> &'static str {
        "exploding"
    }
}

#[test]
fn listener_panic_stops_run_and_publishes_fault() {
    init_tracing();
    let recorder = Arc::new(Recorder::default());
    let service = Service::<String>::builder(event_config("faulty"))
        .with_listener(recorder.clone())
        .with_listener(Arc::new(Exploding { trigger: "boom" }))
        .build()
        .unwrap();
    let mut faults = service.subscribe_faults();

    assert!(service.start());
    assert!(service.add_event("boom".into()));
    assert!(service.wait_for(LifecycleState::Stopped, Some(PATIENCE)));
    service.join();

    let fault = faults.try_recv().unwrap();
    assert_eq!(fault.label(), "service_listener_panicked");
    assert_eq!(fault.hook(), Some(Hook::Event));
    assert_eq!(fault.run, Some(1));
    assert_eq!(service.last_fault().map(|f| f.seq), Some(fault.seq));
    assert_eq!(
        recorder.records().last(),
        Some(&Record::Stop(InterruptLevel::None))
    );

    // The engine is restartable after a faulted run.
    assert!(service.start());
    assert!(service.add_event("fine".into()));
    assert!(eventually(PATIENCE, || recorder.events() == ["boom", "fine"]));
    assert!(service.stop());
    assert_eq!(recorder.count(|r| *r == Record::Start), 2);
}

struct StartFails;

impl ServiceListener<String> for StartFails {
    fn on_start(&self, _service: &Service<String>) {
        panic!("no resources");
    }
}

#[test]
fn panic_in_on_start_still_delivers_on_stop() {
    init_tracing();
    let recorder = Arc::new(Recorder::default());
    let service = Service::<String>::builder(event_config("bad-start"))
        .with_listener(Arc::new(StartFails))
        .with_listener(recorder.clone())
        .build()
        .unwrap();

    assert!(service.start());
    service.join();

    assert_eq!(service.state(), LifecycleState::Stopped);
    assert_eq!(service.last_fault().and_then(|f| f.hook()), Some(Hook::Start));
    assert_eq!(
        recorder.records(),
        vec![Record::Start, Record::Stop(InterruptLevel::None)]
    );
}

#[derive(Default)]
struct Counting {
    events: AtomicUsize,
    stopped: AtomicBool,
}

struct CountingHandler(Arc<Counting>);

impl ServiceHandler<String> for CountingHandler {
    fn on_event(&self, _event: &String) {
        self.0.events.fetch_add(1, Ordering::SeqCst);
    }

    fn on_stop(&self) {
        self.0.stopped.store(true, Ordering::SeqCst);
    }
}

fn feed(sink: &dyn EventSink<String>, items: &[&str]) -> usize {
    items
        .iter()
        .filter(|item| sink.add_event(item.to_string()))
        .count()
}

#[test]
fn handler_consumes_events_from_shared_queue() {
    init_tracing();
    let queue = Arc::new(EventQueue::<String>::new().with_blocking(true));
    let counting = Arc::new(Counting::default());
    let mut cfg = ServiceConfig::named("shared");
    cfg.execute_active = false;

    let service = Service::<String>::builder(cfg)
        .with_queue(Arc::clone(&queue))
        .with_handler(CountingHandler(Arc::clone(&counting)))
        .build()
        .unwrap();

    assert!(service.start());
    assert_eq!(feed(queue.as_ref(), &["a", "b"]), 2);
    assert_eq!(feed(&service, &["c"]), 1);
    assert!(eventually(PATIENCE, || counting.events.load(Ordering::SeqCst) == 3));

    assert!(service.stop());
    assert!(counting.stopped.load(Ordering::SeqCst));
}

#[test]
fn bounded_queue_rejects_overflow() {
    let mut cfg = event_config("bounded");
    cfg.queue_capacity = 2;
    let (service, _recorder) = recorded(cfg);

    assert!(service.add_event("1".into()));
    assert!(service.add_event("2".into()));
    assert!(!service.add_event("3".into()));
    service.clear();
    assert!(service.add_event("4".into()));
}

#[test]
fn listeners_can_be_added_while_running() {
    let (service, recorder) = recorded(event_config("late"));
    let late = Arc::new(Recorder::default());

    assert!(service.start());
    service.add_listener(late.clone());
    assert!(service.add_event("x".into()));
    assert!(eventually(PATIENCE, || late.events() == ["x"]));

    let handle: Arc<dyn ServiceListener<String>> = late.clone();
    assert!(service.remove_listener(&handle));
    assert!(service.stop());

    assert_eq!(recorder.events(), ["x"]);
    assert!(!late.records().iter().any(|r| matches!(r, Record::Stop(_))));
}

#[test]
fn state_stays_valid_under_concurrent_control() {
    let (service, _recorder) = recorded(event_config("contended"));
    let done = Arc::new(AtomicBool::new(false));
    let wait = Wait::Timeout(Duration::from_millis(20));

    let sampler = {
        let service = service.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::SeqCst) {
                assert!(StateSet::ALL.contains(service.state()));
                thread::yield_now();
            }
        })
    };

    let controllers: Vec<_> = (0..4)
        .map(|id| {
            let service = service.clone();
            thread::spawn(move || {
                for step in 0..50 {
                    match (id + step) % 4 {
                        0 => {
                            service.start_with(wait);
                        }
                        1 => {
                            service.pause_with(InterruptLevel::Immediate, wait);
                        }
                        2 => {
                            service.resume_with(wait);
                        }
                        _ => {
                            service.stop_with(InterruptLevel::Execute, wait);
                        }
                    }
                    service.add_event(format!("{id}-{step}"));
                }
            })
        })
        .collect();

    for controller in controllers {
        controller.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    sampler.join().unwrap();

    assert!(service.stop());
    assert_eq!(service.state(), LifecycleState::Stopped);
}

#[test]
fn pause_and_resume_neither_lose_nor_duplicate_queued_events() {
    let (service, recorder) = recorded(event_config("no-loss"));
    let expected: Vec<String> = (0..60).map(|i| i.to_string()).collect();

    for item in &expected[..20] {
        assert!(service.add_event(item.clone()));
    }
    assert!(service.start());
    for chunk in expected[20..].chunks(20) {
        assert!(service.pause());
        for item in chunk {
            assert!(service.add_event(item.clone()));
        }
        assert!(service.resume());
    }

    assert!(eventually(PATIENCE, || recorder.events().len() == expected.len()));
    assert!(service.stop());
    assert_eq!(recorder.events(), expected);
    assert_eq!(recorder.count(|r| matches!(r, Record::Pause(_))), 2);
    assert_eq!(recorder.count(|r| matches!(r, Record::Resume(_))), 2);
}

/// Blocks inside the first event until released.
#[derive(Default)]
struct SlowFirst {
    entered: Latch,
    release: Latch,
}

impl ServiceListener<String> for SlowFirst {
    fn on_event(&self, _service: &Service<String>, event: &String) {
        if event == "slow" {
            self.entered.open();
            self.release.wait();
        }
    }
}

struct Unwound {
    events: Vec<String>,
    executes: usize,
    left_queued: usize,
}

/// Stops with `level` while the worker is inside the first of three queued events.
fn stop_during_slow_event(level: InterruptLevel) -> Unwound {
    init_tracing();
    let recorder = Arc::new(Recorder::default());
    let slow = Arc::new(SlowFirst::default());
    let service = Service::<String>::builder(ServiceConfig::named(format!("level-{level}")))
        .with_source(["slow", "x", "y"].map(String::from).into())
        .with_listener(slow.clone())
        .with_listener(recorder.clone())
        .build()
        .unwrap();

    assert!(service.start());
    assert!(slow.entered.wait_timeout(PATIENCE));
    assert_eq!(recorder.executes(), 0);
    assert!(!service.stop_with(level, Wait::No));
    slow.release.open();
    assert!(service.wait_for(LifecycleState::Stopped, Some(PATIENCE)));
    service.join();

    Unwound {
        events: recorder.events(),
        executes: recorder.executes(),
        left_queued: service.queue().len(),
    }
}

#[test]
fn stop_immediate_runs_neither_events_nor_execute() {
    let unwound = stop_during_slow_event(InterruptLevel::Immediate);
    assert_eq!(unwound.events, ["slow"]);
    assert_eq!(unwound.executes, 0);
    assert_eq!(unwound.left_queued, 2);
}

#[test]
fn stop_execute_level_drains_events_but_skips_execute() {
    let unwound = stop_during_slow_event(InterruptLevel::Execute);
    assert_eq!(unwound.events, ["slow", "x", "y"]);
    assert_eq!(unwound.executes, 0);
    assert_eq!(unwound.left_queued, 0);
}

#[test]
fn stop_actions_level_skips_events_but_runs_execute() {
    let unwound = stop_during_slow_event(InterruptLevel::Actions);
    assert_eq!(unwound.events, ["slow"]);
    assert_eq!(unwound.executes, 1);
    assert_eq!(unwound.left_queued, 2);
}

#[test]
fn stop_none_level_finishes_the_iteration() {
    let unwound = stop_during_slow_event(InterruptLevel::None);
    assert_eq!(unwound.events, ["slow", "x", "y"]);
    assert_eq!(unwound.executes, 1);
    assert_eq!(unwound.left_queued, 0);
}

#[test]
fn start_on_running_service_is_not_blocked_by_join() {
    let (service, _recorder) = recorded(event_config("joined"));
    assert!(service.start());

    let joiner = {
        let service = service.clone();
        thread::spawn(move || service.join())
    };
    thread::sleep(Duration::from_millis(30));

    let (tx, rx) = mpsc::channel();
    let starter = {
        let service = service.clone();
        thread::spawn(move || tx.send(service.start_with(Wait::No)).unwrap())
    };
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(true));
    starter.join().unwrap();

    assert!(service.stop());
    joiner.join().unwrap();
    assert_eq!(service.runs(), 1);
}

/// A resource a listener parks on; woken by pause and stop once registered.
#[derive(Default)]
struct Doorbell {
    rung: Mutex<bool>,
    changed: Condvar,
    parked: AtomicUsize,
}

impl Doorbell {
    fn park(&self) {
        self.parked.fetch_add(1, Ordering::SeqCst);
        let mut rung = self.rung.lock().unwrap();
        while !*rung {
            rung = self.changed.wait(rung).unwrap();
        }
        *rung = false;
    }
}

impl Wakeable for Doorbell {
    fn wake(&self) {
        *self.rung.lock().unwrap() = true;
        self.changed.notify_all();
    }
}

struct Napper(Arc<Doorbell>);

impl ServiceListener<String> for Napper {
    fn on_execute(&self, _service: &Service<String>) {
        self.0.park();
    }
}

#[test]
fn registered_wakeable_is_woken_by_stop() {
    init_tracing();
    let bell = Arc::new(Doorbell::default());
    let mut cfg = ServiceConfig::named("napper");
    cfg.events_active = false;
    let service = Service::<String>::builder(cfg)
        .with_listener(Arc::new(Napper(Arc::clone(&bell))))
        .build()
        .unwrap();
    service.register_wakeable(bell.clone());

    assert!(service.start());
    assert!(eventually(PATIENCE, || bell.parked.load(Ordering::SeqCst) == 1));

    assert!(service.stop_with(InterruptLevel::Immediate, Wait::Timeout(PATIENCE)));
    assert_eq!(bell.parked.load(Ordering::SeqCst), 1);
}

fn describe<E: Send + 'static>(service: &Service<E>) -> (String, usize) {
    (format!("{service:?}"), service.listeners().len())
}

#[test]
fn generic_introspection_works_for_any_event_type() {
    let (service, _recorder) = recorded(event_config("described"));
    let (debug, listeners) = describe(&service);
    assert!(debug.contains("described"));
    assert!(debug.contains("Stopped"));
    assert_eq!(listeners, 1);

    let bare: Service<u64> = Service::new();
    assert_eq!(describe(&bare).1, 0);
    assert_eq!(format!("{:?}", bare.listeners()), "[]");
}
