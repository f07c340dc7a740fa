//! # Service: restartable worker with start/pause/resume/stop control.
//!
//! A [`Service`] owns a [`StateRegister`], an [`InterruptGate`], a
//! [`ListenerSet`] and (usually) an [`EventQueue`]. Control threads call into
//! it; one dedicated worker thread per run drains the queue and executes.
//!
//! ## State machine
//! ```text
//! Stopped ──start()──────────────► Running
//! Running ──pause(level)─────────► Pausing ──(worker checkpoint)──► Paused
//! Paused  ──resume()─────────────► Running
//! Running │ Paused ──stop(level)─► Stopping ──(worker leaves loop)─► Stopped
//! ```
//!
//! ## Control protocol
//! ```text
//! state.lock()                       (check-then-set is atomic)
//!   ├─ pre-wait if needed            (Stopping→Stopped, Pausing→Paused)
//!   ├─ gate.lock()                   (one interrupting controller at a time)
//!   │    status.request_*(level)     (fast-path flag + level for the worker)
//!   │    state.set(Pausing|Stopping)
//!   │    gate.awake()                (queue + state waiters re-check now)
//!   ├─ gate unlocked
//!   └─ wait for outcome              (releases the state lock while parked)
//! ```
//!
//! ## Rules
//! - Two worker threads never coexist: a start joins the previous worker first.
//! - A no-op request (e.g. pausing a stopped service) is not an error and still
//!   honors its [`Wait`].
//! - Timeouts report the unmet status; they never cancel an issued request.
//! - Control calls that wait must not be made from listener hooks of the same
//!   service; the worker cannot make progress while it is inside a hook.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::faults::{Fault, FaultBus};
use crate::listeners::{ListenerSet, ServiceListener};
use crate::policies::InterruptLevel;
use crate::queue::{EventQueue, EventSink};

use super::builder::ServiceBuilder;
use super::gate::{InterruptGate, Wakeable};
use super::state::{LifecycleState, StateGuard, StateRegister, StateSet};
use super::status::{Budgets, Flags, Status};
use super::wait::{Deadline, Wait};
use super::{lock, worker};

/// Worker thread of one run.
struct Launch {
    run: u64,
    handle: JoinHandle<()>,
}

pub(crate) struct Shared<E> {
    pub(crate) name: Arc<str>,
    pub(crate) state: Arc<StateRegister>,
    pub(crate) gate: InterruptGate,
    pub(crate) queue: Arc<EventQueue<E>>,
    pub(crate) listeners: ListenerSet<E>,
    pub(crate) status: Status,
    pub(crate) budgets: Budgets,
    pub(crate) flags: Flags,
    default_interrupt: InterruptLevel,
    faults: FaultBus,
    last_fault: Mutex<Option<Fault>>,
    launch: Mutex<Option<Launch>>,
    pub(crate) worker: Mutex<Option<ThreadId>>,
    runs: AtomicU64,
}

/// Restartable background service handling events of type `E`.
///
/// Cloning is cheap and yields another handle to the same service.
pub struct Service<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for Service<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: Send + 'static> Service<E> {
    /// Creates a service with the default config and an unbounded, non-blocking queue.
    pub fn new() -> Self {
        let cfg = ServiceConfig::default();
        let queue = Arc::new(EventQueue::new());
        Self::from_parts(&cfg, queue, Vec::new())
    }

    /// Starts building a service from `cfg`.
    pub fn builder(cfg: ServiceConfig) -> ServiceBuilder<E> {
        ServiceBuilder::new(cfg)
    }

    pub(crate) fn from_parts(
        cfg: &ServiceConfig,
        queue: Arc<EventQueue<E>>,
        listeners: Vec<Arc<dyn ServiceListener<E>>>,
    ) -> Self {
        let state = Arc::new(StateRegister::new(LifecycleState::Stopped));
        let gate = InterruptGate::new();
        gate.register(queue.clone());
        gate.register(state.clone());

        Self {
            shared: Arc::new(Shared {
                name: Arc::from(cfg.name.as_str()),
                state,
                gate,
                queue,
                listeners: ListenerSet::new(listeners),
                status: Status::new(),
                budgets: Budgets::from_config(cfg),
                flags: Flags::from_config(cfg),
                default_interrupt: cfg.default_interrupt,
                faults: FaultBus::new(cfg.fault_capacity_clamped()),
                last_fault: Mutex::new(None),
                launch: Mutex::new(None),
                worker: Mutex::new(None),
                runs: AtomicU64::new(0),
            }),
        }
    }

    // ---- Control ----

    /// Starts the service and waits until it is started.
    pub fn start(&self) -> bool {
        self.start_with(Wait::Forever)
    }

    /// Starts the service; returns whether it is in a started state
    /// (`Running | Paused | Pausing`) when the call returns.
    ///
    /// Returns `false` if the worker thread cannot be spawned; the state then
    /// stays `Stopped` and the failure is reported as a fault.
    ///
    /// Starting from `Stopped` first joins the previous worker thread, even
    /// under [`Wait::No`]; that join lasts as long as the previous run's
    /// `on_stop` hooks. A service that is already started returns at once.
    pub fn start_with(&self, wait: Wait) -> bool {
        self.try_start_with(wait).unwrap_or(false)
    }

    /// Like [`start_with`](Self::start_with) but surfaces a spawn failure.
    pub fn try_start_with(&self, wait: Wait) -> Result<bool, ServiceError> {
        let shared = &self.shared;
        let deadline = wait.deadline();

        // Already started: the launch slot is not touched.
        let state = shared.state.lock();
        if state.has(StateSet::STARTED) {
            return Ok(Self::await_started(state, deadline));
        }
        drop(state);

        let mut launch = lock(&shared.launch);
        let mut state = shared.state.lock();

        if state.equals(LifecycleState::Stopping) {
            if let Some(deadline) = deadline {
                state = state.wait_until(LifecycleState::Stopped.into(), deadline).0;
            }
        }

        if state.equals(LifecycleState::Stopped) {
            if let Some(previous) = launch.take() {
                // The previous worker may still be delivering on_stop.
                drop(state);
                self.join_launch(previous);
                state = shared.state.lock();
            }
        }

        if state.equals(LifecycleState::Stopped) {
            shared.status.reset();
            state.set(LifecycleState::Running);
            let run = shared.runs.fetch_add(1, Ordering::SeqCst) + 1;

            match worker::spawn(self.clone(), run) {
                Ok(handle) => {
                    info!(service = %shared.name, run, "service started");
                    *launch = Some(Launch { run, handle });
                }
                Err(err) => {
                    state.set(LifecycleState::Stopped);
                    drop(state);
                    drop(launch);
                    let err = ServiceError::SpawnFailed {
                        reason: err.to_string(),
                    };
                    self.report(err.clone(), Some(run));
                    return Err(err);
                }
            }
        }
        drop(launch);
        Ok(Self::await_started(state, deadline))
    }

    fn await_started(mut state: StateGuard<'_>, deadline: Option<Deadline>) -> bool {
        if let Some(deadline) = deadline {
            state = state.wait_until(StateSet::STARTED, deadline).0;
        }
        state.has(StateSet::STARTED)
    }

    /// Adds a resource that pause and stop requests must wake.
    ///
    /// Register anything a listener parks on (its own condvar, a sleep), so a
    /// pause or stop issued while the worker is parked there is not delayed.
    pub fn register_wakeable(&self, wakeable: Arc<dyn Wakeable>) {
        self.shared.gate.register(wakeable);
    }

    /// Pauses with the default interrupt level and waits until resting.
    pub fn pause(&self) -> bool {
        self.pause_with(self.shared.default_interrupt, Wait::Forever)
    }

    /// Requests a pause; returns whether the service is resting
    /// (`Paused | Stopped`) when the call returns.
    pub fn pause_with(&self, level: InterruptLevel, wait: Wait) -> bool {
        let shared = &self.shared;
        let deadline = wait.deadline();
        let mut state = shared.state.lock();

        if state.equals(LifecycleState::Running) {
            let gate = shared.gate.lock();
            shared.status.request_pause(level);
            state.set(LifecycleState::Pausing);
            gate.awake();
            gate.unlock();
            debug!(service = %shared.name, level = level.as_label(), "pause requested");
        }

        if let Some(deadline) = deadline {
            state = state.wait_until(StateSet::RESTING, deadline).0;
        }
        state.has(StateSet::RESTING)
    }

    /// Resumes a paused service, waiting out a pause in progress.
    pub fn resume(&self) -> bool {
        self.resume_with(Wait::Forever)
    }

    /// Resumes a paused service; returns whether the state is
    /// `Running | Stopping | Stopped` when the call returns.
    ///
    /// While `Pausing`, the pause is waited out first (skipped under [`Wait::No`]).
    pub fn resume_with(&self, wait: Wait) -> bool {
        let shared = &self.shared;
        let deadline = wait.deadline();
        let mut state = shared.state.lock();

        if state.equals(LifecycleState::Pausing) {
            if let Some(deadline) = deadline {
                state = state.wait_until(LifecycleState::Paused.into(), deadline).0;
            }
        }

        if state.equals(LifecycleState::Paused) {
            shared.status.clear_pause();
            state.set(LifecycleState::Running);
            debug!(service = %shared.name, "resumed");
        }
        state.has(StateSet::RESUMED)
    }

    /// Stops with the default interrupt level and waits until stopped.
    pub fn stop(&self) -> bool {
        self.stop_with(self.shared.default_interrupt, Wait::Forever)
    }

    /// Requests a stop; returns whether the service is `Stopped` when the call returns.
    ///
    /// With [`Wait::Forever`] the call also joins the worker thread, so every
    /// listener has received `on_stop` when it returns `true`.
    pub fn stop_with(&self, level: InterruptLevel, wait: Wait) -> bool {
        let shared = &self.shared;
        let deadline = wait.deadline();
        let mut state = shared.state.lock();

        if state.equals(LifecycleState::Pausing) {
            if let Some(deadline) = deadline {
                state = state.wait_until(LifecycleState::Paused.into(), deadline).0;
            }
        }

        let run = shared.runs.load(Ordering::SeqCst);
        if state.has(
            LifecycleState::Running | LifecycleState::Paused | LifecycleState::Pausing,
        ) {
            let gate = shared.gate.lock();
            shared.status.request_stop(level);
            state.set(LifecycleState::Stopping);
            gate.awake();
            gate.unlock();
            debug!(service = %shared.name, level = level.as_label(), "stop requested");
        }

        if let Some(deadline) = deadline {
            state = state.wait_until(LifecycleState::Stopped.into(), deadline).0;
        }
        let stopped = state.equals(LifecycleState::Stopped);
        drop(state);

        if stopped && wait == Wait::Forever {
            self.join_run(run);
        }
        stopped
    }

    /// Discards every queued event.
    pub fn clear(&self) {
        self.shared.queue.clear();
    }

    /// Offers an event; `false` when acceptance is disabled or the queue is full.
    pub fn add_event(&self, event: E) -> bool {
        if !Flags::load(&self.shared.flags.accepts_events) {
            trace!(service = %self.shared.name, "event rejected: not accepting");
            return false;
        }
        let accepted = self.shared.queue.offer(event).is_ok();
        if !accepted {
            trace!(service = %self.shared.name, "event rejected: queue full");
        }
        accepted
    }

    /// Waits for the worker thread of the latest run to finish.
    ///
    /// Blocks until that run ends on its own or is stopped. Returns whether a
    /// thread was joined. Does nothing when called from the worker itself.
    pub fn join(&self) -> bool {
        let mut launch = lock(&self.shared.launch);
        match launch.take() {
            Some(previous) if previous.handle.thread().id() != thread::current().id() => {
                self.join_launch(previous);
                true
            }
            other => {
                *launch = other;
                false
            }
        }
    }

    fn join_run(&self, run: u64) {
        let mut launch = lock(&self.shared.launch);
        let same_run = launch.as_ref().is_some_and(|l| {
            l.run == run && l.handle.thread().id() != thread::current().id()
        });
        if same_run {
            if let Some(previous) = launch.take() {
                self.join_launch(previous);
            }
        }
    }

    fn join_launch(&self, previous: Launch) {
        if previous.handle.thread().id() == thread::current().id() {
            // Called from the previous worker's own on_stop.
            return;
        }
        if previous.handle.join().is_err() {
            warn!(service = %self.shared.name, run = previous.run, "worker thread panicked");
        }
    }

    pub(crate) fn report(&self, error: ServiceError, run: Option<u64>) {
        error!(
            service = %self.shared.name,
            label = error.as_label(),
            "{}",
            error.as_message()
        );
        let mut fault = Fault::new(Arc::clone(&self.shared.name), error);
        if let Some(run) = run {
            fault = fault.with_run(run);
        }
        *lock(&self.shared.last_fault) = Some(fault.clone());
        self.shared.faults.publish(fault);
    }
}

impl<E: 'static> Service<E> {
    pub(crate) fn shared(&self) -> &Shared<E> {
        &self.shared
    }

    // ---- Configuration ----

    /// Sets how many more events are dispatched before stopping (`None` = unlimited).
    pub fn set_remaining_events(&self, remaining: Option<u64>) {
        self.shared.budgets.events.set(remaining);
    }

    pub fn remaining_events(&self) -> Option<u64> {
        self.shared.budgets.events.get()
    }

    /// Sets how many more execute calls happen before stopping (`None` = unlimited).
    pub fn set_remaining_executes(&self, remaining: Option<u64>) {
        self.shared.budgets.executes.set(remaining);
    }

    pub fn remaining_executes(&self) -> Option<u64> {
        self.shared.budgets.executes.get()
    }

    /// Sets how many more iterations run before stopping (`None` = unlimited).
    pub fn set_remaining_iterations(&self, remaining: Option<u64>) {
        self.shared.budgets.iterations.set(remaining);
    }

    pub fn remaining_iterations(&self) -> Option<u64> {
        self.shared.budgets.iterations.get()
    }

    /// Whether `add_event` admits new events. Producers sharing the queue are unaffected.
    pub fn set_event_accept(&self, accept: bool) {
        Flags::store(&self.shared.flags.accepts_events, accept);
    }

    pub fn accepts_events(&self) -> bool {
        Flags::load(&self.shared.flags.accepts_events)
    }

    /// Whether the worker drains events; while off, events stay queued.
    pub fn set_event_active(&self, active: bool) {
        Flags::store(&self.shared.flags.events_active, active);
    }

    pub fn events_active(&self) -> bool {
        Flags::load(&self.shared.flags.events_active)
    }

    /// Whether the worker runs the execute hook each iteration.
    pub fn set_execute_active(&self, active: bool) {
        Flags::store(&self.shared.flags.execute_active, active);
    }

    pub fn execute_active(&self) -> bool {
        Flags::load(&self.shared.flags.execute_active)
    }

    // ---- Introspection ----

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.shared.state.get()
    }

    /// Blocks until the state is in `mask` or `timeout` elapses (`None` = forever).
    pub fn wait_for(&self, mask: impl Into<StateSet>, timeout: Option<Duration>) -> bool {
        self.shared.state.wait_for(mask, timeout)
    }

    /// Whether the current state is in `mask`.
    pub fn has_state(&self, mask: impl Into<StateSet>) -> bool {
        self.shared.state.has(mask)
    }

    /// `Running | Paused | Pausing`.
    pub fn is_running(&self) -> bool {
        self.shared.state.has(StateSet::STARTED)
    }

    /// `Paused | Stopped`.
    pub fn is_resting(&self) -> bool {
        self.shared.state.has(StateSet::RESTING)
    }

    /// Interrupt level of the pending pause/stop (`None` while running normally).
    pub fn interrupt_level(&self) -> InterruptLevel {
        self.shared.status.level()
    }

    /// The queue events are added to.
    pub fn queue(&self) -> &Arc<EventQueue<E>> {
        &self.shared.queue
    }

    /// Registered listeners; may be modified while the service runs.
    pub fn listeners(&self) -> &ListenerSet<E> {
        &self.shared.listeners
    }

    pub fn add_listener(&self, listener: Arc<dyn ServiceListener<E>>) {
        self.shared.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ServiceListener<E>>) -> bool {
        self.shared.listeners.remove(listener)
    }

    /// Whether the calling thread is this service's worker thread.
    pub fn is_worker_thread(&self) -> bool {
        *lock(&self.shared.worker) == Some(thread::current().id())
    }

    /// Number of runs started so far.
    pub fn runs(&self) -> u64 {
        self.shared.runs.load(Ordering::SeqCst)
    }

    /// Receives faults published from now on.
    pub fn subscribe_faults(&self) -> broadcast::Receiver<Fault> {
        self.shared.faults.subscribe()
    }

    /// Most recent fault, if any.
    pub fn last_fault(&self) -> Option<Fault> {
        lock(&self.shared.last_fault).clone()
    }
}

impl<E: Send + 'static> Default for Service<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Send + 'static> EventSink<E> for Service<E> {
    fn add_event(&self, event: E) -> bool {
        Service::add_event(self, event)
    }
}

impl<E: 'static> fmt::Debug for Service<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .field("runs", &self.runs())
            .finish()
    }
}
