//! # Worker: the servicing loop of one run.
//!
//! Spawned by [`Service::try_start_with`] on a dedicated, named OS thread.
//!
//! ## Flow
//! ```text
//! on_start
//!   └─► loop while stop not requested:
//!         ├─ iterations exhausted? ──► leave
//!         ├─ events active  → drain: poll ─► checkpoint ─► budget ─► on_event  (until empty)
//!         ├─ execute active → checkpoint ─► budget ─► on_execute
//!         ├─ neither active → checkpoint, yield
//!         └─ consume iteration; any budget hit ──► leave
//! state = Stopped
//! on_stop(level)
//! ```
//!
//! ## Checkpoint
//! The worker is the only party that turns `Pausing` into `Paused`. It does so
//! at checkpoints: between events, before execute, and when a blocking poll
//! is woken. While paused it parks on the state register until the state
//! becomes `Running`, `Stopping` or `Pausing` again.
//!
//! ## Rules
//! - A budget of `n` lets exactly `n` dispatches happen; events left after that stay queued.
//! - An event taken while a stop forbids events is discarded, not dispatched.
//! - A listener panic ends the run; `on_stop` is still delivered.

use std::io;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, trace};

use crate::error::ServiceError;
use crate::listeners::Hook;
use crate::policies::InterruptLevel;

use super::service::{Service, Shared};
use super::state::LifecycleState;
use super::status::{Consume, Flags};
use super::lock;
use super::wait::Deadline;

/// Spawns the worker thread for `run`, named after the service.
pub(super) fn spawn<E: Send + 'static>(
    service: Service<E>,
    run: u64,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(service.name().to_string())
        .spawn(move || Worker { service, run }.run())
}

/// Outcome of one drain or execute step.
#[derive(Clone, Copy, Debug)]
struct Pass {
    /// `false` once a budget is used up.
    valid: bool,
    /// Whether at least one hook was dispatched.
    worked: bool,
}

impl Pass {
    fn go(worked: bool) -> Self {
        Self { valid: true, worked }
    }

    fn exhausted(worked: bool) -> Self {
        Self {
            valid: false,
            worked,
        }
    }
}

struct Worker<E> {
    service: Service<E>,
    run: u64,
}

impl<E: Send + 'static> Worker<E> {
    fn shared(&self) -> &Shared<E> {
        self.service.shared()
    }

    fn run(self) {
        let shared = self.shared();
        *lock(&shared.worker) = Some(thread::current().id());
        debug!(service = %shared.name, run = self.run, "worker entered");

        let outcome = shared
            .listeners
            .dispatch(Hook::Start, |l| l.on_start(&self.service))
            .and_then(|()| self.serve());
        if let Err(err) = outcome {
            self.service.report(err, Some(self.run));
        }

        let level = if shared.status.stop_requested() {
            shared.status.level()
        } else {
            InterruptLevel::None
        };
        shared.state.set(LifecycleState::Stopped);
        info!(
            service = %shared.name,
            run = self.run,
            level = level.as_label(),
            "service stopped"
        );

        if let Err(err) = shared
            .listeners
            .dispatch(Hook::Stop, |l| l.on_stop(&self.service, level))
        {
            self.service.report(err, Some(self.run));
        }

        let mut worker = lock(&shared.worker);
        if *worker == Some(thread::current().id()) {
            *worker = None;
        }
    }

    fn serve(&self) -> Result<(), ServiceError> {
        let shared = self.shared();

        while !shared.status.stop_requested() {
            if shared.budgets.iterations.is_exhausted() {
                debug!(service = %shared.name, "iteration budget exhausted");
                break;
            }

            let events_active = Flags::load(&shared.flags.events_active);
            let execute_active = Flags::load(&shared.flags.execute_active);
            let mut valid = true;
            let mut worked = false;

            if events_active {
                let pass = self.drain_events()?;
                valid &= pass.valid;
                worked |= pass.worked;
            }
            if execute_active && valid {
                let pass = self.execute()?;
                valid &= pass.valid;
                worked |= pass.worked;
            }
            if !events_active && !execute_active {
                self.checkpoint()?;
            }
            if !worked {
                thread::yield_now();
            }

            if matches!(
                shared.budgets.iterations.consume(),
                Consume::Granted { last: true } | Consume::Exhausted
            ) {
                valid = false;
            }
            if !valid {
                debug!(service = %shared.name, run = self.run, "budget used up, leaving loop");
                break;
            }
        }
        Ok(())
    }

    /// Dispatches queued events until the queue yields nothing or a budget runs out.
    fn drain_events(&self) -> Result<Pass, ServiceError> {
        let shared = self.shared();
        let mut worked = false;

        loop {
            if shared.budgets.events.is_exhausted() {
                return Ok(Pass::exhausted(worked));
            }
            if shared.status.interrupt_requested() && !self.can_event()? {
                return Ok(Pass::go(worked));
            }

            let polled = match shared.gate.enter() {
                Some(entry) => {
                    let item = shared
                        .queue
                        .poll_until(&|| shared.status.interrupt_requested());
                    entry.exit();
                    item
                }
                None => None,
            };

            let Some(event) = polled else {
                self.checkpoint()?;
                return Ok(Pass::go(worked));
            };

            if !self.can_event()? {
                trace!(service = %shared.name, "event discarded by stop level");
                continue;
            }

            match shared.budgets.events.consume() {
                Consume::Exhausted => {
                    shared.queue.requeue(event);
                    return Ok(Pass::exhausted(worked));
                }
                Consume::Granted { last } => {
                    shared
                        .listeners
                        .dispatch(Hook::Event, |l| l.on_event(&self.service, &event))?;
                    worked = true;
                    if last {
                        return Ok(Pass::exhausted(worked));
                    }
                }
                Consume::Unlimited => {
                    shared
                        .listeners
                        .dispatch(Hook::Event, |l| l.on_event(&self.service, &event))?;
                    worked = true;
                }
            }
        }
    }

    fn execute(&self) -> Result<Pass, ServiceError> {
        let shared = self.shared();
        if !self.can_execute()? {
            return Ok(Pass::go(false));
        }

        let last = match shared.budgets.executes.consume() {
            Consume::Exhausted => return Ok(Pass::exhausted(false)),
            Consume::Granted { last } => last,
            Consume::Unlimited => false,
        };
        shared
            .listeners
            .dispatch(Hook::Execute, |l| l.on_execute(&self.service))?;
        Ok(Pass {
            valid: !last,
            worked: true,
        })
    }

    fn can_event(&self) -> Result<bool, ServiceError> {
        self.checkpoint()?;
        Ok(self.shared().status.level().runs_events())
    }

    fn can_execute(&self) -> Result<bool, ServiceError> {
        self.checkpoint()?;
        Ok(self.shared().status.level().runs_execute())
    }

    /// Completes a pending pause: `Pausing → Paused`, then parks until resumed or stopped.
    fn checkpoint(&self) -> Result<(), ServiceError> {
        let shared = self.shared();
        if !shared.status.pause_requested() {
            return Ok(());
        }

        let mut state = shared.state.lock();
        while state.equals(LifecycleState::Pausing) {
            let level = shared.status.level();
            state.set(LifecycleState::Paused);
            drop(state);
            debug!(service = %shared.name, level = level.as_label(), "paused");

            shared
                .listeners
                .dispatch(Hook::Pause, |l| l.on_pause(&self.service, level))?;

            let wake =
                LifecycleState::Running | LifecycleState::Stopping | LifecycleState::Pausing;
            let (guard, _) = shared.state.lock().wait_until(wake, Deadline::forever());
            drop(guard);

            shared
                .listeners
                .dispatch(Hook::Resume, |l| l.on_resume(&self.service, level))?;
            state = shared.state.lock();
        }
        Ok(())
    }
}
