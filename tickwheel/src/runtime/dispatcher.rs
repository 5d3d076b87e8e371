//! Dispatch of matured callbacks.
//!
//! Every callback runs under `catch_unwind`. A panic is logged, counted and
//! passed to the failure hook; it never reaches the tick loop or the caller
//! that scheduled the task.
//!
//! The worker pool is a multi-consumer `crossbeam-channel` queue drained by
//! named threads. Closing the pool drops the only sender: workers finish what
//! is already queued and then exit on their own.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use crate::config::{DispatchMode, FailureHook};
use crate::error::{CallbackFailure, WheelError};
use crate::runtime::stats::Counters;
use crate::timing::Matured;
use crate::trace::{debug, error, info, trace};

/// Runs callbacks and reports their failures.
#[derive(Clone)]
pub(crate) struct Executor {
    hook: Option<FailureHook>,
    counters: Arc<Counters>,
}

impl Executor {
    pub fn new(hook: Option<FailureHook>, counters: Arc<Counters>) -> Self {
        Self { hook, counters }
    }

    /// Runs one matured callback to completion, swallowing any panic.
    pub fn run(&self, task: Matured) {
        let (key, callback) = task.into_parts();
        trace!(key = %key, "running callback");

        let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) else {
            return;
        };

        Counters::add(&self.counters.failed, 1);
        let failure = CallbackFailure {
            key,
            message: panic_message(payload.as_ref()),
        };
        error!(key = %failure.key, message = %failure.message, "callback panicked");

        if let Some(hook) = &self.hook {
            if panic::catch_unwind(AssertUnwindSafe(|| hook(&failure))).is_err() {
                error!(key = %failure.key, "failure hook panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Hands matured tasks to their execution resource.
pub(crate) struct Dispatcher {
    executor: Executor,
    backend: Backend,
}

enum Backend {
    Inline,
    Pool(WorkerPool),
}

struct WorkerPool {
    sender: Mutex<Option<Sender<Matured>>>,
}

impl Dispatcher {
    /// Builds the dispatcher, spawning worker threads named `{name}-worker-{n}`.
    pub fn spawn(mode: DispatchMode, name: &str, executor: Executor) -> Result<Self, WheelError> {
        let backend = match mode {
            DispatchMode::Inline => Backend::Inline,
            DispatchMode::Workers(count) => {
                let (sender, receiver) = unbounded::<Matured>();
                for n in 0..count.get() {
                    let thread = format!("{name}-worker-{n}");
                    spawn_worker(thread, receiver.clone(), executor.clone())?;
                }
                Backend::Pool(WorkerPool {
                    sender: Mutex::new(Some(sender)),
                })
            }
        };
        Ok(Self { executor, backend })
    }

    /// Hands `task` off. Never blocks on the callback itself in pool mode.
    pub fn dispatch(&self, task: Matured) {
        let task = match &self.backend {
            Backend::Inline => task,
            Backend::Pool(pool) => match pool.try_send(task) {
                Ok(()) => return,
                Err(task) => task,
            },
        };
        // Inline mode, or a task detached while the pool was closing. It has
        // already left the wheel, so it still runs.
        self.executor.run(task);
    }

    /// Stops accepting work for the pool; queued callbacks still run.
    pub fn close(&self) {
        if let Backend::Pool(pool) = &self.backend {
            if pool.sender.lock().take().is_some() {
                debug!("dispatch queue closed");
            }
        }
    }
}

impl WorkerPool {
    fn try_send(&self, task: Matured) -> Result<(), Matured> {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            return Err(task);
        };
        sender.send(task).map_err(|e| e.into_inner())
    }
}

fn spawn_worker(
    name: String,
    receiver: Receiver<Matured>,
    executor: Executor,
) -> Result<(), WheelError> {
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            debug!("dispatch worker started");
            for task in receiver.iter() {
                executor.run(task);
            }
            debug!("dispatch worker exiting");
        })
        .map_err(|source| {
            error!(thread = %name, error = %source, "failed to spawn dispatch worker");
            WheelError::Spawn {
                thread: name.clone(),
                source,
            }
        })?;
    info!(thread = %name, "dispatch worker spawned");
    Ok(())
}
