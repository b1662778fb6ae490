//! Managed OS threads.
//!
//! A [`ManagedThread`] owns at most one native thread at a time and runs a
//! user-supplied [`ThreadBody`] on it.
//!
//! # Lifecycle
//!
//! ```text
//!            start() = Ok
//!   Idle ───────────────────────> Running
//!    ^  \                          │  │
//!    │   └─ start() = Failed       │  └─ start() = AlreadyStarted
//!    │                             │
//!    └─────────────────────────────┘
//!      body returns | join/stop | drop
//! ```
//!
//! The spawned thread clears the running state itself once the body
//! returns (or unwinds), so `start()` after natural completion succeeds.
//!
//! # Teardown
//!
//! Dropping a running instance raises the run's [`StopToken`], calls
//! [`ThreadBody::request_stop`], and joins for at most
//! [`ThreadConfig::stop_timeout`]. A body that ignores both is detached when
//! the bound expires; the thread is never killed. Dropping an instance
//! whose thread already finished neither signals nor waits.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use strand::{ManagedThread, StopToken, ThreadBody, ThreadStatus};
//!
//! struct Ticker;
//!
//! impl ThreadBody for Ticker {
//!     fn thread_main(&self, stop: &StopToken) {
//!         while !stop.wait(Duration::from_millis(10)) {}
//!     }
//!
//!     fn request_stop(&self) {}
//! }
//!
//! let mut thread = ManagedThread::new(Ticker);
//! assert_eq!(thread.start(), ThreadStatus::Ok);
//! assert_eq!(thread.start(), ThreadStatus::AlreadyStarted);
//! drop(thread); // stops and joins
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, ThreadId};

use minstant::Instant;
use parking_lot::{Condvar, Mutex};

use crate::config::{ThreadConfig, Timeout};
use crate::error::{JoinError, StartError};
use crate::stop::StopToken;
use crate::topology::pin_to_core;
use crate::trace::{debug, error, info, trace, warn};

/// Work run on a managed thread.
///
/// The body is shared between the owning [`ManagedThread`] and the spawned
/// thread, hence the `Sync` bound.
pub trait ThreadBody: Send + Sync + 'static {
    /// Thread entry point. Runs to completion on the spawned thread.
    ///
    /// Long-running bodies should watch `stop` and return once it is raised.
    fn thread_main(&self, stop: &StopToken);

    /// Asks a running [`thread_main`](Self::thread_main) to return.
    ///
    /// Called by [`ManagedThread::request_stop`] and on teardown, after the
    /// run's [`StopToken`] has been raised. Bodies blocked on something the
    /// token cannot wake (a socket, their own condvar) unblock it here.
    fn request_stop(&self);
}

/// Result of [`ManagedThread::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ThreadStatus {
    /// Thread started successfully.
    Ok,
    /// Thread creation failed.
    Failed,
    /// Thread is already running.
    AlreadyStarted,
}

impl From<&Result<(), StartError>> for ThreadStatus {
    fn from(result: &Result<(), StartError>) -> Self {
        match result {
            Ok(()) => Self::Ok,
            Err(StartError::Spawn(_)) => Self::Failed,
            Err(StartError::AlreadyStarted) => Self::AlreadyStarted,
        }
    }
}

/// Whether a managed thread currently owns a live OS thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadState {
    /// No thread running.
    Idle,
    /// A thread is running the body.
    Running,
}

/// State shared between the owner and one spawned thread.
struct RunState {
    running: AtomicBool,
    lock: Mutex<()>,
    finished: Condvar,
    stop: StopToken,
    #[cfg(target_os = "linux")]
    os_tid: std::sync::atomic::AtomicI32,
}

impl RunState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            lock: Mutex::new(()),
            finished: Condvar::new(),
            stop: StopToken::new(),
            #[cfg(target_os = "linux")]
            os_tid: std::sync::atomic::AtomicI32::new(0),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Waits for the body to return. `None` waits without bound.
    ///
    /// Returns `false` if `deadline` passes first.
    fn wait_finished(&self, deadline: Option<Instant>) -> bool {
        let mut guard = self.lock.lock();
        while self.is_running() {
            let Some(deadline) = deadline else {
                self.finished.wait(&mut guard);
                continue;
            };
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.finished.wait_for(&mut guard, deadline.duration_since(now));
        }
        true
    }
}

/// Marks the run finished when the trampoline exits, including by unwinding.
struct FinishGuard<'a>(&'a RunState);

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        let _guard = self.0.lock.lock();
        self.0.running.store(false, Ordering::Release);
        self.0.finished.notify_all();
    }
}

/// One spawned thread and its shared state.
struct Run {
    handle: JoinHandle<()>,
    state: Arc<RunState>,
}

/// Entry point of every spawned thread.
fn trampoline<B: ThreadBody>(body: &B, state: &RunState, core: Option<usize>) {
    let _finish = FinishGuard(state);

    #[cfg(target_os = "linux")]
    state.os_tid.store(
        rustix::thread::gettid().as_raw_nonzero().get(),
        Ordering::Release,
    );

    if let Some(core) = core {
        if pin_to_core(core) {
            debug!(core, "pinned thread");
        } else {
            warn!(core, "failed to pin thread, running unpinned");
        }
    }

    trace!("thread body starting");
    body.thread_main(&state.stop);
    trace!("thread body returned");
}

/// Owner of a single OS thread running a [`ThreadBody`].
///
/// Not `Clone`: the instance is the only owner of its thread handle.
/// Moving it is fine, the spawned thread holds only reference-counted state.
pub struct ManagedThread<B: ThreadBody> {
    body: Arc<B>,
    config: ThreadConfig,
    run: Option<Run>,
}

impl<B: ThreadBody> ManagedThread<B> {
    /// Creates an idle instance with the default configuration.
    #[must_use]
    pub fn new(body: B) -> Self {
        Self::with_config(body, ThreadConfig::default())
    }

    /// Creates an idle instance with the given configuration.
    #[must_use]
    pub fn with_config(body: B, config: ThreadConfig) -> Self {
        Self {
            body: Arc::new(body),
            config,
            run: None,
        }
    }

    /// Starts the body on a new OS thread.
    ///
    /// Never blocks beyond the thread-creation call and never retries.
    pub fn start(&mut self) -> ThreadStatus {
        ThreadStatus::from(&self.try_start())
    }

    /// Like [`start`](Self::start), keeping the OS error on failure.
    ///
    /// # Errors
    ///
    /// - [`StartError::AlreadyStarted`] if a thread is running; it is left untouched
    /// - [`StartError::Spawn`] if the OS could not create the thread; the
    ///   instance stays idle and can be started again
    pub fn try_start(&mut self) -> Result<(), StartError> {
        if self.is_running() {
            debug!(name = ?self.config.name, "start rejected, thread already running");
            return Err(StartError::AlreadyStarted);
        }

        // Whatever is left belongs to a thread that has already finished its
        // body; dropping the handle detaches it.
        self.run = None;

        let state = Arc::new(RunState::new());
        let core = self.config.cpu.resolve();

        let body = Arc::clone(&self.body);
        let thread_state = Arc::clone(&state);
        let spawned = self
            .config
            .builder()
            .spawn(move || trampoline(&*body, &thread_state, core));

        match spawned {
            Ok(handle) => {
                info!(
                    name = ?self.config.name,
                    cpu = %self.config.cpu,
                    "thread started"
                );
                self.run = Some(Run { handle, state });
                Ok(())
            }
            Err(e) => {
                error!(name = ?self.config.name, error = %e, "failed to spawn thread");
                Err(StartError::Spawn(e))
            }
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ThreadState {
        if self.is_running() {
            ThreadState::Running
        } else {
            ThreadState::Idle
        }
    }

    /// Whether a thread is running the body.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running_run().is_some()
    }

    /// Asks the running thread to stop: raises its [`StopToken`], then calls
    /// [`ThreadBody::request_stop`].
    ///
    /// Does not wait. Returns `false` without touching the body if no thread
    /// is running.
    pub fn request_stop(&self) -> bool {
        let Some(run) = self.running_run() else {
            return false;
        };
        info!(name = ?self.config.name, "stop requested");
        run.state.stop.request_stop();
        self.body.request_stop();
        true
    }

    /// Waits for the current run to finish, without asking it to stop.
    ///
    /// On an idle instance this reaps the handle of the last run, if any.
    ///
    /// # Errors
    ///
    /// - [`JoinError::TimedOut`] if the thread is still running at the
    ///   deadline; it keeps running and stays owned by this instance
    /// - [`JoinError::Panicked`] if the body panicked
    pub fn join(&mut self, timeout: impl Into<Timeout>) -> Result<(), JoinError> {
        let deadline = timeout.into().deadline();
        let Some(run) = self.run.as_ref() else {
            return Ok(());
        };
        if !run.state.wait_finished(deadline) {
            return Err(JoinError::TimedOut);
        }

        let Some(run) = self.run.take() else {
            return Ok(());
        };
        run.handle.join().map_err(|payload| {
            let err = JoinError::from_panic(payload.as_ref());
            warn!(name = ?self.config.name, error = %err, "thread body panicked");
            err
        })
    }

    /// [`request_stop`](Self::request_stop) followed by [`join`](Self::join).
    ///
    /// # Errors
    ///
    /// Same as [`join`](Self::join).
    pub fn stop(&mut self, timeout: impl Into<Timeout>) -> Result<(), JoinError> {
        self.request_stop();
        self.join(timeout)
    }

    /// The shared body.
    #[must_use]
    pub fn body(&self) -> &B {
        &self.body
    }

    /// Configuration used for the next start.
    #[must_use]
    pub fn config(&self) -> &ThreadConfig {
        &self.config
    }

    /// Mutable configuration. Changes apply from the next start.
    pub fn config_mut(&mut self) -> &mut ThreadConfig {
        &mut self.config
    }

    /// Rust-level ID of the running thread.
    #[must_use]
    pub fn thread_id(&self) -> Option<ThreadId> {
        self.running_run().map(|run| run.handle.thread().id())
    }

    /// Native `pthread_t` of the running thread.
    #[cfg(unix)]
    #[must_use]
    pub fn native_handle(&self) -> Option<std::os::unix::thread::RawPthread> {
        use std::os::unix::thread::JoinHandleExt;

        self.running_run().map(|run| run.handle.as_pthread_t())
    }

    /// Kernel thread ID of the running thread.
    ///
    /// `None` when idle, and briefly after a start until the new thread has
    /// recorded its ID.
    #[cfg(target_os = "linux")]
    #[must_use]
    pub fn os_tid(&self) -> Option<i32> {
        self.running_run()
            .map(|run| run.state.os_tid.load(Ordering::Acquire))
            .filter(|&tid| tid != 0)
    }

    fn running_run(&self) -> Option<&Run> {
        self.run.as_ref().filter(|run| run.state.is_running())
    }
}

impl<B: ThreadBody> Drop for ManagedThread<B> {
    fn drop(&mut self) {
        if !self.is_running() {
            return;
        }

        debug!(name = ?self.config.name, "stopping thread on teardown");
        let timeout = self.config.stop_timeout;
        match self.stop(timeout) {
            Ok(()) => {
                debug!(name = ?self.config.name, "thread joined on teardown");
            }
            Err(JoinError::TimedOut) => {
                warn!(
                    name = ?self.config.name,
                    timeout = ?timeout,
                    "thread ignored stop request, detaching"
                );
            }
            // Already logged by join.
            Err(JoinError::Panicked(_)) => {}
        }
    }
}

impl<B: ThreadBody> std::fmt::Debug for ManagedThread<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedThread")
            .field("name", &self.config.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
