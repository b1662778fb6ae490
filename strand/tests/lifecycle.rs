//! Lifecycle tests for managed threads, driven through the public API.
//!
//! To see log output:
//! ```bash
//! RUST_LOG=strand=trace cargo test --features tracing --test lifecycle -- --nocapture
//! ```

use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use strand::{
    ManagedThread, StartError, StopToken, ThreadBody, ThreadConfig, ThreadState, ThreadStatus,
    Timeout,
};

static INIT_TRACING: Once = Once::new();

fn init_test_tracing() {
    INIT_TRACING.call_once(strand::init_tracing);
}

/// Records `0..limit` together with the thread that produced each value.
struct NaturalNumbers {
    limit: u32,
    seen: Mutex<Vec<(u32, ThreadId)>>,
}

impl NaturalNumbers {
    fn new(limit: u32) -> Self {
        Self {
            limit,
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl ThreadBody for NaturalNumbers {
    fn thread_main(&self, _stop: &StopToken) {
        let me = std::thread::current().id();
        for i in 0..self.limit {
            self.seen.lock().push((i, me));
        }
    }

    fn request_stop(&self) {}
}

/// Runs until its token is raised.
#[derive(Default)]
struct Idler {
    finished: AtomicUsize,
}

impl ThreadBody for Idler {
    fn thread_main(&self, stop: &StopToken) {
        while !stop.wait(Duration::from_millis(2)) {}
        self.finished.fetch_add(1, Ordering::SeqCst);
    }

    fn request_stop(&self) {}
}

fn wait_idle<B: ThreadBody>(thread: &ManagedThread<B>, limit: Duration) {
    let deadline = Instant::now() + limit;
    while thread.is_running() {
        assert!(Instant::now() < deadline, "thread did not finish in {limit:?}");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn counter_prints_each_value_once_in_order() {
    init_test_tracing();

    let mut thread = ManagedThread::new(NaturalNumbers::new(10));
    assert_eq!(thread.start(), ThreadStatus::Ok);
    thread.join(Duration::from_secs(5)).unwrap();

    let seen = thread.body().seen.lock().clone();
    let values: Vec<u32> = seen.iter().map(|(v, _)| *v).collect();
    assert_eq!(values, (0..10).collect::<Vec<_>>());

    let main = std::thread::current().id();
    let worker = seen[0].1;
    assert_ne!(worker, main, "values must come from the spawned thread");
    assert!(seen.iter().all(|(_, id)| *id == worker));
}

#[test]
fn start_twice_then_already_started() {
    init_test_tracing();

    let mut thread = ManagedThread::new(Idler::default());

    assert_eq!(thread.start(), ThreadStatus::Ok);
    assert_eq!(thread.start(), ThreadStatus::AlreadyStarted);
    assert_eq!(thread.state(), ThreadState::Running);

    thread.stop(Timeout::Infinite).unwrap();
    assert_eq!(thread.body().finished.load(Ordering::SeqCst), 1);
}

#[test]
fn start_succeeds_again_after_body_returns() {
    init_test_tracing();

    let mut thread = ManagedThread::new(NaturalNumbers::new(3));

    assert_eq!(thread.start(), ThreadStatus::Ok);
    wait_idle(&thread, Duration::from_secs(5));
    assert_eq!(thread.state(), ThreadState::Idle);
    assert!(thread.thread_id().is_none());

    assert_eq!(thread.start(), ThreadStatus::Ok);
    wait_idle(&thread, Duration::from_secs(5));

    assert_eq!(thread.body().seen.lock().len(), 6);
}

#[test]
fn hundred_concurrent_instances_all_complete() {
    init_test_tracing();

    let mut threads: Vec<_> = (0..100)
        .map(|_| ManagedThread::new(NaturalNumbers::new(10)))
        .collect();

    for thread in &mut threads {
        assert_eq!(thread.start(), ThreadStatus::Ok);
    }
    for thread in &mut threads {
        assert_eq!(thread.join(Duration::from_secs(10)), Ok(()));
        assert_eq!(thread.body().seen.lock().len(), 10);
    }
}

#[test]
fn request_stop_reaches_body_hook() {
    init_test_tracing();

    /// Blocks on its own condition; only the hook can release it.
    struct Latch {
        released: Mutex<bool>,
        wake: parking_lot::Condvar,
        hooks: Arc<AtomicUsize>,
    }

    impl ThreadBody for Latch {
        fn thread_main(&self, _stop: &StopToken) {
            let mut released = self.released.lock();
            while !*released {
                self.wake.wait(&mut released);
            }
        }

        fn request_stop(&self) {
            self.hooks.fetch_add(1, Ordering::SeqCst);
            *self.released.lock() = true;
            self.wake.notify_all();
        }
    }

    let hooks = Arc::new(AtomicUsize::new(0));
    let mut thread = ManagedThread::new(Latch {
        released: Mutex::new(false),
        wake: parking_lot::Condvar::new(),
        hooks: Arc::clone(&hooks),
    });
    thread.start();

    assert!(thread.request_stop());
    assert_eq!(thread.join(Duration::from_secs(5)), Ok(()));
    assert_eq!(hooks.load(Ordering::SeqCst), 1);
    assert!(!thread.request_stop(), "idle instance has nothing to stop");
}

#[test]
fn drop_detaches_body_that_ignores_stop() {
    init_test_tracing();

    struct Stubborn(Arc<AtomicUsize>);

    impl ThreadBody for Stubborn {
        fn thread_main(&self, _stop: &StopToken) {
            std::thread::sleep(Duration::from_millis(300));
            self.0.store(1, Ordering::SeqCst);
        }

        fn request_stop(&self) {}
    }

    let done = Arc::new(AtomicUsize::new(0));
    let config = ThreadConfig {
        stop_timeout: Timeout::Duration(Duration::from_millis(20)),
        ..ThreadConfig::named("stubborn")
    };
    let mut thread = ManagedThread::with_config(Stubborn(Arc::clone(&done)), config);
    thread.start();

    let begin = Instant::now();
    drop(thread);
    assert!(
        begin.elapsed() < Duration::from_millis(250),
        "teardown must respect the stop timeout"
    );
    assert_eq!(done.load(Ordering::SeqCst), 0);
}

#[test]
fn try_start_reports_already_started() {
    init_test_tracing();

    let mut thread = ManagedThread::new(Idler::default());
    thread.try_start().unwrap();

    assert!(matches!(thread.try_start(), Err(StartError::AlreadyStarted)));
}

#[cfg(all(target_os = "linux", target_pointer_width = "64"))]
mod spawn_failure {
    use super::*;

    /// Stack larger than the user address space; thread creation cannot succeed.
    const UNSATISFIABLE_STACK: usize = 1 << 50;

    #[test]
    fn failed_spawn_leaves_instance_idle_and_usable() {
        init_test_tracing();

        let config = ThreadConfig {
            stack_size: Some(UNSATISFIABLE_STACK),
            ..ThreadConfig::default()
        };
        let mut thread = ManagedThread::with_config(NaturalNumbers::new(5), config);

        assert_eq!(thread.start(), ThreadStatus::Failed);
        assert_eq!(thread.state(), ThreadState::Idle);
        assert!(matches!(thread.try_start(), Err(StartError::Spawn(_))));

        thread.config_mut().stack_size = None;
        assert_eq!(thread.start(), ThreadStatus::Ok);
        thread.join(Duration::from_secs(5)).unwrap();
        assert_eq!(thread.body().seen.lock().len(), 5);
    }
}
