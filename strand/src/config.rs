//! Spawn-time configuration for a [`ManagedThread`](crate::ManagedThread).

use std::time::Duration;

use crate::topology::CpuConfig;

/// Default bound on how long teardown waits for a stopped thread.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout specification for blocking operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Wait indefinitely.
    Infinite,
    /// Wait for at most the specified duration.
    Duration(Duration),
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

impl Timeout {
    /// Absolute deadline for this timeout, measured from now.
    ///
    /// `None` for [`Timeout::Infinite`] and for durations too large to be
    /// represented as an instant, which are waited out the same way.
    pub(crate) fn deadline(self) -> Option<minstant::Instant> {
        match self {
            Self::Infinite => None,
            Self::Duration(d) => minstant::Instant::now().checked_add(d),
        }
    }
}

/// Configuration applied each time the thread is spawned.
#[derive(Debug, Clone)]
pub struct ThreadConfig {
    /// OS-visible thread name. Unnamed if `None`.
    pub name: Option<String>,
    /// Stack size in bytes. Uses the platform default if `None`.
    pub stack_size: Option<usize>,
    /// How long teardown waits for the thread after asking it to stop.
    ///
    /// When the bound expires the thread is detached and a warning is logged.
    pub stop_timeout: Timeout,
    /// Core pinning for the spawned thread.
    pub cpu: CpuConfig,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            name: None,
            stack_size: None,
            stop_timeout: Timeout::Duration(DEFAULT_STOP_TIMEOUT),
            cpu: CpuConfig::Disabled,
        }
    }
}

impl ThreadConfig {
    /// Default configuration with the given thread name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub(crate) fn builder(&self) -> std::thread::Builder {
        let mut builder = std::thread::Builder::new();
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        builder
    }
}
