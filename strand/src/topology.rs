//! CPU topology detection and core pinning for managed threads.
//!
//! A managed thread can be left to the OS scheduler, pinned to an explicit
//! core, or spread: `CpuConfig::Spread(i)` maps the i-th thread of a group
//! onto the available cores round-robin, so a set of threads started with
//! consecutive indices lands on distinct cores when enough exist.
//!
//! Core IDs come from `core_affinity`; on most systems IDs `0..N` are
//! separate physical cores before SMT siblings are enumerated.

use core_affinity::CoreId;

/// CPU topology information detected at runtime.
#[derive(Debug, Clone)]
pub struct CpuTopology {
    /// Total logical cores (including SMT/hyperthreads).
    pub logical_cores: usize,
    /// Total physical cores.
    pub physical_cores: usize,
    /// Whether SMT (hyperthreading) is enabled.
    pub has_smt: bool,
    /// Core IDs this process may be pinned to.
    pub available_cores: Vec<usize>,
}

impl CpuTopology {
    /// Detects the CPU topology of the current system.
    #[must_use]
    pub fn detect() -> Self {
        let logical_cores = num_cpus::get();
        let physical_cores = num_cpus::get_physical();

        let available_cores = core_affinity::get_core_ids()
            .map(|ids| ids.into_iter().map(|id| id.id).collect())
            .unwrap_or_else(|| (0..logical_cores).collect());

        Self {
            logical_cores,
            physical_cores,
            has_smt: logical_cores > physical_cores,
            available_cores,
        }
    }

    /// Core for the `index`-th thread of a spread group.
    ///
    /// `None` if no core is available for pinning.
    #[must_use]
    pub fn spread_core(&self, index: usize) -> Option<usize> {
        if self.available_cores.is_empty() {
            return None;
        }
        self.available_cores
            .get(index % self.available_cores.len())
            .copied()
    }
}

/// Configuration for CPU pinning of a managed thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CpuConfig {
    /// Leave placement to the OS.
    #[default]
    Disabled,
    /// Pin to this core ID.
    Core(usize),
    /// Pin to the `n`-th available core, wrapping around.
    Spread(usize),
}

impl CpuConfig {
    /// Resolves the config to the core the thread should be pinned to.
    #[must_use]
    pub fn resolve(&self) -> Option<usize> {
        match *self {
            Self::Disabled => None,
            Self::Core(id) => Some(id),
            Self::Spread(index) => CpuTopology::detect().spread_core(index),
        }
    }
}

impl std::fmt::Display for CpuConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "unpinned"),
            Self::Core(id) => write!(f, "core-{id}"),
            Self::Spread(index) => write!(f, "spread-{index}"),
        }
    }
}

/// Pins the current thread to the specified core.
///
/// Returns `true` if pinning succeeded, `false` otherwise.
/// Pinning may fail if the core ID is invalid or the OS denies the request.
pub fn pin_to_core(core_id: usize) -> bool {
    core_affinity::set_for_current(CoreId { id: core_id })
}
