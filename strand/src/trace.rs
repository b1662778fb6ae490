//! Logging for strand.
//!
//! Built with `--features tracing`, the crate logs through the `tracing`
//! crate. Without the feature every log macro expands to `()`.

/// Default filter directive when `RUST_LOG` is unset.
#[cfg(feature = "tracing")]
const DEFAULT_FILTER: &str = "strand=trace";

/// Installs a global `tracing` subscriber writing to stderr.
///
/// The filter comes from `RUST_LOG`, falling back to `strand=trace`. Safe to
/// call more than once: only the first call installs a subscriber, which
/// lets every test call it unconditionally.
///
/// Does nothing if the `tracing` feature is not enabled.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}

#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

#[cfg(feature = "tracing")]
#[allow(unused_imports)]
pub(crate) use tracing::{debug, error, info, trace, warn};

#[cfg(not(feature = "tracing"))]
macro_rules! discard {
    ($($arg:tt)*) => {
        ()
    };
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_imports)]
pub(crate) use discard as debug;
#[cfg(not(feature = "tracing"))]
#[allow(unused_imports)]
pub(crate) use discard as error;
#[cfg(not(feature = "tracing"))]
#[allow(unused_imports)]
pub(crate) use discard as info;
#[cfg(not(feature = "tracing"))]
#[allow(unused_imports)]
pub(crate) use discard as trace;
#[cfg(not(feature = "tracing"))]
#[allow(unused_imports)]
pub(crate) use discard as warn;
