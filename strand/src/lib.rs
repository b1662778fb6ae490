//! Ownership of a single OS thread with cooperative teardown.
//!
//! - [`ManagedThread`] - owns at most one running thread, started with
//!   [`ManagedThread::start`] and stopped and joined when dropped
//! - [`ThreadBody`] - the work run on that thread
//! - [`StopToken`] - per-run stop flag handed to the body
//!
//! Enable the `tracing` feature for structured logs and call
//! [`init_tracing`] once at startup.

pub mod config;
pub mod error;
pub mod stop;
pub mod thread;
pub mod topology;
mod trace;

pub use config::{ThreadConfig, Timeout};
pub use error::{JoinError, StartError};
pub use stop::StopToken;
pub use thread::{ManagedThread, ThreadBody, ThreadState, ThreadStatus};
pub use topology::CpuConfig;
pub use trace::init_tracing;
