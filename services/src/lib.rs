//! Shared runtime helpers used across the workspace.
//!
//! - [`cancel`]: cooperative cancellation propagated from the request boundary.
//! - [`deadline`]: per-call timeouts that surface as typed failures.
//! - [`metering`]: usage accounting sink (token counts per operation).
//! - [`scheduler`]: background task enqueueing interface.
//! - [`telemetry`]: tracing bootstrap for entrypoints and tests.

pub mod cancel;
pub mod deadline;
pub mod metering;
pub mod scheduler;
pub mod telemetry;

pub use cancel::{CancelSource, CancelToken, Cancelled};
pub use deadline::{Elapsed, bounded};
pub use metering::{MeterEvent, MeterRecord, MeteringSink, NullMeter, RecordingMeter};
pub use scheduler::{NullScheduler, Scheduler};
