//! Per-step diagnostics and wall-clock accounting.
//!
//! - [`StepRecord`]: One row of the coupled-run log
//! - [`DiagnosticLog`]: Append-only, line-flushed writer of step records
//! - [`StageTimers`]: Accumulated wall time per sub-solve
//! - [`ProgressReporter`]: Percent-of-span progress logging

mod record;
mod timing;

pub use record::{DiagnosticLog, LOG_HEADER, StepRecord};
pub use timing::{ProgressReporter, StageTimers, format_hms};
