//! Wall-clock accounting and progress reporting.

use std::time::{Duration, Instant};

/// Accumulated wall time of the three sub-solves of a coupled step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTimers {
    pub structure: Duration,
    pub mesh: Duration,
    pub flow: Duration,
}

impl StageTimers {
    pub fn total(&self) -> Duration {
        self.structure + self.mesh + self.flow
    }

    /// Run `f`, adding its wall time to `slot`.
    pub fn time<T>(slot: &mut Duration, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        *slot += start.elapsed();
        out
    }

    pub fn summary_line(&self) -> String {
        format!(
            "total {} | mesh {} | flow {} | structure {}",
            format_hms(self.total()),
            format_hms(self.mesh),
            format_hms(self.flow),
            format_hms(self.structure)
        )
    }
}

/// Format a duration as `h:mm:ss.s`.
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    let hours = (secs / 3600.0).floor();
    let mins = ((secs - hours * 3600.0) / 60.0).floor();
    let s = secs - hours * 3600.0 - mins * 60.0;
    format!("{:.0}:{:02.0}:{:04.1}", hours, mins, s)
}

/// Progress logger for long coupled runs.
#[derive(Clone, Debug)]
pub struct ProgressReporter {
    start_instant: Instant,
    total_sim_time: f64,
    last_reported_pct: u32,
    report_interval_pct: u32,
    n_steps: usize,
}

impl ProgressReporter {
    /// # Arguments
    /// * `total_sim_time` - Simulation time to reach
    /// * `report_interval_pct` - Report every N percent
    pub fn new(total_sim_time: f64, report_interval_pct: u32) -> Self {
        Self {
            start_instant: Instant::now(),
            total_sim_time,
            last_reported_pct: 0,
            report_interval_pct: report_interval_pct.max(1),
            n_steps: 0,
        }
    }

    pub fn step(&mut self) {
        self.n_steps += 1;
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Log progress if the next threshold was crossed; returns whether it did.
    pub fn maybe_report(&mut self, current_time: f64) -> bool {
        let pct = ((current_time / self.total_sim_time) * 100.0).clamp(0.0, 100.0) as u32;
        let threshold = self.last_reported_pct + self.report_interval_pct;

        if pct >= threshold {
            self.report(current_time);
            self.last_reported_pct = (pct / self.report_interval_pct) * self.report_interval_pct;
            true
        } else {
            false
        }
    }

    pub fn report(&self, current_time: f64) {
        let elapsed = self.start_instant.elapsed();
        let pct = (current_time / self.total_sim_time) * 100.0;

        let eta = if pct > 0.1 {
            let total_estimated = elapsed.as_secs_f64() * 100.0 / pct;
            format_hms(Duration::from_secs_f64(
                (total_estimated - elapsed.as_secs_f64()).max(0.0),
            ))
        } else {
            "calculating...".to_string()
        };

        log::info!(
            "[{:>5.1}%] t = {:.4} | step {} | elapsed {} | ETA {}",
            pct,
            current_time,
            self.n_steps,
            format_hms(elapsed),
            eta
        );
    }

    pub fn elapsed(&self) -> Duration {
        self.start_instant.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(Duration::from_secs_f64(5.3)), "0:00:05.3");
        assert_eq!(format_hms(Duration::from_secs(61)), "0:01:01.0");
        assert_eq!(format_hms(Duration::from_secs(3 * 3600 + 7 * 60 + 30)), "3:07:30.0");
    }

    #[test]
    fn test_stage_timers() {
        let mut timers = StageTimers::default();
        let value = StageTimers::time(&mut timers.flow, || 42);
        assert_eq!(value, 42);
        timers.mesh += Duration::from_millis(10);
        assert!(timers.total() >= Duration::from_millis(10));
        assert!(timers.summary_line().contains("mesh 0:00:00.0"));
    }

    #[test]
    fn test_progress_thresholds() {
        let mut progress = ProgressReporter::new(1.0, 25);
        assert!(!progress.maybe_report(0.1));
        assert!(progress.maybe_report(0.3));
        assert!(!progress.maybe_report(0.4));
        assert!(progress.maybe_report(1.0));
        assert!(!progress.maybe_report(1.0));
    }
}
