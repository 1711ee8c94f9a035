//! Whitespace-delimited step log.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// Header comment written as the first line of every log.
pub const LOG_HEADER: &str =
    "# simTime drag lift pressureDiff dispAx dispAy aleNorm aleTime flowTime beamTime flowIter beamIter";

/// Quantities recorded after a macro step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepRecord {
    pub sim_time: f64,
    pub drag: f64,
    pub lift: f64,
    /// Front minus back sampled pressure
    pub pressure_diff: f64,
    pub disp_ax: f64,
    pub disp_ay: f64,
    /// Norm of the accumulated mesh displacement
    pub ale_norm: f64,
    /// Accumulated wall time of the mesh solves (seconds)
    pub ale_time: f64,
    pub flow_time: f64,
    pub beam_time: f64,
    pub flow_iter: usize,
    pub beam_iter: usize,
}

impl StepRecord {
    /// Format as one log line (without newline).
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {} {} {} {} {} {} {} {} {}",
            self.sim_time,
            self.drag,
            self.lift,
            self.pressure_diff,
            self.disp_ax,
            self.disp_ay,
            self.ale_norm,
            self.ale_time,
            self.flow_time,
            self.beam_time,
            self.flow_iter,
            self.beam_iter
        )
    }
}

/// Append-only sink of step records. Every record is flushed so a run that
/// aborts leaves the log complete up to its last successful step.
pub struct DiagnosticLog<W: Write> {
    writer: W,
    records: usize,
}

impl DiagnosticLog<BufWriter<File>> {
    /// Create (truncate) a log file and write the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> DiagnosticLog<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "{}", LOG_HEADER)?;
        writer.flush()?;
        Ok(Self { writer, records: 0 })
    }

    pub fn append(&mut self, record: &StepRecord) -> Result<()> {
        writeln!(self.writer, "{}", record.to_line())?;
        self.writer.flush()?;
        self.records += 1;
        Ok(())
    }

    /// Number of records written.
    pub fn len(&self) -> usize {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
