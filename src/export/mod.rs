//! Export of physical fields during a coupled run.
//!
//! The engine does not serialize fields itself. Once per macro step, when
//! the sample density is non-zero, the coupler hands a [`FieldExporter`]
//! the labelled fields of that step together with a [`TimeCollection`]
//! that numbers the frames of the series.
//!
//! # Example
//! ```
//! use fsi_rs::export::TimeCollection;
//!
//! let mut series = TimeCollection::new("cylinder");
//! let frame = series.push(0.5);
//! assert_eq!(series.frame_name("velocity", frame), "cylinder_velocity_0000");
//! assert_eq!(series.times(), &[0.5]);
//! ```

use crate::error::Result;
use crate::field::PatchField;

/// One exported field with its label.
#[derive(Clone, Copy, Debug)]
pub struct LabelledField<'a> {
    pub label: &'static str,
    pub field: &'a PatchField,
}

/// Running index of exported frames: frame number to simulation time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeCollection {
    base_name: String,
    times: Vec<f64>,
}

impl TimeCollection {
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            times: Vec::new(),
        }
    }

    /// Register a frame at `time` and return its number.
    pub fn push(&mut self, time: f64) -> usize {
        self.times.push(time);
        self.times.len() - 1
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// File stem of a field in a frame, e.g. `base_label_0003`.
    pub fn frame_name(&self, label: &str, frame: usize) -> String {
        format!("{}_{}_{:04}", self.base_name, label, frame)
    }
}

/// Consumer of exported fields.
pub trait FieldExporter {
    /// Write one frame. `density` is the number of sample points per
    /// element direction, always non-zero.
    fn export(
        &mut self,
        fields: &[LabelledField<'_>],
        density: usize,
        collection: &mut TimeCollection,
        time: f64,
    ) -> Result<()>;
}
