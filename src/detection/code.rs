//! Detection values passed from the camera to the presentation boundary.

use crate::capture::{Symbology, SymbologySet};
use chrono::{DateTime, Utc};
use std::fmt;

/// A single candidate reported by the camera's metadata output.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataObject {
    /// A machine-readable code. `value` is `None` when the decoder saw the
    /// code but could not produce a string for it.
    MachineReadableCode {
        symbology: Symbology,
        value: Option<String>,
    },
    /// A detected face.
    Face { face_id: i64 },
    /// Any other metadata kind the hardware may emit.
    Other(String),
}

impl MetadataObject {
    /// Convenience constructor for a decoded code.
    pub fn code(symbology: Symbology, value: impl Into<String>) -> Self {
        MetadataObject::MachineReadableCode {
            symbology,
            value: Some(value.into()),
        }
    }
}

/// Candidates reported together from one analyzed frame.
#[derive(Debug, Clone, Default)]
pub struct DetectionBatch {
    objects: Vec<MetadataObject>,
    /// Sequence number of the analyzed frame.
    frame: u64,
}

impl DetectionBatch {
    pub fn new(objects: Vec<MetadataObject>, frame: u64) -> Self {
        Self { objects, frame }
    }

    #[inline]
    pub fn objects(&self) -> &[MetadataObject] {
        &self.objects
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns the first decoded code whose symbology is in `allowed`.
    ///
    /// Everything else in the batch is ignored.
    pub fn first_code(&self, allowed: &SymbologySet) -> Option<DetectedCode> {
        self.objects.iter().find_map(|object| match object {
            MetadataObject::MachineReadableCode {
                symbology,
                value: Some(value),
            } if allowed.contains(*symbology) => Some(DetectedCode::new(*symbology, value.clone())),
            _ => None,
        })
    }
}

/// A code selected for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCode {
    symbology: Symbology,
    value: String,
    detected_at: DateTime<Utc>,
}

impl DetectedCode {
    /// Creates a code stamped with the current time.
    pub fn new(symbology: Symbology, value: impl Into<String>) -> Self {
        Self {
            symbology,
            value: value.into(),
            detected_at: Utc::now(),
        }
    }

    #[inline]
    pub fn symbology(&self) -> Symbology {
        self.symbology
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[inline]
    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }

    /// Text for the result notice.
    pub fn alert_message(&self) -> String {
        format!("Type: {}\nValue: {}", self.symbology, self.value)
    }
}

impl fmt::Display for DetectedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.symbology, self.value)
    }
}
