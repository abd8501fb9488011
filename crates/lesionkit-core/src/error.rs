//! Error types for the cohort pipeline.
//!
//! Every variant names the patient it was detected on; geometric invalid
//! input stops that patient's pipeline run and propagates to the caller
//! unhandled.

use thiserror::Error;

use crate::geometry::VolumeKind;

/// Errors raised by geometry verification and lesion measurement.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Two of a patient's volumes disagree in voxel-grid shape.
    #[error("[{patient}] image / {volume} shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        patient: String,
        volume: VolumeKind,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A volume's affine disagrees with the image affine beyond tolerance.
    #[error("[{patient}] affine mismatch: {volume}")]
    AffineMismatch { patient: String, volume: VolumeKind },

    /// The label mask contains a non-integer value.
    #[error("[{patient}] non-integer label value {value}")]
    InvalidLabelValue { patient: String, value: f32 },

    /// The region mask contains a value outside {0, 1}.
    #[error("[{patient}] region value {value} outside {{0, 1}}")]
    InvalidRegionValue { patient: String, value: f32 },

    /// Centroid requested on a lesion with zero true voxels.
    #[error("[{patient}] lesion {label} has no voxels, centroid undefined")]
    EmptyMask { patient: String, label: u32 },
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, GeometryError>;

impl GeometryError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch(
        patient: impl Into<String>,
        volume: VolumeKind,
        expected: Vec<usize>,
        actual: Vec<usize>,
    ) -> Self {
        Self::ShapeMismatch {
            patient: patient.into(),
            volume,
            expected,
            actual,
        }
    }

    /// Create an affine mismatch error.
    pub fn affine_mismatch(patient: impl Into<String>, volume: VolumeKind) -> Self {
        Self::AffineMismatch {
            patient: patient.into(),
            volume,
        }
    }

    /// Create a non-integer label error.
    pub fn invalid_label(patient: impl Into<String>, value: f32) -> Self {
        Self::InvalidLabelValue {
            patient: patient.into(),
            value,
        }
    }

    /// Create a non-binary region error.
    pub fn invalid_region(patient: impl Into<String>, value: f32) -> Self {
        Self::InvalidRegionValue {
            patient: patient.into(),
            value,
        }
    }

    /// Create an empty mask error.
    pub fn empty_mask(patient: impl Into<String>, label: u32) -> Self {
        Self::EmptyMask {
            patient: patient.into(),
            label,
        }
    }

    /// The id of the patient this error was detected on.
    pub fn patient(&self) -> &str {
        match self {
            Self::ShapeMismatch { patient, .. }
            | Self::AffineMismatch { patient, .. }
            | Self::InvalidLabelValue { patient, .. }
            | Self::InvalidRegionValue { patient, .. }
            | Self::EmptyMask { patient, .. } => patient,
        }
    }
}
