pub mod dataset;
pub mod error;
pub mod geometry;
pub mod lesion;
pub mod patient;

pub use dataset::Dataset;
pub use error::{GeometryError, Result};
pub use geometry::{Affine4, AffineSet, Spacing3, VolumeKind, WorldPoint3, AFFINE_TOLERANCE};
pub use lesion::Lesion;
pub use patient::Patient;
