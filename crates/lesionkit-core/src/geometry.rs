//! Spatial types shared across the pipeline.
//!
//! Voxel grids are indexed as (x, y, z); world coordinates are millimeters.
//! The voxel-to-world mapping is a 4x4 affine applied to homogeneous voxel
//! indices.

use nalgebra::{Matrix4, Point3, Vector3, Vector4};

/// Physical edge lengths of one voxel along each axis, in mm.
pub type Spacing3 = Vector3<f64>;

/// 4x4 voxel-to-world transform in homogeneous coordinates.
pub type Affine4 = Matrix4<f64>;

/// A position in world space, in mm.
pub type WorldPoint3 = Point3<f64>;

/// Absolute per-element tolerance for affine agreement.
pub const AFFINE_TOLERANCE: f64 = 1e-5;

/// Names of the three co-registered volumes a patient carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKind {
    Image,
    Label,
    Region,
}

impl std::fmt::Display for VolumeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeKind::Image => write!(f, "image"),
            VolumeKind::Label => write!(f, "label"),
            VolumeKind::Region => write!(f, "region"),
        }
    }
}

/// Per-volume voxel-to-world affines, keyed by [`VolumeKind`].
///
/// The image affine is the reference frame for geometry verification.
#[derive(Debug, Clone)]
pub struct AffineSet {
    pub image: Affine4,
    pub label: Affine4,
    pub region: Affine4,
}

impl AffineSet {
    /// Build a set with the same affine for all three volumes.
    pub fn uniform(affine: Affine4) -> Self {
        Self {
            image: affine,
            label: affine,
            region: affine,
        }
    }

    /// Look up the affine for a volume.
    pub fn get(&self, kind: VolumeKind) -> &Affine4 {
        match kind {
            VolumeKind::Image => &self.image,
            VolumeKind::Label => &self.label,
            VolumeKind::Region => &self.region,
        }
    }

    /// Iterate the entries in the fixed order image, label, region.
    pub fn iter(&self) -> impl Iterator<Item = (VolumeKind, &Affine4)> {
        [
            (VolumeKind::Image, &self.image),
            (VolumeKind::Label, &self.label),
            (VolumeKind::Region, &self.region),
        ]
        .into_iter()
    }
}

/// Whether two affines agree within an absolute per-element tolerance.
pub fn affines_close(a: &Affine4, b: &Affine4, tol: f64) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tol)
}

/// Physical volume of a single voxel, in mm^3.
pub fn voxel_volume(spacing: &Spacing3) -> f64 {
    spacing.x * spacing.y * spacing.z
}

/// Map a continuous voxel index to world space.
///
/// The index is extended with a homogeneous 1.0 and multiplied by the
/// affine; the first three components of the result are returned.
///
/// # Examples
/// ```rust
/// use nalgebra::Matrix4;
/// use lesionkit_core::geometry::voxel_to_world;
///
/// let mut affine = Matrix4::identity();
/// affine[(0, 3)] = 10.0;
///
/// let world = voxel_to_world(&affine, nalgebra::Vector3::new(1.0, 2.0, 3.0));
/// assert_eq!(world, nalgebra::Point3::new(11.0, 2.0, 3.0));
/// ```
pub fn voxel_to_world(affine: &Affine4, index: Vector3<f64>) -> WorldPoint3 {
    let homogeneous = affine * Vector4::new(index.x, index.y, index.z, 1.0);
    WorldPoint3::new(homogeneous.x, homogeneous.y, homogeneous.z)
}
