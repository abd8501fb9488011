//! Single-lesion entity and its geometric measurements.

use burn::tensor::backend::Backend;
use burn::tensor::{Bool, Tensor};
use nalgebra::Vector3;

use crate::error::{GeometryError, Result};
use crate::geometry::{voxel_to_world, voxel_volume, Affine4, Spacing3, WorldPoint3};

/// One lesion extracted from a patient's label mask.
///
/// A lesion owns a binary voxel mask with the same shape as the parent
/// image and derives scalar/vector measurements from it. It holds no
/// knowledge of sibling lesions and refers to its parent patient by
/// identifier only.
///
/// Volume and centroid start unset; they are filled by
/// [`compute_volume`](Lesion::compute_volume) and
/// [`compute_centroid`](Lesion::compute_centroid) and overwritten on
/// recomputation. Use [`has_volume`](Lesion::has_volume) /
/// [`has_centroid`](Lesion::has_centroid) to ask whether a stage has run.
#[derive(Debug, Clone)]
pub struct Lesion<B: Backend> {
    id: u32,
    mask: Tensor<B, 3, Bool>,
    patient_id: String,
    volume: Option<f64>,
    centroid: Option<WorldPoint3>,
}

impl<B: Backend> Lesion<B> {
    /// Create a lesion from its label id, binary mask, and parent id.
    pub fn new(id: u32, mask: Tensor<B, 3, Bool>, patient_id: String) -> Self {
        Self {
            id,
            mask,
            patient_id,
            volume: None,
            centroid: None,
        }
    }

    /// The positive label value this lesion was extracted from.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The binary voxel mask, true exactly where the label matched.
    pub fn mask(&self) -> &Tensor<B, 3, Bool> {
        &self.mask
    }

    /// Identifier of the owning patient.
    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    /// Physical volume in mm^3, if computed.
    pub fn volume(&self) -> Option<f64> {
        self.volume
    }

    /// World-space centroid in mm, if computed.
    pub fn centroid(&self) -> Option<WorldPoint3> {
        self.centroid
    }

    /// Whether the volume stage has run on this lesion.
    pub fn has_volume(&self) -> bool {
        self.volume.is_some()
    }

    /// Whether the centroid stage has run on this lesion.
    pub fn has_centroid(&self) -> bool {
        self.centroid.is_some()
    }

    /// Number of true voxels in the mask.
    pub fn voxel_count(&self) -> usize {
        let data = self.mask.to_data();
        let voxels = data.as_slice::<bool>().expect("mask data is bool");
        voxels.iter().filter(|&&inside| inside).count()
    }

    /// Compute the physical volume of this lesion.
    ///
    /// volume = (count of true voxels) * (spacing.x * spacing.y * spacing.z)
    ///
    /// An empty mask is not an error here and yields volume 0.
    ///
    /// # Arguments
    /// * `spacing` - The parent patient's voxel spacing in mm
    ///
    /// # Examples
    /// ```rust
    /// use burn::tensor::{Bool, Shape, Tensor, TensorData};
    /// use burn_ndarray::NdArray;
    /// use lesionkit_core::{Lesion, Spacing3};
    ///
    /// type Backend = NdArray<f32>;
    ///
    /// let device = Default::default();
    /// let mask = Tensor::<Backend, 3, Bool>::from_data(
    ///     TensorData::new(vec![true, false, true, false], Shape::new([1, 2, 2])),
    ///     &device,
    /// );
    ///
    /// let mut lesion = Lesion::new(1, mask, "case-001".to_string());
    /// assert_eq!(lesion.compute_volume(&Spacing3::new(1.0, 2.0, 3.0)), 12.0);
    /// assert!(lesion.has_volume());
    /// ```
    pub fn compute_volume(&mut self, spacing: &Spacing3) -> f64 {
        let volume = self.voxel_count() as f64 * voxel_volume(spacing);
        self.volume = Some(volume);
        volume
    }

    /// Compute the world-space centroid of this lesion.
    ///
    /// The centroid is the mean of the voxel-index coordinates of all true
    /// voxels, mapped through the parent's voxel-to-world affine.
    ///
    /// # Arguments
    /// * `affine` - The parent patient's image affine
    ///
    /// # Errors
    /// [`GeometryError::EmptyMask`] when the mask has zero true voxels;
    /// the centroid is undefined in that case and nothing is stored.
    pub fn compute_centroid(&mut self, affine: &Affine4) -> Result<WorldPoint3> {
        let dims: [usize; 3] = self
            .mask
            .shape()
            .dims
            .try_into()
            .expect("lesion masks are rank 3");
        let (ny, nz) = (dims[1], dims[2]);

        let data = self.mask.to_data();
        let voxels = data.as_slice::<bool>().expect("mask data is bool");

        let mut count = 0usize;
        let mut index_sum = Vector3::zeros();
        for (flat, &inside) in voxels.iter().enumerate() {
            if !inside {
                continue;
            }
            // Row-major flat index: flat = (x * ny + y) * nz + z.
            let x = flat / (ny * nz);
            let rest = flat % (ny * nz);
            index_sum += Vector3::new(x as f64, (rest / nz) as f64, (rest % nz) as f64);
            count += 1;
        }

        if count == 0 {
            return Err(GeometryError::empty_mask(&self.patient_id, self.id));
        }

        let centroid = voxel_to_world(affine, index_sum / count as f64);
        self.centroid = Some(centroid);
        Ok(centroid)
    }
}
