//! Patient entity: multi-volume ownership, geometry verification, and
//! lesion decomposition.

use std::collections::BTreeSet;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::error::{GeometryError, Result};
use crate::geometry::{affines_close, AffineSet, Spacing3, VolumeKind, AFFINE_TOLERANCE};
use crate::lesion::Lesion;

/// One subject's co-registered volumes and derived lesions.
///
/// A patient is constructed fully populated by the loader; there is no
/// partial-construction state. The documented stage order is
/// [`verify_geometry`](Patient::verify_geometry) →
/// [`extract_lesions`](Patient::extract_lesions) →
/// [`compute_lesion_volumes`](Patient::compute_lesion_volumes) →
/// [`compute_lesion_centroids`](Patient::compute_lesion_centroids);
/// each stage assumes the previous one completed successfully.
#[derive(Debug, Clone)]
pub struct Patient<B: Backend> {
    id: String,
    image: Tensor<B, 3>,
    label_mask: Tensor<B, 3>,
    region_mask: Tensor<B, 3>,
    affines: AffineSet,
    spacing: Spacing3,
    lesions: Vec<Lesion<B>>,
}

impl<B: Backend> Patient<B> {
    /// Create a fully-populated patient.
    ///
    /// # Arguments
    /// * `id` - Opaque identifier, unique within a dataset
    /// * `image` - Intensity volume, shape (X,Y,Z)
    /// * `label_mask` - Integer-labeled lesion volume, 0 = background
    /// * `region_mask` - Binary anatomical region volume
    /// * `affines` - Voxel-to-world affine per volume
    /// * `spacing` - Positive voxel edge lengths in mm
    pub fn new(
        id: String,
        image: Tensor<B, 3>,
        label_mask: Tensor<B, 3>,
        region_mask: Tensor<B, 3>,
        affines: AffineSet,
        spacing: Spacing3,
    ) -> Self {
        Self {
            id,
            image,
            label_mask,
            region_mask,
            affines,
            spacing,
            lesions: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn image(&self) -> &Tensor<B, 3> {
        &self.image
    }

    pub fn label_mask(&self) -> &Tensor<B, 3> {
        &self.label_mask
    }

    pub fn region_mask(&self) -> &Tensor<B, 3> {
        &self.region_mask
    }

    pub fn affines(&self) -> &AffineSet {
        &self.affines
    }

    pub fn spacing(&self) -> &Spacing3 {
        &self.spacing
    }

    /// Lesions produced by the last extraction, in ascending label order.
    pub fn lesions(&self) -> &[Lesion<B>] {
        &self.lesions
    }

    /// Replace the label mask.
    ///
    /// Existing lesions keep their old masks; callers re-verify and
    /// re-extract after replacing.
    pub fn set_label_mask(&mut self, label_mask: Tensor<B, 3>) {
        self.label_mask = label_mask;
    }

    /// Run the spatial consistency checks, in order: shapes, affines,
    /// mask values. The first failure halts the sequence.
    pub fn verify_geometry(&self) -> Result<()> {
        self.check_shapes()?;
        self.check_affines()?;
        self.check_mask_values()?;
        tracing::debug!(patient = %self.id, "geometry verified");
        Ok(())
    }

    /// All three volumes must share the image's voxel-grid shape.
    fn check_shapes(&self) -> Result<()> {
        let reference = self.image.shape().dims;
        for (kind, volume) in [
            (VolumeKind::Label, &self.label_mask),
            (VolumeKind::Region, &self.region_mask),
        ] {
            let actual = volume.shape().dims;
            if actual != reference {
                return Err(GeometryError::shape_mismatch(
                    &self.id,
                    kind,
                    reference.clone(),
                    actual,
                ));
            }
        }
        Ok(())
    }

    /// Every affine must agree with the image affine within
    /// [`AFFINE_TOLERANCE`] per element; the first disagreeing volume is
    /// reported.
    fn check_affines(&self) -> Result<()> {
        let reference = self.affines.image;
        for (kind, affine) in self.affines.iter() {
            if !affines_close(&reference, affine, AFFINE_TOLERANCE) {
                return Err(GeometryError::affine_mismatch(&self.id, kind));
            }
        }
        Ok(())
    }

    /// Label values must be exact integers; region values must be in
    /// {0, 1}.
    fn check_mask_values(&self) -> Result<()> {
        for value in tensor_values(&self.label_mask) {
            if value.fract() != 0.0 {
                return Err(GeometryError::invalid_label(&self.id, value));
            }
        }
        for value in tensor_values(&self.region_mask) {
            if value != 0.0 && value != 1.0 {
                return Err(GeometryError::invalid_region(&self.id, value));
            }
        }
        Ok(())
    }

    /// Decompose the label mask into one lesion per distinct positive
    /// label value, in ascending order.
    ///
    /// Extraction partitions by label value only: a label occupying
    /// several spatially disjoint voxel clusters is still one lesion.
    /// Re-invocation discards the previous lesion list and rebuilds it
    /// from the current label mask.
    pub fn extract_lesions(&mut self) -> &[Lesion<B>] {
        let values = tensor_values(&self.label_mask);
        let labels: BTreeSet<u32> = values
            .iter()
            .filter(|&&value| value > 0.0)
            .map(|&value| value as u32)
            .collect();

        let mut lesions = Vec::with_capacity(labels.len());
        for label in labels {
            let mask = self.label_mask.clone().equal_elem(label as f32);
            lesions.push(Lesion::new(label, mask, self.id.clone()));
        }

        tracing::debug!(patient = %self.id, lesions = lesions.len(), "extracted lesions");
        self.lesions = lesions;
        &self.lesions
    }

    /// Compute the volume of every extracted lesion, in extraction order.
    /// No-op when extraction has not populated the lesion list.
    pub fn compute_lesion_volumes(&mut self) {
        let spacing = self.spacing;
        for lesion in &mut self.lesions {
            lesion.compute_volume(&spacing);
        }
    }

    /// Compute the world-space centroid of every extracted lesion using
    /// the image affine, in extraction order. No-op on an empty lesion
    /// list.
    pub fn compute_lesion_centroids(&mut self) -> Result<()> {
        let affine = self.affines.image;
        for lesion in &mut self.lesions {
            lesion.compute_centroid(&affine)?;
        }
        Ok(())
    }
}

/// Pull a volume's voxel values to the CPU as f32.
fn tensor_values<B: Backend>(tensor: &Tensor<B, 3>) -> Vec<f32> {
    tensor
        .to_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .expect("converted tensor data is f32")
}
