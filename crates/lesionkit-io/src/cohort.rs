//! Cohort discovery and loading.
//!
//! A cohort on disk is three sibling directories of gzipped NIfTI files:
//! `<images>/<id>_0000.nii.gz` (first-channel intensity volume),
//! `<labels>/<id>.nii.gz`, and `<regions>/<id>.nii.gz`. Patient ids are
//! discovered from the labels directory and loaded in sorted order.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use burn::tensor::backend::Backend;
use rayon::prelude::*;
use tracing::{debug, info};

use lesionkit_core::{AffineSet, Dataset, Patient};

use crate::nifti_io::{read_raw_volume, RawVolume};

const NIFTI_SUFFIX: &str = ".nii.gz";

/// Directory layout of one cohort on disk.
#[derive(Debug, Clone)]
pub struct CohortPaths {
    pub images: PathBuf,
    pub labels: PathBuf,
    pub regions: PathBuf,
}

impl CohortPaths {
    pub fn new(
        images: impl Into<PathBuf>,
        labels: impl Into<PathBuf>,
        regions: impl Into<PathBuf>,
    ) -> Self {
        Self {
            images: images.into(),
            labels: labels.into(),
            regions: regions.into(),
        }
    }

    /// Conventional layout under one root: `images/`, `labels/`,
    /// `regions/`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(
            root.join("images"),
            root.join("labels"),
            root.join("regions"),
        )
    }
}

/// Patient ids discovered from the labels directory, sorted.
pub fn patient_ids(labels_dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(labels_dir)
        .with_context(|| format!("Failed to read labels directory {}", labels_dir.display()))?;

    let mut ids = Vec::new();
    for entry in entries {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(id) = name.strip_suffix(NIFTI_SUFFIX) {
            ids.push(id.to_string());
        }
    }
    ids.sort();
    Ok(ids)
}

struct RawPatient {
    id: String,
    image: RawVolume,
    label: RawVolume,
    region: RawVolume,
}

fn read_patient(paths: &CohortPaths, id: &str) -> Result<RawPatient> {
    let image = read_raw_volume(paths.images.join(format!("{id}_0000{NIFTI_SUFFIX}")))
        .with_context(|| format!("Failed to read image volume for patient {id}"))?;
    let label = read_raw_volume(paths.labels.join(format!("{id}{NIFTI_SUFFIX}")))
        .with_context(|| format!("Failed to read label mask for patient {id}"))?;
    let region = read_raw_volume(paths.regions.join(format!("{id}{NIFTI_SUFFIX}")))
        .with_context(|| format!("Failed to read region mask for patient {id}"))?;

    debug!(patient = %id, "read patient volumes");
    Ok(RawPatient {
        id: id.to_string(),
        image,
        label,
        region,
    })
}

/// Load every patient of a cohort into a dataset.
///
/// File reads run on rayon workers; tensors are assembled on the calling
/// thread. Each patient is constructed all-at-once with spacing taken
/// from its image volume; missing or unreadable files fail the whole
/// load with path context.
pub fn load_cohort<B: Backend>(paths: &CohortPaths, device: &B::Device) -> Result<Dataset<B>> {
    let ids = patient_ids(&paths.labels)?;
    if ids.is_empty() {
        bail!(
            "No {} label masks found in {}",
            NIFTI_SUFFIX,
            paths.labels.display()
        );
    }

    let raw: Vec<RawPatient> = ids
        .par_iter()
        .map(|id| read_patient(paths, id))
        .collect::<Result<Vec<_>>>()?;

    let mut patients = Vec::with_capacity(raw.len());
    for patient in raw {
        let affines = AffineSet {
            image: patient.image.affine,
            label: patient.label.affine,
            region: patient.region.affine,
        };
        let spacing = patient.image.spacing;
        patients.push(Patient::new(
            patient.id,
            patient.image.into_tensor(device),
            patient.label.into_tensor(device),
            patient.region.into_tensor(device),
            affines,
            spacing,
        ));
    }

    info!(patients = patients.len(), "loaded cohort");
    Ok(Dataset::new(patients))
}
