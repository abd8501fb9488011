use std::path::Path;

use anyhow::{bail, Context, Result};
use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use nalgebra::Matrix4;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use lesionkit_core::{Affine4, Spacing3};

/// One NIfTI volume pulled into memory, before tensor construction.
///
/// Voxel data is flattened in (x, y, z) index order: voxel (i, j, k) sits
/// at flat index (i * ny + j) * nz + k, so `affine * (i, j, k, 1)` is that
/// voxel's world position.
#[derive(Debug, Clone)]
pub struct RawVolume {
    pub data: Vec<f32>,
    pub shape: [usize; 3],
    pub affine: Affine4,
    pub spacing: Spacing3,
}

impl RawVolume {
    /// Move the voxel data onto a backend device.
    pub fn into_tensor<B: Backend>(self, device: &B::Device) -> Tensor<B, 3> {
        let data = TensorData::new(self.data, Shape::new(self.shape));
        Tensor::from_data(data, device)
    }
}

/// Read a 3D NIfTI file into memory.
pub fn read_raw_volume<P: AsRef<Path>>(path: P) -> Result<RawVolume> {
    let path = path.as_ref();
    let obj = ReaderOptions::new()
        .read_file(path)
        .context("Failed to read NIfTI file")?;
    let header = obj.header();

    let affine = affine_from_header(header);
    let spacing = spacing_from_header(header);
    if spacing.min() <= 0.0 {
        bail!(
            "Non-positive voxel spacing {:?} in {}",
            [spacing.x, spacing.y, spacing.z],
            path.display()
        );
    }

    let volume = obj.into_volume();
    let array = volume
        .into_ndarray::<f32>()
        .context("Failed to convert volume to ndarray")?;
    if array.ndim() != 3 {
        bail!("Expected 3D NIfTI file, found {} dimensions", array.ndim());
    }
    let shape = [array.shape()[0], array.shape()[1], array.shape()[2]];

    // Logical-order iteration flattens to (x, y, z) row-major regardless of
    // the source array's memory layout.
    let data: Vec<f32> = array.iter().copied().collect();

    Ok(RawVolume {
        data,
        shape,
        affine,
        spacing,
    })
}

/// Read a 3D NIfTI file directly onto a backend device.
pub fn read_volume<B: Backend, P: AsRef<Path>>(
    path: P,
    device: &B::Device,
) -> Result<(Tensor<B, 3>, Affine4, Spacing3)> {
    let raw = read_raw_volume(path)?;
    let affine = raw.affine;
    let spacing = raw.spacing;
    Ok((raw.into_tensor(device), affine, spacing))
}

/// Voxel-to-world affine per the NIfTI standard: sform rows when present,
/// else the qform quaternion, else pixdim scaling only.
fn affine_from_header(header: &NiftiHeader) -> Affine4 {
    let rows: [[f32; 4]; 3] = if header.sform_code > 0 {
        [header.srow_x, header.srow_y, header.srow_z]
    } else if header.qform_code > 0 {
        let b = header.quatern_b;
        let c = header.quatern_c;
        let d = header.quatern_d;
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();

        let qfac = if header.pixdim[0] == 0.0 {
            1.0
        } else {
            header.pixdim[0]
        };

        let r11 = a * a + b * b - c * c - d * d;
        let r12 = 2.0 * b * c - 2.0 * a * d;
        let r13 = 2.0 * b * d + 2.0 * a * c;

        let r21 = 2.0 * b * c + 2.0 * a * d;
        let r22 = a * a + c * c - b * b - d * d;
        let r23 = 2.0 * c * d - 2.0 * a * b;

        let r31 = 2.0 * b * d - 2.0 * a * c;
        let r32 = 2.0 * c * d + 2.0 * a * b;
        let r33 = a * a + d * d - c * c - b * b;

        let dx = header.pixdim[1];
        let dy = header.pixdim[2];
        let dz = header.pixdim[3] * qfac;

        [
            [r11 * dx, r12 * dy, r13 * dz, header.quatern_x],
            [r21 * dx, r22 * dy, r23 * dz, header.quatern_y],
            [r31 * dx, r32 * dy, r33 * dz, header.quatern_z],
        ]
    } else {
        [
            [header.pixdim[1], 0.0, 0.0, 0.0],
            [0.0, header.pixdim[2], 0.0, 0.0],
            [0.0, 0.0, header.pixdim[3], 0.0],
        ]
    };

    #[rustfmt::skip]
    let affine = Matrix4::new(
        rows[0][0] as f64, rows[0][1] as f64, rows[0][2] as f64, rows[0][3] as f64,
        rows[1][0] as f64, rows[1][1] as f64, rows[1][2] as f64, rows[1][3] as f64,
        rows[2][0] as f64, rows[2][1] as f64, rows[2][2] as f64, rows[2][3] as f64,
        0.0, 0.0, 0.0, 1.0,
    );
    affine
}

/// Voxel spacing from the header zooms (pixdim[1..=3]).
fn spacing_from_header(header: &NiftiHeader) -> Spacing3 {
    Spacing3::new(
        header.pixdim[1] as f64,
        header.pixdim[2] as f64,
        header.pixdim[3] as f64,
    )
}

/// Write a 3D volume to a NIfTI file with an sform affine.
///
/// # Arguments
/// * `path` - Destination path; a `.nii.gz` suffix selects gzip output
/// * `data` - Voxel values in (x, y, z) row-major order
/// * `shape` - Grid dimensions (x, y, z)
/// * `affine` - Voxel-to-world transform stored as the sform
/// * `spacing` - Voxel spacing stored in pixdim
pub fn write_volume<P: AsRef<Path>>(
    path: P,
    data: &[f32],
    shape: [usize; 3],
    affine: &Affine4,
    spacing: &Spacing3,
) -> Result<()> {
    use ndarray::Array3;
    use nifti::writer::WriterOptions;

    let array = Array3::from_shape_vec((shape[0], shape[1], shape[2]), data.to_vec())
        .map_err(|e| anyhow::anyhow!("Failed to create ndarray: {}", e))?;

    let srow = |r: usize| -> [f32; 4] {
        [
            affine[(r, 0)] as f32,
            affine[(r, 1)] as f32,
            affine[(r, 2)] as f32,
            affine[(r, 3)] as f32,
        ]
    };
    let header = NiftiHeader {
        pixdim: [
            1.0,
            spacing.x as f32,
            spacing.y as f32,
            spacing.z as f32,
            1.0,
            1.0,
            1.0,
            1.0,
        ],
        sform_code: 1,
        srow_x: srow(0),
        srow_y: srow(1),
        srow_z: srow(2),
        ..NiftiHeader::default()
    };

    WriterOptions::new(path.as_ref())
        .reference_header(&header)
        .write_nifti(&array)
        .map_err(|e| anyhow::anyhow!("Failed to write NIfTI file: {}", e))?;

    Ok(())
}
