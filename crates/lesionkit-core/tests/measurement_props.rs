use burn::tensor::{Bool, Shape, Tensor, TensorData};
use burn_ndarray::NdArray;
use lesionkit_core::{Affine4, Lesion, Spacing3};
use proptest::prelude::*;

type Backend = NdArray<f32>;

fn mask_strategy() -> impl Strategy<Value = ([usize; 3], Vec<bool>)> {
    (1usize..=4, 1usize..=4, 1usize..=4).prop_flat_map(|(nx, ny, nz)| {
        proptest::collection::vec(any::<bool>(), nx * ny * nz)
            .prop_map(move |bits| ([nx, ny, nz], bits))
    })
}

fn lesion(shape: [usize; 3], bits: Vec<bool>) -> Lesion<Backend> {
    let device = Default::default();
    let mask =
        Tensor::<Backend, 3, Bool>::from_data(TensorData::new(bits, Shape::new(shape)), &device);
    Lesion::new(1, mask, "prop-case".to_string())
}

proptest! {
    #[test]
    fn volume_doubles_with_each_spacing_component(
        (shape, bits) in mask_strategy(),
        sx in 0.1f64..5.0, sy in 0.1f64..5.0, sz in 0.1f64..5.0,
    ) {
        let base = lesion(shape, bits.clone()).compute_volume(&Spacing3::new(sx, sy, sz));

        let spacings = [
            Spacing3::new(2.0 * sx, sy, sz),
            Spacing3::new(sx, 2.0 * sy, sz),
            Spacing3::new(sx, sy, 2.0 * sz),
        ];
        for spacing in spacings {
            let doubled = lesion(shape, bits.clone()).compute_volume(&spacing);
            prop_assert!(
                (doubled - 2.0 * base).abs() <= 1e-9 * base.max(1.0),
                "expected {} to be twice {}",
                doubled,
                base
            );
        }
    }

    #[test]
    fn volume_counts_voxels_under_unit_spacing(
        (shape, bits) in mask_strategy(),
    ) {
        let expected = bits.iter().filter(|&&b| b).count() as f64;
        let volume = lesion(shape, bits).compute_volume(&Spacing3::new(1.0, 1.0, 1.0));
        prop_assert!((volume - expected).abs() < 1e-12);
    }

    #[test]
    fn centroid_stays_inside_voxel_bounds(
        (shape, bits) in mask_strategy(),
    ) {
        prop_assume!(bits.iter().any(|&b| b));

        let centroid = lesion(shape, bits)
            .compute_centroid(&Affine4::identity())
            .unwrap();

        prop_assert!(centroid.x >= 0.0 && centroid.x <= (shape[0] - 1) as f64);
        prop_assert!(centroid.y >= 0.0 && centroid.y <= (shape[1] - 1) as f64);
        prop_assert!(centroid.z >= 0.0 && centroid.z <= (shape[2] - 1) as f64);
    }
}
