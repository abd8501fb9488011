use burn::tensor::{Shape, Tensor, TensorData};
use burn_ndarray::NdArray;
use lesionkit_core::{
    Affine4, AffineSet, Dataset, GeometryError, Patient, Spacing3, VolumeKind,
};

type Backend = NdArray<f32>;

fn volume(values: Vec<f32>, shape: [usize; 3]) -> Tensor<Backend, 3> {
    let device = Default::default();
    Tensor::from_data(TensorData::new(values, Shape::new(shape)), &device)
}

fn zeros(shape: [usize; 3]) -> Tensor<Backend, 3> {
    let voxels: usize = shape.iter().product();
    volume(vec![0.0; voxels], shape)
}

fn valid_patient(id: &str, labels: Vec<f32>, shape: [usize; 3]) -> Patient<Backend> {
    Patient::new(
        id.to_string(),
        zeros(shape),
        volume(labels, shape),
        zeros(shape),
        AffineSet::uniform(Affine4::identity()),
        Spacing3::new(1.0, 1.0, 1.0),
    )
}

#[test]
fn valid_patient_verifies() {
    let patient = valid_patient("case-001", vec![0.0, 1.0, 2.0, 0.0], [1, 2, 2]);
    patient.verify_geometry().expect("geometry is consistent");
}

#[test]
fn label_shape_mismatch_names_label_volume() {
    let patient = Patient::new(
        "case-002".to_string(),
        zeros([2, 2, 2]),
        zeros([2, 2, 3]),
        zeros([2, 2, 2]),
        AffineSet::uniform(Affine4::identity()),
        Spacing3::new(1.0, 1.0, 1.0),
    );

    match patient.verify_geometry().unwrap_err() {
        GeometryError::ShapeMismatch {
            patient,
            volume,
            expected,
            actual,
        } => {
            assert_eq!(patient, "case-002");
            assert_eq!(volume, VolumeKind::Label);
            assert_eq!(expected, vec![2, 2, 2]);
            assert_eq!(actual, vec![2, 2, 3]);
        }
        other => panic!("expected shape mismatch, got {other:?}"),
    }
}

#[test]
fn region_shape_mismatch_names_region_volume() {
    let patient = Patient::new(
        "case-003".to_string(),
        zeros([2, 2, 2]),
        zeros([2, 2, 2]),
        zeros([1, 2, 2]),
        AffineSet::uniform(Affine4::identity()),
        Spacing3::new(1.0, 1.0, 1.0),
    );

    match patient.verify_geometry().unwrap_err() {
        GeometryError::ShapeMismatch { volume, .. } => assert_eq!(volume, VolumeKind::Region),
        other => panic!("expected shape mismatch, got {other:?}"),
    }
}

#[test]
fn affine_off_by_more_than_tolerance_fails() {
    let mut label_affine = Affine4::identity();
    label_affine[(0, 3)] = 1.1e-5;

    let mut affines = AffineSet::uniform(Affine4::identity());
    affines.label = label_affine;

    let patient = Patient::new(
        "case-004".to_string(),
        zeros([1, 1, 1]),
        zeros([1, 1, 1]),
        zeros([1, 1, 1]),
        affines,
        Spacing3::new(1.0, 1.0, 1.0),
    );

    match patient.verify_geometry().unwrap_err() {
        GeometryError::AffineMismatch { patient, volume } => {
            assert_eq!(patient, "case-004");
            assert_eq!(volume, VolumeKind::Label);
        }
        other => panic!("expected affine mismatch, got {other:?}"),
    }
}

#[test]
fn affine_exactly_at_tolerance_passes() {
    let mut region_affine = Affine4::identity();
    region_affine[(1, 3)] = 1e-5;

    let mut affines = AffineSet::uniform(Affine4::identity());
    affines.region = region_affine;

    let patient = Patient::new(
        "case-005".to_string(),
        zeros([1, 1, 1]),
        zeros([1, 1, 1]),
        zeros([1, 1, 1]),
        affines,
        Spacing3::new(1.0, 1.0, 1.0),
    );

    patient.verify_geometry().expect("at-tolerance affines agree");
}

#[test]
fn fractional_label_fails_verification() {
    let patient = valid_patient("case-006", vec![0.0, 1.5, 0.0, 0.0], [1, 2, 2]);
    match patient.verify_geometry().unwrap_err() {
        GeometryError::InvalidLabelValue { patient, value } => {
            assert_eq!(patient, "case-006");
            assert_eq!(value, 1.5);
        }
        other => panic!("expected invalid label, got {other:?}"),
    }
}

#[test]
fn non_binary_region_fails_verification() {
    let patient = Patient::new(
        "case-007".to_string(),
        zeros([1, 2, 2]),
        zeros([1, 2, 2]),
        volume(vec![0.0, 1.0, 2.0, 0.0], [1, 2, 2]),
        AffineSet::uniform(Affine4::identity()),
        Spacing3::new(1.0, 1.0, 1.0),
    );

    match patient.verify_geometry().unwrap_err() {
        GeometryError::InvalidRegionValue { value, .. } => assert_eq!(value, 2.0),
        other => panic!("expected invalid region, got {other:?}"),
    }
}

#[test]
fn extraction_yields_ascending_labels_and_partitions_voxels() {
    // Label values {0, 2, 2, 5}: no label 1, two lesions expected.
    let mut patient = valid_patient("case-008", vec![0.0, 2.0, 2.0, 5.0], [1, 2, 2]);
    let ids: Vec<u32> = patient.extract_lesions().iter().map(|l| l.id()).collect();
    assert_eq!(ids, vec![2, 5]);

    let mask_voxels: usize = patient.lesions().iter().map(|l| l.voxel_count()).sum();
    assert_eq!(mask_voxels, 3);
}

#[test]
fn volume_is_linear_in_spacing() {
    let labels: Vec<f32> = (0..16).map(|i| if i < 10 { 1.0 } else { 0.0 }).collect();
    let mut patient = Patient::new(
        "case-009".to_string(),
        zeros([4, 2, 2]),
        volume(labels.clone(), [4, 2, 2]),
        zeros([4, 2, 2]),
        AffineSet::uniform(Affine4::identity()),
        Spacing3::new(1.0, 1.0, 1.0),
    );
    patient.extract_lesions();
    patient.compute_lesion_volumes();
    assert_eq!(patient.lesions()[0].volume(), Some(10.0));

    let mut doubled = Patient::new(
        "case-009".to_string(),
        zeros([4, 2, 2]),
        volume(labels, [4, 2, 2]),
        zeros([4, 2, 2]),
        AffineSet::uniform(Affine4::identity()),
        Spacing3::new(2.0, 1.0, 1.0),
    );
    doubled.extract_lesions();
    doubled.compute_lesion_volumes();
    assert_eq!(doubled.lesions()[0].volume(), Some(20.0));
}

#[test]
fn centroid_uses_image_affine() {
    // True voxels at (0,0,0) and (2,0,0) under an identity affine.
    let mut patient = Patient::new(
        "case-010".to_string(),
        zeros([3, 1, 1]),
        volume(vec![1.0, 0.0, 1.0], [3, 1, 1]),
        zeros([3, 1, 1]),
        AffineSet::uniform(Affine4::identity()),
        Spacing3::new(1.0, 1.0, 1.0),
    );
    patient.extract_lesions();
    patient
        .compute_lesion_centroids()
        .expect("lesion is non-empty");

    let centroid = patient.lesions()[0].centroid().expect("centroid computed");
    assert_eq!(centroid.x, 1.0);
    assert_eq!(centroid.y, 0.0);
    assert_eq!(centroid.z, 0.0);
}

#[test]
fn cohort_verification_stops_at_first_failing_patient() {
    let good_a = valid_patient("case-a", vec![0.0; 4], [1, 2, 2]);
    let bad_b = Patient::new(
        "case-b".to_string(),
        zeros([1, 2, 2]),
        zeros([2, 2, 2]),
        zeros([1, 2, 2]),
        AffineSet::uniform(Affine4::identity()),
        Spacing3::new(1.0, 1.0, 1.0),
    );
    // Also invalid; must never be examined once case-b fails.
    let bad_c = valid_patient("case-c", vec![0.5; 4], [1, 2, 2]);

    let dataset = Dataset::new(vec![good_a, bad_b, bad_c]);
    let err = dataset.verify_all_geometry().unwrap_err();
    assert_eq!(err.patient(), "case-b");
}

#[test]
fn cohort_fanout_measures_every_lesion() {
    let patients = vec![
        valid_patient("case-a", vec![0.0, 1.0, 1.0, 2.0], [1, 2, 2]),
        valid_patient("case-b", vec![3.0, 0.0, 0.0, 3.0], [1, 2, 2]),
        valid_patient("case-c", vec![0.0; 4], [1, 2, 2]),
    ];
    let mut dataset = Dataset::new(patients);

    dataset.verify_all_geometry().expect("cohort is valid");
    dataset.extract_all_lesions();
    dataset.compute_all_lesion_volumes();
    dataset
        .compute_all_lesion_centroids()
        .expect("no empty lesion masks");

    let lesion_count: usize = dataset.iter().map(|p| p.lesions().len()).sum();
    assert_eq!(lesion_count, 3);

    for patient in &dataset {
        for lesion in patient.lesions() {
            assert!(lesion.has_volume());
            assert!(lesion.has_centroid());
            assert_eq!(lesion.patient_id(), patient.id());
        }
    }
}
