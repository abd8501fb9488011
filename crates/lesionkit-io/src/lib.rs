pub mod cohort;
pub mod nifti_io;

pub use cohort::{load_cohort, patient_ids, CohortPaths};
pub use nifti_io::{read_raw_volume, read_volume, write_volume, RawVolume};
