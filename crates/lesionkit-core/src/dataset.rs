//! Cohort container and patient-level fan-out.

use burn::tensor::backend::Backend;
use rayon::prelude::*;

use crate::error::Result;
use crate::patient::Patient;

/// An ordered patient cohort.
///
/// The dataset owns its patients; traversal order is construction order
/// (the loader sorts by patient id). Cohort-wide operations fan out to
/// each patient and add no invariants of their own.
#[derive(Debug, Clone)]
pub struct Dataset<B: Backend> {
    patients: Vec<Patient<B>>,
}

impl<B: Backend> Dataset<B> {
    /// Create a dataset from fully-constructed patients.
    pub fn new(patients: Vec<Patient<B>>) -> Self {
        Self { patients }
    }

    /// Number of patients in the cohort.
    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    pub fn patients(&self) -> &[Patient<B>] {
        &self.patients
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Patient<B>> {
        self.patients.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Patient<B>> {
        self.patients.iter_mut()
    }

    /// Verify geometry for every patient, in collection order.
    ///
    /// Strict fail-fast: the first failing patient's error propagates
    /// immediately and later patients are never examined.
    pub fn verify_all_geometry(&self) -> Result<()> {
        for patient in &self.patients {
            patient.verify_geometry()?;
        }
        tracing::debug!(patients = self.patients.len(), "cohort geometry verified");
        Ok(())
    }

    /// Extract lesions for every patient.
    ///
    /// Patients share no state, so each runs on a rayon worker; there is
    /// no ordering requirement among them.
    pub fn extract_all_lesions(&mut self)
    where
        Patient<B>: Send,
    {
        self.patients.par_iter_mut().for_each(|patient| {
            patient.extract_lesions();
        });
    }

    /// Compute lesion volumes for every patient, in parallel.
    pub fn compute_all_lesion_volumes(&mut self)
    where
        Patient<B>: Send,
    {
        self.patients
            .par_iter_mut()
            .for_each(|patient| patient.compute_lesion_volumes());
    }

    /// Compute lesion centroids for every patient.
    ///
    /// Patients run in parallel, but results are collected in collection
    /// order and the reported error is the first failing patient in that
    /// order, matching the sequential contract.
    pub fn compute_all_lesion_centroids(&mut self) -> Result<()>
    where
        Patient<B>: Send,
    {
        let results: Vec<Result<()>> = self
            .patients
            .par_iter_mut()
            .map(|patient| patient.compute_lesion_centroids())
            .collect();
        results.into_iter().collect()
    }
}

impl<'a, B: Backend> IntoIterator for &'a Dataset<B> {
    type Item = &'a Patient<B>;
    type IntoIter = std::slice::Iter<'a, Patient<B>>;

    fn into_iter(self) -> Self::IntoIter {
        self.patients.iter()
    }
}

impl<B: Backend> IntoIterator for Dataset<B> {
    type Item = Patient<B>;
    type IntoIter = std::vec::IntoIter<Patient<B>>;

    fn into_iter(self) -> Self::IntoIter {
        self.patients.into_iter()
    }
}
