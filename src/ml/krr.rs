//! Training set, solver and persisted model for kernel ridge regression

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use super::{Kernel, KrrParams, MlError};
use crate::descriptor::Descriptor;
use crate::logging::{facade, Logger};

/// Kernel memory above which training warns, in GB
pub const DEFAULT_MEMORY_WARNING_GB: f64 = 4.0;

/// Descriptors and targets accumulated before training.
///
/// Descriptor `i` always pairs with target `i`: both grow together in
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    descriptors: Vec<Descriptor>,
    targets: Vec<f64>,
}

impl TrainingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch of descriptors with their targets
    pub fn add(&mut self, descriptors: Vec<Descriptor>, targets: Vec<f64>) -> Result<(), MlError> {
        if descriptors.len() != targets.len() {
            return Err(MlError::TrainingSizeMismatch {
                descriptors: descriptors.len(),
                targets: targets.len(),
            });
        }
        let expected = self
            .descriptors
            .first()
            .or_else(|| descriptors.first())
            .map(|d| d.len());
        if let Some(expected) = expected {
            if let Some(bad) = descriptors.iter().find(|d| d.len() != expected) {
                return Err(MlError::DescriptorLengthMismatch {
                    expected,
                    found: bad.len(),
                });
            }
        }
        self.descriptors.extend(descriptors);
        self.targets.extend(targets);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }
}

/// A trained model: the training descriptors and their dual coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KrrModel {
    pub kernel: Kernel,
    pub sigma: f64,
    pub descriptors: Vec<Descriptor>,
    pub alpha: DVector<f64>,
}

impl KrrModel {
    /// Length every query descriptor must have
    pub fn descriptor_len(&self) -> usize {
        self.descriptors.first().map_or(0, |d| d.len())
    }

    /// Predict one value per query descriptor
    pub fn predict(&self, queries: &[Descriptor]) -> Result<Vec<f64>, MlError> {
        let expected = self.descriptor_len();
        if let Some(bad) = queries.iter().find(|q| q.len() != expected) {
            return Err(MlError::DescriptorLengthMismatch {
                expected,
                found: bad.len(),
            });
        }

        Ok(queries
            .par_iter()
            .map(|q| {
                self.descriptors
                    .iter()
                    .zip(self.alpha.iter())
                    .map(|(d, a)| self.kernel.evaluate(q, d, self.sigma) * a)
                    .sum()
            })
            .collect())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), MlError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MlError> {
        let reader = BufReader::new(File::open(path)?);
        let model: KrrModel = serde_json::from_reader(reader)?;
        if model.descriptors.len() != model.alpha.len() {
            return Err(MlError::TrainingSizeMismatch {
                descriptors: model.descriptors.len(),
                targets: model.alpha.len(),
            });
        }
        Ok(model)
    }
}

/// Kernel ridge regression: solves (K + λI) α = y and predicts with α
pub struct KernelRidge {
    model: Option<KrrModel>,
    memory_warning_gb: f64,
    logger: Arc<dyn Logger>,
}

impl Default for KernelRidge {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelRidge {
    pub fn new() -> Self {
        Self {
            model: None,
            memory_warning_gb: DEFAULT_MEMORY_WARNING_GB,
            logger: facade("cliff::ml"),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_memory_warning(mut self, gigabytes: f64) -> Self {
        self.memory_warning_gb = gigabytes;
        self
    }

    pub fn from_model(model: KrrModel) -> Self {
        Self::new().with_model(model)
    }

    pub fn with_model(mut self, model: KrrModel) -> Self {
        self.model = Some(model);
        self
    }

    pub fn model(&self) -> Option<&KrrModel> {
        self.model.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    /// Fit the model to `set`. Any previously held model is dropped first,
    /// so a failed fit leaves the regressor untrained.
    pub fn train(&mut self, set: &TrainingSet, params: &KrrParams) -> Result<(), MlError> {
        self.model = None;
        params.validate()?;
        if set.is_empty() {
            return Err(MlError::EmptyTrainingSet);
        }

        let n = set.len();
        let gigabytes = 8.0 * (n as f64).powi(2) / 1e9;
        self.logger.info(format_args!(
            "building kernel matrix of size ({}, {}); {:7.4} Gbytes",
            n, n, gigabytes
        ));
        if gigabytes > self.memory_warning_gb {
            self.logger.warn(format_args!(
                "kernel matrix needs {:.2} GB, above the {:.2} GB threshold",
                gigabytes, self.memory_warning_gb
            ));
        }

        let kmat = kernel_matrix(set.descriptors(), params.kernel, params.sigma)
            + DMatrix::identity(n, n) * params.lambda;
        let targets = DVector::from_column_slice(set.targets());

        let finite = |v: &DVector<f64>| v.iter().all(|a| a.is_finite());
        let alpha = match kmat.clone().cholesky().map(|chol| chol.solve(&targets)) {
            Some(alpha) if finite(&alpha) => alpha,
            _ => {
                self.logger
                    .debug(format_args!("Cholesky factorisation failed, falling back to LU"));
                kmat.lu()
                    .solve(&targets)
                    .filter(|alpha| finite(alpha))
                    .ok_or(MlError::SingularKernel)?
            }
        };

        self.model = Some(KrrModel {
            kernel: params.kernel,
            sigma: params.sigma,
            descriptors: set.descriptors().to_vec(),
            alpha,
        });
        self.logger.info(format_args!("training finished."));
        Ok(())
    }

    pub fn predict(&self, queries: &[Descriptor]) -> Result<Vec<f64>, MlError> {
        self.model
            .as_ref()
            .ok_or(MlError::ModelNotTrained)?
            .predict(queries)
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), MlError> {
        let model = KrrModel::load(path.as_ref())?;
        self.logger.info(format_args!(
            "Read {} training descriptors from {}",
            model.descriptors.len(),
            path.as_ref().display()
        ));
        self.model = Some(model);
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), MlError> {
        self.model
            .as_ref()
            .ok_or(MlError::ModelNotTrained)?
            .save(path)
    }
}

/// Symmetric kernel matrix over `descriptors`, rows computed in parallel
pub fn kernel_matrix(descriptors: &[Descriptor], kernel: Kernel, sigma: f64) -> DMatrix<f64> {
    let n = descriptors.len();
    let values: Vec<f64> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| (0..n).map(move |j| kernel.evaluate(&descriptors[i], &descriptors[j], sigma)))
        .collect();
    DMatrix::from_row_slice(n, n, &values)
}
