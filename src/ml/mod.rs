//! Kernel ridge regression for per-atom properties

pub mod krr;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::math::{euclidean_distance, manhattan_distance};

pub use krr::{KernelRidge, KrrModel, TrainingSet};

/// Errors that can occur while training or evaluating a regression model
#[derive(Error, Debug)]
pub enum MlError {
    #[error("Training set size mismatch: {descriptors} descriptors but {targets} targets")]
    TrainingSizeMismatch { descriptors: usize, targets: usize },

    #[error("Descriptor length mismatch: expected {expected}, found {found}")]
    DescriptorLengthMismatch { expected: usize, found: usize },

    #[error("No descriptor in the training set")]
    EmptyTrainingSet,

    #[error("Model has not been trained or loaded")]
    ModelNotTrained,

    #[error("Kernel {0} not implemented")]
    UnsupportedKernel(String),

    #[error("Unknown ML method {0}")]
    UnsupportedMethod(String),

    #[error("Invalid hyperparameter: {0}")]
    InvalidHyperparameter(String),

    #[error("Kernel matrix is singular")]
    SingularKernel,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Similarity function between two descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    /// exp(-d²/2σ²) with Euclidean d
    Gaussian,
    /// exp(-d/σ) with Manhattan d
    Laplacian,
}

impl Kernel {
    pub fn name(&self) -> &'static str {
        match self {
            Kernel::Gaussian => "gaussian",
            Kernel::Laplacian => "laplacian",
        }
    }

    #[inline]
    pub fn evaluate(&self, a: &DVector<f64>, b: &DVector<f64>, sigma: f64) -> f64 {
        match self {
            Kernel::Gaussian => {
                let d = euclidean_distance(a, b);
                (-d * d / (2.0 * sigma * sigma)).exp()
            }
            Kernel::Laplacian => (-manhattan_distance(a, b) / sigma).exp(),
        }
    }
}

impl FromStr for Kernel {
    type Err = MlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gaussian" => Ok(Kernel::Gaussian),
            "laplacian" => Ok(Kernel::Laplacian),
            _ => Err(MlError::UnsupportedKernel(s.to_string())),
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Regression method used for a property. Only kernel ridge regression is
/// available; other names are rejected when configuration is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MlMethod {
    #[default]
    Krr,
}

impl FromStr for MlMethod {
    type Err = MlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "krr" => Ok(MlMethod::Krr),
            _ => Err(MlError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Hyperparameters of a kernel ridge regression
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KrrParams {
    pub kernel: Kernel,
    pub sigma: f64,
    pub lambda: f64,
}

impl Default for KrrParams {
    fn default() -> Self {
        Self {
            kernel: Kernel::Laplacian,
            sigma: 1000.0,
            lambda: 1e-9,
        }
    }
}

impl KrrParams {
    pub fn validate(&self) -> Result<(), MlError> {
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(MlError::InvalidHyperparameter(format!(
                "sigma must be positive, got {}",
                self.sigma
            )));
        }
        if !self.lambda.is_finite() || self.lambda < 0.0 {
            return Err(MlError::InvalidHyperparameter(format!(
                "lambda must be non-negative, got {}",
                self.lambda
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_parsing() {
        assert_eq!("gaussian".parse::<Kernel>().unwrap(), Kernel::Gaussian);
        assert_eq!("Laplacian".parse::<Kernel>().unwrap(), Kernel::Laplacian);
        assert!(matches!(
            "polynomial".parse::<Kernel>(),
            Err(MlError::UnsupportedKernel(name)) if name == "polynomial"
        ));
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("krr".parse::<MlMethod>().unwrap(), MlMethod::Krr);
        assert!(matches!(
            "svr".parse::<MlMethod>(),
            Err(MlError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_kernel_values() {
        let a = DVector::from_vec(vec![0.0, 0.0]);
        let b = DVector::from_vec(vec![3.0, 4.0]);
        assert_eq!(Kernel::Gaussian.evaluate(&a, &a, 1.0), 1.0);
        assert!((Kernel::Gaussian.evaluate(&a, &b, 5.0) - (-0.5f64).exp()).abs() < 1e-15);
        assert!((Kernel::Laplacian.evaluate(&a, &b, 7.0) - (-1.0f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn test_hyperparameter_validation() {
        assert!(KrrParams::default().validate().is_ok());
        let bad_sigma = KrrParams {
            sigma: 0.0,
            ..KrrParams::default()
        };
        assert!(matches!(
            bad_sigma.validate(),
            Err(MlError::InvalidHyperparameter(_))
        ));
        let bad_lambda = KrrParams {
            lambda: -1.0,
            ..KrrParams::default()
        };
        assert!(bad_lambda.validate().is_err());
    }

    #[test]
    fn test_kernel_serde_is_lowercase() {
        let json = serde_json::to_string(&Kernel::Laplacian).unwrap();
        assert_eq!(json, "\"laplacian\"");
        let k: Kernel = serde_json::from_str("\"gaussian\"").unwrap();
        assert_eq!(k, Kernel::Gaussian);
    }
}
