//! Periodic cell and minimum-image displacements

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when building a cell
#[derive(Error, Debug)]
pub enum CellError {
    #[error("Invalid lattice parameters: {0:?}")]
    InvalidLattice(Vector3<f64>),
}

/// Anything able to return minimum-image displacements between two points.
/// The Send + Sync bounds let energy components share it across rayon workers.
pub trait MinimumImage: Send + Sync {
    /// Shortest displacement vector from `a` to `b` under periodic wrapping
    fn pbc_distance(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> Vector3<f64>;
}

/// Rectangular periodic cell with side lengths in Angstroms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub lengths: Vector3<f64>,
}

impl Default for Cell {
    /// A 100 Å box: large enough that isolated dimers never see their images
    fn default() -> Self {
        Self {
            lengths: Vector3::new(100.0, 100.0, 100.0),
        }
    }
}

impl Cell {
    /// Rectangular cell from the three side lengths
    pub fn lattice_parameters(a: f64, b: f64, c: f64) -> Result<Self, CellError> {
        let lengths = Vector3::new(a, b, c);
        if lengths.iter().any(|l| !l.is_finite() || *l <= 0.0) {
            return Err(CellError::InvalidLattice(lengths));
        }
        Ok(Self { lengths })
    }

    pub fn volume(&self) -> f64 {
        self.lengths.x * self.lengths.y * self.lengths.z
    }
}

impl MinimumImage for Cell {
    fn pbc_distance(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> Vector3<f64> {
        let d = b - a;
        Vector3::from_fn(|i, _| {
            let l = self.lengths[i];
            d[i] - l * (d[i] / l).round()
        })
    }
}
