//! Energy components of the intermolecular interaction
//!
//! Every component turns a pair of monomers into a matrix of atom-pair
//! contributions in kcal/mol. Dispersion is computed here; electrostatics,
//! exchange-repulsion and induction plug in through [`EnergyComponent`].

pub mod dispersion;
pub mod overlap;

use nalgebra::DMatrix;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::cell::MinimumImage;
use crate::constants::ConstantsError;
use crate::molecule::Monomer;

pub use dispersion::{Dispersion, DispersionCoefficients, TangToennies, TangToenniesParams};

/// Errors that can occur while evaluating an energy component
#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("Need at least two monomers, got {0}")]
    InsufficientMonomers(usize),

    #[error("Only two monomers can interact")]
    TooManyMonomers,

    #[error("Monomer {monomer} is missing {property}")]
    MissingProperty {
        monomer: String,
        property: &'static str,
    },

    #[error("Degenerate C6 coefficient between atoms {atom_a} and {atom_b}: {reason}")]
    DegenerateCoefficient {
        atom_a: usize,
        atom_b: usize,
        reason: String,
    },

    #[error("Invalid valence width {width} for atom {atom} of {monomer}")]
    InvalidValenceWidth {
        monomer: String,
        atom: usize,
        width: f64,
    },

    #[error(transparent)]
    Constants(#[from] ConstantsError),

    #[error("Component {name} failed: {message}")]
    External { name: String, message: String },
}

/// The four terms of the energy decomposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    Electrostatics,
    Exchange,
    Induction,
    Dispersion,
}

impl ComponentKind {
    /// In report column order
    pub const ALL: [ComponentKind; 4] = [
        ComponentKind::Electrostatics,
        ComponentKind::Exchange,
        ComponentKind::Induction,
        ComponentKind::Dispersion,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ComponentKind::Electrostatics => "electrostatic",
            ComponentKind::Exchange => "exchange-repulsion",
            ComponentKind::Induction => "induction",
            ComponentKind::Dispersion => "dispersion",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            ComponentKind::Electrostatics => 0,
            ComponentKind::Exchange => 1,
            ComponentKind::Induction => 2,
            ComponentKind::Dispersion => 3,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Atom-pair contributions of one component, rows from monomer A and
/// columns from monomer B, in kcal/mol
#[derive(Debug, Clone)]
pub struct EnergyDecomposition {
    pub kind: ComponentKind,
    pub matrix: DMatrix<f64>,
    pub total: f64,
}

impl EnergyDecomposition {
    /// Decomposition whose total is the sum of its entries
    pub fn from_matrix(kind: ComponentKind, matrix: DMatrix<f64>) -> Self {
        let total = matrix.sum();
        Self {
            kind,
            matrix,
            total,
        }
    }

    pub fn zeros(kind: ComponentKind, atoms_a: usize, atoms_b: usize) -> Self {
        Self {
            kind,
            matrix: DMatrix::zeros(atoms_a, atoms_b),
            total: 0.0,
        }
    }
}

/// One term of the interaction energy between two monomers
/// The Send + Sync bounds let dimer jobs share components across rayon workers
pub trait EnergyComponent: Send + Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> ComponentKind;

    fn evaluate(
        &self,
        mon_a: &Monomer,
        mon_b: &Monomer,
        cell: &dyn MinimumImage,
    ) -> Result<EnergyDecomposition, ComponentError>;
}
