//! CLIFF: a component-based intermolecular force field
//!
//! This library predicts atomic properties (Hirshfeld ratios, valence widths)
//! with kernel ridge regression on Coulomb-matrix descriptors and uses them to
//! compute Tang-Toennies damped dispersion energies between two monomers,
//! decomposed into atom-pair contributions.

pub mod atom;
pub mod cell;
pub mod components;
pub mod config;
pub mod constants;
pub mod descriptor;
pub mod io;
pub mod logging;
pub mod math;
pub mod ml;
pub mod molecule;
pub mod pipeline;
pub mod properties;

// Re-export commonly used types and functions
pub use atom::{Atom, Element};
pub use cell::{Cell, MinimumImage};
pub use components::{ComponentKind, EnergyComponent, EnergyDecomposition, TangToennies};
pub use config::Options;
pub use descriptor::CoulombMatrix;
pub use ml::{Kernel, KernelRidge, KrrModel, KrrParams, TrainingSet};
pub use molecule::Monomer;
pub use pipeline::{InteractionCalculator, InteractionResult};
pub use properties::{AtomicProperty, PropertyPredictor, PropertySource};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
