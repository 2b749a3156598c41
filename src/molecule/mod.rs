//! Monomer representation: atoms, perceived bonds and atom types, and the
//! per-atom properties predicted for it.

use crate::atom::{Atom, Element};
use crate::constants::{self, ConstantsError};
use nalgebra::Vector3;
use thiserror::Error;

/// Tolerance applied to the sum of covalent radii when perceiving bonds
pub const BOND_TOLERANCE: f64 = 1.2;

/// Errors that can occur when working with monomers
#[derive(Error, Debug)]
pub enum MoleculeError {
    #[error("No atoms in monomer {0}")]
    EmptyMonomer(String),

    #[error("Monomer {monomer} has {atoms} atoms but {found} values were given for {property}")]
    PropertyLengthMismatch {
        monomer: String,
        property: &'static str,
        atoms: usize,
        found: usize,
    },

    #[error("Monomer {monomer} has {atoms} atoms but {found} atom types were given")]
    AtomTypeCount {
        monomer: String,
        atoms: usize,
        found: usize,
    },

    #[error(transparent)]
    Constants(#[from] ConstantsError),
}

/// Represents a chemical bond between two atoms of the same monomer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bond {
    pub atom1_idx: usize,
    pub atom2_idx: usize,
}

/// A single molecular fragment taking part in an interaction
#[derive(Debug, Clone)]
pub struct Monomer {
    /// Name of the monomer (usually the xyz file stem)
    pub name: String,

    /// Atoms in input order
    pub atoms: Vec<Atom>,

    /// Bonds perceived from covalent radii
    pub bonds: Vec<Bond>,

    /// One atom type per atom (e.g. "C4", "HO")
    atom_types: Vec<String>,

    /// Predicted Hirshfeld ratios, aligned with `atoms`
    hirshfeld_ratios: Option<Vec<f64>>,

    /// Predicted valence widths in bohr, aligned with `atoms`
    valence_widths: Option<Vec<f64>>,

    /// Reference values read alongside the geometry (training targets)
    reference: Option<Vec<f64>>,
}

impl Monomer {
    /// Build a monomer, perceiving bonds and atom types from the geometry
    pub fn new(name: &str, atoms: Vec<Atom>) -> Result<Self, MoleculeError> {
        if atoms.is_empty() {
            return Err(MoleculeError::EmptyMonomer(name.to_string()));
        }
        let bonds = perceive_bonds(&atoms)?;
        let atom_types = assign_atom_types(&atoms, &bonds);
        Ok(Self::assemble(name, atoms, bonds, atom_types))
    }

    /// Build a monomer with explicit atom types; no bonds are perceived
    pub fn with_atom_types(
        name: &str,
        atoms: Vec<Atom>,
        atom_types: Vec<String>,
    ) -> Result<Self, MoleculeError> {
        if atoms.is_empty() {
            return Err(MoleculeError::EmptyMonomer(name.to_string()));
        }
        if atom_types.len() != atoms.len() {
            return Err(MoleculeError::AtomTypeCount {
                monomer: name.to_string(),
                atoms: atoms.len(),
                found: atom_types.len(),
            });
        }
        Ok(Self::assemble(name, atoms, Vec::new(), atom_types))
    }

    fn assemble(name: &str, atoms: Vec<Atom>, bonds: Vec<Bond>, atom_types: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            atoms,
            bonds,
            atom_types,
            hirshfeld_ratios: None,
            valence_widths: None,
            reference: None,
        }
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn elements(&self) -> impl Iterator<Item = Element> + '_ {
        self.atoms.iter().map(|a| a.element)
    }

    pub fn coordinates(&self) -> impl Iterator<Item = &Vector3<f64>> + '_ {
        self.atoms.iter().map(|a| &a.coordinates)
    }

    pub fn atom_types(&self) -> &[String] {
        &self.atom_types
    }

    pub fn hirshfeld_ratios(&self) -> Option<&[f64]> {
        self.hirshfeld_ratios.as_deref()
    }

    pub fn valence_widths(&self) -> Option<&[f64]> {
        self.valence_widths.as_deref()
    }

    pub fn reference(&self) -> Option<&[f64]> {
        self.reference.as_deref()
    }

    pub fn set_hirshfeld_ratios(&mut self, values: Vec<f64>) -> Result<(), MoleculeError> {
        self.check_len("hirshfeld ratios", values.len())?;
        self.hirshfeld_ratios = Some(values);
        Ok(())
    }

    pub fn set_valence_widths(&mut self, values: Vec<f64>) -> Result<(), MoleculeError> {
        self.check_len("valence widths", values.len())?;
        self.valence_widths = Some(values);
        Ok(())
    }

    pub fn set_reference(&mut self, values: Vec<f64>) -> Result<(), MoleculeError> {
        self.check_len("reference values", values.len())?;
        self.reference = Some(values);
        Ok(())
    }

    fn check_len(&self, property: &'static str, found: usize) -> Result<(), MoleculeError> {
        if found != self.atoms.len() {
            return Err(MoleculeError::PropertyLengthMismatch {
                monomer: self.name.clone(),
                property,
                atoms: self.atoms.len(),
                found,
            });
        }
        Ok(())
    }

    /// Mass-weighted centre of the monomer
    pub fn center_of_mass(&self) -> Result<Vector3<f64>, MoleculeError> {
        center_of_mass(&self.atoms)
    }
}

/// Mass-weighted centre of a set of atoms
pub fn center_of_mass(atoms: &[Atom]) -> Result<Vector3<f64>, MoleculeError> {
    let mut total_mass = 0.0;
    let mut weighted = Vector3::zeros();
    for atom in atoms {
        let mass = constants::atomic_weight(atom.element)?;
        total_mass += mass;
        weighted += atom.coordinates * mass;
    }
    if total_mass == 0.0 {
        return Err(MoleculeError::EmptyMonomer(String::new()));
    }
    Ok(weighted / total_mass)
}

/// Bonds between atoms closer than the scaled sum of their covalent radii
pub fn perceive_bonds(atoms: &[Atom]) -> Result<Vec<Bond>, MoleculeError> {
    let radii = atoms
        .iter()
        .map(|a| constants::covalent_radius(a.element))
        .collect::<Result<Vec<_>, _>>()?;

    let mut bonds = Vec::new();
    for i in 0..atoms.len() {
        for j in (i + 1)..atoms.len() {
            let cutoff = BOND_TOLERANCE * (radii[i] + radii[j]);
            if atoms[i].distance(&atoms[j]) < cutoff {
                bonds.push(Bond {
                    atom1_idx: i,
                    atom2_idx: j,
                });
            }
        }
    }
    Ok(bonds)
}

/// Assign environment-dependent atom types.
///
/// Hydrogens take the symbol of their first bonded neighbour ("HC", "HO"),
/// C/N/O/S take their coordination number ("C4", "O2"), everything else keeps
/// its element symbol.
pub fn assign_atom_types(atoms: &[Atom], bonds: &[Bond]) -> Vec<String> {
    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); atoms.len()];
    for bond in bonds {
        neighbors[bond.atom1_idx].push(bond.atom2_idx);
        neighbors[bond.atom2_idx].push(bond.atom1_idx);
    }

    atoms
        .iter()
        .enumerate()
        .map(|(i, atom)| match atom.element {
            Element::Hydrogen => match neighbors[i].first() {
                Some(&j) => format!("H{}", atoms[j].element.symbol()),
                None => "H".to_string(),
            },
            Element::Carbon | Element::Nitrogen | Element::Oxygen | Element::Sulfur => {
                format!("{}{}", atom.element.symbol(), neighbors[i].len())
            }
            other => other.symbol().to_string(),
        })
        .collect()
}
