//! Distance-ordered Coulomb-matrix descriptors
//!
//! Every atom of a monomer is described by the Coulomb matrix of its
//! `max_neighbors` nearest atoms (itself first), ordered by distance to the
//! central atom and packed as the upper triangle of the matrix. Monomers with
//! fewer atoms than `max_neighbors` are zero padded, so every descriptor of a
//! given builder has the same length.

pub mod gradients;

use nalgebra::{DMatrix, DVector, Vector3};
use thiserror::Error;

use crate::atom::Atom;
use crate::constants::{self, ConstantsError};
use crate::math::{sign, stable_argsort, upper_triangle};
use crate::molecule::{center_of_mass, Monomer, MoleculeError};

pub use gradients::{build_descriptor_with_gradients, DescriptorGradients};

/// A packed Coulomb matrix
pub type Descriptor = DVector<f64>;

/// Errors that can occur while building descriptors
#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Central atom {index} out of range for {atoms} atoms")]
    InvalidCentralAtom { index: usize, atoms: usize },

    #[error("max_neighbors must be at least 1")]
    InvalidNeighborCount,

    #[error(transparent)]
    Constants(#[from] ConstantsError),

    #[error(transparent)]
    Molecule(#[from] MoleculeError),
}

/// Length of a descriptor built with `max_neighbors` slots
pub fn descriptor_len(max_neighbors: usize) -> usize {
    max_neighbors * (max_neighbors + 1) / 2
}

/// Atoms of a neighbourhood in descriptor-slot order
#[derive(Debug, Clone)]
pub(crate) struct OrderedAtoms {
    pub coords: Vec<Vector3<f64>>,
    pub charges: Vec<f64>,
    pub permutation: Vec<usize>,
}

impl OrderedAtoms {
    fn len(&self) -> usize {
        self.coords.len()
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.coords.swap(a, b);
        self.charges.swap(a, b);
        self.permutation.swap(a, b);
    }
}

/// Sort atoms by distance to `origin` and keep the first `max_neighbors`.
///
/// Atomic numbers are resolved for every atom, so an unknown element fails
/// even when it would fall outside the kept neighbourhood.
pub(crate) fn reorder_atoms(
    atoms: &[Atom],
    origin: &Vector3<f64>,
    max_neighbors: usize,
) -> Result<OrderedAtoms, DescriptorError> {
    let charges = atoms
        .iter()
        .map(|a| constants::atomic_number(a.element))
        .collect::<Result<Vec<_>, _>>()?;

    let dist2: Vec<f64> = atoms
        .iter()
        .map(|a| (a.coordinates - origin).norm_squared())
        .collect();
    let mut permutation = stable_argsort(&dist2);
    permutation.truncate(max_neighbors);

    Ok(OrderedAtoms {
        coords: permutation.iter().map(|&i| atoms[i].coordinates).collect(),
        charges: permutation.iter().map(|&i| charges[i]).collect(),
        permutation,
    })
}

pub(crate) fn validate(atoms: usize, central: usize, max_neighbors: usize) -> Result<(), DescriptorError> {
    if max_neighbors == 0 {
        return Err(DescriptorError::InvalidNeighborCount);
    }
    if central >= atoms {
        return Err(DescriptorError::InvalidCentralAtom {
            index: central,
            atoms,
        });
    }
    Ok(())
}

/// Self-interaction term on the Coulomb-matrix diagonal
#[inline]
pub(crate) fn diagonal_term(z: f64) -> f64 {
    0.5 * z.powf(2.4)
}

/// Full (padded) Coulomb matrix of an ordered neighbourhood
fn coulomb_matrix(ordered: &OrderedAtoms, max_neighbors: usize) -> DMatrix<f64> {
    let n = ordered.len();
    let mut m = DMatrix::zeros(max_neighbors, max_neighbors);
    for i in 0..n {
        for j in 0..n {
            m[(i, j)] = if i == j {
                diagonal_term(ordered.charges[i])
            } else {
                let r = (ordered.coords[i] - ordered.coords[j]).norm();
                ordered.charges[i] * ordered.charges[j] / r
            };
        }
    }
    m
}

/// Descriptor of `atoms[central]`, plus the original atom index of every
/// occupied slot.
pub fn build_descriptor(
    atoms: &[Atom],
    central: usize,
    max_neighbors: usize,
) -> Result<(Descriptor, Vec<usize>), DescriptorError> {
    build_oriented_descriptor(atoms, central, max_neighbors, None)
}

/// Descriptor whose off-diagonal entries carry the sign of
/// `(r_i - r_j) · direction` when a direction is given.
pub fn build_oriented_descriptor(
    atoms: &[Atom],
    central: usize,
    max_neighbors: usize,
    direction: Option<&Vector3<f64>>,
) -> Result<(Descriptor, Vec<usize>), DescriptorError> {
    validate(atoms.len(), central, max_neighbors)?;

    let ordered = reorder_atoms(atoms, &atoms[central].coordinates, max_neighbors)?;
    let mut m = coulomb_matrix(&ordered, max_neighbors);

    if let Some(u) = direction {
        let n = ordered.len();
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    m[(i, j)] *= sign((ordered.coords[i] - ordered.coords[j]).dot(u));
                }
            }
        }
    }

    Ok((upper_triangle(&m), ordered.permutation))
}

/// Descriptor of a whole monomer, ordered by distance to its centre of mass.
///
/// With `ordered`, the two closest slots are swapped so the heavier atom comes
/// first, and slots 2/3 are swapped so slot 2 stays closest to slot 0.
pub fn build_com_descriptor(
    atoms: &[Atom],
    max_neighbors: usize,
    ordered: bool,
) -> Result<(Descriptor, Vec<usize>), DescriptorError> {
    if max_neighbors == 0 {
        return Err(DescriptorError::InvalidNeighborCount);
    }
    let com = center_of_mass(atoms)?;
    let mut neighborhood = reorder_atoms(atoms, &com, max_neighbors)?;

    if ordered {
        let n = neighborhood.len();
        if n > 1 && neighborhood.charges[1] > neighborhood.charges[0] {
            neighborhood.swap(0, 1);
        }
        if n > 3 {
            let c = &neighborhood.coords;
            if (c[2] - c[0]).norm() > (c[2] - c[1]).norm() {
                neighborhood.swap(2, 3);
            }
        }
    }

    let m = coulomb_matrix(&neighborhood, max_neighbors);
    Ok((upper_triangle(&m), neighborhood.permutation))
}

/// Builds descriptors with a fixed neighbourhood size
#[derive(Debug, Clone)]
pub struct CoulombMatrix {
    pub max_neighbors: usize,
    pub direction: Option<Vector3<f64>>,
}

impl CoulombMatrix {
    pub fn new(max_neighbors: usize) -> Self {
        Self {
            max_neighbors,
            direction: None,
        }
    }

    pub fn with_direction(mut self, direction: Vector3<f64>) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn len(&self) -> usize {
        descriptor_len(self.max_neighbors)
    }

    pub fn is_empty(&self) -> bool {
        self.max_neighbors == 0
    }

    /// Descriptor of a single atom
    pub fn describe_atom(&self, atoms: &[Atom], central: usize) -> Result<Descriptor, DescriptorError> {
        let (descriptor, _) =
            build_oriented_descriptor(atoms, central, self.max_neighbors, self.direction.as_ref())?;
        Ok(descriptor)
    }

    /// One descriptor per atom, in atom order
    pub fn describe_monomer(&self, monomer: &Monomer) -> Result<Vec<Descriptor>, DescriptorError> {
        (0..monomer.num_atoms())
            .map(|i| self.describe_atom(&monomer.atoms, i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> Vec<Atom> {
        vec![
            Atom::new("O", Vector3::new(0.0, 0.0, 0.0)).unwrap(),
            Atom::new("H", Vector3::new(0.9572, 0.0, 0.0)).unwrap(),
            Atom::new("H", Vector3::new(-0.3, 1.0, 0.0)).unwrap(),
        ]
    }

    #[test]
    fn test_descriptor_length_and_layout() {
        let atoms = water();
        let (d, perm) = build_descriptor(&atoms, 0, 3).unwrap();
        assert_eq!(d.len(), 6);
        assert_eq!(perm, vec![0, 1, 2]);

        // Diagonal of oxygen, then O-H couplings
        assert!((d[0] - 0.5 * 8f64.powf(2.4)).abs() < 1e-12);
        assert!((d[1] - 8.0 / 0.9572).abs() < 1e-12);
        assert!((d[3] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_central_atom_comes_first() {
        let atoms = water();
        let (_, perm) = build_descriptor(&atoms, 2, 3).unwrap();
        assert_eq!(perm[0], 2);
        assert_eq!(perm, vec![2, 0, 1]);
    }

    #[test]
    fn test_zero_padding_when_neighbourhood_exceeds_atoms() {
        let atoms = water();
        let (d, perm) = build_descriptor(&atoms, 0, 5).unwrap();
        assert_eq!(d.len(), descriptor_len(5));
        assert_eq!(perm.len(), 3);

        let (small, _) = build_descriptor(&atoms, 0, 3).unwrap();
        // Row 0 of the 5x5 triangle holds the 3 real entries followed by zeros
        assert_eq!(&d.as_slice()[..3], &small.as_slice()[..3]);
        assert_eq!(d[3], 0.0);
        assert_eq!(d[4], 0.0);
        // Last row/diagonal belongs to padding
        assert_eq!(d[d.len() - 1], 0.0);
    }

    #[test]
    fn test_truncation_when_atoms_exceed_neighbourhood() {
        let atoms = water();
        let (d, perm) = build_descriptor(&atoms, 1, 2).unwrap();
        assert_eq!(d.len(), 3);
        assert_eq!(perm, vec![1, 0]);
    }

    #[test]
    fn test_descriptor_is_deterministic() {
        let atoms = water();
        let (a, _) = build_descriptor(&atoms, 1, 4).unwrap();
        let (b, _) = build_descriptor(&atoms, 1, 4).unwrap();
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_equidistant_atoms_keep_input_order() {
        let atoms = vec![
            Atom::new("C", Vector3::zeros()).unwrap(),
            Atom::new("O", Vector3::new(1.2, 0.0, 0.0)).unwrap(),
            Atom::new("N", Vector3::new(-1.2, 0.0, 0.0)).unwrap(),
        ];
        let (_, perm) = build_descriptor(&atoms, 0, 3).unwrap();
        assert_eq!(perm, vec![0, 1, 2]);
    }

    #[test]
    fn test_invalid_arguments() {
        let atoms = water();
        assert!(matches!(
            build_descriptor(&atoms, 3, 3),
            Err(DescriptorError::InvalidCentralAtom { index: 3, atoms: 3 })
        ));
        assert!(matches!(
            build_descriptor(&atoms, 0, 0),
            Err(DescriptorError::InvalidNeighborCount)
        ));
    }

    #[test]
    fn test_unknown_atomic_number() {
        let atoms = vec![
            Atom::new("C", Vector3::zeros()).unwrap(),
            Atom::new("Ar", Vector3::new(3.0, 0.0, 0.0)).unwrap(),
        ];
        let err = build_descriptor(&atoms, 0, 1).unwrap_err();
        assert!(err.to_string().contains("Ar"));
    }

    #[test]
    fn test_orientation_flips_signs() {
        let atoms = water();
        let (plain, _) = build_descriptor(&atoms, 0, 3).unwrap();
        let (oriented, _) =
            build_oriented_descriptor(&atoms, 0, 3, Some(&Vector3::new(1.0, 0.0, 0.0))).unwrap();
        // Diagonals unchanged
        assert_eq!(plain[0], oriented[0]);
        // r_O - r_H1 points along -x
        assert_eq!(oriented[1], -plain[1]);
        // Perpendicular direction zeroes every off-diagonal entry between O and H1
        let (perp, _) =
            build_oriented_descriptor(&atoms, 0, 3, Some(&Vector3::new(0.0, 0.0, 1.0))).unwrap();
        assert_eq!(perp[1], 0.0);
    }

    #[test]
    fn test_com_descriptor_orders_heavy_atom_first() {
        let atoms = vec![
            Atom::new("H", Vector3::new(0.9572, 0.0, 0.0)).unwrap(),
            Atom::new("O", Vector3::new(0.0, 0.0, 0.0)).unwrap(),
            Atom::new("H", Vector3::new(-0.3, 1.0, 0.0)).unwrap(),
        ];
        let (_, perm) = build_com_descriptor(&atoms, 3, false).unwrap();
        assert_eq!(perm[0], 1);

        let (d, perm) = build_com_descriptor(&atoms, 3, true).unwrap();
        assert_eq!(perm[0], 1);
        assert!((d[0] - 0.5 * 8f64.powf(2.4)).abs() < 1e-12);
    }

    #[test]
    fn test_builder_describes_every_atom() {
        let monomer = Monomer::new("water", water()).unwrap();
        let builder = CoulombMatrix::new(4);
        let descriptors = builder.describe_monomer(&monomer).unwrap();
        assert_eq!(descriptors.len(), 3);
        assert!(descriptors.iter().all(|d| d.len() == builder.len()));
        // Hydrogen self-interaction term
        assert_eq!(descriptors[1][0], descriptors[2][0]);

        let oriented = CoulombMatrix::new(4).with_direction(Vector3::new(1.0, 0.0, 0.0));
        let d = oriented.describe_atom(&monomer.atoms, 0).unwrap();
        assert_eq!(d[0], descriptors[0][0]);
        assert_eq!(d[1], -descriptors[0][1]);
    }
}
