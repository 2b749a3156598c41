//! Coulomb-matrix descriptors with first and second positional derivatives

use nalgebra::DMatrix;

use super::{diagonal_term, reorder_atoms, validate, Descriptor, DescriptorError};
use crate::atom::Atom;
use crate::math::upper_triangle;

/// A descriptor together with its derivatives, all packed like the descriptor
#[derive(Debug, Clone)]
pub struct DescriptorGradients {
    /// The descriptor itself
    pub values: Descriptor,

    /// First derivatives along x, y, z
    pub first: [Descriptor; 3],

    /// Second derivatives in the (zz, xz, yz, xx-yy, xy) spherical-like basis
    pub second: [Descriptor; 5],

    /// Original atom index of every occupied slot
    pub permutation: Vec<usize>,
}

/// Descriptor of `atoms[central]` with first and second derivatives of every
/// matrix entry. Reordering and zero padding follow [`super::build_descriptor`].
pub fn build_descriptor_with_gradients(
    atoms: &[Atom],
    central: usize,
    max_neighbors: usize,
) -> Result<DescriptorGradients, DescriptorError> {
    validate(atoms.len(), central, max_neighbors)?;
    let ordered = reorder_atoms(atoms, &atoms[central].coordinates, max_neighbors)?;
    let n = ordered.coords.len();

    let zeros = || DMatrix::<f64>::zeros(max_neighbors, max_neighbors);
    let mut d0 = zeros();
    let mut d1: [DMatrix<f64>; 3] = [zeros(), zeros(), zeros()];
    let mut d2: Vec<DMatrix<f64>> = (0..9).map(|_| zeros()).collect();

    for i in 0..n {
        let zi = ordered.charges[i];
        for j in 0..n {
            if i == j {
                let diag = diagonal_term(zi);
                d0[(i, i)] = diag;
                for k in 0..3 {
                    d1[k][(i, i)] = diag;
                    for l in 0..3 {
                        d2[3 * k + l][(i, i)] = diag;
                    }
                }
                continue;
            }

            let zz = zi * ordered.charges[j];
            let rij = ordered.coords[j] - ordered.coords[i];
            let r = rij.norm();
            let r3 = r * r * r;
            let r5 = r3 * r * r;

            d0[(i, j)] = zz / r;
            for k in 0..3 {
                d1[k][(i, j)] = -zz * rij[k] / r3;
                for l in 0..3 {
                    let mut second = 3.0 * rij[k] * rij[l];
                    if k == l {
                        second -= r;
                    }
                    d2[3 * k + l][(i, j)] = second * zz / r5;
                }
            }
        }
    }

    let sqrt3 = 3f64.sqrt();
    let spherical = [
        d2[8].clone(),
        &d2[2] * (2.0 / sqrt3),
        &d2[5] * (2.0 / sqrt3),
        (&d2[0] - &d2[4]) * (1.0 / sqrt3),
        &d2[1] * (2.0 / sqrt3),
    ];

    Ok(DescriptorGradients {
        values: upper_triangle(&d0),
        first: [
            upper_triangle(&d1[0]),
            upper_triangle(&d1[1]),
            upper_triangle(&d1[2]),
        ],
        second: [
            upper_triangle(&spherical[0]),
            upper_triangle(&spherical[1]),
            upper_triangle(&spherical[2]),
            upper_triangle(&spherical[3]),
            upper_triangle(&spherical[4]),
        ],
        permutation: ordered.permutation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::build_descriptor;
    use nalgebra::Vector3;

    fn carbon_monoxide(shift: f64) -> Vec<Atom> {
        vec![
            Atom::new("C", Vector3::new(0.0, 0.0, 0.0)).unwrap(),
            Atom::new("O", Vector3::new(1.128 + shift, 0.2, -0.1)).unwrap(),
        ]
    }

    #[test]
    fn test_values_match_plain_descriptor() {
        let atoms = carbon_monoxide(0.0);
        let grads = build_descriptor_with_gradients(&atoms, 0, 3).unwrap();
        let (plain, perm) = build_descriptor(&atoms, 0, 3).unwrap();
        assert_eq!(grads.values, plain);
        assert_eq!(grads.permutation, perm);
        assert!(grads.first.iter().all(|d| d.len() == plain.len()));
        assert!(grads.second.iter().all(|d| d.len() == plain.len()));
    }

    #[test]
    fn test_first_derivative_matches_finite_difference() {
        // Entry (0,1) is Z_C Z_O / r; moving the O atom along x changes r
        let h = 1e-6;
        let plus = build_descriptor(&carbon_monoxide(h), 0, 2).unwrap().0;
        let minus = build_descriptor(&carbon_monoxide(-h), 0, 2).unwrap().0;
        let numeric = (plus[1] - minus[1]) / (2.0 * h);

        let grads = build_descriptor_with_gradients(&carbon_monoxide(0.0), 0, 2).unwrap();
        assert!((grads.first[0][1] - numeric).abs() < 1e-5 * numeric.abs().max(1.0));
    }

    #[test]
    fn test_second_derivatives_of_a_pair() {
        // Packed slots for two atoms: (0,0), (0,1), (1,1)
        let atoms = carbon_monoxide(0.0);
        let grads = build_descriptor_with_gradients(&atoms, 0, 2).unwrap();

        let delta = atoms[1].coordinates - atoms[0].coordinates;
        let d = delta.norm();
        let zz = 6.0 * 8.0;
        let d5 = d.powi(5);
        let sqrt3 = 3f64.sqrt();
        let entry = |k: usize, l: usize| {
            let kronecker = if k == l { d } else { 0.0 };
            zz * (3.0 * delta[k] * delta[l] - kronecker) / d5
        };

        let (x, y, z) = (0, 1, 2);
        let expected = [
            entry(z, z),
            2.0 / sqrt3 * entry(x, z),
            2.0 / sqrt3 * entry(y, z),
            (entry(x, x) - entry(y, y)) / sqrt3,
            2.0 / sqrt3 * entry(x, y),
        ];
        for (s2, e) in grads.second.iter().zip(expected.iter()) {
            assert!((s2[1] - e).abs() < 1e-12 * e.abs().max(1.0), "{} vs {}", s2[1], e);
        }
        assert!(grads.second[3][1] != 0.0);
    }

    #[test]
    fn test_second_derivative_diagonals() {
        let atoms = carbon_monoxide(0.0);
        let grads = build_descriptor_with_gradients(&atoms, 0, 2).unwrap();
        let sqrt3 = 3f64.sqrt();

        for (slot, z) in [(0, 6.0f64), (2, 8.0)] {
            let diag = 0.5 * z.powf(2.4);
            let expected = [diag, 2.0 / sqrt3 * diag, 2.0 / sqrt3 * diag, 0.0, 2.0 / sqrt3 * diag];
            for (s2, e) in grads.second.iter().zip(expected.iter()) {
                assert!((s2[slot] - e).abs() < 1e-12 * e.abs().max(1.0));
            }
            assert_eq!(grads.values[slot], diag);
        }
    }

    #[test]
    fn test_padding_is_zero_in_all_derivatives() {
        let atoms = carbon_monoxide(0.0);
        let grads = build_descriptor_with_gradients(&atoms, 0, 4).unwrap();
        let last = grads.values.len() - 1;
        assert_eq!(grads.values[last], 0.0);
        assert!(grads.first.iter().all(|d| d[last] == 0.0));
        assert!(grads.second.iter().all(|d| d[last] == 0.0));
    }

    #[test]
    fn test_invalid_central_atom() {
        let atoms = carbon_monoxide(0.0);
        assert!(build_descriptor_with_gradients(&atoms, 5, 2).is_err());
    }
}
