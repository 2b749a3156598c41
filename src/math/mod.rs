//! Small numeric helpers shared by descriptors, kernels and damping functions

use nalgebra::{DMatrix, DVector};
use std::cmp::Ordering;

/// n! as a float; exact for every order used by the damping series
pub fn factorial(n: u32) -> f64 {
    (1..=n).fold(1.0, |acc, k| acc * k as f64)
}

/// Euclidean (L2) distance between two equally sized vectors
pub fn euclidean_distance(a: &DVector<f64>, b: &DVector<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Manhattan (city-block, L1) distance between two equally sized vectors
pub fn manhattan_distance(a: &DVector<f64>, b: &DVector<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

/// Upper triangle of a square matrix, diagonal included, in row-major order
pub fn upper_triangle(m: &DMatrix<f64>) -> DVector<f64> {
    let n = m.nrows();
    let mut packed = Vec::with_capacity(n * (n + 1) / 2);
    for i in 0..n {
        for j in i..n {
            packed.push(m[(i, j)]);
        }
    }
    DVector::from_vec(packed)
}

/// Indices that sort `values` ascending. Stable: equal values keep their
/// original relative order.
pub fn stable_argsort(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].partial_cmp(&values[j]).unwrap_or(Ordering::Equal));
    order
}

/// Sign of `x` with sign(0) = 0
pub fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factorial() {
        assert_eq!(factorial(0), 1.0);
        assert_eq!(factorial(1), 1.0);
        assert_eq!(factorial(6), 720.0);
        assert_eq!(factorial(10), 3_628_800.0);
    }

    #[test]
    fn test_distances() {
        let a = DVector::from_vec(vec![0.0, 0.0, 0.0]);
        let b = DVector::from_vec(vec![1.0, -2.0, 2.0]);
        assert_eq!(euclidean_distance(&a, &b), 3.0);
        assert_eq!(manhattan_distance(&a, &b), 5.0);
        assert_eq!(euclidean_distance(&b, &b), 0.0);
    }

    #[test]
    fn test_upper_triangle_row_major() {
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 5.0, 3.0, 5.0, 6.0]);
        let packed = upper_triangle(&m);
        assert_eq!(packed.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_stable_argsort_keeps_ties_in_order() {
        let order = stable_argsort(&[2.0, 1.0, 2.0, 0.5, 1.0]);
        assert_eq!(order, vec![3, 1, 4, 0, 2]);
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(3.2), 1.0);
        assert_eq!(sign(-0.1), -1.0);
        assert_eq!(sign(0.0), 0.0);
    }
}
