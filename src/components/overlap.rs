//! Overlap of two Slater-type valence densities

use nalgebra::Vector3;
use std::f64::consts::PI;

use crate::cell::MinimumImage;

/// Widths closer than this use the series expansion about `v_i`
pub const EQUAL_WIDTH_TOLERANCE: f64 = 1e-3;

/// Valence density of one atom
#[derive(Debug, Clone, Copy)]
pub struct SlaterSite {
    pub position: Vector3<f64>,
    /// Valence population N
    pub population: f64,
    /// Decay width v
    pub width: f64,
    /// Prefactor U
    pub scale: f64,
}

/// Scaled overlap U_i U_j S(r_ij), with r_ij the minimum-image distance
pub fn slater_overlap(cell: &dyn MinimumImage, site_i: &SlaterSite, site_j: &SlaterSite) -> f64 {
    let r = cell.pbc_distance(&site_i.position, &site_j.position).norm();
    site_i.scale
        * site_j.scale
        * slater_overlap_at(r, site_i.population, site_i.width, site_j.population, site_j.width)
}

/// Overlap of two normalised exponential densities at separation `r`
pub fn slater_overlap_at(r: f64, n_i: f64, v_i: f64, n_j: f64, v_j: f64) -> f64 {
    let (vi2, vj2) = (v_i * v_i, v_j * v_j);
    if (v_i - v_j).abs() > EQUAL_WIDTH_TOLERANCE {
        let g0ab = -4.0 * vi2 * vj2 / (vi2 - vj2).powi(3);
        let g1ab = v_i / (vi2 - vj2).powi(2);
        let g0ba = -4.0 * vj2 * vi2 / (vj2 - vi2).powi(3);
        let g1ba = v_j / (vj2 - vi2).powi(2);
        n_i * n_j / (8.0 * PI * r)
            * ((g0ab + g1ab * r) * (-r / v_i).exp() + (g0ba + g1ba * r) * (-r / v_j).exp())
    } else {
        let rho = r / v_i;
        let (rho2, rho3, rho4) = (rho * rho, rho.powi(3), rho.powi(4));
        let dv = v_j - v_i;
        n_i * n_j
            * (-rho).exp()
            * ((3.0 + 3.0 * rho + rho2) / (192.0 * PI * v_i.powi(3))
                + dv * (-9.0 - 9.0 * rho - 2.0 * rho2 + rho3) / (384.0 * v_i.powi(4))
                + dv * dv * (90.0 + 90.0 * rho + 5.0 * rho2 - 25.0 * rho3 + 3.0 * rho4)
                    / (3840.0 * v_i.powi(5)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;

    #[test]
    fn test_branches_agree_near_threshold() {
        let r = 3.0;
        let just_above = slater_overlap_at(r, 1.5, 0.50, 2.0, 0.5011);
        let just_below = slater_overlap_at(r, 1.5, 0.50, 2.0, 0.5009);
        assert!(just_above > 0.0 && just_below > 0.0);
        assert!((just_above - just_below).abs() / just_above < 1e-2);
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let forward = slater_overlap_at(2.5, 1.2, 0.45, 0.8, 0.60);
        let backward = slater_overlap_at(2.5, 0.8, 0.60, 1.2, 0.45);
        assert!((forward - backward).abs() < 1e-12 * forward.abs());
    }

    #[test]
    fn test_overlap_decays_with_distance() {
        let near = slater_overlap_at(1.0, 1.0, 0.5, 1.0, 0.7);
        let far = slater_overlap_at(6.0, 1.0, 0.5, 1.0, 0.7);
        assert!(near > far);
        assert!(far > 0.0);
    }

    #[test]
    fn test_scaled_overlap_uses_minimum_image() {
        let cell = Cell::lattice_parameters(10.0, 10.0, 10.0).unwrap();
        let site = |x: f64, scale: f64| SlaterSite {
            position: Vector3::new(x, 0.0, 0.0),
            population: 1.0,
            width: 0.5,
            scale,
        };
        let wrapped = slater_overlap(&cell, &site(0.5, 2.0), &site(8.5, 0.5));
        let direct = slater_overlap_at(2.0, 1.0, 0.5, 1.0, 0.5);
        assert!((wrapped - direct).abs() < 1e-15);
    }
}
