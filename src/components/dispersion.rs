//! Tang-Toennies damped dispersion between two monomers
//!
//! C6 coefficients come from free-atom values rescaled by Hirshfeld ratios
//! and combined across the pair. C8 follows from C6 through the ratio of
//! free-atom radial moments, C10 from C6 and C8. Each term is damped with
//! the Tang-Toennies function of order n, using a decay rate from the
//! predicted valence widths.

use nalgebra::DMatrix;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use super::{ComponentError, ComponentKind, EnergyComponent, EnergyDecomposition};
use crate::atom::Element;
use crate::cell::MinimumImage;
use crate::constants::{self, ConstantsError, ANGSTROM_TO_BOHR, AU_TO_KCALMOL};
use crate::logging::{facade, Logger};
use crate::math::factorial;
use crate::molecule::Monomer;

/// Separations below this (bohr) count as coincident atoms and contribute nothing
pub const COINCIDENT_CUTOFF: f64 = 1e-8;

/// Tang-Toennies damping of order `n` at distance `r` (bohr) for decay rate `b`.
///
/// f_n = 1 - exp(-x) Σ_{k=0..n} x^k / k!, with x the effective reduced
/// distance of the pair.
#[inline]
pub fn tang_toennies_damping(n: u32, r: f64, b: f64) -> f64 {
    let b2 = b * b;
    let x = b * r - (2.0 * b2 * r + 3.0 * b) * r / (b2 * r * r + 3.0 * b * r + 3.0);
    let sum: f64 = (0..=n).map(|k| x.powi(k as i32) / factorial(k)).sum();
    1.0 - (-x).exp() * sum
}

/// Per-atom inputs of the pair terms
#[derive(Debug, Clone, Copy)]
struct AtomTerms {
    c6: f64,
    polarizability: f64,
    radial_ratio: f64,
    decay_rate: f64,
    scale: f64,
}

/// C6 of a pair from effective homoatomic C6 and polarizabilities
pub fn combine_c6(c6_a: f64, alpha_a: f64, c6_b: f64, alpha_b: f64) -> Option<f64> {
    if alpha_a <= 0.0 || alpha_b <= 0.0 {
        return None;
    }
    let denom = (alpha_b / alpha_a) * c6_a + (alpha_a / alpha_b) * c6_b;
    if !denom.is_finite() || denom <= 0.0 {
        return None;
    }
    Some(2.0 * c6_a * c6_b / denom)
}

/// sqrt(Z)·<r⁴>/<r²> of the free atom
fn radial_ratio(element: Element) -> Result<f64, ConstantsError> {
    let z = constants::atomic_number(element)?;
    Ok(z.sqrt() * constants::radial_moment_r4(element)? / constants::radial_moment_r2(element)?)
}

/// C8 from C6 and the two radial-moment ratios
#[inline]
pub fn c8_from_c6(c6: f64, ratio_a: f64, ratio_b: f64) -> f64 {
    3.0 * (ratio_a * ratio_b).sqrt() * c6
}

/// C10 = 49/40 · C8² / C6
#[inline]
pub fn c10_from_c8(c6: f64, c8: f64) -> f64 {
    49.0 / 40.0 * c8 * c8 / c6
}

/// C6, C8 and C10 for every (A, B) pair, rows from the first monomer
#[derive(Debug, Clone)]
pub struct DispersionCoefficients {
    pub c6: DMatrix<f64>,
    pub c8: DMatrix<f64>,
    pub c10: DMatrix<f64>,
}

/// Parameters of the Tang-Toennies model
#[derive(Debug, Clone)]
pub struct TangToenniesParams {
    /// C8/C10 prefactor per atom type
    pub scales: HashMap<String, f64>,
}

impl Default for TangToenniesParams {
    fn default() -> Self {
        Self {
            scales: constants::default_dispersion_scales(),
        }
    }
}

impl TangToenniesParams {
    /// Defaults with some atom types overridden
    pub fn with_overrides(overrides: &HashMap<String, f64>) -> Self {
        let mut params = Self::default();
        params
            .scales
            .extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
        params
    }
}

/// Progress of a [`Dispersion`] computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispersionState {
    Created,
    SystemsAttached,
    CoefficientsComputed,
    EnergyComputed,
}

/// Dispersion calculation between two monomers
pub struct Dispersion<'a> {
    params: &'a TangToenniesParams,
    cell: &'a dyn MinimumImage,
    systems: Vec<&'a Monomer>,
    coefficients: Option<DispersionCoefficients>,
    decomposition: Option<DMatrix<f64>>,
    energy: Option<f64>,
}

impl<'a> Dispersion<'a> {
    pub fn new(params: &'a TangToenniesParams, cell: &'a dyn MinimumImage) -> Self {
        Self {
            params,
            cell,
            systems: Vec::with_capacity(2),
            coefficients: None,
            decomposition: None,
            energy: None,
        }
    }

    pub fn add_system(&mut self, monomer: &'a Monomer) -> Result<(), ComponentError> {
        if self.systems.len() == 2 {
            return Err(ComponentError::TooManyMonomers);
        }
        self.systems.push(monomer);
        Ok(())
    }

    pub fn state(&self) -> DispersionState {
        if self.energy.is_some() {
            DispersionState::EnergyComputed
        } else if self.coefficients.is_some() {
            DispersionState::CoefficientsComputed
        } else if self.systems.len() == 2 {
            DispersionState::SystemsAttached
        } else {
            DispersionState::Created
        }
    }

    fn pair(&self) -> Result<(&'a Monomer, &'a Monomer), ComponentError> {
        match self.systems.as_slice() {
            [a, b] => Ok((*a, *b)),
            other => Err(ComponentError::InsufficientMonomers(other.len())),
        }
    }

    /// Free-atom and predicted inputs of each atom of `monomer`
    fn atom_terms(&self, monomer: &Monomer, with_widths: bool) -> Result<Vec<AtomTerms>, ComponentError> {
        let missing = |property| ComponentError::MissingProperty {
            monomer: monomer.name.clone(),
            property,
        };
        let ratios = monomer
            .hirshfeld_ratios()
            .ok_or_else(|| missing("hirshfeld ratios"))?;
        let widths = if with_widths {
            Some(monomer.valence_widths().ok_or_else(|| missing("valence widths"))?)
        } else {
            None
        };

        monomer
            .atoms
            .iter()
            .enumerate()
            .map(|(i, atom)| {
                let h = ratios[i];
                let decay_rate = match widths {
                    Some(w) => {
                        if !w[i].is_finite() || w[i] <= 0.0 {
                            return Err(ComponentError::InvalidValenceWidth {
                                monomer: monomer.name.clone(),
                                atom: i,
                                width: w[i],
                            });
                        }
                        1.0 / w[i]
                    }
                    None => 0.0,
                };
                Ok(AtomTerms {
                    c6: constants::free_c6(atom.element)? * h * h,
                    polarizability: h * constants::free_polarizability(atom.element)?,
                    radial_ratio: radial_ratio(atom.element)?,
                    decay_rate,
                    scale: constants::dispersion_scale(&self.params.scales, &monomer.atom_types()[i])?,
                })
            })
            .collect()
    }

    /// C6, C8 and C10 for every atom pair
    pub fn compute_coefficients(&mut self) -> Result<&DispersionCoefficients, ComponentError> {
        let (mon_a, mon_b) = self.pair()?;
        let terms_a = self.atom_terms(mon_a, false)?;
        let terms_b = self.atom_terms(mon_b, false)?;
        let coefficients = coefficient_matrices(&terms_a, &terms_b)?;
        Ok(self.coefficients.insert(coefficients))
    }

    /// Total dispersion energy in kcal/mol. Coefficients are computed first
    /// when needed; the atom-pair decomposition is always filled in.
    pub fn compute_dispersion(&mut self) -> Result<f64, ComponentError> {
        let (energy, _) = self.compute_decomposition()?;
        Ok(energy)
    }

    /// Total dispersion energy in kcal/mol together with its atom-pair
    /// contributions
    pub fn compute_decomposition(&mut self) -> Result<(f64, DMatrix<f64>), ComponentError> {
        let (mon_a, mon_b) = self.pair()?;
        let terms_a = self.atom_terms(mon_a, true)?;
        let terms_b = self.atom_terms(mon_b, true)?;
        let coefficients = match self.coefficients.take() {
            Some(c) => c,
            None => coefficient_matrices(&terms_a, &terms_b)?,
        };

        let cell = self.cell;
        let rows: Vec<Vec<f64>> = (0..mon_a.num_atoms())
            .into_par_iter()
            .map(|a| {
                (0..mon_b.num_atoms())
                    .map(|b| {
                        let r = cell
                            .pbc_distance(&mon_a.atoms[a].coordinates, &mon_b.atoms[b].coordinates)
                            .norm()
                            * ANGSTROM_TO_BOHR;
                        let decay = (terms_a[a].decay_rate * terms_b[b].decay_rate).sqrt();
                        pair_energy(
                            r,
                            decay,
                            coefficients.c6[(a, b)],
                            coefficients.c8[(a, b)],
                            coefficients.c10[(a, b)],
                            terms_a[a].scale * terms_b[b].scale,
                        )
                    })
                    .collect()
            })
            .collect();

        let total: f64 = rows.iter().map(|row| row.iter().sum::<f64>()).sum();
        let decomposition = DMatrix::from_fn(mon_a.num_atoms(), mon_b.num_atoms(), |a, b| {
            rows[a][b] * AU_TO_KCALMOL
        });

        let energy = total * AU_TO_KCALMOL;
        self.coefficients = Some(coefficients);
        self.decomposition = Some(decomposition.clone());
        self.energy = Some(energy);
        Ok((energy, decomposition))
    }

    pub fn coefficients(&self) -> Option<&DispersionCoefficients> {
        self.coefficients.as_ref()
    }

    /// Atom-pair contributions in kcal/mol, once the energy is computed
    pub fn decomposition(&self) -> Option<&DMatrix<f64>> {
        self.decomposition.as_ref()
    }

    pub fn energy(&self) -> Option<f64> {
        self.energy
    }
}

fn coefficient_matrices(
    terms_a: &[AtomTerms],
    terms_b: &[AtomTerms],
) -> Result<DispersionCoefficients, ComponentError> {
    let (na, nb) = (terms_a.len(), terms_b.len());
    let mut c6 = DMatrix::zeros(na, nb);
    let mut c8 = DMatrix::zeros(na, nb);
    let mut c10 = DMatrix::zeros(na, nb);

    for (a, ta) in terms_a.iter().enumerate() {
        for (b, tb) in terms_b.iter().enumerate() {
            let c6_ab = combine_c6(ta.c6, ta.polarizability, tb.c6, tb.polarizability)
                .filter(|c| *c > 0.0)
                .ok_or_else(|| ComponentError::DegenerateCoefficient {
                    atom_a: a,
                    atom_b: b,
                    reason: format!(
                        "C6 {} / {} with polarizabilities {} / {}",
                        ta.c6, tb.c6, ta.polarizability, tb.polarizability
                    ),
                })?;
            let c8_ab = c8_from_c6(c6_ab, ta.radial_ratio, tb.radial_ratio);
            c6[(a, b)] = c6_ab;
            c8[(a, b)] = c8_ab;
            c10[(a, b)] = c10_from_c8(c6_ab, c8_ab);
        }
    }
    Ok(DispersionCoefficients { c6, c8, c10 })
}

/// Damped dispersion energy of one pair in Hartree
#[inline]
fn pair_energy(r: f64, b: f64, c6: f64, c8: f64, c10: f64, scale: f64) -> f64 {
    if r < COINCIDENT_CUTOFF {
        return 0.0;
    }
    let f6 = tang_toennies_damping(6, r, b);
    let f8 = tang_toennies_damping(8, r, b);
    let f10 = tang_toennies_damping(10, r, b);
    -f6 * c6 / r.powi(6) - (f8 * c8 / r.powi(8) + f10 * c10 / r.powi(10)) * scale
}

/// Tang-Toennies dispersion as an energy component
pub struct TangToennies {
    pub params: TangToenniesParams,
    logger: Arc<dyn Logger>,
}

impl Default for TangToennies {
    fn default() -> Self {
        Self::new(TangToenniesParams::default())
    }
}

impl TangToennies {
    pub fn new(params: TangToenniesParams) -> Self {
        Self {
            params,
            logger: facade("cliff::dispersion"),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }
}

impl EnergyComponent for TangToennies {
    fn name(&self) -> &'static str {
        "Tang-Toennies"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Dispersion
    }

    fn evaluate(
        &self,
        mon_a: &Monomer,
        mon_b: &Monomer,
        cell: &dyn MinimumImage,
    ) -> Result<EnergyDecomposition, ComponentError> {
        let mut disp = Dispersion::new(&self.params, cell);
        disp.add_system(mon_a)?;
        disp.add_system(mon_b)?;
        let (total, matrix) = disp.compute_decomposition()?;
        self.logger.debug(format_args!(
            "Dispersion {} / {}: {:.6} kcal/mol",
            mon_a.name, mon_b.name, total
        ));

        Ok(EnergyDecomposition {
            kind: ComponentKind::Dispersion,
            matrix,
            total,
        })
    }
}
