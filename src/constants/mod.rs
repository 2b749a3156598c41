//! Unit conversions and free-atom reference tables

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::atom::Element;

/// Hartree to kcal/mol
pub const AU_TO_KCALMOL: f64 = 627.5095;

/// Angstrom to bohr
pub const ANGSTROM_TO_BOHR: f64 = 1.8897268;

/// Bohr to Angstrom
pub const BOHR_TO_ANGSTROM: f64 = 0.529177;

/// Reference tables that can be queried per element or atom type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    ElementSymbols,
    AtomicNumber,
    FreePolarizability,
    FreeC6,
    RadialMomentR2,
    RadialMomentR4,
    AtomicWeight,
    CovalentRadius,
    FreeValenceWidth,
    DispersionScale,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Table::ElementSymbols => "element symbols",
            Table::AtomicNumber => "atomic numbers",
            Table::FreePolarizability => "free-atom polarizabilities",
            Table::FreeC6 => "free-atom C6 coefficients",
            Table::RadialMomentR2 => "free-atom <r^2>",
            Table::RadialMomentR4 => "free-atom <r^4>",
            Table::AtomicWeight => "atomic weights",
            Table::CovalentRadius => "covalent radii",
            Table::FreeValenceWidth => "free-atom valence widths",
            Table::DispersionScale => "dispersion scale factors",
        };
        f.write_str(name)
    }
}

/// Errors raised by table lookups
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstantsError {
    #[error("Can't find element {symbol} in {table}")]
    UnknownElement { symbol: String, table: Table },
}

fn missing(element: Element, table: Table) -> ConstantsError {
    ConstantsError::UnknownElement {
        symbol: element.symbol().to_string(),
        table,
    }
}

/// Atomic number (nuclear charge) used by the Coulomb-matrix descriptor
pub fn atomic_number(element: Element) -> Result<f64, ConstantsError> {
    let z = match element {
        Element::Hydrogen => 1.0,
        Element::Boron => 5.0,
        Element::Carbon => 6.0,
        Element::Nitrogen => 7.0,
        Element::Oxygen => 8.0,
        Element::Fluorine => 9.0,
        Element::Phosphorus => 15.0,
        Element::Sulfur => 16.0,
        Element::Chlorine => 17.0,
        Element::Bromine => 35.0,
        Element::Iodine => 53.0,
        _ => return Err(missing(element, Table::AtomicNumber)),
    };
    Ok(z)
}

/// Free-atom static dipole polarizability (bohr^3)
pub fn free_polarizability(element: Element) -> Result<f64, ConstantsError> {
    let alpha = match element {
        Element::Hydrogen => 4.50,
        Element::Helium => 1.38,
        Element::Carbon => 12.00,
        Element::Nitrogen => 7.40,
        Element::Oxygen => 5.40,
        Element::Fluorine => 3.80,
        Element::Neon => 2.67,
        Element::Silicon => 37.00,
        Element::Phosphorus => 25.00,
        Element::Sulfur => 19.60,
        Element::Chlorine => 15.00,
        Element::Argon => 11.10,
        Element::Bromine => 20.00,
        Element::Krypton => 16.80,
        Element::Iodine => 35.00,
        _ => return Err(missing(element, Table::FreePolarizability)),
    };
    Ok(alpha)
}

/// Free-atom homonuclear C6 coefficient (hartree bohr^6)
pub fn free_c6(element: Element) -> Result<f64, ConstantsError> {
    let c6 = match element {
        Element::Hydrogen => 6.50,
        Element::Helium => 1.46,
        Element::Carbon => 46.60,
        Element::Nitrogen => 24.20,
        Element::Oxygen => 15.60,
        Element::Fluorine => 9.52,
        Element::Neon => 6.38,
        Element::Silicon => 305.0,
        Element::Phosphorus => 185.0,
        Element::Sulfur => 134.0,
        Element::Chlorine => 94.60,
        Element::Argon => 64.30,
        Element::Bromine => 162.0,
        Element::Krypton => 130.0,
        Element::Iodine => 385.0,
        _ => return Err(missing(element, Table::FreeC6)),
    };
    Ok(c6)
}

/// Free-atom expectation value <r^2> (bohr^2)
pub fn radial_moment_r2(element: Element) -> Result<f64, ConstantsError> {
    let r2 = match element {
        Element::Carbon => 14.046740332406095,
        Element::Chlorine => 27.651441841502898,
        Element::Fluorine => 10.601441421661603,
        Element::Hydrogen => 3.1589186627858976,
        Element::Nitrogen => 12.419553635522538,
        Element::Oxygen => 11.566513469042524,
        Element::Sulfur => 29.17364957903178,
        Element::Bromine => 40.3810331885329,
        _ => return Err(missing(element, Table::RadialMomentR2)),
    };
    Ok(r2)
}

/// Free-atom expectation value <r^4> (bohr^4)
pub fn radial_moment_r4(element: Element) -> Result<f64, ConstantsError> {
    let r4 = match element {
        Element::Carbon => 109.39192409419,
        Element::Chlorine => 187.29318856137,
        Element::Fluorine => 41.707556384507,
        Element::Hydrogen => 26.818416656404,
        Element::Nitrogen => 71.475971390365,
        Element::Oxygen => 56.180301267329,
        Element::Sulfur => 239.014016575349,
        Element::Bromine => 288.05982633399606,
        _ => return Err(missing(element, Table::RadialMomentR4)),
    };
    Ok(r4)
}

/// Standard atomic weight (amu)
pub fn atomic_weight(element: Element) -> Result<f64, ConstantsError> {
    let weight = match element {
        Element::Hydrogen => 1.008,
        Element::Boron => 10.81,
        Element::Carbon => 12.01,
        Element::Nitrogen => 14.01,
        Element::Oxygen => 16.00,
        Element::Fluorine => 19.00,
        Element::Phosphorus => 31.00,
        Element::Sulfur => 32.06,
        Element::Chlorine => 35.45,
        Element::Bromine => 79.90,
        Element::Iodine => 126.90,
        _ => return Err(missing(element, Table::AtomicWeight)),
    };
    Ok(weight)
}

/// Covalent radius (Angstrom) used for bond perception
pub fn covalent_radius(element: Element) -> Result<f64, ConstantsError> {
    let radius = match element {
        Element::Hydrogen => 0.31,
        Element::Carbon => 0.70,
        Element::Nitrogen => 0.71,
        Element::Oxygen => 0.66,
        Element::Fluorine => 0.57,
        Element::Phosphorus => 1.07,
        Element::Sulfur => 1.05,
        Element::Chlorine => 1.02,
        Element::Bromine => 1.20,
        Element::Iodine => 1.39,
        _ => return Err(missing(element, Table::CovalentRadius)),
    };
    Ok(radius)
}

/// Free-atom valence width (bohr)
pub fn free_valence_width(element: Element) -> Result<f64, ConstantsError> {
    let width = match element {
        Element::Hydrogen => 0.5094,
        Element::Carbon => 0.5242,
        Element::Nitrogen => 0.4415,
        Element::Oxygen => 0.3882,
        _ => return Err(missing(element, Table::FreeValenceWidth)),
    };
    Ok(width)
}

/// Empirical per-atom-type prefactors of the C8/C10 dispersion terms
const DISPERSION_SCALES: [(&str, f64); 17] = [
    ("Cl", 0.628936576),
    ("F", 0.593460843),
    ("S1", 0.724969324),
    ("S2", 0.689804317),
    ("HS", 4.25713031e-06),
    ("HC", 0.161948995),
    ("HN", 0.142004497),
    ("HO", 8.03872825e-07),
    ("C4", 0.348912752),
    ("C3", 0.380138542),
    ("C2", 0.474737451),
    ("N3", 0.251517245),
    ("N2", 0.921337229),
    ("N1", 0.814292607),
    ("O1", 0.779432259),
    ("O2", 0.547957036),
    ("Br", 0.499319918),
];

/// Default dispersion scale factors keyed by atom type
pub fn default_dispersion_scales() -> HashMap<String, f64> {
    DISPERSION_SCALES
        .iter()
        .map(|(atom_type, scale)| (atom_type.to_string(), *scale))
        .collect()
}

/// Look up an atom type in a dispersion scale table
pub fn dispersion_scale(scales: &HashMap<String, f64>, atom_type: &str) -> Result<f64, ConstantsError> {
    scales
        .get(atom_type)
        .copied()
        .ok_or_else(|| ConstantsError::UnknownElement {
            symbol: atom_type.to_string(),
            table: Table::DispersionScale,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversions_are_inverse() {
        assert!((ANGSTROM_TO_BOHR * BOHR_TO_ANGSTROM - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_free_atom_tables() {
        assert_eq!(free_c6(Element::Carbon).unwrap(), 46.60);
        assert_eq!(free_polarizability(Element::Carbon).unwrap(), 12.00);
        assert_eq!(atomic_number(Element::Chlorine).unwrap(), 17.0);
        assert_eq!(free_valence_width(Element::Carbon).unwrap(), 0.5242);
        assert_eq!(covalent_radius(Element::Oxygen).unwrap(), 0.66);
    }

    #[test]
    fn test_lookup_miss_names_element_and_table() {
        let err = radial_moment_r2(Element::Iodine).unwrap_err();
        assert_eq!(
            err,
            ConstantsError::UnknownElement {
                symbol: "I".to_string(),
                table: Table::RadialMomentR2,
            }
        );
        assert_eq!(err.to_string(), "Can't find element I in free-atom <r^2>");
        assert!(atomic_number(Element::Helium).is_err());
        assert!(free_valence_width(Element::Sulfur).is_err());
    }

    #[test]
    fn test_dispersion_scales() {
        let scales = default_dispersion_scales();
        assert_eq!(scales.len(), 17);
        assert_eq!(dispersion_scale(&scales, "C4").unwrap(), 0.348912752);
        let err = dispersion_scale(&scales, "N4").unwrap_err();
        assert!(err.to_string().contains("dispersion scale factors"));
    }
}
