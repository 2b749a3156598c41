//! Atom representation and related functionality

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{ConstantsError, Table};

/// Chemical elements known to at least one of the free-atom tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    Hydrogen,   // H
    Helium,     // He
    Boron,      // B
    Carbon,     // C
    Nitrogen,   // N
    Oxygen,     // O
    Fluorine,   // F
    Neon,       // Ne
    Silicon,    // Si
    Phosphorus, // P
    Sulfur,     // S
    Chlorine,   // Cl
    Argon,      // Ar
    Bromine,    // Br
    Krypton,    // Kr
    Iodine,     // I
}

impl Element {
    /// Parse an element from its chemical symbol (case-sensitive, e.g. "Cl")
    pub fn from_symbol(s: &str) -> Option<Self> {
        let element = match s {
            "H" => Element::Hydrogen,
            "He" => Element::Helium,
            "B" => Element::Boron,
            "C" => Element::Carbon,
            "N" => Element::Nitrogen,
            "O" => Element::Oxygen,
            "F" => Element::Fluorine,
            "Ne" => Element::Neon,
            "Si" => Element::Silicon,
            "P" => Element::Phosphorus,
            "S" => Element::Sulfur,
            "Cl" => Element::Chlorine,
            "Ar" => Element::Argon,
            "Br" => Element::Bromine,
            "Kr" => Element::Krypton,
            "I" => Element::Iodine,
            _ => return None,
        };
        Some(element)
    }

    /// Parse an element from an atom label such as "C3", "HC", "O1" or "N+".
    ///
    /// Digits and charge markers are stripped, then the first capitalised
    /// token is taken as the symbol: "HC" is a hydrogen, "Cl2" a chlorine.
    pub fn from_label(label: &str) -> Result<Self, ConstantsError> {
        let symbol = element_symbol_of(label);
        Self::from_symbol(&symbol).ok_or(ConstantsError::UnknownElement {
            symbol,
            table: Table::ElementSymbols,
        })
    }

    /// Chemical symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Element::Hydrogen => "H",
            Element::Helium => "He",
            Element::Boron => "B",
            Element::Carbon => "C",
            Element::Nitrogen => "N",
            Element::Oxygen => "O",
            Element::Fluorine => "F",
            Element::Neon => "Ne",
            Element::Silicon => "Si",
            Element::Phosphorus => "P",
            Element::Sulfur => "S",
            Element::Chlorine => "Cl",
            Element::Argon => "Ar",
            Element::Bromine => "Br",
            Element::Krypton => "Kr",
            Element::Iodine => "I",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Reduce an atom label to its element symbol without validating it.
fn element_symbol_of(label: &str) -> String {
    let stripped: String = label
        .trim()
        .chars()
        .filter(|c| !c.is_ascii_digit() && *c != '+' && *c != '-')
        .collect();

    let mut chars = stripped.chars();
    let mut symbol = String::new();
    match chars.next() {
        Some(first) => symbol.push(first),
        None => return symbol,
    }
    for c in chars {
        if c.is_uppercase() {
            break;
        }
        symbol.push(c);
    }
    symbol
}

/// Represents an atom of a monomer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    /// Label as read from the input (e.g. "C", "O1")
    pub label: String,

    /// Element parsed from the label
    pub element: Element,

    /// 3D coordinates (in Angstroms)
    pub coordinates: Vector3<f64>,
}

impl Atom {
    /// Create a new atom, parsing the element from its label
    pub fn new(label: &str, coordinates: Vector3<f64>) -> Result<Self, ConstantsError> {
        Ok(Self {
            label: label.trim().to_string(),
            element: Element::from_label(label)?,
            coordinates,
        })
    }

    /// Create an atom from a known element
    pub fn from_element(element: Element, coordinates: Vector3<f64>) -> Self {
        Self {
            label: element.symbol().to_string(),
            element,
            coordinates,
        }
    }

    /// Calculate distance to another atom (Angstroms)
    pub fn distance(&self, other: &Atom) -> f64 {
        (self.coordinates - other.coordinates).norm()
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, {}, {})",
            self.label, self.coordinates.x, self.coordinates.y, self.coordinates.z
        )
    }
}
