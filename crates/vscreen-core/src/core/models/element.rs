use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Static per-element data used by perception, descriptors and file writers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementData {
    pub symbol: &'static str,
    /// Standard atomic weight in g/mol.
    pub mass: f64,
    /// Single-bond covalent radius in Angstroms (Cordero et al. 2008).
    pub covalent_radius: f64,
    pub is_metal: bool,
}

const fn el(symbol: &'static str, mass: f64, covalent_radius: f64, is_metal: bool) -> ElementData {
    ElementData {
        symbol,
        mass,
        covalent_radius,
        is_metal,
    }
}

// Indexed by atomic number; index 0 is the dummy atom.
static ELEMENTS: [ElementData; 55] = [
    el("*", 0.0, 0.0, false),
    el("H", 1.008, 0.31, false),
    el("He", 4.0026, 0.28, false),
    el("Li", 6.94, 1.28, true),
    el("Be", 9.0122, 0.96, true),
    el("B", 10.81, 0.84, false),
    el("C", 12.011, 0.76, false),
    el("N", 14.007, 0.71, false),
    el("O", 15.999, 0.66, false),
    el("F", 18.998, 0.57, false),
    el("Ne", 20.180, 0.58, false),
    el("Na", 22.990, 1.66, true),
    el("Mg", 24.305, 1.41, true),
    el("Al", 26.982, 1.21, true),
    el("Si", 28.085, 1.11, false),
    el("P", 30.974, 1.07, false),
    el("S", 32.06, 1.05, false),
    el("Cl", 35.45, 1.02, false),
    el("Ar", 39.948, 1.06, false),
    el("K", 39.098, 2.03, true),
    el("Ca", 40.078, 1.76, true),
    el("Sc", 44.956, 1.70, true),
    el("Ti", 47.867, 1.60, true),
    el("V", 50.942, 1.53, true),
    el("Cr", 51.996, 1.39, true),
    el("Mn", 54.938, 1.39, true),
    el("Fe", 55.845, 1.32, true),
    el("Co", 58.933, 1.26, true),
    el("Ni", 58.693, 1.24, true),
    el("Cu", 63.546, 1.32, true),
    el("Zn", 65.38, 1.22, true),
    el("Ga", 69.723, 1.22, true),
    el("Ge", 72.630, 1.20, false),
    el("As", 74.922, 1.19, false),
    el("Se", 78.971, 1.20, false),
    el("Br", 79.904, 1.20, false),
    el("Kr", 83.798, 1.16, false),
    el("Rb", 85.468, 2.20, true),
    el("Sr", 87.62, 1.95, true),
    el("Y", 88.906, 1.90, true),
    el("Zr", 91.224, 1.75, true),
    el("Nb", 92.906, 1.64, true),
    el("Mo", 95.95, 1.54, true),
    el("Tc", 98.0, 1.47, true),
    el("Ru", 101.07, 1.46, true),
    el("Rh", 102.91, 1.42, true),
    el("Pd", 106.42, 1.39, true),
    el("Ag", 107.87, 1.45, true),
    el("Cd", 112.41, 1.44, true),
    el("In", 114.82, 1.42, true),
    el("Sn", 118.71, 1.39, true),
    el("Sb", 121.76, 1.39, false),
    el("Te", 127.60, 1.38, false),
    el("I", 126.90, 1.39, false),
    el("Xe", 131.29, 1.40, false),
];

static SYMBOL_TO_NUMBER: Map<&'static str, u8> = phf_map! {
    "*" => 0, "H" => 1, "He" => 2, "Li" => 3, "Be" => 4, "B" => 5, "C" => 6, "N" => 7,
    "O" => 8, "F" => 9, "Ne" => 10, "Na" => 11, "Mg" => 12, "Al" => 13, "Si" => 14,
    "P" => 15, "S" => 16, "Cl" => 17, "Ar" => 18, "K" => 19, "Ca" => 20, "Sc" => 21,
    "Ti" => 22, "V" => 23, "Cr" => 24, "Mn" => 25, "Fe" => 26, "Co" => 27, "Ni" => 28,
    "Cu" => 29, "Zn" => 30, "Ga" => 31, "Ge" => 32, "As" => 33, "Se" => 34, "Br" => 35,
    "Kr" => 36, "Rb" => 37, "Sr" => 38, "Y" => 39, "Zr" => 40, "Nb" => 41, "Mo" => 42,
    "Tc" => 43, "Ru" => 44, "Rh" => 45, "Pd" => 46, "Ag" => 47, "Cd" => 48, "In" => 49,
    "Sn" => 50, "Sb" => 51, "Te" => 52, "I" => 53, "Xe" => 54,
};

/// A chemical element identified by its atomic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Element(u8);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown element symbol: '{0}'")]
pub struct ParseElementError(pub String);

impl Element {
    pub const DUMMY: Element = Element(0);
    pub const H: Element = Element(1);
    pub const B: Element = Element(5);
    pub const C: Element = Element(6);
    pub const N: Element = Element(7);
    pub const O: Element = Element(8);
    pub const F: Element = Element(9);
    pub const SI: Element = Element(14);
    pub const P: Element = Element(15);
    pub const S: Element = Element(16);
    pub const CL: Element = Element(17);
    pub const SE: Element = Element(34);
    pub const BR: Element = Element(35);
    pub const I: Element = Element(53);

    /// Builds an element from an atomic number, mapping unsupported numbers to the dummy atom.
    pub fn from_atomic_number(number: u8) -> Self {
        if (number as usize) < ELEMENTS.len() {
            Element(number)
        } else {
            Element::DUMMY
        }
    }

    pub fn atomic_number(self) -> u8 {
        self.0
    }

    fn data(self) -> &'static ElementData {
        &ELEMENTS[self.0 as usize]
    }

    pub fn symbol(self) -> &'static str {
        self.data().symbol
    }

    pub fn mass(self) -> f64 {
        self.data().mass
    }

    pub fn covalent_radius(self) -> f64 {
        self.data().covalent_radius
    }

    pub fn is_metal(self) -> bool {
        self.data().is_metal
    }

    pub fn is_hydrogen(self) -> bool {
        self == Element::H
    }

    pub fn is_halogen(self) -> bool {
        matches!(self.0, 9 | 17 | 35 | 53)
    }

    /// Typical valences in ascending order, used to derive implicit hydrogen counts.
    ///
    /// Elements outside the organic subset return an empty slice and never
    /// receive implicit hydrogens.
    pub fn default_valences(self, formal_charge: i8) -> &'static [u8] {
        match (self.0, formal_charge) {
            (5, 0) => &[3],
            (6, 0) => &[4],
            (6, -1) | (6, 1) => &[3],
            (7, 0) => &[3, 5],
            (7, 1) => &[4],
            (7, -1) => &[2],
            (8, 0) => &[2],
            (8, 1) => &[3],
            (8, -1) => &[1],
            (9, 0) | (17, 0) | (35, 0) | (53, 0) => &[1],
            (14, 0) => &[4],
            (15, 0) => &[3, 5],
            (15, 1) => &[4],
            (16, 0) | (34, 0) => &[2, 4, 6],
            (16, 1) => &[3],
            (16, -1) => &[1],
            _ => &[],
        }
    }

    /// Parses a symbol case-insensitively ("CL", "cl" and "Cl" all map to chlorine).
    pub fn from_symbol_lenient(symbol: &str) -> Option<Self> {
        let trimmed = symbol.trim();
        let mut chars = trimmed.chars();
        let first = chars.next()?;
        let normalized: String = std::iter::once(first.to_ascii_uppercase())
            .chain(chars.map(|c| c.to_ascii_lowercase()))
            .collect();
        SYMBOL_TO_NUMBER.get(normalized.as_str()).map(|&n| Element(n))
    }
}

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SYMBOL_TO_NUMBER
            .get(s.trim())
            .map(|&n| Element(n))
            .ok_or_else(|| ParseElementError(s.to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
