use phf::{Set, phf_set};

static AMINO_ACIDS: Set<&'static str> = phf_set! {
    "ALA", "ARG", "ASN", "ASP", "CYS", "GLN", "GLU", "GLY", "HIS", "ILE",
    "LEU", "LYS", "MET", "PHE", "PRO", "SER", "THR", "TRP", "TYR", "VAL",
    "HID", "HIE", "HIP", "HSD", "HSE", "HSP", "CYX", "ASH", "GLH", "LYN",
};

/// Residue names in the column order used by per-residue-type fingerprints.
pub const RESIDUE_TYPE_ORDER: [&str; 20] = [
    "ALA", "ARG", "ASN", "ASP", "CYS", "GLN", "GLU", "GLY", "HIS", "ILE", "LEU", "LYS", "MET",
    "PHE", "PRO", "SER", "THR", "TRP", "TYR", "VAL",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    pub name: String,       // Residue name (e.g., "ALA", "HOH", "LIG")
    pub number: isize,      // Residue sequence number from the source file
    pub chain: char,        // Chain identifier
    pub atoms: Vec<usize>,  // Indices of atoms belonging to this residue
}

impl Residue {
    pub fn new(name: &str, number: isize, chain: char) -> Self {
        Self {
            name: name.trim().to_string(),
            number,
            chain,
            atoms: Vec::new(),
        }
    }

    pub fn is_amino_acid(&self) -> bool {
        AMINO_ACIDS.contains(self.name.as_str())
    }

    pub fn is_water(&self) -> bool {
        matches!(self.name.as_str(), "HOH" | "WAT" | "H2O" | "SOL" | "TIP3")
    }

    /// Canonical three-letter name, folding protonation-state variants onto the parent residue.
    pub fn canonical_name(&self) -> &str {
        match self.name.as_str() {
            "HID" | "HIE" | "HIP" | "HSD" | "HSE" | "HSP" => "HIS",
            "CYX" => "CYS",
            "ASH" => "ASP",
            "GLH" => "GLU",
            "LYN" => "LYS",
            other => other,
        }
    }

    /// Column of this residue in the per-residue-type table; non-standard residues share the last slot.
    pub fn type_index(&self) -> usize {
        let name = self.canonical_name();
        RESIDUE_TYPE_ORDER
            .iter()
            .position(|&r| r == name)
            .unwrap_or(RESIDUE_TYPE_ORDER.len())
    }
}
