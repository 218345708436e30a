use crate::core::models::residue::Residue;
use phf::{Map, Set, phf_map, phf_set};

pub const DONOR: u8 = 1;
pub const ACCEPTOR: u8 = 1 << 1;
pub const POSITIVE: u8 = 1 << 2;
pub const NEGATIVE: u8 = 1 << 3;

static BACKBONE_ATOM_NAMES: Set<&'static str> = phf_set! {
    "N", "H", "HN", "CA", "HA", "C", "O", "OXT", "H1", "H2", "H3", "NT",
    "HT1", "HT2", "HT3", "OT1", "OT2", "HA2", "HA3",
};

// Side-chain polar atoms keyed by "RESIDUE:ATOM". Protonation variants are
// listed explicitly; everything else falls back to the canonical residue.
static SIDE_CHAIN_FLAGS: Map<&'static str, u8> = phf_map! {
    "ARG:NE" => DONOR | POSITIVE,
    "ARG:NH1" => DONOR | POSITIVE,
    "ARG:NH2" => DONOR | POSITIVE,
    "ASN:OD1" => ACCEPTOR,
    "ASN:ND2" => DONOR,
    "ASP:OD1" => ACCEPTOR | NEGATIVE,
    "ASP:OD2" => ACCEPTOR | NEGATIVE,
    "ASH:OD1" => ACCEPTOR,
    "ASH:OD2" => DONOR | ACCEPTOR,
    "CYS:SG" => DONOR | ACCEPTOR,
    "CYX:SG" => ACCEPTOR,
    "GLN:OE1" => ACCEPTOR,
    "GLN:NE2" => DONOR,
    "GLU:OE1" => ACCEPTOR | NEGATIVE,
    "GLU:OE2" => ACCEPTOR | NEGATIVE,
    "GLH:OE1" => ACCEPTOR,
    "GLH:OE2" => DONOR | ACCEPTOR,
    "HIS:ND1" => DONOR | ACCEPTOR,
    "HIS:NE2" => DONOR | ACCEPTOR,
    "HID:ND1" => DONOR,
    "HID:NE2" => ACCEPTOR,
    "HSD:ND1" => DONOR,
    "HSD:NE2" => ACCEPTOR,
    "HIE:ND1" => ACCEPTOR,
    "HIE:NE2" => DONOR,
    "HSE:ND1" => ACCEPTOR,
    "HSE:NE2" => DONOR,
    "HIP:ND1" => DONOR | POSITIVE,
    "HIP:NE2" => DONOR | POSITIVE,
    "HSP:ND1" => DONOR | POSITIVE,
    "HSP:NE2" => DONOR | POSITIVE,
    "LYS:NZ" => DONOR | POSITIVE,
    "LYN:NZ" => DONOR | ACCEPTOR,
    "MET:SD" => ACCEPTOR,
    "SER:OG" => DONOR | ACCEPTOR,
    "THR:OG1" => DONOR | ACCEPTOR,
    "TRP:NE1" => DONOR,
    "TYR:OH" => DONOR | ACCEPTOR,
};

pub fn is_backbone_atom(atom_name: &str) -> bool {
    BACKBONE_ATOM_NAMES.contains(atom_name.trim())
}

/// Donor/acceptor/charge flags of a protein or water atom, or `None` when no template applies.
///
/// Returned flags describe heavy atoms only; hydrogens inherit donor
/// status from the atom they are bonded to.
pub fn template_flags(residue: &Residue, atom_name: &str) -> Option<u8> {
    let atom_name = atom_name.trim();
    if residue.is_water() {
        return atom_name.starts_with('O').then_some(DONOR | ACCEPTOR);
    }
    if !residue.is_amino_acid() {
        return None;
    }
    match atom_name {
        "N" | "NT" => return Some(if residue.canonical_name() == "PRO" { 0 } else { DONOR }),
        "O" | "OT1" => return Some(ACCEPTOR),
        "OXT" | "OT2" => return Some(ACCEPTOR | NEGATIVE),
        _ => {}
    }
    let exact = format!("{}:{}", residue.name, atom_name);
    if let Some(&flags) = SIDE_CHAIN_FLAGS.get(exact.as_str()) {
        return Some(flags);
    }
    let canonical = format!("{}:{}", residue.canonical_name(), atom_name);
    Some(SIDE_CHAIN_FLAGS.get(canonical.as_str()).copied().unwrap_or(0))
}
