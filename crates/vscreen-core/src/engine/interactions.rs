//! Protein-ligand interaction detection and interaction fingerprints.
//!
//! Interactions are found from the perceived atom features of both
//! partners. Every interacting atom pair (or ring pair for stacking) adds
//! one count to the column of its kind on the protein residue it touches.

use crate::core::models::molecule::Molecule;
use crate::core::models::residue::RESIDUE_TYPE_ORDER;
use crate::core::utils::geometry::{self, Plane};
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;

pub const HYDROPHOBIC_CUTOFF: f64 = 4.0;
pub const HBOND_CUTOFF: f64 = 3.5;
pub const SALT_BRIDGE_CUTOFF: f64 = 4.0;
pub const METAL_CUTOFF: f64 = 4.0;
pub const PI_STACKING_CUTOFF: f64 = 5.0;
/// Largest ring plane angle still counted as face-to-face stacking.
pub const PI_STACKING_TOLERANCE: f64 = 30.0;

const ATOM_PAIR_CUTOFF: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Hydrophobic,
    PiStackingFaceToFace,
    PiStackingEdgeToFace,
    /// Hydrogen bond donated by the protein.
    HBondProteinDonor,
    /// Hydrogen bond accepted by the protein.
    HBondProteinAcceptor,
    /// Salt bridge with a positive protein atom.
    SaltBridgeProteinPositive,
    /// Salt bridge with a negative protein atom.
    SaltBridgeProteinNegative,
    Metal,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 8] = [
        Self::Hydrophobic,
        Self::PiStackingFaceToFace,
        Self::PiStackingEdgeToFace,
        Self::HBondProteinDonor,
        Self::HBondProteinAcceptor,
        Self::SaltBridgeProteinPositive,
        Self::SaltBridgeProteinNegative,
        Self::Metal,
    ];

    /// Column of this kind within a residue's block of the fingerprint.
    pub fn column(self) -> usize {
        self as usize
    }
}

/// Number of fingerprint columns per residue (or residue type).
pub const COLUMNS_PER_RESIDUE: usize = InteractionKind::ALL.len();
/// Length of the per-residue-type fingerprint: twenty amino acids plus "other".
pub const SIFP_LENGTH: usize = (RESIDUE_TYPE_ORDER.len() + 1) * COLUMNS_PER_RESIDUE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interaction {
    pub kind: InteractionKind,
    /// Index into the protein's residue list.
    pub residue: usize,
}

struct AromaticRing {
    centroid: Point3<f64>,
    plane: Plane,
    residue: Option<usize>,
}

fn aromatic_rings(molecule: &Molecule) -> Vec<AromaticRing> {
    molecule
        .rings()
        .iter()
        .filter(|ring| ring.iter().all(|&i| molecule.atoms()[i].aromatic))
        .filter_map(|ring| {
            let points: Vec<Point3<f64>> =
                ring.iter().map(|&i| molecule.atoms()[i].position).collect();
            let plane = Plane::fit(&points)?;
            Some(AromaticRing {
                centroid: plane.center,
                plane,
                residue: molecule.atoms()[ring[0]].residue,
            })
        })
        .collect()
}

fn atom_pair_kinds(ligand: &Molecule, l: usize, protein: &Molecule, p: usize, distance: f64) -> Vec<InteractionKind> {
    let lf = &ligand.atoms()[l].features;
    let pf = &protein.atoms()[p].features;
    let mut kinds = Vec::new();
    if distance <= HYDROPHOBIC_CUTOFF && lf.hydrophobe && pf.hydrophobe {
        kinds.push(InteractionKind::Hydrophobic);
    }
    if distance <= HBOND_CUTOFF {
        if pf.donor && lf.acceptor {
            kinds.push(InteractionKind::HBondProteinDonor);
        }
        if pf.acceptor && lf.donor {
            kinds.push(InteractionKind::HBondProteinAcceptor);
        }
    }
    if distance <= SALT_BRIDGE_CUTOFF {
        if pf.positive && lf.negative {
            kinds.push(InteractionKind::SaltBridgeProteinPositive);
        }
        if pf.negative && lf.positive {
            kinds.push(InteractionKind::SaltBridgeProteinNegative);
        }
    }
    if distance <= METAL_CUTOFF && pf.metal && (lf.acceptor || lf.negative) {
        kinds.push(InteractionKind::Metal);
    }
    kinds
}

/// Every interaction between a ligand pose and the residues of a protein.
///
/// Hydrogens are ignored on both sides; protein atoms outside any residue
/// cannot be assigned a column and are skipped.
pub fn detect(ligand: &Molecule, protein: &Molecule) -> Vec<Interaction> {
    let protein_atoms: Vec<usize> = protein
        .atoms()
        .iter()
        .enumerate()
        .filter(|(_, a)| !a.is_hydrogen() && a.residue.is_some())
        .map(|(i, _)| i)
        .collect();
    let mut interactions = Vec::new();
    if protein_atoms.is_empty() {
        return interactions;
    }

    let positions: Vec<[f64; 3]> = protein_atoms
        .iter()
        .map(|&i| {
            let p = protein.atoms()[i].position;
            [p.x, p.y, p.z]
        })
        .collect();
    let kdtree: KdTree<f64, 3> = (&positions).into();

    for (l, atom) in ligand.atoms().iter().enumerate() {
        if atom.is_hydrogen() {
            continue;
        }
        let query = [atom.position.x, atom.position.y, atom.position.z];
        let mut neighbours =
            kdtree.within_unsorted::<SquaredEuclidean>(&query, ATOM_PAIR_CUTOFF * ATOM_PAIR_CUTOFF);
        neighbours.sort_by_key(|n| n.item);
        for neighbour in neighbours {
            let p = protein_atoms[neighbour.item as usize];
            let Some(residue) = protein.atoms()[p].residue else {
                continue;
            };
            let distance = neighbour.distance.sqrt();
            interactions.extend(
                atom_pair_kinds(ligand, l, protein, p, distance)
                    .into_iter()
                    .map(|kind| Interaction { kind, residue }),
            );
        }
    }

    let protein_rings = aromatic_rings(protein);
    for ligand_ring in aromatic_rings(ligand) {
        for protein_ring in &protein_rings {
            let Some(residue) = protein_ring.residue else {
                continue;
            };
            if nalgebra::distance(&ligand_ring.centroid, &protein_ring.centroid) > PI_STACKING_CUTOFF {
                continue;
            }
            let angle = geometry::plane_angle_degrees(
                &ligand_ring.plane.normal,
                &protein_ring.plane.normal,
            );
            let kind = if angle <= PI_STACKING_TOLERANCE {
                InteractionKind::PiStackingFaceToFace
            } else if angle >= 90.0 - PI_STACKING_TOLERANCE {
                InteractionKind::PiStackingEdgeToFace
            } else {
                continue;
            };
            interactions.push(Interaction { kind, residue });
        }
    }
    interactions
}

/// Interaction counts per protein residue, residues in file order.
pub fn ifp(ligand: &Molecule, protein: &Molecule) -> Vec<u32> {
    let mut fingerprint = vec![0u32; protein.residues().len() * COLUMNS_PER_RESIDUE];
    for interaction in detect(ligand, protein) {
        fingerprint[interaction.residue * COLUMNS_PER_RESIDUE + interaction.kind.column()] += 1;
    }
    fingerprint
}

/// Interaction counts per residue type (twenty amino acids, then everything else).
pub fn sifp(ligand: &Molecule, protein: &Molecule) -> Vec<u32> {
    let mut fingerprint = vec![0u32; SIFP_LENGTH];
    for interaction in detect(ligand, protein) {
        let residue_type = protein.residues()[interaction.residue].type_index();
        fingerprint[residue_type * COLUMNS_PER_RESIDUE + interaction.kind.column()] += 1;
    }
    fingerprint
}

/// Dice similarity of two count vectors; 0.0 when both are empty.
pub fn dice(a: &[u32], b: &[u32]) -> f64 {
    let dot: u64 = a.iter().zip(b).map(|(&x, &y)| x as u64 * y as u64).sum();
    let norm = |v: &[u32]| v.iter().map(|&x| x as u64 * x as u64).sum::<u64>();
    let denominator = norm(a) + norm(b);
    if denominator == 0 {
        return 0.0;
    }
    2.0 * dot as f64 / denominator as f64
}
