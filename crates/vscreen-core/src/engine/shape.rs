//! Ultrafast shape recognition descriptors.
//!
//! USR describes a conformer by the distributions of its heavy-atom
//! distances to four reference points: the centroid (ctd), the atom closest
//! to it (cst), the atom farthest from it (fct) and the atom farthest from
//! fct (ftf). Each distribution is summarised by its mean, standard
//! deviation and the cube root of its skewness.
//!
//! USR-CAT repeats the same four-point scheme on pharmacophoric atom
//! subsets, and ElectroShape lifts the atoms into four dimensions with
//! partial charge as the fourth coordinate.

use crate::core::models::molecule::Molecule;
use nalgebra::{Point3, Vector3, Vector4};

pub const USR_LENGTH: usize = 12;
pub const USR_CAT_LENGTH: usize = 60;
pub const ELECTROSHAPE_LENGTH: usize = 15;

/// Scale applied to partial charges in the fourth ElectroShape dimension.
pub const ELECTROSHAPE_CHARGE_SCALE: f64 = 25.0;

fn moments(distances: &[f64]) -> [f64; 3] {
    if distances.is_empty() {
        return [0.0; 3];
    }
    let n = distances.len() as f64;
    let mean = distances.iter().sum::<f64>() / n;
    let variance = distances.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
    let third = distances.iter().map(|d| (d - mean).powi(3)).sum::<f64>() / n;
    let sd = variance.sqrt();
    // Skewness is undefined for a constant distribution.
    let skewness = if sd > 1e-12 { third / sd.powi(3) } else { 0.0 };
    [mean, sd, skewness.cbrt()]
}

fn farthest_from(points: &[Point3<f64>], origin: &Point3<f64>) -> Option<Point3<f64>> {
    points
        .iter()
        .max_by(|a, b| {
            nalgebra::distance_squared(a, origin).total_cmp(&nalgebra::distance_squared(b, origin))
        })
        .copied()
}

fn closest_to(points: &[Point3<f64>], origin: &Point3<f64>) -> Option<Point3<f64>> {
    points
        .iter()
        .min_by(|a, b| {
            nalgebra::distance_squared(a, origin).total_cmp(&nalgebra::distance_squared(b, origin))
        })
        .copied()
}

fn reference_points(points: &[Point3<f64>]) -> Option<[Point3<f64>; 4]> {
    let ctd = crate::core::utils::geometry::centroid(points)?;
    let cst = closest_to(points, &ctd)?;
    let fct = farthest_from(points, &ctd)?;
    let ftf = farthest_from(points, &fct)?;
    Some([ctd, cst, fct, ftf])
}

fn moments_to(points: &[Point3<f64>], references: &[Point3<f64>; 4], out: &mut Vec<f64>) {
    for reference in references {
        let distances: Vec<f64> = points
            .iter()
            .map(|p| nalgebra::distance(p, reference))
            .collect();
        out.extend(moments(&distances));
    }
}

fn heavy_positions(molecule: &Molecule, keep: impl Fn(usize) -> bool) -> Vec<Point3<f64>> {
    molecule
        .atoms()
        .iter()
        .enumerate()
        .filter(|&(i, atom)| !atom.is_hydrogen() && keep(i))
        .map(|(_, atom)| atom.position)
        .collect()
}

/// The 12-value USR descriptor; zeros for a molecule without heavy atoms.
pub fn usr(molecule: &Molecule) -> Vec<f64> {
    let points = heavy_positions(molecule, |_| true);
    let mut descriptor = Vec::with_capacity(USR_LENGTH);
    match reference_points(&points) {
        Some(references) => moments_to(&points, &references, &mut descriptor),
        None => descriptor.resize(USR_LENGTH, 0.0),
    }
    descriptor
}

/// The 60-value USR-CAT descriptor.
///
/// Reference points come from all heavy atoms; the moments are then taken
/// for all atoms, hydrophobes (including halogens and sulfur), aromatic
/// atoms, acceptors and donors. An empty subset contributes zeros.
pub fn usr_cat(molecule: &Molecule) -> Vec<f64> {
    let all = heavy_positions(molecule, |_| true);
    let Some(references) = reference_points(&all) else {
        return vec![0.0; USR_CAT_LENGTH];
    };
    let atoms = molecule.atoms();
    let subsets: [Box<dyn Fn(usize) -> bool + '_>; 4] = [
        Box::new(|i: usize| {
            let f = &atoms[i].features;
            f.hydrophobe || f.halogen || atoms[i].element.atomic_number() == 16
        }),
        Box::new(|i: usize| atoms[i].aromatic),
        Box::new(|i: usize| atoms[i].features.acceptor),
        Box::new(|i: usize| atoms[i].features.donor),
    ];

    let mut descriptor = Vec::with_capacity(USR_CAT_LENGTH);
    moments_to(&all, &references, &mut descriptor);
    for keep in &subsets {
        let points = heavy_positions(molecule, keep);
        if points.is_empty() {
            descriptor.extend([0.0; USR_LENGTH]);
        } else {
            moments_to(&points, &references, &mut descriptor);
        }
    }
    descriptor
}

/// The 15-value ElectroShape descriptor over `(x, y, z, 25 q)` points.
///
/// c1 is the 4-D centroid, c2 the point farthest from c1 and c3 the point
/// farthest from c2. c4 and c5 sit above and below the molecular plane
/// spanned by c1, c2 and c3, carrying the largest and smallest charge.
pub fn electroshape(molecule: &Molecule) -> Vec<f64> {
    let points: Vec<Vector4<f64>> = molecule
        .atoms()
        .iter()
        .filter(|atom| !atom.is_hydrogen())
        .map(|atom| {
            Vector4::new(
                atom.position.x,
                atom.position.y,
                atom.position.z,
                atom.partial_charge * ELECTROSHAPE_CHARGE_SCALE,
            )
        })
        .collect();
    if points.is_empty() {
        return vec![0.0; ELECTROSHAPE_LENGTH];
    }

    let farthest = |origin: &Vector4<f64>| {
        points
            .iter()
            .max_by(|a, b| (*a - origin).norm_squared().total_cmp(&(*b - origin).norm_squared()))
            .copied()
            .unwrap_or(*origin)
    };
    let c1 = points.iter().sum::<Vector4<f64>>() / points.len() as f64;
    let c2 = farthest(&c1);
    let c3 = farthest(&c2);

    let xyz = |v: &Vector4<f64>| Vector3::new(v.x, v.y, v.z);
    let vi = xyz(&c2) - xyz(&c1);
    let vj = xyz(&c3) - xyz(&c1);
    let normal = vi.cross(&vj);
    let offset = if normal.norm() > 1e-12 {
        normal * (vi.norm() / (2.0 * normal.norm()))
    } else {
        Vector3::zeros()
    };
    let max_q = points.iter().map(|p| p.w).fold(f64::NEG_INFINITY, f64::max);
    let min_q = points.iter().map(|p| p.w).fold(f64::INFINITY, f64::min);
    let centre = xyz(&c1);
    let c4 = (centre + offset).push(max_q);
    let c5 = (centre - offset).push(min_q);

    let mut descriptor = Vec::with_capacity(ELECTROSHAPE_LENGTH);
    for reference in [c1, c2, c3, c4, c5] {
        let distances: Vec<f64> = points.iter().map(|p| (p - reference).norm()).collect();
        descriptor.extend(moments(&distances));
    }
    descriptor
}

/// `1 / (1 + mean |a_i - b_i|)`; 1.0 for identical descriptors.
pub fn usr_similarity(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let manhattan: f64 = a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum();
    1.0 / (1.0 + manhattan / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::topology::BondOrder;
    use nalgebra::{Rotation3, Translation3};

    fn chlorophenol() -> Molecule {
        use BondOrder::{Double, Single};
        let mut mol = Molecule::new("chlorophenol");
        for k in 0..6 {
            let angle = k as f64 * std::f64::consts::PI / 3.0;
            mol.add_atom(Atom::new(
                Element::C,
                Point3::new(1.39 * angle.cos(), 1.39 * angle.sin(), 0.0),
            ));
        }
        mol.add_atom(Atom::new(Element::O, Point3::new(2.75, 0.0, 0.0)));
        mol.add_atom(Atom::new(Element::CL, Point3::new(-2.14, -1.24, 0.1)));
        for (a, b, order) in [
            (0, 1, Double),
            (1, 2, Single),
            (2, 3, Double),
            (3, 4, Single),
            (4, 5, Double),
            (5, 0, Single),
            (0, 6, Single),
            (4, 7, Single),
        ] {
            mol.add_bond(a, b, order).unwrap();
        }
        mol.perceive();
        mol
    }

    fn moved(molecule: &Molecule) -> Molecule {
        let rotation = Rotation3::from_euler_angles(0.4, -1.1, 2.3);
        let translation = Translation3::new(5.0, -3.0, 12.0);
        let positions: Vec<_> = molecule
            .positions()
            .iter()
            .map(|p| translation * (rotation * p))
            .collect();
        let mut copy = molecule.clone();
        copy.set_positions(&positions).unwrap();
        copy
    }

    #[test]
    fn moments_of_a_symmetric_distribution() {
        let m = moments(&[1.0, 2.0, 3.0]);
        assert!((m[0] - 2.0).abs() < 1e-12);
        assert!((m[1] - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!(m[2].abs() < 1e-12);
        assert_eq!(moments(&[]), [0.0; 3]);
        assert_eq!(moments(&[2.0, 2.0])[2], 0.0);
    }

    #[test]
    fn third_moment_is_the_cube_root_of_skewness() {
        let skewed = moments(&[0.0, 0.0, 0.0, 3.0]);
        let expected = (2.0 / 3.0f64.sqrt()).cbrt();
        assert!((skewed[2] - expected).abs() < 1e-12);
        // Skewness does not change when the distribution is stretched.
        let stretched = moments(&[0.0, 0.0, 0.0, 6.0]);
        assert!((stretched[2] - skewed[2]).abs() < 1e-12);
        assert!((stretched[1] - 2.0 * skewed[1]).abs() < 1e-12);
    }

    #[test]
    fn descriptor_lengths() {
        let mol = chlorophenol();
        assert_eq!(usr(&mol).len(), USR_LENGTH);
        assert_eq!(usr_cat(&mol).len(), USR_CAT_LENGTH);
        assert_eq!(electroshape(&mol).len(), ELECTROSHAPE_LENGTH);
        let empty = Molecule::new("empty");
        assert_eq!(usr(&empty), vec![0.0; USR_LENGTH]);
        assert_eq!(usr_cat(&empty), vec![0.0; USR_CAT_LENGTH]);
        assert_eq!(electroshape(&empty), vec![0.0; ELECTROSHAPE_LENGTH]);
    }

    #[test]
    fn usr_cat_starts_with_plain_usr() {
        let mol = chlorophenol();
        assert_eq!(usr_cat(&mol)[..USR_LENGTH], usr(&mol)[..]);
    }

    #[test]
    fn usr_cat_zeroes_empty_subsets() {
        let mol = chlorophenol();
        let mut ether = Molecule::new("ether");
        ether.add_atom(Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)));
        ether.add_atom(Atom::new(Element::O, Point3::new(1.4, 0.0, 0.0)));
        ether.add_atom(Atom::new(Element::C, Point3::new(2.1, 1.2, 0.0)));
        ether.add_bond(0, 1, BondOrder::Single).unwrap();
        ether.add_bond(1, 2, BondOrder::Single).unwrap();
        ether.perceive();
        let descriptor = usr_cat(&ether);
        assert!(descriptor[48..60].iter().all(|&v| v == 0.0));
        assert!(usr_cat(&mol)[48..60].iter().any(|&v| v != 0.0));
    }

    #[test]
    fn self_similarity_is_one_and_invariant_to_rigid_motion() {
        let mol = chlorophenol();
        let other = moved(&mol);
        for descriptor in [usr, usr_cat, electroshape] {
            let a = descriptor(&mol);
            assert_eq!(usr_similarity(&a, &a), 1.0);
            let b = descriptor(&other);
            assert!(usr_similarity(&a, &b) > 0.9999);
        }
    }

    #[test]
    fn different_shapes_are_less_similar() {
        let mol = chlorophenol();
        let mut line = Molecule::new("line");
        for i in 0..8 {
            line.add_atom(Atom::new(Element::C, Point3::new(i as f64 * 1.5, 0.0, 0.0)));
            if i > 0 {
                line.add_bond(i - 1, i, BondOrder::Single).unwrap();
            }
        }
        line.perceive();
        let similarity = usr_similarity(&usr(&mol), &usr(&line));
        assert!(similarity < 1.0);
        assert!(similarity > 0.0);
    }
}
