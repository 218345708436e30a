use super::models::molecule::Molecule;
use super::smarts::{Smarts, SmartsError};
use serde::Deserialize;
use std::io::Read;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

const PAINS_TABLE: &str = include_str!("../../data/pains.csv");

/// Parsed once, on the first `pains` filter.
static PAINS: LazyLock<Result<Arc<AlertCatalog>, AlertLoadError>> =
    LazyLock::new(|| AlertCatalog::from_reader("pains", PAINS_TABLE.as_bytes()).map(Arc::new));

#[derive(Debug, Clone, Error)]
pub enum AlertLoadError {
    #[error("CSV parsing error in alert table '{table}': {message}")]
    Csv { table: String, message: String },
    #[error("Alert '{name}' in table '{table}' has an invalid pattern: {source}")]
    Pattern {
        table: String,
        name: String,
        source: SmartsError,
    },
}

#[derive(Debug, Deserialize)]
struct AlertRecord {
    name: String,
    smarts: String,
}

/// A named substructure whose presence flags a molecule.
#[derive(Debug, Clone)]
pub struct StructuralAlert {
    pub name: String,
    pub pattern: Smarts,
}

/// An ordered set of structural alerts, e.g. the PAINS families.
#[derive(Debug, Clone)]
pub struct AlertCatalog {
    name: String,
    alerts: Vec<StructuralAlert>,
}

impl AlertCatalog {
    /// Reads a `name,smarts` table; every pattern must compile.
    pub fn from_reader(name: &str, reader: impl Read) -> Result<Self, AlertLoadError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut alerts = Vec::new();
        for result in csv_reader.deserialize::<AlertRecord>() {
            let record = result.map_err(|e| AlertLoadError::Csv {
                table: name.to_string(),
                message: e.to_string(),
            })?;
            let pattern = Smarts::parse(&record.smarts).map_err(|e| AlertLoadError::Pattern {
                table: name.to_string(),
                name: record.name.clone(),
                source: e,
            })?;
            alerts.push(StructuralAlert {
                name: record.name,
                pattern,
            });
        }
        Ok(Self {
            name: name.to_string(),
            alerts,
        })
    }

    /// The bundled PAINS alert families, shared by every filter that uses them.
    pub fn pains() -> Result<Arc<Self>, AlertLoadError> {
        PAINS.as_ref().map(Arc::clone).map_err(Clone::clone)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alerts(&self) -> &[StructuralAlert] {
        &self.alerts
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Names of the alerts that occur in the molecule.
    pub fn hits<'a>(&'a self, molecule: &'a Molecule) -> impl Iterator<Item = &'a str> + 'a {
        self.alerts
            .iter()
            .filter(move |alert| alert.pattern.matches(molecule))
            .map(|alert| alert.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::topology::BondOrder;
    use nalgebra::Point3;

    fn catechol() -> Molecule {
        use BondOrder::{Double, Single};
        let mut mol = Molecule::new("catechol");
        for i in 0..6 {
            mol.add_atom(Atom::new(Element::C, Point3::new(i as f64, 0.0, 0.0)));
        }
        mol.add_atom(Atom::new(Element::O, Point3::new(0.0, 1.0, 0.0)));
        mol.add_atom(Atom::new(Element::O, Point3::new(1.0, 1.0, 0.0)));
        for (a, b, order) in [
            (0, 1, Double),
            (1, 2, Single),
            (2, 3, Double),
            (3, 4, Single),
            (4, 5, Double),
            (5, 0, Single),
            (0, 6, Single),
            (1, 7, Single),
        ] {
            mol.add_bond(a, b, order).unwrap();
        }
        mol.perceive();
        mol
    }

    #[test]
    fn bundled_pains_table_compiles() {
        let catalog = AlertCatalog::pains().unwrap();
        assert_eq!(catalog.name(), "pains");
        assert_eq!(catalog.len(), 27);
        assert!(catalog.alerts().iter().any(|a| a.name == "catechol_A"));
    }

    #[test]
    fn pains_table_is_parsed_once() {
        let first = AlertCatalog::pains().unwrap();
        let second = AlertCatalog::pains().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    fn benzene_with(substituent: &[(Element, i8)], bonds: &[(usize, usize, BondOrder)]) -> Molecule {
        use BondOrder::{Double, Single};
        let mut mol = Molecule::new("substituted");
        for i in 0..6 {
            mol.add_atom(Atom::new(Element::C, Point3::new(i as f64, 0.0, 0.0)));
        }
        for (i, &(element, charge)) in substituent.iter().enumerate() {
            let atom = Atom::new(element, Point3::new(i as f64, 2.0, 0.0)).with_charge(charge);
            mol.add_atom(atom);
        }
        for (a, b, order) in [
            (0, 1, Double),
            (1, 2, Single),
            (2, 3, Double),
            (3, 4, Single),
            (4, 5, Double),
            (5, 0, Single),
        ] {
            mol.add_bond(a, b, order).unwrap();
        }
        for &(a, b, order) in bonds {
            mol.add_bond(a, b, order).unwrap();
        }
        mol.perceive();
        mol
    }

    #[test]
    fn common_drug_fragments_raise_no_alerts() {
        use BondOrder::{Double, Single};
        let catalog = AlertCatalog::pains().unwrap();

        // Nitrobenzene with a charge-separated nitro group.
        let nitro = benzene_with(
            &[(Element::N, 1), (Element::O, 0), (Element::O, -1)],
            &[(0, 6, Single), (6, 7, Double), (6, 8, Single)],
        );
        // Phenylthiourea.
        let thiourea = benzene_with(
            &[(Element::N, 0), (Element::C, 0), (Element::S, 0), (Element::N, 0)],
            &[(0, 6, Single), (6, 7, Single), (7, 8, Double), (7, 9, Single)],
        );
        for mol in [nitro, thiourea] {
            assert_eq!(catalog.hits(&mol).count(), 0);
        }
    }

    #[test]
    fn alkyl_pyridinium_raises_no_alert() {
        use BondOrder::{Double, Single};
        let mut mol = Molecule::new("methylpyridinium");
        mol.add_atom(Atom::new(Element::N, Point3::origin()).with_charge(1));
        for i in 1..7 {
            mol.add_atom(Atom::new(Element::C, Point3::new(i as f64, 0.0, 0.0)));
        }
        for (a, b, order) in [
            (0, 1, Double),
            (1, 2, Single),
            (2, 3, Double),
            (3, 4, Single),
            (4, 5, Double),
            (5, 0, Single),
            (0, 6, Single),
        ] {
            mol.add_bond(a, b, order).unwrap();
        }
        mol.perceive();
        let catalog = AlertCatalog::pains().unwrap();
        assert_eq!(catalog.hits(&mol).count(), 0);
    }

    #[test]
    fn catechol_triggers_the_catechol_alert_only() {
        let catalog = AlertCatalog::pains().unwrap();
        let mol = catechol();
        let hits: Vec<&str> = catalog.hits(&mol).collect();
        assert_eq!(hits, vec!["catechol_A"]);
    }

    #[test]
    fn invalid_pattern_names_the_alert() {
        let table = "name,smarts\ngood,CC\nbroken,C(C\n";
        let err = AlertCatalog::from_reader("custom", table.as_bytes()).unwrap_err();
        assert!(matches!(err, AlertLoadError::Pattern { ref name, .. } if name == "broken"));
    }

    #[test]
    fn missing_column_is_a_csv_error() {
        let table = "name\nonly_name\n";
        let err = AlertCatalog::from_reader("custom", table.as_bytes()).unwrap_err();
        assert!(matches!(err, AlertLoadError::Csv { .. }));
    }
}
