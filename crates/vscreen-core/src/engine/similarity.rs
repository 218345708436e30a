use super::error::ScreeningError;
use super::interactions;
use super::shape;
use crate::core::models::molecule::Molecule;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimilarityMethod {
    Usr,
    UsrCat,
    Electroshape,
    Ifp,
    Sifp,
}

impl SimilarityMethod {
    pub fn name(self) -> &'static str {
        match self {
            Self::Usr => "usr",
            Self::UsrCat => "usr_cat",
            Self::Electroshape => "electroshape",
            Self::Ifp => "ifp",
            Self::Sifp => "sifp",
        }
    }

    /// Interaction fingerprints are computed against a receptor.
    pub fn needs_protein(self) -> bool {
        matches!(self, Self::Ifp | Self::Sifp)
    }
}

impl FromStr for SimilarityMethod {
    type Err = ScreeningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usr" => Ok(Self::Usr),
            "usr_cat" => Ok(Self::UsrCat),
            "electroshape" => Ok(Self::Electroshape),
            "ifp" => Ok(Self::Ifp),
            "sifp" => Ok(Self::Sifp),
            _ => Err(ScreeningError::UnknownSimilarityMethod(s.to_string())),
        }
    }
}

impl fmt::Display for SimilarityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
enum Descriptors {
    Shape(Vec<Vec<f64>>),
    Fingerprint {
        protein: Arc<Molecule>,
        fingerprints: Vec<Vec<u32>>,
    },
}

/// Query descriptors computed once, compared against every screened molecule.
#[derive(Debug, Clone)]
pub struct SimilarityQuery {
    method: SimilarityMethod,
    descriptors: Descriptors,
}

impl SimilarityQuery {
    pub fn new(
        method: SimilarityMethod,
        queries: &[Molecule],
        protein: Option<Arc<Molecule>>,
    ) -> Result<Self, ScreeningError> {
        if queries.is_empty() {
            return Err(ScreeningError::EmptyQuery {
                method: method.to_string(),
            });
        }
        let descriptors = match method {
            SimilarityMethod::Usr => Descriptors::Shape(queries.iter().map(shape::usr).collect()),
            SimilarityMethod::UsrCat => {
                Descriptors::Shape(queries.iter().map(shape::usr_cat).collect())
            }
            SimilarityMethod::Electroshape => {
                Descriptors::Shape(queries.iter().map(shape::electroshape).collect())
            }
            SimilarityMethod::Ifp | SimilarityMethod::Sifp => {
                let protein = protein.ok_or_else(|| ScreeningError::MissingProtein {
                    method: method.to_string(),
                })?;
                let fingerprints = queries
                    .iter()
                    .map(|q| fingerprint(method, q, &protein))
                    .collect();
                Descriptors::Fingerprint {
                    protein,
                    fingerprints,
                }
            }
        };
        Ok(Self {
            method,
            descriptors,
        })
    }

    pub fn method(&self) -> SimilarityMethod {
        self.method
    }

    /// Highest similarity of a molecule to any of the query molecules.
    pub fn best_similarity(&self, molecule: &Molecule) -> f64 {
        match &self.descriptors {
            Descriptors::Shape(queries) => {
                let descriptor = match self.method {
                    SimilarityMethod::UsrCat => shape::usr_cat(molecule),
                    SimilarityMethod::Electroshape => shape::electroshape(molecule),
                    _ => shape::usr(molecule),
                };
                queries
                    .iter()
                    .map(|q| shape::usr_similarity(q, &descriptor))
                    .fold(0.0, f64::max)
            }
            Descriptors::Fingerprint {
                protein,
                fingerprints,
            } => {
                let fp = fingerprint(self.method, molecule, protein);
                fingerprints
                    .iter()
                    .map(|q| interactions::dice(q, &fp))
                    .fold(0.0, f64::max)
            }
        }
    }
}

fn fingerprint(method: SimilarityMethod, ligand: &Molecule, protein: &Molecule) -> Vec<u32> {
    if method == SimilarityMethod::Sifp {
        interactions::sifp(ligand, protein)
    } else {
        interactions::ifp(ligand, protein)
    }
}
