use crate::core::alerts::{AlertCatalog, AlertLoadError};
use crate::core::descriptors::{Descriptor, UnknownDescriptorError};
use crate::core::models::molecule::Molecule;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Filter expression is empty")]
    Empty,
    #[error("Cannot parse filter clause '{clause}': expected '<descriptor> <op> <number>'")]
    InvalidClause { clause: String },
    #[error(transparent)]
    UnknownDescriptor(#[from] UnknownDescriptorError),
    #[error("Invalid threshold '{value}' in filter clause '{clause}'")]
    InvalidThreshold { clause: String, value: String },
    #[error("Failed to load structural alerts: {0}")]
    Alerts(#[from] AlertLoadError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    /// Two-character operators come first so `<=` is not read as `<`.
    const OPERATORS: [(&'static str, Comparison); 7] = [
        ("<=", Self::Le),
        (">=", Self::Ge),
        ("==", Self::Eq),
        ("!=", Self::Ne),
        ("<", Self::Lt),
        (">", Self::Gt),
        ("=", Self::Eq),
    ];

    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Lt => value < threshold,
            Self::Le => value <= threshold,
            Self::Gt => value > threshold,
            Self::Ge => value >= threshold,
            Self::Eq => (value - threshold).abs() < 1e-9,
            Self::Ne => (value - threshold).abs() >= 1e-9,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

/// A molecule passes when `descriptor comparison threshold` holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptorRule {
    pub descriptor: Descriptor,
    pub comparison: Comparison,
    pub threshold: f64,
}

impl DescriptorRule {
    pub const fn new(descriptor: Descriptor, comparison: Comparison, threshold: f64) -> Self {
        Self {
            descriptor,
            comparison,
            threshold,
        }
    }

    pub fn passes(&self, molecule: &Molecule) -> bool {
        self.comparison
            .holds(self.descriptor.compute(molecule), self.threshold)
    }

    fn parse(clause: &str) -> Result<Self, FilterError> {
        let (position, symbol, comparison) = Comparison::OPERATORS
            .iter()
            .find_map(|&(symbol, comparison)| {
                clause.find(symbol).map(|position| (position, symbol, comparison))
            })
            .ok_or_else(|| FilterError::InvalidClause {
                clause: clause.to_string(),
            })?;
        let name = clause[..position].trim();
        let value = clause[position + symbol.len()..].trim();
        if name.is_empty() || value.is_empty() {
            return Err(FilterError::InvalidClause {
                clause: clause.to_string(),
            });
        }
        let descriptor: Descriptor = name.parse()?;
        let threshold: f64 = value.parse().map_err(|_| FilterError::InvalidThreshold {
            clause: clause.to_string(),
            value: value.to_string(),
        })?;
        Ok(Self::new(descriptor, comparison, threshold))
    }
}

impl fmt::Display for DescriptorRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.descriptor,
            self.comparison.symbol(),
            self.threshold
        )
    }
}

#[derive(Debug, Clone)]
pub enum Rule {
    Descriptor(DescriptorRule),
    /// Every alert of the catalog that matches counts as one violation.
    Alerts(Arc<AlertCatalog>),
}

impl Rule {
    fn violations(&self, molecule: &Molecule) -> usize {
        match self {
            Self::Descriptor(rule) => usize::from(!rule.passes(molecule)),
            Self::Alerts(catalog) => catalog.hits(molecule).count(),
        }
    }
}

const RO5: [DescriptorRule; 4] = [
    DescriptorRule::new(Descriptor::MolecularWeight, Comparison::Lt, 500.0),
    DescriptorRule::new(Descriptor::HydrogenBondAcceptors, Comparison::Le, 10.0),
    DescriptorRule::new(Descriptor::HydrogenBondDonors, Comparison::Le, 5.0),
    DescriptorRule::new(Descriptor::LogP, Comparison::Le, 5.0),
];

const RO3: [DescriptorRule; 4] = [
    DescriptorRule::new(Descriptor::MolecularWeight, Comparison::Lt, 300.0),
    DescriptorRule::new(Descriptor::HydrogenBondAcceptors, Comparison::Le, 3.0),
    DescriptorRule::new(Descriptor::HydrogenBondDonors, Comparison::Le, 3.0),
    DescriptorRule::new(Descriptor::LogP, Comparison::Le, 3.0),
];

/// A set of rules a molecule is checked against.
///
/// Named sets are `ro5` (Lipinski), `ro3` (fragment rule of three) and
/// `pains`. Any other expression is a `;`-separated list of descriptor
/// clauses such as `mw < 450; rotors <= 8`.
#[derive(Debug, Clone)]
pub struct Filter {
    name: String,
    rules: Vec<Rule>,
}

impl Filter {
    pub fn parse(expression: &str) -> Result<Self, FilterError> {
        let name = expression.trim();
        let rules = match name.to_ascii_lowercase().as_str() {
            "" => return Err(FilterError::Empty),
            "ro5" => RO5.into_iter().map(Rule::Descriptor).collect(),
            "ro3" => RO3.into_iter().map(Rule::Descriptor).collect(),
            "pains" => vec![Rule::Alerts(AlertCatalog::pains()?)],
            _ => name
                .split(';')
                .map(str::trim)
                .filter(|clause| !clause.is_empty())
                .map(|clause| DescriptorRule::parse(clause).map(Rule::Descriptor))
                .collect::<Result<Vec<_>, _>>()?,
        };
        if rules.is_empty() {
            return Err(FilterError::Empty);
        }
        Ok(Self {
            name: name.to_string(),
            rules,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of failed rules; each matching structural alert counts once.
    pub fn violations(&self, molecule: &Molecule) -> usize {
        self.rules.iter().map(|rule| rule.violations(molecule)).sum()
    }

    /// Kept when the violation count does not exceed `soft_fail`.
    pub fn passes(&self, molecule: &Molecule, soft_fail: usize) -> bool {
        self.violations(molecule) <= soft_fail
    }
}
