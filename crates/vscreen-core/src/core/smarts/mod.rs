//! A SMARTS subset and a substructure matcher over perceived molecules.
//!
//! Supported atom primitives: organic-subset and bracket element symbols
//! (aliphatic and aromatic), `*`, `a`, `A`, `#n`, `H<n>`, `D<n>`, `X<n>`,
//! `R`/`R<n>`, `r`/`r<n>`, `x<n>` and charges. Atom expressions combine
//! them with `!`, `&` (or juxtaposition), `,` and `;`. Bonds support
//! `- = # : ~ @ / \` with the same logical operators, plus branches, ring
//! closures (`1`, `%10`) and `.` separated fragments.
//!
//! Hydrogens are matched through counts (`H`, `X`) rather than as atoms, so
//! the same pattern behaves identically whether or not a file lists them.

mod matcher;
mod parser;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmartsErrorKind {
    UnexpectedCharacter(char),
    UnexpectedEnd,
    UnclosedBracket,
    UnclosedBranch,
    UnmatchedParenthesis,
    UnclosedRing(u32),
    UnknownElement(String),
    DanglingBond,
    EmptyPattern,
}

impl fmt::Display for SmartsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter(c) => write!(f, "unexpected character '{c}'"),
            Self::UnexpectedEnd => f.write_str("unexpected end of pattern"),
            Self::UnclosedBracket => f.write_str("unclosed bracket atom"),
            Self::UnclosedBranch => f.write_str("unclosed branch"),
            Self::UnmatchedParenthesis => f.write_str("')' without a matching '('"),
            Self::UnclosedRing(n) => write!(f, "ring closure {n} is never closed"),
            Self::UnknownElement(s) => write!(f, "unknown element '{s}'"),
            Self::DanglingBond => f.write_str("bond without an atom on both sides"),
            Self::EmptyPattern => f.write_str("pattern has no atoms"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid SMARTS '{pattern}' at position {position}: {kind}")]
pub struct SmartsError {
    pub pattern: String,
    pub position: usize,
    pub kind: SmartsErrorKind,
}

/// Boolean expression tree shared by atom and bond queries.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr<P> {
    Primitive(P),
    Not(Box<Expr<P>>),
    And(Vec<Expr<P>>),
    Or(Vec<Expr<P>>),
}

impl<P> Expr<P> {
    pub(crate) fn evaluate(&self, test: &impl Fn(&P) -> bool) -> bool {
        match self {
            Self::Primitive(p) => test(p),
            Self::Not(inner) => !inner.evaluate(test),
            Self::And(terms) => terms.iter().all(|t| t.evaluate(test)),
            Self::Or(terms) => terms.iter().any(|t| t.evaluate(test)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AtomPrimitive {
    Any,
    Aromatic,
    Aliphatic,
    Element { number: u8, aromatic: bool },
    AtomicNumber(u8),
    HydrogenCount(u8),
    Degree(u8),
    Connectivity(u8),
    /// `R` (any ring) or `R<n>` (member of exactly n smallest rings; `R0` = acyclic).
    RingMembership(Option<u8>),
    /// `r` (any ring) or `r<n>` (member of a smallest ring of size n).
    RingSize(Option<u8>),
    RingConnectivity(Option<u8>),
    Charge(i8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BondPrimitive {
    /// No bond symbol written: single or aromatic.
    Implicit,
    Single,
    Double,
    Triple,
    Aromatic,
    Any,
    Ring,
}

pub(crate) type AtomExpr = Expr<AtomPrimitive>;
pub(crate) type BondExpr = Expr<BondPrimitive>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PatternBond {
    pub(crate) atom1: usize,
    pub(crate) atom2: usize,
    pub(crate) expr: BondExpr,
}

/// A compiled SMARTS query.
#[derive(Debug, Clone, PartialEq)]
pub struct Smarts {
    source: String,
    pub(crate) atoms: Vec<AtomExpr>,
    pub(crate) bonds: Vec<PatternBond>,
}

impl Smarts {
    pub fn parse(pattern: &str) -> Result<Self, SmartsError> {
        parser::parse(pattern)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }
}

impl FromStr for Smarts {
    type Err = SmartsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Smarts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
