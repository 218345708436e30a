use super::{
    AtomExpr, AtomPrimitive, BondExpr, BondPrimitive, Expr, PatternBond, Smarts, SmartsError,
    SmartsErrorKind,
};
use crate::core::models::element::Element;
use std::collections::HashMap;

const ORGANIC_TWO_LETTER: [&str; 2] = ["Cl", "Br"];
const AROMATIC_SYMBOLS: [(char, u8); 6] = [('b', 5), ('c', 6), ('n', 7), ('o', 8), ('p', 15), ('s', 16)];

pub(super) fn parse(pattern: &str) -> Result<Smarts, SmartsError> {
    Parser::new(pattern).parse()
}

struct OpenRing {
    atom: usize,
    bond: Option<BondExpr>,
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    index: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            index: 0,
        }
    }

    fn position(&self) -> usize {
        self.chars
            .get(self.index)
            .map_or(self.source.len(), |&(p, _)| p)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).map(|&(_, c)| c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.index += 1;
        }
        c
    }

    fn error(&self, kind: SmartsErrorKind) -> SmartsError {
        self.error_at(self.position(), kind)
    }

    fn error_at(&self, position: usize, kind: SmartsErrorKind) -> SmartsError {
        SmartsError {
            pattern: self.source.to_string(),
            position,
            kind,
        }
    }

    fn unexpected(&self) -> SmartsError {
        match self.peek() {
            Some(c) => self.error(SmartsErrorKind::UnexpectedCharacter(c)),
            None => self.error(SmartsErrorKind::UnexpectedEnd),
        }
    }

    fn parse(mut self) -> Result<Smarts, SmartsError> {
        let mut atoms: Vec<AtomExpr> = Vec::new();
        let mut bonds: Vec<PatternBond> = Vec::new();
        let mut branches: Vec<Option<usize>> = Vec::new();
        let mut rings: HashMap<u32, OpenRing> = HashMap::new();
        let mut previous: Option<usize> = None;
        let mut pending: Option<(BondExpr, usize)> = None;

        while let Some(c) = self.peek() {
            match c {
                '(' => {
                    if previous.is_none() || pending.is_some() {
                        return Err(self.unexpected());
                    }
                    self.bump();
                    branches.push(previous);
                }
                ')' => {
                    if let Some((_, at)) = pending {
                        return Err(self.error_at(at, SmartsErrorKind::DanglingBond));
                    }
                    let Some(restored) = branches.pop() else {
                        return Err(self.error(SmartsErrorKind::UnmatchedParenthesis));
                    };
                    self.bump();
                    previous = restored;
                }
                '.' => {
                    if let Some((_, at)) = pending {
                        return Err(self.error_at(at, SmartsErrorKind::DanglingBond));
                    }
                    self.bump();
                    previous = None;
                }
                '0'..='9' | '%' => {
                    let at = self.position();
                    let Some(atom) = previous else {
                        return Err(self.unexpected());
                    };
                    let number = self.parse_ring_number()?;
                    let bond = pending.take().map(|(b, _)| b);
                    match rings.remove(&number) {
                        Some(open) => {
                            if open.atom == atom {
                                return Err(self.error_at(at, SmartsErrorKind::UnexpectedCharacter(c)));
                            }
                            let expr = bond
                                .or(open.bond)
                                .unwrap_or(Expr::Primitive(BondPrimitive::Implicit));
                            bonds.push(PatternBond {
                                atom1: open.atom,
                                atom2: atom,
                                expr,
                            });
                        }
                        None => {
                            rings.insert(number, OpenRing { atom, bond });
                        }
                    }
                }
                c if is_bond_char(c) => {
                    if previous.is_none() || pending.is_some() {
                        return Err(self.unexpected());
                    }
                    let at = self.position();
                    let expr = self.parse_bond_expr()?;
                    pending = Some((expr, at));
                }
                _ => {
                    let expr = if c == '[' {
                        self.parse_bracket_atom()?
                    } else {
                        self.parse_bare_atom()?
                    };
                    let index = atoms.len();
                    atoms.push(expr);
                    if let Some(from) = previous {
                        let expr = pending
                            .take()
                            .map_or(Expr::Primitive(BondPrimitive::Implicit), |(b, _)| b);
                        bonds.push(PatternBond {
                            atom1: from,
                            atom2: index,
                            expr,
                        });
                    } else if let Some((_, at)) = pending {
                        return Err(self.error_at(at, SmartsErrorKind::DanglingBond));
                    }
                    previous = Some(index);
                }
            }
        }

        if let Some((_, at)) = pending {
            return Err(self.error_at(at, SmartsErrorKind::DanglingBond));
        }
        if !branches.is_empty() {
            return Err(self.error(SmartsErrorKind::UnclosedBranch));
        }
        if let Some(&number) = rings.keys().min() {
            return Err(self.error(SmartsErrorKind::UnclosedRing(number)));
        }
        if atoms.is_empty() {
            return Err(self.error(SmartsErrorKind::EmptyPattern));
        }
        Ok(Smarts {
            source: self.source.to_string(),
            atoms,
            bonds,
        })
    }

    fn parse_ring_number(&mut self) -> Result<u32, SmartsError> {
        if self.peek() == Some('%') {
            self.bump();
            let (Some(a), Some(b)) = (self.peek(), self.peek_at(1)) else {
                return Err(self.error(SmartsErrorKind::UnexpectedEnd));
            };
            if !a.is_ascii_digit() || !b.is_ascii_digit() {
                return Err(self.unexpected());
            }
            self.index += 2;
            return Ok(a.to_digit(10).unwrap_or(0) * 10 + b.to_digit(10).unwrap_or(0));
        }
        match self.bump().and_then(|c| c.to_digit(10)) {
            Some(d) => Ok(d),
            None => Err(self.unexpected()),
        }
    }

    fn parse_number(&mut self) -> Option<u32> {
        let mut value: Option<u32> = None;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(d));
            self.bump();
        }
        value
    }

    fn parse_small_number(&mut self) -> Option<u8> {
        self.parse_number().map(|n| n.min(u8::MAX as u32) as u8)
    }

    // Bond expressions: `;` binds loosest, then `,`, then `&`/juxtaposition, then `!`.
    fn parse_bond_expr(&mut self) -> Result<BondExpr, SmartsError> {
        self.parse_binary(';', Self::parse_bond_or)
    }

    fn parse_bond_or(&mut self) -> Result<BondExpr, SmartsError> {
        self.parse_binary(',', Self::parse_bond_and)
    }

    fn parse_bond_and(&mut self) -> Result<BondExpr, SmartsError> {
        let mut terms = vec![self.parse_bond_not()?];
        loop {
            match self.peek() {
                Some('&') => {
                    self.bump();
                    terms.push(self.parse_bond_not()?);
                }
                Some(c) if is_bond_char(c) => terms.push(self.parse_bond_not()?),
                _ => break,
            }
        }
        Ok(collapse(terms, Expr::And))
    }

    fn parse_bond_not(&mut self) -> Result<BondExpr, SmartsError> {
        if self.peek() == Some('!') {
            self.bump();
            return Ok(Expr::Not(Box::new(self.parse_bond_not()?)));
        }
        let primitive = match self.peek() {
            Some('-') | Some('/') | Some('\\') => BondPrimitive::Single,
            Some('=') => BondPrimitive::Double,
            Some('#') => BondPrimitive::Triple,
            Some(':') => BondPrimitive::Aromatic,
            Some('~') => BondPrimitive::Any,
            Some('@') => BondPrimitive::Ring,
            _ => return Err(self.unexpected()),
        };
        self.bump();
        Ok(Expr::Primitive(primitive))
    }

    fn parse_binary<P>(
        &mut self,
        separator: char,
        mut operand: impl FnMut(&mut Self) -> Result<Expr<P>, SmartsError>,
    ) -> Result<Expr<P>, SmartsError> {
        let mut terms = vec![operand(self)?];
        while self.peek() == Some(separator) {
            self.bump();
            terms.push(operand(self)?);
        }
        Ok(collapse(
            terms,
            if separator == ',' { Expr::Or } else { Expr::And },
        ))
    }

    fn parse_bare_atom(&mut self) -> Result<AtomExpr, SmartsError> {
        let at = self.position();
        let Some(c) = self.bump() else {
            return Err(self.error(SmartsErrorKind::UnexpectedEnd));
        };
        let primitive = match c {
            '*' => AtomPrimitive::Any,
            'a' => AtomPrimitive::Aromatic,
            'A' => AtomPrimitive::Aliphatic,
            c if c.is_ascii_lowercase() => match aromatic_number(c) {
                Some(number) => AtomPrimitive::Element {
                    number,
                    aromatic: true,
                },
                None => return Err(self.error_at(at, SmartsErrorKind::UnexpectedCharacter(c))),
            },
            c if c.is_ascii_uppercase() => {
                let two: String = [Some(c), self.peek()].into_iter().flatten().collect();
                let symbol = if ORGANIC_TWO_LETTER.contains(&two.as_str()) {
                    self.bump();
                    two
                } else {
                    c.to_string()
                };
                match symbol.as_str() {
                    "B" | "C" | "N" | "O" | "P" | "S" | "F" | "I" | "Cl" | "Br" => {
                        aliphatic_element(&symbol)
                            .ok_or_else(|| self.error_at(at, SmartsErrorKind::UnknownElement(symbol.clone())))?
                    }
                    _ => return Err(self.error_at(at, SmartsErrorKind::UnknownElement(symbol))),
                }
            }
            c => return Err(self.error_at(at, SmartsErrorKind::UnexpectedCharacter(c))),
        };
        Ok(Expr::Primitive(primitive))
    }

    fn parse_bracket_atom(&mut self) -> Result<AtomExpr, SmartsError> {
        let open = self.position();
        self.bump();
        if self.peek() == Some('H') && matches!(self.peek_at(1), Some(']') | Some('+') | Some('-')) {
            self.bump();
            let mut terms = vec![Expr::Primitive(AtomPrimitive::AtomicNumber(1))];
            if self.peek() != Some(']') {
                terms.push(Expr::Primitive(self.parse_charge()));
            }
            return self.close_bracket(open, collapse(terms, Expr::And));
        }
        let expr = self.parse_binary(';', |p| p.parse_binary(',', Self::parse_atom_and))?;
        self.close_bracket(open, expr)
    }

    fn close_bracket(&mut self, open: usize, expr: AtomExpr) -> Result<AtomExpr, SmartsError> {
        match self.peek() {
            Some(']') => {
                self.bump();
                Ok(expr)
            }
            None => Err(self.error_at(open, SmartsErrorKind::UnclosedBracket)),
            Some(_) => Err(self.unexpected()),
        }
    }

    fn parse_atom_and(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut terms = vec![self.parse_atom_not()?];
        loop {
            match self.peek() {
                Some('&') => {
                    self.bump();
                    terms.push(self.parse_atom_not()?);
                }
                Some(']') | Some(',') | Some(';') | None => break,
                Some(_) => terms.push(self.parse_atom_not()?),
            }
        }
        Ok(collapse(terms, Expr::And))
    }

    fn parse_atom_not(&mut self) -> Result<AtomExpr, SmartsError> {
        if self.peek() == Some('!') {
            self.bump();
            return Ok(Expr::Not(Box::new(self.parse_atom_not()?)));
        }
        self.parse_atom_primitive().map(Expr::Primitive)
    }

    fn parse_charge(&mut self) -> AtomPrimitive {
        let Some(sign) = self.bump() else {
            return AtomPrimitive::Charge(0);
        };
        let unit: i8 = if sign == '-' { -1 } else { 1 };
        if let Some(n) = self.parse_small_number() {
            return AtomPrimitive::Charge(unit.saturating_mul(n.min(i8::MAX as u8) as i8));
        }
        let mut magnitude: i8 = 1;
        while self.peek() == Some(sign) {
            self.bump();
            magnitude = magnitude.saturating_add(1);
        }
        AtomPrimitive::Charge(unit * magnitude)
    }

    fn parse_atom_primitive(&mut self) -> Result<AtomPrimitive, SmartsError> {
        let at = self.position();
        let Some(c) = self.peek() else {
            return Err(self.error(SmartsErrorKind::UnexpectedEnd));
        };
        let primitive = match c {
            '*' => {
                self.bump();
                AtomPrimitive::Any
            }
            '+' | '-' => self.parse_charge(),
            '#' => {
                self.bump();
                match self.parse_small_number() {
                    Some(n) => AtomPrimitive::AtomicNumber(n),
                    None => return Err(self.unexpected()),
                }
            }
            c if c.is_ascii_uppercase() => {
                if let Some(next) = self.peek_at(1).filter(|n| n.is_ascii_lowercase()) {
                    let symbol: String = [c, next].iter().collect();
                    if let Ok(element) = symbol.parse::<Element>() {
                        self.index += 2;
                        return Ok(AtomPrimitive::Element {
                            number: element.atomic_number(),
                            aromatic: false,
                        });
                    }
                }
                self.bump();
                match c {
                    'H' => AtomPrimitive::HydrogenCount(self.parse_small_number().unwrap_or(1)),
                    'D' => AtomPrimitive::Degree(self.parse_small_number().unwrap_or(1)),
                    'X' => AtomPrimitive::Connectivity(self.parse_small_number().unwrap_or(1)),
                    'R' => AtomPrimitive::RingMembership(self.parse_small_number()),
                    'A' => AtomPrimitive::Aliphatic,
                    _ => aliphatic_element(&c.to_string()).ok_or_else(|| {
                        self.error_at(at, SmartsErrorKind::UnknownElement(c.to_string()))
                    })?,
                }
            }
            's' if self.peek_at(1) == Some('e') => {
                self.index += 2;
                AtomPrimitive::Element {
                    number: 34,
                    aromatic: true,
                }
            }
            c if c.is_ascii_lowercase() => {
                self.bump();
                match c {
                    'a' => AtomPrimitive::Aromatic,
                    'r' => AtomPrimitive::RingSize(self.parse_small_number()),
                    'x' => AtomPrimitive::RingConnectivity(self.parse_small_number()),
                    c => match aromatic_number(c) {
                        Some(number) => AtomPrimitive::Element {
                            number,
                            aromatic: true,
                        },
                        None => return Err(self.error_at(at, SmartsErrorKind::UnexpectedCharacter(c))),
                    },
                }
            }
            _ => return Err(self.unexpected()),
        };
        Ok(primitive)
    }
}

fn is_bond_char(c: char) -> bool {
    matches!(c, '-' | '=' | '#' | ':' | '~' | '@' | '!' | '/' | '\\')
}

fn aromatic_number(c: char) -> Option<u8> {
    AROMATIC_SYMBOLS
        .iter()
        .find(|&&(symbol, _)| symbol == c)
        .map(|&(_, number)| number)
}

fn aliphatic_element(symbol: &str) -> Option<AtomPrimitive> {
    symbol.parse::<Element>().ok().map(|e| AtomPrimitive::Element {
        number: e.atomic_number(),
        aromatic: false,
    })
}

fn collapse<P>(mut terms: Vec<Expr<P>>, combine: fn(Vec<Expr<P>>) -> Expr<P>) -> Expr<P> {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        combine(terms)
    }
}
