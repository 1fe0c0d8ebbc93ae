//! Load combination algebra
//!
//! The building blocks of a combination and the rules for composing them:
//!
//! ```text
//! number * ScaledTerm          -> ScaledTerm        (factor multiplies)
//! ScaledTerm & ScaledTerm      -> ConjunctiveGroup  (all apply together)
//! ScaledTerm | ScaledTerm      -> DisjunctiveGroup  (one alternative per scenario)
//! ConjunctiveGroup & ScaledTerm-> ConjunctiveGroup
//! DisjunctiveGroup | ScaledTerm-> DisjunctiveGroup
//! number * DisjunctiveGroup    -> DisjunctiveGroup
//! ScaledTerm & DisjunctiveGroup-> Combination
//! Group & Group                -> Combination
//! Combination & Group          -> Combination
//! ```
//!
//! The operators are implemented with `std::ops`, so any other pairing fails to
//! compile. Rust's operator precedence (`*` over `&` over `|`) matches the
//! combination grammar, so expressions read the same in code and in strings:
//!
//! ```
//! use combo_core::loads::{factored, Combination};
//!
//! let (d, l) = (factored("D"), factored("L"));
//! let (s, lr, w) = (factored("S"), factored("Lr"), factored("W"));
//!
//! let combo: Combination = 1.6 * d & 1.2 * l & 0.5 * (s | lr | w);
//! assert_eq!(combo.scenario_count().unwrap(), 3);
//! ```
//!
//! [`Term`] is the dynamically tagged form used when evaluating parsed strings.
//! Its builders ([`and_`], [`or_`], [`scale`]) dispatch onto the same operators
//! and report every other pairing as [`ComboError::Composition`].

use std::fmt;
use std::ops::{BitAnd, BitOr, Mul};

use ndarray::Array2;

use super::combination::Combination;
use super::load_types::LoadType;
use crate::errors::{ComboError, ComboResult};

// ============================================================================
// Scaled Term
// ============================================================================

/// A named load case with a load factor.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledTerm {
    /// Load case identifier (e.g. "D", "Lr")
    pub load_case: String,
    /// Load factor
    pub factor: f64,
}

impl ScaledTerm {
    /// Reference a load case with a factor of 1.0
    pub fn new(load_case: impl Into<String>) -> Self {
        ScaledTerm {
            load_case: load_case.into(),
            factor: 1.0,
        }
    }

    /// Reference a load case with an explicit factor
    pub fn with_factor(load_case: impl Into<String>, factor: f64) -> Self {
        ScaledTerm {
            load_case: load_case.into(),
            factor,
        }
    }

    /// A copy of this term with its factor multiplied by `by`
    pub fn scaled(&self, by: f64) -> Self {
        ScaledTerm {
            load_case: self.load_case.clone(),
            factor: self.factor * by,
        }
    }
}

/// Shorthand for [`ScaledTerm::new`]
pub fn factored(load_case: impl Into<String>) -> ScaledTerm {
    ScaledTerm::new(load_case)
}

impl From<LoadType> for ScaledTerm {
    fn from(load_type: LoadType) -> Self {
        ScaledTerm::new(load_type.code())
    }
}

impl fmt::Display for ScaledTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.factor == 1.0 {
            write!(f, "{}", self.load_case)
        } else {
            write!(f, "{}*{}", self.factor, self.load_case)
        }
    }
}

// ============================================================================
// Groups
// ============================================================================

/// Something that contributes a block of scenario rows to a combination.
///
/// The block has one column per member term, in member order.
pub trait CoefficientBlock {
    /// Member terms, in order
    fn terms(&self) -> &[ScaledTerm];

    /// Coefficient block (rows x members)
    fn block(&self) -> Array2<f64>;

    /// Number of scenarios this block contributes
    fn row_count(&self) -> usize {
        self.block().nrows()
    }
}

/// Load cases that all apply in the same scenario (`A & B & C`).
#[derive(Debug, Clone, PartialEq)]
pub struct ConjunctiveGroup {
    terms: Vec<ScaledTerm>,
}

impl ConjunctiveGroup {
    /// Start a group with a single member
    pub fn new(first: ScaledTerm) -> Self {
        ConjunctiveGroup { terms: vec![first] }
    }

    /// Build a group from a list of members; the list must not be empty
    pub fn from_terms(terms: impl IntoIterator<Item = ScaledTerm>) -> ComboResult<Self> {
        non_empty("&", "ConjunctiveGroup", terms).map(|terms| ConjunctiveGroup { terms })
    }

    /// Append another member (builder pattern)
    pub fn with(mut self, term: ScaledTerm) -> Self {
        self.terms.push(term);
        self
    }
}

impl CoefficientBlock for ConjunctiveGroup {
    fn terms(&self) -> &[ScaledTerm] {
        &self.terms
    }

    /// A single row holding every member's factor
    fn block(&self) -> Array2<f64> {
        Array2::from_shape_fn((1, self.terms.len()), |(_, j)| self.terms[j].factor)
    }

    fn row_count(&self) -> usize {
        1
    }
}

impl fmt::Display for ConjunctiveGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", join(&self.terms, " & "))
    }
}

/// Mutually exclusive load cases (`A | B | C`); each member is its own scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct DisjunctiveGroup {
    terms: Vec<ScaledTerm>,
}

impl DisjunctiveGroup {
    /// Start a group with a single alternative
    pub fn new(first: ScaledTerm) -> Self {
        DisjunctiveGroup { terms: vec![first] }
    }

    /// Build a group from a list of alternatives; the list must not be empty
    pub fn from_terms(terms: impl IntoIterator<Item = ScaledTerm>) -> ComboResult<Self> {
        non_empty("|", "DisjunctiveGroup", terms).map(|terms| DisjunctiveGroup { terms })
    }

    /// Append another alternative (builder pattern)
    pub fn with(mut self, term: ScaledTerm) -> Self {
        self.terms.push(term);
        self
    }

    /// A copy with every member's factor multiplied by `by`
    pub fn scaled(&self, by: f64) -> Self {
        DisjunctiveGroup {
            terms: self.terms.iter().map(|t| t.scaled(by)).collect(),
        }
    }
}

impl CoefficientBlock for DisjunctiveGroup {
    fn terms(&self) -> &[ScaledTerm] {
        &self.terms
    }

    /// Diagonal matrix of factors: one scenario per alternative
    fn block(&self) -> Array2<f64> {
        let n = self.terms.len();
        Array2::from_shape_fn((n, n), |(i, j)| if i == j { self.terms[i].factor } else { 0.0 })
    }

    fn row_count(&self) -> usize {
        self.terms.len()
    }
}

impl fmt::Display for DisjunctiveGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", join(&self.terms, " | "))
    }
}

/// Either kind of group, as held by a [`Combination`].
#[derive(Debug, Clone, PartialEq)]
pub enum Group {
    And(ConjunctiveGroup),
    Or(DisjunctiveGroup),
}

impl CoefficientBlock for Group {
    fn terms(&self) -> &[ScaledTerm] {
        match self {
            Group::And(group) => group.terms(),
            Group::Or(group) => group.terms(),
        }
    }

    fn block(&self) -> Array2<f64> {
        match self {
            Group::And(group) => group.block(),
            Group::Or(group) => group.block(),
        }
    }

    fn row_count(&self) -> usize {
        match self {
            Group::And(group) => group.row_count(),
            Group::Or(group) => group.row_count(),
        }
    }
}

impl From<ConjunctiveGroup> for Group {
    fn from(group: ConjunctiveGroup) -> Self {
        Group::And(group)
    }
}

impl From<DisjunctiveGroup> for Group {
    fn from(group: DisjunctiveGroup) -> Self {
        Group::Or(group)
    }
}

impl From<ScaledTerm> for Group {
    fn from(term: ScaledTerm) -> Self {
        Group::And(ConjunctiveGroup::new(term))
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::And(group) => group.fmt(f),
            Group::Or(group) => group.fmt(f),
        }
    }
}

fn non_empty(
    operator: &str,
    kind: &str,
    terms: impl IntoIterator<Item = ScaledTerm>,
) -> ComboResult<Vec<ScaledTerm>> {
    let terms: Vec<ScaledTerm> = terms.into_iter().collect();
    if terms.is_empty() {
        return Err(ComboError::composition(operator, kind, "no members"));
    }
    Ok(terms)
}

fn join(terms: &[ScaledTerm], separator: &str) -> String {
    terms
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

// ============================================================================
// Operators
// ============================================================================

impl Mul<ScaledTerm> for f64 {
    type Output = ScaledTerm;

    fn mul(self, rhs: ScaledTerm) -> ScaledTerm {
        rhs.scaled(self)
    }
}

impl Mul<LoadType> for f64 {
    type Output = ScaledTerm;

    fn mul(self, rhs: LoadType) -> ScaledTerm {
        ScaledTerm::from(rhs).scaled(self)
    }
}

impl Mul<DisjunctiveGroup> for f64 {
    type Output = DisjunctiveGroup;

    fn mul(self, rhs: DisjunctiveGroup) -> DisjunctiveGroup {
        rhs.scaled(self)
    }
}

impl BitAnd for ScaledTerm {
    type Output = ConjunctiveGroup;

    fn bitand(self, rhs: ScaledTerm) -> ConjunctiveGroup {
        ConjunctiveGroup::new(self).with(rhs)
    }
}

impl BitOr for ScaledTerm {
    type Output = DisjunctiveGroup;

    fn bitor(self, rhs: ScaledTerm) -> DisjunctiveGroup {
        DisjunctiveGroup::new(self).with(rhs)
    }
}

impl BitAnd<ScaledTerm> for ConjunctiveGroup {
    type Output = ConjunctiveGroup;

    fn bitand(self, rhs: ScaledTerm) -> ConjunctiveGroup {
        self.with(rhs)
    }
}

impl BitOr<ScaledTerm> for DisjunctiveGroup {
    type Output = DisjunctiveGroup;

    fn bitor(self, rhs: ScaledTerm) -> DisjunctiveGroup {
        self.with(rhs)
    }
}

impl BitAnd<DisjunctiveGroup> for ScaledTerm {
    type Output = Combination;

    fn bitand(self, rhs: DisjunctiveGroup) -> Combination {
        Combination::from_groups(self, [Group::Or(rhs)])
    }
}

macro_rules! group_and_group {
    ($($lhs:ty, $rhs:ty);* $(;)?) => {
        $(
            impl BitAnd<$rhs> for $lhs {
                type Output = Combination;

                fn bitand(self, rhs: $rhs) -> Combination {
                    Combination::from_groups(self, [Group::from(rhs)])
                }
            }
        )*
    };
}

group_and_group! {
    ConjunctiveGroup, ConjunctiveGroup;
    ConjunctiveGroup, DisjunctiveGroup;
    DisjunctiveGroup, ConjunctiveGroup;
    DisjunctiveGroup, DisjunctiveGroup;
}

impl BitAnd<ConjunctiveGroup> for Combination {
    type Output = Combination;

    fn bitand(self, rhs: ConjunctiveGroup) -> Combination {
        self.and_group(rhs)
    }
}

impl BitAnd<DisjunctiveGroup> for Combination {
    type Output = Combination;

    fn bitand(self, rhs: DisjunctiveGroup) -> Combination {
        self.and_group(rhs)
    }
}

// ============================================================================
// Tagged Terms
// ============================================================================

/// Any intermediate value of the algebra.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Scaled(ScaledTerm),
    And(ConjunctiveGroup),
    Or(DisjunctiveGroup),
    Combination(Combination),
}

impl Term {
    /// Variant name, as reported in composition errors
    pub fn kind(&self) -> &'static str {
        match self {
            Term::Scaled(_) => "ScaledTerm",
            Term::And(_) => "ConjunctiveGroup",
            Term::Or(_) => "DisjunctiveGroup",
            Term::Combination(_) => "Combination",
        }
    }

    /// `self & rhs`
    pub fn and_(self, rhs: Term) -> ComboResult<Term> {
        let combined = match (self, rhs) {
            (Term::Scaled(a), Term::Scaled(b)) => Term::And(a & b),
            (Term::And(a), Term::Scaled(b)) => Term::And(a & b),
            (Term::Scaled(a), Term::Or(b)) => Term::Combination(a & b),
            (Term::And(a), Term::And(b)) => Term::Combination(a & b),
            (Term::And(a), Term::Or(b)) => Term::Combination(a & b),
            (Term::Or(a), Term::And(b)) => Term::Combination(a & b),
            (Term::Or(a), Term::Or(b)) => Term::Combination(a & b),
            (Term::Combination(a), Term::And(b)) => Term::Combination(a & b),
            (Term::Combination(a), Term::Or(b)) => Term::Combination(a & b),
            (lhs, rhs) => return Err(ComboError::composition("&", lhs.kind(), rhs.kind())),
        };
        Ok(combined)
    }

    /// `self | rhs`
    pub fn or_(self, rhs: Term) -> ComboResult<Term> {
        match (self, rhs) {
            (Term::Scaled(a), Term::Scaled(b)) => Ok(Term::Or(a | b)),
            (Term::Or(a), Term::Scaled(b)) => Ok(Term::Or(a | b)),
            (lhs, rhs) => Err(ComboError::composition("|", lhs.kind(), rhs.kind())),
        }
    }

    /// `factor * self`
    pub fn scale(self, factor: f64) -> ComboResult<Term> {
        match self {
            Term::Scaled(term) => Ok(Term::Scaled(factor * term)),
            Term::Or(group) => Ok(Term::Or(factor * group)),
            other => Err(ComboError::composition("*", "number", other.kind())),
        }
    }
}

/// `a & b` over tagged terms
pub fn and_(a: impl Into<Term>, b: impl Into<Term>) -> ComboResult<Term> {
    a.into().and_(b.into())
}

/// `a | b` over tagged terms
pub fn or_(a: impl Into<Term>, b: impl Into<Term>) -> ComboResult<Term> {
    a.into().or_(b.into())
}

/// `factor * a` over tagged terms
pub fn scale(a: impl Into<Term>, factor: f64) -> ComboResult<Term> {
    a.into().scale(factor)
}

impl From<ScaledTerm> for Term {
    fn from(term: ScaledTerm) -> Self {
        Term::Scaled(term)
    }
}

impl From<ConjunctiveGroup> for Term {
    fn from(group: ConjunctiveGroup) -> Self {
        Term::And(group)
    }
}

impl From<DisjunctiveGroup> for Term {
    fn from(group: DisjunctiveGroup) -> Self {
        Term::Or(group)
    }
}

impl From<Combination> for Term {
    fn from(combination: Combination) -> Self {
        Term::Combination(combination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_scaled_term_defaults_to_unit_factor() {
        let d = factored("D");
        assert_eq!(d.load_case, "D");
        assert_eq!(d.factor, 1.0);
    }

    #[test]
    fn test_scaling_leaves_original_untouched() {
        let d = factored("D");
        let scaled = 1.4 * d.clone();
        assert_eq!(d.factor, 1.0);
        assert_eq!(scaled.factor, 1.4);
    }

    #[test]
    fn test_rescale_law() {
        let t = factored("W");
        assert_eq!(((0.75 * 0.6) * t.clone()).factor, (0.75 * (0.6 * t.clone())).factor);

        let t = ScaledTerm::with_factor("W", 1.3);
        assert_relative_eq!(((0.75 * 0.6) * t.clone()).factor, (0.75 * (0.6 * t)).factor, epsilon = 1e-15);
    }

    #[test]
    fn test_load_type_operand() {
        let term = 1.2 * LoadType::Dead;
        assert_eq!(term, ScaledTerm::with_factor("D", 1.2));
    }

    #[test]
    fn test_conjunctive_block_is_one_row() {
        let group = 1.2 * factored("D") & 1.6 * factored("L") & factored("W");
        assert_eq!(group.block(), array![[1.2, 1.6, 1.0]]);
        assert_eq!(group.row_count(), 1);
    }

    #[test]
    fn test_disjunctive_block_is_diagonal() {
        let group = 0.5 * (factored("Lr") | factored("S") | factored("R"));
        assert_eq!(
            group.block(),
            array![[0.5, 0.0, 0.0], [0.0, 0.5, 0.0], [0.0, 0.0, 0.5]]
        );
        assert_eq!(group.row_count(), 3);
    }

    #[test]
    fn test_groups_need_a_member() {
        let err = DisjunctiveGroup::from_terms(Vec::new()).unwrap_err();
        assert_eq!(err, ComboError::composition("|", "DisjunctiveGroup", "no members"));
        assert!(ConjunctiveGroup::from_terms(None).is_err());

        let group = ConjunctiveGroup::from_terms([factored("D"), 1.6 * factored("L")]).unwrap();
        assert_eq!(group, factored("D") & 1.6 * factored("L"));
    }

    #[test]
    fn test_display() {
        let or = factored("S") | 0.5 * factored("W");
        assert_eq!(or.to_string(), "(S | 0.5*W)");
        let and = 1.2 * factored("D") & factored("L");
        assert_eq!(and.to_string(), "1.2*D & L");
    }

    #[test]
    fn test_term_and_rules() {
        let d = || Term::from(factored("D"));
        let or = || Term::from(factored("S") | factored("R"));

        assert_eq!(d().and_(d()).unwrap().kind(), "ConjunctiveGroup");
        assert_eq!(d().and_(or()).unwrap().kind(), "Combination");
        assert_eq!(or().and_(or()).unwrap().kind(), "Combination");

        // An OR-group cannot be extended by a bare term
        let err = or().and_(d()).unwrap_err();
        assert_eq!(err, ComboError::composition("&", "DisjunctiveGroup", "ScaledTerm"));

        // Nor can a finished combination
        let combo = d().and_(or()).unwrap();
        assert!(combo.clone().and_(d()).is_err());
        assert!(d().and_(combo).is_err());
    }

    #[test]
    fn test_term_or_rules() {
        let d = || Term::from(factored("D"));
        let or = || Term::from(factored("S") | factored("R"));
        let and = || Term::from(factored("S") & factored("R"));

        assert_eq!(or().or_(d()).unwrap().kind(), "DisjunctiveGroup");
        assert!(d().or_(or()).is_err());
        assert!(or().or_(or()).is_err());
        assert!(and().or_(d()).is_err());
        assert!(d().or_(and()).is_err());
    }

    #[test]
    fn test_term_scale_rules() {
        let scaled = scale(factored("S") | factored("R"), 0.5).unwrap();
        match scaled {
            Term::Or(group) => assert!(group.terms().iter().all(|t| t.factor == 0.5)),
            other => panic!("expected an OR group, got {}", other.kind()),
        }

        let err = scale(factored("D") & factored("L"), 2.0).unwrap_err();
        assert_eq!(err.error_code(), "COMPOSITION_ERROR");
    }

    #[test]
    fn test_free_builders_match_operators() {
        let built = and_(1.2 * factored("D"), 1.6 * (factored("S") | factored("R"))).unwrap();
        let direct: Combination = 1.2 * factored("D") & 1.6 * (factored("S") | factored("R"));
        assert_eq!(built, Term::Combination(direct));
    }
}
