//! The `Combination` type: a conjunctive chain of groups plus its compiled form.
//!
//! A combination is built either from a string,
//!
//! ```
//! use combo_core::loads::Combination;
//!
//! let combo = Combination::parse("1.2*D & 1.6*L & 0.5*(Lr | S | R)").unwrap();
//! assert_eq!(combo.identifiers(), ["D", "L", "Lr", "S", "R"]);
//!
//! let results = combo.evaluate_scalars(&[1.0, 1.0, 1.0, 1.0, 1.0]).unwrap();
//! assert_eq!(results.len(), 3);
//! ```
//!
//! or by composing [`ScaledTerm`](super::ScaledTerm)s directly (see
//! [`algebra`](super::algebra)). The coefficient matrix and evaluator are
//! compiled on first use and cached for the lifetime of the combination.
//!
//! A composed combination renders back into the grammar with
//! [`Combination::to_expression`]. Two shapes have no written form: a lone
//! load case chained after an OR group (`(S | R) & D`, which the grammar
//! rejects) and a negative factor (the grammar has no minus sign).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayD};
use once_cell::sync::OnceCell;

use super::algebra::{CoefficientBlock, Group, ScaledTerm, Term};
use super::evaluator::{CombinationEvaluator, LoadValue};
use super::{matrix, parser};
use crate::common::{flatten, unique_in_order, Nested};
use crate::errors::{ComboError, ComboResult};

/// A load combination: every group applies together, each contributing one
/// choice of scenario row.
#[derive(Debug, Clone)]
pub struct Combination {
    expr: String,
    parsed: bool,
    identifiers: Vec<String>,
    groups: Vec<Group>,
    compiled: OnceCell<CombinationEvaluator>,
}

impl Combination {
    /// Parse and evaluate a combination string.
    ///
    /// Any algebra value is accepted as the whole expression, including a
    /// lone OR group: `S | 0.5*W` is a combination with two scenarios.
    /// Expressions that expand past [`matrix::MAX_SCENARIOS`] are rejected
    /// here, before any expansion.
    ///
    /// # Example
    /// ```
    /// use combo_core::loads::Combination;
    ///
    /// let combo = Combination::parse("(1.4*D)").unwrap();
    /// assert_eq!(combo.evaluate_scalars(&[1.0]).unwrap().to_vec(), vec![1.4]);
    ///
    /// assert!(Combination::parse("1.2*D + 1.6*L").is_err());
    /// ```
    pub fn parse(expr: &str) -> ComboResult<Self> {
        let identifiers = parser::parse_identifiers(expr)?;
        let term = parser::evaluate(expr, &identifiers)?;
        let groups = Self::groups_of(term);
        let row_counts: Vec<usize> = groups.iter().map(CoefficientBlock::row_count).collect();
        matrix::scenario_total(&row_counts)?;

        tracing::debug!(
            expr,
            identifiers = ?identifiers,
            groups = groups.len(),
            "parsed load combination"
        );

        Ok(Combination {
            expr: expr.to_string(),
            parsed: true,
            identifiers,
            groups,
            compiled: OnceCell::new(),
        })
    }

    /// Wrap any algebra value as a combination.
    ///
    /// A single term, conjunctive group or disjunctive group becomes a
    /// one-group combination.
    pub fn from_term(term: impl Into<Term>) -> Self {
        Self::from_group_vec(Self::groups_of(term.into()))
    }

    /// Chain groups together. At least one group is always present.
    pub fn from_groups(first: impl Into<Group>, rest: impl IntoIterator<Item = Group>) -> Self {
        let mut groups = vec![first.into()];
        groups.extend(rest);
        Self::from_group_vec(groups)
    }

    /// Append another group to the chain (`self & group`)
    pub fn and_group(self, group: impl Into<Group>) -> Self {
        let mut groups = self.groups;
        groups.push(group.into());
        Self::from_group_vec(groups)
    }

    fn from_group_vec(groups: Vec<Group>) -> Self {
        let identifiers = identifiers_of(&groups);
        let expr = render(&groups).unwrap_or_else(|_| display_form(&groups));

        Combination {
            expr,
            parsed: false,
            identifiers,
            groups,
            compiled: OnceCell::new(),
        }
    }

    fn groups_of(term: Term) -> Vec<Group> {
        match term {
            Term::Scaled(term) => vec![Group::from(term)],
            Term::And(group) => vec![Group::And(group)],
            Term::Or(group) => vec![Group::Or(group)],
            Term::Combination(combination) => combination.groups,
        }
    }

    /// The source string, or a rendered equivalent for combinations built
    /// from the algebra directly.
    ///
    /// For a composed combination with no written form this is a readable
    /// rendering that does not parse; see [`Combination::to_expression`].
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// Text that [`Combination::parse`] turns back into the same matrix.
    ///
    /// Conjunctive groups at the head of the chain are written out as one
    /// chain, which leaves the matrix unchanged.
    ///
    /// ```
    /// use combo_core::loads::{factored, Combination, ConjunctiveGroup};
    ///
    /// let combo = (factored("S") | factored("R")) & (factored("D") & factored("L"));
    /// assert_eq!(combo.to_expression().unwrap(), "(S | R) & (D & L)");
    ///
    /// // A lone load case cannot follow an OR group in the grammar
    /// let combo = (factored("S") | factored("R")) & ConjunctiveGroup::new(factored("D"));
    /// assert!(combo.to_expression().is_err());
    /// ```
    pub fn to_expression(&self) -> ComboResult<String> {
        if self.parsed {
            return Ok(self.expr.clone());
        }
        render(&self.groups)
    }

    /// Distinct load cases in first-appearance order; also the matrix column order
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// The conjunctively chained groups
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Scenario rows contributed by each group
    pub fn row_counts(&self) -> Vec<usize> {
        self.groups.iter().map(CoefficientBlock::row_count).collect()
    }

    /// Total number of scenarios (product of the group row counts)
    pub fn scenario_count(&self) -> ComboResult<usize> {
        matrix::scenario_total(&self.row_counts())
    }

    /// Compiled evaluator, built once on first use
    pub fn evaluator(&self) -> ComboResult<&CombinationEvaluator> {
        self.compiled.get_or_try_init(|| {
            let matrix = matrix::compile(&self.groups, &self.identifiers)?;
            tracing::debug!(
                expr = %self.expr,
                scenarios = matrix.nrows(),
                load_cases = matrix.ncols(),
                "compiled load combination"
            );
            Ok(CombinationEvaluator::new(self.identifiers.clone(), matrix))
        })
    }

    /// Coefficient matrix: one row per scenario, one column per identifier
    pub fn matrix(&self) -> ComboResult<&Array2<f64>> {
        Ok(self.evaluator()?.matrix())
    }

    /// Evaluate every scenario with values looked up by load case name.
    ///
    /// Result has the scenario axis first: shape `[scenarios, ..broadcast]`.
    pub fn evaluate(&self, values: &HashMap<String, LoadValue>) -> ComboResult<ArrayD<f64>> {
        self.evaluator()?.evaluate(values)
    }

    /// Evaluate with one value per identifier, in identifier order
    pub fn evaluate_ordered(&self, values: &[LoadValue]) -> ComboResult<ArrayD<f64>> {
        self.evaluator()?.evaluate_ordered(values)
    }

    /// Scalar fast path: one number per identifier, in identifier order
    pub fn evaluate_scalars(&self, values: &[f64]) -> ComboResult<Array1<f64>> {
        self.evaluator()?.evaluate_scalars(values)
    }

    /// Every scenario written out as an equation, e.g. `1.2D + 1.6L + 0.5S`
    ///
    /// # Example
    /// ```
    /// use combo_core::loads::Combination;
    ///
    /// let combo = Combination::parse("D & 0.75*L & 0.75*(Lr | S)").unwrap();
    /// assert_eq!(
    ///     combo.scenario_equations().unwrap(),
    ///     vec!["D + 0.75L + 0.75Lr", "D + 0.75L + 0.75S"]
    /// );
    /// ```
    pub fn scenario_equations(&self) -> ComboResult<Vec<String>> {
        let equations = self
            .matrix()?
            .rows()
            .into_iter()
            .map(|row| {
                let terms: Vec<String> = row
                    .iter()
                    .zip(&self.identifiers)
                    .filter(|(factor, _)| **factor != 0.0)
                    .map(|(factor, id)| {
                        if *factor == 1.0 {
                            id.clone()
                        } else {
                            format!("{}{}", format_factor(*factor), id)
                        }
                    })
                    .collect();
                if terms.is_empty() {
                    "0".to_string()
                } else {
                    terms.join(" + ")
                }
            })
            .collect();
        Ok(equations)
    }
}

/// What the text written so far parses to
#[derive(Clone, Copy)]
enum Rendered {
    Nothing,
    /// One conjunctive chain, still open to bare terms
    Chain,
    /// An OR group or a finished combination
    Closed,
}

/// Write a group chain in the combination grammar.
fn render(groups: &[Group]) -> ComboResult<String> {
    let mut state = Rendered::Nothing;
    let mut pieces = Vec::with_capacity(groups.len());

    for group in groups {
        let terms = group.terms();
        for term in terms {
            if term.factor.is_sign_negative() || !term.factor.is_finite() {
                return Err(ComboError::expression(
                    display_form(groups),
                    format!("factor {} on {} has no written form", term.factor, term.load_case),
                ));
            }
        }

        let piece = match (group, terms, state) {
            (_, [single], Rendered::Nothing | Rendered::Chain) => {
                state = Rendered::Chain;
                single.to_string()
            }
            (_, [single], Rendered::Closed) => {
                return Err(ComboError::expression(
                    display_form(groups),
                    format!("lone load case {} cannot follow an OR group", single),
                ));
            }
            (Group::And(_), _, Rendered::Nothing | Rendered::Chain) => {
                state = Rendered::Chain;
                join_terms(terms, " & ")
            }
            (Group::And(_), _, Rendered::Closed) => format!("({})", join_terms(terms, " & ")),
            (Group::Or(_), _, _) => {
                state = Rendered::Closed;
                format!("({})", join_terms(terms, " | "))
            }
        };
        pieces.push(piece);
    }
    Ok(pieces.join(" & "))
}

/// Readable form of any chain, parseable or not
fn display_form(groups: &[Group]) -> String {
    groups
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" & ")
}

fn join_terms(terms: &[ScaledTerm], separator: &str) -> String {
    terms
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Factor as printed in equations: at most six decimals, trailing zeros dropped.
fn format_factor(factor: f64) -> String {
    let fixed = format!("{:.6}", factor);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Enumerate the distinct load cases of a group chain, in order of appearance.
fn identifiers_of(groups: &[Group]) -> Vec<String> {
    let tree: Nested<String> = groups
        .iter()
        .map(|group| {
            group
                .terms()
                .iter()
                .map(|term| Nested::Leaf(term.load_case.clone()))
                .collect::<Nested<String>>()
        })
        .collect();
    unique_in_order(flatten(&tree))
}

impl PartialEq for Combination {
    fn eq(&self, other: &Self) -> bool {
        self.identifiers == other.identifiers && self.groups == other.groups
    }
}

impl FromStr for Combination {
    type Err = crate::errors::ComboError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Combination::parse(s)
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}
