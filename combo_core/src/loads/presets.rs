//! Preset ASCE 7-22 combinations and the governing-scenario search
//!
//! Standard load combinations per ASCE 7-22 for both Allowable Stress Design
//! (ASD) and Load and Resistance Factor Design (LRFD), written in the
//! combination grammar. Each alternative set of companion loads is an OR-group,
//! so "D + (Lr or S or R)" is one combination with three scenarios rather than
//! three separate combinations.
//!
//! ## Wind Load Sign Convention
//!
//! The grammar has no subtraction, so there are no separate `-W` variants.
//! Enter wind as a signed value instead: a negative W (suction/uplift) makes
//! the `0.6D + 0.6W` and `0.9D + 1.0W` combinations produce the minimum
//! reactions that govern anchor and connection design.

use serde::Serialize;

use super::combination::Combination;
use super::load_types::LoadType;
use super::LoadCase;
use crate::errors::{ComboError, ComboResult};

/// A code combination with its identifier
///
/// # Example
/// ```
/// use combo_core::loads::{NamedCombination, LoadCase, LoadType};
///
/// let combo = NamedCombination::new("ASD-2", "D & L").unwrap();
///
/// let case = LoadCase::new("Floor")
///     .with_load(LoadType::Dead, 20.0)
///     .with_load(LoadType::Live, 50.0);
///
/// assert_eq!(combo.apply(&case).unwrap().to_vec(), vec![70.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedCombination {
    /// Combination identifier (e.g., "ASD-1", "LRFD-2")
    pub name: String,

    /// The combination itself
    #[serde(serialize_with = "serialize_expr")]
    pub combination: Combination,
}

/// Written as grammar text so the output loads back with [`Combination::parse`]
fn serialize_expr<S: serde::Serializer>(combination: &Combination, serializer: S) -> Result<S::Ok, S::Error> {
    let expr = combination.to_expression().map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&expr)
}

impl NamedCombination {
    /// Parse `expr` and name it
    pub fn new(name: impl Into<String>, expr: &str) -> ComboResult<Self> {
        Ok(NamedCombination {
            name: name.into(),
            combination: Combination::parse(expr)?,
        })
    }

    /// Evaluate every scenario against a load case.
    ///
    /// Load types not set in the case are treated as 0 load. An identifier
    /// that is not an ASCE 7 load code is a binding error.
    pub fn apply(&self, case: &LoadCase) -> ComboResult<ndarray::Array1<f64>> {
        let values = self
            .combination
            .identifiers()
            .iter()
            .map(|id| {
                LoadType::from_code(id)
                    .map(|load_type| case.get(load_type))
                    .ok_or_else(|| ComboError::binding(id, "not an ASCE 7 load type code"))
            })
            .collect::<ComboResult<Vec<f64>>>()?;
        self.combination.evaluate_scalars(&values)
    }
}

/// ASD combinations of ASCE 7-22 section 2.4.1
///
/// - Gravity only: D, D+L, D+(Lr or S or R)
/// - Combined gravity (D+0.75L+0.75Lr/S/R)
/// - Lateral load combinations (D+0.6W or D+0.7E, with companion loads)
/// - Overturning combinations (0.6D+0.6W, 0.6D+0.7E)
///
/// # Example
/// ```
/// use combo_core::loads::asce7_asd_combinations;
///
/// let combos = asce7_asd_combinations().unwrap();
/// assert_eq!(combos.len(), 9);
/// ```
pub fn asce7_asd_combinations() -> ComboResult<Vec<NamedCombination>> {
    [
        ("ASD-1", "D"),
        ("ASD-2", "D & L"),
        ("ASD-3", "D & (Lr | S | R)"),
        ("ASD-4", "D & 0.75*L & 0.75*(Lr | S | R)"),
        ("ASD-5", "D & (0.6*W | 0.7*E)"),
        // 0.75(0.6W)
        ("ASD-6", "D & 0.75*L & 0.75*0.6*W & 0.75*(Lr | S | R)"),
        // 0.75(0.7E)
        ("ASD-7", "D & 0.75*L & 0.75*0.7*E & 0.75*S"),
        ("ASD-8", "0.6*D & 0.6*W"),
        ("ASD-9", "0.6*D & 0.7*E"),
    ]
    .into_iter()
    .map(|(name, expr)| NamedCombination::new(name, expr))
    .collect()
}

/// LRFD combinations of ASCE 7-22 section 2.3.1
///
/// # Example
/// ```
/// use combo_core::loads::asce7_lrfd_combinations;
///
/// let combos = asce7_lrfd_combinations().unwrap();
/// let lrfd1 = combos.iter().find(|c| c.name == "LRFD-1").unwrap();
/// assert_eq!(lrfd1.combination.matrix().unwrap()[[0, 0]], 1.4);
/// ```
pub fn asce7_lrfd_combinations() -> ComboResult<Vec<NamedCombination>> {
    [
        ("LRFD-1", "1.4*D"),
        ("LRFD-2", "1.2*D & 1.6*L & 0.5*(Lr | S | R)"),
        ("LRFD-3", "1.2*D & 1.6*(Lr | S | R) & (L | 0.5*W)"),
        ("LRFD-4", "1.2*D & 1.0*W & L & 0.5*(Lr | S | R)"),
        ("LRFD-5", "1.2*D & 1.0*E & L & 0.2*S"),
        ("LRFD-6", "0.9*D & 1.0*W"),
        ("LRFD-7", "0.9*D & 1.0*E"),
    ]
    .into_iter()
    .map(|(name, expr)| NamedCombination::new(name, expr))
    .collect()
}

/// Extreme scenarios over a set of combinations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoverningResults {
    /// Largest factored load (strength design)
    pub max_load: f64,
    pub max_combo: String,
    /// Scenario equation for maximum load (e.g. "1.2D + 1.6L + 0.5S")
    pub max_scenario: String,
    /// Smallest factored load (uplift and anchorage)
    pub min_load: f64,
    pub min_combo: String,
    /// Scenario equation for minimum load
    pub min_scenario: String,
}

/// Find both maximum and minimum governing scenarios over all combinations
///
/// Every scenario of every combination is a candidate. On ties the first
/// candidate wins.
///
/// # Example
/// ```
/// use combo_core::loads::{LoadCase, LoadType, asce7_lrfd_combinations, find_governing_min_max};
///
/// let case = LoadCase::new("Roof")
///     .with_load(LoadType::Dead, 10.0)
///     .with_load(LoadType::Snow, 30.0);
///
/// let results = find_governing_min_max(&case, &asce7_lrfd_combinations().unwrap()).unwrap();
/// assert_eq!(results.max_combo, "LRFD-3");
/// assert_eq!(results.max_scenario, "1.2D + 1.6S + L");
/// ```
pub fn find_governing_min_max(
    case: &LoadCase,
    combinations: &[NamedCombination],
) -> ComboResult<GoverningResults> {
    let mut results = GoverningResults {
        max_load: f64::MIN,
        max_combo: String::new(),
        max_scenario: String::new(),
        min_load: f64::MAX,
        min_combo: String::new(),
        min_scenario: String::new(),
    };

    for named in combinations {
        let loads = named.apply(case)?;
        let equations = named.combination.scenario_equations()?;

        for (load, equation) in loads.iter().zip(&equations) {
            if *load > results.max_load {
                results.max_load = *load;
                results.max_combo = named.name.clone();
                results.max_scenario = equation.clone();
            }
            if *load < results.min_load {
                results.min_load = *load;
                results.min_combo = named.name.clone();
                results.min_scenario = equation.clone();
            }
        }
    }

    tracing::debug!(
        case = %case.label,
        max = results.max_load,
        max_combo = %results.max_combo,
        min = results.min_load,
        min_combo = %results.min_combo,
        "governing combinations"
    );

    Ok(results)
}
