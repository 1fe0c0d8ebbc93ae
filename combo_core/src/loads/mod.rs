//! Load combination algebra, compiler and evaluator
//!
//! A load combination such as `1.2*D & 1.6*L & 0.5*(Lr | S | R)` says which
//! factored load cases act together (`&`) and which are alternatives (`|`).
//! This module turns such an expression into a coefficient matrix with one
//! row per scenario and evaluates it against load values.
//!
//! # Overview
//!
//! - [`ScaledTerm`], [`ConjunctiveGroup`], [`DisjunctiveGroup`] - the algebra
//! - [`Combination`] - a parsed or composed combination with its cached matrix
//! - [`CombinationEvaluator`] - broadcasting evaluation over scalar or array loads
//! - [`LoadCombinationFn`] - a combination bound to a named parameter list
//! - [`LoadType`], [`LoadCase`], [`DesignMethod`] - ASCE 7-22 presets and governing search
//!
//! # Example
//!
//! ```
//! use combo_core::loads::{LoadType, LoadCase, DesignMethod};
//!
//! // Define loads for a floor beam
//! let floor_loads = LoadCase::new("Second Floor")
//!     .with_load(LoadType::Dead, 15.0)   // psf self-weight
//!     .with_load(LoadType::Live, 40.0);  // psf occupancy
//!
//! let (max_load, combo) = floor_loads.governing_load(DesignMethod::Lrfd).unwrap();
//! assert_eq!(combo, "LRFD-2");
//! println!("Governing load: {} psf", max_load);
//! ```

pub mod algebra;
pub mod binder;
pub mod combination;
pub mod evaluator;
pub mod load_types;
pub mod matrix;
pub mod parser;
pub mod presets;

pub use algebra::{
    and_, factored, or_, scale, CoefficientBlock, ConjunctiveGroup, DisjunctiveGroup, Group,
    ScaledTerm, Term,
};
pub use binder::{Arguments, BindingMode, LoadCombinationFn, Signature};
pub use combination::Combination;
pub use evaluator::{CombinationEvaluator, LoadValue};
pub use load_types::LoadType;
pub use presets::{
    asce7_asd_combinations, asce7_lrfd_combinations, find_governing_min_max, GoverningResults,
    NamedCombination,
};

use std::collections::HashMap;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::errors::{ComboError, ComboResult};

/// Which family of ASCE 7 combinations applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesignMethod {
    /// Allowable Stress Design (section 2.4, service-level factors)
    #[default]
    Asd,
    /// Load and Resistance Factor Design (section 2.3, strength-level factors)
    Lrfd,
}

impl DesignMethod {
    pub const ALL: [DesignMethod; 2] = [DesignMethod::Asd, DesignMethod::Lrfd];

    /// Prefix of the preset names, e.g. `LRFD` in `LRFD-2`
    pub fn code(&self) -> &'static str {
        match self {
            DesignMethod::Asd => "ASD",
            DesignMethod::Lrfd => "LRFD",
        }
    }

    /// Preset combinations, in code order
    ///
    /// ```
    /// use combo_core::loads::DesignMethod;
    ///
    /// let lrfd = DesignMethod::Lrfd.combinations().unwrap();
    /// assert_eq!(lrfd[0].combination.expr(), "1.4*D");
    /// ```
    pub fn combinations(&self) -> ComboResult<Vec<NamedCombination>> {
        match self {
            DesignMethod::Asd => asce7_asd_combinations(),
            DesignMethod::Lrfd => asce7_lrfd_combinations(),
        }
    }
}

impl std::fmt::Display for DesignMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Unfactored load effects at one location, keyed by [`LoadType`].
///
/// Types that were never set read as zero. Units are whatever the caller
/// uses consistently (psf, plf, kips).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadCase {
    pub label: String,
    pub loads: HashMap<LoadType, f64>,
}

impl LoadCase {
    pub fn new(label: impl Into<String>) -> Self {
        LoadCase {
            label: label.into(),
            loads: HashMap::new(),
        }
    }

    pub fn with_load(mut self, load_type: LoadType, value: f64) -> Self {
        self.loads.insert(load_type, value);
        self
    }

    /// Build a case from values keyed by load code (`"D"`, `"Lr"`, ...).
    ///
    /// Every key must be an ASCE 7 code.
    pub fn from_values<'a>(
        label: impl Into<String>,
        values: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> ComboResult<Self> {
        values
            .into_iter()
            .try_fold(LoadCase::new(label), |case, (code, value)| {
                match LoadType::from_code(code) {
                    Some(load_type) => Ok(case.with_load(load_type, value)),
                    None => Err(ComboError::binding(code, "not an ASCE 7 load type code")),
                }
            })
    }

    pub fn get(&self, load_type: LoadType) -> f64 {
        self.loads.get(&load_type).copied().unwrap_or_default()
    }

    /// Gravity effects must be non-negative; wind and seismic carry a sign.
    pub fn validate(&self) -> ComboResult<()> {
        let negative = LoadType::ALL
            .iter()
            .filter(|lt| lt.is_gravity())
            .find(|lt| self.get(**lt) < 0.0);

        match negative {
            Some(lt) => Err(ComboError::binding(
                lt.code(),
                format!("{} cannot be negative (got {})", lt.description(), self.get(*lt)),
            )),
            None => Ok(()),
        }
    }

    /// One scalar per ASCE 7 code, unset types included as 0.0
    pub fn to_values(&self) -> HashMap<String, LoadValue> {
        LoadType::ALL
            .iter()
            .map(|lt| (lt.code().to_string(), LoadValue::from(self.get(*lt))))
            .collect()
    }

    /// Largest result over the presets of `method`, with the preset name
    pub fn governing_load(&self, method: DesignMethod) -> ComboResult<(f64, String)> {
        let governing = find_governing_min_max(self, &method.combinations()?)?;
        Ok((governing.max_load, governing.max_combo))
    }

    /// Every scenario result of every preset of `method`
    pub fn all_combination_results(&self, method: DesignMethod) -> ComboResult<Vec<(String, Array1<f64>)>> {
        method
            .combinations()?
            .iter()
            .map(|combo| combo.apply(self).map(|result| (combo.name.clone(), result)))
            .collect()
    }
}

impl Default for LoadCase {
    fn default() -> Self {
        LoadCase::new("Unnamed")
    }
}
