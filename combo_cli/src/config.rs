//! Combination files and load arguments.
//!
//! # JSON Format
//! ```json
//! {
//!   "method": "lrfd",
//!   "combinations": [
//!     { "name": "Roof", "expr": "1.2*D & 1.6*(Lr | S | R) & (L | 0.5*W)" }
//!   ],
//!   "loads": { "D": 15.0, "L": 40.0, "S": [20.0, 25.0, 30.0] }
//! }
//! ```
//!
//! Every field is optional. With a `method`, the ASCE 7 preset combinations
//! are evaluated after the ones listed in the file.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use combo_core::errors::{ComboError, ComboResult};
use combo_core::loads::{DesignMethod, LoadType, LoadValue, NamedCombination};
use serde::{Deserialize, Serialize};

/// A load value as written in a file: a number or a list of numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoadInput {
    Scalar(f64),
    Array(Vec<f64>),
}

impl From<LoadInput> for LoadValue {
    fn from(input: LoadInput) -> Self {
        match input {
            LoadInput::Scalar(value) => LoadValue::from(value),
            LoadInput::Array(values) => LoadValue::from(values),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationEntry {
    pub name: String,
    pub expr: String,
}

/// Contents of a combination file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComboFile {
    #[serde(default)]
    pub method: Option<DesignMethod>,

    #[serde(default)]
    pub combinations: Vec<CombinationEntry>,

    #[serde(default)]
    pub loads: HashMap<String, LoadInput>,
}

impl ComboFile {
    /// Read and parse a combination file
    pub fn load(path: &Path) -> ComboResult<Self> {
        let path_str = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|e| ComboError::config(&path_str, e.to_string()))?;
        let file = Self::from_json(&path_str, &text)?;

        tracing::info!(
            path = %path_str,
            combinations = file.combinations.len(),
            loads = file.loads.len(),
            "loaded combination file"
        );
        Ok(file)
    }

    pub fn from_json(path: &str, text: &str) -> ComboResult<Self> {
        serde_json::from_str(text).map_err(|e| ComboError::config(path, e.to_string()))
    }

    /// Parse the listed combinations, followed by the presets of `method`
    pub fn combinations(&self, method: Option<DesignMethod>) -> ComboResult<Vec<NamedCombination>> {
        let mut combos = self
            .combinations
            .iter()
            .map(|entry| NamedCombination::new(&entry.name, &entry.expr))
            .collect::<ComboResult<Vec<_>>>()?;

        if let Some(method) = method.or(self.method) {
            combos.extend(method.combinations()?);
        }
        Ok(combos)
    }
}

/// Parse a `NAME=VALUE[,VALUE...]` load argument
pub fn parse_load_arg(arg: &str) -> Result<(String, LoadValue), String> {
    let (name, values) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {:?}", arg))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing load name in {:?}", arg));
    }

    let numbers = values
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| format!("{:?} is not a number in {:?}", v.trim(), arg))
        })
        .collect::<Result<Vec<f64>, String>>()?;

    let value = match numbers.as_slice() {
        [single] if !values.contains(',') => LoadValue::from(*single),
        _ => LoadValue::from(numbers),
    };
    Ok((name.to_string(), value))
}

/// Values for every identifier of `combo`.
///
/// An ASCE 7 load code with no value reads as 0.0; any other identifier must
/// be supplied.
pub fn values_for(
    combo: &NamedCombination,
    loads: &HashMap<String, LoadValue>,
) -> ComboResult<HashMap<String, LoadValue>> {
    combo
        .combination
        .identifiers()
        .iter()
        .map(|id| match loads.get(id) {
            Some(value) => Ok((id.clone(), value.clone())),
            None if LoadType::from_code(id).is_some() => Ok((id.clone(), LoadValue::from(0.0))),
            None => Err(ComboError::binding(
                id,
                format!("no value given for load case in combination {}", combo.name),
            )),
        })
        .collect()
}
