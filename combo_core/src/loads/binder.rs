//! Binding a combination to a named parameter list.
//!
//! A [`LoadCombinationFn`] stands in for a user-declared function whose only
//! job is to name its load parameters. Calling it binds the actual arguments
//! (positional and keyword) to those names and runs the combination's
//! evaluator; there is no body to execute.
//!
//! ```
//! use combo_core::loads::{Arguments, Combination, Signature};
//!
//! let combo = Combination::parse("1.6*D & 1.2*L & 0.5*(S | Lr | W)").unwrap();
//! let f = combo
//!     .function(Signature::new("combo", ["D", "L", "S", "Lr", "W"]).unwrap())
//!     .unwrap();
//!
//! let result = f.call_positional([1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
//! let expected = [5.5, 6.0, 6.5];
//! assert!(result.iter().zip(expected).all(|(a, b)| (a - b).abs() < 1e-12));
//!
//! let by_name = Arguments::new()
//!     .kwarg("W", 5.0)
//!     .kwarg("Lr", 4.0)
//!     .kwarg("S", 3.0)
//!     .kwarg("L", 2.0)
//!     .kwarg("D", 1.0);
//! assert_eq!(f.call(&by_name).unwrap(), result);
//! ```

use std::collections::HashSet;
use std::fmt;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use super::algebra::Term;
use super::combination::Combination;
use super::evaluator::LoadValue;
use crate::errors::{ComboError, ComboResult};

/// How the declared parameter list relates to the call arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingMode {
    /// Free function: every declared parameter is bound from the call
    Function,
    /// Instance method: the leading receiver parameter is implicit
    Method,
    /// Class method: the leading class parameter is implicit
    ClassMethod,
    /// Static method: no implicit parameter
    StaticMethod,
}

impl BindingMode {
    pub const ALL: [BindingMode; 4] = [
        BindingMode::Function,
        BindingMode::Method,
        BindingMode::ClassMethod,
        BindingMode::StaticMethod,
    ];

    /// Whether the first declared parameter is supplied implicitly
    pub fn strips_receiver(&self) -> bool {
        matches!(self, BindingMode::Method | BindingMode::ClassMethod)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BindingMode::Function => "function",
            BindingMode::Method => "method",
            BindingMode::ClassMethod => "classmethod",
            BindingMode::StaticMethod => "staticmethod",
        }
    }
}

impl fmt::Display for BindingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Declared name and parameter names of a wrapped function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    name: String,
    params: Vec<String>,
}

impl Signature {
    /// Declare a signature. Parameter names must be distinct.
    pub fn new<I, S>(name: impl Into<String>, params: I) -> ComboResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let params: Vec<String> = params.into_iter().map(Into::into).collect();

        let mut seen = HashSet::new();
        for param in &params {
            if !seen.insert(param.as_str()) {
                return Err(ComboError::binding(param, "duplicate parameter name in signature"));
            }
        }

        Ok(Signature {
            name: name.into(),
            params,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(", "))
    }
}

/// Actual arguments of one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    positional: Vec<LoadValue>,
    keyword: Vec<(String, LoadValue)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a positional argument (builder pattern)
    pub fn arg(mut self, value: impl Into<LoadValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Add a keyword argument (builder pattern)
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<LoadValue>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }

    /// Arguments made only of positional values
    pub fn from_positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<LoadValue>,
    {
        Arguments {
            positional: values.into_iter().map(Into::into).collect(),
            keyword: Vec::new(),
        }
    }

    pub fn positional(&self) -> &[LoadValue] {
        &self.positional
    }

    pub fn keyword(&self) -> &[(String, LoadValue)] {
        &self.keyword
    }
}

/// A combination bound to a parameter list: the callable that replaces the
/// declared function.
#[derive(Debug, Clone)]
pub struct LoadCombinationFn {
    combination: Combination,
    signature: Signature,
    mode: BindingMode,
    /// Declared parameters with any implicit receiver removed
    parameters: Vec<String>,
    /// For each identifier, the index of its parameter
    columns: Vec<usize>,
}

impl LoadCombinationFn {
    /// Bind `combination` to `signature`.
    ///
    /// Fails when the mode needs a receiver and none is declared, or when a
    /// load case of the combination has no parameter of the same name.
    pub fn new(combination: Combination, signature: Signature, mode: BindingMode) -> ComboResult<Self> {
        let parameters: Vec<String> = if mode.strips_receiver() {
            match signature.params.split_first() {
                Some((_receiver, rest)) => rest.to_vec(),
                None => {
                    return Err(ComboError::binding(
                        &signature.name,
                        format!("a {} must declare a receiver parameter", mode),
                    ))
                }
            }
        } else {
            signature.params.clone()
        };

        let columns = combination
            .identifiers()
            .iter()
            .map(|id| {
                parameters.iter().position(|p| p == id).ok_or_else(|| {
                    ComboError::binding(
                        id,
                        format!("load case is not a parameter of {}", signature),
                    )
                })
            })
            .collect::<ComboResult<Vec<usize>>>()?;

        tracing::debug!(
            signature = %signature,
            mode = %mode,
            combination = %combination,
            "bound load combination"
        );

        Ok(LoadCombinationFn {
            combination,
            signature,
            mode,
            parameters,
            columns,
        })
    }

    /// Bind a bare term or group, wrapping it as a one-group combination first
    pub fn from_term(term: impl Into<Term>, signature: Signature, mode: BindingMode) -> ComboResult<Self> {
        Self::new(Combination::from_term(term), signature, mode)
    }

    pub fn combination(&self) -> &Combination {
        &self.combination
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn mode(&self) -> BindingMode {
        self.mode
    }

    /// Parameters bound from call arguments (receiver excluded)
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Evaluate the combination with the given arguments.
    ///
    /// Result shape is `[scenarios, ..broadcast]`, as for
    /// [`Combination::evaluate`].
    pub fn call(&self, args: &Arguments) -> ComboResult<ArrayD<f64>> {
        let slots = self.bind(args)?;

        let values = self
            .columns
            .iter()
            .zip(self.combination.identifiers())
            .map(|(&p, id)| {
                slots[p].ok_or_else(|| {
                    ComboError::binding(
                        id,
                        format!("missing required argument in call to {}", self.signature.name),
                    )
                })
            })
            .collect::<ComboResult<Vec<&LoadValue>>>()?;

        self.combination.evaluator()?.evaluate_refs(&values)
    }

    /// Evaluate with positional arguments only
    pub fn call_positional<I, V>(&self, values: I) -> ComboResult<ArrayD<f64>>
    where
        I: IntoIterator<Item = V>,
        V: Into<LoadValue>,
    {
        self.call(&Arguments::from_positional(values))
    }

    /// Match arguments to parameter slots
    fn bind<'a>(&self, args: &'a Arguments) -> ComboResult<Vec<Option<&'a LoadValue>>> {
        if args.positional.len() > self.parameters.len() {
            return Err(ComboError::binding(
                &self.signature.name,
                format!(
                    "takes {} positional arguments but {} were given",
                    self.parameters.len(),
                    args.positional.len()
                ),
            ));
        }

        let mut slots: Vec<Option<&LoadValue>> = vec![None; self.parameters.len()];
        for (slot, value) in slots.iter_mut().zip(&args.positional) {
            *slot = Some(value);
        }

        for (name, value) in &args.keyword {
            let index = self
                .parameters
                .iter()
                .position(|p| p == name)
                .ok_or_else(|| ComboError::binding(name, "unexpected keyword argument"))?;
            if slots[index].is_some() {
                return Err(ComboError::binding(name, "got multiple values for argument"));
            }
            slots[index] = Some(value);
        }

        Ok(slots)
    }
}

impl Combination {
    /// Bind this combination to a parameter list in the given mode
    pub fn bind(self, signature: Signature, mode: BindingMode) -> ComboResult<LoadCombinationFn> {
        LoadCombinationFn::new(self, signature, mode)
    }

    /// Bind as a free function
    pub fn function(self, signature: Signature) -> ComboResult<LoadCombinationFn> {
        self.bind(signature, BindingMode::Function)
    }

    /// Bind as an instance method; the first parameter is the receiver
    pub fn method(self, signature: Signature) -> ComboResult<LoadCombinationFn> {
        self.bind(signature, BindingMode::Method)
    }

    /// Bind as a class method; the first parameter is the class
    pub fn classmethod(self, signature: Signature) -> ComboResult<LoadCombinationFn> {
        self.bind(signature, BindingMode::ClassMethod)
    }

    /// Bind as a static method
    pub fn staticmethod(self, signature: Signature) -> ComboResult<LoadCombinationFn> {
        self.bind(signature, BindingMode::StaticMethod)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loads::algebra::factored;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn combo() -> Combination {
        Combination::parse("1.4*D & 1.2*L").unwrap()
    }

    fn max(result: &ArrayD<f64>) -> f64 {
        result.iter().cloned().fold(f64::MIN, f64::max)
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let err = Signature::new("m", ["D", "L", "D"]).unwrap_err();
        assert_eq!(err, ComboError::binding("D", "duplicate parameter name in signature"));
    }

    #[test]
    fn test_every_mode_gives_same_result() {
        let signatures = [
            (BindingMode::Function, vec!["D", "L"]),
            (BindingMode::Method, vec!["self", "D", "L"]),
            (BindingMode::ClassMethod, vec!["cls", "D", "L"]),
            (BindingMode::StaticMethod, vec!["D", "L"]),
        ];

        for (mode, params) in signatures {
            let f = combo().bind(Signature::new("m", params).unwrap(), mode).unwrap();
            let result = f.call_positional([1.0, 1.0]).unwrap();
            assert_relative_eq!(max(&result), 2.6, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_receiver_name_is_free() {
        let f = combo().method(Signature::new("m", ["first_param", "D", "L"]).unwrap()).unwrap();
        assert_eq!(f.parameters(), ["D", "L"]);
    }

    #[test]
    fn test_receiver_mode_needs_a_parameter() {
        let err = combo().classmethod(Signature::new("m", Vec::<String>::new()).unwrap()).unwrap_err();
        assert_eq!(err.error_code(), "BINDING_ERROR");
    }

    #[test]
    fn test_identifier_must_be_a_parameter() {
        // With the receiver stripped, "D" is no longer a parameter
        let err = combo().method(Signature::new("m", ["D", "L"]).unwrap()).unwrap_err();
        match err {
            ComboError::Binding { parameter, .. } => assert_eq!(parameter, "D"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_extra_parameters_ignored() {
        let f = combo()
            .function(Signature::new("m", ["label", "L", "D"]).unwrap())
            .unwrap();
        let args = Arguments::new().arg(0.0).kwarg("D", 1.0).kwarg("L", 2.0);
        assert_eq!(f.call(&args).unwrap(), array![1.4 + 2.4].into_dyn());
    }

    #[test]
    fn test_mixed_positional_and_keyword() {
        let f = combo().function(Signature::new("m", ["D", "L"]).unwrap()).unwrap();
        let args = Arguments::new().arg(1.0).kwarg("L", 1.0);
        assert_relative_eq!(max(&f.call(&args).unwrap()), 2.6, epsilon = 1e-12);
    }

    #[test]
    fn test_binding_errors() {
        let f = combo().function(Signature::new("m", ["D", "L", "note"]).unwrap()).unwrap();

        let too_many = f.call_positional([1.0, 1.0, 1.0, 1.0]).unwrap_err();
        assert!(too_many.to_string().contains("positional arguments"));

        let unknown = f.call(&Arguments::new().kwarg("W", 1.0)).unwrap_err();
        assert_eq!(unknown, ComboError::binding("W", "unexpected keyword argument"));

        let twice = f.call(&Arguments::new().arg(1.0).kwarg("D", 1.0)).unwrap_err();
        assert_eq!(twice, ComboError::binding("D", "got multiple values for argument"));

        // "note" may be omitted; "L" may not
        let missing = f.call(&Arguments::new().arg(1.0)).unwrap_err();
        match missing {
            ComboError::Binding { parameter, .. } => assert_eq!(parameter, "L"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_bare_term_is_wrapped() {
        let f = LoadCombinationFn::from_term(
            1.2 * factored("D") & 1.6 * factored("L"),
            Signature::new("f", ["D", "L"]).unwrap(),
            BindingMode::Function,
        )
        .unwrap();
        assert_eq!(f.call_positional([1.0, 1.0]).unwrap().shape(), &[1]);
    }

    #[test]
    fn test_array_arguments_broadcast() {
        let f = combo().staticmethod(Signature::new("m", ["D", "L"]).unwrap()).unwrap();
        let args = Arguments::new().arg(vec![1.0, 2.0, 3.0]).arg(1.0);
        let result = f.call(&args).unwrap();
        assert_eq!(result.shape(), &[1, 3]);
    }

    #[test]
    fn test_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&BindingMode::ClassMethod).unwrap(), "\"classmethod\"");
    }
}
