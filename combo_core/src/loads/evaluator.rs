//! Numeric evaluation of a compiled combination.
//!
//! `result[s] = sum_n matrix[s][n] * value[n]`, broadcast over array-valued
//! loads with NumPy rules. The scenario axis is always axis 0 of the result.
//!
//! Each scenario row is held as a [`LinearForm`] and summed left to right over
//! the columns, so the scalar fast path and the array path round identically.

use std::collections::HashMap;

use ndarray::{aview0, Array1, Array2, ArrayD, ArrayViewD, ArrayViewMutD, Axis, IxDyn};

use crate::errors::{ComboError, ComboResult};

/// A load value: one number, or an array of them.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadValue {
    Scalar(f64),
    Array(ArrayD<f64>),
}

impl LoadValue {
    /// Shape of the value (empty for scalars)
    pub fn shape(&self) -> &[usize] {
        match self {
            LoadValue::Scalar(_) => &[],
            LoadValue::Array(array) => array.shape(),
        }
    }

    fn view(&self) -> ArrayViewD<'_, f64> {
        match self {
            LoadValue::Scalar(value) => aview0(value).into_dyn(),
            LoadValue::Array(array) => array.view(),
        }
    }
}

impl From<f64> for LoadValue {
    fn from(value: f64) -> Self {
        LoadValue::Scalar(value)
    }
}

impl From<Vec<f64>> for LoadValue {
    fn from(values: Vec<f64>) -> Self {
        LoadValue::Array(Array1::from(values).into_dyn())
    }
}

impl From<Array1<f64>> for LoadValue {
    fn from(values: Array1<f64>) -> Self {
        LoadValue::Array(values.into_dyn())
    }
}

impl From<Array2<f64>> for LoadValue {
    fn from(values: Array2<f64>) -> Self {
        LoadValue::Array(values.into_dyn())
    }
}

impl From<ArrayD<f64>> for LoadValue {
    fn from(values: ArrayD<f64>) -> Self {
        LoadValue::Array(values)
    }
}

/// Common shape of several arrays under NumPy broadcasting rules, if any.
///
/// ```
/// use combo_core::loads::evaluator::broadcast_shape;
///
/// assert_eq!(broadcast_shape(&[&[], &[3], &[2, 1]]), Some(vec![2, 3]));
/// assert_eq!(broadcast_shape(&[&[3], &[4]]), None);
/// ```
pub fn broadcast_shape(shapes: &[&[usize]]) -> Option<Vec<usize>> {
    let ndim = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut out = vec![1usize; ndim];

    for shape in shapes {
        let offset = ndim - shape.len();
        for (i, &dim) in shape.iter().enumerate() {
            let slot = &mut out[offset + i];
            if *slot == 1 {
                *slot = dim;
            } else if dim != 1 && dim != *slot {
                return None;
            }
        }
    }

    Some(out)
}

/// One scenario row: a linear form over the load case values.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearForm {
    coefficients: Vec<f64>,
}

impl LinearForm {
    pub fn new(coefficients: Vec<f64>) -> Self {
        LinearForm { coefficients }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Evaluate on scalar values
    pub fn apply(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(values)
            .fold(0.0, |acc, (c, v)| acc + c * v)
    }

    /// Accumulate into `out`, broadcasting each value to its shape
    fn accumulate(&self, mut out: ArrayViewMutD<'_, f64>, values: &[ArrayViewD<'_, f64>]) {
        for (&c, value) in self.coefficients.iter().zip(values) {
            out.zip_mut_with(value, |acc, &v| *acc = *acc + c * v);
        }
    }
}

/// Evaluator compiled from a coefficient matrix.
///
/// Immutable once built, so it can be shared and called from many threads.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinationEvaluator {
    identifiers: Vec<String>,
    matrix: Array2<f64>,
    rows: Vec<LinearForm>,
}

impl CombinationEvaluator {
    /// Build an evaluator whose matrix columns follow `identifiers`
    pub fn new(identifiers: Vec<String>, matrix: Array2<f64>) -> Self {
        let rows = matrix
            .rows()
            .into_iter()
            .map(|row| LinearForm::new(row.to_vec()))
            .collect();

        CombinationEvaluator {
            identifiers,
            matrix,
            rows,
        }
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn rows(&self) -> &[LinearForm] {
        &self.rows
    }

    pub fn scenario_count(&self) -> usize {
        self.rows.len()
    }

    /// Evaluate with values looked up by identifier; extra entries are ignored.
    ///
    /// # Example
    /// ```
    /// use std::collections::HashMap;
    /// use combo_core::loads::{Combination, LoadValue};
    ///
    /// let combo = Combination::parse("1.2*D & (L | 0.5*W)").unwrap();
    /// let values: HashMap<String, LoadValue> = [
    ///     ("D".to_string(), LoadValue::from(10.0)),
    ///     ("L".to_string(), LoadValue::from(vec![20.0, 40.0])),
    ///     ("W".to_string(), LoadValue::from(30.0)),
    /// ]
    /// .into_iter()
    /// .collect();
    ///
    /// let result = combo.evaluate(&values).unwrap();
    /// assert_eq!(result.shape(), &[2, 2]);
    /// assert_eq!(result[[0, 1]], 52.0); // 1.2*10 + 40
    /// assert_eq!(result[[1, 0]], 27.0); // 1.2*10 + 0.5*30
    /// ```
    pub fn evaluate(&self, values: &HashMap<String, LoadValue>) -> ComboResult<ArrayD<f64>> {
        let ordered = self
            .identifiers
            .iter()
            .map(|id| {
                values
                    .get(id)
                    .ok_or_else(|| ComboError::binding(id, "no value supplied for load case"))
            })
            .collect::<ComboResult<Vec<&LoadValue>>>()?;
        self.evaluate_refs(&ordered)
    }

    /// Evaluate with exactly one value per identifier, in identifier order
    pub fn evaluate_ordered(&self, values: &[LoadValue]) -> ComboResult<ArrayD<f64>> {
        self.check_arity(values.len())?;
        let refs: Vec<&LoadValue> = values.iter().collect();
        self.evaluate_refs(&refs)
    }

    /// Scalar fast path: one number per identifier, in identifier order
    pub fn evaluate_scalars(&self, values: &[f64]) -> ComboResult<Array1<f64>> {
        self.check_arity(values.len())?;
        Ok(self.rows.iter().map(|row| row.apply(values)).collect())
    }

    pub(crate) fn evaluate_refs(&self, values: &[&LoadValue]) -> ComboResult<ArrayD<f64>> {
        self.check_arity(values.len())?;

        if values.iter().all(|v| matches!(v, LoadValue::Scalar(_))) {
            let scalars: Vec<f64> = values
                .iter()
                .map(|v| match v {
                    LoadValue::Scalar(x) => *x,
                    LoadValue::Array(_) => 0.0,
                })
                .collect();
            return Ok(self.rows.iter().map(|row| row.apply(&scalars)).collect::<Array1<f64>>().into_dyn());
        }

        let shapes: Vec<&[usize]> = values.iter().map(|v| v.shape()).collect();
        let broadcast = broadcast_shape(&shapes).ok_or_else(|| ComboError::IncompatibleShapes {
            shapes: shapes.iter().map(|s| s.to_vec()).collect(),
        })?;

        let views: Vec<ArrayViewD<'_, f64>> = values.iter().map(|v| v.view()).collect();

        let mut full_shape = Vec::with_capacity(broadcast.len() + 1);
        full_shape.push(self.rows.len());
        full_shape.extend_from_slice(&broadcast);

        let mut out = ArrayD::<f64>::zeros(IxDyn(&full_shape));
        for (s, row) in self.rows.iter().enumerate() {
            row.accumulate(out.index_axis_mut(Axis(0), s), &views);
        }

        tracing::trace!(shape = ?out.shape(), "evaluated combination over arrays");
        Ok(out)
    }

    fn check_arity(&self, supplied: usize) -> ComboResult<()> {
        if supplied != self.identifiers.len() {
            return Err(ComboError::binding(
                self.identifiers.join(", "),
                format!("expected {} load values, got {}", self.identifiers.len(), supplied),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn evaluator() -> CombinationEvaluator {
        // 1.2*D & (L | 0.5*W)
        CombinationEvaluator::new(
            vec!["D".into(), "L".into(), "W".into()],
            array![[1.2, 1.0, 0.0], [1.2, 0.0, 0.5]],
        )
    }

    #[test]
    fn test_scalar_evaluation() {
        let result = evaluator().evaluate_scalars(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(result, array![32.0, 27.0]);
    }

    #[test]
    fn test_all_scalar_values_give_one_dimension() {
        let values = [LoadValue::from(10.0), LoadValue::from(20.0), LoadValue::from(30.0)];
        let result = evaluator().evaluate_ordered(&values).unwrap();
        assert_eq!(result.shape(), &[2]);
    }

    #[test]
    fn test_array_and_scalar_paths_agree() {
        let e = evaluator();
        let scalar = e.evaluate_scalars(&[1.1, 2.3, 3.7]).unwrap();
        let arrays = e
            .evaluate_ordered(&[vec![1.1].into(), vec![2.3].into(), vec![3.7].into()])
            .unwrap();
        assert_eq!(arrays.shape(), &[2, 1]);
        assert_eq!(arrays[[0, 0]], scalar[0]);
        assert_eq!(arrays[[1, 0]], scalar[1]);
    }

    #[test]
    fn test_broadcast_two_dimensions() {
        let d = LoadValue::from(array![[1.0], [2.0]]); // (2, 1)
        let l = LoadValue::from(vec![10.0, 20.0, 30.0]); // (3,)
        let w = LoadValue::from(0.0);
        let result = evaluator().evaluate_ordered(&[d, l, w]).unwrap();
        assert_eq!(result.shape(), &[2, 2, 3]);
        assert_eq!(result[[0, 1, 2]], 1.2 * 2.0 + 30.0);
        assert_eq!(result[[1, 0, 0]], 1.2 * 1.0);
    }

    #[test]
    fn test_incompatible_shapes() {
        let err = evaluator()
            .evaluate_ordered(&[vec![1.0, 2.0].into(), vec![1.0, 2.0, 3.0].into(), 0.0.into()])
            .unwrap_err();
        assert_eq!(err.error_code(), "INCOMPATIBLE_SHAPES");
    }

    #[test]
    fn test_missing_value_is_binding_error() {
        let values: HashMap<String, LoadValue> =
            [("D".to_string(), 1.0.into()), ("L".to_string(), 1.0.into())].into_iter().collect();
        let err = evaluator().evaluate(&values).unwrap_err();
        assert_eq!(err, ComboError::binding("W", "no value supplied for load case"));
    }

    #[test]
    fn test_extra_values_ignored() {
        let values: HashMap<String, LoadValue> = [("D", 1.0), ("L", 2.0), ("W", 4.0), ("E", 100.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), LoadValue::from(v)))
            .collect();
        let result = evaluator().evaluate(&values).unwrap();
        assert_eq!(result, array![3.2, 3.2].into_dyn());
    }

    #[test]
    fn test_wrong_arity() {
        assert!(evaluator().evaluate_scalars(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_broadcast_shape_rules() {
        assert_eq!(broadcast_shape(&[]), Some(vec![]));
        assert_eq!(broadcast_shape(&[&[4, 1], &[3]]), Some(vec![4, 3]));
        assert_eq!(broadcast_shape(&[&[0], &[1]]), Some(vec![0]));
        assert_eq!(broadcast_shape(&[&[2, 3], &[3, 3]]), None);
    }
}
