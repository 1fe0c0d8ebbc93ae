//! Row-by-row Cartesian expansion of group blocks into a coefficient matrix.
//!
//! Every scenario picks exactly one row from each group. Scenarios are
//! enumerated as nested loops over the groups in chain order, the last group
//! varying fastest.

use std::collections::HashMap;

use ndarray::Array2;

use super::algebra::{CoefficientBlock, Group};
use crate::errors::{ComboError, ComboResult};

/// Most scenario rows a single combination may expand into
pub const MAX_SCENARIOS: usize = 1 << 20;

/// Number of scenarios for the given group row counts.
///
/// Fails with [`ComboError::TooManyScenarios`] when the product overflows or
/// passes [`MAX_SCENARIOS`].
pub fn scenario_total(row_counts: &[usize]) -> ComboResult<usize> {
    row_counts
        .iter()
        .try_fold(1usize, |total, &rows| total.checked_mul(rows))
        .filter(|&total| total <= MAX_SCENARIOS)
        .ok_or_else(|| ComboError::TooManyScenarios {
            row_counts: row_counts.to_vec(),
            limit: MAX_SCENARIOS,
        })
}

/// Row chosen from each group, for every scenario.
///
/// For row counts `[r0, r1, ..., rk]` there are `r0 * r1 * ... * rk` scenarios.
///
/// ```
/// use combo_core::loads::matrix::scenario_indices;
///
/// assert_eq!(
///     scenario_indices(&[2, 3]).unwrap(),
///     vec![vec![0, 0], vec![0, 1], vec![0, 2], vec![1, 0], vec![1, 1], vec![1, 2]]
/// );
/// ```
pub fn scenario_indices(row_counts: &[usize]) -> ComboResult<Vec<Vec<usize>>> {
    let total = scenario_total(row_counts)?;

    // Stride of group i: how many consecutive scenarios share its row
    let mut strides = vec![1usize; row_counts.len()];
    for i in (0..row_counts.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * row_counts[i + 1];
    }

    Ok((0..total)
        .map(|scenario| {
            row_counts
                .iter()
                .zip(&strides)
                .map(|(&rows, &stride)| (scenario / stride) % rows)
                .collect()
        })
        .collect())
}

/// Combine blocks by row-by-row concatenation.
///
/// ```text
/// arr0:        arr1:
/// [[1,2,3],    [[1,2],
///  [4,5,6],     [3,4]]
///  [7,8,9]]
///
/// becomes
///
/// [[1,2,3,1,2],
///  [1,2,3,3,4],
///  [4,5,6,1,2],
///  [4,5,6,3,4],
///  [7,8,9,1,2],
///  [7,8,9,3,4]]
/// ```
///
/// Columns of all blocks sit side by side. An empty block list yields a
/// single scenario with no columns.
pub fn row_by_row_concatenation(blocks: &[Array2<f64>]) -> ComboResult<Array2<f64>> {
    let row_counts: Vec<usize> = blocks.iter().map(|b| b.nrows()).collect();
    let width: usize = blocks.iter().map(|b| b.ncols()).sum();
    let scenarios = scenario_indices(&row_counts)?;

    let mut out = Array2::zeros((scenarios.len(), width));
    for (s, choice) in scenarios.iter().enumerate() {
        let mut offset = 0;
        for (block, &row) in blocks.iter().zip(choice) {
            for (j, &value) in block.row(row).iter().enumerate() {
                out[[s, offset + j]] = value;
            }
            offset += block.ncols();
        }
    }
    Ok(out)
}

/// Compile a chain of groups into the final coefficient matrix.
///
/// Column `j` holds the coefficients of `identifiers[j]`. A load case that
/// occurs more than once contributes the sum of its coefficients to its column.
pub fn compile(groups: &[Group], identifiers: &[String]) -> ComboResult<Array2<f64>> {
    let columns: HashMap<&str, usize> = identifiers
        .iter()
        .enumerate()
        .map(|(j, id)| (id.as_str(), j))
        .collect();

    let blocks: Vec<Array2<f64>> = groups.iter().map(CoefficientBlock::block).collect();
    let row_counts: Vec<usize> = blocks.iter().map(|b| b.nrows()).collect();
    let scenarios = scenario_indices(&row_counts)?;

    let mut matrix = Array2::zeros((scenarios.len(), identifiers.len()));
    for (s, choice) in scenarios.iter().enumerate() {
        for ((group, block), &row) in groups.iter().zip(&blocks).zip(choice) {
            for (term, &coefficient) in group.terms().iter().zip(block.row(row).iter()) {
                // Identifiers are derived from these same groups, so every term has a column
                if let Some(&j) = columns.get(term.load_case.as_str()) {
                    matrix[[s, j]] += coefficient;
                }
            }
        }
    }

    tracing::trace!(row_counts = ?row_counts, shape = ?matrix.dim(), "expanded combination matrix");
    Ok(matrix)
}
