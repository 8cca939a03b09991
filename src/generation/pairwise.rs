//! All-pairs covering-array construction and variation generation.
//!
//! The router produces one parameter assignment per test-case variation.
//! A greedy covering array guarantees every pairwise value combination
//! across a case's axes appears in at least one assignment while keeping
//! the total near-linear in axis count; bounded random padding then raises
//! the set to the requested minimum.

use std::collections::{BTreeMap, BTreeSet};

use rand::RngExt;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::axes::{dominant_axes, AxisConfig, AxisTable};

/// One parameter variation: a full axis assignment and its dominant axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variation {
    pub parameters: BTreeMap<String, String>,
    /// The 2-3 axes this variation exercises.
    pub dominant_axes: Vec<String>,
}

/// Uncovered value pair: (axis index, value index, axis index, value index),
/// first axis index strictly smaller.
type Pair = (usize, usize, usize, usize);

/// Generates at least `min_count` variations for `case`.
///
/// The covering-array rows come first, in construction order; random padding
/// rows follow. Padding rejects exact duplicates until the attempt cap
/// (64 per missing row) is hit, then derives near-duplicates from existing
/// rows so a degenerate axis domain cannot loop forever.
pub fn generate_variations(
    config: &AxisConfig,
    case: &str,
    min_count: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<Variation> {
    let table = config.table_for(case);

    let mut assignments = covering_array(table);
    debug!(
        case,
        pairwise_rows = assignments.len(),
        min_count,
        "Built pairwise covering array"
    );

    pad_to_minimum(table, &mut assignments, min_count, rng);

    assignments
        .into_iter()
        .map(|values| {
            let parameters = to_parameters(table, &values);
            let dominant_axes = dominant_axes(table, &parameters);
            Variation {
                parameters,
                dominant_axes,
            }
        })
        .collect()
}

/// Greedy all-pairs covering array over the table's axes, as value indexes.
fn covering_array(table: &AxisTable) -> Vec<Vec<usize>> {
    let axis_count = table.axes.len();
    if axis_count == 0 {
        return Vec::new();
    }
    if axis_count == 1 {
        return (0..table.axes[0].values.len()).map(|v| vec![v]).collect();
    }

    let mut uncovered: BTreeSet<Pair> = BTreeSet::new();
    for i in 0..axis_count {
        for j in (i + 1)..axis_count {
            for vi in 0..table.axes[i].values.len() {
                for vj in 0..table.axes[j].values.len() {
                    uncovered.insert((i, vi, j, vj));
                }
            }
        }
    }

    let mut rows: Vec<Vec<usize>> = Vec::new();
    while let Some(&(seed_i, seed_vi, seed_j, seed_vj)) = uncovered.iter().next() {
        // Seed the row with one uncovered pair so every row makes progress,
        // then fill the remaining axes greedily.
        let mut row: Vec<Option<usize>> = vec![None; axis_count];
        row[seed_i] = Some(seed_vi);
        row[seed_j] = Some(seed_vj);

        for axis in 0..axis_count {
            if row[axis].is_some() {
                continue;
            }
            let mut best_value = 0;
            let mut best_gain = 0;
            for value in 0..table.axes[axis].values.len() {
                let gain = newly_covered(&row, axis, value, &uncovered);
                if gain > best_gain {
                    best_gain = gain;
                    best_value = value;
                }
            }
            row[axis] = Some(best_value);
        }

        let complete: Vec<usize> = row.into_iter().map(|v| v.unwrap_or(0)).collect();
        remove_covered(&complete, &mut uncovered);
        rows.push(complete);
    }

    rows
}

/// Pairs a candidate value for `axis` would newly cover against the already
/// fixed positions of `row`.
fn newly_covered(
    row: &[Option<usize>],
    axis: usize,
    value: usize,
    uncovered: &BTreeSet<Pair>,
) -> usize {
    row.iter()
        .enumerate()
        .filter_map(|(other, fixed)| fixed.map(|v| (other, v)))
        .filter(|&(other, fixed_value)| {
            let pair = if other < axis {
                (other, fixed_value, axis, value)
            } else {
                (axis, value, other, fixed_value)
            };
            uncovered.contains(&pair)
        })
        .count()
}

fn remove_covered(row: &[usize], uncovered: &mut BTreeSet<Pair>) {
    for i in 0..row.len() {
        for j in (i + 1)..row.len() {
            uncovered.remove(&(i, row[i], j, row[j]));
        }
    }
}

/// Attempts per missing row before the duplicate check is relaxed.
const PADDING_ATTEMPTS_PER_ROW: usize = 64;

/// Pads `rows` with random assignments up to `min_count`.
fn pad_to_minimum(
    table: &AxisTable,
    rows: &mut Vec<Vec<usize>>,
    min_count: usize,
    rng: &mut ChaCha8Rng,
) {
    if rows.len() >= min_count || table.axes.is_empty() {
        return;
    }

    let deficit = min_count - rows.len();
    let mut attempts = 0;
    let max_attempts = PADDING_ATTEMPTS_PER_ROW * deficit;

    while rows.len() < min_count && attempts < max_attempts {
        attempts += 1;
        let candidate: Vec<usize> = table
            .axes
            .iter()
            .map(|axis| rng.random_range(0..axis.values.len()))
            .collect();
        if !rows.contains(&candidate) {
            rows.push(candidate);
        }
    }

    // Degenerate domains exhaust the attempt cap; derive near-duplicates
    // from existing rows instead of looping on rejection.
    let mut source = 0;
    while rows.len() < min_count {
        let mut derived = rows[source % rows.len()].clone();
        let axis = source % table.axes.len();
        let domain = table.axes[axis].values.len();
        derived[axis] = (derived[axis] + 1) % domain;
        rows.push(derived);
        source += 1;
    }
}

fn to_parameters(table: &AxisTable, values: &[usize]) -> BTreeMap<String, String> {
    table
        .axes
        .iter()
        .zip(values)
        .map(|(axis, &v)| (axis.name.clone(), axis.values[v].clone()))
        .collect()
}
