//! Bounded side-by-side comparison of two result sets.
//!
//! The selection is an explicit capacity-2 FIFO queue scoped to one
//! comparison session; it is never persisted.

use crate::engine::Harness;
use crate::error::HarnessError;
use crate::model::{Pair, PairState, Verdict};
use std::collections::{BTreeSet, VecDeque};

pub const CAPACITY: usize = 2;

#[derive(Debug, Default)]
pub struct ComparisonSelector {
    selected: VecDeque<Pair>,
}

impl ComparisonSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select or deselect a pair. Selecting past capacity evicts the oldest
    /// entry and returns it so the caller can reflect the change; selecting
    /// an already-selected pair and deselecting an absent one are no-ops.
    pub fn toggle(&mut self, pair: &Pair, selected: bool) -> Option<Pair> {
        if selected {
            if self.selected.contains(pair) {
                return None;
            }
            self.selected.push_back(pair.clone());
            if self.selected.len() > CAPACITY {
                return self.selected.pop_front();
            }
            None
        } else {
            if let Some(pos) = self.selected.iter().position(|p| p == pair) {
                self.selected.remove(pos);
            }
            None
        }
    }

    pub fn selected(&self) -> Vec<Pair> {
        self.selected.iter().cloned().collect()
    }

    /// Build the side-by-side view. Requires exactly two selected pairs,
    /// each at least generated. Rows cover the union of recorded indices,
    /// matched by index; a side missing an index is absent, not an error.
    pub fn compare(&self, harness: &Harness) -> Result<ComparisonView, HarnessError> {
        if self.selected.len() != CAPACITY {
            return Err(HarnessError::IncompleteSelection {
                selected: self.selected.len(),
            });
        }
        let left = self.selected[0].clone();
        let right = self.selected[1].clone();

        let mut ready = 0usize;
        for pair in [&left, &right] {
            if harness.catalog.get(pair.prompt_set_id)?.is_none() {
                return Err(HarnessError::PairNotFound { pair: pair.clone() });
            }
            if harness.pair_state(pair)? != PairState::NotGenerated {
                ready += 1;
            }
        }
        if ready != CAPACITY {
            return Err(HarnessError::IncompleteSelection { selected: ready });
        }

        let left_sides = collect_sides(harness, &left)?;
        let right_sides = collect_sides(harness, &right)?;

        let mut indices = BTreeSet::new();
        indices.extend(left_sides.iter().map(|(i, _)| *i));
        indices.extend(right_sides.iter().map(|(i, _)| *i));

        let mut rows = Vec::new();
        for idx in indices {
            // Prompt text from the left pair's set, falling back to the
            // right's when the index exists only there.
            let prompt_text = match harness.catalog.prompt_text(left.prompt_set_id, idx)? {
                Some(t) => Some(t),
                None => harness.catalog.prompt_text(right.prompt_set_id, idx)?,
            };
            rows.push(ComparisonRow {
                prompt_index: idx,
                prompt_text,
                left: find_side(&left_sides, idx),
                right: find_side(&right_sides, idx),
            });
        }

        Ok(ComparisonView { left, right, rows })
    }
}

#[derive(Debug, Clone)]
pub struct ComparisonView {
    pub left: Pair,
    pub right: Pair,
    pub rows: Vec<ComparisonRow>,
}

#[derive(Debug, Clone)]
pub struct ComparisonRow {
    pub prompt_index: u32,
    pub prompt_text: Option<String>,
    pub left: Option<ComparisonSide>,
    pub right: Option<ComparisonSide>,
}

#[derive(Debug, Clone)]
pub struct ComparisonSide {
    pub text: Option<String>,
    pub error: Option<String>,
    pub latency_seconds: Option<f64>,
    pub verdict: Option<Verdict>,
}

fn collect_sides(
    harness: &Harness,
    pair: &Pair,
) -> Result<Vec<(u32, ComparisonSide)>, HarnessError> {
    let evals = harness.store.evals(pair)?;
    let verdict_for = |idx: u32| {
        evals
            .iter()
            .find(|e| e.prompt_index == idx)
            .map(|e| e.verdict)
    };
    let mut out = Vec::new();
    for r in harness.store.responses(pair)? {
        let side = ComparisonSide {
            verdict: verdict_for(r.prompt_index),
            text: r.text,
            error: r.error,
            latency_seconds: r.latency_seconds,
        };
        out.push((r.prompt_index, side));
    }
    Ok(out)
}

fn find_side(sides: &[(u32, ComparisonSide)], idx: u32) -> Option<ComparisonSide> {
    sides
        .iter()
        .find(|(i, _)| *i == idx)
        .map(|(_, s)| s.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(n: i64) -> Pair {
        Pair::new(n, format!("model-{}", n))
    }

    #[test]
    fn selection_evicts_oldest_fifo() {
        let mut sel = ComparisonSelector::new();
        assert_eq!(sel.toggle(&pair(1), true), None);
        assert_eq!(sel.toggle(&pair(2), true), None);
        let evicted = sel.toggle(&pair(3), true);
        assert_eq!(evicted, Some(pair(1)));
        assert_eq!(sel.selected(), vec![pair(2), pair(3)]);
    }

    #[test]
    fn selection_never_exceeds_capacity() {
        let mut sel = ComparisonSelector::new();
        for n in 0..10 {
            sel.toggle(&pair(n), true);
            assert!(sel.selected().len() <= CAPACITY);
        }
    }

    #[test]
    fn reselecting_is_a_noop() {
        let mut sel = ComparisonSelector::new();
        sel.toggle(&pair(1), true);
        assert_eq!(sel.toggle(&pair(1), true), None);
        assert_eq!(sel.selected(), vec![pair(1)]);
    }

    #[test]
    fn deselecting_absent_pair_is_a_noop() {
        let mut sel = ComparisonSelector::new();
        sel.toggle(&pair(1), true);
        sel.toggle(&pair(2), false);
        assert_eq!(sel.selected(), vec![pair(1)]);
    }

    #[test]
    fn deselect_then_select_reorders() {
        let mut sel = ComparisonSelector::new();
        sel.toggle(&pair(1), true);
        sel.toggle(&pair(2), true);
        sel.toggle(&pair(1), false);
        sel.toggle(&pair(3), true);
        assert_eq!(sel.selected(), vec![pair(2), pair(3)]);
    }
}
