//! Derived statistics over stored responses and verdicts.

use crate::engine::Harness;
use crate::error::HarnessError;
use crate::model::{EvalCounts, LatencyStats, Pair, PairState};
use serde::Serialize;

/// Everything the status surface shows for one pair.
#[derive(Debug, Clone, Serialize)]
pub struct PairOverview {
    pub pair: Pair,
    pub state: PairState,
    pub latency: Option<LatencyStats>,
    pub evals: EvalCounts,
}

/// One overview per pair with recorded responses, freshly derived; nothing
/// here is cached or stored.
pub fn pair_overviews(harness: &Harness) -> Result<Vec<PairOverview>, HarnessError> {
    let mut out = Vec::new();
    for pair in harness.store.list_pairs()? {
        let state = harness.pair_state(&pair)?;
        let (latency, evals) = harness.stats(&pair)?;
        out.push(PairOverview {
            pair,
            state,
            latency,
            evals,
        });
    }
    Ok(out)
}
