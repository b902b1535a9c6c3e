use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A named, immutable collection of prompts. `prompt_count` fixes the
/// expected index range `[0, prompt_count)` for every pair built on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSet {
    pub id: i64,
    pub created_at: String,
    pub source_file: String,
    pub prompt_func: String,
    pub prompt_count: u32,
}

/// A (prompt set, model) combination under test. Derived key, not a stored
/// entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    pub prompt_set_id: i64,
    pub model: String,
}

impl Pair {
    pub fn new(prompt_set_id: i64, model: impl Into<String>) -> Self {
        Self {
            prompt_set_id,
            model: model.into(),
        }
    }
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.prompt_set_id, self.model)
    }
}

/// One generation outcome per prompt index. Error rows count toward pair
/// completeness but are excluded from evaluation and latency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptResponse {
    pub prompt_index: u32,
    pub text: Option<String>,
    pub error: Option<String>,
    pub latency_seconds: Option<f64>,
}

impl PromptResponse {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Two independent boolean criteria recorded per judged response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub ok: bool,
    pub other: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub prompt_index: u32,
    pub judge_model: String,
    pub verdict: Verdict,
}

/// Derived lifecycle stage of a pair. Never stored; always recomputed from
/// row counts so it cannot drift from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairState {
    NotGenerated,
    Generated,
    Evaluated,
}

/// Stored row counts for one pair, the sole input to state derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairCounts {
    /// All response rows, error markers included.
    pub responses: u32,
    /// Response rows carrying an error marker.
    pub errors: u32,
    /// Evaluation rows.
    pub evals: u32,
}

impl PairState {
    /// Pure derivation from stored counts vs. the set's prompt count.
    ///
    /// A pair is Generated only once every index is accounted for (success
    /// or error); a partially generated pair reads NotGenerated and a re-run
    /// of generate fills the gaps. Evaluated means every successful index
    /// has a verdict, which holds vacuously when no index succeeded.
    pub fn derive(counts: PairCounts, prompt_count: u32) -> Self {
        if counts.responses == 0 || counts.responses < prompt_count {
            return PairState::NotGenerated;
        }
        let eligible = counts.responses.saturating_sub(counts.errors);
        if counts.evals >= eligible {
            PairState::Evaluated
        } else {
            PairState::Generated
        }
    }
}

impl std::fmt::Display for PairState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PairState::NotGenerated => "not_generated",
            PairState::Generated => "generated",
            PairState::Evaluated => "evaluated",
        };
        f.write_str(s)
    }
}

/// Partial-failure report for one generation run. `failed > 0` is data, not
/// an error condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generated: u32,
    pub failed: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub evaluated: u32,
    /// Indices whose judge calls exhausted retries; nothing persisted for
    /// them, safe to re-run evaluate.
    pub skipped: u32,
    pub elapsed: Duration,
}

/// Latency over successful responses only. Absent entirely when no
/// successful response carries a latency (never a divide-by-zero).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalCounts {
    pub ok_true: u32,
    pub ok_false: u32,
    pub other_true: u32,
    pub other_false: u32,
}

impl EvalCounts {
    pub fn total(&self) -> u32 {
        self.ok_true + self.ok_false
    }

    pub fn ok_ratio(&self) -> Option<f64> {
        ratio(self.ok_true, self.ok_true + self.ok_false)
    }

    pub fn other_ratio(&self) -> Option<f64> {
        ratio(self.other_true, self.other_true + self.other_false)
    }
}

fn ratio(num: u32, denom: u32) -> Option<f64> {
    if denom == 0 {
        None
    } else {
        Some(num as f64 / denom as f64)
    }
}
