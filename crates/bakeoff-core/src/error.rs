//! Error taxonomy for the harness.
//!
//! Per-index provider failures are never surfaced here: the orchestrators
//! absorb them as recorded data (error markers, skipped counts). Only
//! structural misuse reaches the caller.

use crate::model::Pair;
use crate::providers::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Unknown prompt set id or unusable model id.
    #[error("invalid pair: {reason}")]
    InvalidPair { reason: String },

    /// No responses exist for the pair the caller referenced.
    #[error("pair not found: {pair}")]
    PairNotFound { pair: Pair },

    /// A generation or evaluation run is already active for this pair.
    #[error("run already in progress for {pair}")]
    AlreadyInProgress { pair: Pair },

    /// evaluate() attempted before generate() completed the pair.
    #[error("pair {pair} is not generated yet")]
    NotGenerated { pair: Pair },

    /// compare() requires exactly two selected pairs, each at least generated.
    #[error("comparison needs exactly 2 generated pairs, have {selected}")]
    IncompleteSelection { selected: usize },

    /// Structural provider failure (e.g. judge misconfiguration), not a
    /// per-index call outcome.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl HarnessError {
    /// Exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidPair { .. } | Self::PairNotFound { .. } => 2,
            Self::AlreadyInProgress { .. }
            | Self::NotGenerated { .. }
            | Self::IncompleteSelection { .. } => 1,
            Self::Provider(_) | Self::Storage(_) => 1,
        }
    }
}
