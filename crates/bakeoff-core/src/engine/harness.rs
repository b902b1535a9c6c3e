//! Generation and evaluation orchestrators.
//!
//! Both runs fan out one bounded task per prompt index, join on completion
//! (or a whole-run timeout), and absorb per-index provider failures as
//! recorded data. Only structural misuse becomes a call-level error.

use crate::catalog::Catalog;
use crate::error::HarnessError;
use crate::model::{
    EvalCounts, EvaluationSummary, GenerationSummary, LatencyStats, Pair, PairState, PromptSet,
};
use crate::providers::{JudgeClient, ModelClient, ProviderError};
use crate::retry::{with_retries, RetryPolicy};
use crate::storage::Store;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RunPolicy {
    /// Worker pool size per run; sized to respect provider rate limits.
    pub parallel: usize,
    pub retry: RetryPolicy,
    /// Per provider call, applied around each attempt.
    pub call_timeout: Duration,
    /// Bounds the whole run; in-flight work past it is abandoned and the
    /// completed indices are kept (the rest stay missing, safe to retry).
    pub run_timeout: Option<Duration>,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            parallel: 4,
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(30),
            run_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RunKind {
    Generate,
    Evaluate,
}

pub struct Harness {
    pub store: Store,
    pub catalog: Catalog,
    pub model_client: Arc<dyn ModelClient>,
    pub judge_client: Arc<dyn JudgeClient>,
    pub policy: RunPolicy,
    in_flight: Arc<Mutex<HashSet<(RunKind, Pair)>>>,
}

/// Removes the in-flight marker when the run ends, errors and cancellation
/// included.
struct RunGuard {
    in_flight: Arc<Mutex<HashSet<(RunKind, Pair)>>>,
    key: (RunKind, Pair),
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.in_flight.lock().unwrap().remove(&self.key);
    }
}

impl Harness {
    pub fn new(
        store: Store,
        model_client: Arc<dyn ModelClient>,
        judge_client: Arc<dyn JudgeClient>,
        policy: RunPolicy,
    ) -> Self {
        let catalog = Catalog::new(store.clone());
        Self {
            store,
            catalog,
            model_client,
            judge_client,
            policy,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Generate a response for every prompt index of the pair not yet
    /// recorded. Idempotent: a pair that is already complete returns its
    /// stored counts untouched unless `force` supersedes them.
    pub async fn generate(
        &self,
        pair: &Pair,
        force: bool,
    ) -> Result<GenerationSummary, HarnessError> {
        let set = self.require_set(pair)?;
        let _guard = self.begin_run(RunKind::Generate, pair)?;
        let start = Instant::now();

        if force {
            self.store.delete_pair(pair)?;
        } else {
            let counts = self.store.pair_counts(pair)?;
            if PairState::derive(counts, set.prompt_count) != PairState::NotGenerated {
                return Ok(GenerationSummary {
                    generated: counts.responses - counts.errors,
                    failed: counts.errors,
                    elapsed: Duration::ZERO,
                });
            }
        }

        let recorded: HashSet<u32> = self.store.recorded_indices(pair)?.into_iter().collect();
        let mut work = Vec::new();
        for idx in (0..set.prompt_count).filter(|i| !recorded.contains(i)) {
            let text = self
                .catalog
                .prompt_text(pair.prompt_set_id, idx)?
                .ok_or_else(|| HarnessError::InvalidPair {
                    reason: format!("prompt set {} has no prompt at index {}", set.id, idx),
                })?;
            work.push((idx, text));
        }
        let dispatched: HashSet<u32> = work.iter().map(|(i, _)| *i).collect();

        // Spawn everything up front; each task queues on the semaphore so
        // dispatch never blocks and the run timeout covers permit waits too.
        let sem = Arc::new(Semaphore::new(self.policy.parallel.max(1)));
        let mut handles: Vec<JoinHandle<anyhow::Result<()>>> = Vec::new();
        for (idx, prompt) in work {
            let sem = sem.clone();
            let store = self.store.clone();
            let client = self.model_client.clone();
            let pair = pair.clone();
            let retry = self.policy.retry.clone();
            let call_timeout = self.policy.call_timeout;
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.map_err(anyhow::Error::from)?;
                let outcome = with_retries(&retry, || async {
                    match tokio::time::timeout(call_timeout, client.complete(&pair.model, &prompt))
                        .await
                    {
                        Ok(r) => r,
                        Err(_) => Err(ProviderError::Timeout),
                    }
                })
                .await;
                match outcome {
                    Ok(c) => store.insert_response_ok(&pair, idx, &c.text, c.latency_seconds),
                    Err(e) => {
                        warn!(%pair, idx, error = %e, "generation exhausted retries");
                        store.insert_response_error(&pair, idx, &e.to_string())
                    }
                }
            }));
        }

        self.settle(handles).await?;

        // Summaries count only this run's indices, read back from the store
        // so the timeout path reports exactly what was recorded.
        let mut generated = 0u32;
        let mut failed = 0u32;
        for r in self.store.responses(pair)? {
            if dispatched.contains(&r.prompt_index) {
                if r.is_error() {
                    failed += 1;
                } else {
                    generated += 1;
                }
            }
        }
        let elapsed = start.elapsed();
        info!(%pair, generated, failed, elapsed_ms = elapsed.as_millis() as u64, "generation run finished");
        Ok(GenerationSummary {
            generated,
            failed,
            elapsed,
        })
    }

    /// Submit every successful response lacking a verdict to the judge.
    /// Re-invocation fills only missing verdicts; it never re-judges.
    pub async fn evaluate(
        &self,
        pair: &Pair,
        judge_model: &str,
    ) -> Result<EvaluationSummary, HarnessError> {
        let set = self.require_set(pair)?;
        if judge_model.is_empty() {
            return Err(HarnessError::InvalidPair {
                reason: "judge model id is empty".into(),
            });
        }
        let _guard = self.begin_run(RunKind::Evaluate, pair)?;
        let start = Instant::now();

        let counts = self.store.pair_counts(pair)?;
        if PairState::derive(counts, set.prompt_count) == PairState::NotGenerated {
            return Err(HarnessError::NotGenerated { pair: pair.clone() });
        }

        let judged: HashSet<u32> = self.store.evaluated_indices(pair)?.into_iter().collect();
        let mut work = Vec::new();
        for resp in self.store.responses(pair)? {
            if resp.is_error() || judged.contains(&resp.prompt_index) {
                continue;
            }
            let prompt = self
                .catalog
                .prompt_text(pair.prompt_set_id, resp.prompt_index)?
                .unwrap_or_default();
            let text = resp.text.unwrap_or_default();
            work.push((resp.prompt_index, prompt, text));
        }
        let dispatched: HashSet<u32> = work.iter().map(|(i, _, _)| *i).collect();
        let dispatched_count = dispatched.len() as u32;

        let sem = Arc::new(Semaphore::new(self.policy.parallel.max(1)));
        let mut handles: Vec<JoinHandle<anyhow::Result<()>>> = Vec::new();
        for (idx, prompt, response) in work {
            let sem = sem.clone();
            let store = self.store.clone();
            let judge = self.judge_client.clone();
            let judge_model = judge_model.to_string();
            let pair = pair.clone();
            let retry = self.policy.retry.clone();
            let call_timeout = self.policy.call_timeout;
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.map_err(anyhow::Error::from)?;
                let outcome = with_retries(&retry, || async {
                    match tokio::time::timeout(
                        call_timeout,
                        judge.score(&judge_model, &prompt, &response),
                    )
                    .await
                    {
                        Ok(r) => r,
                        Err(_) => Err(ProviderError::Timeout),
                    }
                })
                .await;
                match outcome {
                    Ok(verdict) => store.insert_eval(&pair, idx, &judge_model, verdict),
                    // Skipped indices are the one outcome never persisted;
                    // a later evaluate picks them up again.
                    Err(e) => {
                        warn!(%pair, idx, error = %e, "evaluation exhausted retries; skipping");
                        Ok(())
                    }
                }
            }));
        }

        self.settle(handles).await?;

        let judged_after: HashSet<u32> = self.store.evaluated_indices(pair)?.into_iter().collect();
        let evaluated = dispatched.intersection(&judged_after).count() as u32;
        let skipped = dispatched_count - evaluated;
        let elapsed = start.elapsed();
        info!(%pair, evaluated, skipped, elapsed_ms = elapsed.as_millis() as u64, "evaluation run finished");
        Ok(EvaluationSummary {
            evaluated,
            skipped,
            elapsed,
        })
    }

    /// Derived lifecycle stage, recomputed from stored counts on every call.
    pub fn pair_state(&self, pair: &Pair) -> Result<PairState, HarnessError> {
        let set = self.require_set(pair)?;
        let counts = self.store.pair_counts(pair)?;
        Ok(PairState::derive(counts, set.prompt_count))
    }

    pub fn stats(&self, pair: &Pair) -> Result<(Option<LatencyStats>, EvalCounts), HarnessError> {
        self.require_set(pair)?;
        let latency = self.store.latency_stats(pair)?;
        let counts = self.store.eval_counts(pair)?;
        Ok((latency, counts))
    }

    fn require_set(&self, pair: &Pair) -> Result<PromptSet, HarnessError> {
        if pair.model.is_empty() {
            return Err(HarnessError::InvalidPair {
                reason: "model id is empty".into(),
            });
        }
        self.catalog
            .get(pair.prompt_set_id)?
            .ok_or_else(|| HarnessError::InvalidPair {
                reason: format!("unknown prompt set {}", pair.prompt_set_id),
            })
    }

    fn begin_run(&self, kind: RunKind, pair: &Pair) -> Result<RunGuard, HarnessError> {
        let key = (kind, pair.clone());
        let mut active = self.in_flight.lock().unwrap();
        if !active.insert(key.clone()) {
            return Err(HarnessError::AlreadyInProgress { pair: pair.clone() });
        }
        Ok(RunGuard {
            in_flight: self.in_flight.clone(),
            key,
        })
    }

    /// Join all run tasks; under the run timeout the stragglers are aborted
    /// and then drained, so nothing can commit after the summary readback.
    async fn settle(&self, mut handles: Vec<JoinHandle<anyhow::Result<()>>>) -> anyhow::Result<()> {
        let mut joined = 0;
        match self.policy.run_timeout {
            None => join_from(&mut handles, &mut joined).await,
            Some(limit) => {
                match tokio::time::timeout(limit, join_from(&mut handles, &mut joined)).await {
                    Ok(res) => res,
                    Err(_) => {
                        warn!(
                            limit_ms = limit.as_millis() as u64,
                            "run timeout; abandoning in-flight calls"
                        );
                        for h in handles.iter().skip(joined) {
                            h.abort();
                        }
                        join_from(&mut handles, &mut joined).await
                    }
                }
            }
        }
    }
}

/// Join handles starting at `*joined`, advancing it past each settled task so
/// a cancelled join can be resumed without re-polling a finished handle.
async fn join_from(
    handles: &mut Vec<JoinHandle<anyhow::Result<()>>>,
    joined: &mut usize,
) -> anyhow::Result<()> {
    while *joined < handles.len() {
        let res = (&mut handles[*joined]).await;
        *joined += 1;
        match res {
            Ok(res) => res?,
            Err(e) if e.is_cancelled() => {}
            Err(e) => anyhow::bail!("task panicked: {}", e),
        }
    }
    Ok(())
}
