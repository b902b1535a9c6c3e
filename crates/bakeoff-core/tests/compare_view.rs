use async_trait::async_trait;
use bakeoff_core::compare::ComparisonSelector;
use bakeoff_core::engine::{Harness, RunPolicy};
use bakeoff_core::error::HarnessError;
use bakeoff_core::model::{Pair, Verdict};
use bakeoff_core::providers::{Completion, JudgeClient, ModelClient, ProviderError};
use bakeoff_core::storage::Store;
use std::sync::Arc;

struct NoProvider;

#[async_trait]
impl ModelClient for NoProvider {
    async fn complete(&self, _m: &str, _p: &str) -> Result<Completion, ProviderError> {
        Err(ProviderError::Timeout)
    }

    fn provider_name(&self) -> &'static str {
        "none"
    }
}

#[async_trait]
impl JudgeClient for NoProvider {
    async fn score(&self, _j: &str, _p: &str, _r: &str) -> Result<Verdict, ProviderError> {
        Err(ProviderError::Timeout)
    }
}

fn offline_harness(store: Store) -> Harness {
    Harness::new(
        store,
        Arc::new(NoProvider),
        Arc::new(NoProvider),
        RunPolicy::default(),
    )
}

fn seeded(prompts: &[&str]) -> anyhow::Result<(Store, i64)> {
    let store = Store::memory()?;
    store.init_schema()?;
    let prompts: Vec<String> = prompts.iter().map(|p| p.to_string()).collect();
    let set_id = store.insert_prompt_set("seed.json", "default", &prompts)?;
    Ok((store, set_id))
}

#[test]
fn compare_joins_rows_by_index() -> anyhow::Result<()> {
    let (store, set_id) = seeded(&["p0", "p1"])?;
    let a = Pair::new(set_id, "model-a");
    let b = Pair::new(set_id, "model-b");

    store.insert_response_ok(&a, 0, "a0", 0.1)?;
    store.insert_response_ok(&a, 1, "a1", 0.2)?;
    store.insert_eval(&a, 0, "judge", Verdict { ok: true, other: false })?;
    store.insert_response_ok(&b, 0, "b0", 0.3)?;
    store.insert_response_error(&b, 1, "boom")?;

    let harness = offline_harness(store);
    let mut sel = ComparisonSelector::new();
    sel.toggle(&a, true);
    sel.toggle(&b, true);

    let view = sel.compare(&harness)?;
    assert_eq!(view.left, a);
    assert_eq!(view.right, b);
    assert_eq!(view.rows.len(), 2);

    let row = &view.rows[0];
    assert_eq!(row.prompt_text.as_deref(), Some("p0"));
    assert_eq!(row.left.as_ref().unwrap().text.as_deref(), Some("a0"));
    assert_eq!(
        row.left.as_ref().unwrap().verdict,
        Some(Verdict { ok: true, other: false })
    );
    assert_eq!(row.right.as_ref().unwrap().verdict, None);

    // The error marker shows up as an errored side, not a missing one.
    let row = &view.rows[1];
    assert_eq!(row.right.as_ref().unwrap().error.as_deref(), Some("boom"));
    assert_eq!(row.right.as_ref().unwrap().text, None);

    Ok(())
}

#[test]
fn compare_spans_different_prompt_sets() -> anyhow::Result<()> {
    let (store, set_a) = seeded(&["a only", "shared"])?;
    let set_b = store.insert_prompt_set("other.json", "default", &["b only".into()])?;
    let a = Pair::new(set_a, "model-a");
    let b = Pair::new(set_b, "model-b");

    store.insert_response_ok(&a, 0, "ra0", 0.1)?;
    store.insert_response_ok(&a, 1, "ra1", 0.1)?;
    store.insert_response_ok(&b, 0, "rb0", 0.1)?;

    let harness = offline_harness(store);
    let mut sel = ComparisonSelector::new();
    sel.toggle(&a, true);
    sel.toggle(&b, true);

    let view = sel.compare(&harness)?;
    // Union of indices: 0 from both sides, 1 from the left only.
    assert_eq!(view.rows.len(), 2);
    assert!(view.rows[0].left.is_some() && view.rows[0].right.is_some());
    assert!(view.rows[1].left.is_some() && view.rows[1].right.is_none());
    assert_eq!(view.rows[1].prompt_text.as_deref(), Some("shared"));

    Ok(())
}

#[test]
fn compare_requires_two_generated_pairs() -> anyhow::Result<()> {
    let (store, set_id) = seeded(&["p0"])?;
    let a = Pair::new(set_id, "model-a");
    let b = Pair::new(set_id, "model-b");
    store.insert_response_ok(&a, 0, "ra", 0.1)?;
    // b has no rows at all.

    let harness = offline_harness(store);

    let mut sel = ComparisonSelector::new();
    sel.toggle(&a, true);
    let err = sel.compare(&harness).unwrap_err();
    assert!(matches!(err, HarnessError::IncompleteSelection { selected: 1 }));

    sel.toggle(&b, true);
    let err = sel.compare(&harness).unwrap_err();
    assert!(matches!(err, HarnessError::IncompleteSelection { selected: 1 }));

    Ok(())
}

#[test]
fn compare_rejects_a_vanished_prompt_set() -> anyhow::Result<()> {
    let (store, set_id) = seeded(&["p0"])?;
    let a = Pair::new(set_id, "model-a");
    let ghost = Pair::new(set_id + 100, "model-b");
    store.insert_response_ok(&a, 0, "ra", 0.1)?;

    let harness = offline_harness(store);
    let mut sel = ComparisonSelector::new();
    sel.toggle(&a, true);
    sel.toggle(&ghost, true);

    let err = sel.compare(&harness).unwrap_err();
    assert!(matches!(err, HarnessError::PairNotFound { .. }));

    Ok(())
}
