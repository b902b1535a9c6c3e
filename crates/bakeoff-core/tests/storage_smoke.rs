use bakeoff_core::model::{Pair, PairCounts, PairState, Verdict};
use bakeoff_core::storage::Store;

fn seeded(prompts: &[&str]) -> anyhow::Result<(Store, i64)> {
    let store = Store::memory()?;
    store.init_schema()?;
    let prompts: Vec<String> = prompts.iter().map(|p| p.to_string()).collect();
    let set_id = store.insert_prompt_set("seed.json", "default", &prompts)?;
    Ok((store, set_id))
}

#[test]
fn schema_init_is_idempotent() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bakeoff.db");
    let store = Store::open(&path)?;
    store.init_schema()?;
    store.init_schema()?;

    // A reopened store sees the persisted rows.
    let set_id = store.insert_prompt_set("a.json", "default", &["p".into()])?;
    drop(store);
    let store = Store::open(&path)?;
    let set = store.get_prompt_set(set_id)?.expect("set survives reopen");
    assert_eq!(set.prompt_count, 1);
    assert_eq!(set.source_file, "a.json");

    Ok(())
}

#[test]
fn prompt_sets_are_immutable_snapshots() -> anyhow::Result<()> {
    let (store, set_id) = seeded(&["first", "second"])?;

    assert_eq!(store.prompt_text(set_id, 0)?.as_deref(), Some("first"));
    assert_eq!(store.prompt_text(set_id, 1)?.as_deref(), Some("second"));
    assert_eq!(store.prompt_text(set_id, 2)?, None);
    assert!(store.get_prompt_set(set_id + 1)?.is_none());

    // Loading the same file again makes a distinct set.
    let other = store.insert_prompt_set("seed.json", "default", &["first".into()])?;
    assert_ne!(other, set_id);
    assert_eq!(store.list_prompt_sets()?.len(), 2);

    Ok(())
}

#[test]
fn response_rows_are_unique_per_index() -> anyhow::Result<()> {
    let (store, set_id) = seeded(&["p0", "p1"])?;
    let pair = Pair::new(set_id, "model-a");

    store.insert_response_ok(&pair, 0, "hello", 0.25)?;
    store.insert_response_error(&pair, 1, "timed out")?;

    assert!(store.insert_response_ok(&pair, 0, "again", 0.1).is_err());
    assert_eq!(store.recorded_indices(&pair)?, vec![0, 1]);

    let rows = store.responses(&pair)?;
    assert_eq!(rows.len(), 2);
    assert!(!rows[0].is_error());
    assert_eq!(rows[0].latency_seconds, Some(0.25));
    assert!(rows[1].is_error());
    assert_eq!(rows[1].error.as_deref(), Some("timed out"));
    assert_eq!(rows[1].latency_seconds, None);

    Ok(())
}

#[test]
fn counts_drive_the_derived_state() -> anyhow::Result<()> {
    let (store, set_id) = seeded(&["p0", "p1", "p2"])?;
    let pair = Pair::new(set_id, "model-a");
    let prompt_count = 3;

    let state = |store: &Store| -> anyhow::Result<PairState> {
        Ok(PairState::derive(store.pair_counts(&pair)?, prompt_count))
    };

    assert_eq!(state(&store)?, PairState::NotGenerated);

    // A partial pair is still not generated.
    store.insert_response_ok(&pair, 0, "a", 0.1)?;
    assert_eq!(state(&store)?, PairState::NotGenerated);

    store.insert_response_ok(&pair, 1, "b", 0.2)?;
    store.insert_response_error(&pair, 2, "boom")?;
    assert_eq!(
        store.pair_counts(&pair)?,
        PairCounts {
            responses: 3,
            errors: 1,
            evals: 0
        }
    );
    assert_eq!(state(&store)?, PairState::Generated);

    // Only the two successful rows need verdicts.
    store.insert_eval(&pair, 0, "judge", Verdict { ok: true, other: false })?;
    assert_eq!(state(&store)?, PairState::Generated);
    store.insert_eval(&pair, 1, "judge", Verdict { ok: false, other: true })?;
    assert_eq!(state(&store)?, PairState::Evaluated);

    Ok(())
}

#[test]
fn eval_insert_requires_a_successful_response() -> anyhow::Result<()> {
    let (store, set_id) = seeded(&["p0", "p1"])?;
    let pair = Pair::new(set_id, "model-a");
    let verdict = Verdict { ok: true, other: true };

    // No response row at all.
    assert!(store.insert_eval(&pair, 0, "judge", verdict).is_err());

    // An error marker is not judgeable.
    store.insert_response_error(&pair, 0, "boom")?;
    assert!(store.insert_eval(&pair, 0, "judge", verdict).is_err());

    store.insert_response_ok(&pair, 1, "fine", 0.1)?;
    store.insert_eval(&pair, 1, "judge", verdict)?;
    assert_eq!(store.evaluated_indices(&pair)?, vec![1]);

    Ok(())
}

#[test]
fn latency_stats_ignore_error_rows_and_empty_pairs() -> anyhow::Result<()> {
    let (store, set_id) = seeded(&["p0", "p1", "p2"])?;
    let pair = Pair::new(set_id, "model-a");

    assert!(store.latency_stats(&pair)?.is_none());

    store.insert_response_error(&pair, 0, "boom")?;
    assert!(store.latency_stats(&pair)?.is_none());

    store.insert_response_ok(&pair, 1, "a", 0.2)?;
    store.insert_response_ok(&pair, 2, "b", 0.6)?;
    let stats = store.latency_stats(&pair)?.expect("two clean rows");
    assert_eq!(stats.count, 2);
    assert!((stats.min - 0.2).abs() < 1e-9);
    assert!((stats.avg - 0.4).abs() < 1e-9);
    assert!((stats.max - 0.6).abs() < 1e-9);

    Ok(())
}

#[test]
fn eval_counts_partition_the_verdicts() -> anyhow::Result<()> {
    let (store, set_id) = seeded(&["p0", "p1", "p2"])?;
    let pair = Pair::new(set_id, "model-a");

    let counts = store.eval_counts(&pair)?;
    assert_eq!(counts.total(), 0);
    assert_eq!(counts.ok_ratio(), None);
    assert_eq!(counts.other_ratio(), None);

    for (idx, verdict) in [
        (0, Verdict { ok: true, other: true }),
        (1, Verdict { ok: true, other: false }),
        (2, Verdict { ok: false, other: false }),
    ] {
        store.insert_response_ok(&pair, idx, "r", 0.1)?;
        store.insert_eval(&pair, idx, "judge", verdict)?;
    }

    let counts = store.eval_counts(&pair)?;
    assert_eq!(counts.ok_true, 2);
    assert_eq!(counts.ok_false, 1);
    assert_eq!(counts.other_true, 1);
    assert_eq!(counts.other_false, 2);
    assert_eq!(counts.ok_true + counts.ok_false, counts.total());
    assert!((counts.ok_ratio().unwrap() - 2.0 / 3.0).abs() < 1e-9);

    Ok(())
}

#[test]
fn delete_pair_clears_responses_and_verdicts_together() -> anyhow::Result<()> {
    let (store, set_id) = seeded(&["p0"])?;
    let pair = Pair::new(set_id, "model-a");
    let other = Pair::new(set_id, "model-b");

    store.insert_response_ok(&pair, 0, "r", 0.1)?;
    store.insert_eval(&pair, 0, "judge", Verdict { ok: true, other: true })?;
    store.insert_response_ok(&other, 0, "r", 0.1)?;

    store.delete_pair(&pair)?;
    assert!(store.responses(&pair)?.is_empty());
    assert!(store.evals(&pair)?.is_empty());

    // The sibling pair on the same set is untouched.
    assert_eq!(store.responses(&other)?.len(), 1);
    assert_eq!(store.list_pairs()?, vec![other]);

    Ok(())
}
