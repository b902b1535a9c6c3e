use crate::cli::args::{
    CompareArgs, EvaluateArgs, GenerateArgs, InitArgs, LoadArgs, ProviderArgs, StatusArgs,
};
use crate::exit_codes;
use crate::fake::FakeClient;
use anyhow::Context;
use bakeoff_core::catalog::Catalog;
use bakeoff_core::compare::ComparisonSelector;
use bakeoff_core::config::{self, HarnessConfig};
use bakeoff_core::engine::Harness;
use bakeoff_core::error::HarnessError;
use bakeoff_core::model::Pair;
use bakeoff_core::providers::openai::OpenAiClient;
use bakeoff_core::providers::{JudgeClient, ModelClient};
use bakeoff_core::storage::Store;
use bakeoff_core::{report, stats};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub fn load_or_default_config(path: &Path) -> anyhow::Result<HarnessConfig> {
    if path.exists() {
        debug!(path = %path.display(), "loading config");
        config::load_config(path)
    } else {
        debug!(path = %path.display(), "no config file, using defaults");
        Ok(HarnessConfig::default())
    }
}

fn open_store(cfg: &HarnessConfig) -> anyhow::Result<Store> {
    if let Some(parent) = cfg.db.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = Store::open(&cfg.db)?;
    store.init_schema()?;
    Ok(store)
}

fn build_clients(
    provider: &ProviderArgs,
) -> anyhow::Result<(Arc<dyn ModelClient>, Arc<dyn JudgeClient>)> {
    match provider.provider.as_str() {
        "fake" => Ok((Arc::new(FakeClient), Arc::new(FakeClient))),
        "openai" => {
            let api_key = provider
                .api_key
                .clone()
                .context("OPENAI_API_KEY is not set (or pass --provider fake)")?;
            let client = Arc::new(OpenAiClient::new(api_key));
            Ok((client.clone(), client))
        }
        other => anyhow::bail!("unknown provider '{}' (expected openai|fake)", other),
    }
}

fn build_harness(cfg: &HarnessConfig, provider: &ProviderArgs) -> anyhow::Result<Harness> {
    let store = open_store(cfg)?;
    let (model_client, judge_client) = build_clients(provider)?;
    Ok(Harness::new(
        store,
        model_client,
        judge_client,
        cfg.settings.run_policy(),
    ))
}

/// Harness for commands that never touch a provider.
fn build_offline_harness(cfg: &HarnessConfig) -> anyhow::Result<Harness> {
    let store = open_store(cfg)?;
    Ok(Harness::new(
        store,
        Arc::new(FakeClient),
        Arc::new(FakeClient),
        cfg.settings.run_policy(),
    ))
}

fn report_harness_error(e: &HarnessError) -> i32 {
    eprintln!("error: {}", e);
    e.exit_code()
}

pub async fn cmd_init(config_path: &Path, args: InitArgs) -> anyhow::Result<i32> {
    if config_path.exists() && !args.force {
        eprintln!("note: {} already exists (use --force)", config_path.display());
        return Ok(exit_codes::OK);
    }
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    config::write_sample_config(config_path)?;
    eprintln!("created {}", config_path.display());
    Ok(exit_codes::OK)
}

pub async fn cmd_load(config_path: &Path, args: LoadArgs) -> anyhow::Result<i32> {
    let cfg = load_or_default_config(config_path)?;
    let store = open_store(&cfg)?;
    let catalog = Catalog::new(store);
    let set_id = catalog.load_prompt_file(&args.file, &args.prompt_func)?;
    eprintln!("prompt set {} loaded from {}", set_id, args.file.display());
    Ok(exit_codes::OK)
}

pub async fn cmd_sets(config_path: &Path) -> anyhow::Result<i32> {
    let cfg = load_or_default_config(config_path)?;
    let store = open_store(&cfg)?;
    let catalog = Catalog::new(store);
    let sets = catalog.list()?;
    if sets.is_empty() {
        eprintln!("no prompt sets (run `bakeoff load <file>` first)");
        return Ok(exit_codes::OK);
    }
    for s in sets {
        eprintln!(
            "{}: {} - {} {} ({} prompts)",
            s.id, s.created_at, s.source_file, s.prompt_func, s.prompt_count
        );
    }
    Ok(exit_codes::OK)
}

pub async fn cmd_generate(config_path: &Path, args: GenerateArgs) -> anyhow::Result<i32> {
    let cfg = load_or_default_config(config_path)?;
    let harness = build_harness(&cfg, &args.provider)?;
    let pair = Pair::new(args.set, args.model);
    info!(%pair, provider = %args.provider.provider, force = args.force, "generating responses");

    match harness.generate(&pair, args.force).await {
        Ok(summary) => {
            report::print_generation_summary(&summary);
            Ok(exit_codes::OK)
        }
        Err(e) => Ok(report_harness_error(&e)),
    }
}

pub async fn cmd_evaluate(config_path: &Path, args: EvaluateArgs) -> anyhow::Result<i32> {
    let cfg = load_or_default_config(config_path)?;
    let harness = build_harness(&cfg, &args.provider)?;
    let pair = Pair::new(args.set, args.model);

    let judge_model = args
        .judge_model
        .or_else(|| cfg.judge_model.clone())
        .context("no judge model given (--judge-model or judge_model in config)")?;
    info!(%pair, judge_model = %judge_model, "evaluating responses");

    match harness.evaluate(&pair, &judge_model).await {
        Ok(summary) => {
            report::print_evaluation_summary(&summary);
            Ok(exit_codes::OK)
        }
        Err(e) => Ok(report_harness_error(&e)),
    }
}

pub async fn cmd_status(config_path: &Path, args: StatusArgs) -> anyhow::Result<i32> {
    let cfg = load_or_default_config(config_path)?;
    let harness = build_offline_harness(&cfg)?;

    match stats::pair_overviews(&harness) {
        Ok(overviews) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&overviews)?);
            } else {
                report::print_status(&overviews);
            }
            Ok(exit_codes::OK)
        }
        Err(e) => Ok(report_harness_error(&e)),
    }
}

pub async fn cmd_compare(config_path: &Path, args: CompareArgs) -> anyhow::Result<i32> {
    let cfg = load_or_default_config(config_path)?;
    let harness = build_offline_harness(&cfg)?;

    let left = Pair::new(args.set, args.model_a);
    let right = Pair::new(args.set_b.unwrap_or(args.set), args.model_b);

    let mut selector = ComparisonSelector::new();
    selector.toggle(&left, true);
    selector.toggle(&right, true);

    match selector.compare(&harness) {
        Ok(view) => {
            report::print_comparison(&view);
            Ok(exit_codes::OK)
        }
        Err(e) => Ok(report_harness_error(&e)),
    }
}
