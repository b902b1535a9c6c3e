use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bakeoff",
    version,
    about = "Generate and judge model responses over prompt sets"
)]
pub struct Cli {
    #[arg(long, default_value = "bakeoff.yaml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a sample config file
    Init(InitArgs),
    /// Ingest a JSON prompt file as a new prompt set
    Load(LoadArgs),
    /// List prompt sets
    Sets,
    /// Generate responses for a (prompt set, model) pair
    Generate(GenerateArgs),
    /// Judge the generated responses of a pair
    Evaluate(EvaluateArgs),
    /// Show every pair with its state and statistics
    Status(StatusArgs),
    /// Side-by-side comparison of two pairs
    Compare(CompareArgs),
    Version,
}

#[derive(Parser, Clone)]
pub struct InitArgs {
    /// Overwrite an existing config
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Clone)]
pub struct LoadArgs {
    pub file: PathBuf,

    /// Name of the prompt generation function the file was produced with
    #[arg(long, default_value = "default")]
    pub prompt_func: String,
}

#[derive(Parser, Clone)]
pub struct GenerateArgs {
    #[arg(long)]
    pub set: i64,
    #[arg(long)]
    pub model: String,

    /// Supersede existing responses and verdicts for the pair
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Parser, Clone)]
pub struct EvaluateArgs {
    #[arg(long)]
    pub set: i64,
    #[arg(long)]
    pub model: String,

    /// Judge model; falls back to judge_model from the config
    #[arg(long)]
    pub judge_model: Option<String>,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Parser, Clone)]
pub struct StatusArgs {
    /// Emit JSON instead of the console table
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Clone)]
pub struct CompareArgs {
    #[arg(long)]
    pub set: i64,
    #[arg(long)]
    pub model_a: String,
    #[arg(long)]
    pub model_b: String,

    /// Prompt set for side B when it differs from side A
    #[arg(long)]
    pub set_b: Option<i64>,
}

#[derive(clap::Args, Clone)]
pub struct ProviderArgs {
    /// Provider backend: openai (live) or fake (deterministic, offline)
    #[arg(long, default_value = "openai", env = "BAKEOFF_PROVIDER")]
    pub provider: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}
