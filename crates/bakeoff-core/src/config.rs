use crate::engine::RunPolicy;
use crate::retry::RetryPolicy;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub version: u32,
    #[serde(default = "default_db")]
    pub db: PathBuf,
    /// Judge model used when the evaluate command gives none.
    #[serde(default)]
    pub judge_model: Option<String>,
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub parallel: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub run_timeout_seconds: Option<u64>,
    pub max_attempts: Option<u32>,
    pub backoff_ms: Option<u64>,
}

fn default_db() -> PathBuf {
    PathBuf::from(".bakeoff/bakeoff.db")
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            db: default_db(),
            judge_model: None,
            settings: Settings::default(),
        }
    }
}

impl Settings {
    pub fn run_policy(&self) -> RunPolicy {
        let defaults = RunPolicy::default();
        let retry_defaults = RetryPolicy::default();
        RunPolicy {
            parallel: self.parallel.unwrap_or(defaults.parallel).max(1),
            retry: RetryPolicy {
                max_attempts: self.max_attempts.unwrap_or(retry_defaults.max_attempts).max(1),
                base_backoff: self
                    .backoff_ms
                    .map(Duration::from_millis)
                    .unwrap_or(retry_defaults.base_backoff),
                max_backoff: retry_defaults.max_backoff,
            },
            call_timeout: self
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.call_timeout),
            run_timeout: self.run_timeout_seconds.map(Duration::from_secs),
        }
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<HarnessConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: HarnessConfig = serde_yaml::from_str(&raw).context("failed to parse YAML")?;
    if cfg.version != SUPPORTED_CONFIG_VERSION {
        anyhow::bail!(
            "unsupported config version {} (supported: {})",
            cfg.version,
            SUPPORTED_CONFIG_VERSION
        );
    }
    Ok(cfg)
}

pub fn write_sample_config(path: &Path) -> anyhow::Result<()> {
    let sample = r#"version: 1
db: ".bakeoff/bakeoff.db"
judge_model: "gpt-4o-mini"
settings:
  parallel: 4
  timeout_seconds: 30
  max_attempts: 3
  backoff_ms: 500
"#;
    std::fs::write(path, sample)
        .with_context(|| format!("failed to write sample config {}", path.display()))?;
    Ok(())
}
