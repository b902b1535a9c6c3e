//! Prompt-set catalog: enumeration plus file ingestion.
//!
//! Prompt sets are immutable once created; the harness only ever reads them.
//! The prompt texts themselves are opaque to everything downstream.

use crate::storage::Store;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::model::PromptSet;

#[derive(Clone)]
pub struct Catalog {
    store: Store,
}

/// One entry of a prompt file: either a bare string or `{"text": "..."}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PromptEntry {
    Text(String),
    Object { text: String },
}

impl Catalog {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn list(&self) -> anyhow::Result<Vec<PromptSet>> {
        self.store.list_prompt_sets()
    }

    pub fn get(&self, set_id: i64) -> anyhow::Result<Option<PromptSet>> {
        self.store.get_prompt_set(set_id)
    }

    pub fn prompt_text(&self, set_id: i64, idx: u32) -> anyhow::Result<Option<String>> {
        self.store.prompt_text(set_id, idx)
    }

    /// Ingest a JSON prompt file as a new prompt set. Returns the set id.
    pub fn load_prompt_file(&self, path: &Path, prompt_func: &str) -> anyhow::Result<i64> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let entries: Vec<PromptEntry> =
            serde_json::from_str(&raw).context("prompt file is not a JSON array of prompts")?;
        if entries.is_empty() {
            anyhow::bail!("prompt file {} contains no prompts", path.display());
        }

        let prompts: Vec<String> = entries
            .into_iter()
            .map(|e| match e {
                PromptEntry::Text(t) => t,
                PromptEntry::Object { text } => text,
            })
            .collect();

        let source_file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let set_id = self
            .store
            .insert_prompt_set(&source_file, prompt_func, &prompts)?;
        info!(
            set_id,
            prompts = prompts.len(),
            source = %source_file,
            "prompt set loaded"
        );
        Ok(set_id)
    }
}
