use crate::model::{
    EvalCounts, EvaluationResult, LatencyStats, Pair, PairCounts, PromptResponse, PromptSet,
    Verdict,
};
use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared persistence for prompt sets, responses and verdicts. The connection
/// is the unit of isolation: every method takes the lock for one statement or
/// one short transaction, so writers on disjoint pairs never block each other
/// for a full run.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path).context("failed to open sqlite db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    // --- prompt sets ---

    /// Create an immutable prompt set with its prompt texts in one
    /// transaction. Returns the new set id.
    pub fn insert_prompt_set(
        &self,
        source_file: &str,
        prompt_func: &str,
        prompts: &[String],
    ) -> anyhow::Result<i64> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO prompt_sets(created_at, source_file, prompt_func) VALUES (?1, ?2, ?3)",
            params![chrono::Utc::now().to_rfc3339(), source_file, prompt_func],
        )?;
        let set_id = tx.last_insert_rowid();
        {
            let mut stmt =
                tx.prepare("INSERT INTO prompts(set_id, idx, text) VALUES (?1, ?2, ?3)")?;
            for (idx, text) in prompts.iter().enumerate() {
                stmt.execute(params![set_id, idx as i64, text])?;
            }
        }
        tx.commit()?;
        Ok(set_id)
    }

    pub fn list_prompt_sets(&self) -> anyhow::Result<Vec<PromptSet>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT ps.id, ps.created_at, ps.source_file, ps.prompt_func, COUNT(p.idx)
             FROM prompt_sets ps
             LEFT JOIN prompts p ON p.set_id = ps.id
             GROUP BY ps.id
             ORDER BY ps.created_at",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PromptSet {
                id: row.get(0)?,
                created_at: row.get(1)?,
                source_file: row.get(2)?,
                prompt_func: row.get(3)?,
                prompt_count: row.get::<_, i64>(4)? as u32,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn get_prompt_set(&self, set_id: i64) -> anyhow::Result<Option<PromptSet>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT ps.id, ps.created_at, ps.source_file, ps.prompt_func, COUNT(p.idx)
             FROM prompt_sets ps
             LEFT JOIN prompts p ON p.set_id = ps.id
             WHERE ps.id = ?1
             GROUP BY ps.id",
            params![set_id],
            |row| {
                Ok(PromptSet {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    source_file: row.get(2)?,
                    prompt_func: row.get(3)?,
                    prompt_count: row.get::<_, i64>(4)? as u32,
                })
            },
        )
        .optional()
        .context("get prompt set")
    }

    pub fn prompt_text(&self, set_id: i64, idx: u32) -> anyhow::Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT text FROM prompts WHERE set_id = ?1 AND idx = ?2",
            params![set_id, idx],
            |row| row.get(0),
        )
        .optional()
        .context("get prompt text")
    }

    // --- responses ---

    pub fn insert_response_ok(
        &self,
        pair: &Pair,
        idx: u32,
        text: &str,
        latency_seconds: f64,
    ) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO responses(prompt_set_id, model, idx, text, error, latency_seconds, created_at)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6)",
            params![
                pair.prompt_set_id,
                pair.model,
                idx,
                text,
                latency_seconds,
                chrono::Utc::now().to_rfc3339()
            ],
        )
        .context("insert response")?;
        Ok(())
    }

    /// Record an index whose generation exhausted its retry budget. The row
    /// counts toward pair completeness but carries no text or latency.
    pub fn insert_response_error(&self, pair: &Pair, idx: u32, error: &str) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO responses(prompt_set_id, model, idx, text, error, latency_seconds, created_at)
             VALUES (?1, ?2, ?3, NULL, ?4, NULL, ?5)",
            params![
                pair.prompt_set_id,
                pair.model,
                idx,
                error,
                chrono::Utc::now().to_rfc3339()
            ],
        )
        .context("insert error response")?;
        Ok(())
    }

    pub fn recorded_indices(&self, pair: &Pair) -> anyhow::Result<Vec<u32>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT idx FROM responses WHERE prompt_set_id = ?1 AND model = ?2 ORDER BY idx",
        )?;
        let rows = stmt.query_map(params![pair.prompt_set_id, pair.model], |row| row.get(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn responses(&self, pair: &Pair) -> anyhow::Result<Vec<PromptResponse>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT idx, text, error, latency_seconds
             FROM responses WHERE prompt_set_id = ?1 AND model = ?2 ORDER BY idx",
        )?;
        let rows = stmt.query_map(params![pair.prompt_set_id, pair.model], |row| {
            Ok(PromptResponse {
                prompt_index: row.get(0)?,
                text: row.get(1)?,
                error: row.get(2)?,
                latency_seconds: row.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Supersede a pair: drop its responses and verdicts in one transaction.
    /// Only force-regenerate uses this; the harness never deletes otherwise.
    pub fn delete_pair(&self, pair: &Pair) -> anyhow::Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM evals WHERE prompt_set_id = ?1 AND model = ?2",
            params![pair.prompt_set_id, pair.model],
        )?;
        tx.execute(
            "DELETE FROM responses WHERE prompt_set_id = ?1 AND model = ?2",
            params![pair.prompt_set_id, pair.model],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Every pair with at least one recorded response.
    pub fn list_pairs(&self) -> anyhow::Result<Vec<Pair>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT prompt_set_id, model FROM responses ORDER BY prompt_set_id, model",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Pair {
                prompt_set_id: row.get(0)?,
                model: row.get(1)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    // --- evals ---

    /// A verdict may exist only for an index with a successful response.
    pub fn insert_eval(
        &self,
        pair: &Pair,
        idx: u32,
        judge_model: &str,
        verdict: Verdict,
    ) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        let error: Option<Option<String>> = conn
            .query_row(
                "SELECT error FROM responses WHERE prompt_set_id = ?1 AND model = ?2 AND idx = ?3",
                params![pair.prompt_set_id, pair.model, idx],
                |row| row.get(0),
            )
            .optional()?;
        match error {
            None => anyhow::bail!("no response recorded for {} index {}", pair, idx),
            Some(Some(_)) => {
                anyhow::bail!("cannot evaluate error-marked response {} index {}", pair, idx)
            }
            Some(None) => {}
        }
        conn.execute(
            "INSERT INTO evals(prompt_set_id, model, idx, judge_model, ok, other, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                pair.prompt_set_id,
                pair.model,
                idx,
                judge_model,
                verdict.ok as i64,
                verdict.other as i64,
                chrono::Utc::now().to_rfc3339()
            ],
        )
        .context("insert eval")?;
        Ok(())
    }

    pub fn evals(&self, pair: &Pair) -> anyhow::Result<Vec<EvaluationResult>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT idx, judge_model, ok, other
             FROM evals WHERE prompt_set_id = ?1 AND model = ?2 ORDER BY idx",
        )?;
        let rows = stmt.query_map(params![pair.prompt_set_id, pair.model], |row| {
            Ok(EvaluationResult {
                prompt_index: row.get(0)?,
                judge_model: row.get(1)?,
                verdict: Verdict {
                    ok: row.get::<_, i64>(2)? != 0,
                    other: row.get::<_, i64>(3)? != 0,
                },
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn evaluated_indices(&self, pair: &Pair) -> anyhow::Result<Vec<u32>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT idx FROM evals WHERE prompt_set_id = ?1 AND model = ?2 ORDER BY idx",
        )?;
        let rows = stmt.query_map(params![pair.prompt_set_id, pair.model], |row| row.get(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    // --- derived counts & aggregates ---

    pub fn pair_counts(&self, pair: &Pair) -> anyhow::Result<PairCounts> {
        let conn = self.conn.lock().unwrap();
        let (responses, errors): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(error)
             FROM responses WHERE prompt_set_id = ?1 AND model = ?2",
            params![pair.prompt_set_id, pair.model],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let evals: i64 = conn.query_row(
            "SELECT COUNT(*) FROM evals WHERE prompt_set_id = ?1 AND model = ?2",
            params![pair.prompt_set_id, pair.model],
            |row| row.get(0),
        )?;
        Ok(PairCounts {
            responses: responses as u32,
            errors: errors as u32,
            evals: evals as u32,
        })
    }

    /// Latency over successful responses only; None when there are none, so
    /// callers never divide by zero.
    pub fn latency_stats(&self, pair: &Pair) -> anyhow::Result<Option<LatencyStats>> {
        let conn = self.conn.lock().unwrap();
        let (min, avg, max, count): (Option<f64>, Option<f64>, Option<f64>, i64) = conn.query_row(
            "SELECT MIN(latency_seconds), AVG(latency_seconds), MAX(latency_seconds),
                    COUNT(latency_seconds)
             FROM responses
             WHERE prompt_set_id = ?1 AND model = ?2 AND error IS NULL",
            params![pair.prompt_set_id, pair.model],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        match (min, avg, max) {
            (Some(min), Some(avg), Some(max)) if count > 0 => Ok(Some(LatencyStats {
                min,
                avg,
                max,
                count: count as u32,
            })),
            _ => Ok(None),
        }
    }

    pub fn eval_counts(&self, pair: &Pair) -> anyhow::Result<EvalCounts> {
        let conn = self.conn.lock().unwrap();
        let (ok_true, ok_false, other_true, other_false): (i64, i64, i64, i64) = conn.query_row(
            "SELECT
                COALESCE(SUM(ok = 1), 0),
                COALESCE(SUM(ok = 0), 0),
                COALESCE(SUM(other = 1), 0),
                COALESCE(SUM(other = 0), 0)
             FROM evals WHERE prompt_set_id = ?1 AND model = ?2",
            params![pair.prompt_set_id, pair.model],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        Ok(EvalCounts {
            ok_true: ok_true as u32,
            ok_false: ok_false as u32,
            other_true: other_true as u32,
            other_false: other_false as u32,
        })
    }
}
