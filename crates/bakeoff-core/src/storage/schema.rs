pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS prompt_sets (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  created_at TEXT NOT NULL,
  source_file TEXT NOT NULL,
  prompt_func TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS prompts (
  set_id INTEGER NOT NULL REFERENCES prompt_sets(id),
  idx INTEGER NOT NULL,
  text TEXT NOT NULL,
  UNIQUE(set_id, idx)
);

CREATE TABLE IF NOT EXISTS responses (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  prompt_set_id INTEGER NOT NULL REFERENCES prompt_sets(id),
  model TEXT NOT NULL,
  idx INTEGER NOT NULL,
  text TEXT,
  error TEXT,
  latency_seconds REAL,
  created_at TEXT NOT NULL,
  UNIQUE(prompt_set_id, model, idx)
);

CREATE TABLE IF NOT EXISTS evals (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  prompt_set_id INTEGER NOT NULL REFERENCES prompt_sets(id),
  model TEXT NOT NULL,
  idx INTEGER NOT NULL,
  judge_model TEXT NOT NULL,
  ok INTEGER NOT NULL,
  other INTEGER NOT NULL,
  created_at TEXT NOT NULL,
  UNIQUE(prompt_set_id, model, idx)
);

CREATE INDEX IF NOT EXISTS idx_responses_pair ON responses(prompt_set_id, model);
CREATE INDEX IF NOT EXISTS idx_evals_pair ON evals(prompt_set_id, model);
"#;
