use crate::compare::ComparisonView;
use crate::model::{EvaluationSummary, GenerationSummary};
use crate::stats::PairOverview;

pub fn print_status(overviews: &[PairOverview]) {
    if overviews.is_empty() {
        eprintln!("no pairs recorded yet (run `bakeoff generate` first)");
        return;
    }
    for o in overviews {
        let latency = match &o.latency {
            Some(l) => format!(
                "latency min/avg/max {:.2}/{:.2}/{:.2}s over {}",
                l.min, l.avg, l.max, l.count
            ),
            None => "latency n/a".to_string(),
        };
        let ok = match o.evals.ok_ratio() {
            Some(r) => format!(
                "ok {}t/{}f ({:.1}%)",
                o.evals.ok_true,
                o.evals.ok_false,
                r * 100.0
            ),
            None => "ok n/a".to_string(),
        };
        let other = match o.evals.other_ratio() {
            Some(r) => format!(
                "other {}t/{}f ({:.1}%)",
                o.evals.other_true,
                o.evals.other_false,
                r * 100.0
            ),
            None => "other n/a".to_string(),
        };
        eprintln!("{} [{}] {} | {} | {}", o.pair, o.state, latency, ok, other);
    }
}

pub fn print_generation_summary(summary: &GenerationSummary) {
    eprintln!(
        "generation: {} generated, {} failed in {:.1}s",
        summary.generated,
        summary.failed,
        summary.elapsed.as_secs_f64()
    );
}

pub fn print_evaluation_summary(summary: &EvaluationSummary) {
    eprintln!(
        "evaluation: {} evaluated, {} skipped in {:.1}s",
        summary.evaluated,
        summary.skipped,
        summary.elapsed.as_secs_f64()
    );
}

pub fn print_comparison(view: &ComparisonView) {
    eprintln!("comparing {} vs {}", view.left, view.right);
    for row in &view.rows {
        eprintln!("--- prompt {} ---", row.prompt_index);
        if let Some(text) = &row.prompt_text {
            eprintln!("prompt: {}", text);
        }
        for (label, side) in [("A", &row.left), ("B", &row.right)] {
            match side {
                None => eprintln!("[{}] (no response)", label),
                Some(s) => {
                    let verdict = match s.verdict {
                        Some(v) => format!("ok={} other={}", v.ok, v.other),
                        None => "unjudged".to_string(),
                    };
                    match (&s.text, &s.error) {
                        (Some(text), _) => {
                            let latency = s
                                .latency_seconds
                                .map(|l| format!("{:.2}s", l))
                                .unwrap_or_else(|| "-".into());
                            eprintln!("[{}] ({}, {}) {}", label, latency, verdict, text);
                        }
                        (None, Some(err)) => eprintln!("[{}] generation failed: {}", label, err),
                        (None, None) => eprintln!("[{}] (empty)", label),
                    }
                }
            }
        }
    }
}
