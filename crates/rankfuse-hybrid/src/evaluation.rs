//! Retrieval quality against a labelled query set.
//!
//! Matching is by title: a retrieved document counts as relevant when its
//! title appears in the case's `relevant_docs`.

use serde::Serialize;
use std::collections::HashSet;

use rankfuse_core::corpus::{GoldenDataset, TestCase};
use rankfuse_core::traits::{TextSearcher, VectorSearcher};
use rankfuse_core::{Result, ScoredResult};

use crate::engine::HybridSearchEngine;
use crate::rerank::{first_json_list, LlmClient};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub query: String,
    pub metrics: Metrics,
    pub retrieved: Vec<String>,
    pub relevant: Vec<String>,
}

fn hits(retrieved: &[String], relevant: &[String]) -> usize {
    let relevant: HashSet<&str> = relevant.iter().map(String::as_str).collect();
    let retrieved: HashSet<&str> = retrieved.iter().map(String::as_str).collect();
    retrieved.intersection(&relevant).count()
}

/// `|retrieved ∩ relevant| / |retrieved|`, `0.0` when nothing was retrieved.
pub fn precision_at_k(retrieved: &[String], relevant: &[String]) -> f64 {
    if retrieved.is_empty() {
        return 0.0;
    }
    hits(retrieved, relevant) as f64 / retrieved.len() as f64
}

/// `|retrieved ∩ relevant| / |relevant|`, `0.0` when nothing is relevant.
pub fn recall_at_k(retrieved: &[String], relevant: &[String]) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    hits(retrieved, relevant) as f64 / relevant.len() as f64
}

pub fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}

pub fn score_case(case: &TestCase, retrieved: Vec<String>) -> CaseReport {
    let precision = precision_at_k(&retrieved, &case.relevant_docs);
    let recall = recall_at_k(&retrieved, &case.relevant_docs);
    CaseReport {
        query: case.query.clone(),
        metrics: Metrics { precision, recall, f1: f1_score(precision, recall) },
        retrieved,
        relevant: case.relevant_docs.clone(),
    }
}

/// Run every case through RRF search with smoothing `k` and score the top `limit`.
pub fn evaluate<TI, VI>(engine: &HybridSearchEngine<TI, VI>, dataset: &GoldenDataset, k: f64, limit: usize) -> Result<Vec<CaseReport>>
where
    TI: TextSearcher,
    VI: VectorSearcher,
{
    dataset
        .test_cases
        .iter()
        .map(|case| {
            let results = engine.rrf_search(&case.query, k, limit)?;
            let titles = results.iter().take(limit).map(|r| r.document.title.clone()).collect();
            let report = score_case(case, titles);
            tracing::debug!(query = %report.query, f1 = report.metrics.f1, "evaluated case");
            Ok(report)
        })
        .collect()
}

/// Mean of each metric across reports.
pub fn mean_metrics(reports: &[CaseReport]) -> Metrics {
    if reports.is_empty() {
        return Metrics::default();
    }
    let n = reports.len() as f64;
    let sum = reports.iter().fold(Metrics::default(), |acc, r| Metrics {
        precision: acc.precision + r.metrics.precision,
        recall: acc.recall + r.metrics.recall,
        f1: acc.f1 + r.metrics.f1,
    });
    Metrics { precision: sum.precision / n, recall: sum.recall / n, f1: sum.f1 / n }
}

const DESCRIPTION_PREVIEW: usize = 600;

pub fn judge_prompt(query: &str, results: &[ScoredResult<'_>]) -> String {
    let formatted: Vec<String> = results
        .iter()
        .map(|r| {
            let description: String = r.document.description.chars().take(DESCRIPTION_PREVIEW).collect();
            format!("'title': {},'description': {}", r.document.title, description)
        })
        .collect();
    format!(
        "Rate how relevant each result is to this query on a 0-3 scale:\n\n\
         Query: \"{query}\"\n\n\
         Results:\n{}\n\n\
         Scale:\n\
         - 3: Highly relevant\n\
         - 2: Relevant\n\
         - 1: Marginally relevant\n\
         - 0: Not relevant\n\n\
         Do NOT give any numbers out than 0, 1, 2, or 3.\n\n\
         Return ONLY the scores in the same order you were given the documents. \
         Return a valid JSON list, nothing else. For example:\n\n[2, 0, 3, 2, 0, 1]",
        formatted.join("\n")
    )
}

/// Scores from the first JSON list in the response. Empty when the list is
/// missing or holds anything other than integers in `0..=3`.
pub fn parse_judgements(raw: &str) -> Vec<u8> {
    let Some(values) = first_json_list(raw) else { return Vec::new() };
    let scores: Option<Vec<u8>> = values
        .iter()
        .map(|v| v.as_u64().filter(|s| *s <= 3).and_then(|s| u8::try_from(s).ok()))
        .collect();
    scores.unwrap_or_default()
}

/// Ask the LLM to grade `results`. Any failure yields no grades.
pub fn judge_results(llm: &dyn LlmClient, query: &str, results: &[ScoredResult<'_>]) -> Vec<u8> {
    match llm.generate(&judge_prompt(query, results)) {
        Ok(raw) => {
            let scores = parse_judgements(&raw);
            if scores.len() != results.len() {
                tracing::warn!(expected = results.len(), got = scores.len(), "judge returned unusable grades");
                return Vec::new();
            }
            scores
        }
        Err(e) => {
            tracing::warn!(error = %e, "judge call failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rankfuse_core::Document;

    fn titles(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn precision_recall_f1() {
        let retrieved = titles(&["Paddington", "Jaws", "Paddington 2", "Alien"]);
        let relevant = titles(&["Paddington", "Paddington 2", "Ted"]);
        let p = precision_at_k(&retrieved, &relevant);
        let r = recall_at_k(&retrieved, &relevant);
        assert!((p - 0.5).abs() < 1e-12);
        assert!((r - 2.0 / 3.0).abs() < 1e-12);
        assert!((f1_score(p, r) - 2.0 * 0.5 * (2.0 / 3.0) / (0.5 + 2.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn zero_denominators_are_zero() {
        assert_eq!(precision_at_k(&[], &titles(&["x"])), 0.0);
        assert_eq!(recall_at_k(&titles(&["x"]), &[]), 0.0);
        assert_eq!(f1_score(0.0, 0.0), 0.0);
        let case = TestCase { query: "q".into(), relevant_docs: vec![] };
        assert_eq!(score_case(&case, titles(&["a"])).metrics, Metrics::default());
    }

    #[test]
    fn mean_over_cases() {
        let case = TestCase { query: "q".into(), relevant_docs: titles(&["a"]) };
        let reports = vec![score_case(&case, titles(&["a"])), score_case(&case, titles(&["b"]))];
        let mean = mean_metrics(&reports);
        assert!((mean.precision - 0.5).abs() < 1e-12);
        assert!((mean.f1 - 0.5).abs() < 1e-12);
        assert_eq!(mean_metrics(&[]), Metrics::default());
    }

    #[test]
    fn judgements_parse_with_fallback() {
        assert_eq!(parse_judgements("```json\n[3, 0, 2]\n```"), vec![3, 0, 2]);
        assert!(parse_judgements("[3, 7]").is_empty());
        assert!(parse_judgements("[\"high\"]").is_empty());
        assert!(parse_judgements("no list").is_empty());
        assert_eq!(parse_judgements("Grades [0-3]: [1, 2]"), vec![1, 2]);
    }

    #[test]
    fn judge_prompt_truncates_descriptions() {
        let doc = Document::new(1, "Long", "x".repeat(1000));
        let prompt = judge_prompt("q", &[ScoredResult::new(&doc)]);
        assert!(prompt.contains(&"x".repeat(600)));
        assert!(!prompt.contains(&"x".repeat(601)));
    }
}
