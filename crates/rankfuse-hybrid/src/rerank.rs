//! Post-fusion reordering through an external relevance oracle.
//!
//! Oracle output is untrusted: anything that does not parse degrades to the
//! documented fallback and is logged at `warn`, never returned as an error.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

use rankfuse_core::{DocId, Document, ScoredResult};

/// Text-in, text-out language model.
pub trait LlmClient {
    fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Scores `(query, document text)` pairs; one score per pair, higher is better.
pub trait CrossEncoder {
    fn score_pairs(&self, pairs: &[(String, String)]) -> anyhow::Result<Vec<f64>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankMethod {
    Individual,
    Batch,
    CrossEncoder,
}

impl FromStr for RerankMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual" => Ok(Self::Individual),
            "batch" => Ok(Self::Batch),
            "cross-encoder" | "cross_encoder" => Ok(Self::CrossEncoder),
            other => Err(format!("unknown rerank method '{other}' (expected individual, batch or cross-encoder)")),
        }
    }
}

impl fmt::Display for RerankMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Individual => "individual",
            Self::Batch => "batch",
            Self::CrossEncoder => "cross-encoder",
        };
        f.write_str(name)
    }
}

/// A rerank strategy bound to the oracle it calls.
pub enum Reranker<'o> {
    /// One LLM call per candidate, each returning a 0-10 score.
    Individual(&'o dyn LlmClient),
    /// One LLM call returning candidate ids best first.
    Batch(&'o dyn LlmClient),
    CrossEncoder(&'o dyn CrossEncoder),
}

impl Reranker<'_> {
    pub fn method(&self) -> RerankMethod {
        match self {
            Self::Individual(_) => RerankMethod::Individual,
            Self::Batch(_) => RerankMethod::Batch,
            Self::CrossEncoder(_) => RerankMethod::CrossEncoder,
        }
    }

    /// Reorder `candidates` and keep the best `limit`.
    pub fn rerank<'a>(&self, query: &str, candidates: Vec<ScoredResult<'a>>, limit: usize) -> Vec<ScoredResult<'a>> {
        let mut reranked = match self {
            Self::Individual(llm) => rerank_individual(*llm, query, candidates),
            Self::Batch(llm) => rerank_batch(*llm, query, candidates),
            Self::CrossEncoder(model) => rerank_cross_encoder(*model, query, candidates),
        };
        reranked.truncate(limit);
        tracing::debug!(method = %self.method(), kept = reranked.len(), "reranked");
        reranked
    }
}

fn assign_ranks(results: &mut [ScoredResult<'_>]) {
    for (i, r) in results.iter_mut().enumerate() {
        r.rerank_rank = Some(i + 1);
    }
}

fn sort_by_rerank_score(results: &mut [ScoredResult<'_>]) {
    results.sort_by(|a, b| b.rerank_score.unwrap_or(0.0).total_cmp(&a.rerank_score.unwrap_or(0.0)));
}

fn rerank_individual<'a>(llm: &dyn LlmClient, query: &str, mut candidates: Vec<ScoredResult<'a>>) -> Vec<ScoredResult<'a>> {
    for c in &mut candidates {
        let prompt = individual_prompt(query, c.document);
        let score = match llm.generate(&prompt) {
            Ok(raw) => parse_score(&raw).unwrap_or_else(|| {
                tracing::warn!(id = c.document_id, response = %raw.trim(), "unparseable rerank score, using 0");
                0.0
            }),
            Err(e) => {
                tracing::warn!(id = c.document_id, error = %e, "rerank call failed, using 0");
                0.0
            }
        };
        c.rerank_score = Some(score);
    }
    sort_by_rerank_score(&mut candidates);
    assign_ranks(&mut candidates);
    candidates
}

fn rerank_batch<'a>(llm: &dyn LlmClient, query: &str, mut candidates: Vec<ScoredResult<'a>>) -> Vec<ScoredResult<'a>> {
    let prompt = batch_prompt(query, candidates.iter().map(|c| c.document));
    let ranking = match llm.generate(&prompt) {
        Ok(raw) => parse_id_list(&raw).or_else(|| {
            tracing::warn!(response = %raw.trim(), "unparseable batch ranking, keeping fused order");
            None
        }),
        Err(e) => {
            tracing::warn!(error = %e, "batch rerank call failed, keeping fused order");
            None
        }
    };
    let Some(mut ranking) = ranking else { return candidates };
    ranking.retain(|id| candidates.iter().any(|c| c.document_id == *id));

    for c in &mut candidates {
        let rank = ranking.iter().position(|&id| id == c.document_id).map_or(0, |p| p + 1);
        c.rerank_rank = Some(rank);
    }
    // rank 0 = not ranked by the oracle, sorts last
    candidates.sort_by_key(|c| match c.rerank_rank {
        Some(0) | None => usize::MAX,
        Some(rank) => rank,
    });
    candidates
}

fn rerank_cross_encoder<'a>(model: &dyn CrossEncoder, query: &str, mut candidates: Vec<ScoredResult<'a>>) -> Vec<ScoredResult<'a>> {
    let pairs: Vec<(String, String)> = candidates
        .iter()
        .map(|c| (query.to_string(), format!("{} - {}", c.document.title, c.document.description)))
        .collect();
    let scores = match model.score_pairs(&pairs) {
        Ok(scores) if scores.len() == pairs.len() => scores,
        Ok(scores) => {
            tracing::warn!(expected = pairs.len(), got = scores.len(), "cross-encoder returned wrong number of scores, keeping fused order");
            return candidates;
        }
        Err(e) => {
            tracing::warn!(error = %e, "cross-encoder failed, keeping fused order");
            return candidates;
        }
    };
    for (c, score) in candidates.iter_mut().zip(scores) {
        c.rerank_score = Some(score);
    }
    sort_by_rerank_score(&mut candidates);
    assign_ranks(&mut candidates);
    candidates
}

pub fn individual_prompt(query: &str, doc: &Document) -> String {
    format!(
        "Rate how well this movie matches the search query.\n\n\
         Query: \"{query}\"\n\
         Movie: {} - {}\n\n\
         Consider:\n\
         - Direct relevance to query\n\
         - User intent (what they're looking for)\n\
         - Content appropriateness\n\n\
         Rate 0-10 (10 = perfect match).\n\
         Give me ONLY the number in your response, no other text or explanation.\n\n\
         Score:",
        doc.title, doc.description
    )
}

pub fn batch_prompt<'d, I>(query: &str, docs: I) -> String
where
    I: IntoIterator<Item = &'d Document>,
{
    let listing: Vec<String> = docs
        .into_iter()
        .map(|d| serde_json::json!({ "id": d.id, "title": d.title, "description": d.description }).to_string())
        .collect();
    format!(
        "Rank these movies by relevance to the search query.\n\n\
         Query: \"{query}\"\n\n\
         Movies:\n{}\n\n\
         Return ONLY the IDs in order of relevance (best match first). \
         Return a valid JSON list, nothing else. For example:\n\n[75, 12, 34, 2, 1]",
        listing.join("\n")
    )
}

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid number regex"));

/// First number in the response.
pub fn parse_score(raw: &str) -> Option<f64> {
    NUMBER.find(raw).and_then(|m| m.as_str().parse().ok())
}

/// The first `[...]` span in an LLM response that parses as a JSON list.
/// Bracketed prose and code fences before it are skipped.
pub(crate) fn first_json_list(raw: &str) -> Option<Vec<serde_json::Value>> {
    raw.match_indices('[').find_map(|(start, _)| {
        let end = raw[start..].find(']')? + start;
        serde_json::from_str(&raw[start..=end]).ok()
    })
}

/// Ids from the first JSON list in the response. Entries that are not
/// non-negative integers are skipped; `None` when no list parses.
pub fn parse_id_list(raw: &str) -> Option<Vec<DocId>> {
    let values = first_json_list(raw)?;
    Some(
        values
            .iter()
            .filter_map(serde_json::Value::as_u64)
            .filter_map(|v| DocId::try_from(v).ok())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Scripted(RefCell<Vec<anyhow::Result<String>>>);
    impl Scripted {
        fn new(responses: Vec<anyhow::Result<String>>) -> Self {
            let mut responses = responses;
            responses.reverse();
            Self(RefCell::new(responses))
        }
    }
    impl LlmClient for Scripted {
        fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            self.0.borrow_mut().pop().unwrap_or_else(|| Err(anyhow::anyhow!("script exhausted")))
        }
    }

    struct Fixed(anyhow::Result<Vec<f64>>);
    impl CrossEncoder for Fixed {
        fn score_pairs(&self, _pairs: &[(String, String)]) -> anyhow::Result<Vec<f64>> {
            match &self.0 {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }
    }

    fn docs() -> Vec<Document> {
        vec![Document::new(10, "A", "a"), Document::new(20, "B", "b"), Document::new(30, "C", "c")]
    }

    fn candidates(docs: &[Document]) -> Vec<ScoredResult<'_>> {
        docs.iter().map(ScoredResult::new).collect()
    }

    fn ids(results: &[ScoredResult<'_>]) -> Vec<DocId> {
        results.iter().map(|r| r.document_id).collect()
    }

    #[test]
    fn parses_scores_and_id_lists() {
        assert_eq!(parse_score("Score: 7.5/10"), Some(7.5));
        assert_eq!(parse_score("8"), Some(8.0));
        assert_eq!(parse_score("no idea"), None);
        assert_eq!(parse_id_list("```json\n[30, 10]\n```"), Some(vec![30, 10]));
        assert_eq!(parse_id_list("[30, \"x\", 2.5, -1, 20]"), Some(vec![30, 20]));
        assert_eq!(parse_id_list("nothing here"), None);
        assert_eq!(parse_id_list("[30, 10"), None);
        assert_eq!(parse_id_list("Ranked [best first]: [30, 10]"), Some(vec![30, 10]));
    }

    #[test]
    fn individual_sorts_by_score_with_zero_fallback() {
        let docs = docs();
        let llm = Scripted::new(vec![Ok("3".into()), Err(anyhow::anyhow!("timeout")), Ok("9".into())]);
        let out = Reranker::Individual(&llm).rerank("q", candidates(&docs), 3);
        assert_eq!(ids(&out), vec![30, 10, 20]);
        assert_eq!(out[2].rerank_score, Some(0.0));
        assert_eq!(out[0].rerank_rank, Some(1));
    }

    #[test]
    fn batch_puts_unranked_last() {
        let docs = docs();
        let llm = Scripted::new(vec![Ok("Here you go: [30, 99, 10]".into())]);
        let out = Reranker::Batch(&llm).rerank("q", candidates(&docs), 3);
        assert_eq!(ids(&out), vec![30, 10, 20]);
        assert_eq!(out[2].rerank_rank, Some(0));
        assert_eq!(out[1].rerank_rank, Some(2));
    }

    #[test]
    fn batch_skips_bracketed_prose_before_the_list() {
        let docs = docs();
        let llm = Scripted::new(vec![Ok("Ranked [best first]: [20, 30, 10]".into())]);
        let out = Reranker::Batch(&llm).rerank("q", candidates(&docs), 3);
        assert_eq!(ids(&out), vec![20, 30, 10]);
        assert_eq!(out[0].rerank_rank, Some(1));
    }

    #[test]
    fn batch_garbage_keeps_fused_order() {
        let docs = docs();
        let llm = Scripted::new(vec![Ok("I cannot rank these".into())]);
        let out = Reranker::Batch(&llm).rerank("q", candidates(&docs), 2);
        assert_eq!(ids(&out), vec![10, 20]);
        assert!(out.iter().all(|r| r.rerank_rank.is_none()));
    }

    #[test]
    fn cross_encoder_reorders_or_falls_back() {
        let docs = docs();
        let model = Fixed(Ok(vec![0.1, 0.7, 0.4]));
        let out = Reranker::CrossEncoder(&model).rerank("q", candidates(&docs), 2);
        assert_eq!(ids(&out), vec![20, 30]);

        let short = Fixed(Ok(vec![0.1]));
        assert_eq!(ids(&Reranker::CrossEncoder(&short).rerank("q", candidates(&docs), 3)), vec![10, 20, 30]);
        let failing = Fixed(Err(anyhow::anyhow!("model missing")));
        assert_eq!(ids(&Reranker::CrossEncoder(&failing).rerank("q", candidates(&docs), 3)), vec![10, 20, 30]);
    }

    #[test]
    fn method_names_round_trip() {
        for m in [RerankMethod::Individual, RerankMethod::Batch, RerankMethod::CrossEncoder] {
            assert_eq!(m.to_string().parse::<RerankMethod>(), Ok(m));
        }
        assert!("llm".parse::<RerankMethod>().is_err());
    }
}
