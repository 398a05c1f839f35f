use std::fmt;
use std::str::FromStr;

use crate::rerank::LlmClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhanceMethod {
    Spell,
    Rewrite,
    Expand,
}

impl FromStr for EnhanceMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spell" => Ok(Self::Spell),
            "rewrite" => Ok(Self::Rewrite),
            "expand" => Ok(Self::Expand),
            other => Err(format!("unknown enhancement '{other}' (expected spell, rewrite or expand)")),
        }
    }
}

impl fmt::Display for EnhanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Spell => "spell",
            Self::Rewrite => "rewrite",
            Self::Expand => "expand",
        })
    }
}

/// Outcome of asking the LLM to improve a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enhancement {
    Enhanced(String),
    Failed { reason: String },
}

impl Enhancement {
    /// The enhanced query, or `original` when enhancement failed.
    pub fn query_or(self, original: &str) -> String {
        match self {
            Self::Enhanced(q) => q,
            Self::Failed { reason } => {
                tracing::warn!(%reason, "query enhancement failed, using original query");
                original.to_string()
            }
        }
    }
}

pub fn prompt(method: EnhanceMethod, query: &str) -> String {
    match method {
        EnhanceMethod::Spell => format!(
            "Fix any spelling errors in this movie search query.\n\
             Only correct obvious typos. Don't change correctly spelled words.\n\
             Query: \"{query}\"\n\
             If no errors, return the original query.\n\
             Corrected:"
        ),
        EnhanceMethod::Rewrite => format!(
            "Rewrite this movie search query to be more specific and searchable.\n\n\
             Original: \"{query}\"\n\n\
             Consider:\n\
             - Common movie knowledge (famous actors, popular films)\n\
             - Genre conventions (horror = scary, animation = cartoon)\n\
             - Keep it concise (under 10 words)\n\
             - It should be a google style search query that's very specific\n\
             - Don't use boolean logic\n\n\
             Examples:\n\n\
             - \"that bear movie where leo gets attacked\" -> \"The Revenant Leonardo DiCaprio bear attack\"\n\
             - \"movie about bear in london with marmalade\" -> \"Paddington London marmalade\"\n\
             - \"scary movie with bear from few years ago\" -> \"bear horror movie 2015-2020\"\n\n\
             Rewritten query:"
        ),
        EnhanceMethod::Expand => format!(
            "Expand this movie search query with related terms.\n\n\
             Add synonyms and related concepts that might appear in movie descriptions.\n\
             Keep expansions relevant and focused.\n\
             This will be appended to the original query.\n\n\
             Examples:\n\n\
             - \"scary bear movie\" -> \"scary horror grizzly bear movie terrifying film\"\n\
             - \"action movie with bear\" -> \"action thriller bear chase fight adventure\"\n\
             - \"comedy with bear\" -> \"comedy funny bear humor lighthearted\"\n\n\
             Query: \"{query}\""
        ),
    }
}

fn strip_wrapping(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(inner) = s.strip_prefix("```") {
        // drop an optional language tag on the opening fence
        let inner = inner.split_once('\n').map_or(inner, |(_, rest)| rest);
        s = inner.strip_suffix("```").unwrap_or(inner).trim();
    }
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            s = s[1..s.len() - 1].trim();
        }
    }
    s
}

/// Interpret a raw LLM response for `method`.
pub fn parse_response(method: EnhanceMethod, query: &str, raw: &str) -> Enhancement {
    let text = strip_wrapping(raw);
    if text.is_empty() {
        return Enhancement::Failed { reason: "empty response".to_string() };
    }
    match method {
        EnhanceMethod::Expand => Enhancement::Enhanced(format!("{query} {text}")),
        EnhanceMethod::Spell | EnhanceMethod::Rewrite => Enhancement::Enhanced(text.to_string()),
    }
}

pub fn enhance_query(llm: &dyn LlmClient, method: EnhanceMethod, query: &str) -> Enhancement {
    let enhancement = match llm.generate(&prompt(method, query)) {
        Ok(raw) => parse_response(method, query, &raw),
        Err(e) => Enhancement::Failed { reason: format!("{e:#}") },
    };
    if let Enhancement::Enhanced(q) = &enhancement {
        tracing::info!(%method, original = query, enhanced = %q, "enhanced query");
    }
    enhancement
}
