use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use docqa_core::error::{Error, Result};
use docqa_core::traits::WebSearch;
use docqa_core::types::{Provenance, SearchResult, WebSnippet};

const MAX_RELATED: usize = 3;

/// Web fallback over the DuckDuckGo Instant Answer API.
///
/// Snippets come from the abstract, the direct answer and up to three related
/// topics, scored 1.0, 0.9, 0.8, ... in that order.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    url: String,
}

impl DuckDuckGoSearch {
    pub fn new(url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), url: url.into() }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstantAnswer {
    #[serde(rename = "AbstractText")]
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    #[serde(rename = "Answer")]
    answer: String,
    #[serde(rename = "RelatedTopics")]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RelatedTopic {
    #[serde(rename = "Text")]
    text: String,
    #[serde(rename = "FirstURL")]
    first_url: String,
}

fn snippets_from(answer: InstantAnswer) -> Vec<WebSnippet> {
    let mut out = Vec::new();
    if !answer.abstract_text.is_empty() {
        out.push((answer.abstract_text, answer.abstract_url.clone()));
    }
    if !answer.answer.is_empty() {
        out.push((answer.answer, answer.abstract_url));
    }
    out.extend(
        answer
            .related_topics
            .into_iter()
            .filter(|t| !t.text.is_empty())
            .take(MAX_RELATED)
            .map(|t| (t.text, t.first_url)),
    );
    out.into_iter()
        .enumerate()
        .map(|(i, (text, url))| WebSnippet { text, url, score: (1.0 - 0.1 * i as f32).max(0.1) })
        .collect()
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<WebSnippet>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", query), ("format", "json"), ("no_html", "1"), ("skip_disambig", "1")])
            .send()
            .await
            .map_err(|e| Error::WebSearchUnavailable(format!("request failed: {e}")))?;
        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, "web search returned error status");
            return Err(Error::WebSearchUnavailable(format!("status {status}")));
        }
        let answer: InstantAnswer = response
            .json()
            .await
            .map_err(|e| Error::WebSearchUnavailable(format!("failed to parse response: {e}")))?;
        let snippets = snippets_from(answer);
        debug!(snippets = snippets.len(), "web search results");
        Ok(snippets)
    }
}

/// Turns snippets into `web` results scaled under `cap`, keeping their order.
pub fn web_results(snippets: Vec<WebSnippet>, cap: f32) -> Vec<SearchResult> {
    let mut out: Vec<SearchResult> = snippets
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .enumerate()
        .map(|(i, s)| SearchResult {
            id: format!("web:{i}"),
            chunk: None,
            content: s.text,
            score: s.score.clamp(0.0, 1.0) * cap,
            adjusted_score: None,
            provenance: Provenance::Web { url: s.url },
        })
        .collect();
    // stable: equal scores keep the provider's order
    out.sort_by(|a, b| b.score.total_cmp(&a.score));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_instant_answer_payload() {
        let body = r#"{
            "AbstractText": "Knee replacement is a surgical procedure.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Knee_replacement",
            "Answer": "",
            "RelatedTopics": [
                {"Text": "Arthroscopy", "FirstURL": "https://duckduckgo.com/Arthroscopy"},
                {"Name": "group", "Topics": []},
                {"Text": "Meniscus", "FirstURL": "https://duckduckgo.com/Meniscus"}
            ]
        }"#;
        let parsed: InstantAnswer = serde_json::from_str(body).unwrap();
        let snippets = snippets_from(parsed);
        assert_eq!(snippets.len(), 3);
        assert_eq!(snippets[0].url, "https://en.wikipedia.org/wiki/Knee_replacement");
        assert!(snippets[0].score > snippets[1].score && snippets[1].score > snippets[2].score);
    }

    #[test]
    fn web_scores_stay_under_cap() {
        let rs = web_results(
            vec![
                WebSnippet { text: "a".into(), url: "u1".into(), score: 1.0 },
                WebSnippet { text: " ".into(), url: "u2".into(), score: 0.9 },
                WebSnippet { text: "b".into(), url: "u3".into(), score: 0.8 },
            ],
            0.3,
        );
        assert_eq!(rs.len(), 2);
        assert!(rs.iter().all(|r| r.score <= 0.3 && r.provenance.is_web()));
    }
}
