//! Tolerant interpretation of generated output.
//!
//! Accepts, in order: a JSON object (bare, fenced, or embedded in prose),
//! `Answer:` / `Reasoning:` / ... sectioned text. Anything else is a
//! `MalformedGenerationOutput`, which the orchestrator degrades to raw text.

use serde::{Deserialize, Serialize};

use docqa_core::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StructuredAnswer {
    pub answer: String,
    pub reasoning: String,
    pub evidence: Vec<String>,
    pub limitations: Vec<String>,
    pub follow_up: Vec<String>,
}

impl StructuredAnswer {
    /// Unparsed output kept verbatim as the answer.
    pub fn raw(text: &str) -> Self {
        Self { answer: text.trim().to_string(), ..Self::default() }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<serde_json::Value>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) if s.trim().is_empty() => vec![],
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(items) => items
                .into_iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .filter(|s| !s.trim().is_empty())
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct WireAnswer {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    evidence: Option<OneOrMany>,
    #[serde(default)]
    limitations: Option<OneOrMany>,
    #[serde(default, alias = "follow_ups", alias = "followUp", alias = "follow-up")]
    follow_up: Option<OneOrMany>,
}

pub fn parse_answer(raw: &str) -> Result<StructuredAnswer> {
    if let Some(parsed) = parse_json(raw) {
        return Ok(parsed);
    }
    if let Some(parsed) = parse_sections(raw) {
        return Ok(parsed);
    }
    Err(Error::MalformedGenerationOutput(format!(
        "no JSON object or answer sections in {} bytes of output",
        raw.len()
    )))
}

fn parse_json(raw: &str) -> Option<StructuredAnswer> {
    let candidate = strip_fence(raw).unwrap_or(raw);
    let start = candidate.find('{')?;
    let end = candidate.rfind('}')?;
    if end <= start {
        return None;
    }
    let wire: WireAnswer = serde_json::from_str(&candidate[start..=end]).ok()?;
    let answer = wire.answer.unwrap_or_default();
    if answer.trim().is_empty() {
        return None;
    }
    Some(StructuredAnswer {
        answer: answer.trim().to_string(),
        reasoning: wire.reasoning.unwrap_or_default().trim().to_string(),
        evidence: wire.evidence.map(OneOrMany::into_vec).unwrap_or_default(),
        limitations: wire.limitations.map(OneOrMany::into_vec).unwrap_or_default(),
        follow_up: wire.follow_up.map(OneOrMany::into_vec).unwrap_or_default(),
    })
}

/// Body of the first ``` fence, with an optional language tag dropped.
fn strip_fence(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let after = &raw[open + 3..];
    let body_start = after.find('\n').map_or(0, |i| i + 1);
    let body = &after[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Answer,
    Reasoning,
    Evidence,
    Limitations,
    FollowUp,
}

fn section_header(line: &str) -> Option<(Section, &str)> {
    let (head, rest) = line.split_once(':')?;
    let key = head
        .trim()
        .trim_matches(|c: char| c == '*' || c == '#')
        .trim()
        .to_ascii_lowercase()
        .replace(['-', '_'], " ");
    let section = match key.as_str() {
        "answer" => Section::Answer,
        "reasoning" => Section::Reasoning,
        "evidence" => Section::Evidence,
        "limitations" => Section::Limitations,
        "follow up" | "follow ups" | "follow up questions" => Section::FollowUp,
        _ => return None,
    };
    Some((section, rest.trim_start_matches('*').trim()))
}

fn list_item(line: &str) -> &str {
    let t = line.trim();
    let t = t.trim_start_matches(['-', '*', '•']).trim_start();
    let digits = t.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && t[digits..].starts_with(['.', ')']) {
        t[digits + 1..].trim_start()
    } else {
        t
    }
}

fn parse_sections(raw: &str) -> Option<StructuredAnswer> {
    let mut out = StructuredAnswer::default();
    let mut current: Option<Section> = None;
    let mut answer_lines: Vec<&str> = Vec::new();
    let mut reasoning_lines: Vec<&str> = Vec::new();

    for line in raw.lines() {
        let (section, inline) = match section_header(line) {
            Some((s, rest)) => {
                current = Some(s);
                (s, rest)
            }
            None => match current {
                Some(s) => (s, line.trim()),
                None => continue,
            },
        };
        if inline.is_empty() {
            continue;
        }
        match section {
            Section::Answer => answer_lines.push(inline),
            Section::Reasoning => reasoning_lines.push(inline),
            Section::Evidence => out.evidence.push(list_item(inline).to_string()),
            Section::Limitations => out.limitations.push(list_item(inline).to_string()),
            Section::FollowUp => out.follow_up.push(list_item(inline).to_string()),
        }
    }

    out.answer = answer_lines.join(" ");
    out.reasoning = reasoning_lines.join(" ");
    if out.answer.trim().is_empty() { None } else { Some(out) }
}
