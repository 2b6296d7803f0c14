use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Feedback attached to a usable score that came without any
pub const NO_FEEDBACK: &str = "No feedback provided";

/// Feedback of the fail-closed verdict
pub const PARSE_FAILURE_FEEDBACK: &str =
    "Cannot parse evaluation response - please check template format";

/// Delimiters tried, in order, before bare JSON
const DELIMITERS: [&str; 2] = ["result", "evaluation"];

lazy_static! {
    static ref LOOSE_SCORE: Regex =
        Regex::new(r#"(?i)"?\bscore\b"?\s*[:=]\s*"?(-?\d+(?:\.\d+)?)"#).unwrap();
    static ref ANY_SCORE: Regex = Regex::new(r#"(?i)"?\bscore\b"?\s*[:=]\s*"?([^\s,"}]+)"#).unwrap();
    static ref LOOSE_FEEDBACK: Regex =
        Regex::new(r#"(?is)"?\bfeedback\b"?\s*[:=]\s*"((?:[^"\\]|\\.)*)""#).unwrap();
}

/// Where in the response the verdict was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    /// JSON inside `<result>` or `<evaluation>`
    Delimited,
    /// JSON object without delimiters
    Json,
    /// `score: <number>` scanning
    Loose,
    /// Nothing usable; fail-closed default
    Unparsed,
}

/// Score and feedback extracted from a critic response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Always within [0, 1]
    pub score: f64,
    /// Never empty
    pub feedback: String,
    pub source: VerdictSource,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerdictParseError {
    #[error("No score found in critic output")]
    NoScoreFound,

    #[error("Score is not a finite number: {0}")]
    InvalidScore(String),
}

impl Verdict {
    /// Parse a critic response. Never fails: unusable text yields score 0.0.
    ///
    /// Expected format:
    /// ```text
    /// <result>
    /// {"score": 0.82, "feedback": "..."}
    /// </result>
    /// ```
    pub fn parse(critic_output: &str) -> Self {
        match Self::try_parse(critic_output) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(error = %e, raw = critic_output, "Unparseable critic response");
                Self::unparsed()
            }
        }
    }

    /// Parse without the fail-closed fallback
    pub fn try_parse(critic_output: &str) -> Result<Self, VerdictParseError> {
        debug!(output_len = critic_output.len(), "Parsing critic verdict");

        let candidates = json_candidates(critic_output);
        // A score-only object counts only when no object anywhere has feedback
        let chosen = candidates
            .iter()
            .find(|c| c.has_feedback)
            .or_else(|| candidates.first());
        if let Some(candidate) = chosen {
            return Ok(candidate.verdict.clone());
        }

        Self::parse_loose(critic_output)
    }

    /// The fail-closed verdict
    pub fn unparsed() -> Self {
        Self {
            score: 0.0,
            feedback: PARSE_FAILURE_FEEDBACK.to_string(),
            source: VerdictSource::Unparsed,
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.source != VerdictSource::Unparsed
    }

    fn parse_loose(output: &str) -> Result<Self, VerdictParseError> {
        let Some(captures) = LOOSE_SCORE.captures(output) else {
            return Err(match ANY_SCORE.captures(output) {
                Some(c) => VerdictParseError::InvalidScore(c[1].to_string()),
                None => VerdictParseError::NoScoreFound,
            });
        };

        let score = captures[1]
            .parse::<f64>()
            .ok()
            .filter(|s| s.is_finite())
            .ok_or_else(|| VerdictParseError::InvalidScore(captures[1].to_string()))?;

        let feedback = LOOSE_FEEDBACK
            .captures(output)
            .map(|c| c[1].replace("\\n", "\n").replace("\\\"", "\""))
            .unwrap_or_default();

        debug!(score, "Parsed verdict via loose scanning");
        Ok(Self::new(score, feedback, VerdictSource::Loose))
    }

    fn new(score: f64, feedback: String, source: VerdictSource) -> Self {
        let feedback = feedback.trim();
        Self {
            score: score.clamp(0.0, 1.0),
            feedback: if feedback.is_empty() {
                NO_FEEDBACK.to_string()
            } else {
                feedback.to_string()
            },
            source,
        }
    }
}

/// Every complete `<tag>...</tag>` block, in order
fn tag_blocks<'a>(text: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(&open) {
        let body = &rest[start + open.len()..];
        match body.find(&close) {
            Some(end) => {
                blocks.push(&body[..end]);
                rest = &body[end + close.len()..];
            }
            None => break,
        }
    }
    blocks
}

/// A JSON object with a usable score
struct Candidate {
    verdict: Verdict,
    has_feedback: bool,
}

/// Scored JSON objects in priority order: delimited blocks first, then bare JSON
fn json_candidates(text: &str) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for tag in DELIMITERS {
        for block in tag_blocks(text, tag) {
            candidates.extend(json_objects(block, VerdictSource::Delimited));
        }
    }
    candidates.extend(json_objects(text, VerdictSource::Json));
    candidates
}

/// Every JSON object in `text` that carries a usable score, in order
fn json_objects(text: &str, source: VerdictSource) -> Vec<Candidate> {
    text.char_indices()
        .filter(|(_, c)| *c == '{')
        .filter_map(|(i, _)| {
            let value = serde_json::Deserializer::from_str(&text[i..])
                .into_iter::<Value>()
                .next()?
                .ok()?;
            candidate_from_value(&value, source)
        })
        .collect()
}

fn candidate_from_value(value: &Value, source: VerdictSource) -> Option<Candidate> {
    let object = value.as_object()?;
    let score = match object.get("score")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !score.is_finite() {
        return None;
    }

    let feedback = match object.get("feedback") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    };

    Some(Candidate {
        has_feedback: feedback.is_some(),
        verdict: Verdict::new(score, feedback.unwrap_or_default(), source),
    })
}
