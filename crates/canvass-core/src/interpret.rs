//! LLM response interpretation.
//!
//! Completions arrive in three competing dialects, reflecting an evolving
//! wire contract with the prompt templates:
//!
//! 1. the bare sentinel token `NO_PROBE` (answer judged sufficient),
//! 2. a structured JSON payload, fenced or inline, with an `action`
//!    field (`probe` / `no_probe`) and a follow-up `text`,
//! 3. free text, classified by the sufficient/insufficient heuristic.
//!
//! The dialects are tried in that order; a malformed structured payload
//! falls back to the free-text heuristic against the same raw text instead
//! of surfacing a parse error. Heuristic verdicts are flagged on the result
//! so callers can make the fallback observable. Interpretation is a pure
//! function: no I/O, no shared state.

use crate::answer::AnswerValue;
use crate::question::Question;
use crate::verdict::Verdict;
use serde::Deserialize;

/// Sentinel completion meaning "the answer is sufficient, do not probe".
pub const NO_PROBE_SENTINEL: &str = "NO_PROBE";

const PROBE_ACTION: &str = "probe";
const NO_PROBE_ACTION: &str = "no_probe";
const INSUFFICIENT_TOKEN: &str = "insufficient";

/// The structured payload dialect.
#[derive(Debug, Deserialize)]
struct ProbeDirective {
    action: String,
    #[serde(default)]
    text: Option<String>,
}

/// Interprets one raw completion into a verdict for the given
/// question/answer pair.
///
/// Never fails: an uninterpretable (empty) completion yields a verdict
/// with `valid == None`, which the merge step treats as a failed
/// validation.
pub fn interpret_response(question: &Question, answer: &AnswerValue, raw: &str) -> Verdict {
    let mut verdict = Verdict {
        question_id: question.id.clone(),
        valid: None,
        follow_up: None,
        question_prompt: question.prompt.clone(),
        answer_value: answer.clone(),
        heuristic_fallback: false,
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return verdict;
    }

    // Bare sentinel.
    if trimmed.eq_ignore_ascii_case(NO_PROBE_SENTINEL) {
        verdict.valid = Some(true);
        return verdict;
    }

    // Structured payload, fenced or inline.
    if let Some((valid, follow_up)) = parse_directive(trimmed) {
        verdict.valid = Some(valid);
        verdict.follow_up = follow_up;
        return verdict;
    }

    // Last resort: free-text heuristic.
    let (valid, follow_up) = free_text_heuristic(trimmed);
    verdict.valid = Some(valid);
    verdict.follow_up = follow_up;
    verdict.heuristic_fallback = true;
    verdict
}

/// Extracts and parses a structured directive from the completion.
///
/// Returns `None` when no payload is found, the payload is malformed, or
/// the action is unrecognized; all of these fall through to the free-text
/// heuristic.
fn parse_directive(raw: &str) -> Option<(bool, Option<String>)> {
    let candidate = extract_fenced_block(raw).or_else(|| extract_braced(raw))?;
    let directive: ProbeDirective = serde_json::from_str(candidate).ok()?;

    match directive.action.trim().to_lowercase().as_str() {
        PROBE_ACTION => {
            let text = directive.text?;
            if text.trim().is_empty() {
                return None;
            }
            Some((false, Some(text.trim().to_string())))
        }
        NO_PROBE_ACTION => Some((true, None)),
        _ => None,
    }
}

/// Returns the body of the first fenced code block, with any `json`
/// language tag stripped.
fn extract_fenced_block(raw: &str) -> Option<&str> {
    let start = raw.find("```")?;
    let after = &raw[start + 3..];
    let end = after.find("```")?;
    let body = after[..end].trim();
    let body = body.strip_prefix("json").unwrap_or(body).trim();
    if body.is_empty() { None } else { Some(body) }
}

/// Returns the outermost brace-delimited span of the text.
fn extract_braced(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end > start { Some(&raw[start..=end]) } else { None }
}

/// Classifies free text: a leading "insufficient" token makes the rest the
/// follow-up question; any other mention of "sufficient" counts as
/// approval; everything else is treated wholesale as a follow-up.
fn free_text_heuristic(raw: &str) -> (bool, Option<String>) {
    let lower = raw.to_lowercase();
    if lower.starts_with(INSUFFICIENT_TOKEN) {
        let rest = raw[INSUFFICIENT_TOKEN.len()..]
            .trim_start_matches([':', ',', '.', '-'])
            .trim();
        let follow_up = if rest.is_empty() { None } else { Some(rest.to_string()) };
        return (false, follow_up);
    }
    if lower.contains("sufficient") {
        return (true, None);
    }
    (false, Some(raw.to_string()))
}
