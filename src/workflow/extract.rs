//! Structured block extraction from backend responses.
//!
//! Grammar, in order of preference:
//!
//! 1. The first fenced code block (```` ```json ```` or an untagged fence)
//!    whose body parses as a JSON object.
//! 2. The first balanced top-level `{ ... }` object in the text that parses.
//!
//! Anything else is a [`PlanParseError`].

use serde_json::Value;

/// No well-formed structured block was found in a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no structured plan block found in response: {reason}")]
pub struct PlanParseError {
    pub reason: String,
}

impl PlanParseError {
    fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Locate and parse the first structured JSON object in `text`.
pub fn extract_plan_block(text: &str) -> Result<Value, PlanParseError> {
    if text.trim().is_empty() {
        return Err(PlanParseError::new("response was empty"));
    }

    for body in fenced_blocks(text) {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(body.trim()) {
            return Ok(value);
        }
    }

    let mut offset = 0;
    while let Some(start) = text[offset..].find('{') {
        let start = offset + start;
        match balanced_object_end(&text[start..]) {
            Some(len) => {
                let candidate = &text[start..start + len];
                if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(candidate) {
                    return Ok(value);
                }
                // Objects nested in a malformed one are fragments, not plans
                offset = start + len;
            }
            None => break,
        }
    }

    Err(PlanParseError::new("no fenced or bare JSON object parsed"))
}

/// Bodies of fenced code blocks tagged `json` or left untagged.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after_fence = &rest[open + 3..];
        let Some(line_end) = after_fence.find('\n') else {
            break;
        };
        let info = after_fence[..line_end].trim().to_ascii_lowercase();
        let body_start = &after_fence[line_end + 1..];
        let Some(close) = body_start.find("```") else {
            break;
        };

        if info.is_empty() || info == "json" || info == "jsonc" {
            blocks.push(&body_start[..close]);
        }
        rest = &body_start[close + 3..];
    }

    blocks
}

/// Byte length of the balanced object starting at `text[0] == '{'`.
///
/// Braces inside JSON strings (including escaped quotes) are ignored.
fn balanced_object_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}
