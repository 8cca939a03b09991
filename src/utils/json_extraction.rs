//! JSON extraction from LLM replies.
//!
//! Structured-generation replies frequently arrive wrapped in markdown code
//! fences or surrounded by explanatory prose. The helpers here pull the JSON
//! payload out of such replies, trying strategies in order:
//!
//! 1. Direct JSON (reply starts with '{' or '[')
//! 2. JSON inside a ```json code fence
//! 3. JSON inside a generic ``` code fence
//! 4. First balanced object/array anywhere in the reply
//!
//! Truncated payloads (an opening brace without its close) are detected and
//! reported rather than returned as malformed JSON.

use regex::Regex;
use thiserror::Error;

/// Error raised when no usable JSON can be pulled from a reply.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JsonExtractionError {
    #[error("JSON appears truncated: {unclosed} unclosed delimiters. Partial: {preview}...")]
    Truncated { preview: String, unclosed: usize },

    #[error("No JSON content found in reply. Content starts with: '{preview}'")]
    NotFound { preview: String },
}

/// Extracts the JSON payload from an LLM reply.
pub fn extract_json_from_reply(content: &str) -> Result<String, JsonExtractionError> {
    let trimmed = content.trim();

    // Direct JSON reply.
    if trimmed.starts_with('{') {
        if let Some(end) = find_matching_brace(trimmed) {
            return Ok(trimmed[..=end].to_string());
        }
        return Err(truncated(trimmed));
    }
    if trimmed.starts_with('[') {
        if let Some(end) = find_matching_bracket(trimmed) {
            return Ok(trimmed[..=end].to_string());
        }
        return Err(truncated(trimmed));
    }

    // Fenced code blocks, json-tagged first.
    if let Some(block) = extract_from_code_block(trimmed) {
        return Ok(block);
    }

    // Balanced object or array anywhere in the reply.
    if let Some(start) = trimmed.find(['{', '[']) {
        let tail = &trimmed[start..];
        let end = if tail.starts_with('{') {
            find_matching_brace(tail)
        } else {
            find_matching_bracket(tail)
        };
        match end {
            Some(end) => return Ok(tail[..=end].to_string()),
            None => return Err(truncated(tail)),
        }
    }

    let preview: String = trimmed.chars().take(50).collect();
    Err(JsonExtractionError::NotFound { preview })
}

fn truncated(partial: &str) -> JsonExtractionError {
    let unclosed = unclosed_delimiters(partial);
    let preview: String = partial.chars().take(80).collect();
    JsonExtractionError::Truncated { preview, unclosed }
}

/// Open delimiters without a matching close, string-literal aware. Stray
/// closers inside string content must not count against the openers.
fn unclosed_delimiters(s: &str) -> usize {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for &b in s.as_bytes() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            _ if in_string => {}
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth
}

/// Pulls the body of the first ```json (or generic ```) code fence.
fn extract_from_code_block(content: &str) -> Option<String> {
    // `(?s)` so the body may span lines.
    let fence = Regex::new(r"(?s)```(?:json)?\s*(.*?)```").ok()?;
    let captured = fence.captures(content)?.get(1)?.as_str().trim();
    if captured.starts_with('{') || captured.starts_with('[') {
        Some(captured.to_string())
    } else {
        None
    }
}

/// Index of the '}' matching the leading '{' of `s`, string-literal aware.
pub fn find_matching_brace(s: &str) -> Option<usize> {
    find_matching(s, b'{', b'}')
}

/// Index of the ']' matching the leading '[' of `s`, string-literal aware.
pub fn find_matching_bracket(s: &str) -> Option<usize> {
    find_matching(s, b'[', b']')
}

fn find_matching(s: &str, open: u8, close: u8) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&open) {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            _ if in_string => {}
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
