//! Defensive JSON extraction from model output.
//!
//! Model responses arrive as Markdown-wrapped, prose-prefixed, or outright
//! broken JSON. Extraction runs in layers: preprocess away non-JSON content,
//! prefer a fenced block, fall back to direct parse, then to the outermost
//! bracketed region, repairing common formatting mistakes before each retry
//! and recovering truncated tails where possible.

use std::io::Write;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{LlmError, LlmResult};

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("fence regex"));
static OUTERMOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]|\{.*\}").expect("outermost regex"));
static ADJACENT_OBJECTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\}\s*\{").expect("adjacent objects regex"));
static ADJACENT_ARRAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]\s*\[").expect("adjacent arrays regex"));
static TRAILING_COMMA_OBJ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\}").expect("trailing comma regex"));
static TRAILING_COMMA_ARR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\]").expect("trailing comma regex"));
static SINGLE_QUOTED_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']*?)'\s*:").expect("single-quoted key regex"));
static SINGLE_QUOTED_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*'([^']*?)'").expect("single-quoted value regex"));
static UNQUOTED_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*:").expect("unquoted key regex"));

/// Parse a model response into a JSON value, with layered tolerance.
///
/// On total failure the raw response is dumped to a temp file for debugging
/// and [`LlmError::Unparsable`] is returned.
pub fn parse_json(raw: &str) -> LlmResult<Value> {
    let response = raw.trim();
    let mut response = preprocess(response);

    // Truncated responses ending in an ellipsis get the tail repair up front
    if (response.ends_with("...") || response.ends_with('…'))
        && (response.starts_with('[') || response.starts_with('{'))
    {
        debug!("detected truncated JSON, attempting tail repair");
        response = fix_truncated(&response);
    }

    // 1. Prefer a fenced code block when one survived preprocessing
    if let Some(caps) = FENCED_BLOCK.captures(raw) {
        let fenced = sanitize(caps.get(1).map(|m| m.as_str()).unwrap_or(""));
        match serde_json::from_str(&fenced) {
            Ok(v) => return Ok(v),
            Err(e) => {
                warn!(error = %e, "fenced block failed to parse, repairing");
                if let Ok(v) = serde_json::from_str::<Value>(&fix_common_errors(&fenced)) {
                    return Ok(v);
                }
            }
        }
    }

    // 2. Direct parse of the preprocessed response, repaired on failure
    let sanitized = sanitize(&response);
    if let Ok(v) = serde_json::from_str(&sanitized) {
        return Ok(v);
    }
    if sanitized.starts_with('[') || sanitized.starts_with('{') {
        if let Ok(v) = serde_json::from_str::<Value>(&fix_common_errors(&sanitized)) {
            return Ok(v);
        }
    }

    // 3. Outermost bracketed region
    if let Some(m) = OUTERMOST.find(&response) {
        let region = sanitize(m.as_str());
        match serde_json::from_str(&region) {
            Ok(v) => return Ok(v),
            Err(e) => {
                warn!(error = %e, "outermost region failed to parse, repairing");
                if let Ok(v) = serde_json::from_str::<Value>(&fix_common_errors(&region)) {
                    return Ok(v);
                }
                if let Ok(v) = serde_json::from_str::<Value>(&fix_common_errors(&fix_truncated(&region))) {
                    return Ok(v);
                }
            }
        }
    }

    dump_for_debugging(raw);
    Err(LlmError::Unparsable {
        preview: raw.chars().take(200).collect(),
    })
}

/// Strip BOM, surrounding whitespace, and control characters that break the
/// parser (newlines and tabs are kept).
fn sanitize(s: &str) -> String {
    s.trim_start_matches('\u{feff}')
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
        .collect()
}

/// Drop leading explanatory prose up to the first line that opens a JSON
/// structure, and anything after a closing fence.
fn preprocess(response: &str) -> String {
    let lines: Vec<&str> = response.lines().collect();
    let json_start = lines.iter().position(|line| {
        let s = line.trim_start();
        s.starts_with('[') || s.starts_with('{')
    });

    let mut out = match json_start {
        Some(i) => lines[i..].join("\n"),
        None => response.to_string(),
    };

    if let Some(pos) = out.find("```") {
        out.truncate(pos);
    }

    out.trim().to_string()
}

/// Repair the common formatting mistakes model output exhibits.
fn fix_common_errors(json_str: &str) -> String {
    let mut s = ADJACENT_OBJECTS.replace_all(json_str, "},{").into_owned();
    s = ADJACENT_ARRAYS.replace_all(&s, "],[").into_owned();
    s = TRAILING_COMMA_OBJ.replace_all(&s, "}").into_owned();
    s = TRAILING_COMMA_ARR.replace_all(&s, "]").into_owned();
    s = SINGLE_QUOTED_KEY.replace_all(&s, "\"$1\":").into_owned();
    s = SINGLE_QUOTED_VALUE.replace_all(&s, ": \"$1\"").into_owned();
    s = UNQUOTED_KEY.replace_all(&s, "\"$1\":").into_owned();
    balance_closers(&s)
}

/// Recover a truncated response: strip the ellipsis, close an unterminated
/// string, and re-balance braces and brackets.
fn fix_truncated(json_str: &str) -> String {
    let mut s = json_str
        .trim_end_matches('…')
        .trim_end_matches("...")
        .to_string();

    if s.matches('"').count() % 2 == 1 {
        s.push('"');
    }

    s = balance_closers(&s);

    // If nothing closes the structure, cut back to the last closer
    if !s.ends_with('}') && !s.ends_with(']') {
        if let Some(pos) = s.rfind(|c| c == '}' || c == ']') {
            s.truncate(pos + 1);
        }
    }

    s
}

/// Append missing `}` / `]` closers so counts match.
fn balance_closers(json_str: &str) -> String {
    let mut s = json_str.to_string();
    let open_braces = s.matches('{').count();
    let close_braces = s.matches('}').count();
    let open_brackets = s.matches('[').count();
    let close_brackets = s.matches(']').count();

    if open_brackets > close_brackets {
        // Close inner objects before the enclosing array
        if open_braces > close_braces {
            s.push_str(&"}".repeat(open_braces - close_braces));
        }
        s.push_str(&"]".repeat(open_brackets - close_brackets));
    } else if open_braces > close_braces {
        s.push_str(&"}".repeat(open_braces - close_braces));
    }
    s
}

fn dump_for_debugging(raw: &str) {
    match tempfile::Builder::new()
        .prefix("llm_raw_")
        .suffix(".txt")
        .tempfile()
    {
        Ok(mut file) => {
            let _ = file.write_all(raw.as_bytes());
            match file.keep() {
                Ok((_, path)) => error!(path = %path.display(), "unparsable response saved for debugging"),
                Err(e) => error!(error = %e, "failed to keep raw response dump"),
            }
        }
        Err(e) => error!(error = %e, "failed to create raw response dump"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json() {
        assert_eq!(parse_json(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(parse_json(r#"[1, 2, 3]"#).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_fenced_block() {
        let raw = "Here is the result:\n```json\n[{\"outline\": \"A\"}]\n```\nDone.";
        assert_eq!(parse_json(raw).unwrap(), json!([{"outline": "A"}]));
    }

    #[test]
    fn test_fence_without_language_tag() {
        let raw = "```\n{\"x\": true}\n```";
        assert_eq!(parse_json(raw).unwrap(), json!({"x": true}));
    }

    #[test]
    fn test_leading_prose_stripped() {
        let raw = "Sure! The timeline you asked for:\n[{\"id\": 1}]";
        assert_eq!(parse_json(raw).unwrap(), json!([{"id": 1}]));
    }

    #[test]
    fn test_bom_stripped() {
        let raw = "\u{feff}{\"a\": 1}";
        assert_eq!(parse_json(raw).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_missing_comma_between_objects() {
        let raw = "[{\"a\": 1} {\"b\": 2}]";
        assert_eq!(parse_json(raw).unwrap(), json!([{"a": 1}, {"b": 2}]));
    }

    #[test]
    fn test_trailing_comma() {
        let raw = "[{\"a\": 1},]";
        assert_eq!(parse_json(raw).unwrap(), json!([{"a": 1}]));
    }

    #[test]
    fn test_single_quotes() {
        let raw = "[{'title': 'hello'}]";
        assert_eq!(parse_json(raw).unwrap(), json!([{"title": "hello"}]));
    }

    #[test]
    fn test_unquoted_keys() {
        let raw = "[{title: \"hello\"}]";
        assert_eq!(parse_json(raw).unwrap(), json!([{"title": "hello"}]));
    }

    #[test]
    fn test_missing_closers_appended() {
        let raw = "[{\"a\": 1}, {\"b\": 2}";
        assert_eq!(parse_json(raw).unwrap(), json!([{"a": 1}, {"b": 2}]));
    }

    #[test]
    fn test_truncated_mid_string() {
        // Ends inside a string value with an ellipsis; the broken element
        // keeps only the fields that made it, later validation drops it
        let raw = "[{\"outline\": \"Investing\", \"start_time\": \"00:00:02,500\", \"end_time\": \"00:00:05,000\"}, {\"outline\": \"Cook…";
        let parsed = parse_json(raw).unwrap();
        let arr = parsed.as_array().unwrap();
        assert_eq!(arr[0]["outline"], "Investing");
        assert_eq!(arr[0]["end_time"], "00:00:05,000");
    }

    #[test]
    fn test_hopeless_input_is_unparsable() {
        let raw = "I could not produce any structured output, sorry.";
        assert!(matches!(
            parse_json(raw),
            Err(LlmError::Unparsable { .. })
        ));
    }

    #[test]
    fn test_object_response() {
        let raw = "Here you go\n{\"1\": \"Patience Pays\", \"2\": \"Pasta 101\"}";
        let parsed = parse_json(raw).unwrap();
        assert_eq!(parsed["1"], "Patience Pays");
    }
}
