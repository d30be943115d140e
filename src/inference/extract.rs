use serde_json::Value;
use tracing::debug;

/// Substring from the first `{` to the last `}` inclusive; empty when either
/// delimiter is absent or out of order. Model replies routinely wrap the JSON
/// payload in prose or markdown fences.
pub fn extract_json(text: &str) -> &str {
    let start = match text.find('{') {
        Some(i) => i,
        None => return "",
    };
    let end = match text.rfind('}') {
        Some(i) => i,
        None => return "",
    };
    if end < start {
        return "";
    }
    &text[start..=end]
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no JSON object found in model response")]
    NoJson,
    #[error("model response is not parseable JSON: {0}")]
    Unparseable(#[from] serde_json::Error),
}

/// Extracts and parses the embedded JSON object, running a permissive repair
/// pass when the raw text does not parse.
pub fn parse_structured(text: &str) -> Result<Value, ExtractError> {
    let raw = extract_json(text);
    if raw.is_empty() {
        return Err(ExtractError::NoJson);
    }
    match serde_json::from_str(raw) {
        Ok(v) => Ok(v),
        Err(first) => {
            debug!(error = %first, "direct parse failed, attempting repair");
            let repaired = repair_json(raw);
            Ok(serde_json::from_str(&repaired)?)
        }
    }
}

/// Numeric coercion for loosely typed model output: strings parse, non-finite
/// values become `None` instead of propagating.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Rewrites common LLM JSON defects: single-quoted strings, unquoted keys,
/// trailing commas, and missing commas between adjacent values. Best effort;
/// the caller re-parses the result.
fn repair_json(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    let mut chars = input.chars().peekable();
    // Set after emitting a complete value, so that a following value-start
    // without a separator gets a comma inserted.
    let mut after_value = false;

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                if after_value {
                    out.push(',');
                }
                copy_string(&mut out, &mut chars, c);
                after_value = true;
            }
            ':' => {
                out.push(':');
                after_value = false;
            }
            ',' => {
                // Drop the comma if nothing follows it but a close delimiter
                // (or another comma).
                let mut rest = chars.clone();
                let next = loop {
                    match rest.peek() {
                        Some(ch) if ch.is_whitespace() => {
                            rest.next();
                        }
                        other => break other.copied(),
                    }
                };
                match next {
                    Some('}') | Some(']') | Some(',') | None => {}
                    _ => out.push(','),
                }
                after_value = false;
            }
            '{' | '[' => {
                if after_value {
                    out.push(',');
                }
                out.push(c);
                after_value = false;
            }
            '}' | ']' => {
                out.push(c);
                after_value = true;
            }
            c if c.is_whitespace() => out.push(c),
            c if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' || c == '+' => {
                if after_value {
                    out.push(',');
                }
                let mut word = String::new();
                word.push(c);
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' || ch == '-' || ch == '.' || ch == '+' {
                        word.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // A bare word followed by a colon is an unquoted key.
                let mut rest = chars.clone();
                let followed_by_colon = loop {
                    match rest.next() {
                        Some(ch) if ch.is_whitespace() => continue,
                        Some(':') => break true,
                        _ => break false,
                    }
                };
                let is_literal = matches!(word.as_str(), "true" | "false" | "null")
                    || word.parse::<f64>().is_ok();
                if followed_by_colon && !is_literal {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                    after_value = false;
                } else {
                    out.push_str(&word);
                    after_value = true;
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Copies one string literal, converting the delimiter to `"` and escaping
/// embedded double quotes when the source used single quotes.
fn copy_string(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    delim: char,
) {
    out.push('"');
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push('\\');
            if let Some(esc) = chars.next() {
                out.push(esc);
            }
        } else if c == delim {
            out.push('"');
            return;
        } else if c == '"' {
            out.push_str("\\\"");
        } else {
            out.push(c);
        }
    }
    // Unterminated string: close it so the parser has a chance.
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_between_outermost_braces() {
        assert_eq!(extract_json("noise {\"a\":1} trailing"), "{\"a\":1}");
        assert_eq!(extract_json("no braces here"), "");
        assert_eq!(extract_json("} reversed {"), "");
        assert_eq!(
            extract_json("```json\n{\"a\": {\"b\": 2}}\n```"),
            "{\"a\": {\"b\": 2}}"
        );
    }

    #[test]
    fn parses_clean_json_directly() {
        let v = parse_structured("Here you go: {\"summary\": \"ok\", \"meals\": []}").unwrap();
        assert_eq!(v["summary"], "ok");
    }

    #[test]
    fn repairs_trailing_commas() {
        let v = parse_structured("{\"a\": 1, \"b\": [1, 2, 3,],}").unwrap();
        assert_eq!(v, json!({"a": 1, "b": [1, 2, 3]}));
    }

    #[test]
    fn repairs_single_quotes_and_unquoted_keys() {
        let v = parse_structured("{summary: 'high protein', dailyCalories: 2100}").unwrap();
        assert_eq!(v, json!({"summary": "high protein", "dailyCalories": 2100}));
    }

    #[test]
    fn repairs_missing_comma_between_members() {
        let v = parse_structured("{\"a\": 1\n\"b\": \"two\"}").unwrap();
        assert_eq!(v, json!({"a": 1, "b": "two"}));
    }

    #[test]
    fn repairs_embedded_double_quote_in_single_quoted_string() {
        let v = parse_structured("{'note': '6\" sub'}").unwrap();
        assert_eq!(v["note"], "6\" sub");
    }

    #[test]
    fn literals_survive_repair() {
        let v = parse_structured("{flag: true, nothing: null, n: -2.5,}").unwrap();
        assert_eq!(v, json!({"flag": true, "nothing": null, "n": -2.5}));
    }

    #[test]
    fn missing_json_is_an_error() {
        assert!(matches!(
            parse_structured("the model apologizes instead"),
            Err(ExtractError::NoJson)
        ));
    }

    #[test]
    fn garbage_still_fails_after_repair() {
        assert!(parse_structured("{]]]").is_err());
    }

    #[test]
    fn coerces_numbers_leniently() {
        assert_eq!(coerce_number(&json!(42)), Some(42.0));
        assert_eq!(coerce_number(&json!("3.5")), Some(3.5));
        assert_eq!(coerce_number(&json!("inf")), None);
        assert_eq!(coerce_number(&json!("NaN")), None);
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(coerce_number(&json!([1])), None);
    }
}
