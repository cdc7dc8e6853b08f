use serde_json::Value;

use super::ProcessError;

/// Turns a script's stdout into JSON.
///
/// Scripts often print progress lines before their result, so after the whole
/// text the last non-empty line is tried. Anything else is wrapped as
/// `{"output": "<text>"}`. The same policy applies to every script.
pub fn parse_stdout(stdout: &str) -> Result<Value, ProcessError> {
    let trimmed = stdout.trim();

    let parsed = serde_json::from_str::<Value>(trimmed).ok().or_else(|| {
        trimmed
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .and_then(|line| serde_json::from_str::<Value>(line).ok())
    });

    match parsed {
        Some(value) => reject_reported_error(value),
        None => Ok(serde_json::json!({ "output": trimmed })),
    }
}

// `{"error": "..."}` with nothing else is how the scripts signal failure
// while still exiting 0.
fn reject_reported_error(value: Value) -> Result<Value, ProcessError> {
    if let Value::Object(map) = &value {
        if map.len() == 1 {
            if let Some(err) = map.get("error").filter(|e| !e.is_null()) {
                let msg = err
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string());
                return Err(ProcessError::ScriptReported(msg));
            }
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json_document() {
        let value = parse_stdout("  {\"summary\": \"ok\"}\n").unwrap();
        assert_eq!(value, json!({"summary": "ok"}));
    }

    #[test]
    fn test_multiline_pretty_json() {
        let value = parse_stdout("{\n  \"a\": 1,\n  \"b\": [1, 2]\n}\n").unwrap();
        assert_eq!(value, json!({"a": 1, "b": [1, 2]}));
    }

    #[test]
    fn test_progress_lines_before_result() {
        let stdout = "--- Generating summary for code: RIA ---\n{\"summary\": \"curious\"}\n";
        assert_eq!(parse_stdout(stdout).unwrap(), json!({"summary": "curious"}));
    }

    #[test]
    fn test_plain_text_falls_back_to_output_field() {
        let value = parse_stdout("just some words\n").unwrap();
        assert_eq!(value, json!({"output": "just some words"}));
    }

    #[test]
    fn test_empty_stdout() {
        assert_eq!(parse_stdout("").unwrap(), json!({"output": ""}));
    }

    #[test]
    fn test_reported_error_is_a_failure() {
        let err = parse_stdout("{\"error\": \"Could not process image\"}").unwrap_err();
        assert!(matches!(err, ProcessError::ScriptReported(msg) if msg == "Could not process image"));
    }

    #[test]
    fn test_error_key_alongside_data_is_kept() {
        let value = parse_stdout("{\"error\": null, \"analysis\": \"fine\"}").unwrap();
        assert_eq!(value["analysis"], "fine");
    }
}
