use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref UNSAFE_RUN: Regex = Regex::new(r"[^a-z0-9_-]+").expect("valid regex");
    static ref EMAIL_SHAPE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex");
}

/// Folder-safe form of a user label: lower-cased, each run of characters
/// outside `[a-z0-9_-]` collapsed to `-`.
pub fn safe_name(label: &str) -> String {
    let lowered = label.to_lowercase();
    let cleaned = UNSAFE_RUN.replace_all(&lowered, "-");
    if cleaned.is_empty() {
        "user".to_string()
    } else {
        cleaned.into_owned()
    }
}

pub fn looks_like_email(candidate: &str) -> bool {
    EMAIL_SHAPE.is_match(candidate)
}

/// Parses model output as JSON, falling back to the slice between the first
/// `{` and the last `}` (model replies are often wrapped in code fences).
///
/// `None` means there is no brace-delimited slice at all; `Some(Err(_))`
/// means the slice exists but is not valid JSON.
pub fn extract_json_object(text: &str) -> Option<Result<Value, serde_json::Error>> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Some(Ok(value));
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(serde_json::from_str(&text[start..=end]))
}

/// Text report carried in a stored five-source merge.
///
/// JSON replies yield their `text_report` (non-string values are encoded back
/// to JSON); anything that is not JSON is treated as the report itself.
pub fn text_report(raw_response: &str) -> String {
    match extract_json_object(raw_response) {
        Some(Ok(parsed)) => match parsed.get("text_report") {
            Some(Value::String(report)) => report.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        },
        _ => raw_response.to_string(),
    }
}

/// Profile handed to career-role matching: `structured_profile` when present,
/// else the whole parsed reply, else `{}`.
pub fn structured_profile(raw_response: &str) -> Value {
    match extract_json_object(raw_response) {
        Some(Ok(parsed)) => match parsed.get("structured_profile") {
            Some(profile) if !profile.is_null() => profile.clone(),
            _ => parsed,
        },
        _ => Value::Object(Default::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_safe_name_collapses_runs() {
        assert_eq!(safe_name("Ada Lovelace"), "ada-lovelace");
        assert_eq!(safe_name("ada@example.com"), "ada-example-com");
        assert_eq!(safe_name("../../etc"), "-etc");
        assert_eq!(safe_name("snake_case-ok"), "snake_case-ok");
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("ada@example.com"));
        assert!(!looks_like_email("ada@example"));
        assert!(!looks_like_email("ada example@x.com"));
    }

    #[test]
    fn test_extract_from_fenced_reply() {
        let reply = "```json\n{\"courses\": [], \"summary\": \"ok\"}\n```";
        let value = extract_json_object(reply).unwrap().unwrap();
        assert_eq!(value["summary"], "ok");
    }

    #[test]
    fn test_extract_without_braces() {
        assert!(extract_json_object("no json here").is_none());
    }

    #[test]
    fn test_extract_broken_slice_is_an_error() {
        assert!(extract_json_object("oops { not json }").unwrap().is_err());
    }

    #[test]
    fn test_text_report_from_json_reply() {
        let raw = json!({"structured_profile": {}, "text_report": "Strong in Rust"}).to_string();
        assert_eq!(text_report(&raw), "Strong in Rust");
    }

    #[test]
    fn test_text_report_from_fenced_reply() {
        let raw = "```json\n{\"text_report\": \"Fenced\"}\n```";
        assert_eq!(text_report(raw), "Fenced");
    }

    #[test]
    fn test_text_report_plain_text_is_the_report() {
        assert_eq!(text_report("A plain summary"), "A plain summary");
    }

    #[test]
    fn test_text_report_missing_is_empty() {
        assert_eq!(text_report("{\"structured_profile\": {}}"), "");
    }

    #[test]
    fn test_structured_profile_fallbacks() {
        let with_profile = json!({"structured_profile": {"name": "Ada"}}).to_string();
        assert_eq!(structured_profile(&with_profile), json!({"name": "Ada"}));

        let without = json!({"skills": ["rust"]}).to_string();
        assert_eq!(structured_profile(&without), json!({"skills": ["rust"]}));

        assert_eq!(structured_profile("not json"), json!({}));
    }
}
