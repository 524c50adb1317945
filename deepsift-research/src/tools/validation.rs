//! Argument validation shared by all tools
//!
//! Every check runs before the wrapped capability is invoked.

use super::ToolError;
use serde_json::Value;

/// Upper bound on free-text arguments, in characters
pub const MAX_TEXT_LENGTH: usize = 2048;
pub const MIN_RESULTS: u64 = 1;
pub const MAX_RESULTS: u64 = 100;

/// Required, non-empty string argument of at most [`MAX_TEXT_LENGTH`] characters
pub fn require_str<'a>(args: &'a Value, field: &str, tool: &str) -> Result<&'a str, ToolError> {
    let value = args
        .get(field)
        .ok_or_else(|| ToolError::validation(tool, format!("missing required field '{}'", field)))?;

    let text = value
        .as_str()
        .ok_or_else(|| ToolError::validation(tool, format!("'{}' must be a string", field)))?
        .trim();

    if text.is_empty() {
        return Err(ToolError::validation(
            tool,
            format!("'{}' cannot be empty", field),
        ));
    }

    let length = text.chars().count();
    if length > MAX_TEXT_LENGTH {
        return Err(ToolError::validation(
            tool,
            format!(
                "'{}' is {} characters long, maximum is {}",
                field, length, MAX_TEXT_LENGTH
            ),
        ));
    }

    Ok(text)
}

/// Optional string argument; empty or absent yields `None`
pub fn optional_str<'a>(args: &'a Value, field: &str, tool: &str) -> Result<Option<&'a str>, ToolError> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => require_str(args, field, tool).map(Some),
    }
}

/// Optional integer argument constrained to `min..=max`
pub fn int_in_range(
    args: &Value,
    field: &str,
    default: u64,
    min: u64,
    max: u64,
    tool: &str,
) -> Result<u64, ToolError> {
    let value = match args.get(field) {
        None | Some(Value::Null) => return Ok(default),
        Some(value) => value,
    };

    let out_of_range =
        || ToolError::validation(tool, format!("'{}' must be between {} and {}", field, min, max));

    let number = match value {
        Value::Number(number) => {
            if let Some(n) = number.as_u64() {
                n
            } else if number.as_i64().is_some() {
                return Err(out_of_range());
            } else {
                return Err(ToolError::validation(
                    tool,
                    format!("'{}' must be an integer", field),
                ));
            }
        }
        _ => {
            return Err(ToolError::validation(
                tool,
                format!("'{}' must be an integer", field),
            ))
        }
    };

    if !(min..=max).contains(&number) {
        return Err(out_of_range());
    }
    Ok(number)
}

/// `max_results` in `1..=100`
pub fn max_results(args: &Value, default: u64, tool: &str) -> Result<usize, ToolError> {
    int_in_range(args, "max_results", default, MIN_RESULTS, MAX_RESULTS, tool).map(|n| n as usize)
}

/// Required http(s) URL argument
pub fn require_url(args: &Value, field: &str, tool: &str) -> Result<String, ToolError> {
    let raw = require_str(args, field, tool)?;
    let parsed = url::Url::parse(raw)
        .map_err(|e| ToolError::validation(tool, format!("'{}' is not a valid URL: {}", field, e)))?;

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed.to_string()),
        scheme => Err(ToolError::validation(
            tool,
            format!("'{}' must be an http(s) URL, got scheme '{}'", field, scheme),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_str() {
        assert_eq!(
            require_str(&json!({"query": "  RL  "}), "query", "t").unwrap(),
            "RL"
        );
        assert!(require_str(&json!({}), "query", "t").is_err());
        assert!(require_str(&json!({"query": ""}), "query", "t").is_err());
        assert!(require_str(&json!({"query": 42}), "query", "t").is_err());

        let long = "x".repeat(MAX_TEXT_LENGTH + 1);
        let err = require_str(&json!({ "query": long }), "query", "t").unwrap_err();
        assert!(err.message.contains("maximum is 2048"));

        let exact = "x".repeat(MAX_TEXT_LENGTH);
        assert!(require_str(&json!({ "query": exact }), "query", "t").is_ok());
    }

    #[test]
    fn test_max_results_bounds() {
        assert_eq!(max_results(&json!({}), 5, "t").unwrap(), 5);
        assert_eq!(max_results(&json!({"max_results": 1}), 5, "t").unwrap(), 1);
        assert_eq!(max_results(&json!({"max_results": 100}), 5, "t").unwrap(), 100);

        for bad in [json!(0), json!(101), json!(-3), json!(2.5), json!("10")] {
            let err = max_results(&json!({ "max_results": bad }), 5, "t").unwrap_err();
            assert!(err.is_validation());
        }
    }

    #[test]
    fn test_require_url() {
        assert_eq!(
            require_url(&json!({"url": "https://example.com/page"}), "url", "t").unwrap(),
            "https://example.com/page"
        );
        assert!(require_url(&json!({"url": "ftp://example.com"}), "url", "t").is_err());
        assert!(require_url(&json!({"url": "not a url"}), "url", "t").is_err());
        assert!(require_url(&json!({"url": "file:///etc/passwd"}), "url", "t").is_err());
    }

    #[test]
    fn test_optional_str() {
        assert_eq!(optional_str(&json!({}), "namespace", "t").unwrap(), None);
        assert_eq!(
            optional_str(&json!({"namespace": "run-a"}), "namespace", "t").unwrap(),
            Some("run-a")
        );
        assert!(optional_str(&json!({"namespace": ""}), "namespace", "t").is_err());
    }
}
