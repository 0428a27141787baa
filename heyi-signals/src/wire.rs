//! Wire formats of the classifier endpoints

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text job submission body: `{"data": [text]}`
#[derive(Debug, Serialize)]
pub struct TextJobRequest<'a> {
    pub data: [&'a str; 1],
}

/// Text job submission reply
#[derive(Debug, Deserialize)]
pub struct TextJobReply {
    #[serde(default)]
    pub event_id: Option<String>,
}

/// Image verification body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageVerifyRequest<'a> {
    pub image_url: &'a str,
}

/// Image verification reply; both fields are optional on the wire
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageVerifyReply {
    #[serde(default)]
    pub ai_percentage: Option<Value>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Read a percentage sent either as a number or as a numeric string
pub fn read_percentage(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Pull the confidence out of a completion payload `[{"aiPercentage": n}]`
pub fn completion_percentage(data: &str) -> Option<f64> {
    let payload: Value = serde_json::from_str(data).ok()?;
    payload
        .get(0)
        .and_then(|first| first.get("aiPercentage"))
        .and_then(read_percentage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_percentage() {
        assert_eq!(read_percentage(&json!(92.5)), Some(92.5));
        assert_eq!(read_percentage(&json!("87.30")), Some(87.3));
        assert_eq!(read_percentage(&json!("high")), None);
        assert_eq!(read_percentage(&json!(null)), None);
    }

    #[test]
    fn test_completion_percentage() {
        assert_eq!(completion_percentage(r#"[{"aiPercentage": 12}]"#), Some(12.0));
        assert_eq!(completion_percentage(r#"[{"error": "No text provided"}]"#), None);
        assert_eq!(completion_percentage("[]"), None);
        assert_eq!(completion_percentage("not json"), None);
    }

    #[test]
    fn test_request_shapes() {
        let body = serde_json::to_value(TextJobRequest { data: ["hello"] }).unwrap();
        assert_eq!(body, json!({"data": ["hello"]}));

        let body = serde_json::to_value(ImageVerifyRequest { image_url: "https://x/y.png" }).unwrap();
        assert_eq!(body, json!({"imageUrl": "https://x/y.png"}));
    }
}
