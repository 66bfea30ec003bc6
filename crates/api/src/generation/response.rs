//! Strict validation of the completion payload

use serde_json::Value;

/// Validated completion output
#[derive(Debug, Clone, PartialEq)]
pub struct AuditDraft {
    pub analysis: String,
    pub workflow: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    #[error("Invalid JSON returned by AI")]
    InvalidJson,
    #[error("AI response is not a JSON object")]
    NotAnObject,
    #[error("AI response missing required field: {0}")]
    MissingField(&'static str),
}

/// Parse the raw completion text.
///
/// Requires a non-blank `analysis` string and a non-empty `workflow` object.
/// `n8nWorkflow` is accepted as an alias for `workflow`.
pub fn parse_completion(raw: &str) -> Result<AuditDraft, ResponseError> {
    let value: Value = serde_json::from_str(raw.trim()).map_err(|_| ResponseError::InvalidJson)?;
    let mut object = match value {
        Value::Object(object) => object,
        _ => return Err(ResponseError::NotAnObject),
    };

    let analysis = match object.remove("analysis") {
        Some(Value::String(text)) if !text.trim().is_empty() => text,
        _ => return Err(ResponseError::MissingField("analysis")),
    };

    let workflow = object
        .remove("workflow")
        .filter(is_document)
        .or_else(|| object.remove("n8nWorkflow").filter(is_document))
        .ok_or(ResponseError::MissingField("workflow"))?;

    Ok(AuditDraft { analysis, workflow })
}

fn is_document(value: &Value) -> bool {
    matches!(value, Value::Object(map) if !map.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_response() {
        let raw = json!({
            "analysis": "## Process Overview\n...",
            "workflow": { "name": "X", "nodes": [] }
        })
        .to_string();
        let draft = parse_completion(&raw).unwrap();
        assert!(draft.analysis.starts_with("## Process Overview"));
        assert_eq!(draft.workflow["name"], "X");
    }

    #[test]
    fn test_legacy_workflow_key() {
        let raw = json!({ "analysis": "report", "n8nWorkflow": { "name": "Y" } }).to_string();
        assert_eq!(parse_completion(&raw).unwrap().workflow["name"], "Y");
    }

    #[test]
    fn test_missing_workflow() {
        let raw = json!({ "analysis": "report" }).to_string();
        assert_eq!(
            parse_completion(&raw),
            Err(ResponseError::MissingField("workflow"))
        );
    }

    #[test]
    fn test_empty_fields_rejected() {
        let blank = json!({ "analysis": "  ", "workflow": { "name": "X" } }).to_string();
        assert_eq!(parse_completion(&blank), Err(ResponseError::MissingField("analysis")));

        let empty_doc = json!({ "analysis": "report", "workflow": {} }).to_string();
        assert_eq!(parse_completion(&empty_doc), Err(ResponseError::MissingField("workflow")));

        let string_doc = json!({ "analysis": "report", "workflow": "not a document" }).to_string();
        assert_eq!(parse_completion(&string_doc), Err(ResponseError::MissingField("workflow")));
    }

    #[test]
    fn test_malformed_payloads() {
        assert_eq!(parse_completion("not json"), Err(ResponseError::InvalidJson));
        assert_eq!(parse_completion(""), Err(ResponseError::InvalidJson));
        assert_eq!(parse_completion("[1, 2]"), Err(ResponseError::NotAnObject));
    }
}
