use serde_json::{Map, Value};
use thiserror::Error;

/// Opaque, string-keyed metadata attached to a file at creation time.
pub type Metadata = Map<String, Value>;

/// The supplied metadata was not a JSON object.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The input was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The input was valid JSON but not an object.
    #[error("metadata must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Parse the raw `metadata` form field into a string-keyed map.
///
/// A literal `null` decodes to an empty map. Any other non-object value
/// (array, string, number, bool) is rejected.
pub fn parse_metadata(raw: &str) -> Result<Metadata, MetadataError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        Value::Array(_) => Err(MetadataError::NotAnObject("array")),
        Value::String(_) => Err(MetadataError::NotAnObject("string")),
        Value::Number(_) => Err(MetadataError::NotAnObject("number")),
        Value::Bool(_) => Err(MetadataError::NotAnObject("bool")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_object() {
        let meta = parse_metadata(r#"{"epoch": 12, "loss": 0.25, "tags": ["a"]}"#).unwrap();
        assert_eq!(meta.len(), 3);
        assert_eq!(meta["epoch"], 12);
    }

    #[test]
    fn null_is_empty() {
        assert!(parse_metadata("null").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            parse_metadata("{bad json"),
            Err(MetadataError::Json(_))
        ));
        assert!(parse_metadata("").is_err());
    }

    #[test]
    fn rejects_non_objects() {
        assert!(matches!(
            parse_metadata("[1, 2]"),
            Err(MetadataError::NotAnObject("array"))
        ));
        assert!(matches!(
            parse_metadata("\"x\""),
            Err(MetadataError::NotAnObject("string"))
        ));
        assert!(parse_metadata("3").is_err());
        assert!(parse_metadata("true").is_err());
    }
}
