use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize with JSON-path context: on failure returns the segments leading to
/// the offending node and the underlying message.
pub fn from_value_with_path<T: DeserializeOwned>(value: Value) -> Result<T, (Vec<String>, String)> {
    match serde_path_to_error::deserialize::<_, T>(value) {
        Ok(v) => Ok(v),
        Err(err) => {
            let segments = err
                .path()
                .iter()
                .filter_map(|segment| match segment {
                    serde_path_to_error::Segment::Map { key } => Some(key.clone()),
                    serde_path_to_error::Segment::Seq { index } => Some(index.to_string()),
                    serde_path_to_error::Segment::Enum { variant } => Some(variant.clone()),
                    serde_path_to_error::Segment::Unknown => None,
                })
                .collect();
            Err((segments, err.into_inner().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;
    use serde_json::json;

    #[test]
    fn reports_the_failing_key() {
        let (path, message) = from_value_with_path::<Metadata>(json!({ "index": "yes" })).unwrap_err();
        assert_eq!(path, vec!["index".to_string()]);
        assert!(message.contains("expected a boolean"), "{message}");
    }

    #[test]
    fn rejects_unknown_storage_type() {
        let (path, _) = from_value_with_path::<Metadata>(json!({ "type": "xml" })).unwrap_err();
        assert_eq!(path, vec!["type".to_string()]);
    }

    #[test]
    fn accepts_partial_metadata() {
        let md = from_value_with_path::<Metadata>(json!({ "comment": "hi" })).unwrap();
        assert_eq!(md.comment.as_deref(), Some("hi"));
    }
}
