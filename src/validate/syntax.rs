//! Generic JSON Schema (draft-07) well-formedness check.
//!
//! Only keyword *shapes* are checked, never instance semantics. Unknown keywords
//! (`x-primary-key`, `metadata`, ...) pass through untouched.
use serde_json::{Map, Value};

const SIMPLE_TYPES: [&str; 7] = ["array", "boolean", "integer", "null", "number", "object", "string"];

const NON_NEGATIVE_INTEGER_KEYWORDS: [&str; 6] = [
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
    "minProperties",
    "maxProperties",
];

const NUMBER_KEYWORDS: [&str; 4] = ["minimum", "maximum", "exclusiveMinimum", "exclusiveMaximum"];

const STRING_KEYWORDS: [&str; 7] = ["title", "description", "$ref", "$id", "$schema", "$comment", "format"];

const BOOLEAN_KEYWORDS: [&str; 3] = ["uniqueItems", "readOnly", "writeOnly"];

const SCHEMA_KEYWORDS: [&str; 8] = [
    "additionalItems",
    "additionalProperties",
    "contains",
    "propertyNames",
    "not",
    "if",
    "then",
    "else",
];

const SCHEMA_MAP_KEYWORDS: [&str; 2] = ["properties", "definitions"];

const SCHEMA_ARRAY_KEYWORDS: [&str; 3] = ["allOf", "anyOf", "oneOf"];

/// `true` when `doc` is a well-formed schema whose root is an object schema with `properties`.
pub fn is_valid_document(doc: &Value) -> bool {
    let Some(root) = doc.as_object() else { return false };
    if root.get("type").and_then(Value::as_str) != Some("object") {
        return false;
    }
    if !root.get("properties").is_some_and(Value::is_object) {
        return false;
    }
    is_valid_schema(doc)
}

/// Draft-07 meta-schema check for a single (sub)schema.
pub fn is_valid_schema(schema: &Value) -> bool {
    match schema {
        Value::Bool(_) => true,
        Value::Object(obj) => is_valid_schema_object(obj),
        _ => false,
    }
}

fn is_valid_schema_object(obj: &Map<String, Value>) -> bool {
    if let Some(ty) = obj.get("type") {
        if !is_valid_type(ty) {
            return false;
        }
    }

    for key in NON_NEGATIVE_INTEGER_KEYWORDS {
        if let Some(v) = obj.get(key) {
            if v.as_u64().is_none() {
                return false;
            }
        }
    }
    for key in NUMBER_KEYWORDS {
        if obj.get(key).is_some_and(|v| !v.is_number()) {
            return false;
        }
    }
    if let Some(v) = obj.get("multipleOf") {
        match v.as_f64() {
            Some(n) if n > 0.0 => {}
            _ => return false,
        }
    }
    for key in STRING_KEYWORDS {
        if obj.get(key).is_some_and(|v| !v.is_string()) {
            return false;
        }
    }
    for key in BOOLEAN_KEYWORDS {
        if obj.get(key).is_some_and(|v| !v.is_boolean()) {
            return false;
        }
    }

    if let Some(pattern) = obj.get("pattern") {
        match pattern.as_str() {
            Some(p) if is_valid_regex(p) => {}
            _ => return false,
        }
    }
    if let Some(required) = obj.get("required") {
        if !is_unique_string_array(required) {
            return false;
        }
    }
    if obj.get("enum").is_some_and(|v| !v.is_array()) {
        return false;
    }

    for key in SCHEMA_KEYWORDS {
        if obj.get(key).is_some_and(|v| !is_valid_schema(v)) {
            return false;
        }
    }
    for key in SCHEMA_MAP_KEYWORDS {
        if let Some(v) = obj.get(key) {
            if !is_valid_schema_map(v) {
                return false;
            }
        }
    }
    if let Some(v) = obj.get("patternProperties") {
        let Some(map) = v.as_object() else { return false };
        if !map.keys().all(|k| is_valid_regex(k)) || !map.values().all(is_valid_schema) {
            return false;
        }
    }
    if let Some(v) = obj.get("dependencies") {
        let Some(map) = v.as_object() else { return false };
        let ok = map.values().all(|dep| is_valid_schema(dep) || is_unique_string_array(dep));
        if !ok {
            return false;
        }
    }
    for key in SCHEMA_ARRAY_KEYWORDS {
        if let Some(v) = obj.get(key) {
            match v.as_array() {
                Some(xs) if !xs.is_empty() && xs.iter().all(is_valid_schema) => {}
                _ => return false,
            }
        }
    }
    if let Some(items) = obj.get("items") {
        let ok = match items {
            Value::Array(xs) => xs.iter().all(is_valid_schema),
            other => is_valid_schema(other),
        };
        if !ok {
            return false;
        }
    }

    true
}

fn is_valid_type(ty: &Value) -> bool {
    match ty {
        Value::String(s) => SIMPLE_TYPES.contains(&s.as_str()),
        Value::Array(xs) => {
            !xs.is_empty()
                && xs.iter().all(|x| x.as_str().is_some_and(|s| SIMPLE_TYPES.contains(&s)))
                && is_unique(xs)
        }
        _ => false,
    }
}

fn is_valid_schema_map(v: &Value) -> bool {
    v.as_object().is_some_and(|map| map.values().all(is_valid_schema))
}

fn is_unique_string_array(v: &Value) -> bool {
    v.as_array().is_some_and(|xs| xs.iter().all(Value::is_string) && is_unique(xs))
}

fn is_unique(xs: &[Value]) -> bool {
    xs.iter().enumerate().all(|(i, x)| !xs[..i].contains(x))
}

fn is_valid_regex(src: &str) -> bool {
    regex::Regex::new(src).is_ok()
}
