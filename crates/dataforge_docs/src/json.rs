//! JSON input. Three top-level shapes are recognized:
//!
//! * an array of objects: columns are the first object's keys, in order;
//! * an array of arrays: columns are `Column_1..Column_N`;
//! * a single object: one column per key, one single-cell row per key.

use dataforge_core::{ReadError, TabularRecord, UnsupportedShapeError, synthetic_header};
use serde_json::{Map, Value};

pub fn parse_json(input: &str) -> Result<TabularRecord, ReadError> {
    if input.trim().is_empty() {
        return Ok(TabularRecord::empty());
    }

    let value: Value = serde_json::from_str(input).map_err(|e| ReadError::malformed("JSON", e))?;

    match value {
        Value::Array(items) => from_array(items),
        Value::Object(map) => Ok(from_object(map)),
        other => Err(UnsupportedShapeError::new(format!("top-level {}", kind(&other))).into()),
    }
}

fn from_array(items: Vec<Value>) -> Result<TabularRecord, ReadError> {
    let Some(first) = items.first() else {
        return Ok(TabularRecord::empty());
    };

    match first {
        Value::Object(first) => {
            let columns: Vec<String> = first.keys().cloned().collect();
            let rows = items
                .iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Value::Object(object) => Ok(columns
                        .iter()
                        .map(|key| object.get(key).map(stringify).unwrap_or_default())
                        .collect()),
                    other => Err(UnsupportedShapeError::new(format!(
                        "element {index} is {} in an array of objects",
                        kind(other)
                    ))),
                })
                .collect::<Result<Vec<Vec<String>>, _>>()?;
            Ok(TabularRecord::new(columns, rows))
        }
        Value::Array(first) => {
            let first_len = first.len();
            let rows = items
                .iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Value::Array(cells) => Ok(cells.iter().map(stringify).collect()),
                    other => Err(UnsupportedShapeError::new(format!(
                        "element {index} is {} in an array of arrays",
                        kind(other)
                    ))),
                })
                .collect::<Result<Vec<Vec<String>>, _>>()?;
            let columns = (0..first_len).map(synthetic_header).collect();
            Ok(TabularRecord::new(columns, rows))
        }
        other => Err(UnsupportedShapeError::new(format!("array of {}s", kind(other))).into()),
    }
}

/// Key/value shape: one row per key rather than a single row. Rows are one
/// cell wide, so the result is not rectangular.
fn from_object(map: Map<String, Value>) -> TabularRecord {
    TabularRecord::from_mapping(
        map.into_iter()
            .map(|(key, value)| {
                let value = stringify(&value);
                (key, value)
            })
            .collect(),
    )
}

/// Cell text for a JSON value. Nested containers are kept as compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => crate::bool_text(*b).to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_of_objects() {
        let input = r#"[{"k1": "a", "k2": 1}, {"k1": "b", "k2": 2}]"#;
        let record = parse_json(input).unwrap();
        assert_eq!(record.columns(), ["k1", "k2"]);
        assert_eq!(record.rows(), [vec!["a", "1"], vec!["b", "2"]]);
    }

    #[test]
    fn test_array_of_objects_keeps_key_order() {
        let input = r#"[{"zeta": 1, "alpha": 2, "mid": 3}]"#;
        let record = parse_json(input).unwrap();
        assert_eq!(record.columns(), ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_missing_keys_default_to_empty() {
        let input = r#"[{"a": 1, "b": 2}, {"b": 3, "extra": true}]"#;
        let record = parse_json(input).unwrap();
        assert_eq!(record.columns(), ["a", "b"]);
        assert_eq!(record.rows()[1], vec!["", "3"]);
    }

    #[test]
    fn test_value_stringification() {
        let input = r#"[{"s": "x", "n": 2.5, "b": true, "z": null, "o": {"k": [1, 2]}}]"#;
        let record = parse_json(input).unwrap();
        assert_eq!(record.rows()[0], vec!["x", "2.5", "True", "", r#"{"k":[1,2]}"#]);
    }

    #[test]
    fn test_array_of_arrays() {
        let input = r#"[["a", 1], ["b", 2]]"#;
        let record = parse_json(input).unwrap();
        assert_eq!(record.columns(), ["Column_1", "Column_2"]);
        assert_eq!(record.rows(), [vec!["a", "1"], vec!["b", "2"]]);
    }

    #[test]
    fn test_array_of_arrays_ragged() {
        let input = r#"[["a", "b"], ["c"], ["d", "e", "f"]]"#;
        let record = parse_json(input).unwrap();
        assert_eq!(record.columns(), ["Column_1", "Column_2", "Column_3"]);
        assert_eq!(record.rows()[1], vec!["c", "", ""]);
        assert!(record.is_rectangular());
    }

    #[test]
    fn test_single_object_one_row_per_key() {
        let input = r#"{"name": "Ann", "age": 30, "city": "Paris"}"#;
        let record = parse_json(input).unwrap();
        assert_eq!(record.columns(), ["name", "age", "city"]);
        assert_eq!(record.rows(), [vec!["Ann"], vec!["30"], vec!["Paris"]]);
    }

    #[test]
    fn test_empty_array_is_empty_record() {
        assert_eq!(parse_json("[]").unwrap(), TabularRecord::empty());
    }

    #[test]
    fn test_top_level_scalar_is_unsupported() {
        for input in ["42", r#""text""#, "null", "true"] {
            let err = parse_json(input).unwrap_err();
            assert!(matches!(err, ReadError::UnsupportedShape(_)), "{input}: {err:?}");
        }
    }

    #[test]
    fn test_array_of_scalars_is_unsupported() {
        let err = parse_json("[1, 2, 3]").unwrap_err();
        match err {
            ReadError::UnsupportedShape(e) => assert_eq!(e.found, "array of numbers"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_mixed_array_is_unsupported() {
        let err = parse_json(r#"[{"a": 1}, [1]]"#).unwrap_err();
        match err {
            ReadError::UnsupportedShape(e) => {
                assert_eq!(e.found, "element 1 is array in an array of objects")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_json("{ not json").unwrap_err();
        assert!(matches!(err, ReadError::Malformed { format: "JSON", .. }));
    }
}
