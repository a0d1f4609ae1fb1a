//! Decoded form values.
//!
//! Form bodies, multipart bodies and query strings all decode into the same
//! ordered tree. Bracketed field names (`list[0]`, `map[key]`) are expanded
//! into nested values on the way in and flattened back on the way out.

use bytes::Bytes;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Ordered map of field name to decoded value.
pub type FormData = IndexMap<String, FormValue>;

/// A file received in a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Filename as sent by the client.
    pub file_name: String,
    /// Media type declared by the client, if any.
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.map(str::to_string),
            data: data.into(),
        }
    }
}

/// A node of the decoded value tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File(UploadedFile),
    List(Vec<FormValue>),
    Map(FormData),
}

impl FormValue {
    pub fn text(value: impl Into<String>) -> Self {
        FormValue::Text(value.into())
    }

    /// Returns the text of a scalar node.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&FormData> {
        match self {
            FormValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Converts a JSON value, stringifying scalars.
    ///
    /// `true` becomes `"1"`, `false` and `null` become `""`.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => FormValue::Text(String::new()),
            Value::Bool(true) => FormValue::text("1"),
            Value::Bool(false) => FormValue::Text(String::new()),
            Value::Number(n) => FormValue::Text(n.to_string()),
            Value::String(s) => FormValue::Text(s.clone()),
            Value::Array(items) => FormValue::List(items.iter().map(FormValue::from_json).collect()),
            Value::Object(map) => FormValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), FormValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::text(value)
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        FormValue::Text(value)
    }
}

impl From<UploadedFile> for FormValue {
    fn from(value: UploadedFile) -> Self {
        FormValue::File(value)
    }
}

// Files have no JSON representation and serialize as an empty object.
impl Serialize for FormValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FormValue::Text(s) => serializer.serialize_str(s),
            FormValue::File(_) => serializer.serialize_map(Some(0))?.end(),
            FormValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            FormValue::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

/// Flattens a tree into `(bracketed name, leaf)` pairs.
///
/// The walk is depth-first and keeps insertion order, so
/// `{"listKey": ["a", {"k": "b"}]}` yields `listKey[0]` then `listKey[1][k]`.
/// Lists and maps without children produce no pairs.
pub fn flatten(data: &FormData) -> Vec<(String, &FormValue)> {
    let mut out = Vec::new();
    for (key, value) in data {
        walk(key.clone(), value, &mut out);
    }
    out
}

fn walk<'a>(name: String, value: &'a FormValue, out: &mut Vec<(String, &'a FormValue)>) {
    match value {
        FormValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(format!("{}[{}]", name, i), item, out);
            }
        }
        FormValue::Map(map) => {
            for (k, v) in map {
                walk(format!("{}[{}]", name, k), v, out);
            }
        }
        leaf => out.push((name, leaf)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(data: &FormData) -> Vec<String> {
        flatten(data).into_iter().map(|(n, _)| n).collect()
    }

    #[test]
    fn test_flatten_nested_list() {
        let data = match FormValue::from_json(&json!({
            "key": "value",
            "listKey": ["val1", "val2", {"key1": "val3", "key2": "val4"}],
        })) {
            FormValue::Map(m) => m,
            _ => unreachable!(),
        };

        assert_eq!(
            names(&data),
            vec!["key", "listKey[0]", "listKey[1]", "listKey[2][key1]", "listKey[2][key2]"]
        );
    }

    #[test]
    fn test_flatten_deep_nesting() {
        let data = match FormValue::from_json(&json!({
            "nestedKey": {
                "key3": "val5",
                "key5": ["val7", {"key6": "val9"}, [["val11", "val12"]]],
            },
        })) {
            FormValue::Map(m) => m,
            _ => unreachable!(),
        };

        assert_eq!(
            names(&data),
            vec![
                "nestedKey[key3]",
                "nestedKey[key5][0]",
                "nestedKey[key5][1][key6]",
                "nestedKey[key5][2][0][0]",
                "nestedKey[key5][2][0][1]",
            ]
        );
    }

    #[test]
    fn test_scalars_are_stringified() {
        assert_eq!(FormValue::from_json(&json!(true)), FormValue::text("1"));
        assert_eq!(FormValue::from_json(&json!(false)), FormValue::text(""));
        assert_eq!(FormValue::from_json(&json!(42)), FormValue::text("42"));
    }

    #[test]
    fn test_file_leaf_is_kept() {
        let mut data = FormData::new();
        data.insert(
            "files".into(),
            FormValue::List(vec![UploadedFile::new("a.txt", Some("text/plain"), "a").into()]),
        );

        let flat = flatten(&data);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].0, "files[0]");
        assert!(matches!(flat[0].1, FormValue::File(f) if f.file_name == "a.txt"));
    }

    #[test]
    fn test_serialize_to_json() {
        let mut data = FormData::new();
        data.insert("a".into(), "1".into());
        data.insert("b".into(), FormValue::List(vec!["x".into()]));

        assert_eq!(serde_json::to_string(&data).unwrap(), r#"{"a":"1","b":["x"]}"#);
    }
}
