//! Bracket-aware query and form codec.
//!
//! Decoding turns `a[b][]=c` style pairs into a nested [`FormData`] tree and
//! encoding flattens a tree back into `a%5Bb%5D%5B0%5D=c` pairs.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};

use crate::http::form::{flatten, FormData, FormValue};

/// Characters left as-is by [`Encoding::Rfc1738`].
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Characters left as-is by [`Encoding::Rfc3986`].
const STRICT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Characters escaped when a decoded path is written back into a URI.
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Re-encodes a percent-decoded path so it can be parsed as a URI path.
///
/// `/` is kept, so segment boundaries survive.
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ENCODE_SET).to_string()
}

/// Percent-encoding flavour used by [`build_query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Query strings: space is written as `+`.
    Rfc1738,
    /// Strict reserved-character encoding: space is written as `%20`.
    Rfc3986,
}

impl Encoding {
    fn encode(self, input: &str) -> String {
        match self {
            Encoding::Rfc1738 => utf8_percent_encode(input, QUERY_ENCODE_SET)
                .to_string()
                .replace("%20", "+"),
            Encoding::Rfc3986 => utf8_percent_encode(input, STRICT_ENCODE_SET).to_string(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Segment {
    Append,
    Key(String),
}

/// Decodes an `application/x-www-form-urlencoded` string into a tree.
pub fn parse_query(input: &str) -> FormData {
    parse_nested(
        url::form_urlencoded::parse(input.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())),
    )
}

/// Builds a tree from already decoded `(key, value)` pairs.
pub fn parse_nested<I, K, V>(pairs: I) -> FormData
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<FormValue>,
{
    let mut data = FormData::new();
    for (key, value) in pairs {
        insert(&mut data, key.as_ref(), value.into());
    }
    data
}

/// Inserts a single value under a possibly bracketed key.
pub fn insert(data: &mut FormData, key: &str, value: FormValue) {
    let (root, segments) = split_key(key);
    if root.is_empty() {
        return;
    }

    let mut node = data.entry(root).or_insert_with(placeholder);
    for segment in &segments {
        node = child(node, segment);
    }
    *node = value;
}

/// Encodes a tree as `key=value` pairs joined with `&`.
///
/// File leaves have no textual form and are skipped.
pub fn build_query(data: &FormData, encoding: Encoding) -> String {
    flatten(data)
        .into_iter()
        .filter_map(|(name, leaf)| {
            leaf.as_text()
                .map(|value| format!("{}={}", encoding.encode(&name), encoding.encode(value)))
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn placeholder() -> FormValue {
    FormValue::Text(String::new())
}

fn split_key(key: &str) -> (String, Vec<Segment>) {
    let open = match key.find('[') {
        Some(0) | None => return (key.to_string(), Vec::new()),
        Some(i) => i,
    };

    let mut segments = Vec::new();
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        match inner.find(']') {
            Some(close) => {
                let name = &inner[..close];
                segments.push(if name.is_empty() {
                    Segment::Append
                } else {
                    Segment::Key(name.to_string())
                });
                rest = &inner[close + 1..];
            }
            // unbalanced bracket: keep the key verbatim
            None if segments.is_empty() => return (key.to_string(), Vec::new()),
            None => break,
        }
    }

    (key[..open].to_string(), segments)
}

fn child<'a>(node: &'a mut FormValue, segment: &Segment) -> &'a mut FormValue {
    if !matches!(node, FormValue::List(_) | FormValue::Map(_)) {
        *node = match segment {
            Segment::Append => FormValue::List(Vec::new()),
            Segment::Key(k) if k == "0" => FormValue::List(Vec::new()),
            Segment::Key(_) => FormValue::Map(FormData::new()),
        };
    }

    let list_index = match (&*node, segment) {
        (FormValue::List(items), Segment::Append) => Some(items.len()),
        (FormValue::List(items), Segment::Key(k)) => index_key(k).filter(|i| *i <= items.len()),
        _ => None,
    };

    // a non-sequential key turns the list into a map
    if list_index.is_none() {
        if let FormValue::List(items) = node {
            let map = std::mem::take(items)
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect();
            *node = FormValue::Map(map);
        }
    }

    match node {
        FormValue::List(items) => {
            let index = list_index.unwrap_or(items.len());
            if index == items.len() {
                items.push(placeholder());
            }
            &mut items[index]
        }
        FormValue::Map(map) => {
            let key = match segment {
                Segment::Key(k) => k.clone(),
                Segment::Append => next_index(map).to_string(),
            };
            map.entry(key).or_insert_with(placeholder)
        }
        leaf => leaf,
    }
}

/// Keys in canonical decimal form (`"0"`, `"12"`, not `"01"` or `"+1"`).
fn index_key(key: &str) -> Option<usize> {
    key.parse::<usize>().ok().filter(|i| i.to_string() == key)
}

fn next_index(map: &FormData) -> usize {
    map.keys()
        .filter_map(|k| index_key(k))
        .max()
        .map_or(0, |i| i + 1)
}
