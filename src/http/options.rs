//! Gateway directives carried in the reserved options query parameter.
//!
//! `?bffProxy[streamed]=1` asks for the upstream body to be streamed back
//! instead of buffered. The parameter never reaches the upstream.

use crate::error::ProxyError;
use crate::http::form::{FormData, FormValue};

/// Default name of the reserved query parameter.
pub const DEFAULT_OPTIONS_PARAMETER: &str = "bffProxy";

/// Parsed gateway directives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyOptions {
    /// Stream the upstream response body instead of buffering it.
    pub streamed: bool,
}

impl ProxyOptions {
    /// Extracts the options bag stored under `parameter` in a decoded query.
    pub fn from_query(query: &FormData, parameter: &str) -> Result<Self, ProxyError> {
        let bag = match query.get(parameter) {
            None => return Ok(Self::default()),
            Some(FormValue::Map(map)) => map.clone(),
            Some(FormValue::List(items)) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect(),
            Some(_) => {
                return Err(ProxyError::BadRequest(format!(
                    "Unexpected value for parameter \"{}\": expecting \"array\".",
                    parameter
                )))
            }
        };

        Ok(Self {
            streamed: bool_option(&bag, "streamed", false)?,
        })
    }
}

fn bool_option(bag: &FormData, key: &str, default: bool) -> Result<bool, ProxyError> {
    let value = match bag.get(key) {
        None => return Ok(default),
        Some(value) => value,
    };

    value
        .as_text()
        .and_then(parse_bool)
        .ok_or_else(|| ProxyError::BadRequest(format!("Input value \"{}\" is invalid.", key)))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}
