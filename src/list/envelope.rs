//! Normalization of the backend's list envelopes.
//!
//! The same endpoint may answer `{success, <items>: [...], count}` or wrap the
//! payload as `{results: {success, <items>: [...]}, count}`. Paging metadata
//! (`count`, `next`, `previous`) always comes from the outer object.

use std::collections::BTreeMap;

use log::warn;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::query::ListQuery;
use super::result::{ListResult, MutationOutcome};
use crate::error::FetchError;

const RESULTS: &str = "results";
const COUNT: &str = "count";
const NEXT: &str = "next";
const PREVIOUS: &str = "previous";
const SUCCESS: &str = "success";
const MESSAGE_KEYS: [&str; 3] = ["message", "detail", "error"];

/// Turns a decoded list response into a `ListResult`.
///
/// A missing items array is not an error: the page is reported empty and a
/// warning is logged. An explicit `success: false` is a rejection.
pub fn normalize_list<T: DeserializeOwned>(
    body: Value,
    items_key: &str,
    query: &ListQuery,
) -> Result<ListResult<T>, FetchError> {
    let outer = match body {
        Value::Object(map) => map,
        Value::Array(items) => {
            // Bare array: no paging metadata at all
            let items = decode_items(items, items_key, query.page_size);
            let total_count = items.len() as u64;
            return Ok(ListResult {
                items,
                total_count,
                page: query.page,
                page_size: query.page_size,
                next: None,
                previous: None,
            });
        }
        other => {
            return Err(FetchError::MalformedResponse(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            )))
        }
    };

    let payload = outer.get(RESULTS);
    let raw_items = match payload {
        Some(Value::Array(items)) => Some(items.clone()),
        Some(Value::Object(inner)) => {
            check_success(inner)?;
            inner.get(items_key).and_then(Value::as_array).cloned()
        }
        _ => {
            check_success(&outer)?;
            outer.get(items_key).and_then(Value::as_array).cloned()
        }
    };

    let items = match raw_items {
        Some(items) => decode_items(items, items_key, query.page_size),
        None => {
            warn!(
                "List response has no '{}' array, treating page {} as empty",
                items_key, query.page
            );
            Vec::new()
        }
    };

    let total_count = outer
        .get(COUNT)
        .or_else(|| payload.and_then(|p| p.get(COUNT)))
        .and_then(Value::as_u64)
        .unwrap_or(items.len() as u64);

    Ok(ListResult {
        items,
        total_count,
        page: query.page,
        page_size: query.page_size,
        next: link(&outer, NEXT),
        previous: link(&outer, PREVIOUS),
    })
}

/// Pulls a human-readable message out of an error or mutation body
pub fn extract_message(body: &Value) -> Option<String> {
    let payload = match body.get(RESULTS) {
        Some(inner @ Value::Object(_)) => inner,
        _ => body,
    };
    MESSAGE_KEYS
        .iter()
        .find_map(|key| payload.get(*key))
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
}

/// Reads a mutation response. `ok` is whether the HTTP status was 2xx.
pub fn mutation_outcome(ok: bool, body: &Value) -> MutationOutcome {
    let message = extract_message(body);
    let reported_success = body.get(SUCCESS).and_then(Value::as_bool);

    if ok && reported_success != Some(false) {
        return MutationOutcome::succeeded(message);
    }

    MutationOutcome::failed(message, field_errors(body))
}

/// Validation errors shaped `{field: ["msg", ...]}` or `{field: "msg"}`,
/// optionally nested under `errors`
fn field_errors(body: &Value) -> BTreeMap<String, Vec<String>> {
    let source = match body.get("errors") {
        Some(Value::Object(errors)) => errors,
        _ => match body {
            Value::Object(map) => map,
            _ => return BTreeMap::new(),
        },
    };

    source
        .iter()
        .filter(|(key, _)| key.as_str() != SUCCESS && !MESSAGE_KEYS.contains(&key.as_str()))
        .filter_map(|(key, value)| {
            let messages: Vec<String> = match value {
                Value::String(s) => vec![s.clone()],
                Value::Array(values) => values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect(),
                _ => Vec::new(),
            };
            (!messages.is_empty()).then(|| (key.clone(), messages))
        })
        .collect()
}

fn check_success(payload: &Map<String, Value>) -> Result<(), FetchError> {
    if payload.get(SUCCESS).and_then(Value::as_bool) == Some(false) {
        let message = MESSAGE_KEYS
            .iter()
            .find_map(|key| payload.get(*key).and_then(Value::as_str))
            .unwrap_or("Request was not successful")
            .to_owned();
        return Err(FetchError::from_rejection(200, message));
    }
    Ok(())
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>, items_key: &str, page_size: u32) -> Vec<T> {
    let received = items.len();
    let mut decoded: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value(item) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping {} entry {}: {}", items_key, idx, e);
                None
            }
        })
        .collect();

    let limit = page_size as usize;
    if decoded.len() > limit {
        warn!(
            "Backend returned {} {} for a page size of {}, truncating",
            received, items_key, page_size
        );
        decoded.truncate(limit);
    }
    decoded
}

fn link(outer: &Map<String, Value>, key: &str) -> Option<String> {
    outer.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
