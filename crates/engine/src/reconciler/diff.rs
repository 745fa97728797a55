// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drift detection between a desired spec and a running service's stored
//! configuration.
//!
//! The registry's `data` mapping is free-form and may carry either
//! strongly-typed values or strings, so every comparison tolerates both,
//! and absent, null and empty are all equivalent.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use steward_core::McpServerSpec;

/// True when the running configuration differs from the spec on a
/// restart-forcing field: url, command, type, args (order-sensitive),
/// env, headers, timeout, toolPrefix, auth, or `autoStart` turning on.
/// Description changes never force a restart.
pub(crate) fn config_changed(spec: &McpServerSpec, data: &Map<String, Value>) -> bool {
    if !opt_str_eq(spec.url.as_deref(), data.get("url")) {
        return true;
    }
    if !opt_str_eq(spec.command.as_deref(), data.get("command")) {
        return true;
    }
    if !opt_str_eq(nonempty(&spec.server_type), data.get("type")) {
        return true;
    }
    if spec.args != str_list(data.get("args")) {
        return true;
    }
    if spec.env != str_map(data.get("env")) {
        return true;
    }
    if spec.headers != str_map(data.get("headers")) {
        return true;
    }
    if spec.timeout != int_value(data.get("timeout")) {
        return true;
    }
    if !opt_str_eq(spec.tool_prefix.as_deref(), data.get("toolPrefix")) {
        return true;
    }
    if normalize(spec.auth.clone().unwrap_or(Value::Null))
        != normalize(data.get("auth").cloned().unwrap_or(Value::Null))
    {
        return true;
    }
    // autoStart only forces a restart when it turns on.
    if spec.auto_start && !bool_value(data.get("autoStart")) {
        return true;
    }
    false
}

fn nonempty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// String equality where absent, null and empty are all equal.
fn opt_str_eq(spec: Option<&str>, data: Option<&Value>) -> bool {
    spec.filter(|s| !s.is_empty()) == value_str(data).as_deref()
}

fn value_str(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn str_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(stringify).collect(),
        _ => Vec::new(),
    }
}

fn str_map(value: Option<&Value>) -> BTreeMap<String, String> {
    match value {
        Some(Value::Object(map)) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), stringify(v)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

fn int_value(value: Option<&Value>) -> Option<u64> {
    match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

fn bool_value(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

/// Deep-normalize for structural auth comparison: empty strings, empty
/// containers and nulls all collapse to null, so `{}`, `null` and an
/// absent block compare equal regardless of how the registry stored them.
fn normalize(value: Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) if s.is_empty() => Value::Null,
        Value::String(s) => Value::String(s),
        Value::Array(items) => {
            let items: Vec<Value> =
                items.into_iter().map(normalize).filter(|v| !v.is_null()).collect();
            if items.is_empty() {
                Value::Null
            } else {
                Value::Array(items)
            }
        }
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| {
                    let v = normalize(v);
                    if v.is_null() {
                        None
                    } else {
                        Some((k, v))
                    }
                })
                .collect();
            if map.is_empty() {
                Value::Null
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
