//! Typed access to module configuration keys.
//!
//! Peers are loose about types: numbers may arrive as numeric strings and
//! booleans as `"true"`/`"false"`. Both forms are accepted.

use serde_json::Value;

use crate::document::ConfigMap;
use crate::error::ConfigKeyError;

fn lookup<'a>(config: &'a ConfigMap, key: &str) -> Result<&'a Value, ConfigKeyError> {
    config.get(key).ok_or_else(|| ConfigKeyError::Missing {
        key: key.to_string(),
    })
}

fn invalid(key: &str, expected: &'static str) -> ConfigKeyError {
    ConfigKeyError::Invalid {
        key: key.to_string(),
        expected,
    }
}

/// Numeric value of a JSON number or numeric string.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

pub fn require_f64(config: &ConfigMap, key: &str) -> Result<f64, ConfigKeyError> {
    as_f64(lookup(config, key)?).ok_or_else(|| invalid(key, "a number"))
}

pub fn require_i64(config: &ConfigMap, key: &str) -> Result<i64, ConfigKeyError> {
    let value = lookup(config, key)?;
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(key, "an integer"))
}

pub fn require_bool(config: &ConfigMap, key: &str) -> Result<bool, ConfigKeyError> {
    match lookup(config, key)? {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(invalid(key, "a boolean")),
    }
}

pub fn require_string_list(config: &ConfigMap, key: &str) -> Result<Vec<String>, ConfigKeyError> {
    let Value::Array(items) = lookup(config, key)? else {
        return Err(invalid(key, "an array of strings"));
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(key, "an array of strings"))
        })
        .collect()
}
