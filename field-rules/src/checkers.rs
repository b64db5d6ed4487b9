//! Stock checkers.
//!
//! Each constructor returns a closure usable with [`Check::new`]. Coercion is
//! permissive about representation (`"on"` is a boolean, `"0x10"` is an
//! integer) but fails closed on any input type it does not recognize.

use std::collections::BTreeMap;

use crate::check::{Check, Rules};
use crate::errs::Errs;
use crate::value::Value;

/// Checker that always fails. Used for unsupported or removed fields.
pub fn unsupported() -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    |errs: &mut Errs, key: &str, _value: &Value| {
        errs.push(format!("Key {key} is not supported"));
        None
    }
}

/// Accepts native booleans, `0`/`1`, and the strings
/// `0 f false off` / `1 t true on`.
pub fn boolean() -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    |errs: &mut Errs, key: &str, value: &Value| match coerce_bool(value) {
        Some(b) => Some(Value::Bool(b)),
        None => {
            errs.push(format!("{key}: Cannot cast {value} to a boolean"));
            None
        }
    }
}

/// Accepts any integral representation within `min..=max`.
pub fn int_in(min: i64, max: i64) -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    move |errs: &mut Errs, key: &str, value: &Value| {
        let parsed = match value {
            Value::Int(i) => Ok(*i),
            Value::Float(x) if x.is_finite() => Ok(x.trunc() as i64),
            Value::Str(s) => parse_int(s),
            other => Err(format!("Cannot cast {}({other}) to an int", other.kind())),
        };
        let n = match parsed {
            Ok(n) => n,
            Err(reason) => {
                errs.push(format!("{key}: {reason}"));
                return None;
            }
        };
        if n < min || n > max {
            errs.push(format!("{key}: {n} out of range {min}:{max}"));
            return None;
        }
        Some(Value::Int(n))
    }
}

/// Any string.
pub fn string() -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    str_in(&[])
}

/// A string, restricted to `allowed` when it is non-empty.
pub fn str_in(allowed: &[&str]) -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
    move |errs: &mut Errs, key: &str, value: &Value| check_str(errs, key, value, &allowed)
}

/// A list of strings, each restricted to `allowed` when it is non-empty.
pub fn str_list_in(allowed: &[&str]) -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
    move |errs: &mut Errs, key: &str, value: &Value| {
        let Some(items) = value.as_list() else {
            errs.push(format!(
                "{key}: Failed to translate {value} into a string list"
            ));
            return None;
        };
        let mut ok = true;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match check_str(errs, key, item, &allowed) {
                Some(v) => out.push(v),
                None => ok = false,
            }
        }
        ok.then_some(Value::List(out))
    }
}

/// A string list with no restriction on values.
pub fn str_list() -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    str_list_in(&[])
}

/// A map with arbitrary contents. `Null` is an empty map.
pub fn table() -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    |errs: &mut Errs, key: &str, value: &Value| match value {
        Value::Map(_) => Some(value.clone()),
        Value::Null => Some(Value::Map(BTreeMap::new())),
        other => {
            errs.push(format!("{key}: {} is not a table", other.kind()));
            None
        }
    }
}

/// A sub-table checked against its own rules.
pub fn nested(rules: Rules) -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    move |errs: &mut Errs, key: &str, value: &Value| {
        let mut sub = Errs::new(key);
        let res = rules.validate(&mut sub, value);
        errs.merge(sub);
        res.map(Value::from)
    }
}

/// A list of sub-tables, each checked against `rules`.
pub fn list_of(rules: Rules) -> impl Fn(&mut Errs, &str, &Value) -> Option<Value> {
    move |errs: &mut Errs, key: &str, value: &Value| {
        let Some(items) = value.as_list() else {
            errs.push(format!("{key} in invalid format: {}", value.kind()));
            return None;
        };
        let mut ok = true;
        let mut out = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let mut sub = Errs::new(format!("{key}[{idx}]"));
            match rules.validate(&mut sub, item) {
                Some(checked) => out.push(checked.into_value()),
                None => ok = false,
            }
            errs.merge(sub);
        }
        ok.then_some(Value::List(out))
    }
}

/// Shorthand for a [`Check`] with no default.
pub fn c(checker: impl Fn(&mut Errs, &str, &Value) -> Option<Value> + 'static) -> Check {
    Check::new(checker)
}

/// Shorthand for a [`Check`] with a default value.
pub fn d(
    default: impl Into<Value>,
    checker: impl Fn(&mut Errs, &str, &Value) -> Option<Value> + 'static,
) -> Check {
    Check::new(checker).default_value(default)
}

/// Boolean coercion shared with callers that need it outside a rule table.
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(0) => Some(false),
        Value::Int(1) => Some(true),
        Value::Str(s) => match s.as_str() {
            "0" | "f" | "false" | "off" => Some(false),
            "1" | "t" | "true" | "on" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

fn check_str(errs: &mut Errs, key: &str, value: &Value, allowed: &[String]) -> Option<Value> {
    let Some(s) = value.as_str() else {
        errs.push(format!("{key}: {value} is not a string"));
        return None;
    };
    if !allowed.is_empty() && !allowed.iter().any(|a| a == s) {
        errs.push(format!(
            "{key}: {s}: Not in valid set: [{}]",
            allowed.join(", ")
        ));
        return None;
    }
    Some(Value::Str(s.to_string()))
}

fn parse_int(raw: &str) -> Result<i64, String> {
    let trimmed = raw.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (radix, digits) = if let Some(rest) = body.strip_prefix("0x").or(body.strip_prefix("0X")) {
        (16, rest)
    } else if let Some(rest) = body.strip_prefix("0o").or(body.strip_prefix("0O")) {
        (8, rest)
    } else if let Some(rest) = body.strip_prefix("0b").or(body.strip_prefix("0B")) {
        (2, rest)
    } else {
        (10, body)
    };
    let digits = digits.replace('_', "");
    let magnitude = i64::from_str_radix(&digits, radix)
        .map_err(|err| format!("Cannot cast {raw} to an int: {err}"))?;
    Ok(if negative { -magnitude } else { magnitude })
}
