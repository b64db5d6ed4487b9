use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use crate::errs::Errs;
use crate::value::Value;

/// Signature every field checker has.
///
/// A checker coerces `value` into its normalized form, or records why it
/// cannot and returns `None`.
pub type Checker = Box<dyn Fn(&mut Errs, &str, &Value) -> Option<Value>>;

/// Post-validation value translation.
pub type Transform = Box<dyn Fn(Value) -> Value>;

/// One row of a rule table: a checker plus optional default, output key
/// and value transform.
pub struct Check {
    checker: Checker,
    default: Option<Value>,
    out_key: Option<String>,
    transform: Option<Transform>,
    required: bool,
}

impl Check {
    pub fn new(checker: impl Fn(&mut Errs, &str, &Value) -> Option<Value> + 'static) -> Self {
        Self {
            checker: Box::new(checker),
            default: None,
            out_key: None,
            transform: None,
            required: false,
        }
    }

    /// Value substituted when the field is absent. Defaults bypass the checker.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Store the validated value under `key` instead of the field name.
    ///
    /// Dotted keys (`parameters.id`) place the value in a nested map.
    pub fn rename(mut self, key: impl Into<String>) -> Self {
        self.out_key = Some(key.into());
        self
    }

    /// Translate the validated value before it is stored.
    pub fn transform(mut self, f: impl Fn(Value) -> Value + 'static) -> Self {
        self.transform = Some(Box::new(f));
        self
    }

    /// Report the field as missing when it is absent and has no default.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn validate(&self, errs: &mut Errs, key: &str, value: &Value) -> Option<Value> {
        (self.checker)(errs, key, value)
    }

    fn key_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.out_key.as_deref().unwrap_or(key)
    }
}

/// A per-field rule table.
#[derive(Default)]
pub struct Rules {
    checks: BTreeMap<String, Check>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: impl Into<String>, check: Check) -> Self {
        self.checks.insert(key.into(), check);
        self
    }

    /// Add every row of `other` to this table.
    pub fn extend(mut self, other: Rules) -> Self {
        self.checks.extend(other.checks);
        self
    }

    /// Check `value` against this table.
    ///
    /// Every field is visited even after a failure so one pass reports all
    /// problems. Keys present in `value` but absent from the table are
    /// rejected. `Null` is treated as an empty table. Returns `None` if
    /// anything failed.
    pub fn validate(&self, errs: &mut Errs, value: &Value) -> Option<Checked> {
        let empty = BTreeMap::new();
        let input = match value {
            Value::Map(map) => map,
            Value::Null => &empty,
            other => {
                errs.push(format!(
                    "cannot validate {} {other} as a table",
                    other.kind()
                ));
                return None;
            }
        };

        let mut ok = true;
        for key in input.keys() {
            if !self.checks.contains_key(key) {
                errs.push(format!("Key {key} is not supported"));
                ok = false;
            }
        }

        let mut out = Checked::default();
        for (key, check) in &self.checks {
            let Some(raw) = input.get(key) else {
                if let Some(default) = &check.default {
                    out.insert_path(check.key_name(key), default.clone());
                } else if check.required {
                    errs.push(format!("{key} is required"));
                    ok = false;
                }
                continue;
            };
            let Some(mut checked) = check.validate(errs, key, raw) else {
                ok = false;
                continue;
            };
            if let Some(transform) = &check.transform {
                checked = transform(checked);
            }
            out.insert_path(check.key_name(key), checked);
        }

        ok.then_some(out)
    }
}

/// The validated output of a rule table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Checked(BTreeMap<String, Value>);

impl Checked {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn take(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Strings of a list field; non-string entries are skipped.
    pub fn str_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .and_then(Value::as_list)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove and return a map field, or an empty map.
    pub fn take_map(&mut self, key: &str) -> BTreeMap<String, Value> {
        match self.take(key) {
            Some(Value::Map(map)) => map,
            _ => BTreeMap::new(),
        }
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Map(self.0)
    }

    /// Decode the checked fields into a typed struct.
    ///
    /// Fields the struct does not name are ignored, so one checked table
    /// can feed several structs.
    pub fn decode<T: DeserializeOwned>(&self, errs: &mut Errs) -> Option<T> {
        let decoded = serde_yaml::to_value(&self.0).and_then(serde_yaml::from_value::<T>);
        match decoded {
            Ok(value) => Some(value),
            Err(err) => {
                errs.push(format!(
                    "Error converting to {}: {err}",
                    short_type_name::<T>()
                ));
                None
            }
        }
    }

    fn insert_path(&mut self, key: &str, value: Value) {
        let mut segments: Vec<&str> = key.split('.').collect();
        let Some(last) = segments.pop() else {
            return;
        };
        let mut current = &mut self.0;
        for segment in segments {
            let slot = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            if !matches!(slot, Value::Map(_)) {
                *slot = Value::Map(BTreeMap::new());
            }
            let Value::Map(next) = slot else {
                return;
            };
            current = next;
        }
        current.insert(last.to_string(), value);
    }
}

impl From<Checked> for Value {
    fn from(checked: Checked) -> Self {
        checked.into_value()
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
