//! Parameter filters
//!
//! Parameters reference filters by identifier only. The identifiers are
//! resolved against a [`FilterRegistry`] when a value is actually processed,
//! so a description can name filters the registry learns about later.
//!
//! A filter reference takes one of three shapes in a raw description:
//! - a name: `"strtolower"` or a qualified `"Formatter::upper"`
//! - an empty name, which is skipped
//! - a call form: `{"method": "trim", "args": ["@value", "/"]}`

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Placeholder inside call-form `args` that is replaced by the filtered value.
pub const VALUE_PLACEHOLDER: &str = "@value";

/// Error raised while applying a filter chain
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("Unknown filter: {0}")]
    UnknownFilter(String),
    #[error("Filter '{filter}' failed: {reason}")]
    Failed { filter: String, reason: String },
}

/// A single filter reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterSpec {
    /// Filter referenced by name
    Name(String),
    /// Filter referenced by name with explicit arguments
    Call {
        method: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<Value>,
    },
}

impl FilterSpec {
    /// Identifier used to look the filter up
    pub fn method(&self) -> &str {
        match self {
            FilterSpec::Name(name) => name,
            FilterSpec::Call { method, .. } => method,
        }
    }

    /// Arguments for the call form; empty for a plain name
    pub fn args(&self) -> &[Value] {
        match self {
            FilterSpec::Name(_) => &[],
            FilterSpec::Call { args, .. } => args,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.method().trim().is_empty()
    }
}

/// The `filters` attribute of a parameter, preserving its input shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filters {
    Chain(Vec<FilterSpec>),
    Single(FilterSpec),
}

impl Filters {
    /// Filters in application order
    pub fn iter(&self) -> impl Iterator<Item = &FilterSpec> {
        let specs: &[FilterSpec] = match self {
            Filters::Single(spec) => std::slice::from_ref(spec),
            Filters::Chain(specs) => specs,
        };
        specs.iter()
    }
}

/// Signature of a registered filter: the value plus the call-form arguments
/// (with [`VALUE_PLACEHOLDER`] already substituted).
pub type FilterFn = Arc<dyn Fn(Value, &[Value]) -> Result<Value, FilterError> + Send + Sync>;

/// Registry mapping filter identifiers to transform functions
#[derive(Clone)]
pub struct FilterRegistry {
    filters: HashMap<String, FilterFn>,
}

static BUILTINS: Lazy<FilterRegistry> = Lazy::new(|| {
    let mut registry = FilterRegistry::empty();
    registry.register("strtolower", |value, _| map_str("strtolower", value, str::to_lowercase));
    registry.register("strtoupper", |value, _| map_str("strtoupper", value, str::to_uppercase));
    registry.register("trim", |value, args| match args.get(1).and_then(Value::as_str) {
        Some(chars) => map_str("trim", value, |s| {
            s.trim_matches(|c: char| chars.contains(c)).to_string()
        }),
        None => map_str("trim", value, |s| s.trim().to_string()),
    });
    registry.register("json_encode", |value, _| {
        serde_json::to_string(&value)
            .map(Value::String)
            .map_err(|e| FilterError::Failed {
                filter: "json_encode".to_string(),
                reason: e.to_string(),
            })
    });
    registry.register("intval", |value, _| match &value {
        Value::Number(n) => Ok(Value::from(
            n.as_i64()
                .unwrap_or_else(|| n.as_f64().unwrap_or_default() as i64),
        )),
        Value::Bool(b) => Ok(Value::from(*b as i64)),
        Value::String(s) => Ok(Value::from(leading_int(s))),
        _ => Err(FilterError::Failed {
            filter: "intval".to_string(),
            reason: "value is not a scalar".to_string(),
        }),
    });
    registry
});

fn map_str(
    filter: &str,
    value: Value,
    f: impl FnOnce(&str) -> String,
) -> Result<Value, FilterError> {
    match value {
        Value::String(s) => Ok(Value::String(f(&s))),
        other => Err(FilterError::Failed {
            filter: filter.to_string(),
            reason: format!("expected a string, got {}", other),
        }),
    }
}

/// Integer prefix of a string, `0` when there is none
fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    s[..end].parse().unwrap_or(0)
}

impl FilterRegistry {
    /// Registry with no filters at all
    pub fn empty() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// Registry pre-loaded with the built-in filters
    /// (`strtolower`, `strtoupper`, `trim`, `json_encode`, `intval`)
    pub fn new() -> Self {
        BUILTINS.clone()
    }

    /// Shared read-only built-in registry
    pub fn builtins() -> &'static FilterRegistry {
        &BUILTINS
    }

    /// Register (or replace) a filter under `name`
    pub fn register<F>(&mut self, name: impl Into<String>, filter: F) -> &mut Self
    where
        F: Fn(Value, &[Value]) -> Result<Value, FilterError> + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Arc::new(filter));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Apply one filter reference to `value`
    ///
    /// Empty references leave the value untouched.
    pub fn apply(&self, spec: &FilterSpec, value: Value) -> Result<Value, FilterError> {
        if spec.is_empty() {
            return Ok(value);
        }
        let filter = self
            .filters
            .get(spec.method())
            .ok_or_else(|| FilterError::UnknownFilter(spec.method().to_string()))?;

        let args: Vec<Value> = spec
            .args()
            .iter()
            .map(|arg| match arg {
                Value::String(s) if s == VALUE_PLACEHOLDER => value.clone(),
                other => other.clone(),
            })
            .collect();
        filter(value, &args)
    }

    /// Apply a whole chain in order
    pub fn apply_all(&self, filters: &Filters, value: Value) -> Result<Value, FilterError> {
        filters
            .iter()
            .try_fold(value, |value, spec| self.apply(spec, value))
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.filters.keys().collect();
        names.sort();
        f.debug_struct("FilterRegistry")
            .field("filters", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filters_keep_input_shape() {
        let single: Filters = serde_json::from_value(json!("strtolower")).unwrap();
        assert_eq!(single, Filters::Single(FilterSpec::Name("strtolower".to_string())));
        assert_eq!(serde_json::to_value(&single).unwrap(), json!("strtolower"));

        let chain: Filters =
            serde_json::from_value(json!(["trim", {"method": "strtoupper"}])).unwrap();
        assert_eq!(chain.iter().count(), 2);
        assert_eq!(
            serde_json::to_value(&chain).unwrap(),
            json!(["trim", {"method": "strtoupper"}])
        );
    }

    #[test]
    fn test_builtin_filters() {
        let registry = FilterRegistry::new();
        let lower = FilterSpec::Name("strtolower".to_string());
        assert_eq!(registry.apply(&lower, json!("MiXeD")).unwrap(), json!("mixed"));

        let intval = FilterSpec::Name("intval".to_string());
        assert_eq!(registry.apply(&intval, json!("42abc")).unwrap(), json!(42));
        assert_eq!(registry.apply(&intval, json!(true)).unwrap(), json!(1));
    }

    #[test]
    fn test_call_form_substitutes_value() {
        let registry = FilterRegistry::new();
        let trim: FilterSpec =
            serde_json::from_value(json!({"method": "trim", "args": ["@value", "/"]})).unwrap();
        assert_eq!(registry.apply(&trim, json!("/a/b/")).unwrap(), json!("a/b"));
    }

    #[test]
    fn test_empty_filter_is_skipped() {
        let registry = FilterRegistry::empty();
        let empty = FilterSpec::Name(String::new());
        assert_eq!(registry.apply(&empty, json!("x")).unwrap(), json!("x"));
    }

    #[test]
    fn test_unknown_filter_is_reported_when_applied() {
        let registry = FilterRegistry::empty();
        let spec = FilterSpec::Name("Formatter::upper".to_string());
        assert_eq!(
            registry.apply(&spec, json!("x")),
            Err(FilterError::UnknownFilter("Formatter::upper".to_string()))
        );
    }

    #[test]
    fn test_qualified_filter_registration() {
        let mut registry = FilterRegistry::empty();
        registry.register("Formatter::upper", |value, _| {
            map_str("Formatter::upper", value, str::to_uppercase)
        });
        let chain = Filters::Chain(vec![
            FilterSpec::Name("Formatter::upper".to_string()),
            FilterSpec::Name(String::new()),
        ]);
        assert_eq!(registry.apply_all(&chain, json!("abc")).unwrap(), json!("ABC"));
    }
}
