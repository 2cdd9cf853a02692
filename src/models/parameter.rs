//! Parameter schema
//!
//! A [`Parameter`] describes one named, typed field of an operation. It is
//! built from a raw key/attribute mapping and serialized back sparsely: only
//! attributes present in the input are emitted, never `name` or the parent
//! relation.
//!
//! Parameters nest through `properties` (named children) and `items` (the
//! schema of array elements).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use tracing::debug;

use super::{DescriptionError, ParameterType, restore_nulls, take_nulls};
use crate::filter::{FilterError, FilterRegistry, Filters};

/// Non-owning link from a parameter to whatever owns it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParentRef {
    /// Owned by the operation with this name
    Operation(String),
    /// Owned by the parameter at this dotted path (e.g. `address.street`)
    Parameter(String),
}

/// Attributes copied from the raw definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParameterAttributes {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    param_type: Option<ParameterType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// Where the value is sent (e.g. `query`, `json`, `header`)
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    /// Wire name when it differs from the parameter name
    #[serde(skip_serializing_if = "Option::is_none")]
    sent_as: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minimum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    maximum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<Filters>,
    /// Constraint keys without a typed field, kept verbatim
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// A typed field schema
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: Option<String>,
    attributes: ParameterAttributes,
    properties: Option<BTreeMap<String, Parameter>>,
    items: Option<Box<Parameter>>,
    explicit_nulls: Vec<String>,
    parent: ParentRef,
}

impl Parameter {
    /// Build a parameter from its raw attribute mapping.
    ///
    /// # Arguments
    ///
    /// * `raw` - The raw definition; must be a mapping.
    /// * `name` - Name to use when the definition has no `name` of its own
    ///   (usually the key it was found under).
    /// * `parent` - The owner of this parameter.
    ///
    /// # Example
    ///
    /// ```rust
    /// use service_description::models::{Parameter, ParentRef};
    /// use serde_json::json;
    ///
    /// let param = Parameter::from_value(
    ///     &json!({"type": "string", "maxLength": 10}),
    ///     Some("key"),
    ///     ParentRef::Operation("PutKey".to_string()),
    /// )
    /// .unwrap();
    /// assert_eq!(param.name(), Some("key"));
    /// assert_eq!(param.max_length(), Some(10));
    /// ```
    pub fn from_value(
        raw: &Value,
        name: Option<&str>,
        parent: ParentRef,
    ) -> Result<Self, DescriptionError> {
        Self::build(raw, name, name.unwrap_or_default(), parent)
    }

    /// Build with an explicit `path`, used to name the offending key in errors
    /// and as the parent reference of nested children.
    pub(crate) fn build(
        raw: &Value,
        name: Option<&str>,
        path: &str,
        parent: ParentRef,
    ) -> Result<Self, DescriptionError> {
        let mut map = raw
            .as_object()
            .cloned()
            .ok_or_else(|| DescriptionError::invalid(path, "parameters must be mappings"))?;
        let explicit_nulls = take_nulls(&mut map);

        let name = match map.remove("name") {
            None | Some(Value::Null) => name.map(str::to_string),
            Some(Value::String(explicit)) => Some(explicit),
            Some(other) => {
                return Err(DescriptionError::invalid(
                    path,
                    format!("name must be a string, got {}", other),
                ));
            }
        };

        let properties = match map.remove("properties") {
            None => None,
            Some(Value::Object(children)) => {
                let mut built = BTreeMap::new();
                for (child, def) in &children {
                    let child_path = format!("{}.{}", path, child);
                    let param = Self::build(
                        def,
                        Some(child),
                        &child_path,
                        ParentRef::Parameter(path.to_string()),
                    )?;
                    built.insert(child.clone(), param);
                }
                Some(built)
            }
            Some(_) => {
                return Err(DescriptionError::invalid(
                    format!("{}.properties", path),
                    "properties must be a mapping",
                ));
            }
        };

        let items = match map.remove("items") {
            None => None,
            Some(def) => Some(Box::new(Self::build(
                &def,
                None,
                &format!("{}[]", path),
                ParentRef::Parameter(path.to_string()),
            )?)),
        };

        let attributes: ParameterAttributes = serde_json::from_value(Value::Object(map))
            .map_err(|e| DescriptionError::invalid(path, e.to_string()))?;

        debug!("Built parameter '{}'", path);

        Ok(Self {
            name,
            attributes,
            properties,
            items,
            explicit_nulls,
            parent,
        })
    }

    /// Name of the parameter; `None` only for an unnamed `additionalParameters` schema
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name used on the wire: `sentAs` when set, otherwise the name
    pub fn wire_name(&self) -> Option<&str> {
        self.attributes.sent_as.as_deref().or(self.name())
    }

    pub fn param_type(&self) -> Option<ParameterType> {
        self.attributes.param_type
    }

    pub fn is_required(&self) -> bool {
        self.attributes.required.unwrap_or(false)
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.attributes.default.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.attributes.description.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.attributes.location.as_deref()
    }

    pub fn sent_as(&self) -> Option<&str> {
        self.attributes.sent_as.as_deref()
    }

    pub fn max_length(&self) -> Option<u64> {
        self.attributes.max_length
    }

    pub fn min_length(&self) -> Option<u64> {
        self.attributes.min_length
    }

    pub fn minimum(&self) -> Option<&Number> {
        self.attributes.minimum.as_ref()
    }

    pub fn maximum(&self) -> Option<&Number> {
        self.attributes.maximum.as_ref()
    }

    pub fn pattern(&self) -> Option<&str> {
        self.attributes.pattern.as_deref()
    }

    pub fn enum_values(&self) -> Option<&[Value]> {
        self.attributes.enum_values.as_deref()
    }

    pub fn filters(&self) -> Option<&Filters> {
        self.attributes.filters.as_ref()
    }

    /// Untyped constraint keys carried through from the raw definition
    pub fn extra(&self) -> &Map<String, Value> {
        &self.attributes.extra
    }

    pub fn properties(&self) -> Option<&BTreeMap<String, Parameter>> {
        self.properties.as_ref()
    }

    pub fn get_property(&self, name: &str) -> Option<&Parameter> {
        self.properties.as_ref().and_then(|props| props.get(name))
    }

    pub fn items(&self) -> Option<&Parameter> {
        self.items.as_deref()
    }

    pub fn parent(&self) -> &ParentRef {
        &self.parent
    }

    /// Resolve the value to send for this parameter.
    ///
    /// An absent or `null` value falls back to the declared default; whatever
    /// results is then run through the filter chain, resolving filter
    /// identifiers against `registry`.
    pub fn process_value(
        &self,
        value: Option<Value>,
        registry: &FilterRegistry,
    ) -> Result<Option<Value>, FilterError> {
        let value = value
            .filter(|value| !value.is_null())
            .or_else(|| self.attributes.default.clone());
        match (value, &self.attributes.filters) {
            (Some(value), Some(filters)) => registry.apply_all(filters, value).map(Some),
            (value, _) => Ok(value),
        }
    }

    /// Sparse serialized form: explicitly set attributes only
    pub fn to_value(&self) -> Value {
        let mut out = match serde_json::to_value(&self.attributes) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        if let Some(properties) = &self.properties {
            let rendered = properties
                .iter()
                .map(|(name, param)| (name.clone(), param.to_value()))
                .collect();
            out.insert("properties".to_string(), Value::Object(rendered));
        }
        if let Some(items) = &self.items {
            out.insert("items".to_string(), items.to_value());
        }
        restore_nulls(&mut out, &self.explicit_nulls);
        Value::Object(out)
    }
}
