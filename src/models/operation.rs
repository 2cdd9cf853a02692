//! Operation schema
//!
//! An [`Operation`] is the declarative description of one remote API action:
//! HTTP method, URI template, documentation metadata, named parameters, an
//! optional schema for additional (unnamed) parameters and the error
//! responses the action can produce.
//!
//! Raw definitions are split into two buckets on construction. Recognized
//! schema attributes land in typed fields; any other top-level key is kept in
//! an auxiliary bag and serialized back inline, so unknown keys survive a
//! round-trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Weak;
use tracing::debug;

use super::description::{Description, DescriptionInner};
use super::parameter::{Parameter, ParentRef};
use super::{DescriptionError, restore_nulls, take_nulls};

/// Key under which the additional-parameters schema is declared
pub const ADDITIONAL_PARAMETERS: &str = "additionalParameters";

/// Scalar attributes copied verbatim from the raw definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    documentation_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    http_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deprecated: Option<bool>,
    /// Command class / kind identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    class: Option<String>,
    /// Top-level keys that are not schema attributes
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Mapping from a remote error to an error kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Reason phrase or remote error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Error kind identifier raised for this response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `additionalParameters` declaration of an operation
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalParameters {
    /// A parameter schema applied to every undeclared key
    Schema(Parameter),
    /// A non-mapping value, kept as written (usually `true` or `false`)
    Literal(Value),
}

impl AdditionalParameters {
    pub fn schema(&self) -> Option<&Parameter> {
        match self {
            AdditionalParameters::Schema(param) => Some(param),
            AdditionalParameters::Literal(_) => None,
        }
    }

    /// Whether undeclared keys are accepted unchecked (`true`)
    pub fn allows_unchecked(&self) -> bool {
        matches!(self, AdditionalParameters::Literal(Value::Bool(true)))
    }

    fn to_value(&self) -> Value {
        match self {
            AdditionalParameters::Schema(param) => param.to_value(),
            AdditionalParameters::Literal(value) => value.clone(),
        }
    }
}

/// Schema of a single API operation
#[derive(Debug, Clone)]
pub struct Operation {
    name: String,
    attributes: OperationAttributes,
    parameters: BTreeMap<String, Parameter>,
    additional_parameters: Option<AdditionalParameters>,
    error_responses: Vec<ErrorResponse>,
    data: Map<String, Value>,
    explicit_nulls: Vec<String>,
    description: Weak<DescriptionInner>,
}

impl Operation {
    /// Build an operation from its raw definition.
    ///
    /// Construction is atomic: every parameter entry is shape-checked before
    /// any [`Parameter`] is built, and any failure discards the whole
    /// operation.
    ///
    /// # Arguments
    ///
    /// * `raw` - The raw operation definition (a mapping).
    /// * `description` - The description this operation belongs to. Only a
    ///   non-owning link is kept.
    ///
    /// # Example
    ///
    /// ```rust
    /// use service_description::models::{Description, Operation};
    /// use serde_json::json;
    ///
    /// let description = Description::empty();
    /// let op = Operation::new(
    ///     &json!({"httpMethod": "GET", "uri": "/users/{id}", "parameters": {"id": {"type": "integer"}}}),
    ///     &description,
    /// )
    /// .unwrap();
    /// assert!(op.has_param("id"));
    /// ```
    pub fn new(raw: &Value, description: &Description) -> Result<Self, DescriptionError> {
        let mut operation = Self::parse(raw, None)?;
        operation.description = description.downgrade();
        Ok(operation)
    }

    /// Normalize a raw definition without linking it to a description yet
    pub(crate) fn parse(raw: &Value, name_hint: Option<&str>) -> Result<Self, DescriptionError> {
        let context = name_hint.unwrap_or("operation");
        let mut map = raw.as_object().cloned().ok_or_else(|| {
            DescriptionError::invalid(context, "operation definitions must be mappings")
        })?;
        let explicit_nulls = take_nulls(&mut map);

        let name = match map.remove("name") {
            None | Some(Value::Null) => name_hint.unwrap_or_default().to_string(),
            Some(Value::String(name)) => name,
            Some(other) => {
                return Err(DescriptionError::invalid(
                    "name",
                    format!("name must be a string, got {}", other),
                ));
            }
        };

        let raw_parameters = match map.remove("parameters") {
            None => Map::new(),
            Some(Value::Object(parameters)) => parameters,
            Some(_) => {
                return Err(DescriptionError::invalid(
                    "parameters",
                    "parameters must be a mapping of name to definition",
                ));
            }
        };
        if let Some((key, _)) = raw_parameters.iter().find(|(_, def)| !def.is_object()) {
            return Err(DescriptionError::invalid(key, "parameters must be mappings"));
        }

        let mut parameters = BTreeMap::new();
        for (key, def) in &raw_parameters {
            let param = Parameter::build(def, Some(key), key, ParentRef::Operation(name.clone()))?;
            parameters.insert(key.clone(), param);
        }

        let additional_parameters = match map.remove(ADDITIONAL_PARAMETERS) {
            None => None,
            Some(def @ Value::Object(_)) => Some(AdditionalParameters::Schema(Parameter::build(
                &def,
                None,
                ADDITIONAL_PARAMETERS,
                ParentRef::Operation(name.clone()),
            )?)),
            Some(literal) => Some(AdditionalParameters::Literal(literal)),
        };

        let error_responses: Vec<ErrorResponse> = match map.remove("errorResponses") {
            None => Vec::new(),
            Some(list) => serde_json::from_value(list)
                .map_err(|e| DescriptionError::invalid("errorResponses", e.to_string()))?,
        };

        let data = match map.remove("data") {
            None => Map::new(),
            Some(Value::Object(data)) => data,
            Some(_) => return Err(DescriptionError::invalid("data", "data must be a mapping")),
        };

        let attributes: OperationAttributes = serde_json::from_value(Value::Object(map))
            .map_err(|e| DescriptionError::invalid(context, e.to_string()))?;

        debug!(
            "Built operation '{}' with {} parameters",
            name,
            parameters.len()
        );

        Ok(Self {
            name,
            attributes,
            parameters,
            additional_parameters,
            error_responses,
            data,
            explicit_nulls,
            description: Weak::new(),
        })
    }

    /// Link to the owning description
    pub(crate) fn attach(mut self, description: Weak<DescriptionInner>) -> Self {
        self.description = description;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> &str {
        self.attributes.summary.as_deref().unwrap_or_default()
    }

    pub fn notes(&self) -> &str {
        self.attributes.notes.as_deref().unwrap_or_default()
    }

    pub fn documentation_url(&self) -> &str {
        self.attributes.documentation_url.as_deref().unwrap_or_default()
    }

    pub fn http_method(&self) -> &str {
        self.attributes.http_method.as_deref().unwrap_or_default()
    }

    pub fn uri(&self) -> &str {
        self.attributes.uri.as_deref().unwrap_or_default()
    }

    pub fn response_model(&self) -> &str {
        self.attributes.response_model.as_deref().unwrap_or_default()
    }

    pub fn is_deprecated(&self) -> bool {
        self.attributes.deprecated.unwrap_or(false)
    }

    pub fn class(&self) -> &str {
        self.attributes.class.as_deref().unwrap_or_default()
    }

    /// Look up a named parameter
    pub fn get_param(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn params(&self) -> &BTreeMap<String, Parameter> {
        &self.parameters
    }

    /// Schema applied to keys not declared under `parameters`, when it is a mapping
    pub fn additional_parameters(&self) -> Option<&Parameter> {
        self.additional_parameters
            .as_ref()
            .and_then(AdditionalParameters::schema)
    }

    /// The `additionalParameters` declaration as written
    pub fn additional_parameters_declaration(&self) -> Option<&AdditionalParameters> {
        self.additional_parameters.as_ref()
    }

    pub fn error_responses(&self) -> &[ErrorResponse] {
        &self.error_responses
    }

    /// First error response declared for an HTTP status code
    pub fn error_response_for(&self, code: u16) -> Option<&ErrorResponse> {
        self.error_responses
            .iter()
            .find(|response| response.code == Some(code))
    }

    /// Look up one auxiliary value.
    ///
    /// The `data` mapping is consulted first, then the unrecognized
    /// top-level keys.
    pub fn get_data(&self, key: &str) -> Option<&Value> {
        self.data
            .get(key)
            .or_else(|| self.attributes.extra.get(key))
    }

    /// The explicit `data` mapping only; unrecognized top-level keys are in
    /// [`Operation::extra`]
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Top-level keys that are not schema attributes
    pub fn extra(&self) -> &Map<String, Value> {
        &self.attributes.extra
    }

    /// The owning description, while it is still alive
    pub fn description(&self) -> Option<Description> {
        self.description.upgrade().map(Description::from_inner)
    }

    /// Serialized form of the operation.
    ///
    /// `name` is identity rather than payload and is not emitted; absent
    /// attributes stay absent and explicit `null`s are written back.
    /// `parameters` is always present.
    pub fn to_value(&self) -> Value {
        let mut out = match serde_json::to_value(&self.attributes) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };

        let parameters = self
            .parameters
            .iter()
            .map(|(name, param)| (name.clone(), param.to_value()))
            .collect();
        out.insert("parameters".to_string(), Value::Object(parameters));

        if let Some(additional) = &self.additional_parameters {
            out.insert(ADDITIONAL_PARAMETERS.to_string(), additional.to_value());
        }
        if !self.error_responses.is_empty()
            && let Ok(responses) = serde_json::to_value(&self.error_responses)
        {
            out.insert("errorResponses".to_string(), responses);
        }
        if !self.data.is_empty() {
            out.insert("data".to_string(), Value::Object(self.data.clone()));
        }
        restore_nulls(&mut out, &self.explicit_nulls);
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_keeps_name_hint_when_absent() {
        let op = Operation::parse(&json!({}), Some("ListUsers")).unwrap();
        assert_eq!(op.name(), "ListUsers");
        assert!(op.description().is_none());
    }

    #[test]
    fn test_parameters_must_be_a_mapping() {
        let err = Operation::parse(&json!({"parameters": ["a", "b"]}), None).unwrap_err();
        assert_eq!(err.key(), "parameters");
    }

    #[test]
    fn test_additional_parameters_literals_are_kept() {
        let closed = Operation::parse(&json!({"additionalParameters": false}), None).unwrap();
        assert!(closed.additional_parameters().is_none());
        assert_eq!(
            closed.additional_parameters_declaration(),
            Some(&AdditionalParameters::Literal(json!(false)))
        );
        assert_eq!(closed.to_value()[ADDITIONAL_PARAMETERS], json!(false));

        let open = Operation::parse(&json!({"additionalParameters": true}), None).unwrap();
        assert!(open.additional_parameters().is_none());
        assert!(open.additional_parameters_declaration().unwrap().allows_unchecked());
        assert_eq!(open.to_value()[ADDITIONAL_PARAMETERS], json!(true));
    }

    #[test]
    fn test_explicit_nulls_round_trip() {
        let raw = json!({
            "summary": "x",
            "responseModel": null,
            "documentationUrl": null,
            "deprecated": null,
            "parameters": {}
        });
        let op = Operation::parse(&raw, None).unwrap();
        assert_eq!(op.response_model(), "");
        assert_eq!(op.documentation_url(), "");
        assert!(!op.is_deprecated());
        assert_eq!(op.to_value(), raw);
    }

    #[test]
    fn test_data_excludes_unrecognized_keys() {
        let op = Operation::parse(&json!({"data": {"a": 1}, "xmlRoot": "R"}), None).unwrap();
        assert_eq!(op.data().len(), 1);
        assert_eq!(op.extra().get("xmlRoot"), Some(&json!("R")));
        assert_eq!(op.get_data("xmlRoot"), Some(&json!("R")));
    }

    #[test]
    fn test_additional_parameters_parented_to_operation() {
        let op = Operation::parse(
            &json!({"additionalParameters": {"type": "string"}}),
            Some("Put"),
        )
        .unwrap();
        let additional = op.additional_parameters().unwrap();
        assert_eq!(additional.name(), None);
        assert_eq!(additional.parent(), &ParentRef::Operation("Put".to_string()));
    }

    #[test]
    fn test_data_must_be_a_mapping() {
        let err = Operation::parse(&json!({"data": 5}), None).unwrap_err();
        assert_eq!(err.key(), "data");
    }

    #[test]
    fn test_unknown_keys_round_trip_inline() {
        let raw = json!({"httpMethod": "GET", "cache": {"ttl": 60}});
        let op = Operation::parse(&raw, None).unwrap();
        assert_eq!(op.get_data("cache"), Some(&json!({"ttl": 60})));
        assert!(op.data().is_empty());
        assert_eq!(
            op.to_value(),
            json!({"httpMethod": "GET", "cache": {"ttl": 60}, "parameters": {}})
        );
    }

    #[test]
    fn test_error_response_lookup() {
        let op = Operation::parse(
            &json!({"errorResponses": [
                {"code": 404, "reason": "NoSuchKey", "class": "NotFound"},
                {"code": 503, "reason": "SlowDown", "class": "Throttled", "retryable": true}
            ]}),
            None,
        )
        .unwrap();
        let slow = op.error_response_for(503).unwrap();
        assert_eq!(slow.class.as_deref(), Some("Throttled"));
        assert_eq!(slow.extra.get("retryable"), Some(&json!(true)));
        assert!(op.error_response_for(500).is_none());
    }

    #[test]
    fn test_malformed_error_responses() {
        let err = Operation::parse(&json!({"errorResponses": {"code": 1}}), None).unwrap_err();
        assert_eq!(err.key(), "errorResponses");
    }
}
