//! Service description
//!
//! A [`Description`] is the registry of [`Operation`]s for one remote
//! service. It is a cheap, clonable handle; operations keep a non-owning
//! link back to it, so dropping the last handle frees the whole registry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::info;

use super::operation::Operation;
use super::DescriptionError;

/// Document-level metadata of a description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug)]
pub(crate) struct DescriptionInner {
    metadata: DescriptionMetadata,
    operations: Vec<Operation>,
    index: HashMap<String, usize>,
}

/// Ordered, keyed collection of operations
#[derive(Debug, Clone)]
pub struct Description {
    inner: Arc<DescriptionInner>,
}

impl Description {
    /// Build a description from a raw mapping of operation name to definition.
    ///
    /// Each definition becomes an [`Operation`] whose `name` defaults to its
    /// key. If any definition is invalid the whole description fails.
    ///
    /// # Example
    ///
    /// ```rust
    /// use service_description::models::Description;
    /// use serde_json::json;
    ///
    /// let description = Description::new(&json!({
    ///     "GetUser": {"httpMethod": "GET", "uri": "/users/{id}"}
    /// }))
    /// .unwrap();
    /// assert_eq!(description.operation("GetUser").unwrap().http_method(), "GET");
    /// ```
    pub fn new(operations: &Value) -> Result<Self, DescriptionError> {
        Self::build(DescriptionMetadata::default(), operations)
    }

    /// A description with no operations
    pub fn empty() -> Self {
        Self::from_parts(DescriptionMetadata::default(), Vec::new())
    }

    /// Build a description from a full document:
    /// `{name, apiVersion, baseUrl, description, operations}`.
    pub fn from_document(document: &Value) -> Result<Self, DescriptionError> {
        let mut map = document.as_object().cloned().ok_or_else(|| {
            DescriptionError::invalid("description", "description documents must be mappings")
        })?;
        let operations = map.remove("operations").unwrap_or(Value::Null);
        let metadata: DescriptionMetadata = serde_json::from_value(Value::Object(map))
            .map_err(|e| DescriptionError::invalid("description", e.to_string()))?;
        Self::build(metadata, &operations)
    }

    fn build(metadata: DescriptionMetadata, operations: &Value) -> Result<Self, DescriptionError> {
        let raw = match operations {
            Value::Null => return Ok(Self::from_parts(metadata, Vec::new())),
            Value::Object(raw) => raw,
            _ => {
                return Err(DescriptionError::invalid(
                    "operations",
                    "operations must be a mapping of name to definition",
                ));
            }
        };

        // Everything is validated before the registry exists, so a failing
        // definition never leaves a partial description behind.
        let parsed = raw
            .iter()
            .map(|(name, def)| Operation::parse(def, Some(name)).map(|op| (name.clone(), op)))
            .collect::<Result<Vec<_>, _>>()?;

        let description = Self::from_parts(metadata, parsed);
        info!(
            "Loaded description {} with {} operations",
            description.name().unwrap_or("<unnamed>"),
            description.len()
        );
        Ok(description)
    }

    fn from_parts(metadata: DescriptionMetadata, parsed: Vec<(String, Operation)>) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<DescriptionInner>| {
            let mut operations = Vec::with_capacity(parsed.len());
            let mut index = HashMap::with_capacity(parsed.len());
            for (key, operation) in parsed {
                index.insert(key, operations.len());
                operations.push(operation.attach(weak.clone()));
            }
            DescriptionInner {
                metadata,
                operations,
                index,
            }
        });
        Self { inner }
    }

    pub(crate) fn from_inner(inner: Arc<DescriptionInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<DescriptionInner> {
        Arc::downgrade(&self.inner)
    }

    /// Whether two handles refer to the same description
    pub fn ptr_eq(&self, other: &Description) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn metadata(&self) -> &DescriptionMetadata {
        &self.inner.metadata
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.metadata.name.as_deref()
    }

    pub fn api_version(&self) -> Option<&str> {
        self.inner.metadata.api_version.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.inner.metadata.base_url.as_deref()
    }

    /// Look up an operation by the key it was declared under
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.inner
            .index
            .get(name)
            .map(|&idx| &self.inner.operations[idx])
    }

    pub fn has_operation(&self, name: &str) -> bool {
        self.inner.index.contains_key(name)
    }

    /// Operations in declaration order
    pub fn operations(&self) -> &[Operation] {
        &self.inner.operations
    }

    pub fn len(&self) -> usize {
        self.inner.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.operations.is_empty()
    }

    /// Serialized document: metadata plus `operations`
    pub fn to_value(&self) -> Value {
        let mut out = match serde_json::to_value(&self.inner.metadata) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let mut keys: Vec<(&String, &usize)> = self.inner.index.iter().collect();
        keys.sort_by_key(|(_, idx)| **idx);
        let operations = keys
            .into_iter()
            .map(|(key, &idx)| (key.clone(), self.inner.operations[idx].to_value()))
            .collect();
        out.insert("operations".to_string(), Value::Object(operations));
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_description() {
        let description = Description::new(&json!({})).unwrap();
        assert!(description.is_empty());
        assert!(description.operation("anything").is_none());
    }

    #[test]
    fn test_operations_keep_declaration_order() {
        let description = Description::new(&json!({
            "Zeta": {},
            "Alpha": {},
            "Mid": {}
        }))
        .unwrap();
        let names: Vec<&str> = description.operations().iter().map(Operation::name).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_operations_link_back() {
        let description = Description::new(&json!({"Ping": {"uri": "/ping"}})).unwrap();
        let owner = description.operation("Ping").unwrap().description().unwrap();
        assert!(owner.ptr_eq(&description));
    }

    #[test]
    fn test_operations_must_be_mapping() {
        let err = Description::new(&json!(["Ping"])).unwrap_err();
        assert_eq!(err.key(), "operations");
    }

    #[test]
    fn test_document_metadata() {
        let description = Description::from_document(&json!({
            "name": "Users",
            "apiVersion": "2024-01-01",
            "baseUrl": "https://api.example.com",
            "operations": {"ListUsers": {"httpMethod": "GET", "uri": "/users"}}
        }))
        .unwrap();
        assert_eq!(description.name(), Some("Users"));
        assert_eq!(description.api_version(), Some("2024-01-01"));
        assert_eq!(description.base_url(), Some("https://api.example.com"));
        assert!(description.has_operation("ListUsers"));
        assert_eq!(
            description.to_value(),
            json!({
                "name": "Users",
                "apiVersion": "2024-01-01",
                "baseUrl": "https://api.example.com",
                "operations": {"ListUsers": {"httpMethod": "GET", "uri": "/users", "parameters": {}}}
            })
        );
    }
}
