//! Models module for the service description
//!
//! Defines the schema objects built from raw declarative definitions:
//! [`Description`] owns [`Operation`]s, which own their [`Parameter`]s.
//! All of them are immutable once built.

pub mod description;
pub mod enums;
pub mod operation;
pub mod parameter;

pub use description::{Description, DescriptionMetadata};
pub use enums::ParameterType;
pub use operation::{AdditionalParameters, ErrorResponse, Operation};
pub use parameter::{Parameter, ParentRef};

use serde_json::{Map, Value};

/// Error raised while normalizing a raw definition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptionError {
    /// A raw value does not have the shape the schema requires
    #[error("Invalid input for '{key}': {reason}")]
    InvalidInput { key: String, reason: String },
}

impl DescriptionError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        DescriptionError::InvalidInput {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Key of the offending entry
    pub fn key(&self) -> &str {
        match self {
            DescriptionError::InvalidInput { key, .. } => key,
        }
    }
}

/// Remove keys that are explicitly `null`, returning their names.
///
/// A `null` attribute reads as absent but is written back as `null`.
pub(crate) fn take_nulls(map: &mut Map<String, Value>) -> Vec<String> {
    let nulls: Vec<String> = map
        .iter()
        .filter(|(key, value)| value.is_null() && key.as_str() != "name")
        .map(|(key, _)| key.clone())
        .collect();
    map.retain(|_, value| !value.is_null());
    nulls
}

/// Re-insert explicit `null`s for keys the serialized form does not already carry
pub(crate) fn restore_nulls(out: &mut Map<String, Value>, nulls: &[String]) {
    for key in nulls {
        if !out.contains_key(key) {
            out.insert(key.clone(), Value::Null);
        }
    }
}
