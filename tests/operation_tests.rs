//! Tests for operation, parameter and description construction

use serde_json::json;
use service_description::models::{Description, Operation, ParameterType, ParentRef};

#[test]
fn test_has_data_object() {
    let description = Description::empty();
    let op = Operation::new(
        &json!({"data": {"foo": "baz", "bar": 123}}),
        &description,
    )
    .unwrap();

    assert_eq!(op.get_data("foo"), Some(&json!("baz")));
    assert_eq!(op.get_data("bar"), Some(&json!(123)));
    assert_eq!(op.get_data("nope"), None);
    assert_eq!(
        serde_json::Value::Object(op.data().clone()),
        json!({"foo": "baz", "bar": 123})
    );
    assert_eq!(
        op.to_value(),
        json!({"parameters": {}, "data": {"foo": "baz", "bar": 123}})
    );
}

#[test]
fn test_converts_to_array() {
    let raw = json!({
        "httpMethod": "PUT",
        "uri": "/buckets/{Bucket}",
        "summary": "Create a bucket",
        "notes": "Bucket names are global",
        "documentationUrl": "http://docs.example.com/put-bucket",
        "responseModel": "CreateBucketOutput",
        "deprecated": true,
        "class": "CreateBucketCommand",
        "parameters": {
            "Bucket": {"type": "string", "required": true, "location": "uri"},
            "Acl": {"type": "string", "sentAs": "x-amz-acl", "location": "header"}
        },
        "errorResponses": [{"code": 409, "reason": "BucketAlreadyExists"}]
    });
    let description = Description::empty();
    let op = Operation::new(&raw, &description).unwrap();

    assert_eq!(op.http_method(), "PUT");
    assert_eq!(op.uri(), "/buckets/{Bucket}");
    assert_eq!(op.summary(), "Create a bucket");
    assert_eq!(op.documentation_url(), "http://docs.example.com/put-bucket");
    assert_eq!(op.response_model(), "CreateBucketOutput");
    assert!(op.is_deprecated());
    assert_eq!(op.class(), "CreateBucketCommand");
    assert_eq!(op.to_value(), raw);
}

#[test]
fn test_absent_attributes_are_empty_and_not_emitted() {
    let description = Description::empty();
    let op = Operation::new(&json!({}), &description).unwrap();

    assert_eq!(op.http_method(), "");
    assert_eq!(op.notes(), "");
    assert!(!op.is_deprecated());
    assert!(op.error_responses().is_empty());
    assert_eq!(op.to_value(), json!({"parameters": {}}));
}

#[test]
fn test_has_notes() {
    let description = Description::empty();
    let op = Operation::new(&json!({"notes": "foo"}), &description).unwrap();
    assert_eq!(op.notes(), "foo");
}

#[test]
fn test_determines_if_has_param() {
    let description = Description::empty();
    let op = Operation::new(&json!({"parameters": {"foo": {}}}), &description).unwrap();
    assert!(op.has_param("foo"));
    assert!(!op.has_param("bar"));
}

#[test]
fn test_parameter_name_back_filled_from_key() {
    let description = Description::empty();
    let op = Operation::new(&json!({"parameters": {"foo": {}}}), &description).unwrap();
    let param = op.get_param("foo").unwrap();
    assert_eq!(param.name(), Some("foo"));
}

#[test]
fn test_parameters_are_parented_to_their_operation() {
    let description = Description::new(&json!({"PutUser": {"parameters": {"id": {}}}})).unwrap();
    let param = description.operation("PutUser").unwrap().get_param("id").unwrap();
    assert_eq!(param.parent(), &ParentRef::Operation("PutUser".to_string()));
}

#[test]
fn test_returns_none_for_missing_param() {
    let description = Description::empty();
    let op = Operation::new(&json!({"parameters": {"foo": {}}}), &description).unwrap();
    assert!(op.get_param("missing").is_none());
    assert!(op.additional_parameters().is_none());
}

#[test]
fn test_parameters_must_be_mappings() {
    let description = Description::empty();
    let err = Operation::new(&json!({"parameters": {"foo": true}}), &description).unwrap_err();
    assert_eq!(err.key(), "foo");
    assert!(err.to_string().contains("parameters must be mappings"));
}

#[test]
fn test_invalid_nested_parameter_fails_whole_operation() {
    let description = Description::empty();
    let err = Operation::new(
        &json!({"parameters": {
            "ok": {"type": "string"},
            "address": {"type": "object", "properties": {"zip": 12345}}
        }}),
        &description,
    )
    .unwrap_err();
    assert_eq!(err.key(), "address.zip");
}

#[test]
fn test_has_description() {
    let description = Description::new(&json!({"Ping": {}})).unwrap();
    let op = Operation::new(&json!({}), &description).unwrap();
    assert!(op.description().unwrap().ptr_eq(&description));
}

#[test]
fn test_description_link_does_not_keep_it_alive() {
    let description = Description::new(&json!({"Ping": {}})).unwrap();
    let op = Operation::new(&json!({}), &description).unwrap();
    drop(description);
    assert!(op.description().is_none());
}

#[test]
fn test_has_additional_parameters() {
    let description = Description::empty();
    let op = Operation::new(
        &json!({
            "additionalParameters": {"type": "string", "name": "binks"},
            "parameters": {"foo": {"type": "integer"}}
        }),
        &description,
    )
    .unwrap();

    let additional = op.additional_parameters().unwrap();
    assert_eq!(additional.param_type(), Some(ParameterType::String));
    assert_eq!(additional.name(), Some("binks"));

    let serialized = op.to_value();
    assert_eq!(serialized["additionalParameters"], json!({"type": "string"}));
    assert_eq!(serialized["parameters"], json!({"foo": {"type": "integer"}}));
}

#[test]
fn test_serialized_parameters_have_no_name_or_parent() {
    let description = Description::empty();
    let op = Operation::new(
        &json!({"parameters": {"foo": {"name": "foo", "type": "string"}}}),
        &description,
    )
    .unwrap();
    assert_eq!(op.to_value()["parameters"]["foo"], json!({"type": "string"}));
}

#[test]
fn test_has_error_responses() {
    let description = Description::empty();
    let op = Operation::new(
        &json!({"errorResponses": [
            {"code": 404, "reason": "Not found", "class": "NotFoundError"},
            {"code": 500, "reason": "Server error"}
        ]}),
        &description,
    )
    .unwrap();

    assert_eq!(op.error_responses().len(), 2);
    let not_found = op.error_response_for(404).unwrap();
    assert_eq!(not_found.reason.as_deref(), Some("Not found"));
    assert_eq!(not_found.class.as_deref(), Some("NotFoundError"));
    assert!(op.error_response_for(500).unwrap().class.is_none());
}

#[test]
fn test_unknown_top_level_keys_survive_round_trip() {
    let description = Description::empty();
    let raw = json!({"uri": "/", "xmlRoot": {"name": "Request"}, "parameters": {}});
    let op = Operation::new(&raw, &description).unwrap();
    assert_eq!(op.get_data("xmlRoot"), Some(&json!({"name": "Request"})));
    assert_eq!(op.to_value(), raw);
}

#[test]
fn test_explicit_name_overrides_key() {
    let description = Description::new(&json!({"Ping": {"name": "PingV2"}})).unwrap();
    let op = description.operation("Ping").unwrap();
    assert_eq!(op.name(), "PingV2");
    assert_eq!(op.to_value(), json!({"parameters": {}}));
}

#[test]
fn test_invalid_operation_fails_whole_description() {
    let err = Description::new(&json!({
        "Good": {"parameters": {"a": {}}},
        "Bad": {"parameters": {"b": "nope"}}
    }))
    .unwrap_err();
    assert_eq!(err.key(), "b");
}

#[test]
fn test_description_round_trip_document() {
    let document = json!({
        "name": "Storage",
        "apiVersion": "2006-03-01",
        "baseUrl": "https://storage.example.com",
        "operations": {
            "GetObject": {
                "httpMethod": "GET",
                "uri": "/{Bucket}/{Key}",
                "parameters": {
                    "Bucket": {"type": "string", "required": true},
                    "Key": {"type": "string", "required": true, "minLength": 1}
                }
            },
            "ListBuckets": {"httpMethod": "GET", "uri": "/", "parameters": {}}
        }
    });
    let description = Description::from_document(&document).unwrap();
    assert_eq!(description.len(), 2);
    assert_eq!(
        description
            .operation("GetObject")
            .and_then(|op| op.get_param("Key"))
            .and_then(|param| param.min_length()),
        Some(1)
    );
    assert_eq!(description.to_value(), document);
}

#[test]
fn test_operation_documents_round_trip() {
    let cases = [
        ("explicit null scalars", json!({
            "summary": "Get a thing",
            "responseModel": null,
            "documentationUrl": null,
            "parameters": {}
        })),
        ("unchecked additional parameters", json!({
            "additionalParameters": true,
            "parameters": {}
        })),
        ("closed additional parameters", json!({
            "additionalParameters": false,
            "parameters": {}
        })),
        ("falsy defaults", json!({
            "parameters": {
                "verbose": {"type": "boolean", "default": false},
                "offset": {"type": "integer", "default": 0},
                "cursor": {"type": "string", "default": ""}
            }
        })),
        ("null default", json!({
            "parameters": {"marker": {"type": "string", "default": null, "required": false}}
        })),
        ("unknown keys", json!({
            "httpMethod": "GET",
            "xmlRoot": {"name": "Request"},
            "parameters": {"q": {"type": "string", "sentAs": "query", "x-internal": true}}
        })),
        ("nested schemas", json!({
            "parameters": {
                "tags": {"type": "array", "items": {"type": "string", "pattern": null}},
                "owner": {"type": "object", "properties": {"id": {"type": "integer", "minimum": 1}}}
            }
        })),
    ];

    let description = Description::empty();
    for (label, raw) in cases {
        let op = Operation::new(&raw, &description)
            .unwrap_or_else(|e| panic!("{}: failed to build: {}", label, e));
        assert_eq!(op.to_value(), raw, "{}", label);
    }
}
