// src/firestore_tests.rs

#[cfg(test)]
mod tests {
    use crate::firestore::*;
    use serde_json::json;

    #[test]
    fn test_value_deserializes_wire_shapes() {
        let value: FirestoreValue = serde_json::from_value(json!({ "stringValue": "hi" })).unwrap();
        assert_eq!(value, FirestoreValue::String("hi".to_string()));

        let value: FirestoreValue =
            serde_json::from_value(json!({ "booleanValue": true })).unwrap();
        assert_eq!(value, FirestoreValue::Boolean(true));

        // int64 travels as a decimal string
        let value: FirestoreValue =
            serde_json::from_value(json!({ "integerValue": "42" })).unwrap();
        assert_eq!(value, FirestoreValue::Integer("42".to_string()));

        let value: FirestoreValue =
            serde_json::from_value(json!({ "doubleValue": 1.5 })).unwrap();
        assert_eq!(value, FirestoreValue::Double(1.5));
    }

    #[test]
    fn test_value_round_trips_nested_maps() {
        let wire = json!({
            "mapValue": {
                "fields": {
                    "text": { "stringValue": " 3 " }
                }
            }
        });

        let value: FirestoreValue = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(serde_json::to_value(&value).unwrap(), wire);
    }

    #[test]
    fn test_document_without_fields_defaults_empty() {
        let document: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/Users/u1"
        }))
        .unwrap();

        assert!(document.fields.is_empty());
        assert_eq!(document.id(), "u1");
    }

    #[test]
    fn test_document_field_accessors_are_type_checked() {
        let document: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/Users/u1",
            "fields": {
                "email": { "stringValue": "a@b.c" },
                "responded": { "booleanValue": true },
                "responses": { "mapValue": { "fields": {} } }
            }
        }))
        .unwrap();

        assert_eq!(document.string_field("email"), Some("a@b.c"));
        assert_eq!(document.bool_field("responded"), Some(true));
        assert!(document.map_field("responses").is_some());

        // Wrong type or missing key reads as absent, never coerced
        assert_eq!(document.string_field("responded"), None);
        assert_eq!(document.bool_field("email"), None);
        assert_eq!(document.string_field("nope"), None);
    }

    #[test]
    fn test_list_response_defaults_to_empty_page() {
        let response: ListDocumentsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.documents.is_empty());
        assert!(response.next_page_token.is_none());
    }

    #[test]
    fn test_run_query_request_serializes_where_clause() {
        let request = RunQueryRequest {
            structured_query: StructuredQuery {
                from: vec![CollectionSelector {
                    collection_id: "DailyStatus".to_string(),
                }],
                where_clause: Some(QueryFilter {
                    field_filter: FieldFilter {
                        field: FieldReference {
                            field_path: "userID".to_string(),
                        },
                        op: "EQUAL".to_string(),
                        value: FirestoreValue::String("uid-1".to_string()),
                    },
                }),
            },
        };

        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(
            wire,
            json!({
                "structuredQuery": {
                    "from": [ { "collectionId": "DailyStatus" } ],
                    "where": {
                        "fieldFilter": {
                            "field": { "fieldPath": "userID" },
                            "op": "EQUAL",
                            "value": { "stringValue": "uid-1" }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_run_query_elements_without_documents_deserialize() {
        let elements: Vec<RunQueryElement> = serde_json::from_value(json!([
            { "readTime": "2024-01-15T10:00:00Z" },
            {
                "document": {
                    "name": "projects/p/databases/(default)/documents/DailyStatus/d1",
                    "fields": {}
                },
                "readTime": "2024-01-15T10:00:00Z"
            }
        ]))
        .unwrap();

        assert_eq!(elements.len(), 2);
        assert!(elements[0].document.is_none());
        assert!(elements[1].document.is_some());
    }

    #[test]
    fn test_missing_token_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_token.json");
        let loaded = FirestoreClient::load_token_data(&path).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_token_file_loads_access_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firestore_token.json");
        std::fs::write(&path, r#"{ "access_token": "secret" }"#).unwrap();

        let loaded = FirestoreClient::load_token_data(&path).unwrap();
        assert_eq!(loaded.unwrap().access_token, "secret");
    }

    #[test]
    fn test_client_requires_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = FirestoreConfig {
            project_id: "demo-project".to_string(),
            token_file_path: dir.path().join("absent.json"),
            ..FirestoreConfig::default()
        };

        let result = FirestoreClient::new(config);
        assert!(matches!(result, Err(FirestoreError::MissingToken)));
    }

    #[test]
    fn test_client_rejects_empty_project_id() {
        let result = FirestoreClient::new(FirestoreConfig::default());
        assert!(matches!(result, Err(FirestoreError::ConfigError(_))));
    }
}
