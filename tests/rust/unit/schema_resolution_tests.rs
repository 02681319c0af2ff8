//! Unit tests for schema resolution over hand-built index mappings
//!
//! Covers flattening, array hints, case collisions and multi-index merging.

#[cfg(test)]
mod schema_resolution_tests {
    use doctable::doc_catalog::{
        ConnectorError, RelationalType, RowField, SchemaResolver, UnsupportedTypePolicy,
    };
    use doctable::source::IndexMapping;
    use serde_json::json;

    fn resolver() -> SchemaResolver {
        SchemaResolver::new(UnsupportedTypePolicy::Omit, "doctable")
    }

    fn mapping(index: &str, document: serde_json::Value) -> IndexMapping {
        IndexMapping::from_mapping_json(index, &document, 1)
    }

    #[test]
    fn test_flatten_nested_objects_to_dotted_columns() {
        let columns = resolver()
            .resolve_schema(&[mapping(
                "people",
                json!({"properties": {
                    "Address": {"properties": {
                        "City": {"type": "keyword"},
                        "geo": {"properties": {"lat": {"type": "double"}}}
                    }},
                    "age": {"type": "integer"}
                }}),
            )])
            .unwrap();

        let summary: Vec<(&str, &str, String)> = columns
            .iter()
            .map(|c| (c.name.as_str(), c.dotted_path.as_str(), c.relational_type().to_string()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("address.city", "Address.City", "varchar".to_string()),
                ("address.geo.lat", "Address.geo.lat", "double".to_string()),
                ("age", "age", "integer".to_string()),
            ]
        );
    }

    #[test]
    fn test_array_hint_turns_object_into_row_column() {
        let columns = resolver()
            .resolve_schema(&[mapping(
                "orders",
                json!({
                    "_meta": {"doctable": {"lines": {"isArray": true}}},
                    "properties": {
                        "lines": {"properties": {
                            "sku": {"type": "keyword"},
                            "qty": {"type": "short"}
                        }}
                    }
                }),
            )])
            .unwrap();

        assert_eq!(columns.len(), 1);
        assert!(columns[0].is_array);
        assert_eq!(
            columns[0].column_type,
            RelationalType::Row(vec![
                RowField::new("sku", RelationalType::Varchar),
                RowField::new("qty", RelationalType::SmallInt),
            ])
        );
    }

    #[test]
    fn test_hints_under_other_namespace_are_ignored() {
        let columns = SchemaResolver::new(UnsupportedTypePolicy::Omit, "custom")
            .resolve_schema(&[mapping(
                "t",
                json!({
                    "_meta": {"doctable": {"tags": {"isArray": true}}},
                    "properties": {"tags": {"type": "keyword"}}
                }),
            )])
            .unwrap();
        assert!(!columns[0].is_array);
    }

    #[test]
    fn test_case_collision_keeps_first_field() {
        let columns = resolver()
            .resolve_schema(&[mapping(
                "t",
                json!({"properties": {
                    "Name": {"type": "keyword"},
                    "name": {"type": "long"}
                }}),
            )])
            .unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].dotted_path, "Name");
        assert_eq!(columns[0].column_type, RelationalType::Varchar);
    }

    #[test]
    fn test_merge_indices_unions_columns() {
        let columns = resolver()
            .resolve_schema(&[
                mapping("a", json!({"properties": {"x": {"type": "long"}, "y": {"type": "keyword"}}})),
                mapping(
                    "b",
                    json!({
                        "_meta": {"doctable": {"x": {"isArray": true}}},
                        "properties": {"x": {"type": "long"}, "z": {"type": "text"}}
                    }),
                ),
            ])
            .unwrap();

        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
        // One index hints an array: the merged column is an array
        assert!(columns[0].is_array);
        assert!(columns[2].is_analyzed());
    }

    #[test]
    fn test_merge_prefers_analyzed_text() {
        let columns = resolver()
            .resolve_schema(&[
                mapping("a", json!({"properties": {"title": {"type": "keyword"}}})),
                mapping("b", json!({"properties": {"title": {"type": "text"}}})),
            ])
            .unwrap();
        assert_eq!(columns[0].native_type.as_deref(), Some("text"));
    }

    #[test]
    fn test_merge_conflicting_types() {
        let err = resolver()
            .resolve_schema(&[
                mapping("a", json!({"properties": {"v": {"type": "long"}}})),
                mapping("b", json!({"properties": {"v": {"type": "boolean"}}})),
            ])
            .unwrap_err();
        assert_eq!(
            err,
            ConnectorError::SchemaConflict {
                path: "v".to_string(),
                left: "bigint".to_string(),
                right: "boolean".to_string(),
            }
        );
    }

    #[test]
    fn test_unsupported_types_inside_rows() {
        let document = json!({
            "_meta": {"doctable": {"points": {"isArray": true}}},
            "properties": {"points": {"properties": {
                "label": {"type": "keyword"},
                "location": {"type": "geo_point"}
            }}}
        });

        let columns = resolver().resolve_schema(&[mapping("t", document.clone())]).unwrap();
        assert_eq!(
            columns[0].column_type,
            RelationalType::Row(vec![RowField::new("label", RelationalType::Varchar)])
        );

        let err = SchemaResolver::new(UnsupportedTypePolicy::Reject, "doctable")
            .resolve_schema(&[mapping("t", document)])
            .unwrap_err();
        assert!(matches!(err, ConnectorError::UnsupportedType { ref path, .. } if path == "points.location"));
    }
}
