//! Unit tests for decoding documents against resolved columns
//!
//! Lenient coercion, hit metadata and single-vs-multi valued fields.

#[cfg(test)]
mod decoding_tests {
    use doctable::decoder::{decode, decode_batch, DecodedValue};
    use doctable::doc_catalog::{ColumnDescriptor, HiddenColumn, RelationalType, SchemaResolver};
    use doctable::SearchHit;
    use serde_json::json;

    fn column(path: &str, column_type: RelationalType) -> ColumnDescriptor {
        ColumnDescriptor::new(path, column_type, false)
    }

    #[test]
    fn test_lenient_scalar_coercion() {
        let columns = vec![
            column("n", RelationalType::BigInt),
            column("b", RelationalType::Boolean),
            column("d", RelationalType::Double),
            column("s", RelationalType::Varchar),
            column("small", RelationalType::TinyInt),
        ];
        let row = decode(
            &json!({"n": "42", "b": "false", "d": 3, "s": 7, "small": 300}),
            &columns,
        );
        assert_eq!(
            row.values,
            vec![
                DecodedValue::BigInt(42),
                DecodedValue::Boolean(false),
                DecodedValue::Double(3.0),
                DecodedValue::Varchar("7".to_string()),
                // Out of range for the column type
                DecodedValue::Null,
            ]
        );
    }

    #[test]
    fn test_timestamp_text_formats() {
        let columns = vec![column("ts", RelationalType::Timestamp)];
        let decoded: Vec<String> = [
            json!({"ts": "2019-10-01T00:00:00Z"}),
            json!({"ts": "2019-10-01 00:00:00"}),
            json!({"ts": "2019-10-01"}),
            json!({"ts": 1569888000000i64}),
        ]
        .iter()
        .map(|doc| format!("{:?}", decode(doc, &columns).get(0)))
        .collect();
        assert!(decoded.windows(2).all(|pair| pair[0] == pair[1]));
        assert!(decoded[0].starts_with("Timestamp(2019-10-01"));
    }

    #[test]
    fn test_multi_valued_field_without_hint_is_null() {
        let columns = vec![
            column("tags", RelationalType::Varchar),
            ColumnDescriptor::new("scores", RelationalType::Integer, true),
        ];
        let row = decode(&json!({"tags": ["a", "b"], "scores": 5}), &columns);
        assert!(row.get(0).is_null());
        assert_eq!(row.get(1), &DecodedValue::Array(vec![DecodedValue::Integer(5)]));
    }

    #[test]
    fn test_nested_array_rows_from_resolved_schema() {
        let mapping = doctable::source::IndexMapping::from_mapping_json(
            "orders",
            &json!({
                "_meta": {"doctable": {"lines": {"isArray": true}}},
                "properties": {"lines": {"properties": {
                    "sku": {"type": "keyword"},
                    "qty": {"type": "short"}
                }}}
            }),
            1,
        );
        let columns = SchemaResolver::new(Default::default(), "doctable")
            .resolve_schema(&[mapping])
            .unwrap();

        let row = decode(
            &json!({"lines": [{"sku": "A-1", "qty": 2}, {"sku": "B-7"}]}),
            &columns,
        );
        let lines = row.get(0);
        assert_eq!(lines.element(1).field("qty"), &DecodedValue::SmallInt(2));
        assert_eq!(lines.element(2).field("sku"), &DecodedValue::Varchar("B-7".to_string()));
        assert!(lines.element(2).field("qty").is_null());
        assert!(lines.element(3).is_null());
        assert!(lines.element(0).is_null());
    }

    #[test]
    fn test_batch_fills_hit_metadata() {
        let columns = vec![
            HiddenColumn::Id.descriptor(),
            HiddenColumn::Score.descriptor(),
            HiddenColumn::Source.descriptor(),
            column("a", RelationalType::Integer),
        ];
        let hits = vec![
            SearchHit {
                index: "t".to_string(),
                id: "doc-1".to_string(),
                score: Some(0.5),
                source: json!({"a": 1}),
            },
            SearchHit {
                index: "t".to_string(),
                id: "doc-2".to_string(),
                score: None,
                source: json!({}),
            },
        ];

        let rows = decode_batch(&hits, &columns);
        assert_eq!(
            rows[0].values,
            vec![
                DecodedValue::Varchar("doc-1".to_string()),
                DecodedValue::Real(0.5),
                DecodedValue::Varchar(r#"{"a":1}"#.to_string()),
                DecodedValue::Integer(1),
            ]
        );
        assert!(rows[1].get(1).is_null());
        assert!(rows[1].get(3).is_null());

        // Plain documents carry no hit metadata
        assert!(decode(&json!({"a": 1}), &columns).get(0).is_null());
    }
}
