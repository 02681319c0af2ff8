// Decoding of every supported type, nested paths, arrays and mixed-case fields
use std::sync::Arc;

use chrono::NaiveDate;
use doctable::{DecodedValue, InMemorySource, Literal, Predicate, RelationalType};
use serde_json::json;

use super::fixtures::{array_mapping, connector, flat_mapping, typed_document, TYPE_COLUMNS};

fn expected_typed_row() -> Vec<DecodedValue> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    vec![
        DecodedValue::Boolean(true),
        DecodedValue::Real(1.0),
        DecodedValue::Double(1.0),
        DecodedValue::Integer(1),
        DecodedValue::BigInt(1),
        DecodedValue::Varchar("cool".to_string()),
        DecodedValue::Varchar("some text".to_string()),
        DecodedValue::Varbinary(vec![0xCA, 0xFE]),
        DecodedValue::Timestamp(epoch),
    ]
}

#[tokio::test]
async fn test_data_types() -> anyhow::Result<()> {
    let source = Arc::new(InMemorySource::new());
    source.create_index("types", flat_mapping(&TYPE_COLUMNS));
    source.index_document("types", typed_document());
    let connector = connector(&source);

    let names: Vec<&str> = TYPE_COLUMNS.iter().map(|(name, _)| *name).collect();
    let rows = connector.scan("types", &names, &[]).await?;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values, expected_typed_row());
    Ok(())
}

#[tokio::test]
async fn test_data_types_nested() -> anyhow::Result<()> {
    let source = Arc::new(InMemorySource::new());
    let properties = flat_mapping(&TYPE_COLUMNS)["properties"].clone();
    source.create_index("types_nested", json!({"properties": {"field": {"properties": properties}}}));
    source.index_document("types_nested", json!({ "field": typed_document() }));
    let connector = connector(&source);

    let columns = connector.get_table_schema("types_nested").await?;
    assert!(columns.iter().all(|c| c.name.starts_with("field.")));
    assert_eq!(columns.len(), TYPE_COLUMNS.len());

    let names: Vec<String> = TYPE_COLUMNS
        .iter()
        .map(|(name, _)| format!("field.{}", name))
        .collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let rows = connector.scan("types_nested", &names, &[]).await?;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values, expected_typed_row());
    Ok(())
}

#[tokio::test]
async fn test_nested_fields_from_dotted_keys() -> anyhow::Result<()> {
    let source = Arc::new(InMemorySource::new());
    source.index_document(
        "data",
        json!({"name": "nestfield", "fields.fielda": 32, "fields.fieldb": "valueb"}),
    );
    let connector = connector(&source);

    let rows = connector
        .scan("data", &["name", "fields.fielda", "fields.fieldb"], &[])
        .await?;
    assert_eq!(
        rows[0].values,
        vec![
            DecodedValue::Varchar("nestfield".to_string()),
            DecodedValue::BigInt(32),
            DecodedValue::Varchar("valueb".to_string()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_nested_variants() -> anyhow::Result<()> {
    let source = Arc::new(InMemorySource::new());
    source.index_document("nested_variants", json!({"a": {"b": {"c": "value1"}}}));
    source.index_document("nested_variants", json!({"a.b": {"c": "value2"}}));
    source.index_document("nested_variants", json!({"a": {"b.c": "value3"}}));
    source.index_document("nested_variants", json!({"a.b.c": "value4"}));
    let connector = connector(&source);

    let columns = connector.get_table_schema("nested_variants").await?;
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].name, "a.b.c");

    let mut values: Vec<DecodedValue> = connector
        .scan("nested_variants", &["a.b.c"], &[])
        .await?
        .into_iter()
        .map(|row| row.get(0).clone())
        .collect();
    values.sort_by_key(|v| format!("{:?}", v));
    assert_eq!(
        values,
        (1..=4)
            .map(|i| DecodedValue::Varchar(format!("value{}", i)))
            .collect::<Vec<_>>()
    );
    Ok(())
}

#[tokio::test]
async fn test_array_fields() -> anyhow::Result<()> {
    let source = Arc::new(InMemorySource::new());
    source.create_index("test_arrays", array_mapping());
    source.index_document(
        "test_arrays",
        json!({
            "a": {"b": {"x": 1, "y": ["hello", "world"]}},
            "c": {"d": "foo", "e": "bar", "f": [{"g": [10, 20], "h": 100}, {"g": [30, 40], "h": 200}]},
            "j": [50, 60]
        }),
    );
    let connector = connector(&source);

    let f = connector.column("test_arrays", "c.f").await?;
    assert!(f.is_array);
    assert_eq!(f.relational_type().to_string(), "array(row(g array(integer), h integer))");

    let rows = connector
        .scan("test_arrays", &["a.b.y", "c.f", "j", "k"], &[])
        .await?;
    let row = &rows[0];
    assert_eq!(row.get(0).element(1), &DecodedValue::Varchar("hello".to_string()));
    assert_eq!(row.get(1).element(1).field("g").element(2), &DecodedValue::Integer(20));
    assert_eq!(row.get(1).element(2).field("g").element(1), &DecodedValue::Integer(30));
    assert_eq!(row.get(2).element(2), &DecodedValue::BigInt(60));
    assert!(row.get(3).element(1).is_null());
    Ok(())
}

#[tokio::test]
async fn test_empty_object_fields() -> anyhow::Result<()> {
    let source = Arc::new(InMemorySource::new());
    source.index_document(
        "emptyobject",
        json!({"name": "stringfield", "emptyobject": {}, "fields.fielda": 32, "fields.fieldb": {}}),
    );
    let connector = connector(&source);

    let emptyobject = connector.column("emptyobject", "emptyobject").await?;
    assert_eq!(emptyobject.column_type, RelationalType::Row(vec![]));

    let rows = connector
        .scan("emptyobject", &["name", "fields.fielda", "emptyobject", "fields.fieldb"], &[])
        .await?;
    assert_eq!(
        rows[0].values,
        vec![
            DecodedValue::Varchar("stringfield".to_string()),
            DecodedValue::BigInt(32),
            DecodedValue::Null,
            DecodedValue::Null,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_mixed_case() -> anyhow::Result<()> {
    let source = Arc::new(InMemorySource::new());
    source.index_document("mixed_case", json!({"Name": "john", "AGE": 32}));
    let connector = connector(&source);

    let expected = vec![DecodedValue::Varchar("john".to_string()), DecodedValue::BigInt(32)];

    let rows = connector.scan("mixed_case", &["name", "age"], &[]).await?;
    assert_eq!(rows[0].values, expected);

    let filter = [Predicate::equal("name", Literal::Varchar("john".to_string()))];
    let rows = connector.scan("mixed_case", &["name", "age"], &filter).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values, expected);
    Ok(())
}

#[tokio::test]
async fn test_hidden_columns() -> anyhow::Result<()> {
    let source = Arc::new(InMemorySource::new());
    let id = source.index_document("t", json!({"a": 1}));
    let connector = connector(&source);

    let rows = connector.scan("t", &["_id", "_score", "a"], &[]).await?;
    assert_eq!(
        rows[0].values,
        vec![
            DecodedValue::Varchar(id),
            DecodedValue::Real(1.0),
            DecodedValue::BigInt(1),
        ]
    );
    Ok(())
}
