// Row counts for pushed-down and residual filters on every column type
use std::sync::Arc;

use doctable::{ComparisonOp, Connector, DecodedValue, InMemorySource, Literal, Predicate};
use serde_json::json;
use test_case::test_case;

use super::fixtures::{connector, flat_mapping};
use ComparisonOp::{Equal, Greater, Less};
use Literal::{Boolean, Double, Integer};

const FILTER_COLUMNS: [(&str, &str); 11] = [
    ("boolean_column", "boolean"),
    ("byte_column", "byte"),
    ("short_column", "short"),
    ("integer_column", "integer"),
    ("long_column", "long"),
    ("float_column", "float"),
    ("double_column", "double"),
    ("keyword_column", "keyword"),
    ("text_column", "text"),
    ("binary_column", "binary"),
    ("timestamp_column", "date"),
];

fn filter_pushdown() -> Connector {
    let source = Arc::new(InMemorySource::new());
    source.create_index("filter_pushdown", flat_mapping(&FILTER_COLUMNS));
    source.index_document(
        "filter_pushdown",
        json!({
            "boolean_column": true,
            "byte_column": 1,
            "short_column": 2,
            "integer_column": 3,
            "long_column": 4,
            "float_column": 1.0,
            "double_column": 1.0,
            "keyword_column": "cool",
            "text_column": "some text",
            "binary_column": "yv4=",
            "timestamp_column": 1569888000000i64
        }),
    );
    connector(&source)
}

fn ts(text: &str) -> Literal {
    Literal::timestamp(text).unwrap()
}

fn hex(text: &str) -> Literal {
    Literal::varbinary_from_hex(text).unwrap()
}

fn text(value: &str) -> Literal {
    Literal::Varchar(value.to_string())
}

#[test_case("_score", Equal, Double(1.0), 1; "score")]
#[test_case("boolean_column", Equal, Boolean(true), 1; "boolean true")]
#[test_case("boolean_column", Equal, Boolean(false), 0; "boolean false")]
#[test_case("byte_column", Equal, Integer(1), 1; "tinyint eq")]
#[test_case("byte_column", Equal, Integer(0), 0; "tinyint eq miss")]
#[test_case("byte_column", Greater, Integer(1), 0; "tinyint gt")]
#[test_case("byte_column", Less, Integer(1), 0; "tinyint lt")]
#[test_case("byte_column", Greater, Integer(0), 1; "tinyint gt hit")]
#[test_case("byte_column", Less, Integer(10), 1; "tinyint lt hit")]
#[test_case("short_column", Equal, Integer(2), 1; "smallint eq")]
#[test_case("short_column", Greater, Integer(2), 0; "smallint gt")]
#[test_case("short_column", Less, Integer(2), 0; "smallint lt")]
#[test_case("short_column", Equal, Integer(0), 0; "smallint eq miss")]
#[test_case("short_column", Greater, Integer(0), 1; "smallint gt hit")]
#[test_case("short_column", Less, Integer(10), 1; "smallint lt hit")]
#[test_case("integer_column", Equal, Integer(3), 1; "integer eq")]
#[test_case("integer_column", Greater, Integer(3), 0; "integer gt")]
#[test_case("integer_column", Less, Integer(3), 0; "integer lt")]
#[test_case("integer_column", Equal, Integer(0), 0; "integer eq miss")]
#[test_case("integer_column", Greater, Integer(0), 1; "integer gt hit")]
#[test_case("integer_column", Less, Integer(10), 1; "integer lt hit")]
#[test_case("long_column", Equal, Integer(4), 1; "bigint eq")]
#[test_case("long_column", Greater, Integer(4), 0; "bigint gt")]
#[test_case("long_column", Less, Integer(4), 0; "bigint lt")]
#[test_case("long_column", Equal, Integer(0), 0; "bigint eq miss")]
#[test_case("long_column", Greater, Integer(0), 1; "bigint gt hit")]
#[test_case("long_column", Less, Integer(10), 1; "bigint lt hit")]
#[test_case("float_column", Equal, Double(1.0), 1; "real eq")]
#[test_case("float_column", Greater, Double(1.0), 0; "real gt")]
#[test_case("float_column", Less, Double(1.0), 0; "real lt")]
#[test_case("float_column", Equal, Double(0.0), 0; "real eq miss")]
#[test_case("float_column", Greater, Double(0.0), 1; "real gt hit")]
#[test_case("float_column", Less, Double(10.0), 1; "real lt hit")]
#[test_case("double_column", Equal, Double(1.0), 1; "double eq")]
#[test_case("double_column", Greater, Double(1.0), 0; "double gt")]
#[test_case("double_column", Less, Double(1.0), 0; "double lt")]
#[test_case("double_column", Equal, Double(0.0), 0; "double eq miss")]
#[test_case("double_column", Greater, Double(0.0), 1; "double gt hit")]
#[test_case("double_column", Less, Double(10.0), 1; "double lt hit")]
#[test_case("keyword_column", Equal, text("cool"), 1; "keyword eq")]
#[test_case("keyword_column", Equal, text("bar"), 0; "keyword eq miss")]
#[test_case("text_column", Equal, text("some text"), 1; "text eq")]
#[test_case("text_column", Equal, text("some"), 0; "text eq is exact")]
#[test_case("binary_column", Equal, hex("CAFE"), 1; "binary eq")]
#[test_case("binary_column", Equal, hex("ABCD"), 0; "binary eq miss")]
#[test_case("timestamp_column", Equal, ts("2019-10-01 00:00:00"), 1; "timestamp eq")]
#[test_case("timestamp_column", Greater, ts("2019-10-01 00:00:00"), 0; "timestamp gt")]
#[test_case("timestamp_column", Less, ts("2019-10-01 00:00:00"), 0; "timestamp lt")]
#[test_case("timestamp_column", Equal, ts("2019-10-02 00:00:00"), 0; "timestamp eq miss")]
#[test_case("timestamp_column", Greater, ts("2001-01-01 00:00:00"), 1; "timestamp gt hit")]
#[test_case("timestamp_column", Less, ts("2030-01-01 00:00:00"), 1; "timestamp lt hit")]
#[tokio::test]
async fn test_filters(column: &str, op: ComparisonOp, value: Literal, expected: u64) {
    let connector = filter_pushdown();
    let predicate = Predicate::new(column, op, value);
    let count = connector.count("filter_pushdown", &[predicate.clone()]).await.unwrap();
    assert_eq!(count, expected, "count(*) WHERE {}", predicate);

    let rows = connector
        .scan("filter_pushdown", &[column], &[predicate])
        .await
        .unwrap();
    assert_eq!(rows.len() as u64, expected);
}

#[tokio::test]
async fn test_not_equal_and_null_checks() {
    let source = Arc::new(InMemorySource::new());
    source.create_index("t", flat_mapping(&[("long_column", "long"), ("keyword_column", "keyword")]));
    source.index_document("t", json!({"long_column": 1, "keyword_column": "a"}));
    source.index_document("t", json!({"long_column": 2}));
    source.index_document("t", json!({"keyword_column": "b"}));
    let connector = connector(&source);

    let count = |predicates: Vec<Predicate>| {
        let connector = &connector;
        async move { connector.count("t", &predicates).await.unwrap() }
    };

    // NULL never satisfies <>
    assert_eq!(
        count(vec![Predicate::new("long_column", ComparisonOp::NotEqual, Integer(1))]).await,
        1
    );
    assert_eq!(count(vec![Predicate::is_null("keyword_column")]).await, 1);
    assert_eq!(count(vec![Predicate::is_not_null("long_column")]).await, 2);
    assert_eq!(
        count(vec![
            Predicate::is_not_null("long_column"),
            Predicate::new("keyword_column", ComparisonOp::NotEqual, text("b")),
        ])
        .await,
        1
    );
}

#[tokio::test]
async fn test_plan_rechecks_every_pushed_filter() {
    let connector = filter_pushdown();
    let plan = connector
        .plan_scan(
            "filter_pushdown",
            &[
                Predicate::equal("text_column", text("some")),
                Predicate::new("long_column", ComparisonOp::GreaterEqual, Integer(4)),
            ],
        )
        .await
        .unwrap();
    assert_eq!(
        plan.remaining,
        vec![
            Predicate::equal("text_column", text("some")),
            Predicate::new("long_column", ComparisonOp::GreaterEqual, Integer(4)),
        ]
    );
    assert_eq!(
        plan.query,
        json!({"bool": {"filter": [
            {"match_phrase": {"text_column": {"query": "some"}}},
            {"range": {"long_column": {"gte": 4}}}
        ]}})
    );
}

#[tokio::test]
async fn test_multi_valued_field_without_array_hint() {
    let source = Arc::new(InMemorySource::new());
    source.create_index("multi", flat_mapping(&[("x", "long")]));
    source.index_document("multi", json!({"x": [1, 2]}));
    source.index_document("multi", json!({"x": 2}));
    let connector = connector(&source);

    // The array document matches natively but decodes to NULL
    for predicate in [
        Predicate::equal("x", Integer(2)),
        Predicate::new("x", Greater, Integer(1)),
        Predicate::is_not_null("x"),
    ] {
        let rows = connector
            .scan("multi", &["x"], &[predicate.clone()])
            .await
            .unwrap();
        let values: Vec<_> = rows.iter().map(|r| r.get(0).clone()).collect();
        assert_eq!(values, vec![DecodedValue::BigInt(2)], "scan WHERE {}", predicate);
        assert_eq!(
            connector.count("multi", &[predicate.clone()]).await.unwrap(),
            1,
            "count(*) WHERE {}",
            predicate
        );
    }

    let nulls = [Predicate::is_null("x")];
    assert_eq!(connector.count("multi", &nulls).await.unwrap(), 1);
    let rows = connector.scan("multi", &["x"], &nulls).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].get(0).is_null());
}
