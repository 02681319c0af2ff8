// Schema reads and scans on a shared connector while the mapping grows
use std::sync::Arc;

use doctable::{ColumnDescriptor, Connector, DecodedValue, InMemorySource, RelationalType};
use serde_json::{json, Map, Value};

use super::fixtures::connector;

const FIELDS: usize = 24;
const READERS: usize = 8;

fn assert_send_sync<T: Send + Sync>() {}

/// Fields are added as f0, f1, ... so every snapshot is a prefix of them
fn assert_consistent(columns: &[ColumnDescriptor]) {
    let mut names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    let mut expected: Vec<String> = (0..columns.len()).map(|i| format!("f{}", i)).collect();
    expected.sort_unstable();
    assert_eq!(names, expected, "schema is not a snapshot of the mapping");
    assert!(columns.iter().all(|c| c.column_type == RelationalType::BigInt));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_consistent_schema_during_mapping_updates() -> anyhow::Result<()> {
    assert_send_sync::<Connector>();

    let source = Arc::new(InMemorySource::new());
    source.index_document("events", json!({"f0": 0}));
    let connector = Arc::new(connector(&source));

    let writer = {
        let source = source.clone();
        tokio::spawn(async move {
            for i in 1..FIELDS {
                let mut document = Map::new();
                document.insert(format!("f{}", i), json!(i));
                source.index_document("events", Value::Object(document));
                tokio::task::yield_now().await;
            }
        })
    };

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let connector = connector.clone();
            tokio::spawn(async move {
                let mut widest = 0;
                for _ in 0..FIELDS {
                    let columns = connector.get_table_schema("events").await?;
                    assert_consistent(&columns);
                    widest = widest.max(columns.len());

                    // A column seen in one snapshot stays resolvable
                    let newest = format!("f{}", columns.len() - 1);
                    let rows = connector.scan("events", &["f0", newest.as_str()], &[]).await?;
                    assert!(rows.iter().all(|row| row.values.len() == 2));
                    let first: Vec<_> = rows
                        .iter()
                        .filter(|row| row.get(0) == &DecodedValue::BigInt(0))
                        .collect();
                    assert_eq!(first.len(), 1);
                    tokio::task::yield_now().await;
                }
                anyhow::Ok(widest)
            })
        })
        .collect();

    writer.await?;
    for reader in readers {
        let widest = reader.await??;
        assert!((1..=FIELDS).contains(&widest));
    }

    let columns = connector.get_table_schema("events").await?;
    assert_consistent(&columns);
    assert_eq!(columns.len(), FIELDS);
    Ok(())
}
