//! In-memory document engine
//!
//! A small stand-in for a real cluster: indices with mappings (explicit or
//! dynamically inferred from indexed documents), aliases, wildcard patterns,
//! and a search endpoint that evaluates the subset of the native query DSL the
//! pushdown translator emits:
//!
//! - `match_all`, `match_none`, `constant_score`
//! - `bool` with `must` / `filter` / `should` / `must_not`
//! - `term`, `terms`, `range`, `exists`, `match_phrase`
//! - `query_string` (see [`super::query_string`])
//!
//! Every hit scores `1.0`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use log::debug;
use serde_json::{json, Map, Value};

use super::query_string::{self, QueryClause};
use super::{DocumentSource, IndexMapping, SearchHit, SourceError, SourceResult};
use crate::decoder::coerce::parse_timestamp_millis;

const HIT_SCORE: f32 = 1.0;

#[derive(Debug, Clone)]
struct MemoryIndex {
    /// Full mapping document: `{"_meta": .., "properties": ..}`
    mapping: Value,
    version: u64,
    documents: Vec<(String, Value)>,
}

impl MemoryIndex {
    fn new(mapping: Value) -> Self {
        MemoryIndex {
            mapping,
            version: 1,
            documents: Vec::new(),
        }
    }

    fn properties(&self) -> Value {
        self.mapping
            .get("properties")
            .cloned()
            .unwrap_or_else(|| json!({}))
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    indices: BTreeMap<String, MemoryIndex>,
    aliases: BTreeMap<String, BTreeSet<String>>,
    next_id: u64,
}

/// Thread-safe in-memory [`DocumentSource`]
#[derive(Debug, Default)]
pub struct InMemorySource {
    state: RwLock<MemoryState>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Create (or replace) an index with an explicit mapping document
    pub fn create_index(&self, index: &str, mapping: Value) {
        let mut state = self.write();
        let version = state.indices.get(index).map(|i| i.version + 1).unwrap_or(1);
        let mut created = MemoryIndex::new(mapping);
        created.version = version;
        state.indices.insert(index.to_string(), created);
    }

    /// Replace the mapping of an existing index, keeping its documents
    pub fn put_mapping(&self, index: &str, mapping: Value) -> SourceResult<()> {
        let mut state = self.write();
        let existing = state
            .indices
            .get_mut(index)
            .ok_or_else(|| SourceError::IndexNotFound(index.to_string()))?;
        existing.mapping = mapping;
        existing.version += 1;
        Ok(())
    }

    /// Index a document, creating the index and extending its mapping dynamically
    ///
    /// Returns the generated document id.
    pub fn index_document(&self, index: &str, document: Value) -> String {
        let mut state = self.write();
        state.next_id += 1;
        let id = state.next_id.to_string();

        let entry = state
            .indices
            .entry(index.to_string())
            .or_insert_with(|| MemoryIndex::new(json!({ "properties": {} })));

        if let Value::Object(fields) = &document {
            let mut properties = match entry.mapping.get("properties") {
                Some(Value::Object(p)) => p.clone(),
                _ => Map::new(),
            };
            if infer_properties(&mut properties, fields) {
                entry.mapping["properties"] = Value::Object(properties);
                entry.version += 1;
                debug!("Dynamic mapping update for index {} (version {})", index, entry.version);
            }
        }

        entry.documents.push((id.clone(), document));
        id
    }

    pub fn add_alias(&self, alias: &str, index: &str) {
        self.write()
            .aliases
            .entry(alias.to_string())
            .or_default()
            .insert(index.to_string());
    }

    pub fn document_count(&self, index: &str) -> usize {
        self.read()
            .indices
            .get(index)
            .map(|i| i.documents.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentSource for InMemorySource {
    async fn list_indices(&self, name: &str) -> SourceResult<BTreeSet<String>> {
        let state = self.read();
        let mut matched = BTreeSet::new();
        for part in name.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if state.indices.contains_key(part) {
                matched.insert(part.to_string());
            } else if let Some(targets) = state.aliases.get(part) {
                matched.extend(targets.iter().cloned());
            } else if part.contains('*') {
                matched.extend(
                    state
                        .indices
                        .keys()
                        .filter(|index| wildcard_match(part, index))
                        .cloned(),
                );
            }
        }
        Ok(matched)
    }

    async fn fetch_mapping(&self, index: &str) -> SourceResult<IndexMapping> {
        let state = self.read();
        let entry = state
            .indices
            .get(index)
            .ok_or_else(|| SourceError::IndexNotFound(index.to_string()))?;
        Ok(IndexMapping::from_mapping_json(
            index,
            &entry.mapping,
            entry.version,
        ))
    }

    async fn mapping_version(&self, index: &str) -> SourceResult<u64> {
        self.read()
            .indices
            .get(index)
            .map(|i| i.version)
            .ok_or_else(|| SourceError::IndexNotFound(index.to_string()))
    }

    fn fetch_documents(
        &self,
        index: &str,
        query: &Value,
        page_size: usize,
    ) -> BoxStream<'static, SourceResult<SearchHit>> {
        let (documents, properties) = {
            let state = self.read();
            match state.indices.get(index) {
                Some(entry) => (Arc::new(entry.documents.clone()), Arc::new(entry.properties())),
                None => {
                    let missing = SourceError::IndexNotFound(index.to_string());
                    return stream::once(async move { Err(missing) }).boxed();
                }
            }
        };

        let compiled = match NativeQuery::compile(query) {
            Ok(q) => Arc::new(q),
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        let index = index.to_string();
        let page_size = page_size.max(1);
        debug!(
            "Searching {} documents in {} (page size {})",
            documents.len(),
            index,
            page_size
        );

        stream::unfold(0usize, move |offset| {
            let documents = Arc::clone(&documents);
            let properties = Arc::clone(&properties);
            let compiled = Arc::clone(&compiled);
            let index = index.clone();
            async move {
                if offset >= documents.len() {
                    return None;
                }
                let end = (offset + page_size).min(documents.len());
                let page: Vec<SourceResult<SearchHit>> = documents[offset..end]
                    .iter()
                    .filter(|(_, doc)| compiled.matches(&FlatDocument::new(doc, &properties)))
                    .map(|(id, doc)| {
                        Ok(SearchHit {
                            index: index.clone(),
                            id: id.clone(),
                            score: Some(HIT_SCORE),
                            source: doc.clone(),
                        })
                    })
                    .collect();
                Some((stream::iter(page), end))
            }
        })
        .flatten()
        .boxed()
    }
}

/// Simple `*` wildcard matching for index patterns
fn wildcard_match(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let mut rest = name;
    for (i, part) in parts.iter().enumerate() {
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    rest.is_empty()
}

/// Extend `properties` with fields seen in `fields`; returns true on change
fn infer_properties(properties: &mut Map<String, Value>, fields: &Map<String, Value>) -> bool {
    let mut changed = false;
    for (key, value) in fields {
        // Dotted keys address nested objects
        let mut segments: Vec<&str> = key.split('.').collect();
        if let Some(leaf) = segments.pop() {
            changed |= infer_at_path(properties, &segments, leaf, value);
        }
    }
    changed
}

fn infer_at_path(
    properties: &mut Map<String, Value>,
    parents: &[&str],
    leaf: &str,
    value: &Value,
) -> bool {
    let Some((head, rest)) = parents.split_first() else {
        return infer_field(properties, leaf, value);
    };

    let mut changed = false;
    let node = properties.entry(head.to_string()).or_insert_with(|| {
        changed = true;
        json!({ "properties": {} })
    });
    if !matches!(node.get("properties"), Some(Value::Object(_))) {
        // Declared as an object without properties so far
        node["properties"] = json!({});
        changed = true;
    }
    match node.get_mut("properties") {
        Some(Value::Object(nested)) => infer_at_path(nested, rest, leaf, value) || changed,
        _ => changed,
    }
}

fn infer_field(properties: &mut Map<String, Value>, name: &str, value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => items
            .iter()
            .fold(false, |changed, item| infer_field(properties, name, item) || changed),
        Value::Object(children) => {
            let mut changed = false;
            let node = properties.entry(name.to_string()).or_insert_with(|| {
                changed = true;
                json!({ "type": "object" })
            });
            if children.is_empty() {
                return changed;
            }
            if node.get("properties").is_none() {
                node["properties"] = json!({});
            }
            if let Some(Value::Object(nested)) = node.get_mut("properties") {
                changed |= infer_properties(nested, children);
            }
            changed
        }
        scalar => {
            if properties.contains_key(name) {
                return false;
            }
            let native_type = match scalar {
                Value::Bool(_) => "boolean",
                Value::Number(n) if n.is_f64() => "float",
                Value::Number(_) => "long",
                _ => "text",
            };
            properties.insert(name.to_string(), json!({ "type": native_type }));
            true
        }
    }
}

/// Native type of a dotted field path, if mapped
fn field_type<'a>(properties: &'a Value, path: &str) -> Option<&'a str> {
    let mut current = properties;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let node = current.get(segment)?;
        if segments.peek().is_none() {
            return node.get("type").and_then(Value::as_str).or(Some("object"));
        }
        current = node.get("properties")?;
    }
    None
}

/// Document flattened to dotted paths, arrays expanded into multiple values
struct FlatDocument<'a> {
    values: BTreeMap<String, Vec<&'a Value>>,
    properties: &'a Value,
}

impl<'a> FlatDocument<'a> {
    fn new(document: &'a Value, properties: &'a Value) -> Self {
        let mut values = BTreeMap::new();
        flatten(document, "", &mut values);
        FlatDocument { values, properties }
    }

    fn get(&self, field: &str) -> &[&'a Value] {
        self.values.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    fn exists(&self, field: &str) -> bool {
        let prefix = format!("{}.", field);
        self.values
            .keys()
            .any(|k| k == field || k.starts_with(&prefix))
    }

    fn is_date(&self, field: &str) -> bool {
        field_type(self.properties, field) == Some("date")
    }

    /// Normalized values of `field`, ready for comparison
    fn comparable(&self, field: &str) -> Vec<Value> {
        let is_date = self.is_date(field);
        self.get(field)
            .iter()
            .filter_map(|v| normalize(v, is_date))
            .collect()
    }

    /// Tokenized string values keyed by their dotted path
    fn text_fields(&self) -> Vec<(String, Vec<String>)> {
        self.values
            .iter()
            .flat_map(|(path, values)| {
                values
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(move |text| (path.clone(), query_string::tokenize(text)))
            })
            .collect()
    }
}

fn flatten<'a>(value: &'a Value, prefix: &str, out: &mut BTreeMap<String, Vec<&'a Value>>) {
    match value {
        Value::Object(fields) => {
            for (key, child) in fields {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(child, &path, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten(item, prefix, out);
            }
        }
        Value::Null => {}
        scalar => out.entry(prefix.to_string()).or_default().push(scalar),
    }
}

fn normalize(value: &Value, is_date: bool) -> Option<Value> {
    if is_date {
        return match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(Value::from),
            Value::String(s) => s
                .parse::<i64>()
                .ok()
                .or_else(|| parse_timestamp_millis(s))
                .map(Value::from),
            _ => None,
        };
    }
    Some(value.clone())
}

fn compare(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::String(b)) | (Value::String(b), Value::Bool(a)) => {
            (b.parse::<bool>().ok()? == *a).then_some(std::cmp::Ordering::Equal)
        }
        (Value::Number(_), Value::String(s)) => compare(left, &s.parse::<f64>().ok().map(Value::from)?),
        (Value::String(s), Value::Number(_)) => compare(&s.parse::<f64>().ok().map(Value::from)?, right),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug)]
enum NativeQuery {
    MatchAll,
    MatchNone,
    Bool {
        must: Vec<NativeQuery>,
        should: Vec<NativeQuery>,
        must_not: Vec<NativeQuery>,
    },
    Term {
        field: String,
        values: Vec<Value>,
    },
    Range {
        field: String,
        bounds: Vec<(RangeOp, Value)>,
    },
    Exists {
        field: String,
    },
    MatchPhrase {
        field: String,
        tokens: Vec<String>,
    },
    QueryString {
        clauses: Vec<QueryClause>,
    },
}

fn malformed(message: impl Into<String>) -> SourceError {
    SourceError::Transport(format!("parsing_exception: {}", message.into()))
}

/// Single `{ field: body }` entry of a leaf query
fn single_field(body: &Value, query: &str) -> SourceResult<(String, Value)> {
    match body {
        Value::Object(map) if map.len() == 1 => map
            .iter()
            .next()
            .map(|(k, v)| (k.clone(), v.clone()))
            .ok_or_else(|| malformed(format!("[{}] malformed query", query))),
        _ => Err(malformed(format!(
            "[{}] query doesn't support multiple fields",
            query
        ))),
    }
}

impl NativeQuery {
    fn compile(query: &Value) -> SourceResult<Self> {
        let map = match query {
            Value::Object(map) if map.len() == 1 => map,
            Value::Object(map) if map.is_empty() => return Ok(NativeQuery::MatchAll),
            _ => return Err(malformed("query must have exactly one clause")),
        };
        let Some((kind, body)) = map.iter().next() else {
            return Ok(NativeQuery::MatchAll);
        };

        match kind.as_str() {
            "match_all" => Ok(NativeQuery::MatchAll),
            "match_none" => Ok(NativeQuery::MatchNone),
            "constant_score" => body
                .get("filter")
                .ok_or_else(|| malformed("[constant_score] requires a filter"))
                .and_then(NativeQuery::compile),
            "bool" => {
                let clauses = |name: &str| -> SourceResult<Vec<NativeQuery>> {
                    match body.get(name) {
                        None => Ok(Vec::new()),
                        Some(Value::Array(items)) => items.iter().map(NativeQuery::compile).collect(),
                        Some(single) => Ok(vec![NativeQuery::compile(single)?]),
                    }
                };
                let mut must = clauses("must")?;
                must.extend(clauses("filter")?);
                Ok(NativeQuery::Bool {
                    must,
                    should: clauses("should")?,
                    must_not: clauses("must_not")?,
                })
            }
            "term" => {
                let (field, params) = single_field(body, "term")?;
                let value = params.get("value").cloned().unwrap_or(params);
                Ok(NativeQuery::Term {
                    field,
                    values: vec![value],
                })
            }
            "terms" => {
                let (field, params) = single_field(body, "terms")?;
                match params {
                    Value::Array(values) => Ok(NativeQuery::Term { field, values }),
                    _ => Err(malformed("[terms] requires an array of values")),
                }
            }
            "range" => {
                let (field, params) = single_field(body, "range")?;
                let mut bounds = Vec::new();
                for (name, op) in [
                    ("gt", RangeOp::Gt),
                    ("gte", RangeOp::Gte),
                    ("lt", RangeOp::Lt),
                    ("lte", RangeOp::Lte),
                ] {
                    if let Some(bound) = params.get(name) {
                        bounds.push((op, bound.clone()));
                    }
                }
                Ok(NativeQuery::Range { field, bounds })
            }
            "exists" => body
                .get("field")
                .and_then(Value::as_str)
                .map(|field| NativeQuery::Exists {
                    field: field.to_string(),
                })
                .ok_or_else(|| malformed("[exists] requires a field")),
            "match_phrase" => {
                let (field, params) = single_field(body, "match_phrase")?;
                let text = params
                    .get("query")
                    .and_then(Value::as_str)
                    .or_else(|| params.as_str())
                    .ok_or_else(|| malformed("[match_phrase] requires a query"))?;
                Ok(NativeQuery::MatchPhrase {
                    field,
                    tokens: query_string::tokenize(text),
                })
            }
            "query_string" => {
                let text = body
                    .get("query")
                    .and_then(Value::as_str)
                    .ok_or_else(|| malformed("[query_string] requires a query"))?;
                let clauses =
                    query_string::parse_query_string(text).map_err(SourceError::QueryParse)?;
                Ok(NativeQuery::QueryString { clauses })
            }
            other => Err(malformed(format!("unknown query [{}]", other))),
        }
    }

    fn matches(&self, doc: &FlatDocument<'_>) -> bool {
        match self {
            NativeQuery::MatchAll => true,
            NativeQuery::MatchNone => false,
            NativeQuery::Bool {
                must,
                should,
                must_not,
            } => {
                must.iter().all(|q| q.matches(doc))
                    && !must_not.iter().any(|q| q.matches(doc))
                    && (should.is_empty() || !must.is_empty() || should.iter().any(|q| q.matches(doc)))
            }
            NativeQuery::Term { field, values } => {
                let is_date = doc.is_date(field);
                let wanted: Vec<Value> = values.iter().filter_map(|v| normalize(v, is_date)).collect();
                doc.comparable(field).iter().any(|actual| {
                    wanted
                        .iter()
                        .any(|w| compare(actual, w) == Some(std::cmp::Ordering::Equal))
                })
            }
            NativeQuery::Range { field, bounds } => {
                let is_date = doc.is_date(field);
                doc.comparable(field).iter().any(|actual| {
                    bounds.iter().all(|(op, bound)| {
                        let Some(bound) = normalize(bound, is_date) else {
                            return false;
                        };
                        match (compare(actual, &bound), op) {
                            (Some(ord), RangeOp::Gt) => ord.is_gt(),
                            (Some(ord), RangeOp::Gte) => ord.is_ge(),
                            (Some(ord), RangeOp::Lt) => ord.is_lt(),
                            (Some(ord), RangeOp::Lte) => ord.is_le(),
                            (None, _) => false,
                        }
                    })
                })
            }
            NativeQuery::Exists { field } => doc.exists(field),
            NativeQuery::MatchPhrase { field, tokens } => {
                let phrase = query_string::QueryTerm::Phrase(tokens.clone());
                doc.get(field)
                    .iter()
                    .filter_map(|v| v.as_str())
                    .any(|text| phrase.matches(&query_string::tokenize(text)))
            }
            NativeQuery::QueryString { clauses } => {
                query_string::evaluate(clauses, &doc.text_fields())
            }
        }
    }
}
