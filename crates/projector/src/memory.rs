//! In-memory data source for tests and local runs.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::contract::Entity;
use crate::error::ProjectorError;
use crate::source::{DataSource, QueryFilter};
use crate::Result;

/// A query as the data source received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedQuery {
    pub entity: Entity,
    pub fields: Vec<String>,
    pub filter: QueryFilter,
}

#[derive(Debug, Default)]
struct InMemoryState {
    rows: HashMap<Entity, Vec<Value>>,
    queries: Vec<RecordedQuery>,
    fail_on_query: bool,
}

/// Data source holding rows as JSON documents.
///
/// Rows are projected down to the requested field paths before being
/// returned, so a handler that forgets a path in its contract sees the field
/// as missing here exactly as it would against the real data layer.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataSource {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a row for `entity`.
    pub fn insert(&self, entity: Entity, row: Value) {
        self.write().rows.entry(entity).or_default().push(row);
    }

    /// Builder form of [`InMemoryDataSource::insert`].
    pub fn with_row(self, entity: Entity, row: Value) -> Self {
        self.insert(entity, row);
        self
    }

    /// Makes every subsequent query fail.
    pub fn set_fail_on_query(&self, fail: bool) {
        self.write().fail_on_query = fail;
    }

    /// Queries received so far, oldest first.
    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.read().queries.clone()
    }

    pub fn query_count(&self) -> usize {
        self.read().queries.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    async fn query(
        &self,
        entity: Entity,
        fields: &[&str],
        filter: &QueryFilter,
    ) -> Result<Vec<Value>> {
        let mut state = self.write();
        state.queries.push(RecordedQuery {
            entity,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            filter: filter.clone(),
        });

        if state.fail_on_query {
            return Err(ProjectorError::DataSource(
                "data layer unavailable".to_string(),
            ));
        }

        Ok(state
            .rows
            .get(&entity)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filter.matches(row))
                    .map(|row| project_fields(row, fields))
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Keeps only `paths` of `value`. Arrays are projected element-wise, a `*`
/// segment keeps every scalar at that level, and a path that ends on a
/// relation keeps the relation whole.
pub fn project_fields(value: &Value, paths: &[&str]) -> Value {
    let split: Vec<Vec<&str>> = paths.iter().map(|p| p.split('.').collect()).collect();
    let borrowed: Vec<&[&str]> = split.iter().map(Vec::as_slice).collect();
    project(value, &borrowed)
}

fn project(value: &Value, paths: &[&[&str]]) -> Value {
    let map = match value {
        Value::Array(items) => return Value::Array(items.iter().map(|v| project(v, paths)).collect()),
        Value::Object(map) => map,
        scalar => return scalar.clone(),
    };

    let mut scalars = false;
    let mut whole: BTreeSet<&str> = BTreeSet::new();
    let mut nested: BTreeMap<&str, Vec<&[&str]>> = BTreeMap::new();
    for path in paths {
        match path.split_first() {
            Some((&"*", _)) => scalars = true,
            Some((head, [])) => {
                whole.insert(*head);
            }
            Some((head, rest)) => nested.entry(*head).or_default().push(rest),
            None => {}
        }
    }

    let mut out = Map::new();
    if scalars {
        for (key, child) in map {
            if !child.is_object() && !child.is_array() {
                out.insert(key.clone(), child.clone());
            }
        }
    }
    for head in &whole {
        if let Some(child) = map.get(*head) {
            out.insert(head.to_string(), child.clone());
        }
    }
    for (head, rests) in nested {
        if whole.contains(head) {
            continue;
        }
        if let Some(child) = map.get(head) {
            out.insert(head.to_string(), project(child, &rests));
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order_row() -> Value {
        json!({
            "id": "ord_1",
            "email": "a@b.com",
            "currency_code": "eur",
            "items": [
                {"title": "Tee", "unit_price": 10, "variant": {"sku": "TEE-1"}},
                {"title": "Cap", "unit_price": 5, "variant": null}
            ],
            "shipping_address": {"first_name": "Sam", "phone": "555"}
        })
    }

    #[test]
    fn test_projection_keeps_only_requested_paths() {
        let projected = project_fields(
            &order_row(),
            &["id", "items.title", "shipping_address.first_name"],
        );
        assert_eq!(
            projected,
            json!({
                "id": "ord_1",
                "items": [{"title": "Tee"}, {"title": "Cap"}],
                "shipping_address": {"first_name": "Sam"}
            })
        );
    }

    #[test]
    fn test_wildcard_keeps_scalars_only() {
        let projected = project_fields(&order_row(), &["*"]);
        assert_eq!(
            projected,
            json!({"id": "ord_1", "email": "a@b.com", "currency_code": "eur"})
        );
    }

    #[test]
    fn test_null_relation_stays_null() {
        let projected = project_fields(&order_row(), &["items.variant.sku"]);
        assert_eq!(
            projected,
            json!({"items": [{"variant": {"sku": "TEE-1"}}, {"variant": null}]})
        );
    }

    #[tokio::test]
    async fn test_query_filters_by_id_and_records_contract() {
        let source = InMemoryDataSource::new()
            .with_row(Entity::Order, order_row())
            .with_row(Entity::Order, json!({"id": "ord_2", "email": "x@y.z"}));

        let rows = source
            .query(Entity::Order, &["id", "email"], &QueryFilter::id("ord_2"))
            .await
            .unwrap();

        assert_eq!(rows, vec![json!({"id": "ord_2", "email": "x@y.z"})]);
        let queries = source.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].fields, vec!["id", "email"]);
    }

    #[tokio::test]
    async fn test_fail_on_query() {
        let source = InMemoryDataSource::new();
        source.set_fail_on_query(true);
        let result = source
            .query(Entity::Customer, &["id"], &QueryFilter::All)
            .await;
        assert!(matches!(result, Err(ProjectorError::DataSource(_))));
        assert_eq!(source.query_count(), 1);
    }
}
