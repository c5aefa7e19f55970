//! The read interface of the external data layer.

use std::sync::Arc;

use async_trait::async_trait;
use common::SubjectId;
use serde::Serialize;
use serde_json::Value;

use crate::Result;
use crate::contract::Entity;

/// Row filter passed along with a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryFilter {
    /// Every row of the entity.
    All,
    /// The row whose `id` matches.
    Id { id: SubjectId },
}

impl QueryFilter {
    pub fn id(id: impl Into<SubjectId>) -> Self {
        QueryFilter::Id { id: id.into() }
    }

    /// True when `row` passes the filter.
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            QueryFilter::All => true,
            QueryFilter::Id { id } => row.get("id").and_then(Value::as_str) == Some(id.as_str()),
        }
    }
}

/// A queryable commerce data layer returning nested JSON rows.
///
/// Implementations must return only the requested field paths (or a subset of
/// them); callers must not rely on anything else being present.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Returns every row of `entity` that passes `filter`, projected to `fields`.
    async fn query(
        &self,
        entity: Entity,
        fields: &[&str],
        filter: &QueryFilter,
    ) -> Result<Vec<Value>>;
}

#[async_trait]
impl<T: DataSource + ?Sized> DataSource for Arc<T> {
    async fn query(
        &self,
        entity: Entity,
        fields: &[&str],
        filter: &QueryFilter,
    ) -> Result<Vec<Value>> {
        (**self).query(entity, fields, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_filter_matches_only_same_id() {
        let filter = QueryFilter::id("ord_1");
        assert!(filter.matches(&json!({"id": "ord_1"})));
        assert!(!filter.matches(&json!({"id": "ord_2"})));
        assert!(!filter.matches(&json!({"display_id": 1})));
    }

    #[test]
    fn test_all_filter_matches_everything() {
        assert!(QueryFilter::All.matches(&json!({})));
    }

    #[test]
    fn test_filter_serializes_as_plain_object() {
        assert_eq!(
            serde_json::to_value(QueryFilter::id("cus_1")).unwrap(),
            json!({"id": "cus_1"})
        );
    }
}
