//! The record projector: one contracted read per event.

use common::SubjectId;
use domain::{CustomerRecord, EventKind, FulfillmentRecord, OrderRecord};
use serde_json::Value;

use crate::Result;
use crate::contract::{Entity, FieldContract, TAX_EXPORT};
use crate::normalize;
use crate::source::{DataSource, QueryFilter};

/// A normalized record, tagged by entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Order(OrderRecord),
    Fulfillment(FulfillmentRecord),
    Customer(CustomerRecord),
}

impl Record {
    pub fn entity(&self) -> Entity {
        match self {
            Record::Order(_) => Entity::Order,
            Record::Fulfillment(_) => Entity::Fulfillment,
            Record::Customer(_) => Entity::Customer,
        }
    }

    pub fn into_order(self) -> Option<OrderRecord> {
        match self {
            Record::Order(order) => Some(order),
            _ => None,
        }
    }

    pub fn into_fulfillment(self) -> Option<FulfillmentRecord> {
        match self {
            Record::Fulfillment(fulfillment) => Some(fulfillment),
            _ => None,
        }
    }

    pub fn into_customer(self) -> Option<CustomerRecord> {
        match self {
            Record::Customer(customer) => Some(customer),
            _ => None,
        }
    }
}

/// Reads exactly the fields each event kind needs and normalizes the result.
pub struct RecordProjector<D: DataSource> {
    source: D,
}

impl<D: DataSource> RecordProjector<D> {
    pub fn new(source: D) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    /// Fetches the subject of a `kind` event.
    ///
    /// Returns `Ok(None)` when no record matches; callers skip the event.
    #[tracing::instrument(skip(self), fields(kind = %kind, subject_id = %subject_id))]
    pub async fn fetch(&self, kind: EventKind, subject_id: &SubjectId) -> Result<Option<Record>> {
        let contract = FieldContract::for_kind(kind);
        let fetched = self.read_one(contract, subject_id).await;

        let result = match &fetched {
            Ok(Some(_)) => "found",
            Ok(None) => "not_found",
            Err(err) if err.is_malformed() => "malformed",
            Err(_) => "error",
        };
        metrics::counter!("records_projected_total", "entity" => contract.entity.as_str(), "result" => result)
            .increment(1);
        if matches!(fetched, Ok(None)) {
            tracing::info!(entity = %contract.entity, "record not found");
        }
        fetched
    }

    async fn read_one(
        &self,
        contract: &FieldContract,
        subject_id: &SubjectId,
    ) -> Result<Option<Record>> {
        let rows = self
            .source
            .query(
                contract.entity,
                contract.fields,
                &QueryFilter::id(subject_id.clone()),
            )
            .await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        Ok(match contract.entity {
            Entity::Order => Some(Record::Order(normalize::order(row, Some(subject_id))?)),
            Entity::Fulfillment => normalize::fulfillment(row, subject_id)?.map(Record::Fulfillment),
            Entity::Customer => Some(Record::Customer(normalize::customer_record(
                row, subject_id,
            )?)),
        })
    }

    /// Reads the paid orders for the tax export, in the order the source
    /// returns them. Unpaid rows are dropped before normalization, so a
    /// malformed pending order cannot fail the export.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders_for_tax_export(&self) -> Result<Vec<OrderRecord>> {
        let rows = self
            .source
            .query(TAX_EXPORT.entity, TAX_EXPORT.fields, &QueryFilter::All)
            .await?;
        let total = rows.len();
        let paid: Vec<Value> = rows.into_iter().filter(normalize::is_paid_row).collect();
        tracing::debug!(
            rows = total,
            skipped = total - paid.len(),
            "fetched orders for tax export"
        );

        paid.into_iter()
            .map(|row| normalize::order(row, None))
            .collect()
    }
}
