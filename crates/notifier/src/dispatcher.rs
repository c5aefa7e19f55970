//! Routes subscribed events to their handler.

use chrono::{DateTime, Utc};
use common::SubjectId;
use domain::{DomainEvent, EventEnvelope};
use futures_util::stream::{self, StreamExt};
use projector::DataSource;

use crate::coordinator::SideEffectCoordinator;
use crate::outcome::NotificationOutcome;
use crate::services::{AudienceSync, CustomerStore, EmailSender};

/// Entry point for event occurrences. Each occurrence runs exactly one handler.
pub struct EventDispatcher<D, E, A, C>
where
    D: DataSource,
    E: EmailSender,
    A: AudienceSync,
    C: CustomerStore,
{
    coordinator: SideEffectCoordinator<D, E, A, C>,
}

impl<D, E, A, C> EventDispatcher<D, E, A, C>
where
    D: DataSource,
    E: EmailSender,
    A: AudienceSync,
    C: CustomerStore,
{
    pub fn new(coordinator: SideEffectCoordinator<D, E, A, C>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &SideEffectCoordinator<D, E, A, C> {
        &self.coordinator
    }

    /// Runs the handler for one occurrence to completion.
    #[tracing::instrument(
        skip(self, envelope),
        fields(event_id = %envelope.event_id, kind = %envelope.kind(), subject_id = %envelope.subject_id())
    )]
    pub async fn dispatch(&self, envelope: &EventEnvelope) -> NotificationOutcome {
        metrics::counter!("events_received_total", "kind" => envelope.kind().as_str()).increment(1);

        let event_id = envelope.event_id;
        let outcome = match &envelope.event {
            DomainEvent::OrderPlaced { order_id } => {
                self.coordinator.order_placed(event_id, order_id).await
            }
            DomainEvent::ShipmentCreated { fulfillment_id } => {
                self.coordinator.shipment_created(event_id, fulfillment_id).await
            }
            DomainEvent::FulfillmentDelivered { fulfillment_id } => {
                self.coordinator
                    .fulfillment_delivered(event_id, fulfillment_id)
                    .await
            }
            DomainEvent::OrderCanceled { order_id } => {
                self.coordinator.order_canceled(event_id, order_id).await
            }
            DomainEvent::CustomerCreated { customer_id } => {
                self.coordinator.customer_created(event_id, customer_id).await
            }
        };

        tracing::info!(
            delivered = outcome.delivered,
            error = outcome.error.map(|kind| kind.as_str()),
            effects = outcome.attempted_effects(),
            "event handled"
        );
        outcome
    }

    /// Dispatches a bus event by name. Unsubscribed names are ignored and
    /// yield `None`.
    pub async fn dispatch_raw(
        &self,
        name: &str,
        subject_id: impl Into<SubjectId>,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Option<NotificationOutcome> {
        let Some(envelope) = EventEnvelope::from_wire(name, subject_id, occurred_at) else {
            tracing::debug!(name, "ignoring unsubscribed event");
            metrics::counter!("events_ignored_total").increment(1);
            return None;
        };
        Some(self.dispatch(&envelope).await)
    }

    /// Dispatches independent occurrences with at most `concurrency` in flight.
    ///
    /// Outcomes come back in completion order; a failing occurrence never
    /// affects the others.
    pub async fn dispatch_all(
        &self,
        envelopes: Vec<EventEnvelope>,
        concurrency: usize,
    ) -> Vec<NotificationOutcome> {
        stream::iter(envelopes)
            .map(|envelope| async move { self.dispatch(&envelope).await })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await
    }
}
