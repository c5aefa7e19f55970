//! Inbound domain events the dispatcher reacts to.

use chrono::{DateTime, Utc};
use common::{EventId, SubjectId};
use serde::{Deserialize, Serialize};

/// The kinds of occurrence this service subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    OrderPlaced,
    ShipmentCreated,
    FulfillmentDelivered,
    OrderCanceled,
    CustomerCreated,
}

impl EventKind {
    /// Every subscribed kind.
    pub const ALL: [EventKind; 5] = [
        EventKind::OrderPlaced,
        EventKind::ShipmentCreated,
        EventKind::FulfillmentDelivered,
        EventKind::OrderCanceled,
        EventKind::CustomerCreated,
    ];

    /// Wire names the event bus uses, including legacy aliases.
    pub const SUBSCRIBED_NAMES: [&'static str; 6] = [
        "order.placed",
        "shipment.created",
        "fulfillment.delivered",
        "delivery.created",
        "order.canceled",
        "customer.created",
    ];

    /// Resolves a bus event name. Names this service does not subscribe to
    /// resolve to `None`.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "order.placed" => Some(EventKind::OrderPlaced),
            "shipment.created" => Some(EventKind::ShipmentCreated),
            "fulfillment.delivered" | "delivery.created" => Some(EventKind::FulfillmentDelivered),
            "order.canceled" => Some(EventKind::OrderCanceled),
            "customer.created" => Some(EventKind::CustomerCreated),
            _ => None,
        }
    }

    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OrderPlaced => "order.placed",
            EventKind::ShipmentCreated => "shipment.created",
            EventKind::FulfillmentDelivered => "fulfillment.delivered",
            EventKind::OrderCanceled => "order.canceled",
            EventKind::CustomerCreated => "customer.created",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subscribed event, carrying only the subject its handler needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DomainEvent {
    OrderPlaced { order_id: SubjectId },
    ShipmentCreated { fulfillment_id: SubjectId },
    FulfillmentDelivered { fulfillment_id: SubjectId },
    OrderCanceled { order_id: SubjectId },
    CustomerCreated { customer_id: SubjectId },
}

impl DomainEvent {
    /// Builds the variant for `kind` about `subject`.
    pub fn new(kind: EventKind, subject: impl Into<SubjectId>) -> Self {
        let subject = subject.into();
        match kind {
            EventKind::OrderPlaced => DomainEvent::OrderPlaced { order_id: subject },
            EventKind::ShipmentCreated => DomainEvent::ShipmentCreated {
                fulfillment_id: subject,
            },
            EventKind::FulfillmentDelivered => DomainEvent::FulfillmentDelivered {
                fulfillment_id: subject,
            },
            EventKind::OrderCanceled => DomainEvent::OrderCanceled { order_id: subject },
            EventKind::CustomerCreated => DomainEvent::CustomerCreated {
                customer_id: subject,
            },
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::OrderPlaced { .. } => EventKind::OrderPlaced,
            DomainEvent::ShipmentCreated { .. } => EventKind::ShipmentCreated,
            DomainEvent::FulfillmentDelivered { .. } => EventKind::FulfillmentDelivered,
            DomainEvent::OrderCanceled { .. } => EventKind::OrderCanceled,
            DomainEvent::CustomerCreated { .. } => EventKind::CustomerCreated,
        }
    }

    pub fn subject_id(&self) -> &SubjectId {
        match self {
            DomainEvent::OrderPlaced { order_id } | DomainEvent::OrderCanceled { order_id } => {
                order_id
            }
            DomainEvent::ShipmentCreated { fulfillment_id }
            | DomainEvent::FulfillmentDelivered { fulfillment_id } => fulfillment_id,
            DomainEvent::CustomerCreated { customer_id } => customer_id,
        }
    }
}

/// One occurrence of a domain event as delivered by the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub occurred_at: DateTime<Utc>,
    pub event: DomainEvent,
}

impl EventEnvelope {
    /// Wraps an event that occurred now.
    pub fn new(event: DomainEvent) -> Self {
        Self {
            event_id: EventId::new(),
            occurred_at: Utc::now(),
            event,
        }
    }

    /// Builds an envelope from the bus representation. Returns `None` for
    /// names this service does not subscribe to.
    pub fn from_wire(
        name: &str,
        subject: impl Into<SubjectId>,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        let kind = EventKind::from_wire_name(name)?;
        Some(Self {
            event_id: EventId::new(),
            occurred_at: occurred_at.unwrap_or_else(Utc::now),
            event: DomainEvent::new(kind, subject),
        })
    }

    pub fn with_event_id(mut self, event_id: EventId) -> Self {
        self.event_id = event_id;
        self
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }

    pub fn subject_id(&self) -> &SubjectId {
        self.event.subject_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscribed_name_resolves() {
        for name in EventKind::SUBSCRIBED_NAMES {
            assert!(EventKind::from_wire_name(name).is_some(), "{name}");
        }
    }

    #[test]
    fn test_delivery_alias() {
        assert_eq!(
            EventKind::from_wire_name("delivery.created"),
            Some(EventKind::FulfillmentDelivered)
        );
    }

    #[test]
    fn test_unknown_name_is_not_subscribed() {
        assert_eq!(EventKind::from_wire_name("product.updated"), None);
        assert!(EventEnvelope::from_wire("cart.created", "cart_1", None).is_none());
    }

    #[test]
    fn test_canonical_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_wire_name(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_variant_carries_subject() {
        let event = DomainEvent::new(EventKind::ShipmentCreated, "ful_1");
        assert_eq!(event.kind(), EventKind::ShipmentCreated);
        assert_eq!(event.subject_id().as_str(), "ful_1");
        assert!(matches!(event, DomainEvent::ShipmentCreated { .. }));
    }

    #[test]
    fn test_envelope_from_wire_keeps_timestamp() {
        let at = Utc::now() - chrono::Duration::minutes(5);
        let envelope = EventEnvelope::from_wire("order.placed", "ord_1", Some(at)).unwrap();
        assert_eq!(envelope.occurred_at, at);
        assert_eq!(envelope.kind(), EventKind::OrderPlaced);
        assert_eq!(envelope.subject_id().as_str(), "ord_1");
    }
}
