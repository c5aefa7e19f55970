//! Field-path allow-lists per event kind.
//!
//! Each handler reads exactly the paths listed here. Paths use dot notation
//! through relations (`items.unit_price`); a path ending in `*` selects every
//! scalar field at that level.

use domain::EventKind;
use serde::{Deserialize, Serialize};

/// Entity types the data layer can be queried for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Order,
    Fulfillment,
    Customer,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Order => "order",
            Entity::Fulfillment => "fulfillment",
            Entity::Customer => "customer",
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The entity and field paths one read is allowed to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldContract {
    pub entity: Entity,
    pub fields: &'static [&'static str],
}

impl FieldContract {
    /// The contract used by the handler for `kind`.
    pub fn for_kind(kind: EventKind) -> &'static FieldContract {
        match kind {
            EventKind::OrderPlaced => &ORDER_PLACED,
            EventKind::ShipmentCreated => &SHIPMENT_CREATED,
            EventKind::FulfillmentDelivered => &FULFILLMENT_DELIVERED,
            EventKind::OrderCanceled => &ORDER_CANCELED,
            EventKind::CustomerCreated => &CUSTOMER_CREATED,
        }
    }

    /// True when `path` (or a parent relation of it) is part of the contract.
    pub fn allows(&self, path: &str) -> bool {
        self.fields.iter().any(|f| {
            *f == path
                || path
                    .strip_prefix(*f)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

pub const ORDER_PLACED: FieldContract = FieldContract {
    entity: Entity::Order,
    fields: &[
        "id",
        "display_id",
        "email",
        "currency_code",
        "total",
        "metadata",
        "items.title",
        "items.product_title",
        "items.variant_title",
        "items.thumbnail",
        "items.quantity",
        "items.unit_price",
        "items.tax_total",
        "items.tax_lines.rate",
        "items.tax_lines.code",
        "shipping_address.first_name",
        "shipping_address.last_name",
        "shipping_methods.name",
        "shipping_methods.amount",
        "shipping_methods.tax_total",
        "shipping_methods.tax_lines.rate",
        "customer.id",
        "customer.email",
        "customer.first_name",
        "customer.last_name",
    ],
};

pub const ORDER_CANCELED: FieldContract = FieldContract {
    entity: Entity::Order,
    fields: &["id", "display_id", "email", "shipping_address.first_name"],
};

pub const SHIPMENT_CREATED: FieldContract = FieldContract {
    entity: Entity::Fulfillment,
    fields: &[
        "id",
        "labels.tracking_number",
        "labels.tracking_url",
        "order.email",
        "order.display_id",
    ],
};

pub const FULFILLMENT_DELIVERED: FieldContract = FieldContract {
    entity: Entity::Fulfillment,
    fields: &[
        "id",
        "order.email",
        "order.display_id",
        "order.shipping_address.first_name",
    ],
};

pub const CUSTOMER_CREATED: FieldContract = FieldContract {
    entity: Entity::Customer,
    fields: &["id", "email", "first_name", "last_name"],
};

/// Read used by the tax export; unfiltered, paid-status filtering happens in memory.
pub const TAX_EXPORT: FieldContract = FieldContract {
    entity: Entity::Order,
    fields: &[
        "id",
        "display_id",
        "created_at",
        "currency_code",
        "email",
        "shipping_address.country_code",
        "payment_collections.status",
        "items.title",
        "items.quantity",
        "items.unit_price",
        "items.tax_total",
        "items.tax_lines.rate",
        "shipping_methods.name",
        "shipping_methods.amount",
        "shipping_methods.tax_total",
        "shipping_methods.tax_lines.rate",
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_a_contract_with_id() {
        for kind in EventKind::ALL {
            let contract = FieldContract::for_kind(kind);
            assert!(contract.fields.contains(&"id"), "{kind}");
        }
    }

    #[test]
    fn test_contract_entities() {
        assert_eq!(FieldContract::for_kind(EventKind::OrderPlaced).entity, Entity::Order);
        assert_eq!(FieldContract::for_kind(EventKind::OrderCanceled).entity, Entity::Order);
        assert_eq!(
            FieldContract::for_kind(EventKind::ShipmentCreated).entity,
            Entity::Fulfillment
        );
        assert_eq!(
            FieldContract::for_kind(EventKind::FulfillmentDelivered).entity,
            Entity::Fulfillment
        );
        assert_eq!(
            FieldContract::for_kind(EventKind::CustomerCreated).entity,
            Entity::Customer
        );
    }

    #[test]
    fn test_contracts_never_request_wildcards() {
        for contract in [
            &ORDER_PLACED,
            &ORDER_CANCELED,
            &SHIPMENT_CREATED,
            &FULFILLMENT_DELIVERED,
            &CUSTOMER_CREATED,
            &TAX_EXPORT,
        ] {
            assert!(contract.fields.iter().all(|f| !f.contains('*')));
        }
    }

    #[test]
    fn test_cancellation_reads_no_amounts() {
        assert!(!ORDER_CANCELED.allows("items.unit_price"));
        assert!(!ORDER_CANCELED.allows("currency_code"));
        assert!(ORDER_CANCELED.allows("shipping_address.first_name"));
    }

    #[test]
    fn test_allows_matches_whole_segments() {
        assert!(ORDER_PLACED.allows("metadata.newsletter_subscribed"));
        assert!(!ORDER_PLACED.allows("email_verified"));
    }
}
