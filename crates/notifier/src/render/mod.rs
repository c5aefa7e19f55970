//! Notification renderer.
//!
//! A [`Notification`] holds exactly what one email needs and is built from a
//! record with a fallible constructor: a record without a recipient (or, for
//! the order confirmation, without a currency) is malformed and no
//! notification exists for it. Once built, [`render`] is total and pure.

pub mod layout;
mod templates;

use domain::{
    CurrencyCode, CustomerRecord, DerivedTotals, DomainError, EventKind, FulfillmentRecord,
    Locale, Money, OrderRecord,
};
use serde::{Deserialize, Serialize};

/// Greeting name used when the shipping address has no first name.
pub const DEFAULT_GREETING_NAME: &str = "there";
/// Shown when a shipment has no tracking number.
pub const DEFAULT_TRACKING_NUMBER: &str = "N/A";
/// Link target used when a shipment has no tracking url.
pub const PLACEHOLDER_LINK: &str = "#";
/// Greeting name for welcome emails to customers without a first name.
pub const DEFAULT_CUSTOMER_NAME: &str = "Customer";

/// A rendered email body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub subject: String,
    pub html: String,
}

/// Store-level presentation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    pub store_name: String,
    /// Target of the "Visit Store" link.
    pub store_url: String,
    pub locale: Locale,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            store_name: "Our Store".to_string(),
            store_url: PLACEHOLDER_LINK.to_string(),
            locale: Locale::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationLine {
    pub title: String,
    pub variant: Option<String>,
    pub thumbnail: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    pub recipient: String,
    pub display_id: String,
    pub first_name: Option<String>,
    pub currency: CurrencyCode,
    pub lines: Vec<ConfirmationLine>,
    pub totals: DerivedTotals,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentTracking {
    pub recipient: String,
    pub display_id: String,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryConfirmation {
    pub recipient: String,
    pub display_id: String,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancellation {
    pub recipient: String,
    pub display_id: String,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Welcome {
    pub recipient: String,
    pub first_name: Option<String>,
}

/// One email to send, by event kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    OrderConfirmation(OrderConfirmation),
    ShipmentTracking(ShipmentTracking),
    DeliveryConfirmation(DeliveryConfirmation),
    Cancellation(Cancellation),
    Welcome(Welcome),
}

fn recipient(email: Option<&str>, record: &str) -> Result<String, DomainError> {
    email
        .map(str::to_string)
        .ok_or_else(|| DomainError::malformed(record, "email"))
}

impl Notification {
    pub fn order_confirmation(
        order: &OrderRecord,
        totals: DerivedTotals,
    ) -> Result<Self, DomainError> {
        let record = format!("order {}", order.id);
        let currency = order
            .currency_code
            .clone()
            .ok_or_else(|| DomainError::malformed(&record, "currency_code"))?;

        Ok(Notification::OrderConfirmation(OrderConfirmation {
            recipient: recipient(order.email(), &record)?,
            display_id: order.display_id.clone(),
            first_name: order.shipping_first_name().map(str::to_string),
            currency,
            lines: order
                .items
                .iter()
                .map(|item| ConfirmationLine {
                    title: item.display_title().to_string(),
                    variant: item.display_variant().map(str::to_string),
                    thumbnail: item.thumbnail.clone().filter(|t| !t.trim().is_empty()),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
            totals,
        }))
    }

    pub fn shipment_tracking(fulfillment: &FulfillmentRecord) -> Result<Self, DomainError> {
        let record = format!("fulfillment {}", fulfillment.id);
        let tracking = fulfillment.primary_tracking();
        Ok(Notification::ShipmentTracking(ShipmentTracking {
            recipient: recipient(fulfillment.email(), &record)?,
            display_id: fulfillment.order.display_id.clone(),
            tracking_number: tracking
                .and_then(|t| t.number.clone())
                .filter(|n| !n.trim().is_empty()),
            tracking_url: tracking
                .and_then(|t| t.url.clone())
                .filter(|u| !u.trim().is_empty()),
        }))
    }

    pub fn delivery_confirmation(fulfillment: &FulfillmentRecord) -> Result<Self, DomainError> {
        let record = format!("fulfillment {}", fulfillment.id);
        Ok(Notification::DeliveryConfirmation(DeliveryConfirmation {
            recipient: recipient(fulfillment.email(), &record)?,
            display_id: fulfillment.order.display_id.clone(),
            first_name: fulfillment.shipping_first_name().map(str::to_string),
        }))
    }

    pub fn cancellation(order: &OrderRecord) -> Result<Self, DomainError> {
        let record = format!("order {}", order.id);
        Ok(Notification::Cancellation(Cancellation {
            recipient: recipient(order.email(), &record)?,
            display_id: order.display_id.clone(),
            first_name: order.shipping_first_name().map(str::to_string),
        }))
    }

    pub fn welcome(customer: &CustomerRecord) -> Result<Self, DomainError> {
        let record = format!("customer {}", customer.id);
        let email = customer
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());
        Ok(Notification::Welcome(Welcome {
            recipient: recipient(email, &record)?,
            first_name: customer.first_name().map(str::to_string),
        }))
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Notification::OrderConfirmation(_) => EventKind::OrderPlaced,
            Notification::ShipmentTracking(_) => EventKind::ShipmentCreated,
            Notification::DeliveryConfirmation(_) => EventKind::FulfillmentDelivered,
            Notification::Cancellation(_) => EventKind::OrderCanceled,
            Notification::Welcome(_) => EventKind::CustomerCreated,
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Notification::OrderConfirmation(n) => &n.recipient,
            Notification::ShipmentTracking(n) => &n.recipient,
            Notification::DeliveryConfirmation(n) => &n.recipient,
            Notification::Cancellation(n) => &n.recipient,
            Notification::Welcome(n) => &n.recipient,
        }
    }
}

/// Renders `notification`. Pure: the same input always yields the same document.
pub fn render(notification: &Notification, ctx: &RenderContext) -> Document {
    match notification {
        Notification::OrderConfirmation(n) => templates::order_confirmation(n, ctx),
        Notification::ShipmentTracking(n) => templates::shipment_tracking(n, ctx),
        Notification::DeliveryConfirmation(n) => templates::delivery_confirmation(n, ctx),
        Notification::Cancellation(n) => templates::cancellation(n, ctx),
        Notification::Welcome(n) => templates::welcome(n, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Address, FulfillmentOrder, Metadata, TrackingEntry, UpstreamTotals, derive_totals};

    fn order(email: Option<&str>, currency: Option<&str>) -> OrderRecord {
        OrderRecord {
            id: "ord_1".into(),
            display_id: "1001".into(),
            email: email.map(String::from),
            currency_code: currency.map(|c| CurrencyCode::parse(c).unwrap()),
            items: vec![],
            shipping_address: None,
            shipping_methods: vec![],
            customer: None,
            metadata: Metadata::new(),
            totals: UpstreamTotals::default(),
            created_at: None,
            payment_collections: vec![],
        }
    }

    fn fulfillment(tracking: Vec<TrackingEntry>) -> FulfillmentRecord {
        FulfillmentRecord {
            id: "ful_1".into(),
            order: FulfillmentOrder {
                email: Some("a@b.com".into()),
                display_id: "1001".into(),
                shipping_address: Some(Address {
                    first_name: Some("Sam".into()),
                    ..Address::default()
                }),
            },
            tracking,
        }
    }

    #[test]
    fn test_confirmation_requires_currency() {
        let o = order(Some("a@b.com"), None);
        let err = Notification::order_confirmation(&o, derive_totals(&o)).unwrap_err();
        assert!(matches!(err, DomainError::MalformedRecord { field: "currency_code", .. }));
    }

    #[test]
    fn test_missing_recipient_is_malformed() {
        let o = order(Some("  "), Some("eur"));
        let err = Notification::cancellation(&o).unwrap_err();
        assert!(matches!(err, DomainError::MalformedRecord { field: "email", .. }));
    }

    #[test]
    fn test_blank_tracking_values_are_treated_as_missing() {
        let n = Notification::shipment_tracking(&fulfillment(vec![TrackingEntry {
            number: Some(" ".into()),
            url: None,
        }]))
        .unwrap();
        match n {
            Notification::ShipmentTracking(s) => {
                assert_eq!(s.tracking_number, None);
                assert_eq!(s.tracking_url, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_kind_and_recipient() {
        let n = Notification::delivery_confirmation(&fulfillment(vec![])).unwrap();
        assert_eq!(n.kind(), EventKind::FulfillmentDelivered);
        assert_eq!(n.recipient(), "a@b.com");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let o = order(Some("a@b.com"), Some("eur"));
        let n = Notification::order_confirmation(&o, derive_totals(&o)).unwrap();
        let ctx = RenderContext::default();
        assert_eq!(render(&n, &ctx), render(&n.clone(), &ctx));
    }
}
