//! Normalized, read-only views of the commerce records the handlers work on.
//!
//! Records are produced by the projector for one handler invocation and are
//! never mutated afterwards. Everything the upstream platform may omit is an
//! `Option`; callers decide whether a gap can be defaulted.

use chrono::{DateTime, Utc};
use common::SubjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::money::{CurrencyCode, Money};

/// Free-form key/value metadata attached to orders and customers.
pub type Metadata = Map<String, Value>;

/// Placeholder first name the storefront assigns to guest customers.
pub const GUEST_FIRST_NAME: &str = "Guest";

/// Variant title the catalog assigns to single-variant products.
pub const DEFAULT_VARIANT_TITLE: &str = "Default Variant";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxLine {
    /// Percentage rate, e.g. `19` for 19 %.
    pub rate: Decimal,
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub title: String,
    pub product_title: Option<String>,
    pub variant_title: Option<String>,
    pub thumbnail: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub tax_lines: Vec<TaxLine>,
    pub tax_total: Money,
}

impl LineItem {
    /// `unit_price × quantity`.
    pub fn line_subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    /// Title shown to customers: the product title when known.
    pub fn display_title(&self) -> &str {
        self.product_title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.title)
    }

    /// Variant title, hidden for the catalog's default variant.
    pub fn display_variant(&self) -> Option<&str> {
        self.variant_title
            .as_deref()
            .filter(|v| !v.is_empty() && *v != DEFAULT_VARIANT_TITLE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub name: Option<String>,
    pub amount: Money,
    pub tax_lines: Vec<TaxLine>,
    pub tax_total: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country_code: Option<String>,
}

impl Address {
    /// First name, ignoring empty strings.
    pub fn first_name(&self) -> Option<&str> {
        non_empty(self.first_name.as_deref())
    }

    pub fn last_name(&self) -> Option<&str> {
        non_empty(self.last_name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: SubjectId,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub metadata: Metadata,
}

impl CustomerRecord {
    pub fn first_name(&self) -> Option<&str> {
        non_empty(self.first_name.as_deref())
    }

    /// True when the first name is absent or still the guest placeholder.
    pub fn has_placeholder_name(&self) -> bool {
        self.first_name()
            .is_none_or(|name| name == GUEST_FIRST_NAME)
    }
}

/// Aggregate totals as reported by the upstream platform. Any of them may be
/// missing depending on the schema version that produced the record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamTotals {
    pub subtotal: Option<Money>,
    pub shipping_total: Option<Money>,
    pub tax_total: Option<Money>,
    pub total: Option<Money>,
}

/// Payment collection statuses that count as paid.
pub const SETTLED_PAYMENT_STATUSES: [&str; 2] = ["captured", "completed"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCollection {
    pub status: String,
}

impl PaymentCollection {
    pub fn is_settled(&self) -> bool {
        SETTLED_PAYMENT_STATUSES.contains(&self.status.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: SubjectId,
    pub display_id: String,
    pub email: Option<String>,
    pub currency_code: Option<CurrencyCode>,
    pub items: Vec<LineItem>,
    pub shipping_address: Option<Address>,
    pub shipping_methods: Vec<ShippingMethod>,
    pub customer: Option<CustomerRecord>,
    pub metadata: Metadata,
    pub totals: UpstreamTotals,
    pub created_at: Option<DateTime<Utc>>,
    pub payment_collections: Vec<PaymentCollection>,
}

impl OrderRecord {
    /// Recipient address, ignoring empty strings.
    pub fn email(&self) -> Option<&str> {
        non_empty(self.email.as_deref())
    }

    pub fn shipping_first_name(&self) -> Option<&str> {
        self.shipping_address.as_ref().and_then(Address::first_name)
    }

    /// True when the buyer ticked the newsletter box at checkout. Any
    /// non-empty string counts except the spelled-out negatives
    /// ("false", "0", "no", "off", in any case).
    pub fn newsletter_opt_in(&self) -> bool {
        match self.metadata.get("newsletter_subscribed") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => {
                let s = s.trim();
                !s.is_empty()
                    && !["false", "0", "no", "off"]
                        .iter()
                        .any(|negative| s.eq_ignore_ascii_case(negative))
            }
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        }
    }

    /// True when any payment collection reached a settled status.
    pub fn is_paid(&self) -> bool {
        self.payment_collections.iter().any(PaymentCollection::is_settled)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub number: Option<String>,
    pub url: Option<String>,
}

/// The slice of the parent order a fulfillment notification needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentOrder {
    pub email: Option<String>,
    pub display_id: String,
    pub shipping_address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentRecord {
    pub id: SubjectId,
    pub order: FulfillmentOrder,
    pub tracking: Vec<TrackingEntry>,
}

impl FulfillmentRecord {
    pub fn email(&self) -> Option<&str> {
        non_empty(self.order.email.as_deref())
    }

    pub fn shipping_first_name(&self) -> Option<&str> {
        self.order
            .shipping_address
            .as_ref()
            .and_then(Address::first_name)
    }

    /// The first tracking entry; later labels are not shown to customers.
    pub fn primary_tracking(&self) -> Option<&TrackingEntry> {
        self.tracking.first()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
