//! Totals and per-line tax derivation.
//!
//! Totals are always recomputed from line items and shipping methods. The
//! upstream `total` is only used when it agrees with the recomputed value
//! within [`CONSISTENCY_EPSILON`] minor units.
//!
//! Lines with several tax lines report the first one's rate as their
//! representative rate; the tax amount is the line's full `tax_total`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::records::{LineItem, OrderRecord, ShippingMethod, TaxLine};

/// Largest tolerated gap, in minor units, between upstream and recomputed totals.
pub const CONSISTENCY_EPSILON: u64 = 1;

/// Where the grand total came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TotalSource {
    /// Upstream `total` was present and consistent.
    Upstream,
    /// Upstream `total` was absent or disagreed; the sum of parts is used.
    Recomputed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedTotals {
    pub subtotal: Money,
    pub shipping_amount: Money,
    pub tax_amount: Money,
    pub grand_total: Money,
    pub total_source: TotalSource,
}

/// `Σ(unit_price × quantity)`.
pub fn subtotal(items: &[LineItem]) -> Money {
    items.iter().map(LineItem::line_subtotal).sum()
}

/// `Σ(amount)`, zero when there are no shipping methods.
pub fn shipping_amount(methods: &[ShippingMethod]) -> Money {
    methods.iter().map(|m| m.amount).sum()
}

/// Item tax plus shipping tax.
pub fn tax_amount(items: &[LineItem], methods: &[ShippingMethod]) -> Money {
    let item_tax: Money = items.iter().map(|i| i.tax_total).sum();
    let shipping_tax: Money = methods.iter().map(|m| m.tax_total).sum();
    item_tax + shipping_tax
}

/// Rate of the first tax line, or zero for untaxed lines.
pub fn representative_rate(tax_lines: &[TaxLine]) -> Decimal {
    tax_lines.first().map(|t| t.rate).unwrap_or(Decimal::ZERO)
}

/// Picks the grand total: upstream when consistent, otherwise recomputed.
pub fn reconcile_total(recomputed: Money, upstream: Option<Money>) -> (Money, TotalSource) {
    match upstream {
        Some(total) if total.distance(recomputed) <= CONSISTENCY_EPSILON => {
            (total, TotalSource::Upstream)
        }
        Some(total) => {
            tracing::warn!(
                upstream = total.minor(),
                recomputed = recomputed.minor(),
                "upstream order total disagrees with line items, using recomputed total"
            );
            (recomputed, TotalSource::Recomputed)
        }
        None => (recomputed, TotalSource::Recomputed),
    }
}

/// Derives the monetary summary for an order.
pub fn derive_totals(order: &OrderRecord) -> DerivedTotals {
    let subtotal = subtotal(&order.items);
    let shipping_amount = shipping_amount(&order.shipping_methods);
    let tax_amount = tax_amount(&order.items, &order.shipping_methods);
    let (grand_total, total_source) =
        reconcile_total(subtotal + shipping_amount + tax_amount, order.totals.total);

    DerivedTotals {
        subtotal,
        shipping_amount,
        tax_amount,
        grand_total,
        total_source,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    Item,
    Shipping,
}

impl LineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineKind::Item => "Item",
            LineKind::Shipping => "Shipping",
        }
    }
}

/// Tax view of one item or shipping method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDerivation {
    pub kind: LineKind,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub tax_rate: Decimal,
    pub tax_amount: Money,
    /// `unit_price × quantity + tax_amount`.
    pub line_total: Money,
}

impl LineDerivation {
    fn from_item(item: &LineItem) -> Self {
        Self {
            kind: LineKind::Item,
            description: item.title.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            tax_rate: representative_rate(&item.tax_lines),
            tax_amount: item.tax_total,
            line_total: item.line_subtotal() + item.tax_total,
        }
    }

    fn from_shipping(method: &ShippingMethod) -> Self {
        Self {
            kind: LineKind::Shipping,
            description: method
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Shipping".to_string()),
            quantity: 1,
            unit_price: method.amount,
            tax_rate: representative_rate(&method.tax_lines),
            tax_amount: method.tax_total,
            line_total: method.amount + method.tax_total,
        }
    }
}

/// Per-line derivations: items first, then shipping methods, each in input order.
pub fn derive_lines(order: &OrderRecord) -> Vec<LineDerivation> {
    order
        .items
        .iter()
        .map(LineDerivation::from_item)
        .chain(order.shipping_methods.iter().map(LineDerivation::from_shipping))
        .collect()
}
