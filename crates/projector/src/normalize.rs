//! Conversion of raw data-layer rows into domain records.
//!
//! The data layer returns amounts as decimal major units, either as JSON
//! numbers or strings. They are converted to [`Money`] in the order's currency
//! here; a record that carries amounts but no currency is malformed.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::SubjectId;
use domain::{
    Address, CurrencyCode, CustomerRecord, DomainError, FulfillmentOrder, FulfillmentRecord,
    LineItem, Metadata, Money, OrderRecord, PaymentCollection, ShippingMethod, TaxLine,
    TrackingEntry, UpstreamTotals,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::Result;

#[derive(Debug, Deserialize)]
struct WireTaxLine {
    rate: Option<Value>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireLineItem {
    title: Option<String>,
    product_title: Option<String>,
    variant_title: Option<String>,
    thumbnail: Option<String>,
    quantity: Option<Value>,
    unit_price: Option<Value>,
    tax_total: Option<Value>,
    tax_lines: Option<Vec<WireTaxLine>>,
}

#[derive(Debug, Deserialize)]
struct WireShippingMethod {
    name: Option<String>,
    amount: Option<Value>,
    tax_total: Option<Value>,
    tax_lines: Option<Vec<WireTaxLine>>,
}

#[derive(Debug, Deserialize)]
struct WireAddress {
    first_name: Option<String>,
    last_name: Option<String>,
    country_code: Option<String>,
}

impl From<WireAddress> for Address {
    fn from(wire: WireAddress) -> Self {
        Address {
            first_name: wire.first_name,
            last_name: wire.last_name,
            country_code: wire.country_code,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireCustomer {
    id: Option<String>,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
struct WirePaymentCollection {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireOrder {
    id: Option<String>,
    display_id: Option<Value>,
    email: Option<String>,
    currency_code: Option<String>,
    items: Option<Vec<WireLineItem>>,
    shipping_address: Option<WireAddress>,
    shipping_methods: Option<Vec<WireShippingMethod>>,
    customer: Option<WireCustomer>,
    metadata: Option<Metadata>,
    subtotal: Option<Value>,
    shipping_total: Option<Value>,
    tax_total: Option<Value>,
    total: Option<Value>,
    created_at: Option<DateTime<Utc>>,
    payment_collections: Option<Vec<WirePaymentCollection>>,
}

#[derive(Debug, Deserialize)]
struct WireLabel {
    tracking_number: Option<String>,
    tracking_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireFulfillmentOrder {
    email: Option<String>,
    display_id: Option<Value>,
    shipping_address: Option<WireAddress>,
}

#[derive(Debug, Deserialize)]
struct WireFulfillment {
    id: Option<String>,
    labels: Option<Vec<WireLabel>>,
    order: Option<WireFulfillmentOrder>,
}

/// Converts source amounts for one record.
struct Amounts<'a> {
    record: &'a str,
    currency: Option<&'a CurrencyCode>,
}

impl Amounts<'_> {
    /// Converts `value`, or `None` when the source omitted it.
    fn optional(&self, value: Option<&Value>, field: &'static str) -> Result<Option<Money>> {
        let Some(amount) = parse_decimal(value, self.record, field)? else {
            return Ok(None);
        };
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::malformed(self.record, field).into());
        }
        let currency = self
            .currency
            .ok_or_else(|| DomainError::malformed(self.record, "currency_code"))?;
        Ok(Some(Money::from_decimal(amount, currency)?))
    }

    /// Converts `value`, treating an omitted amount as zero.
    fn required(&self, value: Option<&Value>, field: &'static str) -> Result<Money> {
        Ok(self.optional(value, field)?.unwrap_or_default())
    }
}

/// Parses a decimal from a JSON number or numeric string. `null` is `None`.
fn parse_decimal(value: Option<&Value>, record: &str, field: &'static str) -> Result<Option<Decimal>> {
    let text = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => return Err(DomainError::malformed(record, field).into()),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Some)
        .map_err(|_| DomainError::malformed(record, field).into())
}

fn display_id_text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn parse_display_id(value: Option<&Value>, record: &str) -> Result<String> {
    display_id_text(value).ok_or_else(|| DomainError::malformed(record, "display_id").into())
}

fn parse_quantity(value: Option<&Value>, record: &str) -> Result<u32> {
    let quantity = match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    quantity
        .filter(|q| *q >= 1)
        .and_then(|q| u32::try_from(q).ok())
        .ok_or_else(|| DomainError::malformed(record, "items.quantity").into())
}

fn parse_currency(code: Option<&str>) -> Result<Option<CurrencyCode>> {
    match code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => Ok(Some(CurrencyCode::parse(code)?)),
        None => Ok(None),
    }
}

fn tax_lines(wire: Option<Vec<WireTaxLine>>, amounts: &Amounts<'_>) -> Result<Vec<TaxLine>> {
    wire.unwrap_or_default()
        .into_iter()
        .map(|line| {
            Ok(TaxLine {
                rate: parse_decimal(line.rate.as_ref(), amounts.record, "tax_lines.rate")?
                    .unwrap_or(Decimal::ZERO),
                code: line.code,
            })
        })
        .collect()
}

fn line_item(wire: WireLineItem, amounts: &Amounts<'_>) -> Result<LineItem> {
    Ok(LineItem {
        title: wire.title.unwrap_or_default(),
        product_title: wire.product_title,
        variant_title: wire.variant_title,
        thumbnail: wire.thumbnail,
        quantity: parse_quantity(wire.quantity.as_ref(), amounts.record)?,
        unit_price: amounts.required(wire.unit_price.as_ref(), "items.unit_price")?,
        tax_total: amounts.required(wire.tax_total.as_ref(), "items.tax_total")?,
        tax_lines: tax_lines(wire.tax_lines, amounts)?,
    })
}

fn shipping_method(wire: WireShippingMethod, amounts: &Amounts<'_>) -> Result<ShippingMethod> {
    Ok(ShippingMethod {
        name: wire.name,
        amount: amounts.required(wire.amount.as_ref(), "shipping_methods.amount")?,
        tax_total: amounts.required(wire.tax_total.as_ref(), "shipping_methods.tax_total")?,
        tax_lines: tax_lines(wire.tax_lines, amounts)?,
    })
}

fn customer(wire: WireCustomer) -> Option<CustomerRecord> {
    let id = wire.id.filter(|id| !id.trim().is_empty())?;
    Some(CustomerRecord {
        id: SubjectId::new(id),
        email: wire.email,
        first_name: wire.first_name,
        last_name: wire.last_name,
        metadata: wire.metadata.unwrap_or_default(),
    })
}

/// Reports whether an order row carries a settled payment collection,
/// reading only `payment_collections[].status`.
pub fn is_paid_row(row: &Value) -> bool {
    let Some(collections) = row.get("payment_collections") else {
        return false;
    };
    Vec::<WirePaymentCollection>::deserialize(collections)
        .map(|collections| {
            collections
                .into_iter()
                .filter_map(|p| p.status)
                .any(|status| PaymentCollection { status }.is_settled())
        })
        .unwrap_or(false)
}

/// Normalizes an order row. `requested` fills in the id when the row omits it.
pub fn order(row: Value, requested: Option<&SubjectId>) -> Result<OrderRecord> {
    let wire: WireOrder = serde_json::from_value(row)?;
    let id = wire
        .id
        .map(SubjectId::new)
        .or_else(|| requested.cloned())
        .unwrap_or_else(|| {
            SubjectId::new(display_id_text(wire.display_id.as_ref()).unwrap_or_default())
        });
    let record = format!("order {id}");

    let currency_code = parse_currency(wire.currency_code.as_deref())?;
    let amounts = Amounts {
        record: &record,
        currency: currency_code.as_ref(),
    };

    let items = wire
        .items
        .unwrap_or_default()
        .into_iter()
        .map(|item| line_item(item, &amounts))
        .collect::<Result<Vec<_>>>()?;
    let shipping_methods = wire
        .shipping_methods
        .unwrap_or_default()
        .into_iter()
        .map(|method| shipping_method(method, &amounts))
        .collect::<Result<Vec<_>>>()?;
    let totals = UpstreamTotals {
        subtotal: amounts.optional(wire.subtotal.as_ref(), "subtotal")?,
        shipping_total: amounts.optional(wire.shipping_total.as_ref(), "shipping_total")?,
        tax_total: amounts.optional(wire.tax_total.as_ref(), "tax_total")?,
        total: amounts.optional(wire.total.as_ref(), "total")?,
    };

    Ok(OrderRecord {
        display_id: parse_display_id(wire.display_id.as_ref(), &record)?,
        id,
        email: wire.email,
        currency_code,
        items,
        shipping_address: wire.shipping_address.map(Address::from),
        shipping_methods,
        customer: wire.customer.and_then(customer),
        metadata: wire.metadata.unwrap_or_default(),
        totals,
        created_at: wire.created_at,
        payment_collections: wire
            .payment_collections
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.status.map(|status| PaymentCollection { status }))
            .collect(),
    })
}

/// Normalizes a fulfillment row. A fulfillment with no parent order has
/// nothing to notify about and is reported as not found.
pub fn fulfillment(row: Value, requested: &SubjectId) -> Result<Option<FulfillmentRecord>> {
    let wire: WireFulfillment = serde_json::from_value(row)?;
    let id = wire.id.map(SubjectId::new).unwrap_or_else(|| requested.clone());
    let Some(order) = wire.order else {
        tracing::info!(fulfillment_id = %id, "fulfillment has no parent order");
        return Ok(None);
    };
    let record = format!("fulfillment {id}");

    Ok(Some(FulfillmentRecord {
        order: FulfillmentOrder {
            email: order.email,
            display_id: parse_display_id(order.display_id.as_ref(), &record)?,
            shipping_address: order.shipping_address.map(Address::from),
        },
        tracking: wire
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|label| TrackingEntry {
                number: label.tracking_number,
                url: label.tracking_url,
            })
            .collect(),
        id,
    }))
}

/// Normalizes a customer row.
pub fn customer_record(row: Value, requested: &SubjectId) -> Result<CustomerRecord> {
    let wire: WireCustomer = serde_json::from_value(row)?;
    Ok(CustomerRecord {
        id: wire.id.map(SubjectId::new).unwrap_or_else(|| requested.clone()),
        email: wire.email,
        first_name: wire.first_name,
        last_name: wire.last_name,
        metadata: wire.metadata.unwrap_or_default(),
    })
}
