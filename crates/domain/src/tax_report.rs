//! Tax export: one CSV row per line item and shipping method of every paid order.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::derivation::{LineKind, derive_lines};
use crate::error::{DomainError, Result};
use crate::money::{CurrencyCode, Money, format_plain};
use crate::records::OrderRecord;

/// Column headers, in output order.
pub const CSV_HEADER: [&str; 12] = [
    "Order ID",
    "Date",
    "Customer Email",
    "Country",
    "Currency",
    "Type",
    "Description",
    "Quantity",
    "Unit Price",
    "Tax Rate",
    "Tax Amount",
    "Total",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxRow {
    pub order_display_id: String,
    pub date: NaiveDate,
    pub email: String,
    pub country: String,
    pub currency: CurrencyCode,
    pub kind: LineKind,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub tax_rate: Decimal,
    pub tax_amount: Money,
    pub total: Money,
}

impl TaxRow {
    fn to_csv_line(&self) -> String {
        [
            self.order_display_id.clone(),
            self.date.format("%Y-%m-%d").to_string(),
            self.email.clone(),
            self.country.clone(),
            self.currency.to_string(),
            self.kind.as_str().to_string(),
            quote(&self.description),
            self.quantity.to_string(),
            format_plain(self.unit_price, &self.currency),
            self.tax_rate.normalize().to_string(),
            format_plain(self.tax_amount, &self.currency),
            format_plain(self.total, &self.currency),
        ]
        .join(",")
    }
}

/// Builds rows for every paid order, in input order.
///
/// Unpaid orders are skipped. A paid order without a creation date or
/// currency fails the whole export so no partial report is produced.
pub fn build_rows(orders: &[OrderRecord]) -> Result<Vec<TaxRow>> {
    let mut rows = Vec::new();

    for order in orders.iter().filter(|o| o.is_paid()) {
        let record = format!("order {}", order.id);
        let date = order
            .created_at
            .ok_or_else(|| DomainError::malformed(&record, "created_at"))?
            .date_naive();
        let currency = order
            .currency_code
            .clone()
            .ok_or_else(|| DomainError::malformed(&record, "currency_code"))?;
        let email = order.email().unwrap_or("Guest").to_string();
        let country = order
            .shipping_address
            .as_ref()
            .and_then(|a| a.country_code.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_ascii_uppercase)
            .unwrap_or_else(|| "N/A".to_string());

        for line in derive_lines(order) {
            rows.push(TaxRow {
                order_display_id: order.display_id.clone(),
                date,
                email: email.clone(),
                country: country.clone(),
                currency: currency.clone(),
                kind: line.kind,
                description: line.description,
                quantity: line.quantity,
                unit_price: line.unit_price,
                tax_rate: line.tax_rate,
                tax_amount: line.tax_amount,
                total: line.line_total,
            });
        }
    }

    Ok(rows)
}

/// Serializes rows, header first, joined with `\n`.
pub fn render_csv(rows: &[TaxRow]) -> String {
    std::iter::once(CSV_HEADER.join(","))
        .chain(rows.iter().map(TaxRow::to_csv_line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds and serializes the report in one step.
pub fn export_csv(orders: &[OrderRecord]) -> Result<String> {
    Ok(render_csv(&build_rows(orders)?))
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{
        Address, LineItem, Metadata, PaymentCollection, ShippingMethod, TaxLine, UpstreamTotals,
    };
    use chrono::{TimeZone, Utc};

    fn paid_order(status: &str) -> OrderRecord {
        OrderRecord {
            id: "ord_1".into(),
            display_id: "1001".into(),
            email: Some("a@b.com".into()),
            currency_code: Some(CurrencyCode::parse("eur").unwrap()),
            items: vec![LineItem {
                title: "Tee \"Classic\"".into(),
                product_title: None,
                variant_title: None,
                thumbnail: None,
                quantity: 2,
                unit_price: Money::from_minor(1000),
                tax_lines: vec![TaxLine { rate: Decimal::new(19, 0), code: None }],
                tax_total: Money::from_minor(380),
            }],
            shipping_address: Some(Address {
                country_code: Some("de".into()),
                ..Address::default()
            }),
            shipping_methods: vec![ShippingMethod {
                name: Some("DHL".into()),
                amount: Money::from_minor(500),
                tax_lines: vec![],
                tax_total: Money::zero(),
            }],
            customer: None,
            metadata: Metadata::new(),
            totals: UpstreamTotals::default(),
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, 9, 18, 30, 0).unwrap()),
            payment_collections: vec![PaymentCollection { status: status.into() }],
        }
    }

    #[test]
    fn test_pending_orders_are_excluded() {
        let rows = build_rows(&[paid_order("pending")]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_captured_and_completed_orders_are_included() {
        assert_eq!(build_rows(&[paid_order("captured")]).unwrap().len(), 2);
        assert_eq!(build_rows(&[paid_order("completed")]).unwrap().len(), 2);
    }

    #[test]
    fn test_csv_rows_format() {
        let csv = export_csv(&[paid_order("captured")]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "Order ID,Date,Customer Email,Country,Currency,Type,Description,Quantity,Unit Price,Tax Rate,Tax Amount,Total"
        );
        assert_eq!(
            lines[1],
            "1001,2024-03-09,a@b.com,DE,EUR,Item,\"Tee \"\"Classic\"\"\",2,10.00,19,3.80,23.80"
        );
        assert_eq!(lines[2], "1001,2024-03-09,a@b.com,DE,EUR,Shipping,\"DHL\",1,5.00,0,0.00,5.00");
    }

    #[test]
    fn test_guest_email_and_unknown_country_defaults() {
        let mut order = paid_order("captured");
        order.email = None;
        order.shipping_address = None;
        let rows = build_rows(&[order]).unwrap();
        assert_eq!(rows[0].email, "Guest");
        assert_eq!(rows[0].country, "N/A");
    }

    #[test]
    fn test_paid_order_without_date_fails_whole_export() {
        let mut broken = paid_order("captured");
        broken.created_at = None;
        let err = export_csv(&[paid_order("captured"), broken]).unwrap_err();
        assert!(matches!(err, DomainError::MalformedRecord { field: "created_at", .. }));
    }

    #[test]
    fn test_empty_export_is_header_only() {
        assert_eq!(export_csv(&[]).unwrap(), CSV_HEADER.join(","));
    }
}
