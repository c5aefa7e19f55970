//! Domain layer for the order notification dispatcher.
//!
//! This crate provides:
//! - Normalized commerce records (orders, fulfillments, customers)
//! - The subscribed domain events as a tagged sum type
//! - `Money` in minor units and the locale-aware formatter
//! - The derivation engine for totals and per-line tax
//! - The tax export CSV builder

pub mod derivation;
pub mod error;
pub mod events;
pub mod money;
pub mod records;
pub mod tax_report;

pub use derivation::{
    DerivedTotals, LineDerivation, LineKind, TotalSource, derive_lines, derive_totals,
};
pub use error::{DomainError, Result};
pub use events::{DomainEvent, EventEnvelope, EventKind};
pub use money::{CurrencyCode, Locale, Money, format_money, format_plain};
pub use records::{
    Address, CustomerRecord, FulfillmentOrder, FulfillmentRecord, LineItem, Metadata,
    OrderRecord, PaymentCollection, ShippingMethod, TaxLine, TrackingEntry, UpstreamTotals,
};
pub use tax_report::{TaxRow, build_rows, export_csv, render_csv};
