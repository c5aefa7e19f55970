//! Money in minor units, currency codes and locale-aware formatting.
//!
//! Amounts are carried as integer minor units everywhere; decimals only
//! appear when a value is formatted for display or export.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// A monetary amount in the minor units of its currency (e.g. 1000 = 10.00 EUR).
///
/// `Money` does not carry its currency; the owning record does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from minor units.
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns zero.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Converts a decimal amount in major units into minor units of `currency`.
    ///
    /// Sub-minor fractions are rounded half away from zero.
    pub fn from_decimal(amount: Decimal, currency: &CurrencyCode) -> Result<Self> {
        let factor = Decimal::from(10i64.pow(currency.minor_digits()));
        amount
            .checked_mul(factor)
            .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|scaled| scaled.to_i64())
            .map(Self)
            .ok_or_else(|| DomainError::AmountOutOfRange(format!("{amount} {currency}")))
    }

    /// Returns the amount in minor units.
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the amount in major units of `currency`.
    pub fn to_decimal(&self, currency: &CurrencyCode) -> Decimal {
        Decimal::new(self.0, currency.minor_digits())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity, saturating instead of overflowing.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(quantity)))
    }

    /// Absolute distance to `other` in minor units.
    pub fn distance(&self, other: Money) -> u64 {
        self.0.abs_diff(other.0)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Currencies whose minor unit has no decimal digits.
const ZERO_DIGIT_CURRENCIES: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "ISK", "JPY", "KMF", "KRW", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];

/// Currencies whose minor unit has three decimal digits.
const THREE_DIGIT_CURRENCIES: &[&str] = &["BHD", "IQD", "JOD", "KWD", "LYD", "OMR", "TND"];

/// An upper-case ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parses a currency code, trimming and upper-casing it.
    ///
    /// Anything other than three ASCII letters is rejected.
    pub fn parse(code: &str) -> Result<Self> {
        let normalized = normalize_code(code);
        if normalized.len() == 3 && normalized.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(normalized))
        } else {
            Err(DomainError::malformed(code, "currency_code"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of decimal digits in the minor unit.
    pub fn minor_digits(&self) -> u32 {
        minor_digits(&self.0)
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn minor_digits(normalized: &str) -> u32 {
    if ZERO_DIGIT_CURRENCIES.contains(&normalized) {
        0
    } else if THREE_DIGIT_CURRENCIES.contains(&normalized) {
        3
    } else {
        2
    }
}

fn currency_symbol(normalized: &str) -> &str {
    match normalized {
        "EUR" => "€",
        "USD" => "$",
        "GBP" => "£",
        "JPY" => "¥",
        other => other,
    }
}

/// Number formatting conventions used when rendering amounts for people.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    /// `1.234,56 €`
    #[default]
    #[serde(rename = "de-DE")]
    DeDe,
    /// `€1,234.56`
    #[serde(rename = "en-US")]
    EnUs,
}

impl Locale {
    fn separators(&self) -> (char, char) {
        match self {
            Locale::DeDe => ('.', ','),
            Locale::EnUs => (',', '.'),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::DeDe => "de-DE",
            Locale::EnUs => "en-US",
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "de-de" | "de" => Ok(Locale::DeDe),
            "en-us" | "en" => Ok(Locale::EnUs),
            other => Err(format!("unsupported locale '{other}'")),
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formats an amount for display, e.g. `format_money(Some(Money::from_minor(123456)), "eur", Locale::DeDe)`
/// gives `"1.234,56\u{a0}€"`.
///
/// A missing amount formats as zero. The currency code is trimmed and
/// upper-cased first; unknown codes are shown as the code itself.
pub fn format_money(amount: Option<Money>, currency_code: &str, locale: Locale) -> String {
    let code = normalize_code(currency_code);
    let digits = minor_digits(&code);
    let minor = amount.unwrap_or_default().minor();
    let sign = if minor < 0 { "-" } else { "" };
    let (group_sep, decimal_sep) = locale.separators();

    let magnitude = minor.unsigned_abs();
    let divisor = 10u64.pow(digits);
    let whole = group_digits(magnitude / divisor, group_sep);
    let number = if digits == 0 {
        whole
    } else {
        format!(
            "{whole}{decimal_sep}{:0width$}",
            magnitude % divisor,
            width = digits as usize
        )
    };

    if code.is_empty() {
        return format!("{sign}{number}");
    }

    let symbol = currency_symbol(&code);
    match locale {
        Locale::DeDe => format!("{sign}{number}\u{a0}{symbol}"),
        Locale::EnUs if symbol.chars().count() == 1 => format!("{sign}{symbol}{number}"),
        Locale::EnUs => format!("{sign}{symbol}\u{a0}{number}"),
    }
}

/// Formats an amount as a plain number with exactly two decimals (`"20.00"`),
/// no symbol and no grouping. Used by the CSV export.
pub fn format_plain(amount: Money, currency: &CurrencyCode) -> String {
    let mut value = amount
        .to_decimal(currency)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    value.rescale(2);
    value.to_string()
}

fn group_digits(value: u64, separator: char) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eur() -> CurrencyCode {
        CurrencyCode::parse("eur").unwrap()
    }

    #[test]
    fn test_format_de_de_groups_and_uses_comma() {
        assert_eq!(
            format_money(Some(Money::from_minor(123_456)), "eur", Locale::DeDe),
            "1.234,56\u{a0}€"
        );
    }

    #[test]
    fn test_format_en_us_prefixes_symbol() {
        assert_eq!(
            format_money(Some(Money::from_minor(123_456)), "USD", Locale::EnUs),
            "$1,234.56"
        );
    }

    #[test]
    fn test_format_missing_amount_is_zero() {
        assert_eq!(format_money(None, "EUR", Locale::DeDe), "0,00\u{a0}€");
    }

    #[test]
    fn test_format_normalizes_currency_case_and_whitespace() {
        assert_eq!(
            format_money(Some(Money::from_minor(500)), " gbp ", Locale::EnUs),
            "£5.00"
        );
    }

    #[test]
    fn test_format_zero_digit_currency() {
        assert_eq!(
            format_money(Some(Money::from_minor(1500)), "jpy", Locale::DeDe),
            "1.500\u{a0}¥"
        );
    }

    #[test]
    fn test_format_unknown_currency_uses_code() {
        assert_eq!(
            format_money(Some(Money::from_minor(999)), "sek", Locale::DeDe),
            "9,99\u{a0}SEK"
        );
        assert_eq!(
            format_money(Some(Money::from_minor(999)), "chf", Locale::EnUs),
            "CHF\u{a0}9.99"
        );
    }

    #[test]
    fn test_format_negative_amount() {
        assert_eq!(
            format_money(Some(Money::from_minor(-1050)), "EUR", Locale::DeDe),
            "-10,50\u{a0}€"
        );
    }

    #[test]
    fn test_format_is_deterministic() {
        let a = format_money(Some(Money::from_minor(42)), "EUR", Locale::EnUs);
        let b = format_money(Some(Money::from_minor(42)), "EUR", Locale::EnUs);
        assert_eq!(a, b);
        assert_eq!(a, "€0.42");
    }

    #[test]
    fn test_currency_parse_rejects_garbage() {
        assert!(CurrencyCode::parse("").is_err());
        assert!(CurrencyCode::parse("EURO").is_err());
        assert_eq!(CurrencyCode::parse(" usd").unwrap().as_str(), "USD");
    }

    #[test]
    fn test_minor_digits() {
        assert_eq!(eur().minor_digits(), 2);
        assert_eq!(CurrencyCode::parse("JPY").unwrap().minor_digits(), 0);
        assert_eq!(CurrencyCode::parse("KWD").unwrap().minor_digits(), 3);
    }

    #[test]
    fn test_from_decimal_converts_major_units() {
        let money = Money::from_decimal(Decimal::new(1999, 2), &eur()).unwrap();
        assert_eq!(money.minor(), 1999);

        let rounded = Money::from_decimal(Decimal::new(10005, 3), &eur()).unwrap();
        assert_eq!(rounded.minor(), 1001);
    }

    #[test]
    fn test_from_decimal_out_of_range() {
        assert!(Money::from_decimal(Decimal::MAX, &eur()).is_err());
    }

    #[test]
    fn test_format_plain_two_decimals() {
        assert_eq!(format_plain(Money::from_minor(2000), &eur()), "20.00");
        assert_eq!(format_plain(Money::zero(), &eur()), "0.00");
        let jpy = CurrencyCode::parse("JPY").unwrap();
        assert_eq!(format_plain(Money::from_minor(1500), &jpy), "1500.00");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);
        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!(a.multiply(3).minor(), 3000);
        assert_eq!(a.distance(b), 500);
        let total: Money = [a, b].into_iter().sum();
        assert_eq!(total.minor(), 1500);
    }

    #[test]
    fn test_locale_from_str() {
        assert_eq!("de-DE".parse::<Locale>().unwrap(), Locale::DeDe);
        assert_eq!("en_us".parse::<Locale>().unwrap(), Locale::EnUs);
        assert!("fr-FR".parse::<Locale>().is_err());
    }
}
