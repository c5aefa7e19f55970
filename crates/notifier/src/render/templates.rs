//! One template per notification.

use domain::{Money, format_money};

use super::layout::{escape, greeting, heading, wrap};
use super::{
    Cancellation, ConfirmationLine, DEFAULT_CUSTOMER_NAME, DEFAULT_GREETING_NAME,
    DEFAULT_TRACKING_NUMBER, DeliveryConfirmation, Document, OrderConfirmation,
    PLACEHOLDER_LINK, RenderContext, ShipmentTracking, Welcome,
};

pub(super) fn order_confirmation(n: &OrderConfirmation, ctx: &RenderContext) -> Document {
    let money = |amount: Money| format_money(Some(amount), n.currency.as_str(), ctx.locale);
    let display_id = escape(&n.display_id);

    let items: String = n.lines.iter().map(|line| item_row(line, &money)).collect();

    let content = format!(
        r#"{heading}
{greeting}
<div style="margin-bottom: 30px;">
  <div style="border-bottom: 1px solid #000; padding-bottom: 8px; margin-bottom: 0;">
    <span style="font-size: 12px; text-transform: uppercase; font-weight: bold; letter-spacing: 1px;">* Item Details</span>
  </div>
  <table style="width: 100%; border-collapse: collapse;">
{items}  </table>
</div>
<div style="background-color: #f9f9f9; padding: 20px; border: 1px dashed #ccc;">
  <table style="width: 100%; font-family: monospace;">
    <tr><td style="padding-bottom: 8px;">Subtotal</td><td style="text-align: right;">{subtotal}</td></tr>
    <tr><td style="padding-bottom: 8px;">Shipping</td><td style="text-align: right;">{shipping}</td></tr>
    <tr><td style="padding-bottom: 8px;">Tax</td><td style="text-align: right;">{tax}</td></tr>
    <tr style="font-weight: bold; font-size: 16px; border-top: 1px solid #ccc;">
      <td style="padding-top: 12px;">[ TOTAL ]</td><td style="text-align: right; padding-top: 12px;">{total}</td>
    </tr>
  </table>
</div>"#,
        heading = heading("Order Confirmed", &format!("[ ID: {display_id} ]")),
        greeting = greeting(
            n.first_name.as_deref().unwrap_or(DEFAULT_GREETING_NAME),
            "Thank you for your order. We have received it and will notify you once it ships.",
        ),
        subtotal = money(n.totals.subtotal),
        shipping = money(n.totals.shipping_amount),
        tax = money(n.totals.tax_amount),
        total = money(n.totals.grand_total),
    );

    Document {
        subject: format!("Order Confirmed #{}", n.display_id),
        html: wrap(&content, &ctx.store_name),
    }
}

fn item_row(line: &ConfirmationLine, money: &impl Fn(Money) -> String) -> String {
    let title = escape(&line.title);
    let image = match &line.thumbnail {
        Some(src) => format!(
            r#"<img src="{}" alt="{title}" style="width: 60px; height: 75px; object-fit: cover; border: 1px solid #e5e5e5;">"#,
            escape(src)
        ),
        None => r#"<div style="width:60px; height:75px; background: #eee;"></div>"#.to_string(),
    };
    let variant = line.variant.as_deref().map(escape).unwrap_or_default();

    format!(
        r#"    <tr style="border-bottom: 1px solid #e5e5e5;">
      <td style="padding: 16px 0; width: 80px;">{image}</td>
      <td style="padding: 16px 0;">
        <span style="display: block; font-weight: bold; text-transform: uppercase; font-size: 14px; color: #000;">{title}</span>
        <span style="display: block; font-size: 12px; color: #666; margin-top: 4px;">{variant}</span>
        <span style="display: block; font-size: 12px; color: #666;">Qty: {quantity}</span>
      </td>
      <td style="padding: 16px 0; text-align: right; font-family: monospace; font-size: 14px;">{price}</td>
    </tr>
"#,
        quantity = line.quantity,
        price = money(line.unit_price),
    )
}

/// Keeps only absolute http(s) links; anything else becomes the placeholder.
fn web_link(url: Option<&str>) -> &str {
    let Some(url) = url.map(str::trim) else {
        return PLACEHOLDER_LINK;
    };
    let scheme = url.split_once("://").map(|(scheme, _)| scheme);
    match scheme {
        Some(s) if s.eq_ignore_ascii_case("http") || s.eq_ignore_ascii_case("https") => url,
        _ => PLACEHOLDER_LINK,
    }
}

pub(super) fn shipment_tracking(n: &ShipmentTracking, ctx: &RenderContext) -> Document {
    let number = n.tracking_number.as_deref().unwrap_or(DEFAULT_TRACKING_NUMBER);
    let url = web_link(n.tracking_url.as_deref());

    let content = format!(
        r#"{heading}
<div style="background-color: #f9f9f9; padding: 20px; border: 1px dashed #ccc; text-align: center;">
  <p style="margin: 0 0 10px 0; font-family: monospace; font-size: 14px; color: #666;">TRACKING NUMBER</p>
  <p style="margin: 0 0 20px 0; font-size: 18px; font-weight: bold;">{number}</p>
  <a href="{url}" style="display: inline-block; background: #000; color: #fff; padding: 12px 24px; text-decoration: none; text-transform: uppercase; font-size: 12px; font-weight: bold; letter-spacing: 1px;">Track Package</a>
</div>"#,
        heading = heading(
            "[ SHIPPED ]",
            &format!("Order #{} is on the way.", escape(&n.display_id))
        ),
        number = escape(number),
        url = escape(url),
    );

    Document {
        subject: format!("Order #{} Shipped", n.display_id),
        html: wrap(&content, &ctx.store_name),
    }
}

pub(super) fn delivery_confirmation(n: &DeliveryConfirmation, ctx: &RenderContext) -> Document {
    let content = format!(
        r#"{heading}
{greeting}
<div style="text-align: center; margin-top: 40px;">
  <a href="{store_url}" style="text-decoration: none; font-size: 14px; color: #000; border-bottom: 1px solid #000; padding-bottom: 2px;">Visit Store</a>
</div>"#,
        heading = heading("[ DELIVERED ]", &format!("Order #{}", escape(&n.display_id))),
        greeting = greeting(
            n.first_name.as_deref().unwrap_or(DEFAULT_GREETING_NAME),
            "Your package has been delivered! We hope you enjoy your purchase.",
        ),
        store_url = escape(web_link(Some(&ctx.store_url))),
    );

    Document {
        subject: format!("Order #{} Delivered", n.display_id),
        html: wrap(&content, &ctx.store_name),
    }
}

pub(super) fn cancellation(n: &Cancellation, ctx: &RenderContext) -> Document {
    let display_id = escape(&n.display_id);
    let content = format!(
        "{}\n{}",
        heading("[ CANCELED ]", &format!("Order #{display_id}")),
        greeting(
            n.first_name.as_deref().unwrap_or(DEFAULT_GREETING_NAME),
            &format!("Your order <strong>#{display_id}</strong> has been canceled."),
        ),
    );

    Document {
        subject: format!("Order #{} Canceled", n.display_id),
        html: wrap(&content, &ctx.store_name),
    }
}

pub(super) fn welcome(n: &Welcome, ctx: &RenderContext) -> Document {
    let content = format!(
        "{}\n{}",
        heading("[ WELCOME ]", "Welcome to the club."),
        greeting(
            n.first_name.as_deref().unwrap_or(DEFAULT_CUSTOMER_NAME),
            "Thank you for creating an account with us.",
        ),
    );

    Document {
        subject: format!("Welcome to {}", ctx.store_name),
        html: wrap(&content, &ctx.store_name),
    }
}
