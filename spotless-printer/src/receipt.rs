//! Receipt rendering
//!
//! The agent prints HTML, so a receipt is a complete document with inline
//! styles sized for 80mm thermal paper (270px printable width).

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use shared::models::{AppSettings, Customer, Order, Store};

/// Printable width of the receipt body in CSS pixels
pub const RECEIPT_WIDTH_PX: u32 = 270;

const BARCODE_FONT: &str =
    "https://fonts.googleapis.com/css2?family=Libre+Barcode+128&display=swap";

/// Everything a receipt shows
#[derive(Debug, Clone, Copy)]
pub struct ReceiptContext<'a> {
    pub order: &'a Order,
    pub store: &'a Store,
    pub settings: &'a AppSettings,
    pub customer: Option<&'a Customer>,
}

impl<'a> ReceiptContext<'a> {
    pub fn new(order: &'a Order, store: &'a Store, settings: &'a AppSettings) -> Self {
        Self {
            order,
            store,
            settings,
            customer: None,
        }
    }

    pub fn with_customer(mut self, customer: Option<&'a Customer>) -> Self {
        self.customer = customer;
        self
    }

    /// Store details win over the company-wide settings
    fn header(&self) -> (&str, &str, &str) {
        let pick = |store: &'a str, fallback: &'a str| {
            if store.trim().is_empty() { fallback } else { store }
        };
        (
            pick(&self.store.name, &self.settings.company_name),
            pick(&self.store.address, &self.settings.company_address),
            pick(&self.store.phone, &self.settings.company_phone),
        )
    }
}

/// Turns an order into printable HTML
pub trait ReceiptRenderer: Send + Sync {
    fn render(&self, ctx: &ReceiptContext<'_>) -> String;
}

/// Default customer receipt
#[derive(Debug, Clone, Default)]
pub struct HtmlReceipt;

impl ReceiptRenderer for HtmlReceipt {
    fn render(&self, ctx: &ReceiptContext<'_>) -> String {
        let order = ctx.order;
        let (name, address, phone) = ctx.header();
        let mut body = String::with_capacity(4096);

        body.push_str(&format!(
            r#"<div style="text-align:center;border-bottom:2px dashed #000;padding-bottom:12px">
<h1 style="font-size:22px;font-weight:900;text-transform:uppercase;margin:0">{}</h1>
<p style="font-size:9px;font-weight:700;text-transform:uppercase;margin:2px 0">Main Store: {}</p>
<p style="font-size:9px;margin:0">{}</p>
</div>
"#,
            escape(name),
            escape(address),
            escape(phone)
        ));

        body.push_str(&format!(
            r#"<table style="width:100%;border-bottom:1px solid #000;margin:8px 0"><tr>
<td><div style="font-size:10px;font-weight:700;text-transform:uppercase">Order #</div><div style="font-size:22px;font-weight:900">{}</div></td>
<td style="text-align:right"><div style="font-size:10px;font-weight:700;text-transform:uppercase">Received</div><div style="font-size:12px;font-weight:700">{}</div></td>
</tr></table>
"#,
            escape(&order.order_number),
            order.created_at.format("%m/%d/%Y")
        ));

        body.push_str(&format!(
            r#"<div style="margin:8px 0"><div style="font-size:10px;font-weight:700;text-transform:uppercase">Customer</div><div style="font-size:18px;font-weight:900">{}</div>"#,
            escape(&order.customer_name)
        ));
        if let Some(customer) = ctx.customer {
            body.push_str(&format!(
                r#"<div style="font-size:12px;font-weight:700">{}</div>"#,
                escape(&customer.phone)
            ));
        }
        body.push_str("</div>\n");

        body.push_str(&format!(
            r#"<div style="border:2px solid #000;padding:8px;text-align:center;margin:8px 0"><div style="font-size:10px;font-weight:700;text-transform:uppercase">Ready for Pickup</div><div style="font-size:16px;font-weight:900;text-transform:uppercase">{} @ {}</div></div>
"#,
            format_pickup_date(&order.pickup_date),
            format_pickup_time(&order.pickup_time)
        ));

        if let Some(hanger) = order.hanger_number.as_deref().filter(|h| !h.is_empty()) {
            body.push_str(&format!(
                r#"<div style="text-align:center;padding:6px;margin:8px 0"><div style="font-size:10px;font-weight:900;text-transform:uppercase">Hanger Number</div><div style="font-size:22px;font-weight:900">{}</div></div>
"#,
                escape(hanger)
            ));
        }

        body.push_str(
            r#"<table style="width:100%;border-top:1px solid #000;border-collapse:collapse;font-size:12px;margin-top:8px">
<tr style="font-size:10px;font-weight:900;text-transform:uppercase"><td>Description</td><td style="text-align:right">Total</td></tr>
"#,
        );
        for item in &order.items {
            body.push_str(&format!(
                r#"<tr style="border-bottom:1px dotted #000"><td>{}x {} ({})</td><td style="text-align:right;font-weight:700">{}</td></tr>
"#,
                item.quantity,
                escape(&item.category),
                escape(item.service_type.as_str()),
                money(item.total)
            ));
        }
        body.push_str("</table>\n");

        body.push_str(&format!(
            r#"<table style="width:100%;font-size:12px;margin-top:6px">
<tr><td>Subtotal</td><td style="text-align:right">{}</td></tr>
<tr><td>Tax</td><td style="text-align:right">{}</td></tr>
<tr style="font-size:18px;font-weight:900"><td style="border-top:2px solid #000">TOTAL</td><td style="text-align:right;border-top:2px solid #000">{}</td></tr>
</table>
"#,
            money(order.subtotal),
            money(order.tax),
            money(order.total)
        ));

        if !order.special_handling.trim().is_empty() {
            body.push_str(&format!(
                r#"<div style="border:2px solid #000;padding:6px;margin-top:12px"><div style="font-size:10px;font-weight:900;text-transform:uppercase">Special Handling</div><div style="font-size:12px;font-weight:700">{}</div></div>
"#,
                escape(&order.special_handling)
            ));
        }

        body.push_str(&format!(
            r#"<div style="padding-top:24px;text-align:center">
<div style="font-family:'Libre Barcode 128',monospace;font-size:60pt;white-space:nowrap">{}</div>
<p style="font-size:8px;font-weight:700;text-transform:uppercase;letter-spacing:2px">No refund without ticket. Orders donated after 90 days.</p>
</div>
"#,
            escape(&order.order_number)
        ));

        wrap_document(&body)
    }
}

/// Wrap a receipt body into the document the agent prints
pub fn wrap_document(body: &str) -> String {
    format!(
        r#"<html>
<head>
<meta charset="utf-8">
<link href="{BARCODE_FONT}" rel="stylesheet">
<style>
body {{ font-family: Helvetica, Arial, sans-serif; background: white; margin: 0; padding: 0; width: {RECEIPT_WIDTH_PX}px; overflow: hidden; }}
* {{ color: black !important; -webkit-print-color-adjust: exact; }}
</style>
</head>
<body>
<div style="padding:8px;width:{RECEIPT_WIDTH_PX}px">
{body}</div>
</body>
</html>
"#
    )
}

fn money(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

/// "2025-03-07" -> "Mar 7, 2025"
fn format_pickup_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "N/A".to_string();
    }
    let date_part = raw.get(..10).unwrap_or(raw);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => date.format("%b %-d, %Y").to_string(),
        Err(_) => escape(raw),
    }
}

/// "17:00" -> "5:00 PM"
fn format_pickup_time(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "N/A".to_string();
    }
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map(|t| t.format("%-I:%M %p").to_string())
        .unwrap_or_else(|_| escape(raw))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{OrderItem, ServiceType};
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn order() -> Order {
        Order {
            id: "o1".into(),
            order_number: "ORD-4821".into(),
            hanger_number: Some("H-12".into()),
            customer_id: "c1".into(),
            customer_name: "Doe, Jane".into(),
            items: vec![OrderItem {
                id: "i1".into(),
                category: "Shirt".into(),
                service_type: ServiceType::new(ServiceType::LAUNDER),
                quantity: 3,
                unit_price: d("2.50"),
                total: d("7.50"),
                notes: None,
            }],
            subtotal: d("7.50"),
            tax: d("0.60"),
            total: d("8.10"),
            pickup_date: "2025-03-07".into(),
            pickup_time: "17:00".into(),
            special_handling: "Starch <light>".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_receipt_contents() {
        let order = order();
        let store = Store {
            id: "s1".into(),
            name: "Uptown".into(),
            ..Default::default()
        };
        let settings = AppSettings::default();
        let html = HtmlReceipt.render(&ReceiptContext::new(&order, &store, &settings));

        assert!(html.starts_with("<html>"));
        assert!(html.contains("width: 270px"));
        assert!(html.contains("Uptown"));
        assert!(html.contains("ORD-4821"));
        assert!(html.contains("3x Shirt (Launder)"));
        assert!(html.contains("$7.50"));
        assert!(html.contains("$8.10"));
        assert!(html.contains("Mar 7, 2025 @ 5:00 PM"));
        assert!(html.contains("H-12"));
        assert!(html.contains("Starch &lt;light&gt;"));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn test_store_header_falls_back_to_settings() {
        let order = order();
        let store = Store::default();
        let settings = AppSettings::default();
        let html = HtmlReceipt.render(&ReceiptContext::new(&order, &store, &settings));
        assert!(html.contains(&settings.company_name));
    }

    #[test]
    fn test_pickup_formatting() {
        assert_eq!(format_pickup_time("09:05"), "9:05 AM");
        assert_eq!(format_pickup_time("00:30"), "12:30 AM");
        assert_eq!(format_pickup_time(""), "N/A");
        assert_eq!(format_pickup_date("2025-12-25T00:00:00Z"), "Dec 25, 2025");
        assert_eq!(format_pickup_date("soon"), "soon");
    }
}
