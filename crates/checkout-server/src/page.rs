//! Checkout Page
//!
//! The page is fully determined by configuration, so it is rendered once at
//! startup and served from state.

use checkout_payments::{CHECKOUT_AMOUNT, CHECKOUT_CURRENCY};

use crate::config::CheckoutConfig;

const TEMPLATE: &str = include_str!("../assets/checkout.html");

/// Render the checkout page for this configuration
///
/// Placeholders are substituted in a single pass, so configured values are
/// never rescanned for further placeholders. Empty keys still render; the
/// widgets just fail to initialise in the browser.
pub fn render(config: &CheckoutConfig) -> String {
    let value_for = |name: &str| match name {
        "TURNSTILE_SITE_KEY" => Some(escape_attr(&config.turnstile_site_key)),
        "STRIPE_PUBLISHABLE_KEY" => Some(js_string(&config.stripe_publishable_key)),
        "AMOUNT" => Some(CHECKOUT_AMOUNT.to_string()),
        "CURRENCY" => Some(js_string(&CHECKOUT_CURRENCY.to_string())),
        "RETURN_URL" => Some(js_string(&config.return_url)),
        _ => None,
    };

    let mut html = String::with_capacity(TEMPLATE.len() + 256);
    let mut rest = TEMPLATE;
    while let Some(start) = rest.find("{{") {
        html.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let Some(end) = tail.find("}}") else {
            html.push_str(&rest[start..]);
            rest = "";
            break;
        };

        match value_for(&tail[..end]) {
            Some(value) => html.push_str(&value),
            None => html.push_str(&rest[start..start + end + 4]),
        }
        rest = &tail[end + 2..];
    }
    html.push_str(rest);
    html
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Quoted JS string literal that cannot close the surrounding script tag
fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string().replace("</", "<\\/")
}
