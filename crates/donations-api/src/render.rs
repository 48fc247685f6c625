//! HTML for the checkout page. Every interpolated value passes through
//! [`escape`].

use std::fmt::Write;

use donations_ledger::Listing;

use crate::state::SiteConfig;

pub const NO_IDENTITY: &str = "You have no pending donations.";
pub const EMPTY_LEDGER: &str = "No donations found.";

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

/// `base` with `total_amount` appended as a query parameter.
pub fn payment_link(base: &str, total: &str) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{}{}total_amount={}", base, sep, total)
}

/// Full checkout page. `security` is the anti-forgery token for the visitor,
/// absent when the visitor has no identity.
pub fn checkout_page(listing: &Listing, security: Option<&str>, site: &SiteConfig) -> String {
    let mut body = String::new();

    match listing {
        Listing::NoIdentity => {
            let _ = write!(body, "<p class=\"donations-empty\">{}</p>", NO_IDENTITY);
        }
        Listing::Empty => {
            let _ = write!(body, "<p class=\"donations-empty\">{}</p>", EMPTY_LEDGER);
        }
        Listing::Entries(rows) => {
            body.push_str(
                "<table class=\"donations-table\">\n\
                 <thead><tr><th>Donation</th><th>Amount</th><th></th></tr></thead>\n<tbody>\n",
            );
            for row in rows {
                let amount = row.amount.to_string();
                let _ = write!(
                    body,
                    "<tr data-entry-id=\"{entry}\">\
                     <td class=\"donation-label\">{label}</td>\
                     <td><span class=\"donation-amount\">{amount}</span>\
                     <input class=\"donation-amount-input\" type=\"number\" min=\"0\" step=\"0.01\" value=\"{amount}\" hidden></td>\
                     <td><button type=\"button\" class=\"donation-edit\">Edit</button>\
                     <button type=\"button\" class=\"donation-save\" hidden>Save</button>\
                     <button type=\"button\" class=\"donation-cancel\" hidden>Cancel</button>\
                     <button type=\"button\" class=\"donation-delete\">Delete</button></td>\
                     </tr>\n",
                    entry = row.source_entry_id,
                    label = escape(&row.label),
                    amount = amount,
                );
            }
            let total = listing.total().to_string();
            let _ = write!(
                body,
                "</tbody>\n<tfoot><tr><th>Total</th><th class=\"donations-total\">{total}</th><th></th></tr></tfoot>\n</table>\n\
                 <p><a class=\"donations-proceed\" href=\"{href}\">Proceed to Payment</a></p>\n",
                total = total,
                href = escape(&payment_link(&site.checkout_url, &total)),
            );
            if let Some(url) = &site.payment_form_url {
                let _ = write!(
                    body,
                    "<iframe class=\"donations-payment\" src=\"{}\" title=\"Payment\"></iframe>\n",
                    escape(url)
                );
            }
        }
    }

    if let Some(token) = security {
        let _ = write!(
            body,
            "<input type=\"hidden\" id=\"donation-security\" value=\"{}\">\n",
            escape(token)
        );
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Your donations</title></head>\n<body>\n\
         <div id=\"donations\" data-update-url=\"/donations/update\" data-delete-url=\"/donations/delete\">\n{}</div>\n\
         <script src=\"/assets/donation-actions.js\"></script>\n</body>\n</html>\n",
        body
    )
}

/// Minimal page carrying a blocking checkout error.
pub fn error_page(message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Checkout</title></head>\n<body>\n\
         <p class=\"donations-error\">{}</p>\n</body>\n</html>\n",
        escape(message)
    )
}
