use std::collections::BTreeMap;

use sales_store::dataset::{format_amount, ItemDetail};

/// Telegram rejects longer text messages.
pub const MESSAGE_LIMIT: usize = 4096;

pub fn render_items(totals: &BTreeMap<String, f64>) -> String {
    if totals.is_empty() {
        return "No items yet.".to_string();
    }

    totals.iter().fold(
        String::from("Item sales:\n"),
        |mut out, (item, total)| {
            out.push_str(&format!("{item}: {}\n", format_amount(*total)));
            out
        },
    )
}

pub fn render_detail(detail: &ItemDetail) -> String {
    let suppliers = if detail.suppliers.is_empty() {
        "-".to_string()
    } else {
        detail
            .suppliers
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Item Description: {}\nTotal Sales: ${}\nSupplier: {}",
        detail.item_description,
        format_amount(detail.total_sales),
        suppliers
    )
}

pub fn render_welcome() -> String {
    [
        "Welcome to the Inventory Management System!",
        "",
        "Here you can manage your inventory, view item sales and access sales forecasting tools.",
        "",
        "Features:",
        "- View item sales data: /items",
        "- Manage items in your inventory: /add, /delete",
        "- View detailed sales information: /detail",
        "- Access sales forecasting tools: /forecast",
        "",
        "Send /help for the full command list.",
    ]
    .join("\n")
}

pub fn render_forecast(url: &str) -> String {
    format!("Access the sales forecasting tool here: {url}")
}

fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Splits text on line boundaries into chunks of at most `limit` UTF-16 code
/// units, the unit Telegram counts in. A line longer than `limit` is split
/// between chars.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.lines() {
        let line_len = utf16_len(line);
        let needed = line_len + usize::from(!current.is_empty());
        if !current.is_empty() && current_len + needed > limit {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > limit {
            for ch in line.chars() {
                if current_len + ch.len_utf16() > limit {
                    chunks.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                current.push(ch);
                current_len += ch.len_utf16();
            }
            continue;
        }

        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}
