mod args;
mod handlers;
mod picker;
mod render;
mod whitelist;

use sales_store::dataset::file::CsvSalesDataset;
use teloxide::utils::command::BotCommands;
use tokio::sync::Mutex;

pub use args::{parse_add_args, AddArgsError, ADD_USAGE};
pub use handlers::build_handler;
pub use picker::{
    items_keyboard, render_picker_prompt, resolve_item, ItemAction, ItemCallback,
    CALLBACK_DATA_LIMIT,
};
pub use render::{
    render_detail, render_forecast, render_items, render_welcome, split_message, MESSAGE_LIMIT,
};
pub use whitelist::Whitelist;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Inventory commands:")]
pub enum Command {
    #[command(description = "welcome page")]
    Start,
    #[command(description = "show this text")]
    Help,
    #[command(description = "total retail sales per item")]
    Items,
    #[command(description = "sales details of an item: /detail [item]")]
    Detail(String),
    #[command(description = "add a sales record: /add <item>;<year>;<month>;<sales>[;<supplier>]")]
    Add(String),
    #[command(description = "delete every record of an item: /delete [item]")]
    Delete(String),
    #[command(description = "link to the sales forecasting tool")]
    Forecast,
    #[command(description = "download the dataset as csv")]
    Export,
}

/// State shared by every handler. The mutex serializes dataset mutations
/// coming from different chats.
pub struct BotContext {
    pub dataset: Mutex<CsvSalesDataset>,
    pub forecast_url: String,
    pub whitelist: Whitelist,
}

impl BotContext {
    pub fn new(dataset: CsvSalesDataset, forecast_url: String, whitelist: Whitelist) -> Self {
        BotContext {
            dataset: Mutex::new(dataset),
            forecast_url,
            whitelist,
        }
    }
}

#[cfg(test)]
mod tests {
    use teloxide::utils::command::BotCommands;

    use super::Command;

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/items", "inventory_bot").unwrap(), Command::Items);
        assert_eq!(
            Command::parse("/detail Red Wine 750ml", "inventory_bot").unwrap(),
            Command::Detail("Red Wine 750ml".to_string())
        );
        assert_eq!(
            Command::parse("/add Widget;2024;1;10", "inventory_bot").unwrap(),
            Command::Add("Widget;2024;1;10".to_string())
        );
        assert_eq!(Command::parse("/start", "inventory_bot").unwrap(), Command::Start);
        assert_eq!(
            Command::parse("/delete", "inventory_bot").unwrap(),
            Command::Delete(String::new())
        );
        assert!(Command::parse("/unknown", "inventory_bot").is_err());
    }
}
