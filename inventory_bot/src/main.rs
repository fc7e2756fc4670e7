extern crate sales_store;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use inventory_bot::bot::{build_handler, BotContext, Command, Whitelist};
use inventory_bot::config::Config;
use sales_store::dataset::{file::CsvSalesDataset, SalesDataset};
use teloxide::{prelude::*, utils::command::BotCommands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    {
        let env_file = Path::new(".env");
        if env_file.exists() {
            dotenv::from_filename(".env").context("Failed .env loading")?;
        }
    }
    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or("INFO".to_string()))
        .init();

    let config = Config::from_env();
    log::debug!("Configuration: {:?}", config);

    let dataset = match CsvSalesDataset::load(&config.data_path) {
        Ok(dataset) => dataset,
        Err(err) => {
            log::error!("Failed loading sales data from {:?}: {}", config.data_path, err);
            return Err(err.into());
        }
    };
    log::info!(
        "Serving {} items from {:?}",
        dataset.items().len(),
        dataset.path()
    );

    let whitelist = match &config.whitelist {
        Some(file) => Whitelist::read(file)
            .with_context(|| format!("Failed whitelist read {:?}", file))?,
        None => Whitelist::new(),
    };
    log::info!("Whitelist: {}", whitelist);

    let context = Arc::new(BotContext::new(dataset, config.forecast_url, whitelist));

    log::info!("Starting bot...");
    let bot = Bot::from_env();
    bot.set_my_commands(Command::bot_commands())
        .await
        .context("Failed registering bot commands")?;

    Dispatcher::builder(bot, build_handler())
        .dependencies(dptree::deps![context])
        .default_handler(|upd| async move {
            log::warn!("Unhandled update: {:?}", upd);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
