use std::sync::Arc;

use sales_store::dataset::{AddRecordError, DeleteItemError, SalesDataset};
use teloxide::{
    dispatching::{dialogue::GetChatId, UpdateFilterExt, UpdateHandler},
    filter_command,
    prelude::*,
    types::InputFile,
    utils::command::BotCommands,
    RequestError,
};

use super::{
    items_keyboard, parse_add_args, render_detail, render_forecast, render_items,
    render_picker_prompt, render_welcome, resolve_item, split_message, BotContext, Command,
    ItemAction, ItemCallback, ADD_USAGE, MESSAGE_LIMIT,
};

const SAVE_FAILED: &str = "Failed to save the dataset, nothing was changed. Try again later.";
const NOT_ALLOWED: &str = "You are not allowed to do this";
const OUTDATED_LIST: &str = "This item list is outdated, please request it again.";

pub fn build_handler() -> UpdateHandler<RequestError> {
    let messages_handler = Update::filter_message()
        .branch(filter_command::<Command, _>().endpoint(handle_command))
        .endpoint(handle_unknown);

    let callbacks_handler = Update::filter_callback_query().endpoint(handle_callback);

    dptree::entry()
        .branch(messages_handler)
        .branch(callbacks_handler)
}

fn requires_whitelist(cmd: &Command) -> bool {
    matches!(cmd, Command::Add(_) | Command::Delete(_) | Command::Export)
}

/// Item argument of `/detail` and `/delete`, kept exactly as typed. Blank
/// means the user wants to pick from the list.
fn item_argument(arg: &str) -> Option<&str> {
    if arg.trim().is_empty() {
        None
    } else {
        Some(arg)
    }
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    context: Arc<BotContext>,
) -> ResponseResult<()> {
    log::debug!("Handling {:?} command. chat_id={}", cmd, msg.chat.id);

    if requires_whitelist(&cmd) && !context.whitelist.check_allowed(&msg.chat.id) {
        log::warn!("Chat {} is not whitelisted for {:?}", msg.chat.id, cmd);
        bot.send_message(msg.chat.id, NOT_ALLOWED).await?;
        return Ok(());
    }

    let reply = match cmd {
        Command::Start => render_welcome(),
        Command::Help => Command::descriptions().to_string(),
        Command::Items => render_items(&context.dataset.lock().await.aggregate_by_item()),
        Command::Detail(arg) => match item_argument(&arg) {
            Some(item) => detail_text(&*context.dataset.lock().await, item),
            None => {
                return send_item_picker(&bot, msg.chat.id, &context, ItemAction::Detail, 0).await
            }
        },
        Command::Add(args) => add_text(&mut *context.dataset.lock().await, &args),
        Command::Delete(arg) => match item_argument(&arg) {
            Some(item) => delete_text(&mut *context.dataset.lock().await, item),
            None => {
                return send_item_picker(&bot, msg.chat.id, &context, ItemAction::Delete, 0).await
            }
        },
        Command::Forecast => render_forecast(&context.forecast_url),
        Command::Export => return send_export(&bot, &msg, &context).await,
    };

    send_chunks(&bot, msg.chat.id, &reply).await
}

async fn handle_unknown(bot: Bot, msg: Message) -> ResponseResult<()> {
    log::debug!("Unrecognized message. chat_id={}", msg.chat.id);

    bot.send_message(
        msg.chat.id,
        format!("Unknown command.\n\n{}", Command::descriptions()),
    )
    .await?;

    Ok(())
}

async fn handle_callback(
    bot: Bot,
    query: CallbackQuery,
    context: Arc<BotContext>,
) -> ResponseResult<()> {
    log::debug!(
        "Callback: chat_id: {:?}; data: {:?}",
        query.chat_id(),
        query.data
    );
    bot.answer_callback_query(query.id.clone()).await?;

    let Some(chat_id) = query.chat_id() else {
        log::warn!("Callback without a chat, ignored");
        return Ok(());
    };
    let Some(callback) = query.data.as_deref().and_then(ItemCallback::decode) else {
        log::warn!("Unknown callback data {:?}", query.data);
        return Ok(());
    };

    if callback.action() == ItemAction::Delete && !context.whitelist.check_allowed(&chat_id) {
        log::warn!("Chat {} is not whitelisted for item deletion", chat_id);
        bot.send_message(chat_id, NOT_ALLOWED).await?;
        return Ok(());
    }

    let reply = match callback {
        ItemCallback::Page { action, page } => {
            return send_item_picker(&bot, chat_id, &context, action, page).await
        }
        ItemCallback::Item {
            action,
            index,
            prefix,
        } => {
            let mut dataset = context.dataset.lock().await;
            let item = resolve_item(&dataset.items(), index, &prefix).map(str::to_string);

            match (item, action) {
                (None, _) => OUTDATED_LIST.to_string(),
                (Some(item), ItemAction::Detail) => detail_text(&*dataset, &item),
                (Some(item), ItemAction::Delete) => delete_text(&mut *dataset, &item),
            }
        }
    };

    send_chunks(&bot, chat_id, &reply).await
}

async fn send_chunks(bot: &Bot, chat_id: ChatId, reply: &str) -> ResponseResult<()> {
    for chunk in split_message(reply, MESSAGE_LIMIT) {
        bot.send_message(chat_id, chunk).await?;
    }

    Ok(())
}

async fn send_item_picker(
    bot: &Bot,
    chat_id: ChatId,
    context: &BotContext,
    action: ItemAction,
    page: usize,
) -> ResponseResult<()> {
    let picker = {
        let dataset = context.dataset.lock().await;
        let items = dataset.items();
        (!items.is_empty()).then(|| {
            (
                render_picker_prompt(action, page, items.len()),
                items_keyboard(action, &items, page),
            )
        })
    };
    let Some((prompt, keyboard)) = picker else {
        bot.send_message(chat_id, "No items yet.").await?;
        return Ok(());
    };

    bot.send_message(chat_id, prompt)
        .reply_markup(keyboard)
        .await?;

    Ok(())
}

fn detail_text<D: SalesDataset>(dataset: &D, item: &str) -> String {
    match dataset.item_detail(item) {
        Ok(detail) => render_detail(&detail),
        Err(err) => format!("Not found: {err}"),
    }
}

fn add_text<D: SalesDataset>(dataset: &mut D, args: &str) -> String {
    let record = match parse_add_args(args) {
        Ok(record) => record,
        Err(err) => return format!("{err}\nUsage: {ADD_USAGE}"),
    };
    let item = record.item_description.clone();

    match dataset.add_record(record) {
        Ok(()) => {
            log::info!("Added sales record for {:?}", item);
            "Item added successfully!".to_string()
        }
        Err(AddRecordError::Validation(err)) => format!("Rejected, {err}"),
        Err(AddRecordError::Persist(err)) => {
            log::error!("Failed adding record for {:?}: {}", item, err);
            SAVE_FAILED.to_string()
        }
    }
}

fn delete_text<D: SalesDataset>(dataset: &mut D, item: &str) -> String {
    match dataset.delete_by_item(item) {
        Ok(removed) => format!("Item deleted successfully! ({removed} records removed)"),
        Err(DeleteItemError::ItemDoesntExist(err)) => format!("Not found: {err}"),
        Err(DeleteItemError::Persist(err)) => {
            log::error!("Failed deleting {:?}: {}", item, err);
            SAVE_FAILED.to_string()
        }
    }
}

async fn send_export(bot: &Bot, msg: &Message, context: &BotContext) -> ResponseResult<()> {
    let dump = context.dataset.lock().await.dump();

    match dump {
        Ok(bytes) => {
            bot.send_document(msg.chat.id, InputFile::memory(bytes).file_name("data.csv"))
                .await?;
        }
        Err(err) => {
            log::error!("Failed dataset dump: {:#}", err);
            bot.send_message(msg.chat.id, "Failed to read the dataset file")
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use sales_store::dataset::{file::CsvSalesDataset, SalesDataset};
    use tempfile::TempDir;

    use super::{add_text, delete_text, detail_text, item_argument, requires_whitelist, SAVE_FAILED};
    use crate::bot::Command;

    fn dataset_in(tmp_dir: &TempDir) -> CsvSalesDataset {
        let mut dataset = CsvSalesDataset::new(tmp_dir.path().join("data.csv"));
        add_text(&mut dataset, "Widget;2024;1;10;Acme");
        dataset
    }

    #[test]
    fn test_whitelist_guards_mutations_and_export() {
        assert!(requires_whitelist(&Command::Add(String::new())));
        assert!(requires_whitelist(&Command::Delete(String::new())));
        assert!(requires_whitelist(&Command::Export));
        assert!(!requires_whitelist(&Command::Items));
        assert!(!requires_whitelist(&Command::Detail(String::new())));
        assert!(!requires_whitelist(&Command::Forecast));
        assert!(!requires_whitelist(&Command::Start));
    }

    #[test]
    fn test_item_argument_is_not_trimmed() {
        assert_eq!(item_argument(""), None);
        assert_eq!(item_argument("   "), None);
        assert_eq!(item_argument("Widget "), Some("Widget "));
        assert_eq!(item_argument(" Red Wine"), Some(" Red Wine"));
    }

    #[test]
    fn test_items_with_surrounding_whitespace_are_reachable() {
        let tmp_dir = TempDir::new().unwrap();
        let file = tmp_dir.path().join("data.csv");
        std::fs::write(
            &file,
            "ITEM DESCRIPTION,YEAR,MONTH,RETAIL SALES,SUPPLIER\nWidget ,2024,1,10.0,Acme\n",
        )
        .unwrap();
        let mut dataset = CsvSalesDataset::load(&file).unwrap();

        assert!(detail_text(&dataset, "Widget").starts_with("Not found"));
        assert_eq!(
            detail_text(&dataset, item_argument("Widget ").unwrap()),
            "Item Description: Widget \nTotal Sales: $10.00\nSupplier: Acme"
        );
        assert_eq!(
            delete_text(&mut dataset, item_argument("Widget ").unwrap()),
            "Item deleted successfully! (1 records removed)"
        );
        assert!(CsvSalesDataset::load(&file).unwrap().records().is_empty());
    }

    #[test]
    fn test_add_text_replies() {
        let tmp_dir = TempDir::new().unwrap();
        let mut dataset = dataset_in(&tmp_dir);

        assert_eq!(
            add_text(&mut dataset, "Gadget;2024;2;5"),
            "Item added successfully!"
        );
        assert!(add_text(&mut dataset, "Gadget;2024").contains("Usage: /add"));
        assert!(add_text(&mut dataset, "Gadget;1999;2;5").starts_with("Rejected"));
        assert_eq!(dataset.items(), vec!["Widget", "Gadget"]);
    }

    #[test]
    fn test_save_failure_reply() {
        let tmp_dir = TempDir::new().unwrap();
        let mut dataset = CsvSalesDataset::new(tmp_dir.path().join("missing").join("data.csv"));

        assert_eq!(add_text(&mut dataset, "Widget;2024;1;10"), SAVE_FAILED);
        assert!(dataset.records().is_empty());
        assert!(delete_text(&mut dataset, "Widget").starts_with("Not found"));
    }
}
