use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Telegram rejects callback data longer than this many bytes.
pub const CALLBACK_DATA_LIMIT: usize = 64;
pub const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    Detail,
    Delete,
}

impl ItemAction {
    fn tag(self) -> &'static str {
        match self {
            ItemAction::Detail => "detail",
            ItemAction::Delete => "delete",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "detail" => Some(ItemAction::Detail),
            "delete" => Some(ItemAction::Delete),
            _ => None,
        }
    }
}

/// Payload of a picker button.
///
/// Item buttons carry the index into `SalesDataset::items` plus as much of the
/// description as fits, so a press on a stale keyboard is detected instead of
/// acting on whatever item moved into that slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemCallback {
    Page {
        action: ItemAction,
        page: usize,
    },
    Item {
        action: ItemAction,
        index: usize,
        prefix: String,
    },
}

impl ItemCallback {
    pub fn item(action: ItemAction, index: usize, item_description: &str) -> Self {
        let head = format!("{}:i:{}:", action.tag(), index);
        let room = CALLBACK_DATA_LIMIT.saturating_sub(head.len());

        let mut end = item_description.len().min(room);
        while !item_description.is_char_boundary(end) {
            end -= 1;
        }

        ItemCallback::Item {
            action,
            index,
            prefix: item_description[..end].to_string(),
        }
    }

    pub fn action(&self) -> ItemAction {
        match self {
            ItemCallback::Page { action, .. } | ItemCallback::Item { action, .. } => *action,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            ItemCallback::Page { action, page } => format!("{}:p:{}", action.tag(), page),
            ItemCallback::Item {
                action,
                index,
                prefix,
            } => format!("{}:i:{}:{}", action.tag(), index, prefix),
        }
    }

    pub fn decode(data: &str) -> Option<Self> {
        let mut parts = data.splitn(4, ':');
        let action = ItemAction::from_tag(parts.next()?)?;
        let kind = parts.next()?;
        let number = parts.next()?.parse().ok()?;

        match (kind, parts.next()) {
            ("p", None) => Some(ItemCallback::Page {
                action,
                page: number,
            }),
            ("i", Some(prefix)) => Some(ItemCallback::Item {
                action,
                index: number,
                prefix: prefix.to_string(),
            }),
            _ => None,
        }
    }
}

/// Looks up the item a button points to. `None` when the list changed since
/// the keyboard was sent.
pub fn resolve_item<'a>(items: &[&'a str], index: usize, prefix: &str) -> Option<&'a str> {
    items
        .get(index)
        .copied()
        .filter(|item| item.starts_with(prefix))
}

pub fn page_count(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE).max(1)
}

/// One button per item of the requested page, with a navigation row when the
/// list doesn't fit one page. Out of range pages show the last one.
pub fn items_keyboard(action: ItemAction, items: &[&str], page: usize) -> InlineKeyboardMarkup {
    let pages = page_count(items.len());
    let page = page.min(pages - 1);
    let start = page * PAGE_SIZE;

    let mut rows: Vec<Vec<InlineKeyboardButton>> = items
        .iter()
        .enumerate()
        .skip(start)
        .take(PAGE_SIZE)
        .map(|(index, item)| {
            vec![InlineKeyboardButton::callback(
                item.to_string(),
                ItemCallback::item(action, index, item).encode(),
            )]
        })
        .collect();

    let mut navigation = Vec::new();
    if page > 0 {
        navigation.push(InlineKeyboardButton::callback(
            "« Prev",
            ItemCallback::Page {
                action,
                page: page - 1,
            }
            .encode(),
        ));
    }
    if page + 1 < pages {
        navigation.push(InlineKeyboardButton::callback(
            "Next »",
            ItemCallback::Page {
                action,
                page: page + 1,
            }
            .encode(),
        ));
    }
    if !navigation.is_empty() {
        rows.push(navigation);
    }

    InlineKeyboardMarkup::new(rows)
}

pub fn render_picker_prompt(action: ItemAction, page: usize, len: usize) -> String {
    let verb = match action {
        ItemAction::Detail => "Select an item to see its sales details",
        ItemAction::Delete => "Select an item to delete",
    };
    let pages = page_count(len);

    if pages > 1 {
        format!("{verb} (page {} of {pages}):", page.min(pages - 1) + 1)
    } else {
        format!("{verb}:")
    }
}

#[cfg(test)]
mod tests {
    use teloxide::types::{InlineKeyboardButton, InlineKeyboardButtonKind};

    use super::{
        items_keyboard, page_count, render_picker_prompt, resolve_item, ItemAction, ItemCallback,
        CALLBACK_DATA_LIMIT, PAGE_SIZE,
    };

    fn callback_data(button: &InlineKeyboardButton) -> &str {
        match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => data,
            kind => panic!("unexpected button kind {kind:?}"),
        }
    }

    #[test]
    fn test_keyboard_has_button_per_item() {
        let items = ["Red Wine", "Beer", "Widget "];
        let markup = items_keyboard(ItemAction::Delete, &items, 0);

        assert_eq!(markup.inline_keyboard.len(), 3);
        for (index, row) in markup.inline_keyboard.iter().enumerate() {
            assert_eq!(row.len(), 1);
            assert_eq!(row[0].text, items[index]);

            let decoded = ItemCallback::decode(callback_data(&row[0])).unwrap();
            assert_eq!(decoded, ItemCallback::item(ItemAction::Delete, index, items[index]));
        }
    }

    #[test]
    fn test_keyboard_pages() {
        let names: Vec<String> = (0..PAGE_SIZE * 2 + 5).map(|n| format!("item {n}")).collect();
        let items: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(page_count(items.len()), 3);

        let first = items_keyboard(ItemAction::Detail, &items, 0);
        assert_eq!(first.inline_keyboard.len(), PAGE_SIZE + 1);
        let navigation = first.inline_keyboard.last().unwrap();
        assert_eq!(navigation.len(), 1);
        assert_eq!(callback_data(&navigation[0]), "detail:p:1");

        let middle = items_keyboard(ItemAction::Detail, &items, 1);
        assert_eq!(middle.inline_keyboard[0][0].text, format!("item {PAGE_SIZE}"));
        assert_eq!(middle.inline_keyboard.last().unwrap().len(), 2);

        let last = items_keyboard(ItemAction::Detail, &items, 7);
        assert_eq!(last.inline_keyboard.len(), 5 + 1);
        assert_eq!(callback_data(&last.inline_keyboard[5][0]), "detail:p:1");
    }

    #[test]
    fn test_keyboard_for_empty_list() {
        let markup = items_keyboard(ItemAction::Detail, &[], 0);

        assert!(markup.inline_keyboard.is_empty());
        assert_eq!(page_count(0), 1);
    }

    #[test]
    fn test_callback_data_fits_limit() {
        let long = "Ü".repeat(100);
        let callback = ItemCallback::item(ItemAction::Delete, 12345, &long);
        let data = callback.encode();

        assert!(data.len() <= CALLBACK_DATA_LIMIT);
        assert_eq!(ItemCallback::decode(&data), Some(callback));
    }

    #[test]
    fn test_callback_decode() {
        assert_eq!(
            ItemCallback::decode("detail:p:2"),
            Some(ItemCallback::Page {
                action: ItemAction::Detail,
                page: 2
            })
        );
        assert_eq!(
            ItemCallback::decode("delete:i:3:a:b"),
            Some(ItemCallback::Item {
                action: ItemAction::Delete,
                index: 3,
                prefix: "a:b".to_string()
            })
        );
        assert_eq!(ItemCallback::decode("detail:p:2:x"), None);
        assert_eq!(ItemCallback::decode("detail:i:2"), None);
        assert_eq!(ItemCallback::decode("export:p:0"), None);
        assert_eq!(ItemCallback::decode("detail:p:x"), None);
    }

    #[test]
    fn test_resolve_item_rejects_stale_buttons() {
        let items = ["Red Wine", "Beer"];

        assert_eq!(resolve_item(&items, 1, "Beer"), Some("Beer"));
        assert_eq!(resolve_item(&items, 0, "Beer"), None);
        assert_eq!(resolve_item(&items, 2, ""), None);
    }

    #[test]
    fn test_picker_prompt() {
        assert_eq!(
            render_picker_prompt(ItemAction::Delete, 0, 3),
            "Select an item to delete:"
        );
        assert_eq!(
            render_picker_prompt(ItemAction::Detail, 1, PAGE_SIZE + 1),
            "Select an item to see its sales details (page 2 of 2):"
        );
    }
}
