use std::collections::HashSet;
use std::fmt::Display;
use std::fs::File;
use std::io::prelude::Read;
use std::path::Path;

use teloxide::types::ChatId;

/// Chats allowed to change the dataset. Empty means everyone is.
pub struct Whitelist {
    allowed_ids: HashSet<ChatId>,
}

impl Display for Whitelist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.allowed_ids.is_empty() {
            write!(f, "[all]")
        } else {
            let mut ids: Vec<String> = self.allowed_ids.iter().map(|v| v.to_string()).collect();
            ids.sort();
            write!(f, "[{}]", ids.join(", "))
        }
    }
}

impl Default for Whitelist {
    fn default() -> Self {
        Self::new()
    }
}

impl Whitelist {
    pub fn new() -> Self {
        Self {
            allowed_ids: HashSet::new(),
        }
    }

    pub fn read<P: AsRef<Path>>(file: P) -> std::io::Result<Self> {
        let mut data = String::new();
        File::open(file)?.read_to_string(&mut data)?;

        Ok(Self::parse(&data))
    }

    fn parse(data: &str) -> Self {
        let allowed_ids = data
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                line.parse::<i64>().map_or_else(
                    |err| {
                        log::warn!("Failed line parse \"{}\": {}", line, err);
                        None
                    },
                    |num| Some(ChatId(num)),
                )
            })
            .collect();

        Whitelist { allowed_ids }
    }

    pub fn check_allowed(&self, chat_id: &ChatId) -> bool {
        self.allowed_ids.is_empty() || self.allowed_ids.contains(chat_id)
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::prelude::Write;

    use teloxide::types::ChatId;
    use tempfile::TempDir;

    use super::Whitelist;

    #[test]
    fn test_empty_whitelist_allows_everyone() {
        let whitelist = Whitelist::new();

        assert!(whitelist.check_allowed(&ChatId(42)));
        assert_eq!(whitelist.to_string(), "[all]");
    }

    #[test]
    fn test_whitelist_read() {
        let tmp_dir = TempDir::new().unwrap();
        let file = tmp_dir.path().join("whitelist");
        File::create(&file)
            .unwrap()
            .write_all(b"# admins\n100\n\n  -200 \nnot-a-number\n")
            .unwrap();

        let whitelist = Whitelist::read(&file).unwrap();

        assert!(whitelist.check_allowed(&ChatId(100)));
        assert!(whitelist.check_allowed(&ChatId(-200)));
        assert!(!whitelist.check_allowed(&ChatId(300)));
        assert_eq!(whitelist.to_string(), "[-200, 100]");
    }

    #[test]
    fn test_whitelist_missing_file() {
        let tmp_dir = TempDir::new().unwrap();

        assert!(Whitelist::read(tmp_dir.path().join("any_file")).is_err());
    }
}
