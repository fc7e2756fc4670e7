pub mod file;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::Debug;
use std::path::PathBuf;
use std::result::Result as StdResult;

use anyhow::Result;
use thiserror::Error;

use crate::record::{NewSalesRecord, SalesRecord, ValidationError};

mod sealed {
    /// Only `dataset` can build one, so only the provided mutations reach
    /// `SalesDataset::records_mut`.
    pub struct Token(pub(super) ());
}

pub type LoadResult<T> = StdResult<T, LoadError>;
pub type DetailResult<T> = StdResult<T, ItemDoesntExist>;
pub type AddResult<T> = StdResult<T, AddRecordError>;
pub type DeleteResult<T> = StdResult<T, DeleteItemError>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("dataset file {0:?} doesn't exist")]
    DoesntExist(PathBuf),
    #[error("missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("duplicated columns: {}", .0.join(", "))]
    DuplicateColumns(Vec<String>),
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
    #[error("failed dataset read: {0:#}")]
    ReadError(anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("item {0:?} doesn't exist")]
pub struct ItemDoesntExist(pub String);

#[derive(Debug, Error)]
#[error("failed dataset save: {0:#}")]
pub struct PersistError(pub anyhow::Error);

#[derive(Debug, Error)]
pub enum AddRecordError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Debug, Error)]
pub enum DeleteItemError {
    #[error(transparent)]
    ItemDoesntExist(#[from] ItemDoesntExist),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemDetail {
    pub item_description: String,
    pub total_sales: f64,
    pub suppliers: BTreeSet<String>,
}

/// Renders an amount the way summaries show it.
pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

/// In-memory sales records backed by some storage.
///
/// Implementors keep a saved snapshot next to the working records: `save`
/// writes the working records and advances the snapshot, `cancel` restores it.
/// Mutations go through [`SalesDataset::persist_or_rollback`], so a failed
/// write never leaves memory ahead of storage. `records_mut` takes a token
/// private to this module: callers can only change records through
/// `add_record` and `delete_by_item`.
pub trait SalesDataset: Debug + Send + 'static {
    fn records(&self) -> &[SalesRecord];
    fn records_mut(&mut self, _token: sealed::Token) -> &mut Vec<SalesRecord>;
    fn save(&mut self) -> Result<()>;
    fn cancel(&mut self);

    fn persist_or_rollback(&mut self) -> StdResult<(), PersistError> {
        if let Err(err) = self.save() {
            log::warn!("Rolling back dataset changes: {:#}", err);
            self.cancel();
            return Err(PersistError(err));
        }
        Ok(())
    }

    /// Total retail sales per item description, keyed in sorted order.
    fn aggregate_by_item(&self) -> BTreeMap<String, f64> {
        self.records()
            .iter()
            .fold(BTreeMap::new(), |mut totals, record| {
                *totals
                    .entry(record.item_description().to_string())
                    .or_insert(0.0) += record.retail_sales();
                totals
            })
    }

    /// Distinct item descriptions in order of first appearance.
    fn items(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records()
            .iter()
            .map(SalesRecord::item_description)
            .filter(|item| seen.insert(*item))
            .collect()
    }

    fn item_detail(&self, item_description: &str) -> DetailResult<ItemDetail> {
        let mut matched = self
            .records()
            .iter()
            .filter(|record| record.item_description() == item_description)
            .peekable();

        if matched.peek().is_none() {
            return Err(ItemDoesntExist(item_description.to_string()));
        }

        let (total_sales, suppliers) = matched.fold(
            (0.0, BTreeSet::new()),
            |(total, mut suppliers), record| {
                if let Some(supplier) = record.supplier() {
                    suppliers.insert(supplier.to_string());
                }
                (total + record.retail_sales(), suppliers)
            },
        );

        Ok(ItemDetail {
            item_description: item_description.to_string(),
            total_sales,
            suppliers,
        })
    }

    fn add_record(&mut self, record: NewSalesRecord) -> AddResult<()> {
        let record = record.into_record()?;
        log::debug!(
            "Adding record for {:?} ({}-{:02})",
            record.item_description(),
            record.year(),
            record.month()
        );

        self.records_mut(sealed::Token(())).push(record);
        self.persist_or_rollback()?;

        Ok(())
    }

    /// Removes every record of the item. Returns how many rows were dropped.
    fn delete_by_item(&mut self, item_description: &str) -> DeleteResult<usize> {
        let before = self.records().len();
        self.records_mut(sealed::Token(()))
            .retain(|record| record.item_description() != item_description);

        let removed = before - self.records().len();
        if removed == 0 {
            return Err(ItemDoesntExist(item_description.to_string()).into());
        }

        self.persist_or_rollback()?;
        log::info!("Deleted {} records of {:?}", removed, item_description);

        Ok(removed)
    }
}
