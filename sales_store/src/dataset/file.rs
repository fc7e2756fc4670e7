use std::fs::File;
use std::io::prelude::Read;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tempfile::NamedTempFile;

use super::{sealed, LoadError, LoadResult, SalesDataset};
use crate::record::{
    NewSalesRecord, SalesRecord, ITEM_DESCRIPTION, MONTH, RETAIL_SALES, SUPPLIER, YEAR,
};

const REQUIRED_COLUMNS: [&str; 5] = [ITEM_DESCRIPTION, YEAR, MONTH, RETAIL_SALES, SUPPLIER];

/// Recomputed on load, never written back.
const DERIVED_DATE_COLUMN: &str = "date";

#[derive(Debug, Clone, PartialEq)]
enum Column {
    ItemDescription,
    Year,
    Month,
    RetailSales,
    Supplier,
    Extra { name: String, index: usize },
}

impl Column {
    fn name(&self) -> &str {
        match self {
            Column::ItemDescription => ITEM_DESCRIPTION,
            Column::Year => YEAR,
            Column::Month => MONTH,
            Column::RetailSales => RETAIL_SALES,
            Column::Supplier => SUPPLIER,
            Column::Extra { name, .. } => name.as_str(),
        }
    }

    fn cell(&self, record: &SalesRecord) -> String {
        match self {
            Column::ItemDescription => record.item_description().to_string(),
            Column::Year => record.year().to_string(),
            Column::Month => record.month().to_string(),
            // Display is the shortest representation that parses back to the same value
            Column::RetailSales => record.retail_sales().to_string(),
            Column::Supplier => record.supplier().unwrap_or_default().to_string(),
            Column::Extra { index, .. } => record.extra().get(*index).cloned().unwrap_or_default(),
        }
    }
}

fn default_columns() -> Vec<Column> {
    vec![
        Column::ItemDescription,
        Column::Year,
        Column::Month,
        Column::RetailSales,
        Column::Supplier,
    ]
}

#[derive(Debug, Deserialize)]
struct RawSalesRow {
    #[serde(rename = "ITEM DESCRIPTION")]
    item_description: String,
    #[serde(rename = "YEAR")]
    year: String,
    #[serde(rename = "MONTH")]
    month: String,
    #[serde(rename = "RETAIL SALES")]
    retail_sales: String,
    #[serde(rename = "SUPPLIER")]
    supplier: String,
}

impl RawSalesRow {
    fn parse(self) -> std::result::Result<SalesRecord, String> {
        let record = NewSalesRecord {
            item_description: self.item_description,
            year: parse_integer(YEAR, &self.year)?,
            month: parse_integer(MONTH, &self.month)?,
            retail_sales: self
                .retail_sales
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("{RETAIL_SALES}: {:?} is not a number", self.retail_sales))?,
            supplier: Some(self.supplier),
        };

        record.into_record().map_err(|err| err.to_string())
    }
}

/// Accepts `2024` as well as `2024.0`, which tabular tools emit for integer
/// columns that once held blanks.
fn parse_integer(column: &str, raw: &str) -> std::result::Result<i32, String> {
    let raw = raw.trim();
    raw.parse::<i32>().or_else(|_| match raw.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && value.abs() <= i32::MAX as f64 => Ok(value as i32),
        _ => Err(format!("{column}: {raw:?} is not an integer")),
    })
}

fn malformed(err: csv::Error) -> LoadError {
    match err.position() {
        Some(position) => LoadError::MalformedRow {
            line: position.line(),
            reason: err.to_string(),
        },
        None => LoadError::ReadError(anyhow!(err)),
    }
}

fn read_records<R: Read>(reader: R) -> LoadResult<(Vec<Column>, Vec<SalesRecord>)> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = reader.headers().map_err(malformed)?.clone();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|header| header == **required))
        .map(|required| required.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let duplicated: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| headers.iter().filter(|header| header == *required).count() > 1)
        .map(|required| required.to_string())
        .collect();
    if !duplicated.is_empty() {
        return Err(LoadError::DuplicateColumns(duplicated));
    }

    let mut columns = Vec::with_capacity(headers.len());
    let mut extra_positions = Vec::new();
    for (position, header) in headers.iter().enumerate() {
        let column = match header {
            ITEM_DESCRIPTION => Column::ItemDescription,
            YEAR => Column::Year,
            MONTH => Column::Month,
            RETAIL_SALES => Column::RetailSales,
            SUPPLIER => Column::Supplier,
            derived if derived.eq_ignore_ascii_case(DERIVED_DATE_COLUMN) => continue,
            name => {
                let column = Column::Extra {
                    name: name.to_string(),
                    index: extra_positions.len(),
                };
                extra_positions.push(position);
                column
            }
        };
        columns.push(column);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(malformed)?;
        let line = row.position().map_or(0, |position| position.line());

        let raw: RawSalesRow = row.deserialize(Some(&headers)).map_err(malformed)?;
        let mut record = raw
            .parse()
            .map_err(|reason| LoadError::MalformedRow { line, reason })?;
        record.extra = extra_positions
            .iter()
            .map(|position| row.get(*position).unwrap_or_default().to_string())
            .collect();

        records.push(record);
    }

    Ok((columns, records))
}

#[derive(Debug, Clone)]
pub struct CsvSalesDataset {
    file: PathBuf,
    columns: Vec<Column>,
    records: Vec<SalesRecord>,
    saved_records: Vec<SalesRecord>,
}

impl CsvSalesDataset {
    /// Empty dataset with the five core columns. Nothing is written until `save`.
    pub fn new(file: PathBuf) -> CsvSalesDataset {
        CsvSalesDataset {
            file,
            columns: default_columns(),
            records: Vec::new(),
            saved_records: Vec::new(),
        }
    }

    pub fn load<P: AsRef<Path>>(file: P) -> LoadResult<CsvSalesDataset> {
        let file = file.as_ref().to_path_buf();
        if !file.exists() {
            return Err(LoadError::DoesntExist(file));
        }

        let reader = File::open(&file)
            .with_context(|| format!("Failed file open {:?}", file))
            .map_err(LoadError::ReadError)?;
        let (columns, records) = read_records(reader)?;

        log::info!("Loaded {} sales records from {:?}", records.len(), file);

        Ok(CsvSalesDataset {
            file,
            columns,
            records: records.clone(),
            saved_records: records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Raw contents of the persisted file.
    pub fn dump(&self) -> Result<Vec<u8>> {
        let mut buff = Vec::new();
        File::open(&self.file)
            .with_context(|| format!("Failed file open {:?}", self.file))?
            .read_to_end(&mut buff)?;

        Ok(buff)
    }

    fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);

        writer.write_record(self.columns.iter().map(Column::name))?;
        for record in &self.records {
            writer.write_record(self.columns.iter().map(|column| column.cell(record)))?;
        }
        writer.flush()?;

        Ok(())
    }
}

impl SalesDataset for CsvSalesDataset {
    fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    fn records_mut(&mut self, _token: sealed::Token) -> &mut Vec<SalesRecord> {
        &mut self.records
    }

    fn save(&mut self) -> Result<()> {
        let dir = match self.file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp_file = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed temp file creation in {:?}", dir))?;

        self.write_to(&mut tmp_file)
            .with_context(|| format!("Failed csv writing {:?}", self.file))?;

        tmp_file.flush()?;
        tmp_file
            .persist(self.file.as_path())
            .with_context(|| format!("Failed persisting {:?}", self.file))?;

        self.saved_records = self.records.clone();
        log::debug!("Saved {} sales records to {:?}", self.records.len(), self.file);

        Ok(())
    }

    fn cancel(&mut self) {
        self.records = self.saved_records.clone();
    }
}
