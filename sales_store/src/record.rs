use chrono::NaiveDate;
use thiserror::Error;

pub const ITEM_DESCRIPTION: &str = "ITEM DESCRIPTION";
pub const YEAR: &str = "YEAR";
pub const MONTH: &str = "MONTH";
pub const RETAIL_SALES: &str = "RETAIL SALES";
pub const SUPPLIER: &str = "SUPPLIER";

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldViolation {
    #[error("ITEM DESCRIPTION must not be empty")]
    EmptyDescription,
    #[error("YEAR {0} is outside 2000..=2100")]
    YearOutOfRange(i32),
    #[error("MONTH {0} is outside 1..=12")]
    MonthOutOfRange(i32),
    #[error("RETAIL SALES {0} must be a non-negative amount")]
    NegativeSales(f64),
}

impl FieldViolation {
    /// Storage column the violation refers to.
    pub fn field(&self) -> &'static str {
        match self {
            FieldViolation::EmptyDescription => ITEM_DESCRIPTION,
            FieldViolation::YearOutOfRange(_) => YEAR,
            FieldViolation::MonthOutOfRange(_) => MONTH,
            FieldViolation::NegativeSales(_) => RETAIL_SALES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {}", .violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn fields(&self) -> Vec<&'static str> {
        self.violations.iter().map(FieldViolation::field).collect()
    }
}

/// Single transaction row of the dataset.
///
/// Only constructed through [`NewSalesRecord::into_record`], so every instance
/// satisfies the field domains and carries a valid derived date.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    item_description: String,
    year: i32,
    month: i32,
    retail_sales: f64,
    supplier: Option<String>,
    date: NaiveDate,
    pub(crate) extra: Vec<String>,
}

impl SalesRecord {
    pub fn item_description(&self) -> &str {
        &self.item_description
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> i32 {
        self.month
    }

    pub fn retail_sales(&self) -> f64 {
        self.retail_sales
    }

    pub fn supplier(&self) -> Option<&str> {
        self.supplier.as_deref()
    }

    /// First day of the record's (year, month).
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Values of the non-core columns, in storage column order.
    pub fn extra(&self) -> &[String] {
        &self.extra
    }
}

/// User supplied values for a record that is not part of the dataset yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSalesRecord {
    pub item_description: String,
    pub year: i32,
    pub month: i32,
    pub retail_sales: f64,
    pub supplier: Option<String>,
}

impl NewSalesRecord {
    pub fn new<S: Into<String>>(item_description: S, year: i32, month: i32, retail_sales: f64) -> Self {
        NewSalesRecord {
            item_description: item_description.into(),
            year,
            month,
            retail_sales,
            supplier: None,
        }
    }

    pub fn with_supplier<S: Into<String>>(mut self, supplier: S) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    /// Checks every field and reports all violations at once.
    pub fn validate(&self) -> Result<NaiveDate, ValidationError> {
        let mut violations = Vec::new();

        if self.item_description.trim().is_empty() {
            violations.push(FieldViolation::EmptyDescription);
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&self.year) {
            violations.push(FieldViolation::YearOutOfRange(self.year));
        }
        if !(1..=12).contains(&self.month) {
            violations.push(FieldViolation::MonthOutOfRange(self.month));
        }
        // NaN fails this comparison too
        if !(self.retail_sales >= 0.0 && self.retail_sales.is_finite()) {
            violations.push(FieldViolation::NegativeSales(self.retail_sales));
        }

        if !violations.is_empty() {
            return Err(ValidationError { violations });
        }

        NaiveDate::from_ymd_opt(self.year, self.month as u32, 1).ok_or(ValidationError {
            violations: vec![FieldViolation::MonthOutOfRange(self.month)],
        })
    }

    pub fn into_record(self) -> Result<SalesRecord, ValidationError> {
        let date = self.validate()?;

        Ok(SalesRecord {
            item_description: self.item_description,
            year: self.year,
            month: self.month,
            retail_sales: self.retail_sales,
            supplier: self.supplier.filter(|supplier| !supplier.is_empty()),
            date,
            extra: Vec::new(),
        })
    }
}
