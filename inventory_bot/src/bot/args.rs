use sales_store::record::NewSalesRecord;
use thiserror::Error;

pub const ADD_USAGE: &str = "/add <item>;<year>;<month>;<retail sales>[;<supplier>]";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AddArgsError {
    #[error("expected 4 or 5 values separated by ';', got {0}")]
    Arity(usize),
    #[error("{field} must be a number, got {value:?}")]
    NotANumber { field: &'static str, value: String },
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, AddArgsError> {
    value.parse().map_err(|_| AddArgsError::NotANumber {
        field,
        value: value.to_string(),
    })
}

/// Splits `/add` arguments into a record. Domain checks are left to the dataset.
pub fn parse_add_args(args: &str) -> Result<NewSalesRecord, AddArgsError> {
    let parts: Vec<&str> = args.split(';').map(str::trim).collect();

    let (item, year, month, sales, supplier) = match parts.as_slice() {
        [item, year, month, sales] => (item, year, month, sales, None),
        [item, year, month, sales, supplier] => (item, year, month, sales, Some(supplier)),
        _ => return Err(AddArgsError::Arity(parts.len())),
    };

    let record = NewSalesRecord::new(
        *item,
        parse_number("year", year)?,
        parse_number("month", month)?,
        parse_number("retail sales", sales)?,
    );

    Ok(match supplier {
        Some(supplier) if !supplier.is_empty() => record.with_supplier(*supplier),
        _ => record,
    })
}
