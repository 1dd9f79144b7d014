//! CSV input reader.

use std::path::Path;
use tracing::debug;

use crate::error::ImportError;
use crate::models::CustomerRecord;

/// Read every customer row from `path`.
///
/// The header must contain each of `required`. Cells are trimmed. Rows may
/// be shorter or longer than the header: missing cells are absent from the
/// record and surplus cells are dropped. The file is closed before this
/// returns.
pub fn read_customers(path: &Path, required: &[String]) -> Result<Vec<CustomerRecord>, ImportError> {
    let shown = path.display().to_string();
    let csv_error = |source: csv::Error| ImportError::Csv {
        path: shown.clone(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let headers = reader.headers().map_err(csv_error)?.clone();
    if let Some(column) = required.iter().find(|c| !headers.iter().any(|h| h == c.as_str())) {
        return Err(ImportError::MissingColumn {
            path: shown.clone(),
            column: column.clone(),
        });
    }

    let mut customers = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        customers.push(CustomerRecord::new(headers.iter().zip(row.iter())));
    }

    debug!(path = %shown, rows = customers.len(), "read customers");
    Ok(customers)
}
