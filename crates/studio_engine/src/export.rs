use std::path::PathBuf;

use studio_logging::{studio_info, studio_warn};

use crate::format::{export_csv, FormatError};
use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("{0}")]
    Format(#[from] FormatError),
    #[error("could not write export: {0}")]
    Persist(#[from] PersistError),
}

/// Converts a panel result to CSV and writes it as `filename`. Nothing is
/// written when the result holds no table.
pub fn export_csv_file(
    writer: &AtomicFileWriter,
    filename: &str,
    result: &str,
) -> Result<PathBuf, ExportError> {
    let csv = export_csv(result).inspect_err(|err| {
        studio_warn!("Export of {} skipped: {}", filename, err);
    })?;
    let path = writer.write(filename, &csv)?;
    studio_info!("Exported {} bytes to {:?}", csv.len(), path);
    Ok(path)
}
