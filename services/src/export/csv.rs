//! CSV export.

use super::ExportError;
use crate::database::EntryRow;

pub const CSV_HEADER: [&str; 5] = ["Date", "Title", "Content", "Mood Rating", "Tags"];

/// One row per entry in the given order; tags comma-joined, empty when none.
pub fn entries_to_csv(entries: &[EntryRow]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for entry in entries {
        writer.write_record([
            entry.date.format("%Y-%m-%d").to_string(),
            entry.title.clone(),
            entry.content.clone(),
            entry.mood_rating.to_string(),
            entry.tag_list(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))
}
