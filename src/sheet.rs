// src/sheet.rs

use crate::row::{CellValue, ExportRow, FEEDBACK_SLOTS, MADRS_SLOTS, SLEEP_SLOTS};
use chrono::Local;
use rust_xlsxwriter::{Workbook, XlsxError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const WORKSHEET_NAME: &str = "All Responses";
pub const OUTPUT_FILE_PREFIX: &str = "AllResponses";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Spreadsheet generation error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("File I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },
}

fn io_context<E: Into<std::io::Error>, S: Into<String>>(source: E, context: S) -> SheetError {
    SheetError::Io {
        source: source.into(),
        context: context.into(),
    }
}

/// The in-memory sheet: a fixed header plus appended rows, serialized to an
/// XLSX workbook only once the export loop has finished. Nothing touches the
/// filesystem before `save`.
#[derive(Debug, Default)]
pub struct ResponseSheet {
    rows: Vec<ExportRow>,
}

impl ResponseSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed 23-column header row.
    pub fn headers() -> Vec<String> {
        let mut headers: Vec<String> = ["ParticipantID", "Email", "Date", "Time", "Responded"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        headers.extend((1..=MADRS_SLOTS).map(|i| format!("MADRS_Q{}", i)));
        headers.extend((1..=SLEEP_SLOTS).map(|i| format!("Sleep_Q{}", i)));
        headers.extend((1..=FEEDBACK_SLOTS).map(|i| format!("Feedback_Q{}", i)));
        headers
    }

    /// Append-only; rows keep the order the export loop produced them in.
    pub fn append(&mut self, row: ExportRow) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[ExportRow] {
        &self.rows
    }

    /// Serializes the sheet to `<output_dir>/AllResponses_<timestamp>.xlsx`,
    /// creating the directory if needed, and returns the written path.
    pub fn save(&self, output_dir: &Path) -> Result<PathBuf, SheetError> {
        fs::create_dir_all(output_dir).map_err(|e| {
            io_context(
                e,
                format!("Failed to create output directory: {:?}", output_dir),
            )
        })?;

        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        let filename = format!("{}_{}.xlsx", OUTPUT_FILE_PREFIX, timestamp);
        let filepath = output_dir.join(filename);

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(WORKSHEET_NAME)?;

        for (col, header) in Self::headers().iter().enumerate() {
            worksheet.write(0, col as u16, header.as_str())?;
        }

        for (idx, row) in self.rows.iter().enumerate() {
            let sheet_row = (idx + 1) as u32;
            for (col, cell) in row.cells().iter().enumerate() {
                let col = col as u16;
                match cell {
                    CellValue::Text(s) => worksheet.write(sheet_row, col, s.as_str())?,
                    CellValue::Integer(n) => worksheet.write(sheet_row, col, *n)?,
                    CellValue::Number(n) => worksheet.write(sheet_row, col, *n)?,
                    CellValue::Bool(b) => worksheet.write(sheet_row, col, *b)?,
                };
            }
        }

        workbook.save(&filepath)?;
        info!("Wrote {} rows to {:?}", self.rows.len(), filepath);

        Ok(filepath)
    }
}
