// src/row.rs

use crate::export::{ResponseRecord, UserDayRecords, UserRecord};
use crate::firestore::FirestoreValue;

/// Sentinel written into any cell with no applicable value.
pub const NOT_APPLICABLE: &str = "N/A";

pub const MADRS_SLOTS: usize = 10;
pub const SLEEP_SLOTS: usize = 6;
pub const FEEDBACK_SLOTS: usize = 3;
pub const ANSWER_SLOTS: usize = MADRS_SLOTS + SLEEP_SLOTS + FEEDBACK_SLOTS;

/// Scalar destined for one spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn not_applicable() -> Self {
        CellValue::Text(NOT_APPLICABLE.to_string())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

/// The flattened output unit: one (user, date) pair, 23 cells wide.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub participant_id: String,
    pub email: String,
    pub date: String,
    pub time: String,
    pub responded: bool,
    pub answers: Vec<CellValue>,
}

impl ExportRow {
    /// The full 23-cell row in header order.
    pub fn cells(&self) -> Vec<CellValue> {
        let mut cells = Vec::with_capacity(5 + ANSWER_SLOTS);
        cells.push(CellValue::from(self.participant_id.as_str()));
        cells.push(CellValue::from(self.email.as_str()));
        cells.push(CellValue::from(self.date.as_str()));
        cells.push(CellValue::from(self.time.as_str()));
        cells.push(CellValue::from(if self.responded { "YES" } else { "NO" }));
        cells.extend(self.answers.iter().cloned());
        cells
    }
}

/// Builds the row for one (user, date) pair from the four record maps.
///
/// A missing attendance record means not-responded, and a not-responded day
/// is terminal: no response lookups happen, every answer slot gets the
/// sentinel.
pub fn build_row(user: &UserRecord, date: &str, records: &UserDayRecords) -> ExportRow {
    let responded = records
        .status_by_date
        .get(date)
        .map(|status| status.responded)
        .unwrap_or(false);

    if !responded {
        return ExportRow {
            participant_id: user.participant_id.clone(),
            email: user.email.clone(),
            date: date.to_string(),
            time: NOT_APPLICABLE.to_string(),
            responded: false,
            answers: vec![CellValue::not_applicable(); ANSWER_SLOTS],
        };
    }

    let madrs = records.madrs_by_date.get(date);
    let sleep = records.sleep_by_date.get(date);
    let feedback = records.feedback_by_date.get(date);

    let time = madrs
        .and_then(|record| record.time.clone())
        .unwrap_or_else(|| NOT_APPLICABLE.to_string());

    let mut answers = Vec::with_capacity(ANSWER_SLOTS);
    answers.extend(answer_block(madrs, MADRS_SLOTS));
    answers.extend(answer_block(sleep, SLEEP_SLOTS));
    answers.extend(answer_block(feedback, FEEDBACK_SLOTS));

    ExportRow {
        participant_id: user.participant_id.clone(),
        email: user.email.clone(),
        date: date.to_string(),
        time,
        responded: true,
        answers,
    }
}

/// Normalizes a record's answers and fits them to a fixed width: short
/// blocks are right-padded with the sentinel, extra answers are dropped.
fn answer_block(record: Option<&ResponseRecord>, width: usize) -> Vec<CellValue> {
    let answers = record.map(|r| r.answers.as_slice()).unwrap_or_default();
    let mut block: Vec<CellValue> = answers
        .iter()
        .take(width)
        .map(|answer| map_answer(Some(answer)))
        .collect();
    block.resize(width, CellValue::not_applicable());
    block
}

/// Maps one raw answer to its cell value.
///
/// Absent, null, and empty-string answers become the sentinel. A map
/// carrying a `value` field yields that field's scalar untouched; a map
/// carrying only a `text` field yields the text, trimmed when it is a
/// string, recursing a single level. Plain strings are trimmed; other
/// scalars pass through unchanged.
pub fn map_answer(answer: Option<&FirestoreValue>) -> CellValue {
    let Some(value) = answer else {
        return CellValue::not_applicable();
    };

    match value {
        FirestoreValue::Null(_) => CellValue::not_applicable(),
        FirestoreValue::String(s) if s.is_empty() => CellValue::not_applicable(),
        FirestoreValue::String(s) => CellValue::Text(s.trim().to_string()),
        FirestoreValue::Map(map) => {
            if let Some(inner) = map.fields.get("value") {
                raw_cell(inner)
            } else if let Some(inner) = map.fields.get("text") {
                match inner {
                    FirestoreValue::String(s) => CellValue::Text(s.trim().to_string()),
                    other => raw_cell(other),
                }
            } else {
                CellValue::not_applicable()
            }
        }
        other => raw_cell(other),
    }
}

/// Scalar pass-through with no trimming or empty-string substitution.
/// Non-scalar shapes (nested maps, arrays) resolve to the sentinel rather
/// than erroring.
fn raw_cell(value: &FirestoreValue) -> CellValue {
    match value {
        FirestoreValue::String(s) => CellValue::Text(s.clone()),
        FirestoreValue::Boolean(b) => CellValue::Bool(*b),
        FirestoreValue::Integer(raw) => match raw.parse::<i64>() {
            Ok(n) => CellValue::Integer(n),
            Err(_) => CellValue::Text(raw.clone()),
        },
        FirestoreValue::Double(n) => CellValue::Number(*n),
        FirestoreValue::Timestamp(ts) => CellValue::Text(ts.clone()),
        FirestoreValue::Null(_) | FirestoreValue::Map(_) | FirestoreValue::Array(_) => {
            CellValue::not_applicable()
        }
    }
}
