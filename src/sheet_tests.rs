// src/sheet_tests.rs

#[cfg(test)]
mod tests {
    use crate::row::{CellValue, ExportRow, ANSWER_SLOTS};
    use crate::sheet::*;
    use std::fs;

    fn sample_row(date: &str) -> ExportRow {
        ExportRow {
            participant_id: "P001".to_string(),
            email: "p001@example.com".to_string(),
            date: date.to_string(),
            time: "10:30".to_string(),
            responded: true,
            answers: vec![CellValue::Integer(1); ANSWER_SLOTS],
        }
    }

    #[test]
    fn test_header_layout() {
        let headers = ResponseSheet::headers();

        assert_eq!(headers.len(), 5 + ANSWER_SLOTS);
        assert_eq!(
            &headers[..5],
            &["ParticipantID", "Email", "Date", "Time", "Responded"]
        );
        assert_eq!(headers[5], "MADRS_Q1");
        assert_eq!(headers[14], "MADRS_Q10");
        assert_eq!(headers[15], "Sleep_Q1");
        assert_eq!(headers[20], "Sleep_Q6");
        assert_eq!(headers[21], "Feedback_Q1");
        assert_eq!(headers[23], "Feedback_Q3");
    }

    #[test]
    fn test_rows_append_in_order() {
        let mut sheet = ResponseSheet::new();
        assert_eq!(sheet.row_count(), 0);

        sheet.append(sample_row("2024-01-02"));
        sheet.append(sample_row("2024-01-01"));

        assert_eq!(sheet.row_count(), 2);
        // Append-only: no re-sort happens on accumulation
        assert_eq!(sheet.rows()[0].date, "2024-01-02");
        assert_eq!(sheet.rows()[1].date, "2024-01-01");
    }

    #[test]
    fn test_save_produces_timestamped_xlsx() {
        let dir = tempfile::tempdir().unwrap();

        let mut sheet = ResponseSheet::new();
        sheet.append(sample_row("2024-01-15"));

        let path = sheet.save(dir.path()).expect("save should succeed");

        let filename = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(filename.starts_with("AllResponses_"));
        assert!(filename.ends_with(".xlsx"));

        // XLSX files are ZIP containers
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[0..2], b"PK");
    }

    #[test]
    fn test_save_creates_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("exports").join("responses");

        let sheet = ResponseSheet::new();
        let path = sheet.save(&nested).expect("save should create directories");

        assert!(nested.is_dir());
        assert!(path.exists());
    }

    #[test]
    fn test_empty_sheet_still_writes_header_only_workbook() {
        let dir = tempfile::tempdir().unwrap();

        let sheet = ResponseSheet::new();
        assert_eq!(sheet.row_count(), 0);

        let path = sheet.save(dir.path()).expect("save should succeed");
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[0..2], b"PK");
    }
}
