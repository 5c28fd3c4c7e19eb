// src/filter.rs

use chrono::NaiveDate;
use std::io::{BufRead, Write};
use thiserror::Error;
use tracing::debug;

pub const DATE_INPUT_FORMAT: &str = "%d/%m/%Y";
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid choice '{0}'. Enter a number between 1 and 4.")]
    InvalidChoice(String),

    #[error("Invalid date format '{0}'. Use dd/mm/yyyy.")]
    InvalidDate(String),

    #[error("Start date {0} is after end date {1}.")]
    InvertedRange(NaiveDate, NaiveDate),

    #[error("Participant ID or Email must not be empty.")]
    EmptyIdentity,

    #[error("Failed to read operator input: {0}")]
    Io(#[from] std::io::Error),
}

/// Which records a run exports. Resolved once from operator input and
/// immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    // Lowercased once at construction; matching is case-insensitive.
    identity: Option<String>,
}

impl ExportFilter {
    /// Unfiltered export (mode 1).
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, from: NaiveDate, to: NaiveDate) -> Result<Self, FilterError> {
        if from > to {
            return Err(FilterError::InvertedRange(from, to));
        }
        self.date_from = Some(from);
        self.date_to = Some(to);
        Ok(self)
    }

    pub fn with_identity(mut self, identity: &str) -> Result<Self, FilterError> {
        let trimmed = identity.trim();
        if trimmed.is_empty() {
            return Err(FilterError::EmptyIdentity);
        }
        self.identity = Some(trimmed.to_lowercase());
        Ok(self)
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.date_from.zip(self.date_to)
    }

    /// Case-insensitive match on participant code OR email. No identity
    /// filter matches every user.
    pub fn matches_user(&self, participant_id: &str, email: &str) -> bool {
        match &self.identity {
            Some(wanted) => {
                *wanted == participant_id.to_lowercase() || *wanted == email.to_lowercase()
            }
            None => true,
        }
    }

    /// Both bounds are inclusive. A date string that does not parse as
    /// YYYY-MM-DD is included rather than dropped.
    pub fn includes_date(&self, date_str: &str) -> bool {
        let Some((from, to)) = self.date_range() else {
            return true;
        };
        match NaiveDate::parse_from_str(date_str, DATE_KEY_FORMAT) {
            Ok(date) => from <= date && date <= to,
            Err(_) => {
                debug!("Unparseable record date '{}', not filtering it", date_str);
                true
            }
        }
    }

    /// Reads the mode selector and any mode-specific inputs. Prompts go to
    /// `output` so the interactive path is a thin stdin/stdout wrapper and
    /// this logic runs against plain buffers in tests.
    pub fn resolve<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Self, FilterError> {
        writeln!(output, "\nFirestore Response Export Tool")?;
        writeln!(output, "----------------------------------")?;
        writeln!(output, "Select an option to fetch data:\n")?;
        writeln!(output, "1. Fetch all users (all responses)")?;
        writeln!(
            output,
            "2. Fetch all users within a specific date range (dd/mm/yyyy - dd/mm/yyyy)"
        )?;
        writeln!(output, "3. Fetch specific user by Participant ID or Email")?;
        writeln!(output, "4. Fetch specific user + date range\n")?;

        let choice = prompt_line(input, output, "Enter your choice (1-4): ")?;
        let mode: u8 = match choice.as_str() {
            "1" => 1,
            "2" => 2,
            "3" => 3,
            "4" => 4,
            other => return Err(FilterError::InvalidChoice(other.to_string())),
        };

        let mut filter = ExportFilter::all();

        if mode == 2 || mode == 4 {
            let from_str = prompt_line(input, output, "Enter start date (dd/mm/yyyy): ")?;
            let to_str = prompt_line(input, output, "Enter end date (dd/mm/yyyy): ")?;
            let from = parse_input_date(&from_str)?;
            let to = parse_input_date(&to_str)?;
            filter = filter.with_date_range(from, to)?;
        }

        if mode == 3 || mode == 4 {
            let identity = prompt_line(input, output, "Enter Participant ID or Email: ")?;
            filter = filter.with_identity(&identity)?;
        }

        debug!("Resolved export filter: {:?}", filter);
        Ok(filter)
    }

    /// Interactive entry point over stdin/stdout.
    pub fn resolve_interactive() -> Result<Self, FilterError> {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        Self::resolve(&mut input, &mut output)
    }
}

fn parse_input_date(raw: &str) -> Result<NaiveDate, FilterError> {
    NaiveDate::parse_from_str(raw, DATE_INPUT_FORMAT)
        .map_err(|_| FilterError::InvalidDate(raw.to_string()))
}

fn prompt_line<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> Result<String, FilterError> {
    write!(output, "{}", prompt)?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}
