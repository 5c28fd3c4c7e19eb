// src/export.rs

use crate::filter::ExportFilter;
use crate::firestore::{Document, FirestoreClient, FirestoreValue};
use crate::row::build_row;
use crate::sheet::ResponseSheet;
use crate::AppError;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

pub const USERS_COLLECTION: &str = "Users";
pub const DAILY_STATUS_COLLECTION: &str = "DailyStatus";
pub const DAILY_STATUS_USER_FIELD: &str = "userID";
pub const MADRS_COLLECTION: &str = "MADRSResponses";
pub const SLEEP_DIARY_COLLECTION: &str = "SleepDiaryResponses";
pub const DEVICE_FEEDBACK_COLLECTION: &str = "DeviceFeedbackResponses";

/// Identity record from the `Users` collection. Read-only to this tool.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub uid: String,
    pub participant_id: String,
    pub email: String,
}

impl UserRecord {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            uid: doc.id().to_string(),
            participant_id: doc
                .string_field("participantID")
                .unwrap_or_default()
                .to_string(),
            // Emails are matched and exported lowercased
            email: doc.string_field("email").unwrap_or_default().to_lowercase(),
        }
    }
}

/// Per (user, date) flag from `DailyStatus`. An absent `responded` field
/// reads as not-responded.
#[derive(Debug, Clone, Default)]
pub struct AttendanceStatus {
    pub responded: bool,
}

impl AttendanceStatus {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            responded: doc.bool_field("responded").unwrap_or(false),
        }
    }
}

/// One day's entry from a response subcollection: a time-of-day string and
/// the `responses` map's values in key order.
#[derive(Debug, Clone, Default)]
pub struct ResponseRecord {
    pub time: Option<String>,
    pub answers: Vec<FirestoreValue>,
}

impl ResponseRecord {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            time: doc.string_field("time").map(str::to_string),
            answers: doc
                .map_field("responses")
                .map(|fields| fields.values().cloned().collect())
                .unwrap_or_default(),
        }
    }
}

/// The four date-keyed record maps fetched for one user.
#[derive(Debug, Default)]
pub struct UserDayRecords {
    pub status_by_date: HashMap<String, AttendanceStatus>,
    pub madrs_by_date: HashMap<String, ResponseRecord>,
    pub sleep_by_date: HashMap<String, ResponseRecord>,
    pub feedback_by_date: HashMap<String, ResponseRecord>,
}

impl UserDayRecords {
    /// Indexes the raw documents of all four collections by their `date`
    /// field. Documents without a date have no key and are skipped.
    pub fn from_documents(
        status: &[Document],
        madrs: &[Document],
        sleep: &[Document],
        feedback: &[Document],
    ) -> Self {
        Self {
            status_by_date: index_status_by_date(status),
            madrs_by_date: index_responses_by_date(madrs),
            sleep_by_date: index_responses_by_date(sleep),
            feedback_by_date: index_responses_by_date(feedback),
        }
    }

    /// Union of the dates across all four maps, ascending. Date keys are
    /// YYYY-MM-DD strings, so lexicographic order is chronological.
    pub fn dates(&self) -> Vec<String> {
        let mut dates: BTreeSet<&String> = BTreeSet::new();
        dates.extend(self.status_by_date.keys());
        dates.extend(self.madrs_by_date.keys());
        dates.extend(self.sleep_by_date.keys());
        dates.extend(self.feedback_by_date.keys());
        dates.into_iter().cloned().collect()
    }
}

fn subcollection_path(uid: &str, collection: &str) -> String {
    format!("{}/{}/{}", USERS_COLLECTION, uid, collection)
}

fn index_status_by_date(documents: &[Document]) -> HashMap<String, AttendanceStatus> {
    let mut by_date = HashMap::new();
    for doc in documents {
        match doc.string_field("date") {
            // Duplicate dates overwrite in arrival order: last write wins.
            Some(date) => {
                by_date.insert(date.to_string(), AttendanceStatus::from_document(doc));
            }
            None => warn!("Skipping status document '{}' with no date field", doc.id()),
        }
    }
    by_date
}

fn index_responses_by_date(documents: &[Document]) -> HashMap<String, ResponseRecord> {
    let mut by_date = HashMap::new();
    for doc in documents {
        match doc.string_field("date") {
            Some(date) => {
                by_date.insert(date.to_string(), ResponseRecord::from_document(doc));
            }
            None => warn!(
                "Skipping response document '{}' with no date field",
                doc.id()
            ),
        }
    }
    by_date
}

/// Drives the export against a borrowed client: the caller keeps ownership
/// so it can close the client once the run is over.
pub struct ExportService<'a> {
    client: &'a FirestoreClient,
}

impl<'a> ExportService<'a> {
    pub fn new(client: &'a FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn fetch_users(&self) -> Result<Vec<UserRecord>, AppError> {
        info!("Fetching all users...");
        let documents = self.client.list_collection(USERS_COLLECTION).await?;
        info!("Fetched {} users", documents.len());
        Ok(documents.iter().map(UserRecord::from_document).collect())
    }

    /// Fetches the attendance statuses and the three response subcollections
    /// for one user. Any failure aborts the whole export; there is no
    /// per-user recovery.
    pub async fn fetch_user_days(&self, uid: &str) -> Result<UserDayRecords, AppError> {
        debug!("Fetching daily statuses for user {}", uid);
        let status_docs = self
            .client
            .query_collection_by_field(DAILY_STATUS_COLLECTION, DAILY_STATUS_USER_FIELD, uid)
            .await?;

        let madrs_docs = self
            .client
            .list_collection(&subcollection_path(uid, MADRS_COLLECTION))
            .await?;
        let sleep_docs = self
            .client
            .list_collection(&subcollection_path(uid, SLEEP_DIARY_COLLECTION))
            .await?;
        let feedback_docs = self
            .client
            .list_collection(&subcollection_path(uid, DEVICE_FEEDBACK_COLLECTION))
            .await?;

        Ok(UserDayRecords::from_documents(
            &status_docs,
            &madrs_docs,
            &sleep_docs,
            &feedback_docs,
        ))
    }

    /// The main export loop: one row per matching user per relevant date,
    /// appended in iteration order. Returns the total row count.
    pub async fn run(
        &self,
        filter: &ExportFilter,
        sheet: &mut ResponseSheet,
    ) -> Result<usize, AppError> {
        let users = self.fetch_users().await?;

        for user in &users {
            if !filter.matches_user(&user.participant_id, &user.email) {
                debug!("Skipping user {} (identity filter)", user.uid);
                continue;
            }

            let records = self.fetch_user_days(&user.uid).await?;
            let mut user_rows = 0usize;

            for date in records.dates() {
                if !filter.includes_date(&date) {
                    continue;
                }
                sheet.append(build_row(user, &date, &records));
                user_rows += 1;
            }

            info!(
                "User {} ({}): {} rows",
                user.uid, user.participant_id, user_rows
            );
        }

        Ok(sheet.row_count())
    }
}
