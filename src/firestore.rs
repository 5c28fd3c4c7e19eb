// src/firestore.rs

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

pub const FIRESTORE_API_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_TOKEN_FILE: &str = "firestore_token.json";
pub const LIST_PAGE_SIZE: u32 = 300;

// --- Firestore REST Data Structures ---

/// A typed Firestore field value as it appears on the REST wire.
/// External tagging matches the `{"stringValue": "..."}` JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FirestoreValue {
    #[serde(rename = "stringValue")]
    String(String),
    #[serde(rename = "booleanValue")]
    Boolean(bool),
    // Firestore serializes int64 as a decimal string
    #[serde(rename = "integerValue")]
    Integer(String),
    #[serde(rename = "doubleValue")]
    Double(f64),
    #[serde(rename = "timestampValue")]
    Timestamp(String),
    #[serde(rename = "nullValue")]
    Null(serde_json::Value),
    #[serde(rename = "mapValue")]
    Map(MapValue),
    #[serde(rename = "arrayValue")]
    Array(ArrayValue),
}

/// BTreeMap keeps fields in lexicographic key order, which is the order
/// Firestore itself reports map keys in (Q1, Q10, Q2, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<FirestoreValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,
}

impl Document {
    /// Document id: the last segment of the full resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or("")
    }

    pub fn string_field(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FirestoreValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn bool_field(&self, key: &str) -> Option<bool> {
        match self.fields.get(key) {
            Some(FirestoreValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn map_field(&self, key: &str) -> Option<&BTreeMap<String, FirestoreValue>> {
        match self.fields.get(key) {
            Some(FirestoreValue::Map(map)) => Some(&map.fields),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,
    pub next_page_token: Option<String>,
}

// --- Structured query types (documents:runQuery) ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<QueryFilter>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    pub field_filter: FieldFilter,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    pub field: FieldReference,
    pub op: String,
    pub value: FirestoreValue,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

/// One element of the streamed runQuery result. Elements carrying only a
/// read time (no document) are progress markers and are skipped.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryElement {
    pub document: Option<Document>,
    pub read_time: Option<String>,
}

// --- Google API error body parsing (keep for parsing error bodies) ---

#[derive(Debug, Clone, Deserialize)]
struct GoogleErrorPayload {
    error: GoogleErrorInfo,
}

#[derive(Debug, Clone, Deserialize)]
struct GoogleErrorInfo {
    message: Option<String>,
}

// --- Define Specific Firestore Error Type ---

#[derive(Error, Debug)]
pub enum FirestoreError {
    #[error("HTTP request failed")]
    Request(#[from] reqwest::Error),

    #[error("JSON processing error")]
    Json(#[from] serde_json::Error),

    #[error("File I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    #[error("URL parsing error")]
    UrlParse(#[from] url::ParseError),

    #[error("Access token not available (token missing or could not be loaded)")]
    MissingToken,

    #[error("Firestore API error: Status={status}, Message='{message}'")]
    ApiError { status: StatusCode, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// Helper to create context-aware IO errors
fn io_context<E: Into<std::io::Error>, S: Into<String>>(source: E, context: S) -> FirestoreError {
    FirestoreError::Io {
        source: source.into(),
        context: context.into(),
    }
}

// Configuration for the Firestore client
#[derive(Clone, Debug)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub token_file_path: PathBuf,
    pub base_url: String,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            token_file_path: PathBuf::from(DEFAULT_TOKEN_FILE),
            base_url: FIRESTORE_API_BASE_URL.to_string(),
        }
    }
}

/// Bearer token consumed as-is. Obtaining and refreshing it is the job of an
/// external collaborator (service-account tooling); this client only loads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAccessToken {
    pub access_token: String,
}

// --- Firestore REST Client Implementation ---

pub struct FirestoreClient {
    config: FirestoreConfig,
    http_client: Client,
    access_token: String,
}

impl FirestoreClient {
    /// Builds the HTTP client and loads the stored access token. Fails with
    /// `MissingToken` before any read is attempted if the token file is absent.
    pub fn new(config: FirestoreConfig) -> Result<Self, FirestoreError> {
        if config.project_id.is_empty() {
            return Err(FirestoreError::ConfigError(
                "Firestore project id must not be empty".to_string(),
            ));
        }

        // No request timeout: a hung read stalls the run rather than
        // producing a partial export.
        let http_client = Client::builder().build()?;

        let token = Self::load_token_data(&config.token_file_path)?
            .ok_or(FirestoreError::MissingToken)?;

        info!(
            "Firestore client initialized for project '{}'",
            config.project_id
        );

        Ok(Self {
            config,
            http_client,
            access_token: token.access_token,
        })
    }

    pub fn load_token_data(path: &Path) -> Result<Option<StoredAccessToken>, FirestoreError> {
        if !path.exists() {
            return Ok(None);
        }

        let json_string = fs::read_to_string(path)
            .map_err(|e| io_context(e, format!("Failed to read token file: {:?}", path)))?;
        let stored_token: StoredAccessToken = serde_json::from_str(&json_string)?;

        Ok(Some(stored_token))
    }

    /// Full URL for a path under this project's `documents` root. `suffix`
    /// starts with '/' for a collection path, or ':' for a method like
    /// `:runQuery`.
    fn documents_url(&self, suffix: &str) -> Result<String, FirestoreError> {
        let url = format!(
            "{}/projects/{}/databases/(default)/documents{}",
            self.config.base_url, self.config.project_id, suffix
        );
        Url::parse(&url)?;
        Ok(url)
    }

    fn build_request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
    }

    async fn send_and_deserialize<T: DeserializeOwned>(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<T, FirestoreError> {
        let response = request_builder.send().await?;
        let status = response.status();
        debug!("Response for '{}': Status={}", context_msg, status);

        if status.is_success() {
            let bytes = response.bytes().await?;
            match serde_json::from_slice::<T>(&bytes) {
                Ok(data) => Ok(data),
                Err(e) => {
                    debug!(
                        "JSON deserialization failed for '{}': {}",
                        context_msg, e
                    );
                    Err(FirestoreError::Json(e))
                }
            }
        } else {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            let message = match serde_json::from_str::<GoogleErrorPayload>(&error_body) {
                Ok(parsed) => parsed.error.message.unwrap_or(error_body),
                Err(_) => error_body,
            };
            Err(FirestoreError::ApiError { status, message })
        }
    }

    /// Lists every document of a collection, following `nextPageToken` until
    /// the store reports no further page. `collection_path` is relative to
    /// the documents root, e.g. `Users` or `Users/<uid>/MADRSResponses`.
    pub async fn list_collection(
        &self,
        collection_path: &str,
    ) -> Result<Vec<Document>, FirestoreError> {
        let base_url = self.documents_url(&format!("/{}", collection_path))?;

        let mut all_documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!("{}?pageSize={}", base_url, LIST_PAGE_SIZE);
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", token));
            }

            debug!("Listing '{}' (page token: {:?})", collection_path, page_token);
            let response: ListDocumentsResponse = self
                .send_and_deserialize(
                    self.build_request(Method::GET, &url),
                    &format!("list {}", collection_path),
                )
                .await?;

            all_documents.extend(response.documents);

            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            "Listed {} documents from '{}'",
            all_documents.len(),
            collection_path
        );
        Ok(all_documents)
    }

    /// Runs an equality query against a top-level collection, returning the
    /// matching documents.
    pub async fn query_collection_by_field(
        &self,
        collection_id: &str,
        field_path: &str,
        value: &str,
    ) -> Result<Vec<Document>, FirestoreError> {
        let url = self.documents_url(":runQuery")?;

        let request = RunQueryRequest {
            structured_query: StructuredQuery {
                from: vec![CollectionSelector {
                    collection_id: collection_id.to_string(),
                }],
                where_clause: Some(QueryFilter {
                    field_filter: FieldFilter {
                        field: FieldReference {
                            field_path: field_path.to_string(),
                        },
                        op: "EQUAL".to_string(),
                        value: FirestoreValue::String(value.to_string()),
                    },
                }),
            },
        };

        let elements: Vec<RunQueryElement> = self
            .send_and_deserialize(
                self.build_request(Method::POST, &url).json(&request),
                &format!("query {} by {}", collection_id, field_path),
            )
            .await?;

        let documents: Vec<Document> = elements
            .into_iter()
            .filter_map(|element| element.document)
            .collect();

        debug!(
            "Query on '{}' ({} == '{}') returned {} documents",
            collection_id,
            field_path,
            value,
            documents.len()
        );
        Ok(documents)
    }

    /// Explicit teardown. Consumes the client so no reads can follow; the
    /// connection pool is dropped on return.
    pub fn close(self) {
        info!(
            "Firestore client for project '{}' closed",
            self.config.project_id
        );
    }
}
