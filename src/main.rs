// src/main.rs
use anyhow::{Context, Result};
use std::{env, path::PathBuf};
use thiserror::Error;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod export;
mod filter;
mod firestore;
mod row;
mod sheet;

mod firestore_tests;
mod sheet_tests;

use export::ExportService;
use filter::{ExportFilter, FilterError};
use firestore::{FirestoreClient, FirestoreConfig, FirestoreError};
use sheet::{ResponseSheet, SheetError};

pub const DEFAULT_OUTPUT_DIR: &str = "AlluserResponses";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Firestore client error")]
    Firestore(#[from] FirestoreError),
    #[error("Export selection error")]
    Filter(#[from] FilterError),
    #[error("Spreadsheet output error")]
    Sheet(#[from] SheetError),
}

#[derive(Debug, Clone)]
struct AppConfig {
    firestore: FirestoreConfig,
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Setting tracing subscriber failed")?;

    let config = load_app_config().context("Loading configuration failed")?;
    info!("Configuration loaded.");

    // Malformed input aborts here, before any remote access and before any
    // file exists.
    let export_filter = ExportFilter::resolve_interactive().context("Export selection failed")?;

    let mut sheet = ResponseSheet::new();

    let client =
        FirestoreClient::new(config.firestore.clone()).context("Firestore setup failed")?;

    let service = ExportService::new(&client);
    let total_rows = service
        .run(&export_filter, &mut sheet)
        .await
        .context("Export failed")?;

    let filepath = sheet
        .save(&config.output_dir)
        .context("Saving spreadsheet failed")?;

    client.close();

    println!("\nExport completed successfully!");
    println!("File saved at: {}", filepath.display());
    println!("Total rows exported: {}", total_rows);

    Ok(())
}

fn load_app_config() -> Result<AppConfig, AppError> {
    Ok(AppConfig {
        firestore: FirestoreConfig {
            project_id: env::var("FIRESTORE_PROJECT_ID")
                .map_err(|_| AppError::MissingEnvVar("FIRESTORE_PROJECT_ID".to_string()))?,
            token_file_path: env::var("FIRESTORE_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(firestore::DEFAULT_TOKEN_FILE)),
            base_url: env::var("FIRESTORE_BASE_URL")
                .unwrap_or_else(|_| firestore::FIRESTORE_API_BASE_URL.to_string()),
        },
        output_dir: env::var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR)),
    })
}
