//! DNB metadata retrieval
//!
//! Retrieves bibliographic metadata from the Deutsche Nationalbibliothek
//! SRU service and normalizes MARC21 records into structured book
//! records: title, series, authors, publication data, subjects,
//! identifiers and cover availability.

pub mod config;
pub mod error;
pub mod marc;
pub mod models;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use models::book::BookRecord;
pub use services::metadata::SearchRequest;
