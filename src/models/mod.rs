//! Data models for dnb-meta

pub mod book;

pub use book::{BookRecord, Candidate};
