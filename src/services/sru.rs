//! SRU search execution against the DNB catalog.
//!
//! Builds the searchRetrieve URL, fetches the response through the
//! transport seam, NFC-normalizes the payload (the DNB serves decomposed
//! UTF-8) and decodes the embedded MARC21-slim records.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

use crate::config::SruConfig;
use crate::error::{AppError, AppResult};
use crate::marc::parser::{strip_xml_ns, MarcRecord, XmlRecord};

/// HTTP seam for the SRU endpoint, the deposit server and the cover
/// probe. Mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SruTransport: Send + Sync {
    /// Fetch a URL and return the response body.
    async fn get(&self, url: &str) -> AppResult<String>;
    /// Probe a URL with a HEAD request; `Ok(true)` on a success status.
    async fn head(&self, url: &str) -> AppResult<bool>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout_seconds: u64) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SruTransport for HttpTransport {
    async fn get(&self, url: &str) -> AppResult<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    async fn head(&self, url: &str) -> AppResult<bool> {
        let response = self.client.head(url).send().await?;
        Ok(response.status().is_success())
    }
}

/// SRU searchRetrieve client.
#[derive(Clone)]
pub struct SruClient {
    config: SruConfig,
    transport: Arc<dyn SruTransport>,
}

impl SruClient {
    pub fn new(config: SruConfig, transport: Arc<dyn SruTransport>) -> Self {
        Self { config, transport }
    }

    /// Execute one SRU query and return the decoded MARC records. An
    /// empty result set yields an empty vector.
    pub async fn search(&self, query: &str) -> AppResult<Vec<MarcRecord>> {
        // the SRU endpoint chokes on "+" and "?" in queries
        let query = query.replace(['+', '?'], "");

        let url = self.build_url(&query)?;
        tracing::info!("SRU query: {}", query);
        tracing::debug!("SRU url: {}", url);

        let body = self.transport.get(&url).await?;
        let body: String = body.nfc().collect();

        let records = decode_response(&body)?;
        tracing::info!("got {} records", records.len());
        Ok(records)
    }

    fn build_url(&self, query: &str) -> AppResult<String> {
        let mut url = reqwest::Url::parse(&self.config.base_url)
            .map_err(|e| AppError::Transport(format!("invalid SRU base URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("version", "1.1")
            .append_pair("operation", "searchRetrieve")
            .append_pair("recordSchema", "MARC21-xml")
            .append_pair("maximumRecords", &self.config.maximum_records.to_string())
            .append_pair("query", query);
        Ok(url.to_string())
    }
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchRetrieveResponse {
    #[serde(rename = "numberOfRecords", default)]
    number_of_records: Option<String>,
    #[serde(default)]
    records: Option<ResponseRecords>,
    #[serde(default)]
    diagnostics: Option<Diagnostics>,
}

#[derive(Debug, Deserialize, Default)]
struct ResponseRecords {
    #[serde(rename = "record", default)]
    records: Vec<ResponseRecord>,
}

#[derive(Debug, Deserialize)]
struct ResponseRecord {
    #[serde(rename = "recordData")]
    record_data: Option<RecordData>,
}

#[derive(Debug, Deserialize)]
struct RecordData {
    #[serde(default)]
    record: Option<XmlRecord>,
}

#[derive(Debug, Deserialize, Default)]
struct Diagnostics {
    #[serde(rename = "diagnostic", default)]
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Deserialize)]
struct Diagnostic {
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Decode a searchRetrieve response into MARC records. SRU reports
/// failures in-band as diagnostics; those surface as errors.
fn decode_response(body: &str) -> AppResult<Vec<MarcRecord>> {
    let stripped = strip_xml_ns(body);
    let envelope: SearchRetrieveResponse = quick_xml::de::from_str(&stripped)
        .map_err(|e| AppError::Xml(format!("failed to parse SRU response: {}", e)))?;

    if let Some(diagnostic) = envelope
        .diagnostics
        .as_ref()
        .and_then(|d| d.diagnostics.first())
    {
        let text: Vec<&str> = [diagnostic.details.as_deref(), diagnostic.message.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        return Err(AppError::SruDiagnostic(text.join(": ")));
    }

    let total: u32 = envelope
        .number_of_records
        .as_deref()
        .map(str::trim)
        .ok_or_else(|| AppError::InvalidResponse("missing numberOfRecords".to_string()))?
        .parse()
        .map_err(|_| AppError::InvalidResponse("unparsable numberOfRecords".to_string()))?;
    if total == 0 {
        return Ok(Vec::new());
    }

    Ok(envelope
        .records
        .map(|r| r.records)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|r| r.record_data?.record)
        .map(MarcRecord::from)
        .collect())
}
