//! Cover availability probing and the identifier cache.
//!
//! The cover endpoint is keyed by ISBN. Once a probe succeeds the URL is
//! remembered for the record's IDN, and alternate-edition ISBNs are
//! remembered too, so later cover requests resolve without a search.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::CoverConfig;
use crate::services::sru::SruTransport;

#[derive(Default)]
struct IdentifierCache {
    isbn_to_idn: HashMap<String, String>,
    idn_to_cover_url: HashMap<String, String>,
}

pub struct CoverService {
    config: CoverConfig,
    transport: Arc<dyn SruTransport>,
    cache: RwLock<IdentifierCache>,
}

impl CoverService {
    pub fn new(config: CoverConfig, transport: Arc<dyn SruTransport>) -> Self {
        Self {
            config,
            transport,
            cache: RwLock::new(IdentifierCache::default()),
        }
    }

    fn cover_url_for(&self, isbn: &str) -> String {
        self.config.url_template.replace("{isbn}", isbn)
    }

    /// Remember that an (alternate-edition) ISBN belongs to a record.
    pub fn cache_isbn_to_identifier(&self, isbn: &str, idn: &str) {
        if let Ok(mut cache) = self.cache.write() {
            cache.isbn_to_idn.insert(isbn.to_string(), idn.to_string());
        }
    }

    /// Resolve a cover URL from cached identifiers: IDN directly, or via
    /// a remembered ISBN.
    pub fn cached_cover_url(&self, idn: Option<&str>, isbn: Option<&str>) -> Option<String> {
        let cache = self.cache.read().ok()?;
        let idn = match idn {
            Some(idn) => idn.to_string(),
            None => cache.isbn_to_idn.get(isbn?)?.clone(),
        };
        cache.idn_to_cover_url.get(&idn).cloned()
    }

    /// HEAD-probe the cover endpoint for each candidate ISBN in order;
    /// the first hit is cached for the record's IDN and returned.
    pub async fn probe(&self, idn: Option<&str>, isbns: &[String]) -> Option<String> {
        for isbn in isbns {
            let url = self.cover_url_for(isbn);
            match self.transport.head(&url).await {
                Ok(true) => {
                    tracing::info!("found cover at {}", url);
                    if let Some(idn) = idn {
                        if let Ok(mut cache) = self.cache.write() {
                            cache.idn_to_cover_url.insert(idn.to_string(), url.clone());
                        }
                    }
                    return Some(url);
                }
                Ok(false) => continue,
                Err(e) => {
                    tracing::debug!("cover probe failed for {}: {}", url, e);
                    continue;
                }
            }
        }
        None
    }
}
