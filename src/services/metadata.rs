//! Metadata identification service.
//!
//! Orchestrates the whole identify flow: query variations, record
//! selection, alternate-edition lookups, comments retrieval, exact-IDN
//! enforcement, cover probing and final assembly. Results are emitted in
//! discovery order; the first query with usable records wins.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::marc::parser::MarcRecord;
use crate::marc::translator::{comment_url, extract_isbn, RecordSelector};
use crate::models::book::{BookRecord, Candidate};
use crate::services::cover::CoverService;
use crate::services::query::{create_query_variations, MATERIAL_EXCLUSION};
use crate::services::sru::{SruClient, SruTransport};

/// Search keys for one identify request. At least one of them must be
/// set; IDN and ISBN short-circuit the fuzzy title/author search.
#[derive(Debug, Default, Clone)]
pub struct SearchRequest {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub idn: Option<String>,
    pub isbn: Option<String>,
}

/// Placeholder author names that only get in the way of the search.
const IGNORED_AUTHORS: &[&str] = &["v. a.", "v.a.", "va", "diverse", "unknown", "unbekannt"];

pub struct MetadataService {
    sru: SruClient,
    cover: CoverService,
    selector: RecordSelector,
    transport: Arc<dyn SruTransport>,
}

impl MetadataService {
    pub fn new(config: &AppConfig, transport: Arc<dyn SruTransport>) -> Self {
        Self {
            sru: SruClient::new(config.sru.clone(), transport.clone()),
            cover: CoverService::new(config.cover.clone(), transport.clone()),
            selector: RecordSelector::new(&config.metadata),
            transport,
        }
    }

    /// Identify a book. Tries each query variation in order and returns
    /// the accepted candidates of the first one with usable records.
    pub async fn identify(&self, request: &SearchRequest) -> AppResult<Vec<BookRecord>> {
        let authors: Vec<String> = request
            .authors
            .iter()
            .filter(|a| !IGNORED_AUTHORS.iter().any(|i| a.eq_ignore_ascii_case(i)))
            .cloned()
            .collect();
        let isbn = request.isbn.as_deref().and_then(extract_isbn);

        if request.idn.is_none() && isbn.is_none() && request.title.is_none() && authors.is_empty()
        {
            return Err(AppError::InsufficientInput(
                "need at least one of ISBN, IDN, title or author".to_string(),
            ));
        }

        let variations = create_query_variations(
            request.idn.as_deref(),
            isbn.as_deref(),
            &authors,
            request.title.as_deref(),
        );

        for query in &variations {
            let records = match self.sru.search(query).await {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!("query failed: {}", e);
                    continue;
                }
            };
            if records.is_empty() {
                continue;
            }

            tracing::info!("parsing records");
            let mut results = Vec::new();
            for record in &records {
                if let Some(book) = self.process_record(record, request.idn.as_deref()).await {
                    results.push(book);
                }
            }

            // stop on the first query that produced usable candidates
            if !results.is_empty() {
                return Ok(results);
            }
        }

        Err(AppError::NoResult)
    }

    /// Resolve a cover URL for a book, from the cache when possible,
    /// otherwise by running identify first.
    pub async fn cover_url(&self, request: &SearchRequest) -> AppResult<Option<String>> {
        if let Some(url) = self
            .cover
            .cached_cover_url(request.idn.as_deref(), request.isbn.as_deref())
        {
            return Ok(Some(url));
        }

        tracing::info!("no cached cover found, running identify");
        let results = self.identify(request).await?;
        Ok(results.into_iter().find_map(|book| book.cover_url))
    }

    async fn process_record(
        &self,
        record: &MarcRecord,
        target_idn: Option<&str>,
    ) -> Option<BookRecord> {
        let Candidate {
            mut book,
            alternate_idns,
        } = self.selector.select(record)?;

        // fetch the alternate "physical form" records referenced by 776
        let mut alternates: Vec<MarcRecord> = Vec::new();
        for idn in &alternate_idns {
            let query = format!("num={} {}", idn, MATERIAL_EXCLUSION);
            match self.sru.search(&query).await {
                Ok(mut records) if !records.is_empty() => alternates.push(records.remove(0)),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("alternate record lookup failed for {}: {}", idn, e);
                }
            }
        }

        // comments: primary record first, then each alternate, first
        // successful download wins
        for source in std::iter::once(record).chain(alternates.iter()) {
            let Some(url) = comment_url(source) else {
                continue;
            };
            tracing::info!("[856.u] trying to download comments from {}", url);
            match self.fetch_comments(&url).await {
                Ok(comments) => {
                    book.comments = Some(comments);
                    break;
                }
                Err(e) => {
                    tracing::info!("[856.u] could not download comments from {}: {}", url, e);
                }
            }
        }

        // exact-identifier enforcement: a caller-supplied IDN must match
        if let (Some(target), Some(found)) = (target_idn, book.idn.as_deref()) {
            if target != found {
                tracing::info!("extracted IDN does not match book's IDN, skipping record");
                return None;
            }
        }

        // cover candidates: this record's ISBN plus the alternates'
        let mut cover_isbns: Vec<String> = book.isbn.iter().cloned().collect();
        for alternate in &alternates {
            let isbn = alternate
                .get_all_subfields("020", 'a')
                .iter()
                .find_map(|value| extract_isbn(value));
            if let Some(isbn) = isbn {
                tracing::info!("[020.a alternate] identifier ISBN: {}", isbn);
                if let Some(idn) = book.idn.as_deref() {
                    self.cover.cache_isbn_to_identifier(&isbn, idn);
                }
                cover_isbns.push(isbn);
            }
        }
        book.cover_url = self.cover.probe(book.idn.as_deref(), &cover_isbns).await;
        book.has_cover = book.cover_url.is_some();

        self.selector.finalize(&mut book);
        tracing::info!("final result: {:?}", book.title);
        Some(book)
    }

    async fn fetch_comments(&self, url: &str) -> AppResult<String> {
        let body = self.transport.get(url).await?;

        // the deposit server answers outages with a regular 200 page
        if body.contains("Zugriff derzeit nicht möglich") {
            return Err(AppError::Transport("access currently unavailable".to_string()));
        }

        Ok(sanitize_comments(&body))
    }
}

static PUBLISHER_NOTE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"(\s|<br>|<p>|\n)*Angaben aus der Verlagsmeldung(\s|<br>|<p>|\n)*(<h3>.*?</h3>)*(\s|<br>|<p>|\n)*",
    )
    .case_insensitive(true)
    .build()
    .unwrap()
});

static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"<(script|style)[^>]*>.*?</(script|style)>")
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .unwrap()
});

/// Strip the deposit server's boilerplate header and active content from
/// a comments page, keeping the descriptive markup.
fn sanitize_comments(html: &str) -> String {
    let without_note = PUBLISHER_NOTE.replace_all(html, "");
    SCRIPT_BLOCK.replace_all(&without_note, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_publisher_note() {
        // the trailing break/paragraph run after the note is part of the
        // boilerplate and goes with it
        let html = "<p>\nAngaben aus der Verlagsmeldung\n<br>\n<h3>Der Goblin-Held</h3>\n<p>Ein Roman.</p>";
        assert_eq!(sanitize_comments(html), "Ein Roman.</p>");
    }

    #[test]
    fn sanitize_strips_script_blocks() {
        let html = "<script type=\"text/javascript\">alert(1)</script><p>Text</p>";
        assert_eq!(sanitize_comments(html), "<p>Text</p>");
    }

    #[tokio::test]
    async fn insufficient_input_is_rejected() {
        let transport = Arc::new(crate::services::sru::MockSruTransport::new());
        let service = MetadataService::new(&AppConfig::default(), transport);
        let err = service.identify(&SearchRequest::default()).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientInput(_)));
    }

    #[tokio::test]
    async fn pseudo_authors_do_not_count_as_input() {
        let transport = Arc::new(crate::services::sru::MockSruTransport::new());
        let service = MetadataService::new(&AppConfig::default(), transport);
        let request = SearchRequest {
            authors: vec!["unbekannt".to_string(), "V. A.".to_string()],
            ..SearchRequest::default()
        };
        let err = service.identify(&request).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientInput(_)));
    }
}
