//! Identify flow tests over canned SRU responses.
//!
//! A fake transport serves recorded XML keyed on URL fragments, so the
//! whole pipeline runs exactly as against the live service: query
//! variations, record selection, alternate-edition lookups, comments
//! retrieval and cover probing.

use std::sync::Arc;

use async_trait::async_trait;
use dnb_meta::config::AppConfig;
use dnb_meta::error::{AppError, AppResult};
use dnb_meta::services::metadata::MetadataService;
use dnb_meta::services::sru::SruTransport;
use dnb_meta::SearchRequest;

struct FakeTransport {
    /// (url fragment, response body) pairs, first match wins
    responses: Vec<(String, String)>,
    /// url fragments whose HEAD probe succeeds
    cover_hits: Vec<String>,
}

impl FakeTransport {
    fn new(responses: &[(&str, &str)], cover_hits: &[&str]) -> Self {
        Self {
            responses: responses
                .iter()
                .map(|(fragment, body)| (fragment.to_string(), body.to_string()))
                .collect(),
            cover_hits: cover_hits.iter().map(|f| f.to_string()).collect(),
        }
    }
}

#[async_trait]
impl SruTransport for FakeTransport {
    async fn get(&self, url: &str) -> AppResult<String> {
        self.responses
            .iter()
            .find(|(fragment, _)| url.contains(fragment))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| AppError::Transport(format!("no canned response for {}", url)))
    }

    async fn head(&self, url: &str) -> AppResult<bool> {
        Ok(self.cover_hits.iter().any(|fragment| url.contains(fragment)))
    }
}

fn service(transport: FakeTransport) -> MetadataService {
    MetadataService::new(&AppConfig::default(), Arc::new(transport))
}

fn envelope(records: &str, count: usize) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <searchRetrieveResponse xmlns="http://www.loc.gov/zing/srw/">
          <version>1.1</version>
          <numberOfRecords>{count}</numberOfRecords>
          <records>{records}</records>
        </searchRetrieveResponse>"#
    )
}

const GOBLIN_RECORD: &str = r#"
    <record>
      <recordSchema>MARC21-xml</recordSchema>
      <recordData>
        <record xmlns="http://www.loc.gov/MARC21/slim">
          <leader>00000nam a2200000 c 4500</leader>
          <controlfield tag="001">1136409025</controlfield>
          <datafield tag="016" ind1="7" ind2=" ">
            <subfield code="a">1136409025</subfield>
          </datafield>
          <datafield tag="020" ind1=" " ind2=" ">
            <subfield code="a">978-3-404-28526-6 kart. : EUR 9.00</subfield>
          </datafield>
          <datafield tag="041" ind1=" " ind2=" ">
            <subfield code="a">ger</subfield>
          </datafield>
          <datafield tag="082" ind1="0" ind2="4">
            <subfield code="a">833.92</subfield>
          </datafield>
          <datafield tag="100" ind1="1" ind2=" ">
            <subfield code="a">Hines, Jim C.</subfield>
            <subfield code="4">aut</subfield>
          </datafield>
          <datafield tag="245" ind1="1" ind2="0">
            <subfield code="a">Der Goblin-Held</subfield>
            <subfield code="b">Roman</subfield>
          </datafield>
          <datafield tag="264" ind1=" " ind2="1">
            <subfield code="a">Köln</subfield>
            <subfield code="b">Bastei Lübbe</subfield>
            <subfield code="c">[2016]</subfield>
          </datafield>
          <datafield tag="336" ind1=" " ind2=" ">
            <subfield code="a">Text</subfield>
          </datafield>
          <datafield tag="689" ind1="0" ind2="0">
            <subfield code="a">Goblins</subfield>
          </datafield>
          <datafield tag="776" ind1="0" ind2="8">
            <subfield code="w">(DE-101)1209999999</subfield>
          </datafield>
          <datafield tag="830" ind1=" " ind2="0">
            <subfield code="a">Die Goblin-Saga</subfield>
            <subfield code="v">Band 4</subfield>
          </datafield>
        </record>
      </recordData>
    </record>"#;

const AUDIO_RECORD: &str = r#"
    <record>
      <recordData>
        <record xmlns="http://www.loc.gov/MARC21/slim">
          <datafield tag="245" ind1="1" ind2="0">
            <subfield code="a">Der Goblin-Held</subfield>
          </datafield>
          <datafield tag="337" ind1=" " ind2=" ">
            <subfield code="a">Audio</subfield>
          </datafield>
        </record>
      </recordData>
    </record>"#;

const ALTERNATE_RECORD: &str = r#"
    <record>
      <recordData>
        <record xmlns="http://www.loc.gov/MARC21/slim">
          <datafield tag="016" ind1="7" ind2=" ">
            <subfield code="a">1209999999</subfield>
          </datafield>
          <datafield tag="020" ind1=" " ind2=" ">
            <subfield code="a">978-3-404-28527-3</subfield>
          </datafield>
          <datafield tag="245" ind1="1" ind2="0">
            <subfield code="a">Der Goblin-Held</subfield>
          </datafield>
          <datafield tag="856" ind1="4" ind2="2">
            <subfield code="u">https://deposit.dnb.de/cgi-bin/dokserv?id=5888</subfield>
          </datafield>
        </record>
      </recordData>
    </record>"#;

const COMMENTS_PAGE: &str =
    "Angaben aus der Verlagsmeldung<br><h3>Der Goblin-Held</h3>Ein Goblin zieht in den Krieg.";

#[tokio::test]
async fn identify_by_isbn_assembles_full_record() {
    let both = format!("{}{}", AUDIO_RECORD, GOBLIN_RECORD);
    let transport = FakeTransport::new(
        &[
            ("1209999999", &envelope(ALTERNATE_RECORD, 1)),
            ("9783404285266", &envelope(&both, 2)),
            ("dokserv", COMMENTS_PAGE),
        ],
        // the primary ISBN has no cover, the alternate edition has one
        &["9783404285273"],
    );

    let request = SearchRequest {
        isbn: Some("9783404285266".to_string()),
        ..SearchRequest::default()
    };
    let results = service(transport).identify(&request).await.unwrap();

    // the audio record is skipped, only the printed book comes back
    assert_eq!(results.len(), 1);
    let book = &results[0];

    assert_eq!(book.title.as_deref(), Some("Der Goblin-Held : Roman"));
    assert_eq!(book.title_sort.as_deref(), Some("Der Goblin-Held : Roman"));
    assert_eq!(book.authors, vec!["Jim C. Hines"]);
    assert_eq!(book.author_sort.as_deref(), Some("Hines, Jim C."));
    assert_eq!(book.series.as_deref(), Some("Die Goblin-Saga"));
    assert_eq!(book.series_index.as_deref(), Some("4"));
    assert_eq!(book.publisher.as_deref(), Some("Köln ; Bastei Lübbe"));
    assert_eq!(
        book.pubdate.map(|d| d.format("%Y-%m-%d %H:%M").to_string()),
        Some("2016-01-01 12:30".to_string())
    );
    assert_eq!(book.languages, vec!["deu"]);
    assert_eq!(book.idn.as_deref(), Some("1136409025"));
    assert_eq!(book.isbn.as_deref(), Some("9783404285266"));
    assert_eq!(book.ddc, vec!["833.92"]);
    assert_eq!(book.tags, vec!["Goblins"]);
    assert_eq!(
        book.comments.as_deref(),
        Some("Ein Goblin zieht in den Krieg.")
    );
    assert!(book.has_cover);
    assert!(book.cover_url.as_deref().unwrap().contains("9783404285273"));
}

#[tokio::test]
async fn exact_idn_mismatch_discards_candidate() {
    let transport = FakeTransport::new(
        &[
            ("1209999999", &envelope(ALTERNATE_RECORD, 1)),
            ("9999999999", &envelope(GOBLIN_RECORD, 1)),
            ("dokserv", COMMENTS_PAGE),
        ],
        &[],
    );

    // the caller asks for a specific IDN; the record reports another one
    let request = SearchRequest {
        idn: Some("9999999999".to_string()),
        ..SearchRequest::default()
    };
    let err = service(transport).identify(&request).await.unwrap_err();
    assert!(matches!(err, AppError::NoResult));
}

#[tokio::test]
async fn audio_only_results_yield_no_result() {
    let transport = FakeTransport::new(
        &[("1136409025", &envelope(AUDIO_RECORD, 1))],
        &[],
    );

    let request = SearchRequest {
        idn: Some("1136409025".to_string()),
        ..SearchRequest::default()
    };
    let err = service(transport).identify(&request).await.unwrap_err();
    assert!(matches!(err, AppError::NoResult));
}

#[tokio::test]
async fn failing_query_falls_through_to_next_variation() {
    // only the keyword variation (tit="Goblin" AND tit="Held") has a
    // canned response; the stricter queries before it fail and must be
    // skipped
    let transport = FakeTransport::new(
        &[
            ("tit%3D%22Goblin%22", &envelope(GOBLIN_RECORD, 1)),
            ("1209999999", &envelope("", 0)),
        ],
        &[],
    );

    let request = SearchRequest {
        title: Some("Der Goblin-Held".to_string()),
        ..SearchRequest::default()
    };
    let results = service(transport).identify(&request).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title.as_deref(), Some("Der Goblin-Held : Roman"));
}
