//! Book record model — the normalized extraction result.

use chrono::NaiveDateTime;
use serde::Serialize;

/// Normalized bibliographic record extracted from one MARC21 candidate.
///
/// Constructed fresh per candidate record and populated field by field;
/// every field except the title is best-effort and may stay unset.
/// `series_index` is only ever emitted together with `series`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BookRecord {
    pub title: Option<String>,
    pub title_sort: Option<String>,
    /// Author display names ("First Last" after assembly).
    pub authors: Vec<String>,
    /// Catalog form of the author names ("Last, First"), joined with " & ".
    pub author_sort: Option<String>,
    pub series: Option<String>,
    /// Decimal string; "0" when the series is known but the index is not.
    pub series_index: Option<String>,
    pub publisher_name: Option<String>,
    pub publisher_location: Option<String>,
    /// "location ; name", assembled from the two fields above.
    pub publisher: Option<String>,
    pub pubdate: Option<NaiveDateTime>,
    /// ISO 639-3 codes in record order.
    pub languages: Vec<String>,
    /// Subject headings from the GND controlled vocabulary.
    pub subjects_gnd: Vec<String>,
    /// Free-text subject terms supplied by the publisher.
    pub subjects_non_gnd: Vec<String>,
    /// Final tag selection according to the configured subject mode.
    pub tags: Vec<String>,
    pub idn: Option<String>,
    pub urn: Option<String>,
    pub isbn: Option<String>,
    pub ddc: Vec<String>,
    pub comments: Option<String>,
    pub edition: Option<String>,
    pub has_cover: bool,
    pub cover_url: Option<String>,
}

/// One candidate extraction plus the cross-references needed to finish it.
///
/// The alternate IDNs come from 776 ("Additional Physical Form Entry") and
/// point at other editions of the same work — often only one of them
/// carries the synopsis or the cover.
#[derive(Debug, Clone, Default)]
pub struct Candidate {
    pub book: BookRecord,
    pub alternate_idns: Vec<String>,
}
