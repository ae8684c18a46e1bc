//! MARC21 record selection and translation into [`BookRecord`].
//!
//! Walks one candidate record field by field, in the order the fields
//! depend on each other (publisher before title, title before the series
//! fallbacks, everything before the guesser). Every optional field is
//! extracted independently and best-effort; only an unwanted media type
//! or a record without any title content discards the candidate.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{MetadataConfig, SubjectMode};
use crate::models::book::{BookRecord, Candidate};

use super::guess::guess_series;
use super::parser::MarcRecord;
use super::series::{clean_series, fill_from_fallback_fields};
use super::text::{
    clean_title, iso639_2b_as_iso639_3, normalize, remove_sorting_characters, uniq,
};
use super::title::{self, TitleStatement};

/// Translates MARC21 records into candidate book records.
pub struct RecordSelector {
    cfg: MetadataConfig,
    unwanted_series: Vec<Regex>,
}

impl RecordSelector {
    pub fn new(cfg: &MetadataConfig) -> Self {
        Self {
            cfg: cfg.clone(),
            unwanted_series: cfg.compiled_unwanted_series(),
        }
    }

    /// Translate one record. Returns `None` when the record is skipped:
    /// spoken-word/audio/video material, or no extractable title.
    pub fn select(&self, record: &MarcRecord) -> Option<Candidate> {
        // 336 "Content Type" / 337 "Media Type": skip audio books and video
        if let Some(content_type) = record.get_subfield("336", 'a') {
            if content_type.to_lowercase() == "gesprochenes wort" {
                tracing::info!("[336.a] skipping spoken-word record");
                return None;
            }
        }
        if let Some(media_type) = record.get_subfield("337", 'a') {
            let media_type = media_type.to_lowercase();
            if media_type == "audio" || media_type == "video" {
                tracing::info!("[337.a] skipping {} record", media_type);
                return None;
            }
        }

        // 776 "Additional Physical Form Entry": other editions of the same
        // work, consulted later for comments and covers
        let mut alternate_idns = Vec::new();
        for value in record.get_all_subfields("776", 'w') {
            let other_idn = SOURCE_CODE_PREFIX.replace(value, "").to_string();
            if !other_idn.is_empty() {
                tracing::info!("[776.w] found other issue with IDN {}", other_idn);
                alternate_idns.push(other_idn);
            }
        }

        // 264 "Production, Publication, ...": location ($a), name ($b), date ($c)
        let (publisher_name, publisher_location, pubdate) = extract_publisher(record);

        // 245 "Title Statement": title, series, series index, subtitle
        let title_parts = record
            .get_fields("245")
            .last()
            .map(|field| {
                title::extract(&TitleStatement {
                    main_titles: owned(field.get_all_subfields('a')),
                    part_numbers: owned(field.get_all_subfields('n')),
                    part_names: owned(field.get_all_subfields('p')),
                    subtitle: field.get_subfield('b').map(str::to_string),
                })
            })
            .unwrap_or_default();

        if let Some(series) = &title_parts.series {
            tracing::info!("[245] series: {}", series);
        }
        let mut series = clean_series(
            title_parts.series.as_deref(),
            publisher_name.as_deref(),
            &self.unwanted_series,
        );
        let mut series_index = title_parts.series_index.clone();
        let mut book_title = title_parts.title().map(|t| clean_title(&t));
        let title_sort = title_parts.title_sort();
        if let Some(title) = &book_title {
            tracing::info!("[245] title: {}", title);
        }

        // 100/700 "Personal Name": authors
        let authors = extract_authors(record);

        // identifiers
        let idn = record.get_subfield("016", 'a').map(str::to_string);
        if let Some(idn) = &idn {
            tracing::info!("[016.a] identifier IDN: {}", idn);
        }
        let urn = extract_urn(record);
        let isbn = record
            .get_all_subfields("020", 'a')
            .iter()
            .find_map(|value| extract_isbn(value));
        if let Some(isbn) = &isbn {
            tracing::info!("[020.a] identifier ISBN: {}", isbn);
        }
        let ddc = owned(record.get_all_subfields("082", 'a'));

        // 830/490/246/800: structured series fallbacks
        fill_from_fallback_fields(
            record,
            &mut series,
            &mut series_index,
            publisher_name.as_deref(),
            &self.unwanted_series,
        );

        // 689 and 600-655: subjects
        let (subjects_gnd, subjects_non_gnd) = extract_subjects(record);

        // 250 "Edition Statement"
        let edition = record.get_subfield("250", 'a').map(str::to_string);

        // 041 "Language Code" (ISO 639-2/B on the wire)
        let languages: Vec<String> = record
            .get_all_subfields("041", 'a')
            .iter()
            .map(|code| iso639_2b_as_iso639_3(code))
            .collect();

        // fall back to mining the free-text title when the structured
        // fields left the series undetermined
        let series_undetermined =
            series.is_none() || matches!(series_index.as_deref(), None | Some("0"));
        if self.cfg.guess_series && series_undetermined {
            if let Some(current_title) = &book_title {
                if let Some(guess) = guess_series(&remove_sorting_characters(current_title)) {
                    book_title = Some(clean_title(&guess.title));
                    series = clean_series(
                        Some(guess.series.as_str()),
                        publisher_name.as_deref(),
                        &self.unwanted_series,
                    );
                    series_index = Some(guess.series_index);
                }
            }
        }

        // a record without any title content is unusable
        let book_title = book_title.filter(|t| !t.is_empty())?;

        Some(Candidate {
            book: BookRecord {
                title: Some(book_title),
                title_sort,
                authors,
                series,
                series_index,
                publisher_name,
                publisher_location,
                pubdate,
                languages,
                subjects_gnd,
                subjects_non_gnd,
                idn,
                urn,
                isbn,
                ddc,
                edition,
                ..BookRecord::default()
            },
            alternate_idns,
        })
    }

    /// Assemble the final record: strip sorting markers, swap author
    /// names into display order, join the publisher fields, pick the tag
    /// list and honor the edition-to-title option.
    pub fn finalize(&self, book: &mut BookRecord) {
        if self.cfg.append_edition_to_title {
            if let (Some(title), Some(edition)) = (&book.title, &book.edition) {
                book.title = Some(format!("{} : {}", title, edition));
            }
        }

        let authors: Vec<String> = book
            .authors
            .iter()
            .map(|a| remove_sorting_characters(a))
            .collect();
        book.author_sort = if authors.is_empty() {
            None
        } else {
            Some(authors.join(" & "))
        };
        book.authors = authors.iter().map(|a| swap_author_name(a)).collect();

        book.title = normalize(book.title.as_deref());
        book.title_sort = normalize(book.title_sort.as_deref());

        if let Some(series) = book.series.take() {
            book.series = normalize(Some(series.replace(',', ".").as_str()));
            book.series_index = Some(book.series_index.take().unwrap_or_else(|| "0".to_string()));
        } else {
            book.series_index = None;
        }

        let name = normalize(book.publisher_name.as_deref());
        let joined: Vec<String> = [book.publisher_location.clone(), name]
            .into_iter()
            .flatten()
            .collect();
        book.publisher = if joined.is_empty() {
            None
        } else {
            Some(joined.join(" ; "))
        };

        book.tags = match self.cfg.subjects {
            SubjectMode::OnlyGnd => uniq(book.subjects_gnd.clone()),
            SubjectMode::PreferGnd => {
                if !book.subjects_gnd.is_empty() {
                    uniq(book.subjects_gnd.clone())
                } else {
                    uniq(book.subjects_non_gnd.clone())
                }
            }
            SubjectMode::Both => uniq(
                book.subjects_gnd
                    .iter()
                    .chain(book.subjects_non_gnd.iter())
                    .cloned(),
            ),
            SubjectMode::PreferNonGnd => {
                if !book.subjects_non_gnd.is_empty() {
                    uniq(book.subjects_non_gnd.clone())
                } else {
                    uniq(book.subjects_gnd.clone())
                }
            }
            SubjectMode::OnlyNonGnd => uniq(book.subjects_non_gnd.clone()),
            SubjectMode::None => Vec::new(),
        };
    }
}

static SOURCE_CODE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(.*\)").unwrap());
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})").unwrap());
static ROLE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r" \[.*\]$").unwrap());
static URN_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^urn:(.+)$").unwrap());
static NAME_SWAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+), (.+)$").unwrap());

fn owned(values: Vec<&str>) -> Vec<String> {
    values.into_iter().map(str::to_string).collect()
}

type PublisherInfo = (Option<String>, Option<String>, Option<NaiveDateTime>);

fn extract_publisher(record: &MarcRecord) -> PublisherInfo {
    let mut name = None;
    let mut location = None;
    let mut pubdate = None;

    for field in record.get_fields("264") {
        if name.is_some() && location.is_some() && pubdate.is_some() {
            break;
        }
        if location.is_none() {
            let parts = field.get_all_subfields('a');
            if !parts.is_empty() {
                location = Some(
                    parts
                        .join(" ")
                        .trim_matches(|c| c == '[' || c == ']')
                        .to_string(),
                );
            }
        }
        if name.is_none() {
            name = field.get_subfield('b').map(str::to_string);
            if let Some(name) = &name {
                tracing::info!("[264.b] publisher: {}", name);
            }
        }
        if pubdate.is_none() {
            pubdate = field
                .get_subfield('c')
                .filter(|c| c.len() >= 4)
                .and_then(parse_pubdate);
            if let Some(date) = &pubdate {
                tracing::info!("[264.c] publication year: {}", date.format("%Y"));
            }
        }
    }

    (name, location, pubdate)
}

fn parse_pubdate(text: &str) -> Option<NaiveDateTime> {
    let year: i32 = YEAR.captures(text)?.get(1)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(12, 30, 0)
}

/// Authors with an explicit "aut" role from 100 (primary) and 700
/// (secondary); all persons from 700 when no real author is declared.
fn extract_authors(record: &MarcRecord) -> Vec<String> {
    let mut authors = Vec::new();
    authors.extend(authored_names(record, "100"));
    authors.extend(authored_names(record, "700"));
    if !authors.is_empty() {
        tracing::info!("[100.a/700.a] authors: {}", authors.join(" & "));
        return authors;
    }

    let involved: Vec<String> = record
        .get_all_subfields("700", 'a')
        .iter()
        .map(|name| strip_role_suffix(name))
        .collect();
    if !involved.is_empty() {
        tracing::info!("[700.a] involved persons: {}", involved.join(" & "));
    }
    involved
}

fn authored_names(record: &MarcRecord, tag: &str) -> Vec<String> {
    record
        .get_fields(tag)
        .into_iter()
        .filter(|field| field.get_all_subfields('4').iter().any(|v| *v == "aut"))
        .flat_map(|field| field.get_all_subfields('a'))
        .map(strip_role_suffix)
        .collect()
}

fn strip_role_suffix(name: &str) -> String {
    ROLE_SUFFIX.replace(name, "").to_string()
}

fn swap_author_name(name: &str) -> String {
    NAME_SWAP.replace(name, "$2 $1").to_string()
}

fn extract_urn(record: &MarcRecord) -> Option<String> {
    record
        .get_fields("024")
        .into_iter()
        .filter(|field| field.get_all_subfields('2').iter().any(|v| *v == "urn"))
        .flat_map(|field| field.get_all_subfields('a'))
        .find_map(|value| {
            let urn = URN_PREFIX.captures(value)?.get(1)?.as_str().to_string();
            tracing::info!("[024.a] identifier URN: {}", urn);
            Some(urn)
        })
}

/// GND subjects from 689 and from 600-655 where $2 is "gnd"; free-text
/// subjects from 600-655, split on commas and semicolons.
fn extract_subjects(record: &MarcRecord) -> (Vec<String>, Vec<String>) {
    let mut gnd: Vec<String> = owned(record.get_all_subfields("689", 'a'));

    for tag in 600..=655u16 {
        let tag = tag.to_string();
        for field in record.get_fields(&tag) {
            if !field.get_all_subfields('2').iter().any(|v| *v == "gnd") {
                continue;
            }
            for value in field.get_all_subfields('a') {
                if value.starts_with('(') {
                    continue;
                }
                gnd.push(value.to_string());
            }
        }
    }

    let mut non_gnd: Vec<String> = Vec::new();
    for tag in 600..=655u16 {
        let tag = tag.to_string();
        for value in record.get_all_subfields(&tag, 'a') {
            if value.starts_with('(') || value.chars().count() < 2 {
                continue;
            }
            for part in remove_sorting_characters(value).split([',', ';']) {
                let part = part.trim();
                if !part.is_empty() {
                    non_gnd.push(part.to_string());
                }
            }
        }
    }

    (gnd, non_gnd)
}

/// The comments URL from 856 "Electronic Location and Access", when it
/// points at the DNB deposit server.
pub fn comment_url(record: &MarcRecord) -> Option<String> {
    let url = record.get_subfield("856", 'u').filter(|u| u.len() > 21)?;
    if url.starts_with("http://deposit.dnb.de/") || url.starts_with("https://deposit.dnb.de/") {
        Some(url.to_string())
    } else {
        None
    }
}

static ISBN_CANDIDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9][0-9Xx \-]{8,16}[0-9Xx]").unwrap());

/// Extract the first checksum-valid ISBN-10/13 from a string, with
/// hyphens and spaces removed.
pub fn extract_isbn(text: &str) -> Option<String> {
    for candidate in ISBN_CANDIDATE.find_iter(text) {
        let compact: String = candidate
            .as_str()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_uppercase();
        if is_valid_isbn(&compact) {
            return Some(compact);
        }
    }
    None
}

fn is_valid_isbn(isbn: &str) -> bool {
    let bytes = isbn.as_bytes();
    match bytes.len() {
        10 => {
            let mut sum = 0u32;
            for (i, &b) in bytes.iter().enumerate() {
                let value = match b {
                    b'0'..=b'9' => u32::from(b - b'0'),
                    b'X' if i == 9 => 10,
                    _ => return false,
                };
                sum += (10 - i as u32) * value;
            }
            sum % 11 == 0
        }
        13 => {
            if !bytes.iter().all(u8::is_ascii_digit) {
                return false;
            }
            let sum: u32 = bytes
                .iter()
                .enumerate()
                .map(|(i, &b)| u32::from(b - b'0') * if i % 2 == 0 { 1 } else { 3 })
                .sum();
            sum % 10 == 0
        }
        _ => false,
    }
}
