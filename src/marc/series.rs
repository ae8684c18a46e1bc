//! Series name filtering and the structured series fallback chain.
//!
//! Book series are supposed to live in field 830, but in practice they
//! show up in 490, 246 or 800 — or nowhere. The chain below consults
//! those fields in priority order and stops as soon as both a series name
//! (surviving the filter) and a non-zero index are known. An index of "0"
//! means "unknown", so later fields may still improve on it.

use once_cell::sync::Lazy;
use regex::Regex;

use super::parser::{DataField, MarcRecord};
use super::text::{parse_decimal_index, remove_sorting_characters};

static WORD_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w").unwrap());
static PUBLISHER_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w{4,})").unwrap());

/// Reject series candidates that are no real series: empty of word
/// characters, equal to or derived from the publisher name, or matching
/// the configured denylist. Returns the normalized candidate otherwise.
pub fn clean_series(
    series: Option<&str>,
    publisher_name: Option<&str>,
    unwanted: &[Regex],
) -> Option<String> {
    let series = series?;

    // a series must at least contain a single letter or digit
    if !WORD_CHAR.is_match(series) {
        return None;
    }

    let series = remove_sorting_characters(series);

    if let Some(publisher) = publisher_name {
        if publisher.to_lowercase() == series.to_lowercase() {
            tracing::info!("[series cleaning] series {:?} is equal to publisher, ignoring", series);
            return None;
        }

        // Reject series starting with the first word of the publisher's
        // name, when that word has at least 4 characters ("Rowohlt" vs
        // "Rowohlt Taschenbuch").
        if let Some(caps) = PUBLISHER_PREFIX.captures(&remove_sorting_characters(publisher)) {
            let token = caps[1].to_lowercase();
            let stripped: String = series
                .trim_start_matches(|c: char| !(c.is_alphanumeric() || c == '_'))
                .to_lowercase();
            if stripped.starts_with(&token) {
                tracing::info!(
                    "[series cleaning] series {:?} starts with publisher, ignoring",
                    series
                );
                return None;
            }
        }
    }

    for pattern in unwanted {
        if pattern.is_match(&series) {
            tracing::info!(
                "[series cleaning] series {:?} matches unwanted pattern {:?}, ignoring",
                series,
                pattern.as_str()
            );
            return None;
        }
    }

    Some(series)
}

type FieldExtractor = fn(&DataField) -> Option<(String, String)>;

/// Series-bearing fields in priority order: the structured bibliography
/// entry first, then the progressively less structured fallbacks.
static FALLBACK_CHAIN: [(&str, FieldExtractor); 4] = [
    ("830", series_from_830),
    ("490", series_from_490),
    ("246", series_from_246),
    ("800", series_from_800),
];

/// Fill `series`/`series_index` from the fallback chain. Already
/// determined values (non-empty series with a non-"0" index) are left
/// alone; a candidate with index "0" is kept but keeps the search going.
pub fn fill_from_fallback_fields(
    record: &MarcRecord,
    series: &mut Option<String>,
    series_index: &mut Option<String>,
    publisher_name: Option<&str>,
    unwanted: &[Regex],
) {
    for (tag, extractor) in &FALLBACK_CHAIN {
        if determined(series, series_index) {
            break;
        }
        for field in record.get_fields(tag) {
            if determined(series, series_index) {
                break;
            }
            let Some((candidate, index)) = extractor(field) else {
                continue;
            };
            let Some(cleaned) = clean_series(Some(candidate.as_str()), publisher_name, unwanted)
            else {
                continue;
            };
            tracing::info!("[{}] series: {} [{}]", tag, cleaned, index);
            *series = Some(cleaned);
            *series_index = Some(index);
        }
    }
}

fn determined(series: &Option<String>, series_index: &Option<String>) -> bool {
    series.is_some() && matches!(series_index.as_deref(), Some(i) if i != "0")
}

/// 830 "Series Added Entry-Uniform Title": $a name, $v index.
fn series_from_830(field: &DataField) -> Option<(String, String)> {
    let index = field.get_subfield('v').and_then(parse_decimal_index)?;
    let series = field.get_subfield('a')?;
    Some((series.to_string(), index))
}

/// 800 "Series Added Entry-Personal Name": $t name, $v index.
fn series_from_800(field: &DataField) -> Option<(String, String)> {
    let index = field.get_subfield('v').and_then(parse_decimal_index)?;
    let series = field.get_subfield('t')?;
    Some((series.to_string(), index))
}

static CONTAINS_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").unwrap());

/// 490 "Series Statement": $v is either "Nr. 220" or
/// "This great Seriestitle : Nr. 220"; $a holds the name when $v does not.
fn series_from_490(field: &DataField) -> Option<(String, String)> {
    let attr_v = field.get_subfield('v')?;

    let mut series: Option<String> = None;
    let mut series_index: Option<String> = None;

    let parts: Vec<&str> = attr_v.split(" : ").collect();
    if parts.len() == 2 {
        // the part without digits is the series, the other one the index
        if CONTAINS_DIGIT.is_match(parts[0]) != CONTAINS_DIGIT.is_match(parts[1]) {
            let (indexpart, textpart) = if CONTAINS_DIGIT.is_match(parts[0]) {
                (parts[0], parts[1])
            } else {
                (parts[1], parts[0])
            };
            if let Some(index) = parse_decimal_index(indexpart) {
                series_index = Some(index);
                series = Some(textpart.trim().to_string());
            }
        }
    } else {
        series_index = parse_decimal_index(attr_v);
    }

    if series.is_none() {
        series = field.get_subfield('a').map(str::to_string);
    }

    Some((series?, series_index?))
}

static SERIES_246: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?) ; (\d+(?:[.,]\d+)?)$").unwrap());

/// 246 "Varying Form of Title": $a like "Seriesname ; 12".
fn series_from_246(field: &DataField) -> Option<(String, String)> {
    let text = field.get_subfield('a')?;
    let caps = SERIES_246.captures(text)?;
    Some((caps[1].to_string(), caps[2].replace(',', ".")))
}
