//! Text normalization helpers shared across extraction rules.

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

/// Sort-word markers used by the DNB catalog format: C1 control characters
/// bracketing the part of a title to be ignored for alphabetic sorting
/// (e.g. a leading article).
pub const SORT_MARK_OPEN: char = '\u{98}';
pub const SORT_MARK_CLOSE: char = '\u{9c}';

/// Remove sort-word markers wherever they occur, leaving every other
/// character untouched. Idempotent.
pub fn remove_sorting_characters(text: &str) -> String {
    text.chars()
        .filter(|c| *c != SORT_MARK_OPEN && *c != SORT_MARK_CLOSE)
        .collect()
}

/// Option-propagating form of [`remove_sorting_characters`]: absent or
/// empty input stays absent.
pub fn normalize(text: Option<&str>) -> Option<String> {
    match text {
        Some(t) if !t.is_empty() => Some(remove_sorting_characters(t)),
        _ => None,
    }
}

static TRANSLATOR_CREDIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+) [/:] [Aa]us dem .+? von(\s\w+)+$").unwrap());

/// Strip a trailing translator credit ("… / Aus dem Englischen von N. N.")
/// from a title.
pub fn clean_title(title: &str) -> String {
    let normalized = remove_sorting_characters(title);
    if let Some(caps) = TRANSLATOR_CREDIT.captures(&normalized) {
        tracing::info!("[title cleaning] removed translator, title is now: {}", &caps[1]);
        return caps[1].to_string();
    }
    title.to_string()
}

static DECIMAL_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)").unwrap());

/// Find the first decimal number in a string and return it with the
/// decimal separator canonicalized to ".". Accepts "2", "2.5" and "2,5".
pub fn parse_decimal_index(text: &str) -> Option<String> {
    DECIMAL_INDEX
        .captures(text)
        .map(|caps| caps[1].replace(',', "."))
}

/// Remove duplicates from a list, keeping first-seen order.
pub fn uniq<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    items.into_iter().collect::<IndexSet<String>>().into_iter().collect()
}

/// Convert an ISO 639-2/B code to ISO 639-3. Most codes are identical;
/// only the exceptions are mapped, anything else passes through.
pub fn iso639_2b_as_iso639_3(lang: &str) -> String {
    match lang.to_lowercase().as_str() {
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "chi" => "zho",
        "cze" => "ces",
        "dut" => "nld",
        "fre" => "fra",
        "geo" => "kat",
        "ger" => "deu",
        "gre" => "ell",
        "ice" => "isl",
        "mac" => "mkd",
        "may" => "msa",
        "mao" => "mri",
        "per" => "fas",
        "rum" => "ron",
        "slo" => "slk",
        "tib" => "bod",
        "wel" => "cym",
        _ => return lang.to_string(),
    }
    .to_string()
}

const GERMAN_JOINERS: &[&str] = &["ein", "eine", "einer", "der", "die", "das", "und", "oder"];

/// Drop German joiner words from a token list. The English joiners
/// ("a", "and", "the", "&") are handled by the tokenizer itself.
pub fn strip_german_joiners(words: &[String]) -> Vec<String> {
    words
        .iter()
        .filter(|w| !GERMAN_JOINERS.contains(&w.to_lowercase().as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_sort_markers_only() {
        let marked = format!("{}Der {}Prozess", SORT_MARK_OPEN, SORT_MARK_CLOSE);
        assert_eq!(remove_sorting_characters(&marked), "Der Prozess");
        assert_eq!(remove_sorting_characters("Käfer & Co"), "Käfer & Co");
    }

    #[test]
    fn normalize_is_idempotent() {
        let marked = format!("{}Die{} Verwandlung", SORT_MARK_OPEN, SORT_MARK_CLOSE);
        let once = normalize(Some(marked.as_str())).unwrap();
        let twice = normalize(Some(once.as_str())).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_propagates_absence() {
        assert_eq!(normalize(None), None);
        assert_eq!(normalize(Some("")), None);
    }

    #[test]
    fn clean_title_strips_translator_credit() {
        assert_eq!(
            clean_title("Der dunkle Turm : Aus dem Amerikanischen von Joachim Körber"),
            "Der dunkle Turm"
        );
        assert_eq!(clean_title("Der dunkle Turm"), "Der dunkle Turm");
    }

    #[test]
    fn decimal_index_accepts_both_separators() {
        assert_eq!(parse_decimal_index("Nr. 220"), Some("220".to_string()));
        assert_eq!(parse_decimal_index("Band 2,5"), Some("2.5".to_string()));
        assert_eq!(parse_decimal_index("Band 2.5"), Some("2.5".to_string()));
        assert_eq!(parse_decimal_index("ohne Nummer"), None);
    }

    #[test]
    fn uniq_keeps_first_seen_order() {
        let items = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(uniq(items), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn language_mapping() {
        assert_eq!(iso639_2b_as_iso639_3("ger"), "deu");
        assert_eq!(iso639_2b_as_iso639_3("fre"), "fra");
        assert_eq!(iso639_2b_as_iso639_3("eng"), "eng");
    }

    #[test]
    fn german_joiners_are_dropped() {
        let words: Vec<String> = ["Die", "Stadt", "und", "der", "Fluss"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(strip_german_joiners(&words), vec!["Stadt", "Fluss"]);
    }
}
