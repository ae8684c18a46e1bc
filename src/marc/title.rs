//! Title statement (245) decoding.
//!
//! The DNB overloads the title statement to carry series information:
//! repeated part-number ($n) / part-name ($p) groups after the main title
//! ($a). The last part-name is the actual book title; everything before it
//! folds into the series label, and the last part-number becomes the
//! series index. Observed layouts, with their expected extraction:
//!
//! - a="The Endless Book", n=[2,3,4], p=["Second Season","Summertime","The Return of Foobar"]
//!   -> title "The Return of Foobar", series "The Endless Book 2 - Second Season 3 - Summertime", index 4
//! - a="The Endless Book", n=[2,3], p=["Second Season","Summertime"]
//!   -> title "Summertime", series "The Endless Book 2 - Second Season", index 3
//! - a="The Endless Book", n=[2], p=["Second Season"]
//!   -> title "Second Season", series "The Endless Book", index 2
//! - a="The Endless Book", n=[2], p=[]
//!   -> title "The Endless Book", series "The Endless Book", index 2

use once_cell::sync::Lazy;
use regex::Regex;

use super::text::{parse_decimal_index, SORT_MARK_CLOSE, SORT_MARK_OPEN};

/// Parsed 245 title statement: ordered $a/$n/$p values plus the first $b.
#[derive(Debug, Clone, Default)]
pub struct TitleStatement {
    pub main_titles: Vec<String>,
    pub part_numbers: Vec<String>,
    pub part_names: Vec<String>,
    pub subtitle: Option<String>,
}

/// Joint title/series extraction result. The series label has not been
/// through the series name filter yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleParts {
    pub title_parts: Vec<String>,
    pub series: Option<String>,
    pub series_index: Option<String>,
}

static UNNUMBERED_PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\.\.\.\]").unwrap());

/// Parse one raw $n value into a series index. A value without a number
/// may still carry the "[...]" placeholder the DNB uses when the
/// publisher did not specify an index; that maps to "0".
fn parse_part_number(raw: &str) -> Option<String> {
    if let Some(index) = parse_decimal_index(raw) {
        return Some(index);
    }
    if UNNUMBERED_PART.is_match(raw) {
        return Some("0".to_string());
    }
    None
}

/// Decode a title statement into title parts, series and series index.
pub fn extract(statement: &TitleStatement) -> TitleParts {
    let code_a = &statement.main_titles;
    let code_n: Vec<String> = statement
        .part_numbers
        .iter()
        .filter_map(|n| parse_part_number(n))
        .collect();
    let code_p = &statement.part_names;

    let mut title_parts: Vec<String> = code_a.clone();
    let mut series = None;
    let mut series_index = None;

    // Looks like we have a series
    if !code_a.is_empty() && !code_n.is_empty() {
        if let Some(last_part) = code_p.last() {
            title_parts = vec![last_part.clone()];
        }

        // All but the last part-name/part-number pair belong to the series
        // label; the last pair is the book itself.
        let mut series_parts = vec![code_a[0].clone()];
        let paired = code_p.len().min(code_n.len());
        for part in code_p.iter().take(paired.saturating_sub(1)) {
            series_parts.push(part.clone());
        }

        let numbered = series_parts.len().min(code_n.len() - 1);
        for i in 0..numbered {
            series_parts[i] = format!("{} {}", series_parts[i], code_n[i]);
        }

        series = Some(series_parts.join(" - "));
        series_index = code_n.last().cloned();
    }

    if let Some(subtitle) = &statement.subtitle {
        title_parts.push(subtitle.clone());
    }

    TitleParts {
        title_parts,
        series,
        series_index,
    }
}

impl TitleParts {
    /// The display title: all parts joined with " : ".
    pub fn title(&self) -> Option<String> {
        if self.title_parts.is_empty() {
            None
        } else {
            Some(self.title_parts.join(" : "))
        }
    }

    /// The sort title: like [`title`](Self::title), but with the sort-word
    /// span of the first part moved to a comma suffix
    /// ("˘Der˙ Prozess" -> "Prozess, Der").
    pub fn title_sort(&self) -> Option<String> {
        let first = self.title_parts.first()?;
        let mut parts = self.title_parts.clone();
        if let Some(key) = sort_key(first) {
            parts[0] = key;
        }
        Some(parts.join(" : "))
    }
}

/// Rebuild one title part around its sort-word marker span, if any.
fn sort_key(part: &str) -> Option<String> {
    let open = part.find(SORT_MARK_OPEN)?;
    let close = part[open..].find(SORT_MARK_CLOSE).map(|i| open + i)?;

    let sort_word = part[open + SORT_MARK_OPEN.len_utf8()..close].trim();
    let before = part[..open].trim();
    let after = part[close + SORT_MARK_CLOSE.len_utf8()..].trim();

    let mut key = String::new();
    key.push_str(before);
    key.push_str(after);
    key.push_str(", ");
    key.push_str(sort_word);
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(a: &[&str], n: &[&str], p: &[&str], b: Option<&str>) -> TitleStatement {
        TitleStatement {
            main_titles: a.iter().map(|s| s.to_string()).collect(),
            part_numbers: n.iter().map(|s| s.to_string()).collect(),
            part_names: p.iter().map(|s| s.to_string()).collect(),
            subtitle: b.map(|s| s.to_string()),
        }
    }

    #[test]
    fn plain_title_without_parts() {
        let parts = extract(&statement(&["Die Vermessung der Welt"], &[], &[], None));
        assert_eq!(parts.title().as_deref(), Some("Die Vermessung der Welt"));
        assert_eq!(parts.series, None);
        assert_eq!(parts.series_index, None);
    }

    #[test]
    fn subtitle_is_appended() {
        let parts = extract(&statement(&["Tintenherz"], &[], &[], Some("Roman")));
        assert_eq!(parts.title().as_deref(), Some("Tintenherz : Roman"));
    }

    #[test]
    fn single_pair_becomes_title_and_series() {
        let parts = extract(&statement(&["Endless Book"], &["2"], &["Second Season"], None));
        assert_eq!(parts.title().as_deref(), Some("Second Season"));
        assert_eq!(parts.series.as_deref(), Some("Endless Book"));
        assert_eq!(parts.series_index.as_deref(), Some("2"));
    }

    #[test]
    fn number_without_part_name() {
        let parts = extract(&statement(&["Endless Book"], &["2"], &[], None));
        assert_eq!(parts.title().as_deref(), Some("Endless Book"));
        assert_eq!(parts.series.as_deref(), Some("Endless Book"));
        assert_eq!(parts.series_index.as_deref(), Some("2"));
    }

    #[test]
    fn two_pairs_fold_first_into_series() {
        let parts = extract(&statement(
            &["Endless Book"],
            &["2", "3"],
            &["Second Season", "Summertime"],
            None,
        ));
        assert_eq!(parts.title().as_deref(), Some("Summertime"));
        assert_eq!(parts.series.as_deref(), Some("Endless Book 2 - Second Season"));
        assert_eq!(parts.series_index.as_deref(), Some("3"));
    }

    #[test]
    fn trailing_number_without_name_keeps_earlier_names() {
        // n has one more entry than p: the dangling number is the index
        let parts = extract(&statement(
            &["Endless Book"],
            &["2", "3"],
            &["Second Season"],
            None,
        ));
        assert_eq!(parts.title().as_deref(), Some("Second Season"));
        assert_eq!(parts.series.as_deref(), Some("Endless Book 2"));
        assert_eq!(parts.series_index.as_deref(), Some("3"));
    }

    #[test]
    fn three_pairs() {
        let parts = extract(&statement(
            &["Endless Book"],
            &["2", "3", "4"],
            &["Second Season", "Summertime", "The Return of Foobar"],
            None,
        ));
        assert_eq!(parts.title().as_deref(), Some("The Return of Foobar"));
        assert_eq!(
            parts.series.as_deref(),
            Some("Endless Book 2 - Second Season 3 - Summertime")
        );
        assert_eq!(parts.series_index.as_deref(), Some("4"));
    }

    #[test]
    fn placeholder_part_number_maps_to_zero() {
        let parts = extract(&statement(&["Endless Book"], &["[...]"], &["Finale"], None));
        assert_eq!(parts.title().as_deref(), Some("Finale"));
        assert_eq!(parts.series_index.as_deref(), Some("0"));
    }

    #[test]
    fn part_number_with_decimal_comma() {
        let parts = extract(&statement(&["Endless Book"], &["Band 2,5"], &["Zwischenspiel"], None));
        assert_eq!(parts.series_index.as_deref(), Some("2.5"));
    }

    #[test]
    fn sort_title_moves_leading_article() {
        let marked = format!("{}Der{} Prozess", SORT_MARK_OPEN, SORT_MARK_CLOSE);
        let parts = extract(&statement(&[&marked], &[], &[], None));
        assert_eq!(parts.title_sort().as_deref(), Some("Prozess, Der"));
    }

    #[test]
    fn sort_title_defaults_to_title_parts() {
        let parts = extract(&statement(&["Homo faber"], &[], &[], Some("Ein Bericht")));
        assert_eq!(parts.title_sort().as_deref(), Some("Homo faber : Ein Bericht"));
    }
}
