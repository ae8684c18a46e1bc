//! Series guessing from free-text titles.
//!
//! DNB metadata often lacks proper series data while the title carries it
//! informally ("Sternenjäger - Band 3 : Die dunkle Flut"). These
//! heuristics mine the title the way a cataloguer would read it,
//! preferring explicit marker words over positional guesses. The patterns
//! are tried in a fixed priority order; the first match wins.

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker words that introduce a volume number.
const MARKER: &str = r"(?:#|Reihe|Nr\.|Heft|Volume|Vol\.?|Episode|Bd\.|Sammelband|[Bb]and|Part|Kapitel|[Tt]eil|Folge)";

/// "Name of the series - Band 2" (name before marker).
static SERIES_THEN_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^\s*(\S\D*?[a-zA-Z]\D*?)\W[(/.,\s\-–—:]*{m}[,\-–—:\s#(]*(\d+[.,]?\d*)[)\s\-–—:]*$",
        m = MARKER
    ))
    .unwrap()
});

/// "Band 2 Name of the series" (name after marker).
static MARKER_THEN_SERIES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^\s*{m}[,\-–—:\s#(]*(\d+[.,]?\d*)[)\s\-–—:]*(\S\D*?[a-zA-Z]\D*?)[/.,\-–—\s]*$",
        m = MARKER
    ))
    .unwrap()
});

/// "Band 2" alone.
static MARKER_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^[\s(]*{m}[,\-–—:\s#(]*(\d+[.,]?\d*)[)\s\-–—:]*[/.,\-–—\s]*$",
        m = MARKER
    ))
    .unwrap()
});

/// "Name of the Series - Book Title" (used on the text part when the
/// index part carried only the number).
static SERIES_TITLE_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\w+.+?)\s?[.;\-–:]+\s(\w+.+)\s*$").unwrap());

/// "Name of the series - Title (Band 2)" in a single-part title.
static SERIES_TITLE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^\s*(\S.+?) - (\S.+?) [(/.,\s\-–—:]{m}[,\-–—:\s#(]*(\d+[.,]?\d*)[)\s\-–—:]*$",
        m = MARKER
    ))
    .unwrap()
});

/// "Name of the series - Band 2" as the whole title.
static SERIES_MARKER_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^\s*(\S.+?)[(/.,\s\-–—:]*{m}[,\-–—:\s#(]*(\d+[.,]?\d*)[)\s\-–—:]*$",
        m = MARKER
    ))
    .unwrap()
});

/// A complete guess: all three values or nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesGuess {
    pub title: String,
    pub series: String,
    pub series_index: String,
}

static CONTAINS_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").unwrap());

/// Guess series, series index and the "real" title from a free-text
/// title. Expects the title to be normalized (sort markers removed).
/// Returns `None` when no pattern produces a complete triple.
pub fn guess_series(title: &str) -> Option<SeriesGuess> {
    let parts: Vec<&str> = title.split(':').collect();
    match parts.len() {
        1 => guess_one_part(parts[0]),
        2 => guess_two_part(parts[0], parts[1]),
        _ => None,
    }
}

fn guess_two_part(left: &str, right: &str) -> Option<SeriesGuess> {
    // exactly one of the two parts must contain the index number
    let left_digits = CONTAINS_DIGIT.is_match(left);
    if left_digits == CONTAINS_DIGIT.is_match(right) {
        return None;
    }
    let (indexpart, textpart) = if left_digits { (left, right) } else { (right, left) };
    let textpart = trim_odd_characters(textpart);

    if let Some(caps) = SERIES_THEN_MARKER.captures(indexpart) {
        return Some(assemble(&caps[1], &caps[2], textpart, "2P1"));
    }

    if let Some(caps) = MARKER_THEN_SERIES.captures(indexpart) {
        return Some(assemble(&caps[2], &caps[1], textpart, "2P2"));
    }

    if let Some(caps) = MARKER_ONLY.captures(indexpart) {
        // the index part carried only the number; the text part has to
        // provide both series and title
        let index = caps[1].replace(',', ".");
        if let Some(split) = SERIES_TITLE_SPLIT.captures(textpart) {
            let guess = SeriesGuess {
                title: split[2].trim().to_string(),
                series: split[1].trim().to_string(),
                series_index: index,
            };
            tracing::info!(
                "[series guesser] 2P3 matched: title {:?}, series {:?} [{}]",
                guess.title,
                guess.series,
                guess.series_index
            );
            return Some(guess);
        }
    }

    None
}

fn guess_one_part(title: &str) -> Option<SeriesGuess> {
    if let Some(caps) = SERIES_TITLE_MARKER.captures(title) {
        let guess = SeriesGuess {
            title: caps[2].to_string(),
            series: caps[1].to_string(),
            series_index: caps[3].replace(',', "."),
        };
        tracing::info!(
            "[series guesser] 1P1 matched: title {:?}, series {:?} [{}]",
            guess.title,
            guess.series,
            guess.series_index
        );
        return Some(guess);
    }

    if let Some(caps) = SERIES_MARKER_ONLY.captures(title) {
        let series = caps[1].to_string();
        let index = caps[2].replace(',', ".");
        let guess = SeriesGuess {
            title: format!("{} : Band {}", series, index),
            series,
            series_index: index,
        };
        tracing::info!(
            "[series guesser] 1P2 matched: title {:?}, series {:?} [{}]",
            guess.title,
            guess.series,
            guess.series_index
        );
        return Some(guess);
    }

    None
}

/// Attach the guessed values to the right slots. Multi-volume works are
/// sometimes catalogued as a series without a name; the text part then
/// doubles as the series, and the volume moves into the title.
fn assemble(series: &str, index: &str, textpart: &str, strategy: &str) -> SeriesGuess {
    let index = index.replace(',', ".");
    let guess = if series.is_empty() {
        SeriesGuess {
            title: format!("{} : Band {}", textpart, index),
            series: textpart.to_string(),
            series_index: index,
        }
    } else {
        SeriesGuess {
            title: textpart.to_string(),
            series: series.to_string(),
            series_index: index,
        }
    };
    tracing::info!(
        "[series guesser] {} matched: title {:?}, series {:?} [{}]",
        strategy,
        guess.title,
        guess.series,
        guess.series_index
    );
    guess
}

/// Strip dashes, colons and whitespace from both ends of the text part.
fn trim_odd_characters(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | '—' | ':'))
}
