//! SRU query-variation construction.
//!
//! The DNB indexes are fuzzy: a single query shape misses records a
//! slightly different one finds. When no unique identifier is given, a
//! ladder of progressively looser title/author combinations is generated
//! and tried in order; the first query with usable results wins.

use indexmap::IndexSet;

use crate::marc::text::strip_german_joiners;

/// Appended to every query: never search films, music, microfiches or
/// audiobooks.
pub const MATERIAL_EXCLUSION: &str = "NOT (mat=film OR mat=music OR mat=microfiches OR cod=tt)";

const ENGLISH_JOINERS: &[&str] = &["a", "and", "the"];

/// Tokenize a title for the search index: split on punctuation,
/// optionally dropping joiner words and the subtitle (everything after
/// " : ").
fn title_tokens(title: &str, strip_joiners: bool, strip_subtitle: bool) -> Vec<String> {
    let title = if strip_subtitle {
        title.split(" : ").next().unwrap_or(title)
    } else {
        title
    };
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .filter(|t| !strip_joiners || !ENGLISH_JOINERS.contains(&t.to_lowercase().as_str()))
        .map(str::to_string)
        .collect()
}

/// Tokenize author names (split on whitespace and commas).
fn author_tokens(authors: &[String], only_first_author: bool) -> Vec<String> {
    let list = if only_first_author {
        &authors[..authors.len().min(1)]
    } else {
        authors
    };
    list.iter()
        .flat_map(|a| a.split(|c: char| c.is_whitespace() || c == ','))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_zeros(token: &str) -> &str {
    token.trim_start_matches('0')
}

/// Build the ordered, deduplicated list of queries for one search
/// request. An IDN or ISBN short-circuits everything else.
pub fn create_query_variations(
    idn: Option<&str>,
    isbn: Option<&str>,
    authors: &[String],
    title: Option<&str>,
) -> Vec<String> {
    let mut queries: Vec<String> = Vec::new();

    if let Some(idn) = idn {
        queries.push(format!("num={}", idn));
    } else if let Some(isbn) = isbn {
        queries.push(format!("num={}", isbn));
    } else {
        // variations of the given authors: all of them, then one by one
        let mut author_sets: Vec<Vec<String>> = Vec::new();
        if !authors.is_empty() {
            author_sets.push(authors.to_vec());
            if authors.len() > 1 {
                for author in authors {
                    author_sets.push(vec![author.clone()]);
                }
            }
        }

        // variations of the given title, from verbatim to bare keywords
        let mut title_sets: Vec<Vec<String>> = Vec::new();
        if let Some(title) = title {
            title_sets.push(vec![title.to_string()]);
            title_sets.push(vec![title_tokens(title, false, false).join(" ")]);
            title_sets.push(keyword_tokens(title, false));
            title_sets.push(vec![title_tokens(title, false, true).join(" ")]);
            title_sets.push(keyword_tokens(title, true));
        }

        match (title, author_sets.is_empty()) {
            (Some(title), false) => {
                // full title with all authors
                queries.push(format!(
                    "tst=\"{}\" AND {}",
                    title,
                    person_clauses(authors).join(" AND ")
                ));

                // cartesian product of the author and title variations
                for author_set in &author_sets {
                    for title_set in &title_sets {
                        let mut clauses: Vec<String> = title_set
                            .iter()
                            .map(|t| format!("tit=\"{}\"", strip_zeros(t)))
                            .collect();
                        clauses.extend(person_clauses(author_set));
                        queries.push(clauses.join(" AND "));
                    }
                }

                // swapped indexes: sometimes the catalog has them reversed
                queries.push(format!(
                    "per=\"{}\" AND tit=\"{}\"",
                    joined_title_keywords(title),
                    author_tokens(authors, true).join(" ")
                ));

                // any-index search with title and first author
                queries.push(format!(
                    "\"{}\" AND \"{}\"",
                    joined_title_keywords(title),
                    author_tokens(authors, true).join(" ")
                ));

                // any-index search with every word quoted separately
                let mut words = keyword_tokens(title, true);
                words.extend(author_tokens(authors, true));
                queries.push(
                    words
                        .iter()
                        .map(|w| format!("\"{}\"", w))
                        .collect::<Vec<_>>()
                        .join(" AND "),
                );
            }
            (None, false) => {
                for author_set in &author_sets {
                    queries.push(person_clauses(author_set).join(" AND "));
                }
                queries.push(format!("per=\"{}\"", author_tokens(authors, true).join(" ")));
                queries.push(format!(
                    "tit=\"{}\"",
                    author_tokens(authors, true)
                        .iter()
                        .map(|t| strip_zeros(t))
                        .collect::<Vec<_>>()
                        .join(" ")
                ));
            }
            (Some(title), true) => {
                for title_set in &title_sets {
                    queries.push(
                        title_set
                            .iter()
                            .map(|t| format!("tit=\"{}\"", strip_zeros(t)))
                            .collect::<Vec<_>>()
                            .join(" AND "),
                    );
                }
                queries.push(format!(
                    "per=\"{}\"",
                    title_tokens(title, true, true).join(" ")
                ));
                queries.push(format!("\"{}\"", joined_title_keywords(title)));
            }
            (None, true) => {}
        }
    }

    // dedup, keeping order; exclude non-book material everywhere
    queries
        .into_iter()
        .filter(|q| !q.trim().is_empty())
        .collect::<IndexSet<String>>()
        .into_iter()
        .map(|q| format!("{} {}", q, MATERIAL_EXCLUSION))
        .collect()
}

/// Joiner-stripped, zero-stripped keyword tokens; single characters are
/// only kept when numeric.
fn keyword_tokens(title: &str, strip_subtitle: bool) -> Vec<String> {
    strip_german_joiners(&title_tokens(title, true, strip_subtitle))
        .into_iter()
        .filter(|t| t.chars().count() > 1 || t.chars().all(|c| c.is_numeric()))
        .map(|t| strip_zeros(&t).to_string())
        .collect()
}

fn joined_title_keywords(title: &str) -> String {
    title_tokens(title, true, true)
        .iter()
        .map(|t| strip_zeros(t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn person_clauses(authors: &[String]) -> Vec<String> {
    authors.iter().map(|a| format!("per=\"{}\"", a)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idn_short_circuits() {
        let queries = create_query_variations(Some("1136409025"), None, &[], Some("egal"));
        assert_eq!(
            queries,
            vec![format!("num=1136409025 {}", MATERIAL_EXCLUSION)]
        );
    }

    #[test]
    fn isbn_short_circuits() {
        let queries = create_query_variations(None, Some("9783404285266"), &[], None);
        assert_eq!(
            queries,
            vec![format!("num=9783404285266 {}", MATERIAL_EXCLUSION)]
        );
    }

    #[test]
    fn title_only_variations() {
        let queries =
            create_query_variations(None, None, &[], Some("Der Goblin-Held : Roman"));
        assert!(queries.len() >= 4);
        assert!(queries[0].starts_with("tit=\"Der Goblin-Held : Roman\""));
        // all queries carry the material exclusion
        assert!(queries.iter().all(|q| q.ends_with(MATERIAL_EXCLUSION)));
        // the joiner-stripped variant drops "Der" and the subtitle
        assert!(queries
            .iter()
            .any(|q| q.contains("tit=\"Goblin\" AND tit=\"Held\"")));
    }

    #[test]
    fn author_only_variations() {
        let authors = vec!["Jim C. Hines".to_string()];
        let queries = create_query_variations(None, None, &authors, None);
        assert!(queries[0].starts_with("per=\"Jim C. Hines\""));
        assert!(queries.iter().any(|q| q.contains("tit=\"Jim C. Hines\"")));
    }

    #[test]
    fn title_and_authors_start_with_strictest_query() {
        let authors = vec!["Jim C. Hines".to_string()];
        let queries =
            create_query_variations(None, None, &authors, Some("Der Goblin-Held"));
        assert!(queries[0].starts_with("tst=\"Der Goblin-Held\" AND per=\"Jim C. Hines\""));
        // swapped-index probe is present
        assert!(queries.iter().any(|q| q.contains("tit=\"Jim C. Hines\"")));
    }

    #[test]
    fn variations_are_deduplicated() {
        let queries = create_query_variations(None, None, &[], Some("Momo"));
        let mut seen = std::collections::HashSet::new();
        assert!(queries.iter().all(|q| seen.insert(q.clone())));
    }
}
