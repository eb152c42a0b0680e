//! Term auto-linking: find known glossary terms in free text and annotate
//! them as cross-reference links.
//!
//! [`linkify`] is a pure function over an immutable dictionary slice. Longer
//! search keys claim their spans before shorter ones ("brain worms" wins over
//! "worms"), each canonical term links at most once per text block, and
//! accepted spans never overlap. The output is a sequence of [`Segment`]s
//! that covers the input exactly, so the rendering layer can interleave plain
//! text with links without re-deriving offsets.
//!
//! The matcher holds no state between calls and performs no I/O; callers are
//! expected to pass dictionaries that have already finished loading.

use std::collections::HashSet;

use regex::RegexBuilder;

use glossary_types::{CategoryId, Segment, TermEntry};

/// Matches that must be suppressed for the current view.
#[derive(Clone, Copy, Debug, Default)]
pub struct Exclusions<'a> {
    /// A term never links to itself on its own detail view.
    pub self_term: Option<&'a str>,
    /// Category owning the text being linkified.
    pub self_category: Option<&'a CategoryId>,
    /// When set, suppress links into `self_category` (category pages do not
    /// link sibling terms).
    pub suppress_same_category: bool,
}

impl<'a> Exclusions<'a> {
    fn excludes(&self, entry: &TermEntry) -> bool {
        if let Some(self_term) = self.self_term
            && entry.canonical_term.eq_ignore_ascii_case(self_term)
        {
            return true;
        }
        if self.suppress_same_category
            && let Some(category) = self.self_category
            && entry.target.category_id == *category
        {
            return true;
        }
        false
    }
}

/// An accepted occurrence, half-open over byte offsets into the source text.
#[derive(Debug)]
struct Match<'a> {
    start: usize,
    end: usize,
    entry: &'a TermEntry,
}

/// Annotate whole-word occurrences of dictionary terms in `text`.
///
/// `entries` is the concatenation of the primary and variant dictionaries in
/// insertion order; that order breaks ties between search keys of equal
/// length, so the result is deterministic. Empty input (either side) returns
/// the text unchanged as a single plain segment.
pub fn linkify(text: &str, entries: &[TermEntry], exclusions: &Exclusions) -> Vec<Segment> {
    if text.is_empty() || entries.is_empty() {
        return vec![Segment::text(text)];
    }

    // Longest search key first; sort_by is stable, so equal lengths keep
    // dictionary insertion order.
    let mut candidates: Vec<&TermEntry> = entries.iter().collect();
    candidates.sort_by(|a, b| b.search_key.len().cmp(&a.search_key.len()));

    let mut accepted: Vec<Match<'_>> = Vec::new();
    let mut linked: HashSet<String> = HashSet::new();

    for entry in candidates {
        // Each canonical term links at most once per text block, no matter
        // how many of its variants occur.
        if linked.contains(&entry.canonical_term.to_lowercase()) {
            continue;
        }
        if exclusions.excludes(entry) {
            continue;
        }

        let Some(regex) = word_regex(&entry.search_key) else {
            continue;
        };

        for found in regex.find_iter(text) {
            let (start, end) = (found.start(), found.end());
            if accepted.iter().any(|m| start < m.end && end > m.start) {
                continue;
            }
            accepted.push(Match { start, end, entry });
            linked.insert(entry.canonical_term.to_lowercase());
            break;
        }
    }

    accepted.sort_by_key(|m| m.start);

    let mut segments = Vec::with_capacity(accepted.len() * 2 + 1);
    let mut cursor = 0;
    for m in &accepted {
        if m.start > cursor {
            segments.push(Segment::text(&text[cursor..m.start]));
        }
        segments.push(Segment::Reference {
            text: text[m.start..m.end].to_string(),
            term: m.entry.canonical_term.clone(),
            target: m.entry.target.clone(),
        });
        cursor = m.end;
    }
    if cursor < text.len() || segments.is_empty() {
        segments.push(Segment::text(&text[cursor..]));
    }
    segments
}

/// Case-insensitive whole-word regex for a search key, metacharacters
/// escaped. Keys that cannot form a valid pattern are skipped rather than
/// failing the whole pass.
fn word_regex(search_key: &str) -> Option<regex::Regex> {
    if search_key.is_empty() {
        return None;
    }
    RegexBuilder::new(&format!(r"\b{}\b", regex::escape(search_key)))
        .case_insensitive(true)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use glossary_types::ReferenceTarget;

    use super::*;

    fn target(term_slug: &str, category: &str) -> ReferenceTarget {
        ReferenceTarget {
            term_slug: term_slug.to_string(),
            category_id: CategoryId::new(category),
            category_slug: category.rsplit('.').next().unwrap().to_string(),
        }
    }

    fn entry(search_key: &str, canonical: &str, category: &str) -> TermEntry {
        TermEntry {
            search_key: search_key.to_string(),
            canonical_term: canonical.to_string(),
            target: target(&glossary_types::slugify(canonical), category),
        }
    }

    fn concat(segments: &[Segment]) -> String {
        segments.iter().map(Segment::source_text).collect()
    }

    fn references(segments: &[Segment]) -> Vec<(&str, &str)> {
        segments
            .iter()
            .filter_map(|s| match s {
                Segment::Reference { text, term, .. } => Some((text.as_str(), term.as_str())),
                Segment::Text { .. } => None,
            })
            .collect()
    }

    #[test]
    fn empty_dictionary_returns_single_plain_segment() {
        let segments = linkify("some text", &[], &Exclusions::default());
        assert_eq!(segments, vec![Segment::text("some text")]);
    }

    #[test]
    fn empty_text_returns_single_plain_segment() {
        let dict = [entry("hon", "Hon", "glossary.hon")];
        let segments = linkify("", &dict, &Exclusions::default());
        assert_eq!(segments, vec![Segment::text("")]);
    }

    #[test]
    fn segments_cover_text_exactly() {
        let dict = [
            entry("hon", "Hon", "glossary.hon"),
            entry("boymoder", "Boymoder", "glossary.mtf"),
        ];
        let text = "a hon and a boymoder walk into a thread";
        let segments = linkify(text, &dict, &Exclusions::default());
        assert_eq!(concat(&segments), text);
        assert_eq!(references(&segments).len(), 2);
    }

    #[test]
    fn longest_search_key_wins() {
        let dict = [
            entry("hon", "Hon", "glossary.hon"),
            entry("gigahon", "Gigahon", "glossary.hon"),
        ];
        let segments = linkify("a gigahon appeared", &dict, &Exclusions::default());
        assert_eq!(references(&segments), vec![("gigahon", "Gigahon")]);
    }

    #[test]
    fn overlapping_shorter_term_is_not_linked() {
        let dict = [
            entry("brain worms", "Brain Worms", "glossary.sui"),
            entry("worms", "Worms", "glossary.misc"),
        ];
        let segments = linkify("reading about brain worms today", &dict, &Exclusions::default());
        assert_eq!(
            segments,
            vec![
                Segment::text("reading about "),
                Segment::Reference {
                    text: "brain worms".to_string(),
                    term: "Brain Worms".to_string(),
                    target: target("brain-worms", "glossary.sui"),
                },
                Segment::text(" today"),
            ]
        );
    }

    #[test]
    fn canonical_term_links_at_most_once() {
        // Both the plural variant and the surface form map to "Hon"; only the
        // first whole-word occurrence in scan order gets linked.
        let dict = [
            entry("hons", "Hon", "glossary.hon"),
            entry("hon", "Hon", "glossary.hon"),
        ];
        let segments = linkify("hons and a hon", &dict, &Exclusions::default());
        assert_eq!(references(&segments), vec![("hons", "Hon")]);
    }

    #[test]
    fn repeated_occurrences_of_one_key_link_once() {
        let dict = [entry("hon", "Hon", "glossary.hon")];
        let segments = linkify("hon here, hon there", &dict, &Exclusions::default());
        assert_eq!(references(&segments), vec![("hon", "Hon")]);
        assert_eq!(concat(&segments), "hon here, hon there");
    }

    #[test]
    fn self_term_is_excluded_case_insensitively() {
        let dict = [entry("hon", "Hon", "glossary.hon")];
        let exclusions = Exclusions {
            self_term: Some("Hon"),
            ..Exclusions::default()
        };
        let segments = linkify("every hon knows", &dict, &exclusions);
        assert!(references(&segments).is_empty());
        assert_eq!(concat(&segments), "every hon knows");
    }

    #[test]
    fn same_category_links_are_suppressed_when_requested() {
        let hon_category = CategoryId::new("glossary.hon");
        let dict = [
            entry("hon", "Hon", "glossary.hon"),
            entry("boymoder", "Boymoder", "glossary.mtf"),
        ];
        let exclusions = Exclusions {
            self_category: Some(&hon_category),
            suppress_same_category: true,
            ..Exclusions::default()
        };
        let segments = linkify("a hon and a boymoder", &dict, &exclusions);
        assert_eq!(references(&segments), vec![("boymoder", "Boymoder")]);
    }

    #[test]
    fn same_category_links_survive_without_the_flag() {
        let hon_category = CategoryId::new("glossary.hon");
        let dict = [entry("hon", "Hon", "glossary.hon")];
        let exclusions = Exclusions {
            self_category: Some(&hon_category),
            suppress_same_category: false,
            ..Exclusions::default()
        };
        let segments = linkify("a hon", &dict, &exclusions);
        assert_eq!(references(&segments), vec![("hon", "Hon")]);
    }

    #[test]
    fn respects_word_boundaries() {
        let dict = [entry("hon", "Hon", "glossary.hon")];
        let segments = linkify("an honest and dishonest take", &dict, &Exclusions::default());
        assert!(references(&segments).is_empty());
        assert_eq!(concat(&segments), "an honest and dishonest take");
    }

    #[test]
    fn matched_text_preserves_casing() {
        let dict = [entry("hon", "Hon", "glossary.hon")];
        let segments = linkify("HON rights", &dict, &Exclusions::default());
        assert_eq!(references(&segments), vec![("HON", "Hon")]);
    }

    #[test]
    fn escapes_regex_metacharacters_in_search_keys() {
        let dict = [entry("mogs/mogging", "Mogs/Mogging", "glossary.pass")];
        let segments = linkify("pure mogs/mogging energy", &dict, &Exclusions::default());
        assert_eq!(references(&segments), vec![("mogs/mogging", "Mogs/Mogging")]);

        // A key full of metacharacters must not match unrelated text.
        let dict = [entry("a.c", "a.c", "glossary.misc")];
        let segments = linkify("abc", &dict, &Exclusions::default());
        assert!(references(&segments).is_empty());
    }

    #[test]
    fn accepted_spans_never_overlap() {
        let dict = [
            entry("brain worms", "Brain Worms", "glossary.sui"),
            entry("worms brain", "Worms Brain", "glossary.misc"),
            entry("worms", "Worms", "glossary.misc"),
        ];
        let text = "brain worms brain worms";
        let segments = linkify(text, &dict, &Exclusions::default());
        assert_eq!(concat(&segments), text);

        let mut cursor = 0;
        for segment in &segments {
            let len = segment.source_text().len();
            assert_eq!(&text[cursor..cursor + len], segment.source_text());
            cursor += len;
        }
        assert_eq!(cursor, text.len());
    }

    #[test]
    fn equal_length_ties_keep_dictionary_order() {
        let dict = [
            entry("hon", "Hon", "glossary.hon"),
            entry("hon", "Honorific", "glossary.misc"),
        ];
        let segments = linkify("one hon", &dict, &Exclusions::default());
        assert_eq!(references(&segments), vec![("hon", "Hon")]);
    }
}
