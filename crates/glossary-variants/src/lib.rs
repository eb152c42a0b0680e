//! Variant generation for glossary terms.
//!
//! A term is findable in running text under more forms than its canonical
//! name: plurals, typographic-apostrophe spellings, and hand-curated synonyms
//! ("hormone replacement therapy" for "HRT"). This crate turns one canonical
//! term into the full list of search keys the auto-link matcher should try.
//!
//! Rule-based variants (plural toggles, apostrophe substitution) live in
//! code; curated synonym lists are data, loaded from an optional
//! `variants.json` in the dataset directory. Missing files are treated as
//! empty. Every candidate records where it came from so callers can rank or
//! debug the expansion.
//!
//! ```no_run
//! use glossary_variants::Variants;
//!
//! # fn main() -> anyhow::Result<()> {
//! let variants = Variants::load("data")?;
//! for cand in variants.candidates_for("Boymoder") {
//!     println!("{:?}: {}", cand.source, cand.text);
//! }
//! # Ok(()) }
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Where a candidate search key originated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VariantSource {
    /// The canonical term itself.
    Surface,
    /// Plural/singular toggle (`s` stripped or appended).
    Plural,
    /// Typographic apostrophe substituted for the ASCII one, or vice versa.
    Apostrophe,
    /// Entry from the curated `variants.json` list.
    Curated,
}

/// A search-key candidate paired with its provenance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariantCandidate {
    pub text: String,
    pub source: VariantSource,
}

const ASCII_APOSTROPHE: char = '\'';
const TYPOGRAPHIC_APOSTROPHE: char = '\u{2019}';

/// Variant generator: rule tables plus the curated synonym map.
pub struct Variants {
    curated: HashMap<String, Vec<String>>,
}

impl Variants {
    /// Generator with no curated entries; rule-based variants only.
    pub fn empty() -> Self {
        Self {
            curated: HashMap::new(),
        }
    }

    /// Load curated synonym lists from `variants.json` in `data_dir`.
    ///
    /// The file maps canonical term names to arrays of alternate spellings.
    /// It is optional; a missing file yields an empty map.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self> {
        let path = data_dir.as_ref().join("variants.json");
        if !path.exists() {
            return Ok(Self::empty());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("read variants file {}", path.display()))?;
        let curated: HashMap<String, Vec<String>> = serde_json::from_str(&raw)
            .with_context(|| format!("parse variants file {}", path.display()))?;
        Ok(Self { curated })
    }

    /// Number of canonical terms with curated variant lists.
    pub fn curated_len(&self) -> usize {
        self.curated.len()
    }

    /// Curated variants for `term`, if any were configured.
    pub fn curated_for(&self, term: &str) -> Option<&[String]> {
        self.curated.get(term).map(Vec::as_slice)
    }

    /// Iterate over every curated `(variant, canonical terms)` pair.
    pub fn curated_entries(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.curated
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Generate every search-key candidate for one canonical term.
    ///
    /// Candidates are deduplicated case-insensitively and emitted in a stable
    /// order: surface form first, then plural toggles, apostrophe
    /// substitutions, and finally the curated list in file order.
    pub fn candidates_for(&self, term: &str) -> Vec<VariantCandidate> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut out: Vec<VariantCandidate> = Vec::new();

        push_unique(
            &mut out,
            &mut seen,
            VariantCandidate {
                text: term.to_string(),
                source: VariantSource::Surface,
            },
        );

        for text in plural_toggles(term) {
            push_unique(
                &mut out,
                &mut seen,
                VariantCandidate {
                    text,
                    source: VariantSource::Plural,
                },
            );
        }

        for text in apostrophe_swaps(term) {
            push_unique(
                &mut out,
                &mut seen,
                VariantCandidate {
                    text,
                    source: VariantSource::Apostrophe,
                },
            );
        }

        if let Some(entries) = self.curated.get(term) {
            for text in entries {
                push_unique(
                    &mut out,
                    &mut seen,
                    VariantCandidate {
                        text: text.clone(),
                        source: VariantSource::Curated,
                    },
                );
            }
        }

        out
    }
}

fn push_unique(
    out: &mut Vec<VariantCandidate>,
    seen: &mut HashSet<String>,
    candidate: VariantCandidate,
) {
    if seen.insert(candidate.text.to_lowercase()) {
        out.push(candidate);
    }
}

/// Strip a trailing `s`, or append one when absent.
fn plural_toggles(term: &str) -> Vec<String> {
    match term.strip_suffix('s').or_else(|| term.strip_suffix('S')) {
        Some(stem) if !stem.is_empty() => vec![stem.to_string()],
        _ => vec![format!("{term}s")],
    }
}

/// Swap between ASCII and typographic apostrophes when either is present.
fn apostrophe_swaps(term: &str) -> Vec<String> {
    let mut out = Vec::new();
    if term.contains(ASCII_APOSTROPHE) {
        out.push(term.replace(ASCII_APOSTROPHE, &TYPOGRAPHIC_APOSTROPHE.to_string()));
    }
    if term.contains(TYPOGRAPHIC_APOSTROPHE) {
        out.push(term.replace(TYPOGRAPHIC_APOSTROPHE, &ASCII_APOSTROPHE.to_string()));
    }
    out
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn surface_form_comes_first() {
        let variants = Variants::empty();
        let cands = variants.candidates_for("Hon");
        assert_eq!(cands[0].text, "Hon");
        assert_eq!(cands[0].source, VariantSource::Surface);
    }

    #[test]
    fn pluralizes_and_singularizes() {
        let variants = Variants::empty();
        let cands = variants.candidates_for("Hon");
        assert!(cands.iter().any(|c| c.text == "Hons"));

        let cands = variants.candidates_for("Brain Worms");
        assert!(cands.iter().any(|c| c.text == "Brain Worm"));
    }

    #[test]
    fn swaps_apostrophes_both_ways() {
        let variants = Variants::empty();
        let cands = variants.candidates_for("girl's brain");
        assert!(cands.iter().any(|c| c.text == "girl\u{2019}s brain"));

        let cands = variants.candidates_for("girl\u{2019}s brain");
        assert!(cands.iter().any(|c| c.text == "girl's brain"));
    }

    #[test]
    fn curated_entries_are_appended_without_duplicates() {
        let mut curated = HashMap::new();
        curated.insert(
            "HRT".to_string(),
            vec![
                "hormone replacement therapy".to_string(),
                "hormones".to_string(),
                "hrts".to_string(), // collides with the plural rule
            ],
        );
        let variants = Variants { curated };
        let cands = variants.candidates_for("HRT");
        let texts: Vec<&str> = cands.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["HRT", "HRTs", "hormone replacement therapy", "hormones"]
        );
        assert_eq!(cands.last().unwrap().source, VariantSource::Curated);
    }

    #[test]
    fn missing_variants_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let variants = Variants::load(dir.path()).unwrap();
        assert_eq!(variants.curated_len(), 0);
    }

    #[test]
    fn loads_variants_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("variants.json")).unwrap();
        write!(file, r#"{{"MTF": ["trans woman", "trans women"]}}"#).unwrap();

        let variants = Variants::load(dir.path()).unwrap();
        assert_eq!(variants.curated_len(), 1);
        assert_eq!(
            variants.curated_for("MTF").unwrap(),
            &["trans woman".to_string(), "trans women".to_string()]
        );
    }

    #[test]
    fn rejects_malformed_variants_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("variants.json"), "not json").unwrap();
        assert!(Variants::load(dir.path()).is_err());
    }
}
