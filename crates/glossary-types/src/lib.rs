//! Shared types that mirror the glossary's on-disk JSON format.
//!
//! The goal is to expose the exact fields found in `categories.json` and the
//! per-category term files while making it cheap to build higher-level
//! tooling. Data-file structs deserialize the camelCase keys the dataset
//! uses; processed types ([`Term`], [`Category`]) add the derived fields
//! (slug, post number, owning category) that the rest of the workspace keys
//! on.
//!
//! Use [`CategoryId`] to key categories, [`TermEntry`] to describe one
//! searchable dictionary entry, and [`Segment`] for the output of the
//! auto-link matcher.
//!
//! ```rust
//! use glossary_types::slugify;
//!
//! assert_eq!(slugify("Brain Worms"), "brain-worms");
//! assert_eq!(slugify("🚂 Express"), "train-express");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Emoji that appear in term names and the word each one slugs to.
pub const EMOJI_WORDS: &[(char, &str)] = &[
    ('🚂', "train"),
    ('🦵', "knee"),
    ('🚬', "fag"),
    ('🐐', "goat"),
];

/// Dotted category identifier as used in `categories.json` (e.g. `lgbt.hon`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the category manifest (`categories.json`).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInfo {
    pub id: CategoryId,
    /// Data file holding the category body, relative to the data directory.
    pub file: String,
    pub display_name: String,
    /// Post number of the category header in the original thread; terms in
    /// the category number upward from it.
    pub post_num: u32,
    pub url_slug: String,
}

/// A term exactly as it appears in a category data file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermRecord {
    pub term: String,
    pub definition: String,
    #[serde(default)]
    pub related_terms: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_defining_term: bool,
}

/// A processed term: the raw record plus everything derived at load time.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    #[serde(flatten)]
    pub record: TermRecord,
    pub slug: String,
    pub category_id: CategoryId,
    pub category_slug: String,
    pub post_num: u32,
}

impl Term {
    pub fn name(&self) -> &str {
        &self.record.term
    }

    pub fn definition(&self) -> &str {
        &self.record.definition
    }
}

/// A fully loaded category: manifest row plus file body plus its terms.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub display_name: String,
    pub url_slug: String,
    pub post_num: u32,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_image: Option<String>,
    pub terms: Vec<Term>,
}

/// Where an accepted link points.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceTarget {
    pub term_slug: String,
    pub category_id: CategoryId,
    pub category_slug: String,
}

/// One searchable dictionary entry fed to the auto-link matcher.
///
/// `search_key` is matched case-insensitively; it is either the canonical
/// term itself or one of its generated variants. Distinct entries may carry
/// the same `search_key` (a variant of one term can collide with another
/// term's canonical form); the matcher's length-first ordering plus its
/// linked-canonical bookkeeping resolves those collisions deterministically.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermEntry {
    pub search_key: String,
    pub canonical_term: String,
    pub target: ReferenceTarget,
}

/// A span of matcher output. Concatenating the `text` of every segment in a
/// sequence reproduces the input text exactly.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Segment {
    Text { text: String },
    /// `text` preserves the casing found in the source; `term` is the
    /// canonical display name of the linked term.
    Reference {
        text: String,
        term: String,
        target: ReferenceTarget,
    },
}

impl Segment {
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text { text: text.into() }
    }

    /// The source text this segment covers.
    pub fn source_text(&self) -> &str {
        match self {
            Segment::Text { text } => text,
            Segment::Reference { text, .. } => text,
        }
    }
}

/// Turn a term name into its URL slug.
///
/// Emoji are substituted word-for-word first, then every run of
/// non-alphanumeric characters collapses to a single `-`, with leading and
/// trailing dashes trimmed.
pub fn slugify(term: &str) -> String {
    let mut expanded = String::with_capacity(term.len());
    for c in term.chars() {
        match EMOJI_WORDS.iter().find(|(emoji, _)| *emoji == c) {
            Some((_, word)) => {
                // Keep emoji-derived words separated from adjacent text.
                expanded.push(' ');
                expanded.push_str(word);
                expanded.push(' ');
            }
            None => expanded.push(c),
        }
    }

    let mut slug = String::with_capacity(expanded.len());
    let mut pending_dash = false;
    for c in expanded.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
