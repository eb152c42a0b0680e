//! Load a glossary dataset into an immutable, process-wide store.
//!
//! A dataset is a directory holding `categories.json` (an ordered manifest),
//! one JSON body file per category, and an optional `variants.json` of
//! curated spellings. [`Glossary::load`] reads everything once, assigns slugs
//! and post numbers, and derives the auto-link dictionary in a stable order:
//! every canonical term first, then every generated variant, both in load
//! order. That order is what makes the matcher's equal-length tie-break
//! deterministic.
//!
//! Public access is read-only (no `pub` fields); the store is built once at
//! startup and shared behind an `Arc` for the lifetime of the process.
//!
//! ```no_run
//! use glossary_store::Glossary;
//!
//! # fn main() -> anyhow::Result<()> {
//! let glossary = Glossary::load("data")?;
//! let term = glossary.term_by_slug("boymoder").expect("term present");
//! println!("{}: {}", term.name(), term.definition());
//! # Ok(()) }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use regex::RegexBuilder;
use serde::Deserialize;
use tracing::{info, warn};

use glossary_types::{
    Category, CategoryId, CategoryInfo, ReferenceTarget, Term, TermEntry, TermRecord, slugify,
};
use glossary_variants::{VariantSource, Variants};

mod graph;

pub use graph::{GraphData, GraphLink, GraphNode, LinkKind, NodeKind};

const MANIFEST_FILE: &str = "categories.json";

/// Body of one category data file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryFile {
    description: String,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    category_image: Option<String>,
    terms: Vec<TermRecord>,
}

/// The loaded dataset: categories in manifest order plus derived indices.
#[derive(Debug)]
pub struct Glossary {
    categories: Vec<Category>,
    category_by_id: HashMap<CategoryId, usize>,
    category_by_slug: HashMap<String, usize>,
    /// (category index, term index), keyed by term slug.
    term_by_slug: HashMap<String, (usize, usize)>,
    /// Primary entries (one per term) followed by variant entries, in load
    /// order.
    entries: Vec<TermEntry>,
    term_count: usize,
}

/// A term whose definition or related-terms list references another term.
#[derive(Clone, Debug)]
pub struct Backlink<'a> {
    pub term: &'a Term,
    pub category: &'a Category,
}

/// One gallery tile: a category image or a single term image.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub title: String,
    pub definition: String,
    /// File name only; the original paths carry directories we do not serve.
    pub image: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub category_slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_slug: Option<String>,
    pub is_category: bool,
}

impl Glossary {
    /// Load a dataset directory. Fails with context naming the offending
    /// file when the manifest or any category body is missing or malformed.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Arc<Self>> {
        let dir = data_dir.as_ref();
        let manifest_path = dir.join(MANIFEST_FILE);
        let raw = fs::read_to_string(&manifest_path)
            .with_context(|| format!("read manifest {}", manifest_path.display()))?;
        let manifest: Vec<CategoryInfo> = serde_json::from_str(&raw)
            .with_context(|| format!("parse manifest {}", manifest_path.display()))?;

        let variants = Variants::load(dir)?;
        if variants.curated_len() > 0 {
            info!("loaded {} curated variant lists", variants.curated_len());
        }

        let mut categories = Vec::with_capacity(manifest.len());
        let mut category_by_id = HashMap::new();
        let mut category_by_slug = HashMap::new();
        let mut term_by_slug = HashMap::new();
        let mut term_count = 0usize;

        for info in manifest {
            let path = dir.join(&info.file);
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("read category file {}", path.display()))?;
            let body: CategoryFile = serde_json::from_str(&raw)
                .with_context(|| format!("parse category file {}", path.display()))?;

            let cat_idx = categories.len();
            let terms: Vec<Term> = body
                .terms
                .into_iter()
                .enumerate()
                .map(|(idx, record)| Term {
                    slug: slugify(&record.term),
                    category_id: info.id.clone(),
                    category_slug: info.url_slug.clone(),
                    post_num: info.post_num + idx as u32 + 1,
                    record,
                })
                .collect();

            info!("loaded {} terms in category {}", terms.len(), info.id);
            term_count += terms.len();

            for (term_idx, term) in terms.iter().enumerate() {
                if term_by_slug
                    .insert(term.slug.clone(), (cat_idx, term_idx))
                    .is_some()
                {
                    warn!("duplicate term slug {}; keeping the later entry", term.slug);
                }
            }

            category_by_id.insert(info.id.clone(), cat_idx);
            category_by_slug.insert(info.url_slug.clone(), cat_idx);
            categories.push(Category {
                id: info.id,
                display_name: info.display_name,
                url_slug: info.url_slug,
                post_num: info.post_num,
                description: body.description,
                icon: body.icon,
                category_image: body.category_image,
                terms,
            });
        }

        let entries = build_entries(&categories, &variants);
        info!(
            "total terms indexed: {term_count}; dictionary entries: {}",
            entries.len()
        );

        Ok(Arc::new(Self {
            categories,
            category_by_id,
            category_by_slug,
            term_by_slug,
            entries,
            term_count,
        }))
    }

    /// Categories in manifest order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category_by_slug(&self, slug: &str) -> Option<&Category> {
        self.category_by_slug
            .get(slug)
            .map(|&idx| &self.categories[idx])
    }

    pub fn category_by_id(&self, id: &CategoryId) -> Option<&Category> {
        self.category_by_id
            .get(id)
            .map(|&idx| &self.categories[idx])
    }

    pub fn term_by_slug(&self, slug: &str) -> Option<&Term> {
        self.term_by_slug
            .get(slug)
            .map(|&(cat, term)| &self.categories[cat].terms[term])
    }

    /// The auto-link dictionary: primary entries first, variants after, both
    /// in load order.
    pub fn entries(&self) -> &[TermEntry] {
        &self.entries
    }

    pub fn term_count(&self) -> usize {
        self.term_count
    }

    /// Terms referencing `slug`, either by a whole-word mention of its name
    /// in their definition or by listing it under `related_terms`.
    pub fn backlinks_for(&self, slug: &str) -> Vec<Backlink<'_>> {
        let Some(subject) = self.term_by_slug(slug) else {
            return Vec::new();
        };
        let Some(mention) = word_regex(subject.name()) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for category in &self.categories {
            for term in &category.terms {
                if term.slug == subject.slug && category.id == subject.category_id {
                    continue;
                }
                let mentions = mention.is_match(term.definition());
                let related = term
                    .record
                    .related_terms
                    .iter()
                    .any(|r| r.eq_ignore_ascii_case(subject.name()));
                if mentions || related {
                    out.push(Backlink { term, category });
                }
            }
        }
        out
    }

    /// Every category image and term image flattened into gallery tiles,
    /// sorted by title.
    pub fn gallery_items(&self) -> Vec<GalleryItem> {
        let mut items = Vec::new();
        for category in &self.categories {
            if let Some(image) = &category.category_image {
                items.push(GalleryItem {
                    title: category.display_name.clone(),
                    definition: category.description.clone(),
                    image: file_name(image),
                    category_id: category.id.clone(),
                    category_name: category.display_name.clone(),
                    category_slug: category.url_slug.clone(),
                    term_slug: None,
                    is_category: true,
                });
            }
            for term in &category.terms {
                for image in &term.record.images {
                    items.push(GalleryItem {
                        title: term.name().to_string(),
                        definition: term.definition().to_string(),
                        image: file_name(image),
                        category_id: category.id.clone(),
                        category_name: category.display_name.clone(),
                        category_slug: category.url_slug.clone(),
                        term_slug: Some(term.slug.clone()),
                        is_category: false,
                    });
                }
            }
        }
        items.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        items
    }

    /// Derive the force-graph dataset (hub, category ring, term rings,
    /// related/mention links). Pure derivation; callers cache the result.
    pub fn graph(&self) -> GraphData {
        graph::build(self)
    }
}

fn build_entries(categories: &[Category], variants: &Variants) -> Vec<TermEntry> {
    let mut entries = Vec::new();

    for category in categories {
        for term in &category.terms {
            entries.push(TermEntry {
                search_key: term.name().to_string(),
                canonical_term: term.name().to_string(),
                target: target_for(term),
            });
        }
    }

    for category in categories {
        for term in &category.terms {
            for candidate in variants.candidates_for(term.name()) {
                // The surface form is already in the primary pass.
                if candidate.source == VariantSource::Surface {
                    continue;
                }
                entries.push(TermEntry {
                    search_key: candidate.text,
                    canonical_term: term.name().to_string(),
                    target: target_for(term),
                });
            }
        }
    }

    entries
}

fn target_for(term: &Term) -> ReferenceTarget {
    ReferenceTarget {
        term_slug: term.slug.clone(),
        category_id: term.category_id.clone(),
        category_slug: term.category_slug.clone(),
    }
}

fn word_regex(name: &str) -> Option<regex::Regex> {
    if name.is_empty() {
        return None;
    }
    RegexBuilder::new(&format!(r"\b{}\b", regex::escape(name)))
        .case_insensitive(true)
        .build()
        .ok()
}

fn file_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}
