use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use glossary_types::{CategoryInfo, TermRecord, slugify};
use glossary_variants::Variants;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Dataset maintenance utilities")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the glossary dataset without starting the server.
    Lint {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryFile {
    terms: Vec<TermRecord>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Lint { data_dir } => {
            let issues = lint(&data_dir)?;
            if issues.is_empty() {
                println!("Dataset in {} is clean.", data_dir.display());
            } else {
                for issue in &issues {
                    eprintln!("- {issue}");
                }
                bail!("Dataset lint found {} issue(s).", issues.len());
            }
        }
    }

    Ok(())
}

/// Collect every dataset problem instead of stopping at the first, so one
/// lint run shows the full cleanup list.
fn lint(data_dir: &Path) -> Result<Vec<String>> {
    let manifest_path = data_dir.join("categories.json");
    let manifest = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    let categories: Vec<CategoryInfo> = serde_json::from_str(&manifest)
        .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

    let mut issues = Vec::new();

    let mut category_slugs: HashMap<String, String> = HashMap::new();
    for info in &categories {
        if let Some(prev) = category_slugs.insert(info.url_slug.clone(), info.id.to_string()) {
            issues.push(format!(
                "category slug {} used by both {} and {}",
                info.url_slug, prev, info.id
            ));
        }
    }

    // (term name, slug, category id) triples across the whole dataset.
    let mut terms: Vec<(String, String, String)> = Vec::new();
    let mut term_slugs: HashMap<String, String> = HashMap::new();

    for info in &categories {
        let path = data_dir.join(&info.file);
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file: CategoryFile = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        for record in &file.terms {
            let slug = slugify(&record.term);
            if slug.is_empty() {
                issues.push(format!(
                    "term {:?} in {} produces an empty slug",
                    record.term, info.file
                ));
            } else if let Some(prev) = term_slugs.insert(slug.clone(), record.term.clone()) {
                issues.push(format!(
                    "slug {} collides: {:?} and {:?}",
                    slug, prev, record.term
                ));
            }
            if record.definition.trim().is_empty() {
                issues.push(format!(
                    "term {:?} in {} has an empty definition",
                    record.term, info.file
                ));
            }
            terms.push((record.term.clone(), slug, info.id.to_string()));
        }

        for record in &file.terms {
            for related in &record.related_terms {
                let resolves = terms
                    .iter()
                    .any(|(name, _, _)| name.eq_ignore_ascii_case(related));
                if !resolves && !resolves_forward(related, &categories, data_dir)? {
                    issues.push(format!(
                        "related term {:?} of {:?} in {} does not name any term",
                        related, record.term, info.file
                    ));
                }
            }
        }
    }

    // Curated lists key on the canonical term name; each listed spelling must
    // stay distinct from every other canonical name or the matcher would link
    // one term's text to another.
    let variants = Variants::load(data_dir).context("failed to load curated variants")?;
    for (canonical, spellings) in variants.curated_entries() {
        if !terms
            .iter()
            .any(|(name, _, _)| name.eq_ignore_ascii_case(canonical))
        {
            issues.push(format!(
                "curated variants keyed on unknown term {canonical:?}"
            ));
        }
        for spelling in spellings {
            if terms.iter().any(|(name, _, _)| {
                name.eq_ignore_ascii_case(spelling) && !name.eq_ignore_ascii_case(canonical)
            }) {
                issues.push(format!(
                    "curated spelling {spelling:?} of {canonical:?} shadows another canonical term"
                ));
            }
        }
    }

    Ok(issues)
}

/// Related terms may reference entries in categories listed later in the
/// manifest, so an unresolved name gets a second pass over the whole set.
fn resolves_forward(related: &str, categories: &[CategoryInfo], data_dir: &Path) -> Result<bool> {
    for info in categories {
        let path = data_dir.join(&info.file);
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file: CategoryFile = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        if file
            .terms
            .iter()
            .any(|r| r.term.eq_ignore_ascii_case(related))
        {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_dataset(dir: &Path) {
        std::fs::write(
            dir.join("categories.json"),
            r#"[{"id": "glossary.hon", "file": "hons.json", "displayName": "Hons", "postNum": 8, "urlSlug": "hons"}]"#,
        )
        .unwrap();
    }

    #[test]
    fn clean_dataset_has_no_issues() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        std::fs::write(
            dir.path().join("hons.json"),
            r#"{"description": "d", "terms": [
                {"term": "Hon", "definition": "A term."},
                {"term": "Gigahon", "definition": "Another.", "relatedTerms": ["Hon"]}
            ]}"#,
        )
        .unwrap();
        assert!(lint(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn reports_collisions_and_empty_definitions() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        std::fs::write(
            dir.path().join("hons.json"),
            r#"{"description": "d", "terms": [
                {"term": "Hon", "definition": "A term."},
                {"term": "HON", "definition": "  "},
                {"term": "Gigahon", "definition": "x", "relatedTerms": ["Nothing Like This"]}
            ]}"#,
        )
        .unwrap();
        let issues = lint(dir.path()).unwrap();
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().any(|i| i.contains("slug hon collides")));
        assert!(issues.iter().any(|i| i.contains("empty definition")));
        assert!(issues.iter().any(|i| i.contains("Nothing Like This")));
    }

    #[test]
    fn reports_bad_curated_variants() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        std::fs::write(
            dir.path().join("hons.json"),
            r#"{"description": "d", "terms": [
                {"term": "Hon", "definition": "A term."},
                {"term": "Gigahon", "definition": "Another."}
            ]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("variants.json"),
            r#"{"Hon": ["gigahon"], "Spiro": ["spironolactone"]}"#,
        )
        .unwrap();
        let issues = lint(dir.path()).unwrap();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().any(|i| i.contains("shadows another canonical term")));
        assert!(issues.iter().any(|i| i.contains("unknown term \"Spiro\"")));
    }
}
