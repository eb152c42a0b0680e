//! Force-graph dataset derivation.
//!
//! Nodes get seed positions (hub at the origin, categories on an outer ring,
//! terms on small rings around their category) so the client-side force
//! simulation starts from a readable layout instead of a random cloud.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use serde::Serialize;

use glossary_types::CategoryId;

use crate::Glossary;

const HUB_ID: &str = "glossary-central";
const CATEGORY_RING_RADIUS: f64 = 400.0;
const TERM_RING_RADIUS: f64 = 150.0;
const HUB_NODE_RADIUS: f64 = 30.0;
const CATEGORY_NODE_RADIUS: f64 = 20.0;
const DEFINING_TERM_NODE_RADIUS: f64 = 10.0;
const TERM_NODE_RADIUS: f64 = 6.0;
const FALLBACK_COLOR: &str = "#789";

/// Category ring palette, assigned by manifest position.
const PALETTE: &[&str] = &[
    "#FF6B9D", "#4ECDC4", "#FF6F61", "#95E1D3", "#A8E6CF", "#FFD93D", "#F38181", "#C7CEEA",
    "#B983FF", "#74C0FC", "#FFB7B2", "#B4E7CE", "#DDA0DD", "#F4A261", "#E76F51", "#FFE5CC",
    "#AA96DA", "#FCBAD3", "#A8DADC", "#F1E4E8", "#E2D4BA", "#8B80F9", "#FAD4D4", "#D3D3D3",
];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Central,
    Category,
    Term,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkKind {
    CentralCategory,
    Category,
    Related,
    Mentioned,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    pub radius: f64,
    pub color: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
    pub strength: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

pub(crate) fn build(glossary: &Glossary) -> GraphData {
    let mut nodes: Vec<GraphNode> = Vec::new();
    let mut node_ids: HashSet<String> = HashSet::new();
    let mut links: Vec<GraphLink> = Vec::new();

    // The hub circle itself is drawn transparent; the client renders artwork
    // over it.
    nodes.push(GraphNode {
        id: HUB_ID.to_string(),
        name: String::new(),
        kind: NodeKind::Central,
        category_id: None,
        definition: None,
        radius: HUB_NODE_RADIUS,
        color: "rgba(0,0,0,0)".to_string(),
        x: 0.0,
        y: 0.0,
    });
    node_ids.insert(HUB_ID.to_string());

    let categories = glossary.categories();
    let angle_step = 2.0 * PI / categories.len().max(1) as f64;

    for (cat_idx, category) in categories.iter().enumerate() {
        let color = PALETTE
            .get(cat_idx)
            .copied()
            .unwrap_or(FALLBACK_COLOR)
            .to_string();
        // Start from 12 o'clock and walk clockwise.
        let angle = cat_idx as f64 * angle_step - PI / 2.0;
        let (cat_x, cat_y) = (
            CATEGORY_RING_RADIUS * angle.cos(),
            CATEGORY_RING_RADIUS * angle.sin(),
        );
        let category_node_id = format!("category-{}", category.id);
        nodes.push(GraphNode {
            id: category_node_id.clone(),
            name: category.display_name.clone(),
            kind: NodeKind::Category,
            category_id: Some(category.id.clone()),
            definition: None,
            radius: CATEGORY_NODE_RADIUS,
            color: color.clone(),
            x: cat_x,
            y: cat_y,
        });
        node_ids.insert(category_node_id.clone());
        links.push(GraphLink {
            source: HUB_ID.to_string(),
            target: category_node_id.clone(),
            kind: LinkKind::CentralCategory,
            strength: 0.8,
        });

        let term_angle_step = 2.0 * PI / category.terms.len().max(1) as f64;
        for (term_idx, term) in category.terms.iter().enumerate() {
            if node_ids.contains(&term.slug) {
                continue;
            }
            let term_angle = term_idx as f64 * term_angle_step;
            nodes.push(GraphNode {
                id: term.slug.clone(),
                name: term.name().to_string(),
                kind: NodeKind::Term,
                category_id: Some(category.id.clone()),
                definition: Some(term.definition().to_string()),
                radius: if term.record.is_defining_term {
                    DEFINING_TERM_NODE_RADIUS
                } else {
                    TERM_NODE_RADIUS
                },
                color: color.clone(),
                x: cat_x + TERM_RING_RADIUS * term_angle.cos(),
                y: cat_y + TERM_RING_RADIUS * term_angle.sin(),
            });
            node_ids.insert(term.slug.clone());
            links.push(GraphLink {
                source: category_node_id.clone(),
                target: term.slug.clone(),
                kind: LinkKind::Category,
                strength: 0.5,
            });
        }
    }

    let mut linked_pairs: HashSet<(String, String)> = links
        .iter()
        .map(|l| undirected(&l.source, &l.target))
        .collect();

    // Explicit related-term links.
    let slug_by_name: HashMap<String, String> = categories
        .iter()
        .flat_map(|c| &c.terms)
        .map(|t| (t.name().to_lowercase(), t.slug.clone()))
        .collect();

    for category in categories {
        for term in &category.terms {
            for related in &term.record.related_terms {
                let Some(target_slug) = slug_by_name.get(&related.to_lowercase()) else {
                    continue;
                };
                if *target_slug == term.slug || !node_ids.contains(target_slug) {
                    continue;
                }
                if linked_pairs.insert(undirected(&term.slug, target_slug)) {
                    links.push(GraphLink {
                        source: term.slug.clone(),
                        target: target_slug.clone(),
                        kind: LinkKind::Related,
                        strength: 1.0,
                    });
                }
            }
        }
    }

    // Implicit links: one term's definition mentioning another term (or one
    // of its variants) as a substring.
    for category in categories {
        for term in &category.terms {
            let definition = term.definition().to_lowercase();
            let mut mentioned: Vec<String> = Vec::new();
            for entry in glossary.entries() {
                if entry.canonical_term == term.name() {
                    continue;
                }
                if definition.contains(&entry.search_key.to_lowercase())
                    && node_ids.contains(&entry.target.term_slug)
                    && !mentioned.contains(&entry.target.term_slug)
                {
                    mentioned.push(entry.target.term_slug.clone());
                }
            }
            for target_slug in mentioned {
                if target_slug == term.slug {
                    continue;
                }
                if linked_pairs.insert(undirected(&term.slug, &target_slug)) {
                    links.push(GraphLink {
                        source: term.slug.clone(),
                        target: target_slug,
                        kind: LinkKind::Mentioned,
                        strength: 0.7,
                    });
                }
            }
        }
    }

    GraphData { nodes, links }
}

fn undirected(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}
