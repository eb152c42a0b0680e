use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use tower::util::ServiceExt;

use glossary_site::handlers::{AppState, router};
use glossary_site::tracker::PostArchive;
use glossary_store::Glossary;

fn make_state() -> AppState {
    let tempdir = tempfile::tempdir().unwrap();
    std::fs::write(
        tempdir.path().join("categories.json"),
        r#"[
            {"id": "glossary.hon", "file": "hons.json", "displayName": "Hons", "postNum": 8, "urlSlug": "hons"},
            {"id": "glossary.sui", "file": "mental.json", "displayName": "Mental Illness", "postNum": 24, "urlSlug": "mental-illness"}
        ]"#,
    )
    .unwrap();
    std::fs::write(
        tempdir.path().join("hons.json"),
        r#"{
            "description": "Archetypes.",
            "categoryImage": "imgs/hons.png",
            "terms": [
                {"term": "Hon", "definition": "Talks about brain worms and gigahons.", "isDefiningTerm": true},
                {"term": "Gigahon", "definition": "An extreme hon."}
            ]
        }"#,
    )
    .unwrap();
    std::fs::write(
        tempdir.path().join("mental.json"),
        r#"{
            "description": "Obsessions.",
            "terms": [
                {"term": "Brain Worms", "definition": "Intrusive obsessions shared by every hon."}
            ]
        }"#,
    )
    .unwrap();

    let glossary = Glossary::load(tempdir.path()).unwrap();
    let graph = Arc::new(glossary.graph());
    AppState {
        glossary,
        archive: PostArchive::placeholder(),
        graph,
        max_page_size: 500,
        disable_cache: false,
    }
}

async fn get_json(
    state: AppState,
    uri: &str,
) -> (StatusCode, serde_json::Value) {
    let app = router(state);
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body_bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let body = serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

#[tokio::test]
async fn healthz_ok() {
    let app = router(make_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn categories_lists_manifest_order() {
    let (status, body) = get_json(make_state(), "/v1/categories").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["urlSlug"], "hons");
    assert_eq!(body["items"][0]["termCount"], 2);
    assert_eq!(body["items"][1]["urlSlug"], "mental-illness");
}

#[tokio::test]
async fn category_detail_suppresses_sibling_links() {
    let (status, body) = get_json(make_state(), "/v1/categories/hons").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["displayName"], "Hons");

    // Hon's definition mentions both "brain worms" (other category: linked)
    // and "gigahons" (same category: suppressed on the category page).
    let segments = body["terms"][0]["definitionSegments"].as_array().unwrap();
    let refs: Vec<&str> = segments
        .iter()
        .filter(|s| s["kind"] == "reference")
        .map(|s| s["target"]["termSlug"].as_str().unwrap())
        .collect();
    assert_eq!(refs, vec!["brain-worms"]);
}

#[tokio::test]
async fn unknown_category_is_404() {
    let (status, body) = get_json(make_state(), "/v1/categories/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn term_detail_excludes_self_and_lists_backlinks() {
    let (status, body) = get_json(make_state(), "/v1/terms/hon").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["term"], "Hon");
    assert_eq!(body["categoryName"], "Hons");

    // "Hon" itself must not be linked on its own page, but sibling terms are
    // fair game on a detail view.
    let segments = body["definitionSegments"].as_array().unwrap();
    let refs: Vec<&str> = segments
        .iter()
        .filter(|s| s["kind"] == "reference")
        .map(|s| s["term"].as_str().unwrap())
        .collect();
    assert!(refs.contains(&"Brain Worms"));
    assert!(refs.contains(&"Gigahon"));
    assert!(!refs.contains(&"Hon"));

    // Both other terms mention "hon" in their definitions.
    let backlinks: Vec<&str> = body["backlinks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["slug"].as_str().unwrap())
        .collect();
    assert_eq!(backlinks, vec!["gigahon", "brain-worms"]);
}

#[tokio::test]
async fn linkify_endpoint_returns_segments() {
    let (status, body) = get_json(
        make_state(),
        "/v1/linkify?text=reading%20about%20brain%20worms%20today",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let segments = body["segments"].as_array().unwrap();
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0]["kind"], "text");
    assert_eq!(segments[1]["kind"], "reference");
    assert_eq!(segments[1]["text"], "brain worms");
    assert_eq!(segments[2]["text"], " today");
}

#[tokio::test]
async fn linkify_endpoint_rejects_empty_text() {
    let (status, body) = get_json(make_state(), "/v1/linkify?text=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn linkify_endpoint_rejects_unknown_category() {
    let (status, body) =
        get_json(make_state(), "/v1/linkify?text=hon&category=nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("unknown category"));
}

#[tokio::test]
async fn graph_endpoint_returns_nodes_and_links() {
    let (status, body) = get_json(make_state(), "/v1/graph").await;
    assert_eq!(status, StatusCode::OK);
    // Hub + 2 categories + 3 terms.
    assert_eq!(body["nodes"].as_array().unwrap().len(), 6);
    assert!(!body["links"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn gallery_paginates() {
    let (status, body) = get_json(make_state(), "/v1/gallery?page=1&page_size=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["has_more"], false);
    assert_eq!(body["items"][0]["image"], "hons.png");

    let (status, body) = get_json(make_state(), "/v1/gallery?page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("page"));
}

#[tokio::test]
async fn tracker_frequency_requires_terms() {
    let (status, body) = get_json(make_state(), "/v1/tracker/frequency?terms=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("terms"));
}

#[tokio::test]
async fn tracker_frequency_rejects_unknown_platform() {
    let (status, body) = get_json(
        make_state(),
        "/v1/tracker/frequency?terms=hon&platforms=tiktok",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("unknown platform"));
}

#[tokio::test]
async fn tracker_frequency_returns_monthly_series() {
    let (status, body) = get_json(
        make_state(),
        "/v1/tracker/frequency?terms=hon,boymoder&platforms=forum",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["terms"].as_array().unwrap().len(), 2);
    let months = body["months"].as_array().unwrap();
    assert!(!months.is_empty());
    let first = &months[0];
    assert_eq!(first["counts"].as_array().unwrap().len(), 2);
    // Forum-only query: reddit counts stay zero.
    assert_eq!(first["counts"][0]["reddit"], 0);
}

#[tokio::test]
async fn tracker_stats_reports_placeholder_archive() {
    let (status, body) = get_json(make_state(), "/v1/tracker/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["placeholder"], true);
    assert!(body["forumPosts"].as_u64().unwrap() > 0);
}
