use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use glossary_linker::{Exclusions, linkify};
use glossary_store::{GalleryItem, Glossary, GraphData};
use glossary_types::{Category, CategoryId, Segment, Term};

use crate::tracker::{ArchiveStats, FrequencyPoint, Platform, PostArchive};

/// Texts longer than this are rejected by `/v1/linkify` outright.
pub const MAX_LINKIFY_LEN: usize = 64 * 1024;
/// Upper bound on terms per tracker query.
pub const MAX_TRACKED_TERMS: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub glossary: Arc<Glossary>,
    pub archive: Arc<PostArchive>,
    /// Derived once at startup; the dataset never changes mid-process.
    pub graph: Arc<GraphData>,
    pub max_page_size: usize,
    pub disable_cache: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(frontend))
        .route("/robots.txt", get(robots))
        .route("/healthz", get(healthz))
        .route("/v1/categories", get(categories))
        .route("/v1/categories/{slug}", get(category))
        .route("/v1/terms/{slug}", get(term))
        .route("/v1/linkify", get(linkify_text))
        .route("/v1/graph", get(graph))
        .route("/v1/gallery", get(gallery))
        .route("/v1/tracker/frequency", get(tracker_frequency))
        .route("/v1/tracker/stats", get(tracker_stats))
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }

    fn not_found<T: Into<String>>(msg: T) -> Self {
        ApiError::NotFound(msg.into())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::NotFound(msg) => {
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::NOT_FOUND, body).into_response()
            }
            ApiError::Internal => {
                let body = Json(json!({ "error": "internal server error" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn robots(State(state): State<AppState>) -> Response {
    let headers = axum::http::HeaderMap::from_iter([
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        ),
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=86400, immutable"),
        ),
    ]);
    if state.disable_cache {
        return "User-agent: *\nDisallow: /".into_response();
    }
    (headers, "User-agent: *\nDisallow: /").into_response()
}

async fn frontend(State(state): State<AppState>) -> Response {
    let html = Html(index_html());
    if state.disable_cache {
        return html.into_response();
    }
    (
        [(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=3600, immutable"),
        )],
        html,
    )
        .into_response()
}

/// Wrap a JSON payload with the standard cache header unless disabled.
fn cached_json<T: Serialize>(state: &AppState, payload: T) -> Response {
    if state.disable_cache {
        Json(payload).into_response()
    } else {
        (
            [(
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=300"),
            )],
            Json(payload),
        )
            .into_response()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CategorySummary<'a> {
    id: &'a CategoryId,
    display_name: &'a str,
    url_slug: &'a str,
    post_num: u32,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    term_count: usize,
}

#[derive(Serialize)]
struct CategoriesResponse<'a> {
    total: usize,
    items: Vec<CategorySummary<'a>>,
}

async fn categories(State(state): State<AppState>) -> Response {
    let items: Vec<CategorySummary<'_>> = state
        .glossary
        .categories()
        .iter()
        .map(|c| CategorySummary {
            id: &c.id,
            display_name: &c.display_name,
            url_slug: &c.url_slug,
            post_num: c.post_num,
            description: &c.description,
            icon: c.icon.as_deref(),
            term_count: c.terms.len(),
        })
        .collect();
    cached_json(
        &state,
        &CategoriesResponse {
            total: items.len(),
            items,
        },
    )
}

/// A term plus its pre-linkified definition.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TermView<'a> {
    #[serde(flatten)]
    term: &'a Term,
    definition_segments: Vec<Segment>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryResponse<'a> {
    id: &'a CategoryId,
    display_name: &'a str,
    url_slug: &'a str,
    post_num: u32,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_image: Option<&'a str>,
    terms: Vec<TermView<'a>>,
}

async fn category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let category = state
        .glossary
        .category_by_slug(&slug)
        .ok_or_else(|| ApiError::not_found(format!("no category with slug {slug}")))?;

    // Category pages never link to their own sibling terms.
    let terms = category
        .terms
        .iter()
        .map(|term| TermView {
            term,
            definition_segments: linkify(
                term.definition(),
                state.glossary.entries(),
                &Exclusions {
                    self_term: None,
                    self_category: Some(&category.id),
                    suppress_same_category: true,
                },
            ),
        })
        .collect();

    Ok(cached_json(&state, &category_response(category, terms)))
}

fn category_response<'a>(category: &'a Category, terms: Vec<TermView<'a>>) -> CategoryResponse<'a> {
    CategoryResponse {
        id: &category.id,
        display_name: &category.display_name,
        url_slug: &category.url_slug,
        post_num: category.post_num,
        description: &category.description,
        icon: category.icon.as_deref(),
        category_image: category.category_image.as_deref(),
        terms,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BacklinkView<'a> {
    term: &'a str,
    slug: &'a str,
    category_slug: &'a str,
    category_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TermResponse<'a> {
    #[serde(flatten)]
    term: &'a Term,
    category_name: &'a str,
    definition_segments: Vec<Segment>,
    backlinks: Vec<BacklinkView<'a>>,
}

async fn term(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let glossary = &state.glossary;
    let term = glossary
        .term_by_slug(&slug)
        .ok_or_else(|| ApiError::not_found(format!("no term with slug {slug}")))?;
    let category = glossary
        .category_by_id(&term.category_id)
        .ok_or(ApiError::Internal)?;

    let definition_segments = linkify(
        term.definition(),
        glossary.entries(),
        &Exclusions {
            // A term never links to itself on its own detail view.
            self_term: Some(term.name()),
            self_category: Some(&term.category_id),
            suppress_same_category: false,
        },
    );

    let backlinks = glossary
        .backlinks_for(&slug)
        .into_iter()
        .map(|b| BacklinkView {
            term: b.term.name(),
            slug: &b.term.slug,
            category_slug: &b.category.url_slug,
            category_name: &b.category.display_name,
        })
        .collect();

    Ok(cached_json(
        &state,
        &TermResponse {
            term,
            category_name: &category.display_name,
            definition_segments,
            backlinks,
        },
    ))
}

#[derive(Deserialize)]
pub struct LinkifyQuery {
    pub text: String,
    pub self_term: Option<String>,
    pub category: Option<String>,
    pub suppress_same_category: Option<bool>,
}

#[derive(Serialize)]
struct LinkifyResponse {
    segments: Vec<Segment>,
}

async fn linkify_text(
    State(state): State<AppState>,
    Query(params): Query<LinkifyQuery>,
) -> Result<Response, ApiError> {
    if params.text.is_empty() {
        return Err(ApiError::bad_request("text is required"));
    }
    if params.text.len() > MAX_LINKIFY_LEN {
        return Err(ApiError::bad_request(format!(
            "text must be at most {MAX_LINKIFY_LEN} bytes"
        )));
    }

    let category = match params.category.as_deref() {
        Some(slug) => Some(
            &state
                .glossary
                .category_by_slug(slug)
                .ok_or_else(|| ApiError::bad_request(format!("unknown category {slug}")))?
                .id,
        ),
        None => None,
    };

    let segments = linkify(
        &params.text,
        state.glossary.entries(),
        &Exclusions {
            self_term: params.self_term.as_deref(),
            self_category: category,
            suppress_same_category: params.suppress_same_category.unwrap_or(false),
        },
    );

    Ok(cached_json(&state, &LinkifyResponse { segments }))
}

async fn graph(State(state): State<AppState>) -> Response {
    cached_json(&state, state.graph.as_ref())
}

#[derive(Deserialize)]
pub struct GalleryQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Serialize)]
struct GalleryResponse {
    page: usize,
    page_size: usize,
    total: usize,
    has_more: bool,
    items: Vec<GalleryItem>,
}

async fn gallery(
    State(state): State<AppState>,
    Query(params): Query<GalleryQuery>,
) -> Result<Response, ApiError> {
    let page = params.page.unwrap_or(1);
    if page == 0 {
        return Err(ApiError::bad_request("page must be >= 1"));
    }
    let mut page_size = params.page_size.unwrap_or(50);
    if page_size == 0 {
        return Err(ApiError::bad_request("page_size must be >= 1"));
    }
    if page_size > state.max_page_size {
        page_size = state.max_page_size;
    }

    let all = state.glossary.gallery_items();
    let total = all.len();
    let offset = page.saturating_sub(1).saturating_mul(page_size);
    let items: Vec<GalleryItem> = all.into_iter().skip(offset).take(page_size).collect();
    let has_more = offset + items.len() < total;

    Ok(cached_json(
        &state,
        &GalleryResponse {
            page,
            page_size,
            total,
            has_more,
            items,
        },
    ))
}

#[derive(Deserialize)]
pub struct FrequencyQuery {
    /// Comma-separated term list.
    pub terms: String,
    /// Comma-separated subset of `forum,reddit`; both when omitted.
    pub platforms: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrequencyResponse {
    terms: Vec<String>,
    platforms: Vec<Platform>,
    months: Vec<FrequencyPoint>,
}

async fn tracker_frequency(
    State(state): State<AppState>,
    Query(params): Query<FrequencyQuery>,
) -> Result<Response, ApiError> {
    let terms: Vec<String> = params
        .terms
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if terms.is_empty() {
        return Err(ApiError::bad_request("terms is required"));
    }
    if terms.len() > MAX_TRACKED_TERMS {
        return Err(ApiError::bad_request(format!(
            "at most {MAX_TRACKED_TERMS} terms per query"
        )));
    }

    let platforms = match params.platforms.as_deref() {
        None => vec![Platform::Forum, Platform::Reddit],
        Some(raw) => {
            let mut parsed = Vec::new();
            for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let platform = Platform::parse(part)
                    .ok_or_else(|| ApiError::bad_request(format!("unknown platform {part}")))?;
                if !parsed.contains(&platform) {
                    parsed.push(platform);
                }
            }
            if parsed.is_empty() {
                return Err(ApiError::bad_request("platforms must not be empty"));
            }
            parsed
        }
    };

    let months = state.archive.frequency(&terms, &platforms);
    Ok(cached_json(
        &state,
        &FrequencyResponse {
            terms,
            platforms,
            months,
        },
    ))
}

#[derive(Serialize)]
struct StatsResponse {
    #[serde(flatten)]
    stats: ArchiveStats,
}

async fn tracker_stats(State(state): State<AppState>) -> Response {
    cached_json(
        &state,
        &StatsResponse {
            stats: state.archive.stats(),
        },
    )
}

const BASE_HTML: &str = include_str!("../templates/base.html");
const STYLE_HTML: &str = include_str!("../templates/style.html");
const HEADER_HTML: &str = include_str!("../templates/header.html");
const FOOTER_HTML: &str = include_str!("../templates/footer.html");
const GLOSSARY_BODY_HTML: &str = include_str!("../templates/glossary_body.html");
const GLOSSARY_SCRIPT: &str = include_str!("../templates/glossary_script.js");

fn render_page(title: &str, body: &str, script: &str) -> String {
    let header = HEADER_HTML.replace("{{title}}", title);
    BASE_HTML
        .replace("{{title}}", title)
        .replace("{{style}}", STYLE_HTML)
        .replace("{{header}}", &header)
        .replace("{{body}}", body)
        .replace("{{footer}}", FOOTER_HTML)
        .replace("{{scripts}}", &format!("<script>{}</script>", script))
}

fn index_html() -> String {
    render_page("Brainworms Glossary", GLOSSARY_BODY_HTML, GLOSSARY_SCRIPT)
}
