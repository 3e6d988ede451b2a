mod errors;
mod params;

pub use params::PageParams;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use reqwest::Client;
use tracing::info;

use errors::{ErrorBody, soap_to_diagnostics, soap_to_html, soap_to_json};
use params::{DocumentParams, RawParams, SimilarParams, SuggestParams};

use crate::config::{Config, Facet};
use crate::render::html::{self, FacetSelect, RangeInput};
use crate::render::{DOCUMENT_PATH, ItemRenderer, Navigator, PAGE_SIZE, SIMILAR_PATH, Xsltproc};
use crate::soap::{QueryClause, SearchRequest, SearchResponse, SoapClient, SoapError};

const SUGGEST_COUNT: u32 = 10;

/// Shared state of all pages.
#[derive(Clone)]
pub struct Portal {
    soap: SoapClient,
    renderer: Arc<ItemRenderer>,
    settings: Arc<Settings>,
}

struct Settings {
    index: String,
    facet: Option<Facet>,
    range_fields: Vec<String>,
    sort: Option<(String, bool)>,
    title: String,
    term_limit: u32,
}

impl Portal {
    pub fn new(http: Client, config: &Config) -> Self {
        let renderer = match &config.stylesheet {
            Some(path) => ItemRenderer::Stylesheet(Xsltproc::new(&config.xsltproc, path.clone())),
            None => ItemRenderer::Escaped,
        };
        Self {
            soap: SoapClient::new(http, &config.service_url, &config.namespace),
            renderer: Arc::new(renderer),
            settings: Arc::new(Settings {
                index: config.index.clone(),
                facet: config.facet.clone(),
                range_fields: config.range_fields.clone(),
                sort: config.sort.clone(),
                title: config.title.clone(),
                term_limit: config.term_limit,
            }),
        }
    }

    fn facet_field(&self) -> Option<&str> {
        self.settings.facet.as_ref().map(|f| f.field.as_str())
    }

    /// Query form, facet selector, navigator and results.
    pub async fn portal_page(&self, path: &str, params: &PageParams) -> String {
        let mut out = html::page_start(&self.settings.title);
        if let Err(e) = self.portal_body(&mut out, path, params).await {
            out.push_str(&soap_to_html(&e));
        }
        out.push_str(html::PAGE_END);
        out
    }

    async fn portal_body(
        &self,
        out: &mut String,
        path: &str,
        params: &PageParams,
    ) -> Result<(), SoapError> {
        let terms = match &self.settings.facet {
            Some(facet) => Some(
                self.soap
                    .list_terms(&self.settings.index, &facet.field, None, self.settings.term_limit)
                    .await?,
            ),
            None => None,
        };
        let select = self
            .settings
            .facet
            .as_ref()
            .zip(terms.as_deref())
            .map(|(facet, terms)| FacetSelect {
                name: &facet.field,
                label: &facet.label,
                terms,
                selected: params.facet.as_deref(),
            });
        let ranges: Vec<RangeInput<'_>> = self
            .settings
            .range_fields
            .iter()
            .map(|field| {
                let (min, max) = params.range_values(field);
                RangeInput {
                    field: field.as_str(),
                    min,
                    max,
                }
            })
            .collect();
        out.push_str(&html::search_form(
            path,
            params.query.as_deref(),
            select.as_ref(),
            &ranges,
        ));

        if !params.has_constraints() {
            return Ok(());
        }

        let mut req = params.search_request(&self.settings.index, self.facet_field());
        if let Some((field, reverse)) = &self.settings.sort {
            req = req.sorted_by(field, *reverse);
        }
        let resp = self.soap.search(&req, params.offset, PAGE_SIZE).await?;
        info!(
            total = resp.total_count,
            results = resp.results.len(),
            query_ms = ?resp.query_time,
            "search complete"
        );

        let links = params.link_params(self.facet_field());
        self.listing(out, path, &links, &resp).await;
        Ok(())
    }

    async fn listing(
        &self,
        out: &mut String,
        path: &str,
        links: &[(String, String)],
        resp: &SearchResponse,
    ) {
        let nav = Navigator::new(path, links, resp.total_count, resp.offset).render();
        out.push_str(&nav);
        out.push_str(&format!("<ol start=\"{}\">\n", resp.offset.saturating_add(1)));
        for item in &resp.results {
            out.push_str(&self.renderer.render(item).await);
        }
        out.push_str("</ol>\n");
        out.push_str(&nav);
    }

    /// Debug page: free-text query, decoded response or the failed exchange.
    pub async fn raw_page(&self, path: &str, query: Option<&str>) -> String {
        let title = format!("{} (raw)", self.settings.title);
        let mut out = html::page_start(&title);
        out.push_str("<h2>Query</h2>\n");
        out.push_str(&html::search_form(path, query, None, &[]));

        if let Some(query) = query {
            let req = SearchRequest::new(&self.settings.index)
                .with_query(QueryClause::default_field(query));
            match self.soap.search(&req, 0, PAGE_SIZE).await {
                Ok(resp) => {
                    out.push_str("<h2>Result</h2>\n<pre>");
                    out.push_str(&html::html_escape(&format!("{resp:#?}")));
                    out.push_str("</pre>\n");
                }
                Err(e) => out.push_str(&soap_to_diagnostics(&e)),
            }
        }
        out.push_str(html::PAGE_END);
        out
    }

    pub async fn document_page(&self, identifier: &str) -> (StatusCode, String) {
        let mut out = html::page_start(&self.settings.title);
        let status = match self.soap.get_document(&self.settings.index, identifier).await {
            Ok(Some(item)) => {
                out.push_str("<ol>\n");
                out.push_str(&self.renderer.render(&item).await);
                out.push_str("</ol>\n");
                out.push_str(&similar_link(identifier));
                StatusCode::OK
            }
            Ok(None) => {
                out.push_str(&format!(
                    "<p>Document <code>{}</code> not found.</p>\n",
                    html::html_escape(identifier)
                ));
                StatusCode::NOT_FOUND
            }
            Err(e) => {
                out.push_str(&soap_to_html(&e));
                StatusCode::OK
            }
        };
        out.push_str(html::PAGE_END);
        (status, out)
    }

    pub async fn similar_page(&self, path: &str, params: &SimilarParams) -> String {
        let mut out = html::page_start(&self.settings.title);
        out.push_str(&format!(
            "<h2>Similar to <code>{}</code></h2>\n",
            html::html_escape(&params.id)
        ));
        let result = self
            .soap
            .more_like_this(
                &self.settings.index,
                &params.id,
                params.field(),
                params.offset(),
                PAGE_SIZE,
            )
            .await;
        match result {
            Ok(resp) => {
                let links = params.link_params();
                self.listing(&mut out, path, &links, &resp).await;
            }
            Err(e) => out.push_str(&soap_to_html(&e)),
        }
        out.push_str(html::PAGE_END);
        out
    }

    pub async fn suggest(&self, params: &SuggestParams) -> Result<Vec<String>, SoapError> {
        let Some(q) = params.q.as_deref().filter(|q| !q.trim().is_empty()) else {
            return Ok(Vec::new());
        };
        let clause = match params.field.as_deref().filter(|f| !f.is_empty()) {
            Some(field) => QueryClause::field(field, q),
            None => QueryClause::default_field(q),
        };
        self.soap
            .suggest(&self.settings.index, &clause, SUGGEST_COUNT)
            .await
    }
}

fn similar_link(identifier: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(identifier.as_bytes()).collect();
    format!("<p><a href=\"{SIMILAR_PATH}?id={encoded}\">Similar documents</a></p>\n")
}

pub fn router(portal: Portal) -> Router {
    Router::new()
        .route("/", get(portal_handler))
        .route("/raw", get(raw_handler))
        .route(DOCUMENT_PATH, get(document_handler))
        .route(SIMILAR_PATH, get(similar_handler))
        .route("/suggest", get(suggest_handler))
        .with_state(portal)
}

async fn portal_handler(
    State(portal): State<Portal>,
    uri: Uri,
    Query(raw): Query<HashMap<String, String>>,
) -> Html<String> {
    let params =
        PageParams::from_query(&raw, portal.facet_field(), &portal.settings.range_fields);
    info!(query = ?params.query, facet = ?params.facet, offset = params.offset, "page:portal");
    Html(portal.portal_page(uri.path(), &params).await)
}

async fn raw_handler(
    State(portal): State<Portal>,
    uri: Uri,
    Query(params): Query<RawParams>,
) -> Html<String> {
    let query = params.q.as_deref().filter(|q| !q.trim().is_empty());
    info!(query = ?query, "page:raw");
    Html(portal.raw_page(uri.path(), query).await)
}

async fn document_handler(
    State(portal): State<Portal>,
    Query(params): Query<DocumentParams>,
) -> (StatusCode, Html<String>) {
    info!(id = %params.id, "page:document");
    let (status, body) = portal.document_page(&params.id).await;
    (status, Html(body))
}

async fn similar_handler(
    State(portal): State<Portal>,
    uri: Uri,
    Query(params): Query<SimilarParams>,
) -> Html<String> {
    info!(id = %params.id, field = ?params.field(), "page:similar");
    Html(portal.similar_page(uri.path(), &params).await)
}

async fn suggest_handler(
    State(portal): State<Portal>,
    Query(params): Query<SuggestParams>,
) -> Result<Json<Vec<String>>, (StatusCode, Json<ErrorBody>)> {
    portal.suggest(&params).await.map(Json).map_err(soap_to_json)
}
