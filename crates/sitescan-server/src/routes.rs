use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use chrono::Utc;
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use sitescan_core::job::{CrawlJob, JobOptions, JobStatus};
use sitescan_core::traits::{ContentClassifier, JobStore, MetadataExtractor};

use crate::auth::require_api_key;
use crate::dto::{
    CrawlRequest, CrawlResponse, CrawlResult, FailureResponse, FetchInfo, HealthComponents,
    HealthResponse, JobCounts, JobListResponse, JobResponse, ListJobsQuery, RequestStatus, RootResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Crawl requests are a URL and a flag; anything larger is rejected.
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/crawl", post(crawl))
        .route("/result/{request_id}", get(get_result))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{request_id}", delete(cancel_job))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let public = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

/// Unknown and malformed ids are both reported as not found.
fn parse_request_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("Request ID not found: {raw}")))
}

// ---------------------------------------------------------------------------
// Crawl
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/crawl",
    request_body = CrawlRequest,
    responses(
        (status = 202, description = "Crawl accepted", body = CrawlResponse),
        (status = 400, description = "Invalid URL", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "crawl"
)]
pub async fn crawl(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<CrawlRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let options = JobOptions {
        respect_robots: body.respect_robots,
    };
    let request_id = state.orchestrator.submit(&body.url, options).await?;
    tracing::info!(%request_id, url = %body.url, "Crawl request accepted");

    Ok((
        StatusCode::ACCEPTED,
        axum::Json(CrawlResponse::processing(request_id)),
    ))
}

#[utoipa::path(
    get,
    path = "/result/{request_id}",
    params(
        ("request_id" = Uuid, Path, description = "ID returned by POST /crawl")
    ),
    responses(
        (status = 200, description = "Current state of the request", body = CrawlResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "crawl"
)]
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = parse_request_id(&request_id)?;
    let job = state
        .store()
        .get_job(request_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Request ID not found: {request_id}")))?;

    Ok(axum::Json(crawl_response(&state, job)?))
}

/// Render a job for pollers. Completed jobs are analysed on read.
fn crawl_response(state: &AppState, job: CrawlJob) -> Result<CrawlResponse, ApiError> {
    let status = RequestStatus::from(job.status);
    let mut response = CrawlResponse {
        request_id: job.id,
        status,
        result: None,
        error: None,
    };

    match status {
        RequestStatus::Processing => {}
        RequestStatus::Failed => {
            response.error = job.error.map(FailureResponse::from);
        }
        RequestStatus::Completed => {
            if let Some(page) = job.result {
                let metadata = state.extractor.extract(&page.document, &page.url)?;
                let classification = state.classifier.classify(&metadata);
                response.result = Some(CrawlResult {
                    url: job.url,
                    fetch: FetchInfo::new(&page, job.attempts),
                    metadata,
                    classification,
                });
            }
        }
    }

    Ok(response)
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/jobs",
    params(ListJobsQuery),
    responses(
        (status = 200, description = "List of jobs", body = JobListResponse),
        (status = 400, description = "Unknown status filter", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListJobsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status_filter = query
        .status
        .map(|s| s.parse::<JobStatus>().map_err(ApiError::BadRequest))
        .transpose()?;

    let limit = query.limit.unwrap_or(20).min(100);
    let jobs = state.store().list_jobs(status_filter, limit).await?;
    let total = jobs.len();

    let response = JobListResponse {
        jobs: jobs.into_iter().map(JobResponse::from).collect(),
        total,
    };

    Ok(axum::Json(response))
}

#[utoipa::path(
    delete,
    path = "/jobs/{request_id}",
    params(
        ("request_id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 204, description = "Job cancelled"),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 409, description = "Job already finished", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "jobs"
)]
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = parse_request_id(&request_id)?;
    state.orchestrator.cancel(request_id).await?;
    tracing::info!(%request_id, "Cancellation requested");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service is running", body = RootResponse),
    ),
    tag = "system"
)]
pub async fn root() -> impl IntoResponse {
    axum::Json(RootResponse {
        status: "OK",
        message: "Sitescan crawl API is running",
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Component status", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let render_fallback = if state.capabilities.render_fallback {
        "available"
    } else {
        "unavailable"
    };

    let store = state.store();
    let jobs = JobCounts {
        pending: store.count_by_status(JobStatus::Pending).await?,
        running: store.count_by_status(JobStatus::Running).await?,
        completed: store.count_by_status(JobStatus::Completed).await?,
        failed: store.count_by_status(JobStatus::Failed).await?,
    };

    Ok(axum::Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        components: HealthComponents {
            crawler: "ok",
            metadata_extractor: "ok",
            content_classifier: "ok",
            render_fallback,
        },
        active_jobs: state.orchestrator.active_jobs(),
        jobs,
    }))
}
