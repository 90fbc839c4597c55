use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sitescan API",
        version = "0.1.0",
        description = "Polite crawling with robots.txt enforcement, per-origin rate limiting and SEO page analysis."
    ),
    paths(
        crate::routes::crawl,
        crate::routes::get_result,
        crate::routes::list_jobs,
        crate::routes::cancel_job,
        crate::routes::root,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::CrawlRequest,
        crate::dto::CrawlResponse,
        crate::dto::CrawlResult,
        crate::dto::RequestStatus,
        crate::dto::FetchInfo,
        crate::dto::FailureResponse,
        crate::dto::JobResponse,
        crate::dto::JobListResponse,
        crate::dto::RootResponse,
        crate::dto::HealthResponse,
        crate::dto::HealthComponents,
        crate::dto::JobCounts,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "crawl", description = "Crawl submission and result polling"),
        (name = "jobs", description = "Crawl job management"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the Bearer token security scheme to the OpenAPI document.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("token")
                        .description(Some(
                            "API key. Required only when SITESCAN_API_KEY is set.",
                        ))
                        .build(),
                ),
            );
        }
    }
}
