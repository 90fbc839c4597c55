use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sitescan_client::build_orchestrator;
use sitescan_core::capability::Capabilities;
use sitescan_core::config::CrawlerConfig;
use sitescan_core::job::CrawlJob;
use sitescan_core::job_store::InMemoryJobStore;
use sitescan_core::traits::JobStore;
use sitescan_server::routes;
use sitescan_server::state::AppState;

pub const TEST_API_KEY: &str = "test-secret-key";

pub const ARTICLE_PAGE: &str = r#"<html lang="en"><head><title>Release notes</title>
<meta name="description" content="What changed in the latest software release"></head>
<body><article><h1>Release notes</h1><p>The platform now ships a new device app.</p></article></body></html>"#;

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Poll the store until the job leaves Pending/Running.
    pub async fn wait_for_terminal(&self, id: Uuid) -> CrawlJob {
        for _ in 0..250 {
            if let Some(job) = self.state.store().get_job(id).await.unwrap() {
                if job.status.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job {id} did not finish in time");
    }
}

pub fn setup_test_app(api_key: Option<&str>) -> TestApp {
    let config = CrawlerConfig::default()
        .with_user_agent("SitescanTest/1.0")
        .with_request_delay(Duration::from_millis(10))
        .with_timeout(Duration::from_secs(5))
        .with_browser_emulation(false)
        .with_max_attempts(1);
    let capabilities = Capabilities::new(false);
    let orchestrator =
        build_orchestrator(&config, &capabilities, InMemoryJobStore::new()).unwrap();

    let state = Arc::new(AppState::new(
        orchestrator,
        capabilities,
        api_key.map(str::to_string),
    ));

    TestApp {
        router: routes::router(state.clone()),
        state,
    }
}

/// Mock site that disallows `/private` for every agent.
pub async fn mock_site() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blog/release"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(ARTICLE_PAGE.as_bytes().to_vec(), "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"<html></html>".to_vec(), "text/html")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    server
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
