use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use uuid::Uuid;

use crate::common::{TEST_API_KEY, get, json_body, mock_site, post_json, setup_test_app};

fn authed(mut request: Request<Body>) -> Request<Body> {
    request.headers_mut().insert(
        "authorization",
        format!("Bearer {TEST_API_KEY}").parse().unwrap(),
    );
    request
}

async fn submit(app: &crate::common::TestApp, url: &str) -> Uuid {
    let response = app.send(post_json("/crawl", &json!({ "url": url }))).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = json_body(response).await;
    assert_eq!(json["status"], "processing");
    json["request_id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn root_returns_ok() {
    let app = setup_test_app(None);

    let response = app.send(get("/")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "OK");
}

#[tokio::test]
async fn health_reports_render_capability() {
    let app = setup_test_app(Some(TEST_API_KEY));

    let response = app.send(get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["components"]["crawler"], "ok");
    assert_eq!(json["components"]["render_fallback"], "unavailable");
    assert_eq!(json["active_jobs"], 0);
    assert_eq!(json["jobs"]["pending"], 0);
    assert_eq!(json["jobs"]["completed"], 0);
}

#[tokio::test]
async fn health_counts_jobs_by_status() {
    let site = mock_site().await;
    let app = setup_test_app(None);

    let done = submit(&app, &format!("{}/blog/release", site.uri())).await;
    let denied = submit(&app, &format!("{}/private/x", site.uri())).await;
    app.wait_for_terminal(done).await;
    app.wait_for_terminal(denied).await;

    let json = json_body(app.send(get("/health")).await).await;
    assert_eq!(json["jobs"]["completed"], 1);
    assert_eq!(json["jobs"]["failed"], 1);
    assert_eq!(json["jobs"]["running"], 0);
    assert_eq!(json["jobs"]["pending"], 0);
}

#[tokio::test]
async fn openapi_document_is_public() {
    let app = setup_test_app(Some(TEST_API_KEY));

    let response = app.send(get("/api-docs/openapi.json")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["paths"]["/crawl"].is_object());
    assert!(json["paths"]["/result/{request_id}"].is_object());
}

#[tokio::test]
async fn unauthenticated_request_returns_401() {
    let app = setup_test_app(Some(TEST_API_KEY));

    let response = app.send(get("/jobs")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn wrong_api_key_returns_401() {
    let app = setup_test_app(Some(TEST_API_KEY));

    let response = app
        .send(
            Request::post("/crawl")
                .header("authorization", "Bearer wrong-key")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"url":"https://example.com"}"#))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.state.store().len(), 0);
}

#[tokio::test]
async fn valid_api_key_is_accepted() {
    let app = setup_test_app(Some(TEST_API_KEY));

    let response = app.send(authed(get("/jobs"))).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn crawl_then_poll_returns_analysis() {
    let site = mock_site().await;
    let app = setup_test_app(None);

    let id = submit(&app, &format!("{}/blog/release", site.uri())).await;
    app.wait_for_terminal(id).await;

    let response = app.send(get(&format!("/result/{id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;

    assert_eq!(json["status"], "completed");
    assert!(json.get("error").is_none());
    let result = &json["result"];
    assert_eq!(result["metadata"]["title"], "Release notes");
    assert_eq!(result["metadata"]["language"], "en");
    assert_eq!(result["classification"]["page_type"], "article");
    assert_eq!(result["classification"]["categories"][0]["name"], "technology");
    assert_eq!(result["fetch"]["strategy"], "direct");
    assert_eq!(result["fetch"]["status_code"], 200);
    assert_eq!(result["fetch"]["attempts"], 1);
    assert!(result.get("document").is_none());
    assert!(result["fetch"].get("document").is_none());
}

#[tokio::test]
async fn robots_denial_is_reported_as_failure() {
    let site = mock_site().await;
    let app = setup_test_app(None);

    let id = submit(&app, &format!("{}/private/area", site.uri())).await;
    app.wait_for_terminal(id).await;

    let json = json_body(app.send(get(&format!("/result/{id}"))).await).await;
    assert_eq!(json["status"], "failed");
    assert_eq!(json["error"]["kind"], "policy_denied");
    assert!(json.get("result").is_none());
}

#[tokio::test]
async fn respect_robots_false_overrides_denial() {
    let site = mock_site().await;
    let app = setup_test_app(None);

    let response = app
        .send(post_json(
            "/crawl",
            &json!({ "url": format!("{}/private/area", site.uri()), "respect_robots": false }),
        ))
        .await;
    let id: Uuid = json_body(response).await["request_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    app.wait_for_terminal(id).await;

    // The mock site has no /private page, so the fetch itself fails with a 404.
    let json = json_body(app.send(get(&format!("/result/{id}"))).await).await;
    assert_eq!(json["status"], "failed");
    assert_eq!(json["error"]["kind"], "http_status_error");
}

#[tokio::test]
async fn invalid_url_returns_400() {
    let app = setup_test_app(None);

    let response = app
        .send(post_json("/crawl", &json!({ "url": "ftp://example.com/file" })))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "invalid_url");
    assert_eq!(app.state.store().len(), 0);
}

#[tokio::test]
async fn unknown_request_id_returns_404() {
    let app = setup_test_app(None);

    let response = app.send(get(&format!("/result/{}", Uuid::new_v4()))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.send(get("/result/req_12345")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn cancel_running_job() {
    let site = mock_site().await;
    let app = setup_test_app(None);

    let id = submit(&app, &format!("{}/slow", site.uri())).await;
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let response = app
        .send(
            Request::delete(format!("/jobs/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let job = app.wait_for_terminal(id).await;
    assert_eq!(
        job.error.unwrap().error_kind,
        sitescan_core::error::ErrorKind::Cancelled
    );

    // Terminal jobs cannot be cancelled again.
    let response = app
        .send(
            Request::delete(format!("/jobs/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn cancel_unknown_job_returns_404() {
    let app = setup_test_app(None);

    let response = app
        .send(
            Request::delete(format!("/jobs/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_jobs_filters_by_status() {
    let site = mock_site().await;
    let app = setup_test_app(None);

    let done = submit(&app, &format!("{}/blog/release", site.uri())).await;
    let denied = submit(&app, &format!("{}/private/x", site.uri())).await;
    app.wait_for_terminal(done).await;
    app.wait_for_terminal(denied).await;

    let json = json_body(app.send(get("/jobs")).await).await;
    assert_eq!(json["total"], 2);

    let json = json_body(app.send(get("/jobs?status=failed")).await).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["jobs"][0]["id"], denied.to_string());
    assert_eq!(json["jobs"][0]["error"]["kind"], "policy_denied");

    let response = app.send(get("/jobs?status=bogus")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
