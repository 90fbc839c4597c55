/// Smoke-test for `HeadlessRenderStrategy`.
///
/// Launches a headless Chromium, renders <https://example.com>, and checks
/// the captured DOM contains the expected `<h1>`.
///
/// Run with:
///   cargo run -p sitescan-client --example render_smoke --features browser
use sitescan_client::{HeadlessRenderStrategy, probe_capabilities};
use sitescan_core::config::CrawlerConfig;
use sitescan_core::traits::FetchStrategy;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let capabilities = probe_capabilities();
    anyhow::ensure!(
        capabilities.render_fallback,
        "No Chrome/Chromium found; set CHROME_BIN"
    );

    let strategy = HeadlessRenderStrategy::new(&CrawlerConfig::default());
    let url = "https://example.com";
    println!("Rendering {url} ...");
    let page = strategy.fetch(url).await?;

    anyhow::ensure!(
        page.document.contains("<h1>Example Domain</h1>"),
        "Expected <h1> not found in rendered HTML"
    );

    println!("OK: {} bytes via {}", page.document.len(), page.strategy);
    println!(
        "First 300 chars:\n{}",
        page.document.chars().take(300).collect::<String>()
    );
    Ok(())
}
