use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sitescan_client::{
    HtmlMetadataExtractor, HttpRobotsSource, KeywordClassifier, build_orchestrator,
    find_chrome_binary, probe_capabilities,
};
use sitescan_core::config::CrawlerConfig;
use sitescan_core::job::{CrawlJob, JobOptions, JobStatus};
use sitescan_core::job_store::InMemoryJobStore;
use sitescan_core::robots::RobotsPolicyCache;
use sitescan_core::traits::{ContentClassifier, MetadataExtractor};

#[derive(Parser)]
#[command(name = "sitescan", version, about = "Polite crawler with SEO page analysis")]
struct Cli {
    #[command(flatten)]
    crawler: CrawlerArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Call-site overrides layered on top of the `SITESCAN_*` environment.
#[derive(Args)]
struct CrawlerArgs {
    /// User agent sent with direct requests and matched against robots.txt
    #[arg(long, global = true, env = "SITESCAN_USER_AGENT")]
    user_agent: Option<String>,

    /// Minimum seconds between requests to the same origin
    #[arg(long, global = true, env = "SITESCAN_REQUEST_DELAY")]
    delay: Option<f64>,

    /// Attempts per job before giving up
    #[arg(long, global = true, env = "SITESCAN_MAX_ATTEMPTS")]
    max_attempts: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "SITESCAN_TIMEOUT")]
    timeout: Option<f64>,

    /// Do not escalate to the emulated-browser strategy
    #[arg(long, global = true)]
    no_emulation: bool,

    /// Do not escalate to headless rendering
    #[arg(long, global = true)]
    no_render: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl one URL and print the fetch result and page analysis as JSON
    Crawl {
        /// Target URL
        url: String,

        /// Skip the robots.txt check for this job
        #[arg(long, default_value_t = false)]
        ignore_robots: bool,
    },

    /// Check whether robots.txt allows the configured user agent to fetch a URL
    Robots {
        /// Target URL
        url: String,
    },

    /// Show the probed runtime capabilities
    Capabilities,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sitescan=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli.crawler)?;

    match cli.command {
        Commands::Crawl { url, ignore_robots } => cmd_crawl(&config, &url, ignore_robots).await,
        Commands::Robots { url } => cmd_robots(&config, &url).await,
        Commands::Capabilities => cmd_capabilities(),
    }
}

fn build_config(args: &CrawlerArgs) -> Result<CrawlerConfig> {
    let mut config = CrawlerConfig::from_env().context("Invalid SITESCAN_* environment")?;

    if let Some(ua) = &args.user_agent {
        config = config.with_user_agent(ua.as_str());
    }
    if let Some(secs) = args.delay {
        config = config.with_request_delay(
            std::time::Duration::try_from_secs_f64(secs).context("--delay must be non-negative")?,
        );
    }
    if let Some(max) = args.max_attempts {
        config = config.with_max_attempts(max);
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(
            std::time::Duration::try_from_secs_f64(secs)
                .context("--timeout must be non-negative")?,
        );
    }
    if args.no_emulation {
        config = config.with_browser_emulation(false);
    }
    if args.no_render {
        config = config.with_render_fallback(false);
    }

    Ok(config)
}

async fn cmd_crawl(config: &CrawlerConfig, url: &str, ignore_robots: bool) -> Result<()> {
    let capabilities = probe_capabilities();
    let orchestrator = build_orchestrator(config, &capabilities, InMemoryJobStore::new())
        .context("Failed to build crawl pipeline")?;

    // Ctrl-C cancels the job; it still ends in the store as Failed/Cancelled.
    let canceller = orchestrator.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling crawl");
            canceller.shutdown();
        }
    });

    let options = if ignore_robots {
        JobOptions::default().with_respect_robots(false)
    } else {
        JobOptions::default()
    };

    tracing::info!("Crawling {}", url);
    let job = orchestrator
        .crawl(url, options)
        .await
        .with_context(|| format!("Failed to crawl {url}"))?;

    println!("{}", serde_json::to_string_pretty(&crawl_report(&job)?)?);

    if job.status == JobStatus::Failed {
        let message = job
            .error
            .map(|e| e.message)
            .unwrap_or_else(|| "unknown error".to_string());
        anyhow::bail!("Crawl failed: {message}");
    }
    Ok(())
}

/// JSON report for a finished job. The raw document is left out.
fn crawl_report(job: &CrawlJob) -> Result<serde_json::Value> {
    let mut report = serde_json::json!({
        "request_id": job.id,
        "url": job.url,
        "status": job.status,
        "attempts": job.attempts,
    });

    if let Some(page) = &job.result {
        let metadata = HtmlMetadataExtractor::new()
            .extract(&page.document, &page.url)
            .context("Failed to analyse page")?;
        let classification = KeywordClassifier::new().classify(&metadata);

        report["fetch"] = serde_json::json!({
            "status_code": page.status_code,
            "content_type": page.content_type,
            "strategy": page.strategy,
            "fetched_at": page.fetched_at,
            "bytes": page.document.len(),
        });
        report["metadata"] = serde_json::to_value(&metadata)?;
        report["classification"] = serde_json::to_value(&classification)?;
    }
    if let Some(error) = &job.error {
        report["error"] = serde_json::json!({
            "kind": error.error_kind,
            "message": error.message,
        });
    }

    Ok(report)
}

async fn cmd_robots(config: &CrawlerConfig, url: &str) -> Result<()> {
    let source = HttpRobotsSource::new(&config.user_agent)?;
    let cache = RobotsPolicyCache::new(source, true);

    let allowed = cache
        .check(url, &config.user_agent)
        .await
        .with_context(|| format!("Cannot check robots.txt for {url}"))?;

    let report = serde_json::json!({
        "url": url,
        "user_agent": config.user_agent,
        "allowed": allowed,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_capabilities() -> Result<()> {
    let capabilities = probe_capabilities();
    let report = serde_json::json!({
        "render_fallback": capabilities.render_fallback,
        "browser_feature": cfg!(feature = "browser"),
        "chrome_binary": find_chrome_binary().map(|p| p.display().to_string()),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
