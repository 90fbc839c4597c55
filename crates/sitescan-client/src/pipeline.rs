//! Wiring of the default strategy chain and orchestrator.

use sitescan_core::capability::Capabilities;
use sitescan_core::chain::StrategyChain;
use sitescan_core::config::CrawlerConfig;
use sitescan_core::error::CrawlError;
use sitescan_core::orchestrator::CrawlOrchestrator;
use sitescan_core::traits::JobStore;

use crate::direct::DirectStrategy;
use crate::emulated::EmulatedBrowserStrategy;
use crate::robots::HttpRobotsSource;

#[cfg(feature = "browser")]
pub type RenderStrategy = crate::render::HeadlessRenderStrategy;
#[cfg(not(feature = "browser"))]
pub type RenderStrategy = sitescan_core::chain::Unavailable;

pub type DefaultChain = StrategyChain<DirectStrategy, EmulatedBrowserStrategy, RenderStrategy>;

pub type DefaultOrchestrator<J> = CrawlOrchestrator<DefaultChain, HttpRobotsSource, J>;

/// Build the direct -> emulated -> render chain for `config`.
///
/// The emulated slot follows `config.browser_emulation`; the render slot is
/// filled only when `config.use_render_fallback` is set and `capabilities`
/// reports a usable browser.
pub fn build_chain(
    config: &CrawlerConfig,
    capabilities: &Capabilities,
) -> Result<DefaultChain, CrawlError> {
    let emulated = if config.browser_emulation {
        Some(EmulatedBrowserStrategy::new(config)?)
    } else {
        None
    };

    let render = if capabilities.render_enabled(config.use_render_fallback) {
        render_strategy(config)
    } else {
        None
    };

    let chain = StrategyChain::new(DirectStrategy::new(config)?)
        .with_optional_emulated(emulated)
        .with_optional_render(render);
    tracing::debug!(strategies = ?chain.strategies(), "Fetch chain ready");
    Ok(chain)
}

#[cfg(feature = "browser")]
fn render_strategy(config: &CrawlerConfig) -> Option<RenderStrategy> {
    Some(crate::render::HeadlessRenderStrategy::new(config))
}

#[cfg(not(feature = "browser"))]
fn render_strategy(_config: &CrawlerConfig) -> Option<RenderStrategy> {
    None
}

/// Orchestrator over the default chain and HTTP robots source.
pub fn build_orchestrator<J: JobStore + 'static>(
    config: &CrawlerConfig,
    capabilities: &Capabilities,
    store: J,
) -> Result<DefaultOrchestrator<J>, CrawlError> {
    let chain = build_chain(config, capabilities)?;
    let robots = HttpRobotsSource::new(&config.user_agent)?;
    Ok(CrawlOrchestrator::new(chain, robots, store, config))
}
