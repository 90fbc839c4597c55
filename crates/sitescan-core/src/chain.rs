//! Escalating fetch strategy chain.
//!
//! Strategies run in a fixed order: direct HTTP, then emulated browser, then
//! headless render. Only transport failures (connection errors and timeouts)
//! move on to the next strategy. An HTTP status or a non-HTML response is a
//! server-side decision and becomes the chain's verdict immediately.

use crate::error::CrawlError;
use crate::models::{FetchAttempt, FetchedPage, StrategyKind};
use crate::traits::{FetchStrategy, PageFetcher};

/// Placeholder for a strategy slot that is not configured.
///
/// Always answers [`CrawlError::RenderFallbackUnavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

impl FetchStrategy for Unavailable {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HeadlessRender
    }

    async fn fetch(&self, _url: &str) -> Result<FetchedPage, CrawlError> {
        Err(CrawlError::RenderFallbackUnavailable)
    }
}

/// Ordered set of fetch strategies behind a single [`PageFetcher`].
///
/// The direct strategy is mandatory. The emulated and render slots are
/// optional and are skipped when empty.
#[derive(Debug, Clone)]
pub struct StrategyChain<D, E = Unavailable, R = Unavailable> {
    direct: D,
    emulated: Option<E>,
    render: Option<R>,
}

impl<D: FetchStrategy> StrategyChain<D> {
    pub fn new(direct: D) -> Self {
        Self {
            direct,
            emulated: None,
            render: None,
        }
    }
}

impl<D, E, R> StrategyChain<D, E, R>
where
    D: FetchStrategy,
    E: FetchStrategy,
    R: FetchStrategy,
{
    pub fn with_emulated<E2: FetchStrategy>(self, emulated: E2) -> StrategyChain<D, E2, R> {
        self.with_optional_emulated(Some(emulated))
    }

    pub fn with_optional_emulated<E2: FetchStrategy>(
        self,
        emulated: Option<E2>,
    ) -> StrategyChain<D, E2, R> {
        StrategyChain {
            direct: self.direct,
            emulated,
            render: self.render,
        }
    }

    pub fn with_render<R2: FetchStrategy>(self, render: R2) -> StrategyChain<D, E, R2> {
        self.with_optional_render(Some(render))
    }

    pub fn with_optional_render<R2: FetchStrategy>(
        self,
        render: Option<R2>,
    ) -> StrategyChain<D, E, R2> {
        StrategyChain {
            direct: self.direct,
            emulated: self.emulated,
            render,
        }
    }

    /// Strategies that will run, in order.
    pub fn strategies(&self) -> Vec<StrategyKind> {
        let mut kinds = vec![self.direct.kind()];
        kinds.extend(self.emulated.as_ref().map(|s| s.kind()));
        kinds.extend(self.render.as_ref().map(|s| s.kind()));
        kinds
    }
}

enum Step {
    /// The chain has a verdict.
    Done(FetchAttempt),
    /// Transport failure; try the next strategy.
    Escalate(StrategyKind, CrawlError),
    /// The strategy cannot run here; the previous verdict stands.
    Skipped,
}

async fn run_strategy<S: FetchStrategy>(strategy: &S, url: &str) -> Step {
    let kind = strategy.kind();
    tracing::debug!(%url, strategy = %kind, "Trying fetch strategy");

    match strategy.fetch(url).await {
        Ok(page) => {
            tracing::info!(
                %url,
                strategy = %kind,
                bytes = page.document.len(),
                "Fetched page"
            );
            Step::Done(FetchAttempt::success(page))
        }
        Err(CrawlError::RenderFallbackUnavailable) => {
            tracing::info!(%url, strategy = %kind, "Render fallback unavailable, skipping");
            Step::Skipped
        }
        Err(e) if e.escalates() => {
            tracing::warn!(%url, strategy = %kind, error = %e, "Transport failure, escalating");
            Step::Escalate(kind, e)
        }
        Err(e) => {
            tracing::info!(%url, strategy = %kind, error = %e, "Fetch failed without escalation");
            Step::Done(FetchAttempt::failure(url, kind, e))
        }
    }
}

impl<D, E, R> PageFetcher for StrategyChain<D, E, R>
where
    D: FetchStrategy,
    E: FetchStrategy,
    R: FetchStrategy,
{
    async fn fetch(&self, url: &str) -> FetchAttempt {
        let (mut last_kind, mut last_error) = match run_strategy(&self.direct, url).await {
            Step::Done(attempt) => return attempt,
            Step::Escalate(kind, e) => (kind, e),
            Step::Skipped => (
                self.direct.kind(),
                CrawlError::RenderFallbackUnavailable,
            ),
        };

        if let Some(emulated) = &self.emulated {
            match run_strategy(emulated, url).await {
                Step::Done(attempt) => return attempt,
                Step::Escalate(kind, e) => (last_kind, last_error) = (kind, e),
                Step::Skipped => {}
            }
        }

        if let Some(render) = &self.render {
            match run_strategy(render, url).await {
                Step::Done(attempt) => return attempt,
                Step::Escalate(kind, e) => (last_kind, last_error) = (kind, e),
                Step::Skipped => {}
            }
        }

        FetchAttempt::failure(url, last_kind, last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockStrategy;

    const URL: &str = "https://site.example/page";

    fn transport() -> CrawlError {
        CrawlError::Transport("connection reset".into())
    }

    #[tokio::test]
    async fn direct_success_stops_the_chain() {
        let direct = MockStrategy::succeeding(StrategyKind::Direct, "<html>direct</html>");
        let emulated = MockStrategy::succeeding(StrategyKind::EmulatedBrowser, "<html>e</html>");
        let render = MockStrategy::succeeding(StrategyKind::HeadlessRender, "<html>r</html>");
        let chain = StrategyChain::new(direct.clone())
            .with_emulated(emulated.clone())
            .with_render(render.clone());

        let attempt = chain.fetch(URL).await;
        let page = attempt.outcome.unwrap();
        assert_eq!(page.document, "<html>direct</html>");
        assert_eq!(page.strategy, StrategyKind::Direct);
        assert_eq!(direct.calls(), 1);
        assert_eq!(emulated.calls(), 0);
        assert_eq!(render.calls(), 0);
    }

    #[tokio::test]
    async fn transport_error_escalates_to_emulated() {
        let direct = MockStrategy::failing(StrategyKind::Direct, transport());
        let emulated =
            MockStrategy::succeeding(StrategyKind::EmulatedBrowser, "<html>emulated</html>");
        let render = MockStrategy::succeeding(StrategyKind::HeadlessRender, "<html>r</html>");
        let chain = StrategyChain::new(direct.clone())
            .with_emulated(emulated.clone())
            .with_render(render.clone());

        let attempt = chain.fetch(URL).await;
        assert!(attempt.is_success());
        assert_eq!(attempt.strategy, StrategyKind::EmulatedBrowser);
        // Document is passed through exactly as fetched.
        assert_eq!(attempt.outcome.unwrap().document, "<html>emulated</html>");
        assert_eq!(direct.calls(), 1);
        assert_eq!(emulated.calls(), 1);
        assert_eq!(render.calls(), 0);
    }

    #[tokio::test]
    async fn timeouts_escalate_through_to_render() {
        let direct = MockStrategy::failing(StrategyKind::Direct, CrawlError::Timeout(15));
        let emulated = MockStrategy::failing(StrategyKind::EmulatedBrowser, transport());
        let render =
            MockStrategy::succeeding(StrategyKind::HeadlessRender, "<html>rendered</html>");
        let chain = StrategyChain::new(direct)
            .with_emulated(emulated)
            .with_render(render.clone());

        let attempt = chain.fetch(URL).await;
        assert_eq!(attempt.strategy, StrategyKind::HeadlessRender);
        assert_eq!(attempt.outcome.unwrap().document, "<html>rendered</html>");
        assert_eq!(render.calls(), 1);
    }

    #[tokio::test]
    async fn http_status_does_not_escalate() {
        for code in [403, 404, 429, 500, 503] {
            let direct = MockStrategy::failing(StrategyKind::Direct, CrawlError::HttpStatus { code });
            let emulated = MockStrategy::succeeding(StrategyKind::EmulatedBrowser, "<html></html>");
            let chain = StrategyChain::new(direct).with_emulated(emulated.clone());

            let attempt = chain.fetch(URL).await;
            assert_eq!(attempt.strategy, StrategyKind::Direct);
            assert_eq!(attempt.outcome.unwrap_err(), CrawlError::HttpStatus { code });
            assert_eq!(emulated.calls(), 0, "status {code} must not escalate");
        }
    }

    #[tokio::test]
    async fn non_html_does_not_escalate() {
        let err = CrawlError::UnsupportedContentType {
            content_type: "application/pdf".into(),
        };
        let direct = MockStrategy::failing(StrategyKind::Direct, err.clone());
        let emulated = MockStrategy::succeeding(StrategyKind::EmulatedBrowser, "<html></html>");
        let chain = StrategyChain::new(direct).with_emulated(emulated.clone());

        assert_eq!(chain.fetch(URL).await.outcome.unwrap_err(), err);
        assert_eq!(emulated.calls(), 0);
    }

    #[tokio::test]
    async fn escalated_status_error_is_final() {
        let direct = MockStrategy::failing(StrategyKind::Direct, transport());
        let emulated = MockStrategy::failing(
            StrategyKind::EmulatedBrowser,
            CrawlError::HttpStatus { code: 404 },
        );
        let render = MockStrategy::succeeding(StrategyKind::HeadlessRender, "<html></html>");
        let chain = StrategyChain::new(direct)
            .with_emulated(emulated)
            .with_render(render.clone());

        let attempt = chain.fetch(URL).await;
        assert_eq!(attempt.strategy, StrategyKind::EmulatedBrowser);
        assert_eq!(
            attempt.outcome.unwrap_err(),
            CrawlError::HttpStatus { code: 404 }
        );
        assert_eq!(render.calls(), 0);
    }

    #[tokio::test]
    async fn unavailable_render_keeps_previous_transport_error() {
        let direct = MockStrategy::failing(StrategyKind::Direct, transport());
        let emulated = MockStrategy::failing(StrategyKind::EmulatedBrowser, CrawlError::Timeout(15));
        let chain = StrategyChain::new(direct)
            .with_emulated(emulated)
            .with_render(Unavailable);

        let attempt = chain.fetch(URL).await;
        assert_eq!(attempt.strategy, StrategyKind::EmulatedBrowser);
        assert_eq!(attempt.outcome.unwrap_err(), CrawlError::Timeout(15));
    }

    #[tokio::test]
    async fn direct_only_chain_reports_direct_failure() {
        let chain = StrategyChain::new(MockStrategy::failing(StrategyKind::Direct, transport()));
        assert_eq!(chain.strategies(), vec![StrategyKind::Direct]);

        let attempt = chain.fetch(URL).await;
        assert_eq!(attempt.url, URL);
        assert_eq!(attempt.strategy, StrategyKind::Direct);
        assert_eq!(attempt.outcome.unwrap_err(), transport());
    }

    #[test]
    fn strategies_lists_configured_slots_in_order() {
        let chain = StrategyChain::new(MockStrategy::succeeding(StrategyKind::Direct, ""))
            .with_optional_emulated(None::<MockStrategy>)
            .with_render(MockStrategy::succeeding(StrategyKind::HeadlessRender, ""));
        assert_eq!(
            chain.strategies(),
            vec![StrategyKind::Direct, StrategyKind::HeadlessRender]
        );
    }
}
