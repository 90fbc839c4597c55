use sitescan_client::{DefaultOrchestrator, HtmlMetadataExtractor, KeywordClassifier};
use sitescan_core::capability::Capabilities;
use sitescan_core::job_store::InMemoryJobStore;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub orchestrator: DefaultOrchestrator<InMemoryJobStore>,
    pub extractor: HtmlMetadataExtractor,
    pub classifier: KeywordClassifier,
    /// Probed once at startup.
    pub capabilities: Capabilities,
    /// Bearer token for the job endpoints (None = open access).
    pub api_key: Option<String>,
}

impl AppState {
    pub fn new(
        orchestrator: DefaultOrchestrator<InMemoryJobStore>,
        capabilities: Capabilities,
        api_key: Option<String>,
    ) -> Self {
        Self {
            orchestrator,
            extractor: HtmlMetadataExtractor::new(),
            classifier: KeywordClassifier::new(),
            capabilities,
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn store(&self) -> &InMemoryJobStore {
        self.orchestrator.store()
    }
}
