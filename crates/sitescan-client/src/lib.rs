pub mod capability;
pub mod classifier;
pub mod direct;
pub mod emulated;
pub mod metadata;
pub mod pipeline;
#[cfg(feature = "browser")]
pub mod render;
mod response;
pub mod robots;

pub use capability::{find_chrome_binary, probe_capabilities};
pub use classifier::KeywordClassifier;
pub use direct::DirectStrategy;
pub use emulated::EmulatedBrowserStrategy;
pub use metadata::HtmlMetadataExtractor;
pub use pipeline::{DefaultChain, DefaultOrchestrator, build_chain, build_orchestrator};
#[cfg(feature = "browser")]
pub use render::HeadlessRenderStrategy;
pub use robots::HttpRobotsSource;
