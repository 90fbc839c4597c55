use serde::Serialize;

/// Runtime capabilities, probed once at startup and never re-probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    /// A headless browser backend is available for the render fallback.
    pub render_fallback: bool,
}

impl Capabilities {
    pub fn new(render_fallback: bool) -> Self {
        Self { render_fallback }
    }

    /// Whether the render strategy should be placed in the chain.
    pub fn render_enabled(&self, requested: bool) -> bool {
        requested && self.render_fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_requires_both_request_and_capability() {
        assert!(Capabilities::new(true).render_enabled(true));
        assert!(!Capabilities::new(true).render_enabled(false));
        assert!(!Capabilities::new(false).render_enabled(true));
        assert!(!Capabilities::default().render_enabled(true));
    }
}
