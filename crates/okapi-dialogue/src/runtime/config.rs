/// Configuration for a [`DialogueRuntime`](super::DialogueRuntime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// RNG seed for `Random` dialogues. `None` seeds from the operating system.
    pub seed: Option<u64>,
    /// Maximum number of chained redirects before the conversation is ended.
    pub max_redirect_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_redirect_depth: 32,
        }
    }
}

impl RuntimeConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the RNG for reproducible random dialogues.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the redirect chain limit.
    pub fn with_max_redirect_depth(mut self, depth: usize) -> Self {
        self.max_redirect_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.seed, None);
        assert_eq!(config.max_redirect_depth, 32);
    }

    #[test]
    fn builder_pattern() {
        let config = RuntimeConfig::new().with_seed(7).with_max_redirect_depth(4);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.max_redirect_depth, 4);
    }
}
