//! Matcher configuration.

use indexmap::IndexMap;

use vireo_compiler::{CompilerConfig, GrammarConfig};

/// Runtime knobs.
#[derive(Clone, Copy, Debug)]
pub struct VmConfig {
    /// Collect expected-item hints at the furthest failure position.
    pub show_fails: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self { show_fails: true }
    }
}

/// Everything a matcher build consults, grouped by pipeline stage.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub grammar: GrammarConfig,
    pub compiler: CompilerConfig,
    pub vm: VmConfig,
    /// Human messages per error label, used by terminal throws and by
    /// recovered `Error` nodes.
    pub labels: IndexMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a message to an error label.
    pub fn label(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.labels.insert(name.into(), message.into());
        self
    }
}
