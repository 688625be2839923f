use url::Url;

use super::SiteAdapter;
use crate::config::SourcesConfig;
use crate::url::parse_listing_url;
use crate::ScrapeError;

/// Registered adapter as shown by `--list-sources`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub id: &'static str,
    pub display_name: &'static str,

    /// Host patterns in display form ("*.amazon.*")
    pub host_patterns: Vec<String>,
}

/// Ordered table of adapters, consulted first-match-wins
#[derive(Debug, Clone)]
pub struct AdapterRegistry {
    adapters: Vec<SiteAdapter>,
}

impl AdapterRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Registry holding every built-in adapter in registration order
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for adapter in SiteAdapter::all() {
            registry.register(adapter);
        }
        registry
    }

    /// Registry restricted to the sources enabled in configuration
    ///
    /// An empty `enabled` list means every built-in adapter. Unknown ids are
    /// rejected by config validation, so they are ignored here.
    pub fn from_config(config: &SourcesConfig) -> Self {
        if config.enabled.is_empty() {
            return Self::builtin();
        }
        let mut registry = Self::new();
        for adapter in SiteAdapter::all() {
            if config.enabled.iter().any(|id| id == adapter.id()) {
                registry.register(adapter);
            }
        }
        registry
    }

    /// Appends an adapter; it is consulted after every earlier registration
    pub fn register(&mut self, adapter: SiteAdapter) {
        if self.adapters.iter().any(|a| a.id() == adapter.id()) {
            tracing::warn!("Adapter '{}' is already registered", adapter.id());
            return;
        }
        tracing::debug!("Registered adapter '{}'", adapter.id());
        self.adapters.push(adapter);
    }

    /// Resolves a listing URL to the first adapter whose `matches` accepts it
    ///
    /// # Arguments
    ///
    /// * `url` - The caller-supplied listing URL
    ///
    /// # Returns
    ///
    /// * `Ok(SiteAdapter)` - The adapter for the URL's site family
    /// * `Err(ScrapeError::Url)` - The URL is malformed
    /// * `Err(ScrapeError::UnsupportedSource)` - No registered adapter matches
    pub fn resolve(&self, url: &str) -> Result<SiteAdapter, ScrapeError> {
        let parsed = parse_listing_url(url)?;
        self.resolve_url(&parsed)
    }

    /// Same as [`AdapterRegistry::resolve`] for an already parsed URL
    pub fn resolve_url(&self, url: &Url) -> Result<SiteAdapter, ScrapeError> {
        match self.adapters.iter().find(|adapter| adapter.matches(url)) {
            Some(adapter) => {
                tracing::info!("Using {} adapter for {}", adapter.display_name(), url);
                Ok(adapter.clone())
            }
            None => {
                tracing::error!(
                    "No adapter for {} (supported: {})",
                    url,
                    self.adapters
                        .iter()
                        .map(|a| a.id())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                Err(ScrapeError::UnsupportedSource {
                    url: url.to_string(),
                })
            }
        }
    }

    /// Lists every registered adapter in registration order
    pub fn supported_sources(&self) -> Vec<SourceInfo> {
        self.adapters
            .iter()
            .map(|adapter| SourceInfo {
                id: adapter.id(),
                display_name: adapter.display_name(),
                host_patterns: adapter
                    .host_labels()
                    .iter()
                    .map(|label| format!("*.{}.*", label))
                    .collect(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
