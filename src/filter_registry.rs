//! Catalog of filter strategies by name.

use thiserror::Error;

use crate::filter_strategy::FilterStrategy;

/// Errors from [`FilterRegistry`] lookups and registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No strategy is registered under this id.
    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    /// A strategy is already registered under this id.
    #[error("filter already registered: {0}")]
    DuplicateFilter(String),
}

/// Maps string ids to [`FilterStrategy`] values.
///
/// Built once at startup and passed by reference to whatever needs to
/// resolve a user-facing filter name.
///
/// ```
/// use canvas_resample::filter_registry::FilterRegistry;
/// use canvas_resample::filter_strategy::FilterStrategy;
///
/// let registry = FilterRegistry::with_defaults();
/// assert_eq!(registry.get("Lanczos3"), Ok(FilterStrategy::Lanczos3));
/// assert_eq!(registry.default_strategy(), Some(FilterStrategy::Bicubic));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    entries: Vec<(String, FilterStrategy)>,
    default_id: Option<String>,
}

impl FilterRegistry {
    /// An empty registry with no default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in strategy under its own id, defaulting to Bicubic.
    pub fn with_defaults() -> Self {
        let registry = Self {
            entries: FilterStrategy::ALL
                .iter()
                .map(|s| (s.id().to_string(), *s))
                .collect(),
            default_id: Some(FilterStrategy::Bicubic.id().to_string()),
        };
        log::debug!("filter registry: {:?}", registry.ids());
        registry
    }

    pub fn register(&mut self, id: &str, strategy: FilterStrategy) -> Result<(), RegistryError> {
        if self.entries.iter().any(|(k, _)| k == id) {
            return Err(RegistryError::DuplicateFilter(id.to_string()));
        }
        self.entries.push((id.to_string(), strategy));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<FilterStrategy, RegistryError> {
        self.entries
            .iter()
            .find(|(k, _)| k == id)
            .map(|(_, s)| *s)
            .ok_or_else(|| RegistryError::UnknownFilter(id.to_string()))
    }

    /// Make an already registered id the default.
    pub fn set_default(&mut self, id: &str) -> Result<(), RegistryError> {
        self.get(id)?;
        self.default_id = Some(id.to_string());
        Ok(())
    }

    pub fn default_strategy(&self) -> Option<FilterStrategy> {
        self.default_id.as_deref().and_then(|id| self.get(id).ok())
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
