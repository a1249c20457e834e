//! Process-wide handler registry with snapshot semantics.
//!
//! The registry is populated at startup. Every dispatch takes a
//! [`SharedRegistry::snapshot`] at plan time and keeps using it until the
//! request finishes, so administrative re-registration never changes the
//! descriptors an in-flight plan sees.

use delegate_domain::{DomainError, HandlerDescriptor, HandlerRegistry};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Shared, snapshot-able handler registry
#[derive(Debug, Default)]
pub struct SharedRegistry {
    current: RwLock<Arc<HandlerRegistry>>,
}

impl SharedRegistry {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// Immutable view of the registry as of now
    pub fn snapshot(&self) -> Arc<HandlerRegistry> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Administrative registration of an additional handler
    pub fn register(&self, descriptor: HandlerDescriptor) -> Result<(), DomainError> {
        self.update(|registry| registry.register(descriptor))
    }

    /// Administrative re-registration of an existing handler
    pub fn replace(&self, descriptor: HandlerDescriptor) -> Result<(), DomainError> {
        self.update(|registry| registry.replace(descriptor))
    }

    fn update<F>(&self, change: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut HandlerRegistry) -> Result<(), DomainError>,
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = HandlerRegistry::clone(&guard);
        change(&mut next)?;
        info!(handlers = next.len(), "Handler registry updated");
        *guard = Arc::new(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_survives_replace() {
        let shared = SharedRegistry::new(
            HandlerRegistry::from_descriptors(vec![HandlerDescriptor::new("a").with_trigger("old")])
                .unwrap(),
        );
        let before = shared.snapshot();

        shared
            .replace(HandlerDescriptor::new("a").with_trigger("new"))
            .unwrap();

        assert!(before.lookup("a").unwrap().triggers.contains("old"));
        assert!(shared.snapshot().lookup("a").unwrap().triggers.contains("new"));
    }

    #[test]
    fn test_failed_update_leaves_registry_untouched() {
        let shared = SharedRegistry::new(
            HandlerRegistry::from_descriptors(vec![HandlerDescriptor::new("a")]).unwrap(),
        );

        let result = shared.register(HandlerDescriptor::new("a"));
        assert_eq!(result, Err(DomainError::DuplicateHandler("a".to_string())));
        assert_eq!(shared.snapshot().len(), 1);
    }
}
