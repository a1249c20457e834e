//! Handler Registry
//!
//! The [`HandlerRegistry`] stores handler descriptors keyed by unique name
//! and remembers registration order. Downstream stages (classification
//! tie-breaks, plan stage ordering) rely on that order being stable.
//!
//! The registry is populated once at startup and then shared read-only.
//! Cloning is cheap (descriptors are reference counted), which is how a
//! dispatch takes its snapshot.

use crate::core::error::DomainError;
use crate::handler::descriptor::HandlerDescriptor;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of handler descriptors in registration order
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    /// Descriptors in registration order
    descriptors: Vec<Arc<HandlerDescriptor>>,
    /// Handler name -> index into `descriptors`
    index: HashMap<String, usize>,
}

impl HandlerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from descriptors, registering them in order.
    pub fn from_descriptors<I>(descriptors: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = HandlerDescriptor>,
    {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Register a descriptor.
    ///
    /// Fails with [`DomainError::DuplicateHandler`] if the name is taken.
    pub fn register(&mut self, descriptor: HandlerDescriptor) -> Result<(), DomainError> {
        descriptor.validate()?;
        if self.index.contains_key(&descriptor.name) {
            return Err(DomainError::DuplicateHandler(descriptor.name));
        }
        self.index
            .insert(descriptor.name.clone(), self.descriptors.len());
        self.descriptors.push(Arc::new(descriptor));
        Ok(())
    }

    /// Replace an existing descriptor in place, keeping its registration slot.
    ///
    /// This is the administrative re-registration path; it is never used
    /// during routing.
    pub fn replace(&mut self, descriptor: HandlerDescriptor) -> Result<(), DomainError> {
        descriptor.validate()?;
        let position = *self
            .index
            .get(&descriptor.name)
            .ok_or_else(|| DomainError::UnknownHandler(descriptor.name.clone()))?;
        self.descriptors[position] = Arc::new(descriptor);
        Ok(())
    }

    /// Look up a descriptor by name
    pub fn lookup(&self, name: &str) -> Result<&Arc<HandlerDescriptor>, DomainError> {
        self.index
            .get(name)
            .map(|&i| &self.descriptors[i])
            .ok_or_else(|| DomainError::UnknownHandler(name.to_string()))
    }

    /// Registration position of a handler, if registered
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All descriptors, lazily, in registration order
    pub fn all(&self) -> impl Iterator<Item = &Arc<HandlerDescriptor>> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
