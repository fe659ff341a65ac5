use std::collections::BTreeMap;
use std::sync::Arc;

use crate::extension_system::descriptor::ExtensionDescriptor;
use crate::extension_system::error::{ExtensionError, ExtensionResult};
use crate::extension_system::hooks::Extension;

/// Loaded extensions indexed by id
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: BTreeMap<String, Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension. An id that is already taken is rejected.
    pub fn register(&mut self, extension: Arc<dyn Extension>) -> ExtensionResult<()> {
        let id = extension.id().to_string();
        if self.extensions.contains_key(&id) {
            return Err(ExtensionError::DuplicateId {
                id,
                path: extension.descriptor().location.clone(),
            });
        }
        self.extensions.insert(id, extension);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Extension>> {
        self.extensions.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.extensions.contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.extensions.keys().cloned().collect()
    }

    pub fn descriptors(&self) -> Vec<ExtensionDescriptor> {
        self.extensions.values().map(|e| e.descriptor().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn clear(&mut self) {
        self.extensions.clear();
    }
}
