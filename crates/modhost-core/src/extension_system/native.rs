use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::extension_system::capability::Capabilities;
use crate::extension_system::descriptor::{DescriptorBuilder, ExtensionDescriptor};
use crate::extension_system::error::{ExtensionError, ExtensionResult};
use crate::extension_system::hooks::{Extension, Hook, HookTable};

/// Hook body of a native extension
pub type NativeHook = Arc<dyn Fn(&Capabilities, &[Value]) -> ExtensionResult<Value> + Send + Sync>;

/// An extension compiled into the host, registered programmatically.
///
/// Hooks run on the blocking pool like script hooks do, so they may use the
/// network capabilities.
pub struct NativeExtension {
    descriptor: ExtensionDescriptor,
    hooks: HookTable<NativeHook>,
}

impl NativeExtension {
    pub fn builder(id: &str) -> NativeExtensionBuilder {
        NativeExtensionBuilder {
            descriptor: DescriptorBuilder::new(id, Path::new("<native>")),
            hooks: HookTable::new(),
        }
    }
}

impl fmt::Debug for NativeExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeExtension")
            .field("id", &self.descriptor.id)
            .field("hooks", &self.descriptor.hooks)
            .finish()
    }
}

#[async_trait]
impl Extension for NativeExtension {
    fn descriptor(&self) -> &ExtensionDescriptor {
        &self.descriptor
    }

    async fn call(
        &self,
        hook: &Hook,
        caps: Arc<Capabilities>,
        args: Vec<Value>,
    ) -> ExtensionResult<Option<Value>> {
        let Some(body) = self.hooks.get(hook).cloned() else {
            return Ok(None);
        };
        let value = tokio::task::spawn_blocking(move || body(&caps, &args))
            .await
            .map_err(|e| ExtensionError::TaskFailed(e.to_string()))??;
        Ok(if value.is_null() { None } else { Some(value) })
    }
}

pub struct NativeExtensionBuilder {
    descriptor: DescriptorBuilder,
    hooks: HookTable<NativeHook>,
}

impl NativeExtensionBuilder {
    /// Adjust descriptor fields
    pub fn describe(mut self, f: impl FnOnce(DescriptorBuilder) -> DescriptorBuilder) -> Self {
        self.descriptor = f(self.descriptor);
        self
    }

    pub fn hook<F>(mut self, hook: Hook, body: F) -> Self
    where
        F: Fn(&Capabilities, &[Value]) -> ExtensionResult<Value> + Send + Sync + 'static,
    {
        self.hooks.insert(hook, Arc::new(body));
        self
    }

    pub fn build(self) -> NativeExtension {
        let descriptor = self.descriptor.hooks(self.hooks.implemented()).build();
        NativeExtension { descriptor, hooks: self.hooks }
    }
}
