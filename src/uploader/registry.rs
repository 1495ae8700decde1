use std::collections::HashMap;

use super::{CustomHttpUploader, UploaderCapability};

type UploaderFactory = Box<dyn Fn() -> Box<dyn UploaderCapability> + Send + Sync>;

/// Maps a backend name to a factory producing fresh, unconfigured instances.
///
/// Every orchestrator call gets its own instance, so overlapping batches can
/// never observe each other's configuration.
pub struct UploaderRegistry {
    factories: HashMap<String, UploaderFactory>,
}

impl UploaderRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in backends.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("custom", || Box::new(CustomHttpUploader::new()));
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn UploaderCapability> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// A fresh instance, or `None` for an unknown backend name.
    pub fn create(&self, name: &str) -> Option<Box<dyn UploaderCapability>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for UploaderRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_knows_the_custom_uploader() {
        let registry = UploaderRegistry::with_builtins();
        assert!(registry.create("custom").is_some());
        assert!(registry.create("s3").is_none());
        assert_eq!(registry.names(), vec!["custom".to_string()]);
    }

    #[test]
    fn create_returns_a_distinct_instance_each_time() {
        let registry = UploaderRegistry::with_builtins();
        let a = registry.create("custom").unwrap();
        let b = registry.create("custom").unwrap();
        let a_addr = a.as_ref() as *const dyn UploaderCapability as *const () as usize;
        let b_addr = b.as_ref() as *const dyn UploaderCapability as *const () as usize;
        assert_ne!(a_addr, b_addr);
    }
}
