use std::{fmt, sync::Arc};

use tracing::debug;

use crate::{Error, Handler, RESERVED_NAMES, Result, Transport, TransportFactory};

type Constructor = Box<dyn Fn() -> Box<dyn Handler> + Send + Sync>;

/// A registered module: a unique name and a constructor for its handler.
pub struct Module {
    name: String,
    constructor: Constructor,
}

impl Module {
    /// `constructor` runs exactly once per loader, whether or not the module
    /// ends up enabled, so it should not do real work.
    pub fn new<F, H>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Handler + 'static,
    {
        Self {
            name: name.into(),
            constructor: Box::new(move || Box::new(constructor()) as Box<dyn Handler>),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn construct(&self) -> Box<dyn Handler> {
        (self.constructor)()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module").field("name", &self.name).finish()
    }
}

/// Modules known to the process, collected before the loader is built.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Module>,
    transport: Option<TransportFactory>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module. Names must be unique and must not collide with the
    /// loader's own blocks.
    pub fn register(&mut self, module: Module) -> Result<()> {
        if RESERVED_NAMES.contains(&module.name()) {
            return Err(Error::ReservedName(module.name().to_string()));
        }
        if self.modules.iter().any(|m| m.name() == module.name()) {
            return Err(Error::DuplicateModule(module.name().to_string()));
        }
        debug!(module = module.name(), "module registered");
        self.modules.push(module);
        Ok(())
    }

    /// Set the constructor used when the transport block is enabled.
    pub fn set_transport<F>(&mut self, factory: F)
    where
        F: Fn(&serde_json::Value) -> anyhow::Result<Arc<dyn Transport>> + Send + Sync + 'static,
    {
        self.transport = Some(Arc::new(factory));
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(Module::name).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<Module>, Option<TransportFactory>) {
        (self.modules, self.transport)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, async_trait::async_trait, tokio_util::sync::CancellationToken};

    struct Idle;

    #[async_trait]
    impl Handler for Idle {
        async fn start(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn registers_unique_names() {
        let mut registry = ModuleRegistry::new();
        registry.register(Module::new("echo", || Idle)).unwrap();
        registry.register(Module::new("ping", || Idle)).unwrap();
        assert_eq!(registry.names(), ["echo", "ping"]);
    }

    #[test]
    fn rejects_reserved_names() {
        let mut registry = ModuleRegistry::new();
        for name in ["parley", "transport"] {
            let err = registry.register(Module::new(name, || Idle)).unwrap_err();
            assert!(matches!(err, Error::ReservedName(ref n) if n == name));
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn rejects_duplicates() {
        let mut registry = ModuleRegistry::new();
        registry.register(Module::new("echo", || Idle)).unwrap();
        let err = registry.register(Module::new("echo", || Idle)).unwrap_err();
        assert!(matches!(err, Error::DuplicateModule(_)));
        assert_eq!(registry.len(), 1);
    }
}
