use std::{collections::BTreeMap, path::Path, sync::Arc};

use {
    axum::Router,
    parley_channels::MessageService,
    parley_commands::{DispatchLimit, fan_out},
    serde::Deserialize,
    tokio_util::sync::CancellationToken,
    tracing::{Instrument, debug, info, info_span, warn},
};

use crate::{
    Error, Handler, ModuleRegistry, Result, TRANSPORT_NAME, TaskGroup, Transport,
    TransportFactory, http,
};

/// Name of the loader's own block. It must be enabled for anything to run.
pub const LOADER_NAME: &str = "parley";

/// Block names modules cannot take.
pub const RESERVED_NAMES: [&str; 2] = [LOADER_NAME, TRANSPORT_NAME];

/// The `[parley]` block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub http: HttpConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// `host:port` or `:port`. Empty disables the HTTP server.
    pub listen_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Cap on concurrently handled messages per loop. Unset or `0` means
    /// unbounded.
    pub max_concurrent: Option<usize>,
}

struct Loaded {
    name: String,
    handler: Box<dyn Handler>,
}

/// Builds, configures and supervises every registered module.
pub struct Loader {
    config: LoaderConfig,
    modules: Vec<Loaded>,
    enabled: BTreeMap<String, bool>,
    transport_factory: Option<TransportFactory>,
    transport: Option<Arc<dyn Transport>>,
    router: Option<Router>,
}

impl Loader {
    /// Construct every registered module's handler, enabled or not.
    pub fn new(registry: ModuleRegistry) -> Self {
        let (modules, transport_factory) = registry.into_parts();
        let modules = modules
            .into_iter()
            .map(|module| Loaded {
                name: module.name().to_string(),
                handler: module.construct(),
            })
            .collect();

        Self {
            config: LoaderConfig::default(),
            modules,
            enabled: BTreeMap::new(),
            transport_factory,
            transport: None,
            router: None,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.get(name).copied().unwrap_or(false)
    }

    pub fn transport(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.as_ref()
    }

    /// The mux built during config load, if a listen address is configured.
    pub fn http_router(&self) -> Option<Router> {
        self.router.clone()
    }

    pub fn load_config_file(&mut self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "loading config");
        let document = parley_config::load_document(path)?;
        self.load_config(&document)
    }

    /// Feed `document` to the loader and every module, then create the
    /// transport and the HTTP mux. Call once, before [`Loader::start`].
    pub fn load_config(&mut self, document: &serde_json::Value) -> Result<()> {
        self.config = parley_config::section(document, LOADER_NAME)?;
        self.enabled = parley_config::enabled_blocks(document)?;

        for name in self.enabled.iter().filter(|(_, on)| **on).map(|(n, _)| n) {
            let known = RESERVED_NAMES.contains(&name.as_str())
                || self.modules.iter().any(|m| &m.name == name);
            if !known {
                warn!(module = %name, "config enables a module that is not registered");
            }
        }

        for module in &mut self.modules {
            if let Some(target) = module.handler.config() {
                target
                    .load(document)
                    .map_err(|source| Error::ModuleConfig {
                        module: module.name.clone(),
                        source,
                    })?;
            }
        }

        if self.is_enabled(TRANSPORT_NAME) {
            self.create_transport(document)?;
        }

        if self.config.http.listen_addr.is_empty() {
            if self.transport.as_ref().is_some_and(|t| t.router().is_some()) {
                warn!("transport serves HTTP but no listen address is configured");
            }
        } else {
            self.router = Some(self.build_router()?);
        }
        Ok(())
    }

    fn create_transport(&mut self, document: &serde_json::Value) -> Result<()> {
        let factory = self.transport_factory.as_ref().ok_or(Error::NoTransport)?;
        let block = document
            .get(TRANSPORT_NAME)
            .unwrap_or(&serde_json::Value::Null);
        let transport = factory(block).map_err(Error::transport_init)?;
        info!(transport = transport.name(), "transport created");

        for module in &mut self.modules {
            if !self.enabled.get(&module.name).copied().unwrap_or(false) {
                continue;
            }
            if let Some(binder) = module.handler.transport_binder() {
                debug!(module = %module.name, "binding transport");
                binder.bind_transport(Arc::clone(&transport));
            }
        }

        self.transport = Some(transport);
        Ok(())
    }

    fn build_router(&self) -> Result<Router> {
        let mut mux = http::MuxBuilder::default();
        for module in self.enabled_modules() {
            if let Some(server) = module.handler.http() {
                mux.mount(&module.name, server.http_prefix(), server.router())?;
            }
        }
        let fallback = self.transport.as_ref().and_then(|t| t.router());
        Ok(mux.finish(fallback))
    }

    fn enabled_modules(&self) -> impl Iterator<Item = &Loaded> {
        self.modules.iter().filter(|m| self.is_enabled(&m.name))
    }

    /// Run the transport, the HTTP server and every enabled module until
    /// `cancel` fires or one of them fails.
    ///
    /// The first failure cancels everything else and is returned; later
    /// failures are only logged. Each message and command loop waits for the
    /// handling tasks it spawned before it returns.
    pub async fn start(mut self, cancel: CancellationToken) -> Result<()> {
        if !self.is_enabled(LOADER_NAME) {
            return Err(Error::NotEnabled(LOADER_NAME.to_string()));
        }
        self.check_preconditions()?;

        let limit = DispatchLimit::from_config(self.config.dispatch.max_concurrent);
        let messages = self.transport.as_ref().and_then(|t| t.messages());
        let enabled = std::mem::take(&mut self.enabled);
        let mut group = TaskGroup::new(&cancel);

        if let Some(ref transport) = self.transport {
            let transport = Arc::clone(transport);
            let token = group.token();
            group.spawn(async move {
                transport.run(token).await.map_err(Error::transport_run)
            });
        }

        if let Some(router) = self.router.take() {
            group.spawn(http::serve(
                self.config.http.listen_addr.clone(),
                router,
                group.token(),
            ));
        }

        for Loaded { name, handler } in std::mem::take(&mut self.modules) {
            if !enabled.get(&name).copied().unwrap_or(false) {
                continue;
            }
            let handler: Arc<dyn Handler> = Arc::from(handler);
            let span = info_span!("module", module = %name);

            if let (Some(service), true) = (&messages, handler.message_handler().is_some()) {
                group.spawn(
                    message_loop(
                        Arc::clone(&handler),
                        Arc::clone(service),
                        limit.clone(),
                        group.token(),
                    )
                    .instrument(span.clone()),
                );
            }

            if let (Some(service), Some(commander)) = (&messages, handler.commander()) {
                let command = commander.command();
                let service = Arc::clone(service);
                let limit = limit.clone();
                let token = group.token();
                group.spawn(
                    async move {
                        command.run_loop_with_limit(token, service, limit).await;
                        Ok(())
                    }
                    .instrument(span.clone()),
                );
            }

            let token = group.token();
            group.spawn(
                async move {
                    info!("starting module");
                    handler
                        .start(token)
                        .await
                        .map_err(|e| Error::module_start(&name, e))?;
                    debug!("module stopped");
                    Ok(())
                }
                .instrument(span),
            );
        }

        info!(tasks = group.len(), "loader started");
        let outcome = group.wait().await;

        if let Some(transport) = self.transport {
            transport.close().await;
        }
        info!("loader stopped");
        outcome
    }

    /// Fail before spawning anything if an enabled module needs a transport
    /// capability that is not there.
    fn check_preconditions(&mut self) -> Result<()> {
        let has_messages = self
            .transport
            .as_ref()
            .is_some_and(|t| t.messages().is_some());

        for module in &mut self.modules {
            if !self.enabled.get(&module.name).copied().unwrap_or(false) {
                continue;
            }
            let messaging =
                module.handler.commander().is_some() || module.handler.message_handler().is_some();
            let binds = module.handler.transport_binder().is_some();

            if (messaging || binds) && self.transport.is_none() {
                return Err(Error::TransportRequired {
                    module: module.name.clone(),
                });
            }
            if messaging && !has_messages {
                return Err(Error::MessagingUnavailable {
                    module: module.name.clone(),
                });
            }
            if module.handler.http().is_some() && self.router.is_none() {
                warn!(
                    module = %module.name,
                    "module serves HTTP but no listen address is configured"
                );
            }
        }
        Ok(())
    }
}

async fn message_loop(
    handler: Arc<dyn Handler>,
    service: Arc<dyn MessageService>,
    limit: DispatchLimit,
    cancel: CancellationToken,
) -> Result<()> {
    fan_out(&cancel, service.as_ref(), &limit, |msg| {
        let handler = Arc::clone(&handler);
        let cancel = cancel.clone();
        async move {
            if let Some(target) = handler.message_handler() {
                target.handle_message(cancel, msg).await;
            }
        }
    })
    .await;
    debug!("message loop stopped");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{HttpHandler, Module, ModuleConfig},
        async_trait::async_trait,
        serde_json::json,
    };

    #[derive(Default, Deserialize)]
    #[serde(default)]
    struct GreeterConfig {
        greeter: GreeterBlock,
    }

    #[derive(Default, Deserialize)]
    #[serde(default)]
    struct GreeterBlock {
        greeting: String,
    }

    #[derive(Default)]
    struct Greeter {
        config: GreeterConfig,
    }

    #[async_trait]
    impl Handler for Greeter {
        fn config(&mut self) -> Option<&mut dyn ModuleConfig> {
            Some(&mut self.config)
        }

        async fn start(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
            Ok(())
        }

        fn http(&self) -> Option<&dyn HttpHandler> {
            Some(self)
        }
    }

    impl HttpHandler for Greeter {
        fn http_prefix(&self) -> &str {
            "/greet/"
        }

        fn router(&self) -> Router {
            Router::new()
        }
    }

    fn loader() -> Loader {
        let mut registry = ModuleRegistry::new();
        registry
            .register(Module::new("greeter", Greeter::default))
            .unwrap();
        Loader::new(registry)
    }

    #[test]
    fn reads_own_block_and_flags() {
        let mut loader = loader();
        loader
            .load_config(&json!({
                "parley": {"enable": true, "dispatch": {"max_concurrent": 4}},
                "greeter": {"enable": false, "greeting": "hi"},
            }))
            .unwrap();

        assert!(loader.is_enabled("parley"));
        assert!(!loader.is_enabled("greeter"));
        assert!(!loader.is_enabled("missing"));
        assert_eq!(loader.config().dispatch.max_concurrent, Some(4));
        assert!(loader.http_router().is_none());
    }

    #[test]
    fn disabled_modules_still_get_config() {
        let mut loader = loader();
        let err = loader
            .load_config(&json!({"greeter": {"greeting": 42}}))
            .unwrap_err();
        assert!(matches!(err, Error::ModuleConfig { ref module, .. } if module == "greeter"));
    }

    #[test]
    fn enabled_transport_needs_a_factory() {
        let mut loader = loader();
        let err = loader
            .load_config(&json!({"transport": {"enable": true}}))
            .unwrap_err();
        assert!(matches!(err, Error::NoTransport));
    }

    #[test]
    fn bad_prefix_fails_config_load() {
        let mut loader = loader();
        let err = loader
            .load_config(&json!({
                "parley": {"enable": true, "http": {"listen_addr": "127.0.0.1:0"}},
                "greeter": {"enable": true},
            }))
            .unwrap_err();
        assert!(matches!(err, Error::HttpPrefix { .. }));
    }

    #[tokio::test]
    async fn refuses_to_start_without_own_flag() {
        let mut loader = loader();
        loader
            .load_config(&json!({"greeter": {"enable": true}}))
            .unwrap();
        let err = loader.start(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotEnabled(ref name) if name == LOADER_NAME));
    }
}
