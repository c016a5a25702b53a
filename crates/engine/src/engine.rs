use std::{path::Path, sync::Arc};

use {
    stubwire_channels::MessageChannels,
    stubwire_config::StubwireConfig,
    stubwire_entity::{EntityDefaults, EntityResolver, FileSystemStore, StoreAccess, Stores},
    stubwire_journal::{DisabledMessageJournal, InMemoryMessageJournal, MessageJournal},
    stubwire_matching::{CustomMatchers, DefaultRequestMatcher, RequestMatcher},
    stubwire_messaging::{MessageStubMapping, MessageStubMappings, Transformers, parse_mappings},
    tracing::info,
};

use crate::{
    Error, Result,
    handler::{HttpMatchEvent, HttpStubServeEventListener, MessageStubRequestHandler},
};

/// The message engine with its registries, journal and handler wired
/// together.
pub struct MessagingEngine {
    channels: Arc<MessageChannels>,
    stubs: Arc<MessageStubMappings>,
    journal: Arc<dyn MessageJournal>,
    stores: Arc<Stores>,
    handler: Arc<MessageStubRequestHandler>,
}

impl MessagingEngine {
    pub fn builder(config: StubwireConfig) -> MessagingEngineBuilder {
        MessagingEngineBuilder::new(config)
    }

    /// Engine built from `config`, loading the configured mappings file.
    pub fn from_config(config: StubwireConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Engine built from the config file at `path`.
    pub fn from_config_file(path: &Path) -> Result<Self> {
        Self::from_config(stubwire_config::load_config(path)?)
    }

    pub fn channels(&self) -> &Arc<MessageChannels> {
        &self.channels
    }

    pub fn stubs(&self) -> &Arc<MessageStubMappings> {
        &self.stubs
    }

    pub fn journal(&self) -> &Arc<dyn MessageJournal> {
        &self.journal
    }

    pub fn stores(&self) -> &Arc<Stores> {
        &self.stores
    }

    pub fn handler(&self) -> &Arc<MessageStubRequestHandler> {
        &self.handler
    }

    pub fn add_stub(&self, mapping: MessageStubMapping) -> Arc<MessageStubMapping> {
        self.stubs.add(mapping)
    }

    /// Load message stub mappings from a JSON file. Returns how many were added.
    pub fn load_mappings_file(&self, path: &Path) -> Result<usize> {
        let raw = std::fs::read_to_string(path).map_err(|source| Error::ReadMappings {
            path: path.to_path_buf(),
            source,
        })?;
        let count = self.stubs.add_all(parse_mappings(&raw)?);
        info!(path = %path.display(), count, "loaded message stub mappings");
        Ok(count)
    }

    /// Report a served (or unmatched) HTTP request to the message engine.
    pub async fn after_http_match(&self, event: &HttpMatchEvent) {
        self.handler.after_match(event).await;
    }

    /// Close every channel, forget every stub and empty the journal.
    pub fn reset(&self) {
        self.channels.clear();
        self.stubs.clear();
        self.journal.reset();
    }
}

/// Builder for [`MessagingEngine`] with optional extension points.
pub struct MessagingEngineBuilder {
    config: StubwireConfig,
    matcher: Arc<dyn RequestMatcher>,
    custom: CustomMatchers,
    transformers: Transformers,
    stores: Stores,
}

impl MessagingEngineBuilder {
    fn new(config: StubwireConfig) -> Self {
        Self {
            config,
            matcher: Arc::new(DefaultRequestMatcher),
            custom: CustomMatchers::new(),
            transformers: Transformers::new(),
            stores: Stores::new(),
        }
    }

    pub fn matcher(mut self, matcher: Arc<dyn RequestMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn custom_matchers(mut self, custom: CustomMatchers) -> Self {
        self.custom = custom;
        self
    }

    pub fn transformers(mut self, transformers: Transformers) -> Self {
        self.transformers = transformers;
        self
    }

    pub fn stores(mut self, stores: Stores) -> Self {
        self.stores = stores;
        self
    }

    pub fn build(self) -> Result<MessagingEngine> {
        let config = self.config;
        let channels = Arc::new(MessageChannels::new(Arc::clone(&self.matcher)));
        let stubs = Arc::new(MessageStubMappings::new(
            config.stubs.default_priority,
            Arc::clone(&self.matcher),
        ));
        let journal: Arc<dyn MessageJournal> = if config.journal.enabled {
            Arc::new(InMemoryMessageJournal::with_matcher(
                config.journal.max_entries,
                Arc::clone(&self.matcher),
                self.custom.clone(),
            ))
        } else {
            info!("message journal disabled");
            Arc::new(DisabledMessageJournal)
        };

        if let Some(root) = &config.files.root {
            self.stores.set_files(Arc::new(FileSystemStore::new(root)));
        }
        let stores = Arc::new(self.stores);

        let handler = MessageStubRequestHandler::new(
            Arc::clone(&channels),
            Arc::clone(&stubs),
            Arc::clone(&journal),
        )
        .with_resolver(EntityResolver::new(EntityDefaults::from(&config.entity)))
        .with_stores(Arc::clone(&stores) as Arc<dyn StoreAccess>)
        .with_transformers(self.transformers)
        .with_custom_matchers(self.custom);

        let engine = MessagingEngine {
            channels,
            stubs,
            journal,
            stores,
            handler: Arc::new(handler),
        };
        if let Some(path) = &config.stubs.mappings {
            engine.load_mappings_file(path)?;
        }
        Ok(engine)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        stubwire_journal::Error as JournalError,
        stubwire_messaging::{MessagePattern, MessageTrigger},
    };

    #[test]
    fn loads_configured_mappings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");
        std::fs::write(
            &path,
            r#"[{"name": "a", "trigger": {"type": "message"}},
                {"name": "b", "trigger": {"type": "http-request", "requestPattern": {"url": "/x"}}}]"#,
        )
        .unwrap();

        let mut config = StubwireConfig::default();
        config.stubs.mappings = Some(path);
        let engine = MessagingEngine::from_config(config).unwrap();
        assert_eq!(engine.stubs().len(), 2);
    }

    #[test]
    fn bad_mappings_file_fails_with_the_tag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");
        std::fs::write(&path, r#"[{"trigger": {"type": "telepathy"}}]"#).unwrap();
        let mut config = StubwireConfig::default();
        config.stubs.mappings = Some(path);

        let err = MessagingEngine::from_config(config).err().unwrap();
        assert!(matches!(err, Error::Mappings(_)));
        assert!(err.to_string().contains("telepathy"));
    }

    #[test]
    fn config_file_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stubwire.toml");
        std::fs::write(&path, "[journal\n").unwrap();
        assert!(matches!(
            MessagingEngine::from_config_file(&path),
            Err(Error::Config(_))
        ));

        std::fs::write(&path, "[journal]\nmax_entries = 3\n").unwrap();
        let engine = MessagingEngine::from_config_file(&path).unwrap();
        assert_eq!(engine.journal().max_entries(), Some(3));
    }

    #[test]
    fn disabled_journal_from_config() {
        let mut config = StubwireConfig::default();
        config.journal.enabled = false;
        let engine = MessagingEngine::from_config(config).unwrap();
        assert!(matches!(
            engine.journal().count_events_matching(&MessagePattern::ANYTHING),
            Err(JournalError::JournalDisabled)
        ));
    }

    #[test]
    fn reset_clears_everything() {
        let mut config = StubwireConfig::default();
        config.journal.max_entries = Some(10);
        let engine = MessagingEngine::from_config(config).unwrap();
        engine.add_stub(
            MessageStubMapping::builder()
                .trigger(MessageTrigger::any_message())
                .build(),
        );
        engine.journal().set_max_entries(Some(1));
        engine.reset();
        assert!(engine.stubs().is_empty());
        assert_eq!(engine.journal().max_entries(), Some(10));
    }
}
