//! Runtime assembled from configuration
//!
//! [`Runtime`] owns the transaction coordinator with its resource wrappers,
//! the retry policy from `[retry]`, and the clock and timeouts the
//! rendezvous registries are created with.

use conduit_core::{
    ConduitConfig, ConduitError, InstanceId, OperationContext, Result, CONFIG_FILE_NAME,
};
use conduit_rendezvous::{
    Clock, ContinuationRegistry, PendingResultRegistry, ResultOffer, SystemClock,
};
use conduit_resources::{BlobStore, BroadcastChannel, ItemStore, Publisher, QueueSender};
use conduit_retry::{RetryConfiguration, RetryExecutor, RetrySwitch};
use conduit_transaction::{
    CoordinatorStats, TransactionCoordinator, TransactionalBlobStore, TransactionalItemStore,
    TransactionalPublisher, TransactionalSender,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Builder for [`Runtime`]
pub struct RuntimeBuilder {
    config: ConduitConfig,
    instance: InstanceId,
    clock: Arc<dyn Clock>,
    retry_switch: RetrySwitch,
    items: Option<Arc<dyn ItemStore>>,
    blobs: Option<Arc<dyn BlobStore>>,
    sender: Option<Arc<dyn QueueSender>>,
    publisher: Option<Arc<dyn Publisher>>,
}

impl RuntimeBuilder {
    /// Load `conduit.toml` from `dir`, writing the default file first if it
    /// does not exist
    pub fn from_dir(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| {
            ConduitError::config(format!(
                "Failed to create config directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        let config_path = dir.join(CONFIG_FILE_NAME);
        ConduitConfig::write_default_if_missing(&config_path)?;
        let config = ConduitConfig::from_file(&config_path)?;
        Ok(Runtime::builder(config))
    }

    /// Transactional access to an item store
    pub fn item_store(mut self, store: Arc<dyn ItemStore>) -> Self {
        self.items = Some(store);
        self
    }

    /// Transactional access to a blob store
    pub fn blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(store);
        self
    }

    /// Transactional access to a queue
    pub fn sender(mut self, sender: Arc<dyn QueueSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Transactional access to a pub/sub broker
    pub fn publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Instance id pending results are addressed to
    pub fn instance(mut self, instance: InstanceId) -> Self {
        self.instance = instance;
        self
    }

    /// Clock rendezvous deadlines are measured on
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Retry on/off switch; defaults to the process-wide switch
    pub fn retry_switch(mut self, switch: RetrySwitch) -> Self {
        self.retry_switch = switch;
        self
    }

    /// Validate the configuration and assemble the runtime
    ///
    /// Applies `retry.enabled` to the selected retry switch.
    pub fn build(self) -> Result<Runtime> {
        self.config.validate()?;
        let retry = RetryConfiguration::from_settings(&self.config.retry)?;
        self.retry_switch.set(self.config.retry.enabled);
        let executor = RetryExecutor::new().with_switch(self.retry_switch);

        let items = self.items.map(|s| Arc::new(TransactionalItemStore::new(s)));
        let blobs = self.blobs.map(|s| Arc::new(TransactionalBlobStore::new(s)));
        let sender = self.sender.map(|s| Arc::new(TransactionalSender::new(s)));
        let publisher = self.publisher.map(|p| Arc::new(TransactionalPublisher::new(p)));

        let mut builder = TransactionCoordinator::builder();
        if let Some(r) = &items {
            builder = builder.resource(r.clone());
        }
        if let Some(r) = &blobs {
            builder = builder.resource(r.clone());
        }
        if let Some(r) = &sender {
            builder = builder.resource(r.clone());
        }
        if let Some(r) = &publisher {
            builder = builder.resource(r.clone());
        }

        info!(
            target: "conduit::runtime",
            instance = %self.instance,
            retry_enabled = self.config.retry.enabled,
            max_attempts = retry.max_attempts(),
            "Runtime assembled"
        );

        Ok(Runtime {
            config: self.config,
            instance: self.instance,
            clock: self.clock,
            coordinator: builder.build(),
            items,
            blobs,
            sender,
            publisher,
            retry,
            executor,
        })
    }
}

/// Coordinator, resource wrappers and policies built from one configuration
pub struct Runtime {
    config: ConduitConfig,
    instance: InstanceId,
    clock: Arc<dyn Clock>,
    coordinator: TransactionCoordinator,
    items: Option<Arc<TransactionalItemStore>>,
    blobs: Option<Arc<TransactionalBlobStore>>,
    sender: Option<Arc<TransactionalSender>>,
    publisher: Option<Arc<TransactionalPublisher>>,
    retry: RetryConfiguration,
    executor: RetryExecutor,
}

impl Runtime {
    /// Start building a runtime from `config`
    pub fn builder(config: ConduitConfig) -> RuntimeBuilder {
        RuntimeBuilder {
            config,
            instance: InstanceId::new(),
            clock: Arc::new(SystemClock),
            retry_switch: RetrySwitch::global(),
            items: None,
            blobs: None,
            sender: None,
            publisher: None,
        }
    }

    /// The configuration this runtime was built from
    pub fn config(&self) -> &ConduitConfig {
        &self.config
    }

    /// This instance's id
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// The transaction coordinator
    pub fn coordinator(&self) -> &TransactionCoordinator {
        &self.coordinator
    }

    /// Coordinator metrics
    pub fn stats(&self) -> CoordinatorStats {
        self.coordinator.stats()
    }

    /// Transactional item store, if configured
    pub fn items(&self) -> Option<&Arc<TransactionalItemStore>> {
        self.items.as_ref()
    }

    /// Transactional blob store, if configured
    pub fn blobs(&self) -> Option<&Arc<TransactionalBlobStore>> {
        self.blobs.as_ref()
    }

    /// Transactional queue sender, if configured
    pub fn sender(&self) -> Option<&Arc<TransactionalSender>> {
        self.sender.as_ref()
    }

    /// Transactional publisher, if configured
    pub fn publisher(&self) -> Option<&Arc<TransactionalPublisher>> {
        self.publisher.as_ref()
    }

    /// Retry policy from `[retry]`
    pub fn retry_config(&self) -> &RetryConfiguration {
        &self.retry
    }

    /// Retry executor bound to the configured switch
    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    /// Begin on `ctx`, run `f`, then commit, aborting if anything fails
    pub fn transaction<F, T>(&self, ctx: &mut OperationContext, f: F) -> Result<T>
    where
        F: FnOnce(&mut OperationContext) -> Result<T>,
    {
        self.coordinator.transaction(ctx, f)
    }

    /// A continuation registry with the configured timeout
    pub fn continuations<T: Send>(&self) -> ContinuationRegistry<T> {
        ContinuationRegistry::with_clock(Arc::clone(&self.clock))
            .with_timeout(self.config.rendezvous.continuation_timeout())
    }

    /// A pending-result registry for this instance, subscribed to `channel`
    pub fn pending_results<T>(
        &self,
        channel: Arc<dyn BroadcastChannel<ResultOffer>>,
    ) -> Arc<PendingResultRegistry<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        PendingResultRegistry::connect(
            self.instance,
            channel,
            Arc::clone(&self.clock),
            self.config.rendezvous.pending_result_timeout(),
        )
    }
}
