//! Test doubles for the metadata source and handler factory.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokenroute_traits::{
    ContractDescriptor, HandlerFactory, HandlerId, HandlerMetadata, HandlerRecord,
    InboundMessage, MessageHandler, MetadataSource, SourceError,
};

/// Active metadata with the given name and invocation count.
pub fn metadata(name: &str, invocation_count: u64) -> HandlerMetadata {
    HandlerMetadata {
        invocation_count,
        name: name.to_string(),
        active: true,
        contract_id: None,
    }
}

#[derive(Default)]
struct MockState {
    responses: BTreeMap<HandlerId, Result<HandlerMetadata, SourceError>>,
    delays: HashMap<HandlerId, Duration>,
    calls: HashMap<u64, usize>,
    descriptors: HashMap<u64, ContractDescriptor>,
}

/// Scriptable metadata source.
///
/// Responses are keyed by handler id. A request is matched on project id and
/// descriptor name first, then on project id alone.
#[derive(Default)]
pub struct MockMetadataSource {
    state: Mutex<MockState>,
    total_calls: AtomicUsize,
}

impl MockMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests for `id` with `metadata`
    pub fn set(&self, id: HandlerId, metadata: HandlerMetadata) {
        self.state().responses.insert(id, Ok(metadata));
    }

    /// Fail requests for `id` with `error`
    pub fn fail(&self, id: HandlerId, error: SourceError) {
        self.state().responses.insert(id, Err(error));
    }

    /// Delay responses for `id`
    pub fn delay(&self, id: HandlerId, delay: Duration) {
        self.state().delays.insert(id, delay);
    }

    pub fn calls_for(&self, project_id: u64) -> usize {
        self.state().calls.get(&project_id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    /// Last descriptor passed for a project
    pub fn descriptor_for(&self, project_id: u64) -> Option<ContractDescriptor> {
        self.state().descriptors.get(&project_id).cloned()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lookup_key(state: &MockState, project_id: u64, contract: Option<&ContractDescriptor>) -> Option<HandlerId> {
        if let Some(descriptor) = contract {
            let exact = HandlerId::with_contract(project_id, descriptor.name.clone());
            if state.responses.contains_key(&exact) {
                return Some(exact);
            }
        }
        state
            .responses
            .keys()
            .find(|id| id.project_id == project_id)
            .cloned()
    }
}

#[async_trait]
impl MetadataSource for MockMetadataSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_handler_metadata(
        &self,
        project_id: u64,
        contract: Option<&ContractDescriptor>,
    ) -> Result<HandlerMetadata, SourceError> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);

        let (response, delay) = {
            let mut state = self.state();
            *state.calls.entry(project_id).or_default() += 1;
            if let Some(descriptor) = contract {
                state.descriptors.insert(project_id, descriptor.clone());
            }
            let key = Self::lookup_key(&state, project_id, contract);
            let response = key
                .as_ref()
                .and_then(|key| state.responses.get(key).cloned())
                .unwrap_or(Err(SourceError::NotFound(project_id)));
            let delay = key.and_then(|key| state.delays.get(&key).copied());
            (response, delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

/// A message delivered to a [`RecordingHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub handler: HandlerId,
    pub message_id: String,
    pub content: String,
}

/// Handler that records every message it receives.
pub struct RecordingHandler {
    id: HandlerId,
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    fail: bool,
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn handle_message(&self, message: &InboundMessage) -> Result<()> {
        if self.fail {
            return Err(anyhow!("handler {} rejected message {}", self.id, message.id));
        }
        self.deliveries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Delivery {
                handler: self.id.clone(),
                message_id: message.id.clone(),
                content: message.content.clone(),
            });
        Ok(())
    }
}

/// Factory producing [`RecordingHandler`]s that share one delivery log.
#[derive(Default)]
pub struct RecordingHandlerFactory {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    failing: Mutex<HashSet<HandlerId>>,
    created: AtomicUsize,
}

impl RecordingHandlerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers created for `id` from now on reject every message
    pub fn fail_handler(&self, id: HandlerId) {
        self.failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id);
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of handler instances created so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl HandlerFactory for RecordingHandlerFactory {
    fn create(&self, record: &HandlerRecord) -> Arc<dyn MessageHandler> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let fail = self
            .failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&record.id);
        Arc::new(RecordingHandler {
            id: record.id.clone(),
            deliveries: self.deliveries.clone(),
            fail,
        })
    }
}
