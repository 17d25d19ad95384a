//! Immutable registry snapshots and the handle that publishes them.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokenroute_traits::{HandlerId, HandlerRecord, MessageHandler};

/// A handler record together with the instance messages are dispatched to.
#[derive(Clone)]
pub struct RegisteredHandler {
    pub record: HandlerRecord,
    pub instance: Arc<dyn MessageHandler>,
}

impl RegisteredHandler {
    pub fn new(record: HandlerRecord, instance: Arc<dyn MessageHandler>) -> Self {
        Self { record, instance }
    }
}

impl fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

// Instances are recreated on every rebuild; equality is by record.
impl PartialEq for RegisteredHandler {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}

/// One complete, immutable view of the handler registry.
///
/// Equality compares content (records and channel ownership) and ignores
/// the generation counter and build time.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<HandlerId, RegisteredHandler>,
    channel_of_handler: HashMap<HandlerId, String>,
    generation: u64,
    built_at: Option<DateTime<Utc>>,
}

impl HandlerRegistry {
    /// The registry published before the first refresh
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(
        handlers: HashMap<HandlerId, RegisteredHandler>,
        channel_of_handler: HashMap<HandlerId, String>,
        generation: u64,
    ) -> Self {
        Self {
            handlers,
            channel_of_handler,
            generation,
            built_at: Some(Utc::now()),
        }
    }

    /// Get a handler by id
    pub fn get(&self, id: &HandlerId) -> Option<&RegisteredHandler> {
        self.handlers.get(id)
    }

    pub fn contains(&self, id: &HandlerId) -> bool {
        self.handlers.contains_key(id)
    }

    /// Channel that declared the handler (last declaring channel wins)
    pub fn channel_of(&self, id: &HandlerId) -> Option<&str> {
        self.channel_of_handler.get(id).map(String::as_str)
    }

    /// Records sorted by handler id
    pub fn records(&self) -> Vec<&HandlerRecord> {
        let mut records: Vec<&HandlerRecord> =
            self.handlers.values().map(|h| &h.record).collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Number of successful publishes that led to this snapshot (0 = never built)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }
}

impl PartialEq for HandlerRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.handlers == other.handlers && self.channel_of_handler == other.channel_of_handler
    }
}

/// Shared handle to the current registry snapshot.
///
/// Readers get the latest published snapshot; a publish swaps the whole
/// snapshot in one step, so a half-built registry is never observable.
#[derive(Clone)]
pub struct RegistryHandle {
    current: Arc<ArcSwap<HandlerRegistry>>,
}

impl Default for RegistryHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryHandle {
    /// Create a handle holding the empty registry
    pub fn new() -> Self {
        Self::with_registry(HandlerRegistry::empty())
    }

    pub fn with_registry(registry: HandlerRegistry) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(registry)),
        }
    }

    /// Current snapshot
    pub fn load(&self) -> Arc<HandlerRegistry> {
        self.current.load_full()
    }

    /// Replace the current snapshot
    pub fn publish(&self, registry: HandlerRegistry) {
        self.current.store(Arc::new(registry));
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation()
    }
}

impl fmt::Debug for RegistryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current.load();
        f.debug_struct("RegistryHandle")
            .field("generation", &current.generation())
            .field("handlers", &current.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{RecordingHandlerFactory, metadata};
    use tokenroute_traits::{HandlerFactory, NamedMappings};

    fn registered(raw_id: &str, name: &str) -> (HandlerId, RegisteredHandler) {
        let id: HandlerId = raw_id.parse().unwrap();
        let record = HandlerRecord::from_metadata(id.clone(), metadata(name, 1), NamedMappings::default());
        let instance = RecordingHandlerFactory::new().create(&record);
        (id, RegisteredHandler::new(record, instance))
    }

    #[test]
    fn test_empty_registry() {
        let registry = HandlerRegistry::empty();
        assert!(registry.is_empty());
        assert_eq!(registry.generation(), 0);
        assert!(registry.built_at().is_none());
    }

    #[test]
    fn test_equality_ignores_generation_and_instances() {
        let (id, first) = registered("23-ogcontract", "OG");
        let (_, second) = registered("23-ogcontract", "OG");
        let channels = HashMap::from([(id.clone(), "c-1".to_string())]);

        let a = HandlerRegistry::new(HashMap::from([(id.clone(), first)]), channels.clone(), 1);
        let b = HandlerRegistry::new(HashMap::from([(id.clone(), second)]), channels, 2);
        assert_eq!(a, b);

        let (_, renamed) = registered("23-ogcontract", "Renamed");
        let c = HandlerRegistry::new(
            HashMap::from([(id.clone(), renamed)]),
            HashMap::from([(id, "c-1".to_string())]),
            3,
        );
        assert_ne!(a, c);
    }

    #[test]
    fn test_records_sorted_by_id() {
        let (b_id, b) = registered("9", "B");
        let (a_id, a) = registered("2-x", "A");
        let registry = HandlerRegistry::new(
            HashMap::from([(b_id, b), (a_id, a)]),
            HashMap::new(),
            1,
        );

        let names: Vec<&str> = registry.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_handle_publish_swaps_snapshot() {
        let handle = RegistryHandle::new();
        let before = handle.load();

        let (id, handler) = registered("5", "Five");
        handle.publish(HandlerRegistry::new(
            HashMap::from([(id.clone(), handler)]),
            HashMap::from([(id.clone(), "c-5".to_string())]),
            1,
        ));

        // Snapshots already handed out are unaffected.
        assert!(before.is_empty());
        let after = handle.load();
        assert_eq!(after.generation(), 1);
        assert_eq!(after.channel_of(&id), Some("c-5"));
        assert_eq!(handle.generation(), 1);
    }
}
