//! End-to-end: config file -> static metadata -> scheduler -> router.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokenroute_core::config::AppConfig;
use tokenroute_core::source;
use tokenroute_core::testkit::{MockMetadataSource, RecordingHandlerFactory, metadata};
use tokenroute_core::{
    RefreshOutcome, RefreshPolicy, RefreshScheduler, RegistryBuilder, RegistryHandle,
    RouteOutcome, Router,
};
use tokenroute_traits::{HandlerId, InboundMessage, SourceError};

const CONFIG: &str = r#"
[refresh]
interval_minutes = 60

[source]
kind = "static"
path = "metadata.toml"

[channels."1001"]
name = "sales"

[channels."1001".handler]
default = "23-ogcontract"
string_triggers = { "24" = ["Sale"] }
token_id_triggers = [{ "25-pass" = [100, 200] }]

[channels."1002"]
name = "mirror"

[channels."1002".handler]
default = "23-ogcontract"

[channels."1003"]
name = "lobby"

[contracts.ogcontract]
address = "0x1234"
"#;

const METADATA: &str = r#"
["23-ogcontract"]
name = "OG"
invocations = 10
active = true

["24"]
name = "Sales"
invocations = 2
active = true

["25-pass"]
name = "Pass"
invocations = 0
active = true
"#;

fn id(raw: &str) -> HandlerId {
    raw.parse().unwrap()
}

fn write_fixture() -> (TempDir, AppConfig) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), CONFIG).unwrap();
    fs::write(dir.path().join("metadata.toml"), METADATA).unwrap();
    let config = AppConfig::load_from_path(&dir.path().join("config.toml")).unwrap();
    (dir, config)
}

#[tokio::test]
async fn test_static_source_routes_messages() {
    let (_dir, config) = write_fixture();
    let source = source::from_settings(config.source.as_ref().unwrap()).unwrap();
    let factory = Arc::new(RecordingHandlerFactory::new());
    let routing = Arc::new(config.routing);
    let registry = RegistryHandle::new();

    let scheduler = Arc::new(RefreshScheduler::new(
        RegistryBuilder::from_settings(source, factory.clone(), &config.refresh),
        routing.clone(),
        registry.clone(),
        config.refresh.interval(),
    ));
    let handle = scheduler.start().await;
    assert!(handle.initial_outcome().is_published());

    let snapshot = registry.load();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.channel_of(&id("23-ogcontract")), Some("1002"));

    let router = Router::new(routing, registry);
    let cases = [
        ("m-1", "1001", "Big SALE today", RouteOutcome::Dispatched { handler: id("24") }),
        ("m-2", "1001", "hello", RouteOutcome::Dispatched { handler: id("23-ogcontract") }),
        ("m-3", "1001", "sale on token 150", RouteOutcome::Dispatched { handler: id("25-pass") }),
        ("m-4", "1003", "sale", RouteOutcome::Unrouted),
    ];
    for (message_id, channel, text, expected) in cases {
        let message = InboundMessage::new(message_id, channel, "user", text);
        assert_eq!(router.route(&message).await.unwrap(), expected, "{text}");
    }
    assert_eq!(factory.deliveries().len(), 3);

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_one_failed_fetch_leaves_registry_unchanged() {
    let (_dir, config) = write_fixture();
    let source = Arc::new(MockMetadataSource::new());
    source.set(id("23-ogcontract"), metadata("OG", 10));
    source.set(id("24"), metadata("Sales", 2));
    source.set(id("25-pass"), metadata("Pass", 0));

    let registry = RegistryHandle::new();
    let scheduler = Arc::new(RefreshScheduler::new(
        RegistryBuilder::new(source.clone(), Arc::new(RecordingHandlerFactory::new())),
        Arc::new(config.routing),
        registry.clone(),
        config.refresh.interval(),
    ));
    let handle = scheduler.start().await;
    let before = registry.load();

    source.set(id("24"), metadata("Sales", 99));
    source.fail(id("25-pass"), SourceError::Http("502 Bad Gateway".to_string()));
    let outcome = handle.refresh_now().await.unwrap();

    assert_eq!(outcome, RefreshOutcome::Failed { failed: 1, total: 3 });
    assert_eq!(*registry.load(), *before);
    assert_eq!(registry.generation(), 1);
    assert_eq!(
        registry.load().get(&id("24")).unwrap().record.invocation_count,
        2
    );
}

fn healthy_mock() -> Arc<MockMetadataSource> {
    let source = Arc::new(MockMetadataSource::new());
    source.set(id("23-ogcontract"), metadata("OG", 10));
    source.set(id("24"), metadata("Sales", 2));
    source.set(id("25-pass"), metadata("Pass", 0));
    source
}

#[tokio::test]
async fn test_partial_policy_never_publishes_a_missing_handler() {
    let (_dir, config) = write_fixture();
    let source = healthy_mock();
    source.fail(id("24"), SourceError::Http("503 Service Unavailable".to_string()));

    let routing = Arc::new(config.routing);
    let registry = RegistryHandle::new();
    let builder = RegistryBuilder::new(source.clone(), Arc::new(RecordingHandlerFactory::new()))
        .with_policy(RefreshPolicy::Partial);
    let scheduler = Arc::new(RefreshScheduler::new(
        builder,
        routing.clone(),
        registry.clone(),
        config.refresh.interval(),
    ));

    // No previous record for "24", so nothing is published.
    let handle = scheduler.start().await;
    assert_eq!(
        handle.initial_outcome(),
        &RefreshOutcome::Failed { failed: 1, total: 3 }
    );
    assert_eq!(registry.generation(), 0);

    source.set(id("24"), metadata("Sales", 2));
    assert_eq!(
        handle.refresh_now().await.unwrap(),
        RefreshOutcome::Published {
            generation: 1,
            handlers: 3,
            carried_over: 0
        }
    );

    source.fail(id("24"), SourceError::Http("503 Service Unavailable".to_string()));
    assert_eq!(
        handle.refresh_now().await.unwrap(),
        RefreshOutcome::Published {
            generation: 2,
            handlers: 3,
            carried_over: 1
        }
    );

    let router = Router::new(routing, registry);
    let outcome = router
        .route(&InboundMessage::new("m-1", "1001", "user", "big sale"))
        .await
        .unwrap();
    assert_eq!(outcome, RouteOutcome::Dispatched { handler: id("24") });

    handle.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_routes_during_rebuild_use_last_published_snapshot() {
    let (_dir, config) = write_fixture();
    let source = healthy_mock();
    let factory = Arc::new(RecordingHandlerFactory::new());

    let routing = Arc::new(config.routing);
    let registry = RegistryHandle::new();
    let scheduler = Arc::new(RefreshScheduler::new(
        RegistryBuilder::new(source.clone(), factory.clone()),
        routing.clone(),
        registry.clone(),
        config.refresh.interval(),
    ));
    let handle = scheduler.clone().start().await;
    assert_eq!(registry.generation(), 1);

    source.set(id("24"), metadata("Sales", 9));
    source.delay(id("24"), Duration::from_secs(30));
    let pending = tokio::spawn({
        let handle = handle.clone();
        async move { handle.refresh_now().await }
    });
    for _ in 0..100 {
        if scheduler.is_refreshing() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(scheduler.is_refreshing());

    let router = Router::new(routing, registry.clone());
    let outcome = router
        .route(&InboundMessage::new("m-1", "1001", "user", "big sale"))
        .await
        .unwrap();
    assert_eq!(outcome, RouteOutcome::Dispatched { handler: id("24") });
    assert_eq!(registry.generation(), 1);
    assert_eq!(
        registry.load().get(&id("24")).unwrap().record.invocation_count,
        2
    );

    let outcome = pending.await.unwrap().unwrap();
    assert!(matches!(outcome, RefreshOutcome::Published { generation: 2, .. }));
    assert_eq!(
        registry.load().get(&id("24")).unwrap().record.invocation_count,
        9
    );
    assert_eq!(factory.deliveries().len(), 1);

    handle.stop().await.unwrap();
}
