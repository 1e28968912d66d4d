use super::*;
use crate::services::resources::listener::SubscribeExt;
use crate::testing::memory_backend_context::MemoryBackendContext;
use crate::testing::{ProjectView, next_event, project_kind, project_object, task_kind};
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::SeqCst;
use test_context::test_context;

const DISABLED_MESSAGE: &str = "the projects feature is not available in this cluster";

fn project_module(ctx: &MemoryBackendContext) -> Module {
    Module::new(
        "projects",
        vec![
            ResourceKindSpec::new(project_kind()),
            ResourceKindSpec::new(task_kind()),
        ],
        ctx.factory.clone(),
        DISABLED_MESSAGE,
    )
}

async fn assert_all_operations_disabled(service: &Arc<dyn ResourceService>) {
    let list = service.list(None).await;
    let get = service.get("alpha", Some("default")).await;
    let create = service.create(project_object("alpha", "default")).await;
    let update = service
        .update("alpha", Some("default"), 0, Box::new(|_| {}))
        .await;
    let delete = service.delete("alpha", Some("default")).await;
    let subscribe = service.subscribe_filtered::<ProjectView, _>(8, |_| true);

    for error in [
        list.err().expect("list should fail"),
        get.err().expect("get should fail"),
        create.err().expect("create should fail"),
        update.err().expect("update should fail"),
        delete.err().expect("delete should fail"),
        subscribe.err().expect("subscribe should fail"),
    ] {
        assert!(error.is_disabled());
        assert_eq!(error.to_string(), DISABLED_MESSAGE);
    }
}

#[test_context(MemoryBackendContext)]
#[tokio::test]
async fn test_module_starts_disabled(ctx: &mut MemoryBackendContext) {
    let module = project_module(ctx);

    assert!(!module.is_enabled().await);
    for kind in [project_kind(), task_kind()] {
        let service = module.service(&kind).expect("Declared kind should resolve");
        assert_all_operations_disabled(&service).await;
    }
}

#[test_context(MemoryBackendContext)]
#[tokio::test]
async fn test_enable_brings_services_live(ctx: &mut MemoryBackendContext) {
    let module = project_module(ctx);

    module.enable().await.expect("Enable should succeed");

    assert!(module.is_enabled().await);
    let service = module.service(&project_kind()).expect("Declared kind should resolve");
    let (mut events, _subscription) = service
        .subscribe_filtered::<ProjectView, _>(16, |_| true)
        .expect("Subscription should succeed");
    service
        .create(project_object("alpha", "default"))
        .await
        .expect("Create should succeed");
    next_event(&mut events).await;
    let objects = service.list(Some("default")).await.expect("List should succeed");
    assert_eq!(objects.len(), 1);
}

#[test_context(MemoryBackendContext)]
#[tokio::test]
async fn test_disable_fails_every_kind_with_the_fixed_error(ctx: &mut MemoryBackendContext) {
    let module = project_module(ctx);
    module.enable().await.expect("Enable should succeed");

    module.disable().await.expect("Disable should succeed");

    assert!(!module.is_enabled().await);
    // Both kinds fail the same way, the never-touched one included.
    for kind in [project_kind(), task_kind()] {
        let service = module.service(&kind).expect("Declared kind should resolve");
        assert_all_operations_disabled(&service).await;
    }
    assert!(ctx.factory.service(&project_kind()).is_none());
}

#[test_context(MemoryBackendContext)]
#[tokio::test]
async fn test_enable_disable_cycles_end_enabled(ctx: &mut MemoryBackendContext) {
    let module = project_module(ctx);

    for _ in 0..3 {
        module.enable().await.expect("Enable should succeed");
        module.disable().await.expect("Disable should succeed");
    }
    module.enable().await.expect("Enable should succeed");

    let service = module.service(&project_kind()).expect("Declared kind should resolve");
    service
        .create(project_object("alpha", "default"))
        .await
        .expect("Create should succeed");
}

#[test_context(MemoryBackendContext)]
#[tokio::test]
async fn test_enable_is_all_or_nothing(ctx: &mut MemoryBackendContext) {
    let module = project_module(ctx);
    ctx.store.make_unavailable(&task_kind());

    let result = module.enable().await;

    assert!(result.is_err());
    assert!(!module.is_enabled().await);
    let service = module.service(&project_kind()).expect("Declared kind should resolve");
    assert!(service.list(None).await.err().expect("Expected an error").is_disabled());
    // The kind that built successfully was never installed either.
    assert!(ctx.factory.service(&project_kind()).is_none());
}

#[test_context(MemoryBackendContext)]
#[tokio::test]
async fn test_in_flight_reference_survives_disable(ctx: &mut MemoryBackendContext) {
    let module = project_module(ctx);
    module.enable().await.expect("Enable should succeed");
    let captured = module.service(&project_kind()).expect("Declared kind should resolve");
    let (mut events, _subscription) = captured
        .subscribe_filtered::<ProjectView, _>(16, |_| true)
        .expect("Subscription should succeed");
    captured
        .create(project_object("alpha", "default"))
        .await
        .expect("Create should succeed");
    next_event(&mut events).await;

    module.disable().await.expect("Disable should succeed");

    // The captured reference still answers from its mirror.
    let object = captured
        .get("alpha", Some("default"))
        .await
        .expect("Captured service should keep serving");
    assert_eq!(object.metadata.name.as_deref(), Some("alpha"));
    // While the module hands out the stand-in.
    let current = module.service(&project_kind()).expect("Declared kind should resolve");
    assert!(current.list(None).await.err().expect("Expected an error").is_disabled());
}

#[test_context(MemoryBackendContext)]
#[tokio::test]
async fn test_on_disable_runs_once_per_transition(ctx: &mut MemoryBackendContext) {
    let calls = Arc::new(AtomicUsize::new(0));
    let witness = calls.clone();
    let module = project_module(ctx).with_on_disable(Box::new(move |error| {
        assert!(error.is_disabled());
        witness.fetch_add(1, SeqCst);
    }));
    module.enable().await.expect("Enable should succeed");

    module.disable().await.expect("Disable should succeed");
    module.disable().await.expect("Repeated disable should be a no-op");

    assert_eq!(calls.load(SeqCst), 1);
}

#[test_context(MemoryBackendContext)]
#[tokio::test]
async fn test_reenable_replaces_the_service_set(ctx: &mut MemoryBackendContext) {
    let module = project_module(ctx);
    module.enable().await.expect("Enable should succeed");
    let before = module.service(&project_kind()).expect("Declared kind should resolve");

    module.enable().await.expect("Re-enable should succeed");

    let after = module.service(&project_kind()).expect("Declared kind should resolve");
    assert!(!Arc::ptr_eq(&before, &after));
    after
        .create(project_object("alpha", "default"))
        .await
        .expect("Create should succeed");
}

#[test_context(MemoryBackendContext)]
#[tokio::test]
async fn test_undeclared_kind_is_an_error(ctx: &mut MemoryBackendContext) {
    let module = Module::new(
        "projects",
        vec![ResourceKindSpec::new(project_kind())],
        ctx.factory.clone(),
        DISABLED_MESSAGE,
    );

    let result = module.service(&task_kind());

    assert!(result.is_err());
}
