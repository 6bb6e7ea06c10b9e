use loadout::di::AnyArc;
use loadout::host::SharedResourceLoader;
use loadout::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use tokio::sync::oneshot;

/// Shared event log, registered as a plain instance so services can reach it
/// from their hooks
#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

fn record(services: &Registry, event: &str) -> Arc<EventLog> {
    let log = services.require::<EventLog>().expect("event log registered");
    log.push(event);
    log
}

fn loader_with_log(registry: &Registry, source: BindingCatalog) -> (ServiceLoader, Arc<EventLog>) {
    let log = Arc::new(EventLog::default());
    let mut loader = ServiceLoader::builder(registry.clone()).source(source).build();
    loader
        .register_registration(Arc::new(DirectRegistration::shared(Arc::clone(&log)).with_group(-1)))
        .unwrap();
    (loader, log)
}

// ---- services ----

pub trait Audio: Send + Sync {
    fn volume(&self) -> u32;
}

pub trait Mixer: Send + Sync {
    fn channels(&self) -> usize;
}

#[derive(Default, Service)]
#[service(interface = dyn Audio, proxies = [dyn Mixer], init = sync, shutdown)]
struct AudioService {
    log: OnceLock<Arc<EventLog>>,
}

impl Audio for AudioService {
    fn volume(&self) -> u32 {
        7
    }
}

impl Mixer for AudioService {
    fn channels(&self) -> usize {
        2
    }
}

impl InitService for AudioService {
    fn init_service(&self, services: &Registry) -> Result<(), LifecycleError> {
        let _ = self.log.set(record(services, "audio"));
        Ok(())
    }
}

impl ShutdownService for AudioService {
    fn shutdown_service(&self) -> Result<(), LifecycleError> {
        if let Some(log) = self.log.get() {
            log.push("audio:shutdown");
        }
        Ok(())
    }
}

#[derive(Default, Service)]
#[service(group = 1, init = async, shutdown)]
struct ScoreBoard {
    log: OnceLock<Arc<EventLog>>,
}

#[async_trait]
impl AsyncInitService for ScoreBoard {
    async fn init_service_async(&self, services: &Registry) -> Result<(), LifecycleError> {
        tokio::task::yield_now().await;
        let _ = self.log.set(record(services, "score"));
        Ok(())
    }
}

impl ShutdownService for ScoreBoard {
    fn shutdown_service(&self) -> Result<(), LifecycleError> {
        if let Some(log) = self.log.get() {
            log.push("score:shutdown");
        }
        Err(LifecycleError::shutdown_failed("score board still saving"))
    }
}

#[derive(Default, Service)]
#[service(group = 2, init = sync, shutdown)]
struct Hud {
    log: OnceLock<Arc<EventLog>>,
}

impl InitService for Hud {
    fn init_service(&self, services: &Registry) -> Result<(), LifecycleError> {
        let _ = self.log.set(record(services, "hud"));
        Ok(())
    }
}

impl ShutdownService for Hud {
    fn shutdown_service(&self) -> Result<(), LifecycleError> {
        if let Some(log) = self.log.get() {
            log.push("hud:shutdown");
        }
        Ok(())
    }
}

fn game_catalog() -> BindingCatalog {
    BindingCatalog::new()
        .with::<Hud>()
        .with::<ScoreBoard>()
        .with::<AudioService>()
}

// ---- load order ----

#[tokio::test]
async fn test_groups_then_proxies_init_order() {
    let registry = Registry::new();
    let (mut loader, log) = loader_with_log(&registry, game_catalog());

    let outcome = loader.load_services(false).await.unwrap();
    let report = outcome.report().unwrap();

    assert_eq!(
        report.init_order,
        vec![
            InterfaceId::of::<EventLog>(),
            InterfaceId::of::<dyn Audio>(),
            InterfaceId::of::<dyn Mixer>(),
            InterfaceId::of::<ScoreBoard>(),
            InterfaceId::of::<Hud>(),
        ]
    );
    // the proxy has no init of its own
    assert_eq!(log.events(), vec!["audio", "score", "hud"]);
    assert_eq!(loader.state(), LoaderState::Ready);
    assert!(registry.is_ready());
}

#[tokio::test]
async fn test_proxy_resolves_to_primary_instance() {
    let registry = Registry::new();
    let (mut loader, _log) = loader_with_log(&registry, game_catalog());
    loader.load_services(false).await.unwrap();

    let audio = registry.locate(&InterfaceId::of::<dyn Audio>()).unwrap().unwrap();
    let mixer = registry.locate(&InterfaceId::of::<dyn Mixer>()).unwrap().unwrap();
    assert!(audio.ptr_eq(&mixer));

    assert_eq!(registry.get::<dyn Audio>().unwrap().volume(), 7);
    assert_eq!(registry.get::<dyn Mixer>().unwrap().channels(), 2);
}

// ---- priorities ----

pub trait Clock: Send + Sync {
    fn label(&self) -> &'static str;
}

#[derive(Default, Service)]
#[service(interface = dyn Clock, priority = 5)]
struct SystemClock;

impl Clock for SystemClock {
    fn label(&self) -> &'static str {
        "system"
    }
}

#[derive(Default, Service)]
#[service(interface = dyn Clock, priority = 10)]
struct FrameClock;

impl Clock for FrameClock {
    fn label(&self) -> &'static str {
        "frame"
    }
}

#[tokio::test]
async fn test_highest_priority_binding_wins() {
    for catalog in [
        BindingCatalog::new().with::<SystemClock>().with::<FrameClock>(),
        BindingCatalog::new().with::<FrameClock>().with::<SystemClock>(),
    ] {
        let registry = Registry::new();
        let mut loader = ServiceLoader::builder(registry.clone()).source(catalog).build();
        let report = loader.load_services(false).await.unwrap();

        assert_eq!(report.report().unwrap().registered(), 1);
        assert_eq!(registry.get::<dyn Clock>().unwrap().label(), "frame");
    }
}

// ---- idempotence and readiness ----

#[tokio::test]
async fn test_second_load_is_a_no_op() {
    let registry = Registry::new();
    let ready_events = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ready_events);
    registry.subscribe(Arc::new(move |status: InitStatus| {
        if status.ready {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }));

    let (mut loader, log) = loader_with_log(&registry, game_catalog());
    assert!(matches!(loader.load_services(false).await.unwrap(), LoadOutcome::Loaded(_)));
    assert!(matches!(loader.load_services(false).await.unwrap(), LoadOutcome::AlreadyLoaded));

    assert_eq!(ready_events.load(Ordering::SeqCst), 1);
    assert_eq!(log.events().len(), 3);
}

#[tokio::test]
async fn test_wait_until_ready_resolves_after_load() {
    let registry = Registry::new();
    let waiter = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.wait_until_ready().await })
    };

    let (mut loader, _log) = loader_with_log(&registry, game_catalog());
    loader.load_services(false).await.unwrap();

    tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
        .await
        .expect("waiter released")
        .unwrap();
}

// ---- async init suspends the pipeline ----

struct Gate {
    open: Mutex<Option<oneshot::Receiver<()>>>,
}

#[derive(Default, Service)]
#[service(init = async)]
struct AssetCatalog;

#[async_trait]
impl AsyncInitService for AssetCatalog {
    async fn init_service_async(&self, services: &Registry) -> Result<(), LifecycleError> {
        record(services, "assets:start");
        let gate = services.require::<Gate>()?;
        let open = gate.open.lock().unwrap().take();
        if let Some(open) = open {
            open.await.map_err(|e| LifecycleError::init_failed(e.to_string()))?;
        }
        record(services, "assets:done");
        Ok(())
    }
}

#[derive(Default, Service)]
#[service(group = 1, init = sync)]
struct LevelSelect;

impl InitService for LevelSelect {
    fn init_service(&self, services: &Registry) -> Result<(), LifecycleError> {
        record(services, "levels");
        Ok(())
    }
}

#[tokio::test]
async fn test_async_init_blocks_next_service() {
    let registry = Registry::new();
    let (open, gate) = oneshot::channel();
    let (mut loader, log) = loader_with_log(
        &registry,
        BindingCatalog::new().with::<LevelSelect>().with::<AssetCatalog>(),
    );
    loader
        .register_instance(Arc::new(Gate {
            open: Mutex::new(Some(gate)),
        }))
        .unwrap();

    let (result, ()) = tokio::join!(loader.load_services(false), async {
        while log.events().is_empty() {
            tokio::task::yield_now().await;
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(log.events(), vec!["assets:start"]);
        assert!(!registry.is_ready());
        open.send(()).unwrap();
    });

    result.unwrap();
    assert_eq!(log.events(), vec!["assets:start", "assets:done", "levels"]);
}

#[derive(Default, Service)]
#[service(init = async)]
struct StuckService;

#[async_trait]
impl AsyncInitService for StuckService {
    async fn init_service_async(&self, _services: &Registry) -> Result<(), LifecycleError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_init_timeout_aborts_load() {
    let registry = Registry::new();
    let mut loader = ServiceLoader::builder(registry.clone())
        .source(BindingCatalog::new().with::<StuckService>())
        .config(LoaderConfig {
            init_timeout_ms: Some(20),
            ..LoaderConfig::default()
        })
        .build();

    let err = loader.load_services(false).await.unwrap_err();
    assert!(matches!(err, ServiceError::InitTimeout { millis: 20, .. }));
    assert_eq!(loader.state(), LoaderState::Idle);
    assert!(!registry.is_ready());
    assert!(!registry.status().in_progress);
}

// ---- unload ----

#[tokio::test]
async fn test_unload_is_reverse_and_best_effort() {
    let registry = Registry::new();
    let (mut loader, log) = loader_with_log(&registry, game_catalog());
    loader.load_services(false).await.unwrap();

    let report = loader.unload_services().unwrap();

    // event log, audio, mixer proxy and hud; the score board fails its shutdown
    assert_eq!(report.unregistered, 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].interface, InterfaceId::of::<ScoreBoard>());

    let events = log.events();
    assert_eq!(&events[3..], &["hud:shutdown", "score:shutdown", "audio:shutdown"]);

    assert!(registry.get::<dyn Audio>().is_none());
    assert!(registry.get::<ScoreBoard>().is_none());
    assert!(!registry.is_ready());
    assert_eq!(loader.state(), LoaderState::Unloaded);
    assert!(matches!(
        loader.load_services(true).await,
        Err(ServiceError::LoaderUnloaded)
    ));
}

// ---- resources ----

#[derive(Default, Service)]
#[service(resource = required, resource_path = "Config/Palette")]
struct Palette {
    name: String,
}

#[derive(Default, Service)]
#[service(resource = preferred)]
struct Tileset {
    name: String,
}

fn resources(seen: Arc<Mutex<Vec<String>>>) -> SharedResourceLoader {
    Arc::new(move |path: &str, interface: &InterfaceId| {
        seen.lock().unwrap().push(path.to_string());
        interface.is::<Palette>().then(|| {
            Arc::new(Palette {
                name: "from resource".to_string(),
            }) as AnyArc
        })
    })
}

#[tokio::test]
async fn test_resource_policies() {
    let registry = Registry::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut loader = ServiceLoader::builder(registry.clone())
        .source(BindingCatalog::new().with::<Palette>().with::<Tileset>())
        .resources(resources(Arc::clone(&seen)))
        .build();
    loader.load_services(false).await.unwrap();

    assert_eq!(registry.get::<Palette>().unwrap().name, "from resource");
    // missing resource falls back to the default constructor
    assert_eq!(registry.get::<Tileset>().unwrap().name, "");

    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec!["Config/Palette", "Services/Tileset"]);
}

// ---- host scene ----

pub trait Light: Send + Sync {
    fn lumens(&self) -> u32;
}

struct Lamp(u32);

impl Light for Lamp {
    fn lumens(&self) -> u32 {
        self.0
    }
}

struct Transform;
struct Camera;

#[tokio::test]
async fn test_scene_objects_are_registered() {
    let lamp_impl = Implementation::of::<Lamp>()
        .host_managed()
        .implements::<dyn Light, _>(|lamp| lamp as Arc<dyn Light>)
        .build();
    let transform_impl = Implementation::of::<Transform>().build();
    let camera_impl = Implementation::of::<Camera>().build();

    let marked: AnyArc = Arc::new(Lamp(800));
    let single: AnyArc = Arc::new(Lamp(60));
    let transform: AnyArc = Arc::new(Transform);
    let camera: AnyArc = Arc::new(Camera);

    let scene = HostScene::new()
        .with_container(
            HostContainer::new("Ceiling").with_object(
                HostObject::new(&marked, Arc::clone(&lamp_impl)).marked_as(InterfaceId::of::<dyn Light>()),
            ),
        )
        .with_container(
            HostContainer::new("Desk")
                .with_object(HostObject::structural(&transform, Arc::clone(&transform_impl)))
                .with_object(HostObject::new(&single, Arc::clone(&lamp_impl))),
        )
        .with_container(
            HostContainer::new("Ambiguous")
                .with_object(HostObject::new(&transform, transform_impl))
                .with_object(HostObject::new(&camera, camera_impl)),
        );

    let registry = Registry::new();
    let mut loader = ServiceLoader::builder(registry.clone()).scene(scene).build();
    let outcome = loader.load_services(false).await.unwrap();

    assert_eq!(outcome.report().unwrap().registered(), 2);
    assert_eq!(registry.get::<dyn Light>().unwrap().lumens(), 800);
    assert_eq!(registry.get::<Lamp>().unwrap().lumens(), 60);
    assert!(registry.get::<Camera>().is_none());
    assert!(registry.get::<Transform>().is_none());
}

// ---- explicit registrations and hooks ----

#[tokio::test]
async fn test_explicit_instance_overrides_discovered_binding() {
    let registry = Registry::new();
    let mut loader = ServiceLoader::builder(registry.clone())
        .source(BindingCatalog::new().with::<FrameClock>())
        .build();
    loader
        .register_instance::<dyn Clock>(Arc::new(SystemClock))
        .unwrap();
    loader.load_services(false).await.unwrap();

    assert_eq!(registry.get::<dyn Clock>().unwrap().label(), "system");
}

#[derive(Default)]
struct Jukebox {
    inits: AtomicUsize,
    log: OnceLock<Arc<EventLog>>,
}

impl Audio for Jukebox {
    fn volume(&self) -> u32 {
        3
    }
}

impl InitService for Jukebox {
    fn init_service(&self, services: &Registry) -> Result<(), LifecycleError> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        let log = services.get::<EventLog>().ok_or_else(LifecycleError::missing::<EventLog>)?;
        log.push("jukebox");
        let _ = self.log.set(log);
        Ok(())
    }
}

impl ShutdownService for Jukebox {
    fn shutdown_service(&self) -> Result<(), LifecycleError> {
        if let Some(log) = self.log.get() {
            log.push("jukebox:shutdown");
        }
        Ok(())
    }
}

fn jukebox_impl() -> Arc<Implementation> {
    Implementation::of::<Jukebox>()
        .implements::<dyn Audio, _>(|jukebox| jukebox as Arc<dyn Audio>)
        .sync_init()
        .shutdown_hook()
        .build()
}

#[tokio::test]
async fn test_explicit_instance_runs_its_hooks() {
    let registry = Registry::new();
    let (mut loader, log) = loader_with_log(&registry, BindingCatalog::new());
    let jukebox = Arc::new(Jukebox::default());
    loader
        .register_instance_as::<dyn Audio, _>(Arc::clone(&jukebox), jukebox_impl())
        .unwrap();
    loader.load_services(false).await.unwrap();

    assert_eq!(jukebox.inits.load(Ordering::SeqCst), 1);
    assert_eq!(registry.get::<dyn Audio>().unwrap().volume(), 3);

    let report = loader.unload_services().unwrap();
    assert_eq!(report.unregistered, 2);
    assert!(report.failures.is_empty());
    assert_eq!(log.events(), vec!["jukebox", "jukebox:shutdown"]);
}

#[tokio::test]
async fn test_explicit_instance_reports_missing_dependency() {
    let registry = Registry::new();
    let mut loader = ServiceLoader::new(registry.clone());
    loader
        .register_instance_as::<dyn Audio, _>(Arc::new(Jukebox::default()), jukebox_impl())
        .unwrap();

    match loader.load_services(false).await.unwrap_err() {
        ServiceError::Initialization { interface, source } => {
            assert_eq!(interface, InterfaceId::of::<dyn Audio>());
            assert_eq!(source.missing_service(), Some(InterfaceId::of::<EventLog>()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!registry.is_ready());
}

#[tokio::test]
async fn test_service_instance_uses_its_binding() {
    let registry = Registry::new();
    let (mut loader, log) = loader_with_log(&registry, BindingCatalog::new());
    loader.register_service_instance(Arc::new(Hud::default())).unwrap();
    let outcome = loader.load_services(false).await.unwrap();

    assert_eq!(outcome.report().unwrap().init_order.last(), Some(&InterfaceId::of::<Hud>()));
    loader.unload_services().unwrap();
    assert_eq!(log.events(), vec!["hud", "hud:shutdown"]);
}

#[tokio::test]
async fn test_hook_runs_after_bindings() {
    let registry = Registry::new();
    let mut loader = ServiceLoader::builder(registry.clone())
        .source(BindingCatalog::new().with::<SystemClock>())
        .on_after_set_registrations(|loader| {
            assert!(loader.is_registered::<dyn Clock>());
            loader.register_binding(FrameClock::binding()?)?;
            Ok(())
        })
        .build();
    loader.load_services(false).await.unwrap();

    assert_eq!(registry.get::<dyn Clock>().unwrap().label(), "frame");
}

// ---- proxy groups ----

#[derive(Default, Service)]
#[service(group = 2, implements = [dyn Clock])]
struct Ticker;

impl Clock for Ticker {
    fn label(&self) -> &'static str {
        "ticker"
    }
}

#[tokio::test]
async fn test_alias_follows_target_into_later_group() {
    let registry = Registry::new();
    let mut loader = ServiceLoader::builder(registry.clone())
        .source(BindingCatalog::new().with::<Ticker>())
        .build();
    loader.register_factory_as::<dyn Clock>(Ticker::implementation(), 0).unwrap();

    let outcome = loader.load_services(false).await.unwrap();

    assert_eq!(
        outcome.report().unwrap().init_order,
        vec![InterfaceId::of::<Ticker>(), InterfaceId::of::<dyn Clock>()]
    );
    assert_eq!(registry.get::<dyn Clock>().unwrap().label(), "ticker");
    let ticker = registry.locate(&InterfaceId::of::<Ticker>()).unwrap().unwrap();
    let clock = registry.locate(&InterfaceId::of::<dyn Clock>()).unwrap().unwrap();
    assert!(ticker.ptr_eq(&clock));
}

// ---- contexts ----

#[tokio::test]
async fn test_loader_uses_configured_context() {
    let registry = Registry::new();
    let mut loader = ServiceLoader::builder(registry.clone())
        .source(BindingCatalog::new().with::<FrameClock>())
        .config(LoaderConfig {
            default_context: "Level1".to_string(),
            ..LoaderConfig::default()
        })
        .build();
    let outcome = loader.load_services(false).await.unwrap();

    assert_eq!(outcome.report().unwrap().context, "level1");
    assert_eq!(registry.active_context().name(), "level1");
    assert!(registry.get::<dyn Clock>().is_some());

    registry.set_active_context("");
    assert!(registry.get::<dyn Clock>().is_none());
    assert!(registry.context("level1").contains(&InterfaceId::of::<dyn Clock>()));
}
