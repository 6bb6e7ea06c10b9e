use loadout::prelude::*;
use std::sync::Mutex;

pub trait Counter: Send + Sync {
    fn count(&self) -> u32;
}

#[derive(Default, Service)]
#[service(interface = dyn Counter, implements = [dyn Labelled])]
struct ClickCounter;

impl Counter for ClickCounter {
    fn count(&self) -> u32 {
        3
    }
}

pub trait Labelled: Send + Sync {
    fn label(&self) -> String;
}

impl Labelled for ClickCounter {
    fn label(&self) -> String {
        "clicks".to_string()
    }
}

struct Preset;

impl Counter for Preset {
    fn count(&self) -> u32 {
        99
    }
}

#[derive(Default, Injectable)]
#[injectable(events)]
struct CounterDisplay {
    counter: Inject<dyn Counter>,
    label: Inject<dyn Labelled>,
    title: String,
    events: Mutex<Vec<&'static str>>,
}

impl InjectionEvents for CounterDisplay {
    fn on_waiting_for_services(&self) {
        self.events.lock().unwrap().push("waiting");
    }

    fn on_will_inject(&self) {
        self.events.lock().unwrap().push("will");
    }

    fn on_did_inject(&self) {
        self.events.lock().unwrap().push("did");
    }
}

#[derive(Default, Injectable)]
struct Tooltip {
    counter: loadout::Inject<dyn Counter>,
}

fn loader(registry: &Registry) -> ServiceLoader {
    ServiceLoader::builder(registry.clone())
        .source(BindingCatalog::new().with::<ClickCounter>())
        .build()
}

#[test]
fn test_derived_injection_points() {
    let points = CounterDisplay::injection_points();
    let members: Vec<_> = points.iter().map(|point| point.member()).collect();
    assert_eq!(members, vec!["counter", "label"]);
    assert_eq!(points[0].interface(), InterfaceId::of::<dyn Counter>());

    let display = CounterDisplay::default();
    assert!(display.injection_events().is_some());
    assert!(Tooltip::default().injection_events().is_none());
    assert!(display.title.is_empty());
}

#[tokio::test]
async fn test_deferred_injection_completes_on_ready() {
    let registry = Registry::new();
    let injector = DependencyInjector::new(registry.clone());

    let display = Arc::new(CounterDisplay::default());
    assert_eq!(injector.inject_dependencies(&display), InjectionOutcome::Deferred);
    assert_eq!(injector.pending_count(), 1);
    assert!(!display.counter.is_set());

    loader(&registry).load_services(false).await.unwrap();

    assert_eq!(injector.pending_count(), 0);
    assert_eq!(display.counter.get().unwrap().count(), 3);
    assert_eq!(display.label.get().unwrap().label(), "clicks");
    assert_eq!(*display.events.lock().unwrap(), vec!["waiting", "will", "did"]);
}

#[tokio::test]
async fn test_preset_member_is_not_overwritten() {
    let registry = Registry::new();
    let injector = DependencyInjector::new(registry.clone());
    let mut loader = loader(&registry);
    loader.load_services(false).await.unwrap();

    let tooltip = Arc::new(Tooltip {
        counter: Inject::with(Arc::new(Preset) as Arc<dyn Counter>),
    });
    let outcome = injector.inject_dependencies(&tooltip);

    assert_eq!(
        outcome,
        InjectionOutcome::Injected { injected: 0, skipped: 1, missing: vec![] }
    );
    assert_eq!(tooltip.counter.get().unwrap().count(), 99);
}

#[tokio::test]
async fn test_dropped_target_is_skipped() {
    let registry = Registry::new();
    let injector = DependencyInjector::new(registry.clone());

    let tooltip = Arc::new(Tooltip::default());
    injector.inject_dependencies(&tooltip);
    let survivor = Arc::new(Tooltip::default());
    injector.inject_dependencies(&survivor);
    drop(tooltip);

    loader(&registry).load_services(false).await.unwrap();

    assert_eq!(injector.pending_count(), 0);
    assert!(survivor.counter.is_set());
}

#[tokio::test]
async fn test_unregistered_member_is_reported_missing() {
    let registry = Registry::new();
    let injector = DependencyInjector::new(registry.clone());
    ServiceLoader::new(registry.clone())
        .load_services(false)
        .await
        .unwrap();

    let tooltip = Arc::new(Tooltip::default());
    assert_eq!(
        injector.inject_dependencies(&tooltip),
        InjectionOutcome::Injected { injected: 0, skipped: 0, missing: vec!["counter"] }
    );
}
