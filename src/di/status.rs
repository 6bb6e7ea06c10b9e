use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use uuid::Uuid;

/// Readiness of a [`Registry`](crate::di::Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct InitStatus {
    /// Services finished initializing
    pub ready: bool,
    /// A load cycle is running
    pub in_progress: bool,
}

impl InitStatus {
    pub const IDLE: Self = Self {
        ready: false,
        in_progress: false,
    };
    pub const LOADING: Self = Self {
        ready: false,
        in_progress: true,
    };
    pub const READY: Self = Self {
        ready: true,
        in_progress: false,
    };
}

pub type StatusObserver = Arc<dyn Fn(InitStatus) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

/// Observer list plus a watch channel for async waiters.
///
/// Observers run synchronously, on the thread that changed the status, with
/// no internal lock held, so they may call back into the registry.
pub(crate) struct StatusBroadcast {
    current: Mutex<InitStatus>,
    observers: Mutex<Vec<(SubscriptionId, StatusObserver)>>,
    sender: watch::Sender<InitStatus>,
}

impl StatusBroadcast {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(InitStatus::IDLE);
        Self {
            current: Mutex::new(InitStatus::IDLE),
            observers: Mutex::new(Vec::new()),
            sender,
        }
    }

    pub fn current(&self) -> InitStatus {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, observer: StatusObserver) -> SubscriptionId {
        let id = SubscriptionId(Uuid::new_v4());
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn watch(&self) -> watch::Receiver<InitStatus> {
        self.sender.subscribe()
    }

    /// Returns false (and notifies nobody) when the status did not change.
    pub fn set(&self, status: InitStatus) -> bool {
        {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            if *current == status {
                return false;
            }
            *current = status;
        }

        tracing::debug!(
            ready = status.ready,
            in_progress = status.in_progress,
            "Service status changed"
        );
        self.sender.send_replace(status);

        let observers: Vec<StatusObserver> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(status);
        }
        true
    }
}
