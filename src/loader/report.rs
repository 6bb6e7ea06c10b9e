use crate::di::InterfaceId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary of a completed load cycle
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    /// Context the services were registered into
    pub context: String,
    /// Interfaces in the order they were registered and initialized
    pub init_order: Vec<InterfaceId>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl LoadReport {
    pub fn registered(&self) -> usize {
        self.init_order.len()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded(LoadReport),
    /// Services were already loaded and no reload was forced
    AlreadyLoaded,
}

impl LoadOutcome {
    pub fn report(&self) -> Option<&LoadReport> {
        match self {
            Self::Loaded(report) => Some(report),
            Self::AlreadyLoaded => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnloadFailure {
    pub interface: InterfaceId,
    pub error: String,
}

/// Result of a best-effort unload
#[derive(Debug, Clone, Default, Serialize)]
pub struct UnloadReport {
    pub unregistered: usize,
    pub failures: Vec<UnloadFailure>,
}
