use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Where a [`ServiceLoader`](super::ServiceLoader) is in its load cycle
///
/// ```text
/// Idle → RegistrationsSet → Registered → Initializing → Ready
///   ↑__________________ (load failed) ______________|
/// any → Unloaded (terminal)
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoaderState {
    #[default]
    Idle,
    RegistrationsSet,
    Registered,
    Initializing,
    Ready,
    Unloaded,
}

impl LoaderState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Unloaded)
    }
}
