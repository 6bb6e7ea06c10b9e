//! Service lifecycle hooks
//!
//! Services take part in loading and unloading through a small set of
//! traits. The order in which the hooks run is owned by the
//! [`ServiceLoader`](crate::loader::ServiceLoader).
//!
//! # Lifecycle Phases
//!
//! ```text
//! 1. Bindings resolved into registrations
//!    ↓
//! 2. Every registration instantiated and registered (sorted order)
//!    ↓
//! 3. InitService / AsyncInitService (same sorted order, one at a time)
//!    ↓
//! 4. Ready broadcast → deferred injections complete
//!    ↓
//! [Running...]
//!    ↓
//! 5. Shutdown Signal (SIGTERM/SIGINT) or explicit unload
//!    ↓
//! 6. ShutdownService (reverse order, best effort)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use loadout::lifecycle::{InitService, ShutdownService, LifecycleError};
//!
//! #[derive(Default)]
//! pub struct ScoreBoard { /* ... */ }
//!
//! impl InitService for ScoreBoard {
//!     fn init_service(&self, services: &Registry) -> Result<(), LifecycleError> {
//!         tracing::info!("Loading high scores");
//!         Ok(())
//!     }
//! }
//!
//! impl ShutdownService for ScoreBoard {
//!     fn shutdown_service(&self) -> Result<(), LifecycleError> {
//!         tracing::info!("Flushing high scores");
//!         Ok(())
//!     }
//! }
//! ```

mod capability;
mod error;
mod shutdown;
mod traits;

pub use capability::{InitCapability, InitFuture, Initializer, ShutdownHook};
pub use error::LifecycleError;
pub use shutdown::{ShutdownHandler, shutdown_signal};
pub use traits::{AsyncInitService, InitService, InjectionEvents, ShutdownService};
