use super::{Binding, Implementation};
use crate::error::Result;
use std::fmt;
use std::sync::Arc;

/// Supplies the discovered bindings, once per load cycle
pub trait BindingSource: Send + Sync {
    fn bindings(&self) -> Result<Vec<Binding>>;
}

impl<F> BindingSource for F
where
    F: Fn() -> Result<Vec<Binding>> + Send + Sync,
{
    fn bindings(&self) -> Result<Vec<Binding>> {
        self()
    }
}

/// A type that describes how it is provided as a service
///
/// This trait is typically implemented via `#[derive(Service)]`.
///
/// # Example
/// ```rust,ignore
/// #[derive(Default, Service)]
/// #[service(interface = dyn AudioApi, priority = 10, init = sync)]
/// pub struct AudioService { /* ... */ }
/// ```
pub trait RegisterService: Send + Sync + 'static {
    fn implementation() -> Arc<Implementation>
    where
        Self: Sized;

    fn binding() -> Result<Binding>
    where
        Self: Sized;
}

#[derive(Clone)]
enum CatalogEntry {
    Service(fn() -> Result<Binding>),
    Binding(Binding),
}

/// An ordered list of service types and hand-built bindings
///
/// # Example
/// ```rust,ignore
/// let catalog = BindingCatalog::new()
///     .with::<AudioService>()
///     .with::<ScoreBoard>()
///     .with_binding(Binding::of::<dyn Clock>(clock).build()?);
/// ```
#[derive(Clone, Default)]
pub struct BindingCatalog {
    entries: Vec<CatalogEntry>,
}

impl BindingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: RegisterService>(mut self) -> Self {
        self.add::<S>();
        self
    }

    pub fn add<S: RegisterService>(&mut self) -> &mut Self {
        self.entries.push(CatalogEntry::Service(S::binding));
        self
    }

    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.entries.push(CatalogEntry::Binding(binding));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BindingSource for BindingCatalog {
    fn bindings(&self) -> Result<Vec<Binding>> {
        self.entries
            .iter()
            .map(|entry| match entry {
                CatalogEntry::Service(binding) => binding(),
                CatalogEntry::Binding(binding) => Ok(binding.clone()),
            })
            .collect()
    }
}

impl fmt::Debug for BindingCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingCatalog")
            .field("entries", &self.entries.len())
            .finish()
    }
}
