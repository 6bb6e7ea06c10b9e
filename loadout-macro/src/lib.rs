use proc_macro::TokenStream;

mod injectable;
mod service;

/// Derive macro listing a struct's `Inject<T>` fields as injection points
///
/// # Example
/// ```ignore
/// use loadout::prelude::*;
///
/// #[derive(Injectable)]
/// #[injectable(events)] // forward to the struct's `InjectionEvents` impl
/// pub struct CounterDisplay {
///     counter: Inject<dyn CounterApi>,
///     label: String,
/// }
/// ```
#[proc_macro_derive(Injectable, attributes(injectable))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    injectable::derive_injectable(input)
}

/// Derive macro describing a struct as a service
///
/// Generates a `RegisterService` impl, so the type can be added to a
/// `BindingCatalog`.
///
/// # Example
/// ```ignore
/// use loadout::prelude::*;
///
/// #[derive(Default, Service)]
/// #[service(
///     interface = dyn AudioApi,
///     priority = 10,
///     group = 1,
///     resource = preferred,
///     proxies = [dyn Mixer],
///     init = async,
///     shutdown,
/// )]
/// pub struct AudioService { /* ... */ }
/// ```
///
/// | Key | Meaning |
/// |---|---|
/// | `interface = Type` | lookup interface, defaults to the struct itself |
/// | `priority = expr` | higher wins between bindings of one interface |
/// | `group = expr` | load group, lower groups load first |
/// | `resource = required \| preferred` | look for a pre-configured resource first |
/// | `resource_path = "..."` | replaces `<resource_root>/<InterfaceName>` |
/// | `proxy_policy = snake_case_name` | which declared interfaces become proxies |
/// | `proxies = [Type, ...]` | explicit proxy interfaces |
/// | `implements = [Type, ...]` | interfaces declared on the type |
/// | `inherits = [Type, ...]` | interfaces the type picks up from what it builds on |
/// | `init = sync \| async` | `InitService` or `AsyncInitService` |
/// | `shutdown` | `ShutdownService` runs on unload |
/// | `host_managed` | created by the host instantiator |
/// | `no_constructor` | never constructed here, e.g. resource or scene only |
#[proc_macro_derive(Service, attributes(service))]
pub fn derive_service(input: TokenStream) -> TokenStream {
    service::derive_service(input)
}
