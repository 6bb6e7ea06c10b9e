use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote, ToTokens};
use syn::{
    parse::Parse, parse::ParseStream, parse_macro_input, DeriveInput, Expr, Ident, LitStr, Token,
    Type,
};

const PROXY_POLICIES: &[&str] = &[
    "declared_on_type_if_no_explicit_proxies",
    "declared_on_type",
    "declared_on_type_and_ancestors",
    "explicit_list_only",
];

enum InitKind {
    Sync,
    Async,
}

#[derive(Default)]
struct ServiceArgs {
    interface: Option<Type>,
    priority: Option<Expr>,
    group: Option<Expr>,
    resource: Option<Ident>,
    resource_path: Option<LitStr>,
    proxy_policy: Option<Ident>,
    proxies: Vec<Type>,
    implements: Vec<Type>,
    inherits: Vec<Type>,
    init: Option<InitKind>,
    shutdown: bool,
    host_managed: bool,
    no_constructor: bool,
}

fn parse_type_list(input: ParseStream) -> syn::Result<Vec<Type>> {
    // Parse array: [Type1, Type2, ...]
    let content;
    syn::bracketed!(content in input);
    let items = content.parse_terminated(Type::parse, Token![,])?;
    Ok(items.into_iter().collect())
}

impl Parse for ServiceArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = ServiceArgs::default();

        while !input.is_empty() {
            let name: Ident = input.parse()?;
            let key = name.to_string();

            match key.as_str() {
                "shutdown" => args.shutdown = true,
                "host_managed" => args.host_managed = true,
                "no_constructor" => args.no_constructor = true,
                _ => {
                    input.parse::<Token![=]>()?;
                    match key.as_str() {
                        "interface" => args.interface = Some(input.parse()?),
                        "priority" => args.priority = Some(input.parse()?),
                        "group" => args.group = Some(input.parse()?),
                        "resource" => {
                            let policy: Ident = input.parse()?;
                            if policy != "required" && policy != "preferred" && policy != "none" {
                                return Err(syn::Error::new(
                                    policy.span(),
                                    "expected `required`, `preferred` or `none`",
                                ));
                            }
                            args.resource = Some(policy);
                        }
                        "resource_path" => args.resource_path = Some(input.parse()?),
                        "proxy_policy" => {
                            let policy: Ident = input.parse()?;
                            if !PROXY_POLICIES.contains(&policy.to_string().as_str()) {
                                return Err(syn::Error::new(
                                    policy.span(),
                                    format!("unknown proxy policy, expected one of: {}", PROXY_POLICIES.join(", ")),
                                ));
                            }
                            args.proxy_policy = Some(policy);
                        }
                        "proxies" => args.proxies = parse_type_list(input)?,
                        "implements" => args.implements = parse_type_list(input)?,
                        "inherits" => args.inherits = parse_type_list(input)?,
                        "init" => {
                            // `async` is a keyword, not an identifier
                            if input.peek(Token![async]) {
                                input.parse::<Token![async]>()?;
                                args.init = Some(InitKind::Async);
                            } else {
                                let kind: Ident = input.parse()?;
                                if kind != "sync" {
                                    return Err(syn::Error::new(kind.span(), "expected `sync` or `async`"));
                                }
                                args.init = Some(InitKind::Sync);
                            }
                        }
                        _ => {
                            return Err(syn::Error::new(
                                name.span(),
                                format!("unknown service option `{}`", key),
                            ))
                        }
                    }
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        if args.host_managed && args.no_constructor {
            return Err(syn::Error::new(
                Span::call_site(),
                "`host_managed` and `no_constructor` are mutually exclusive",
            ));
        }

        Ok(args)
    }
}

pub fn derive_service(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let expanded = match service_args(&input) {
        Ok(args) => generate_service_impl(&args, &input),
        Err(err) => err.to_compile_error(),
    };
    TokenStream::from(expanded)
}

fn service_args(input: &DeriveInput) -> syn::Result<ServiceArgs> {
    let mut attrs = input.attrs.iter().filter(|attr| attr.path().is_ident("service"));
    let args = match attrs.next() {
        Some(attr) => attr.parse_args::<ServiceArgs>()?,
        None => ServiceArgs::default(),
    };
    if let Some(extra) = attrs.next() {
        return Err(syn::Error::new_spanned(extra, "only one #[service(...)] attribute is allowed"));
    }
    Ok(args)
}

/// Keeps the first occurrence of each type, compared by tokens
fn dedupe<'a>(types: impl IntoIterator<Item = &'a Type>, seen: &mut Vec<String>) -> Vec<&'a Type> {
    types
        .into_iter()
        .filter(|ty| {
            let key = ty.to_token_stream().to_string();
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        })
        .collect()
}

fn caster(method: &str, ty: &Type) -> TokenStream2 {
    let method = format_ident!("{}", method);
    quote! {
        .#method::<#ty, _>(|service: ::std::sync::Arc<Self>| service as ::std::sync::Arc<#ty>)
    }
}

fn pascal_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn generate_service_impl(args: &ServiceArgs, input: &DeriveInput) -> TokenStream2 {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let constructor = if args.host_managed {
        quote!(.host_managed())
    } else if args.no_constructor {
        quote!()
    } else {
        quote!(.default_constructible())
    };

    // The lookup interface is declared on the type alongside `implements`
    let mut seen = Vec::new();
    let declared = dedupe(args.interface.iter().chain(args.implements.iter()), &mut seen);
    let inherited = dedupe(args.inherits.iter(), &mut seen);
    let castable = dedupe(args.proxies.iter(), &mut seen);

    let casts = declared
        .iter()
        .map(|ty| caster("implements", ty))
        .chain(inherited.iter().map(|ty| caster("inherits", ty)))
        .chain(castable.iter().map(|ty| caster("castable_as", ty)));

    let init = match args.init {
        Some(InitKind::Sync) => quote!(.sync_init()),
        Some(InitKind::Async) => quote!(.async_init()),
        None => quote!(),
    };
    let shutdown = args.shutdown.then(|| quote!(.shutdown_hook()));

    let binding_start = match &args.interface {
        Some(interface) => quote! {
            ::loadout::binding::Binding::of::<#interface>(Self::implementation())
        },
        None => quote! {
            ::loadout::binding::Binding::concrete(Self::implementation())
        },
    };
    let priority = args.priority.as_ref().map(|expr| quote!(.priority(#expr)));
    let group = args.group.as_ref().map(|expr| quote!(.group(#expr)));
    let resource = args.resource.as_ref().map(|policy| {
        let variant = format_ident!("{}", pascal_case(&policy.to_string()));
        quote!(.resource(::loadout::binding::ResourcePolicy::#variant))
    });
    let resource_path = args.resource_path.as_ref().map(|path| quote!(.resource_path(#path)));
    let proxy_policy = args.proxy_policy.as_ref().map(|policy| {
        let variant = format_ident!("{}", pascal_case(&policy.to_string()));
        quote!(.proxy_policy(::loadout::binding::ProxyPolicy::#variant))
    });
    let proxies = (!args.proxies.is_empty()).then(|| {
        let proxies = &args.proxies;
        quote! {
            .proxies([#(::loadout::di::InterfaceId::of::<#proxies>()),*])
        }
    });

    quote! {
        impl #impl_generics ::loadout::binding::RegisterService for #struct_name #ty_generics #where_clause {
            fn implementation() -> ::std::sync::Arc<::loadout::binding::Implementation> {
                ::loadout::binding::Implementation::of::<Self>()
                    #constructor
                    #(#casts)*
                    #init
                    #shutdown
                    .build()
            }

            fn binding() -> ::loadout::Result<::loadout::binding::Binding> {
                #binding_start
                    #priority
                    #group
                    #resource
                    #resource_path
                    #proxy_policy
                    #proxies
                    .build()
            }
        }
    }
}
