use darling::ast::Data;
use darling::util::{Flag, Ignored};
use darling::{FromDeriveInput, FromField};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, GenericArgument, Ident, PathArguments, Type};

#[derive(FromDeriveInput)]
#[darling(attributes(injectable), supports(struct_named))]
struct InjectableInput {
    ident: Ident,
    generics: syn::Generics,
    data: Data<Ignored, InjectableField>,
    /// Forward injection callbacks to the struct's `InjectionEvents` impl
    #[darling(default)]
    events: Flag,
}

#[derive(FromField)]
struct InjectableField {
    ident: Option<Ident>,
    ty: Type,
}

pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let parsed = match InjectableInput::from_derive_input(&input) {
        Ok(parsed) => parsed,
        Err(err) => return err.write_errors().into(),
    };

    TokenStream::from(generate_injectable_impl(&parsed))
}

fn generate_injectable_impl(input: &InjectableInput) -> TokenStream2 {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = input
        .data
        .as_ref()
        .take_struct()
        .map(|fields| fields.fields)
        .unwrap_or_default();

    // Only `Inject<T>` members are injection points, everything else is left alone
    let points = fields.iter().filter_map(|field| {
        let field_name = field.ident.as_ref()?;
        let inner = extract_inject_type(&field.ty)?;
        Some(quote! {
            ::loadout::di::InjectionPoint::new::<#inner>(
                ::std::stringify!(#field_name),
                |target| &target.#field_name,
            )
        })
    });

    let events = input.events.is_present().then(|| {
        quote! {
            fn injection_events(&self) -> ::std::option::Option<&dyn ::loadout::lifecycle::InjectionEvents> {
                ::std::option::Option::Some(self)
            }
        }
    });

    quote! {
        impl #impl_generics ::loadout::di::Injectable for #struct_name #ty_generics #where_clause {
            fn injection_points() -> ::std::vec::Vec<::loadout::di::InjectionPoint<Self>> {
                ::std::vec![#(#points),*]
            }

            #events
        }
    }
}

/// Extract `T` from `Inject<T>`, including paths such as `loadout::Inject<dyn Trait>`
fn extract_inject_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Inject" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    })
}
