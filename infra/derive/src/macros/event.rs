use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::Parse;
use syn::punctuated::Punctuated;
use syn::{Data, DeriveInput, Fields, Index, Member, Token, Type};

/// A field marked `#[event(parent)]`.
struct Parent {
    member: Member,
    ty: Type,
}

pub fn expand_derive(input: DeriveInput) -> TokenStream {
    match expand(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let implements = parse_implements(input)?;
    let parents = match &input.data {
        Data::Struct(data) => parse_parents(&data.fields)?,
        Data::Enum(data) => {
            for variant in &data.variants {
                if !parse_parents(&variant.fields)?.is_empty() {
                    return Err(syn::Error::new_spanned(
                        &variant.ident,
                        "#[event(parent)] is only supported on struct fields",
                    ));
                }
            }
            Vec::new()
        },
        Data::Union(data) => {
            return Err(syn::Error::new_spanned(
                data.union_token,
                "Event cannot be derived for unions",
            ));
        },
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let supertypes = parents.iter().map(|p| &p.ty).chain(implements.iter()).map(|ty| {
        quote! { ::herald_event_bus::EventType::of::<#ty>() }
    });

    let direct_views = parents.iter().map(|Parent { member, ty }| {
        quote! {
            if ty == ::std::any::TypeId::of::<#ty>() {
                return ::std::option::Option::Some(&self.#member);
            }
        }
    });
    let nested_views = parents.iter().map(|Parent { member, .. }| {
        quote! {
            if let ::std::option::Option::Some(view) = ::herald_event_bus::Event::view(&self.#member, ty) {
                return ::std::option::Option::Some(view);
            }
        }
    });

    let view = if parents.is_empty() {
        quote! {}
    } else {
        quote! {
            fn view(&self, ty: ::std::any::TypeId) -> ::std::option::Option<&dyn ::std::any::Any> {
                #(#direct_views)*
                #(#nested_views)*
                ::std::option::Option::None
            }
        }
    };

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::herald_event_bus::EventKind for #name #ty_generics #where_clause {
            fn supertypes() -> ::std::vec::Vec<::herald_event_bus::EventType> {
                ::std::vec![#(#supertypes),*]
            }
        }

        #[automatically_derived]
        impl #impl_generics ::herald_event_bus::Event for #name #ty_generics #where_clause {
            #view
        }
    })
}

fn parse_implements(input: &DeriveInput) -> syn::Result<Vec<Type>> {
    let mut implements = Vec::new();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("event")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("implements") {
                let content;
                syn::parenthesized!(content in meta.input);
                let types: Punctuated<Type, Token![,]> =
                    content.parse_terminated(Type::parse, Token![,])?;
                implements.extend(types);
                Ok(())
            } else {
                Err(meta.error("unsupported event attribute, expected `implements(..)`"))
            }
        })?;
    }
    Ok(implements)
}

fn parse_parents(fields: &Fields) -> syn::Result<Vec<Parent>> {
    let mut parents = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        let mut is_parent = false;
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("event")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("parent") {
                    is_parent = true;
                    Ok(())
                } else {
                    Err(meta.error("unsupported field attribute, expected `parent`"))
                }
            })?;
        }
        if !is_parent {
            continue;
        }

        let member =
            field.ident.clone().map_or_else(|| Member::Unnamed(Index::from(index)), Member::Named);
        parents.push(Parent { member, ty: field.ty.clone() });
    }
    Ok(parents)
}
