//! Entity derive macro implementation

use crate::common::syn_types::is_collection;
use heck::{ToShoutySnakeCase, ToSnakeCase};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use std::collections::HashMap;
use syn::{Data, DeriveInput, Fields, Result};

mod attrs;

struct MemberField<'a> {
    ident: &'a syn::Ident,
    name: String,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let struct_attrs = attrs::struct_attrs(&input.attrs)?;
    let table = struct_attrs
        .table
        .unwrap_or_else(|| name.to_string().to_snake_case());

    let mut members = Vec::new();
    let mut seen: HashMap<String, &syn::Ident> = HashMap::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let field_attrs = attrs::field_attrs(&field.attrs)?;
        if field_attrs.skip {
            continue;
        }
        if is_collection(&field.ty) {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "collection-valued members are not supported; add #[orm(skip)]",
            ));
        }

        let member_name = field_attrs
            .column
            .unwrap_or_else(|| ident.to_string().trim_start_matches("r#").to_string());
        if let Some(previous) = seen.insert(member_name.to_lowercase(), ident) {
            return Err(syn::Error::new_spanned(
                ident,
                format!("member name `{member_name}` collides with field `{previous}`"),
            ));
        }
        members.push(MemberField {
            ident,
            name: member_name,
        });
    }

    let member_entries = members.iter().map(|m| {
        let ident = m.ident;
        let member_name = &m.name;
        quote! {
            ::pgmap::Member::new(
                #member_name,
                |this: &#name| ::pgmap::ToValue::to_value(&this.#ident),
                |this: &mut #name, value: ::pgmap::Value| -> ::core::result::Result<(), ::pgmap::ConvertError> {
                    this.#ident = ::pgmap::FromValue::from_value(value)?;
                    ::core::result::Result::Ok(())
                },
            )
        }
    });

    let col_consts = members.iter().map(|m| {
        let const_name = format_ident!(
            "COL_{}",
            m.ident.to_string().trim_start_matches("r#").to_shouty_snake_case()
        );
        let member_name = &m.name;
        quote! {
            pub const #const_name: &'static str = #member_name;
        }
    });

    Ok(quote! {
        impl #name {
            #(#col_consts)*
        }

        impl ::pgmap::Entity for #name {
            const TABLE: &'static str = #table;

            const MEMBERS: &'static [::pgmap::Member<Self>] = &[
                #(#member_entries),*
            ];

            fn metadata() -> &'static ::pgmap::TypeMetadata<Self> {
                static METADATA: ::std::sync::OnceLock<::pgmap::TypeMetadata<#name>> =
                    ::std::sync::OnceLock::new();
                METADATA.get_or_init(|| {
                    ::pgmap::TypeMetadata::new(
                        <#name as ::pgmap::Entity>::MEMBERS,
                        <#name as ::core::default::Default>::default,
                    )
                })
            }
        }

        impl ::pgmap::FromRow for #name {
            fn mapping() -> ::pgmap::Mapping<Self> {
                ::pgmap::Mapping::Structured(<Self as ::pgmap::Entity>::metadata())
            }
        }
    })
}
