//! `#[orm(...)]` attribute parsing for the Entity derive.

use syn::{Attribute, Result};

/// Struct-level attributes.
#[derive(Default)]
pub(super) struct StructAttrs {
    pub table: Option<String>,
}

/// Field-level attributes.
#[derive(Default)]
pub(super) struct FieldAttrs {
    pub column: Option<String>,
    pub skip: bool,
}

enum Item {
    Table(String),
    Column(String),
    Skip,
}

struct ItemList(Vec<(syn::Ident, Item)>);

impl syn::parse::Parse for ItemList {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut items = Vec::new();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            let item = match ident.to_string().as_str() {
                "skip" => Item::Skip,
                key @ ("table" | "column") => {
                    let _: syn::Token![=] = input.parse()?;
                    let value: syn::LitStr = input.parse()?;
                    if value.value().is_empty() {
                        return Err(syn::Error::new_spanned(value, "name must not be empty"));
                    }
                    if key == "table" {
                        Item::Table(value.value())
                    } else {
                        Item::Column(value.value())
                    }
                }
                other => {
                    return Err(syn::Error::new_spanned(
                        &ident,
                        format!("unknown orm attribute `{other}`"),
                    ));
                }
            };
            items.push((ident, item));

            if input.is_empty() {
                break;
            }
            let _: syn::Token![,] = input.parse()?;
        }

        Ok(Self(items))
    }
}

fn orm_items(attrs: &[Attribute]) -> Result<Vec<(syn::Ident, Item)>> {
    let mut items = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("orm")) {
        let ItemList(parsed) = attr.parse_args()?;
        items.extend(parsed);
    }
    Ok(items)
}

pub(super) fn struct_attrs(attrs: &[Attribute]) -> Result<StructAttrs> {
    let mut out = StructAttrs::default();
    for (ident, item) in orm_items(attrs)? {
        match item {
            Item::Table(table) => out.table = Some(table),
            _ => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "only `table` is allowed on the struct",
                ));
            }
        }
    }
    Ok(out)
}

pub(super) fn field_attrs(attrs: &[Attribute]) -> Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for (ident, item) in orm_items(attrs)? {
        match item {
            Item::Column(column) => out.column = Some(column),
            Item::Skip => out.skip = true,
            Item::Table(_) => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "`table` belongs on the struct, not a field",
                ));
            }
        }
    }
    Ok(out)
}
