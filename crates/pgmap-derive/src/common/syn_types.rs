//! Type helper utilities for syn type analysis.

/// The single generic argument of a `Wrapper<T>` path type named `wrapper`.
fn single_arg<'a>(ty: &'a syn::Type, wrapper: &str) -> Option<&'a syn::Type> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    let seg = type_path.path.segments.last()?;
    if seg.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    let syn::GenericArgument::Type(inner) = args.args.first()? else {
        return None;
    };
    Some(inner)
}

/// Extract `T` from `Option<T>` (any path prefix).
pub fn option_inner(ty: &syn::Type) -> Option<&syn::Type> {
    single_arg(ty, "Option")
}

/// Extract `T` from `Vec<T>` (any path prefix).
pub fn vec_inner(ty: &syn::Type) -> Option<&syn::Type> {
    single_arg(ty, "Vec")
}

fn is_u8(ty: &syn::Type) -> bool {
    matches!(ty, syn::Type::Path(p) if p.qself.is_none() && p.path.is_ident("u8"))
}

/// Whether `ty` is (optionally) a collection other than `Vec<u8>`.
///
/// Collection-valued members have no single-column representation.
pub fn is_collection(ty: &syn::Type) -> bool {
    let ty = option_inner(ty).unwrap_or(ty);
    match ty {
        syn::Type::Array(_) | syn::Type::Slice(_) => true,
        _ => vec_inner(ty).is_some_and(|inner| !is_u8(inner)),
    }
}
