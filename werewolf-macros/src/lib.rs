//! Proc macros for werewolf decision tools.
//!
//! Provides `#[derive(Decision)]`, which turns a documented struct into the
//! JSON schema a player agent fills in when the moderator asks for a
//! structured decision.
//!
//! # Example
//!
//! ```ignore
//! /// Vote for the player you want to eliminate
//! #[derive(Decision, Deserialize)]
//! #[decision(name = "vote")]
//! struct Vote {
//!     /// Name of the player to vote for
//!     target: Option<String>,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, DeriveInput, Expr, Field, Lit, LitStr, Meta, Type};

/// Derive macro implementing `werewolf_core::decision::DecisionSchema`.
///
/// # Attributes
///
/// - `#[decision(name = "...")]` - Override the tool name (defaults to snake_case struct name)
/// - `#[decision(optional)]` on fields - Leave the field out of `required`
/// - `#[decision(rename = "...")]` on fields - Override the property name
#[proc_macro_derive(Decision, attributes(decision))]
pub fn derive_decision(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_decision(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Options read from `#[decision(...)]` on a field.
#[derive(Default)]
struct FieldOptions {
    rename: Option<String>,
    optional: bool,
}

fn expand_decision(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let tool_name = decision_name(&input)?;
    let description = doc_comment(&input.attrs);

    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Decision derive only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Decision derive only supports structs",
            ))
        }
    };

    let mut properties = Vec::new();
    let mut required = Vec::new();

    for field in fields {
        let options = field_options(field)?;
        let property_name = match options.rename {
            Some(name) => name,
            None => field_ident(field)?,
        };
        let schema = type_schema(&field.ty);
        let field_doc = doc_comment(&field.attrs);

        let describe = if field_doc.is_empty() {
            quote! {}
        } else {
            quote! { property["description"] = ::serde_json::json!(#field_doc); }
        };

        properties.push(quote! {
            {
                let mut property = #schema;
                #describe
                properties.insert(#property_name.to_string(), property);
            }
        });

        if !options.optional && !is_option(&field.ty) {
            required.push(property_name);
        }
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::werewolf_core::decision::DecisionSchema for #struct_name #ty_generics #where_clause {
            fn tool_name() -> &'static str {
                #tool_name
            }

            fn tool_description() -> &'static str {
                #description
            }

            fn input_schema() -> ::serde_json::Value {
                let mut properties = ::serde_json::Map::new();
                #(#properties)*

                let required: ::std::vec::Vec<&str> = ::std::vec![#(#required),*];

                ::serde_json::json!({
                    "type": "object",
                    "properties": properties,
                    "required": required
                })
            }
        }
    })
}

fn decision_name(input: &DeriveInput) -> syn::Result<String> {
    let mut name = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("decision")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        })?;
    }
    Ok(name.unwrap_or_else(|| snake_case(&input.ident.to_string())))
}

fn field_options(field: &Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("decision")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("optional") {
                options.optional = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                options.rename = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `optional` or `rename = \"...\"`"))
            }
        })?;
    }
    Ok(options)
}

fn field_ident(field: &Field) -> syn::Result<String> {
    field
        .ident
        .as_ref()
        .map(|ident| ident.to_string())
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))
}

fn doc_comment(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(expr) => match &expr.lit {
                    Lit::Str(s) => Some(s.value().trim().to_string()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_option(ty: &Type) -> bool {
    matches!(last_segment(ty), Some(segment) if segment.ident == "Option")
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last(),
        _ => None,
    }
}

fn first_type_argument(segment: &syn::PathSegment) -> Option<&Type> {
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            syn::GenericArgument::Type(inner) => Some(inner),
            _ => None,
        }),
        _ => None,
    }
}

fn type_schema(ty: &Type) -> TokenStream2 {
    let Some(segment) = last_segment(ty) else {
        return quote! { ::serde_json::json!({}) };
    };

    match segment.ident.to_string().as_str() {
        "String" | "str" => quote! { ::serde_json::json!({"type": "string"}) },
        "bool" => quote! { ::serde_json::json!({"type": "boolean"}) },
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            quote! { ::serde_json::json!({"type": "integer"}) }
        }
        "f32" | "f64" => quote! { ::serde_json::json!({"type": "number"}) },
        "Option" => match first_type_argument(segment) {
            Some(inner) => type_schema(inner),
            None => quote! { ::serde_json::json!({}) },
        },
        "Vec" => match first_type_argument(segment) {
            Some(inner) => {
                let items = type_schema(inner);
                quote! { ::serde_json::json!({"type": "array", "items": #items}) }
            }
            None => quote! { ::serde_json::json!({"type": "array"}) },
        },
        _ => quote! { ::serde_json::json!({"type": "object"}) },
    }
}

fn snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
