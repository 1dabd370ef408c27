//! `#[derive(ResponseModel)]`.
//!
//! # Struct-level attributes `#[model(...)]`
//!
//! | Key | Example | Description |
//! |-----|---------|-------------|
//! | `title` | `"Pong"` | Schema title (default: the struct name) |
//! | `extra` | `"allow"` | Unknown key policy: `allow`, `ignore` (default) or `forbid` |
//!
//! A container `#[serde(rename_all = "...")]` renames the schema keys the
//! same way serde renames the serialized ones.
//!
//! # Field-level attributes
//!
//! | Attribute | Description |
//! |-----------|-------------|
//! | `#[model(default = expr)]` | Field default; `expr` must convert into `serde_json::Value` |
//! | `#[serde(rename = "...")]` | Field name in the schema |
//! | `#[serde(skip)]`, `#[serde(skip_serializing)]` | Field left out of the schema |

use std::collections::HashSet;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Expr, Fields, LitStr, ext::IdentExt, spanned::Spanned};

// ============================================================================
// Attribute structures
// ============================================================================

struct ModelAttrs {
    title: String,
    extra: syn::Ident,
    rename_all: Option<RenameRule>,
}

/// The `rename_all` rules serde accepts, applied to snake_case field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(lit: &LitStr) -> syn::Result<Self> {
        Ok(match lit.value().as_str() {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            _ => return Err(syn::Error::new(lit.span(), "unknown rename_all rule")),
        })
    }

    fn apply(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Pascal => {
                let mut out = String::with_capacity(field.len());
                let mut capitalize = true;
                for ch in field.chars() {
                    if ch == '_' {
                        capitalize = true;
                    } else if capitalize {
                        out.push(ch.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        out.push(ch);
                    }
                }
                out
            }
            Self::Camel => {
                let pascal = Self::Pascal.apply(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => Self::ScreamingSnake.apply(field).replace('_', "-"),
        }
    }
}

#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    skip: bool,
    default: Option<Expr>,
}

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_response_model(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "ResponseModel cannot be derived for generic types",
        ));
    }

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "ResponseModel can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new(
            data.fields.span(),
            "ResponseModel requires named fields",
        ));
    };

    let attrs = parse_model_attrs(&input.attrs, &name.to_string())?;
    let mut seen = HashSet::new();
    let mut fields = Vec::new();

    for field in &named.named {
        let field_attrs = parse_field_attrs(&field.attrs)?;
        if field_attrs.skip {
            continue;
        }
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;
        let key = field_attrs.rename.unwrap_or_else(|| {
            let name = ident.unraw().to_string();
            match attrs.rename_all {
                Some(rule) => rule.apply(&name),
                None => name,
            }
        });
        if !seen.insert(key.clone()) {
            return Err(syn::Error::new(
                field.span(),
                format!("duplicate field `{key}` in response model"),
            ));
        }

        let ty = &field.ty;
        let default = field_attrs
            .default
            .map(|expr| quote!(.with_default(#expr)));
        fields.push(quote! {
            .with_field(::wsevent::core::Field::of::<#ty>(#key) #default)
        });
    }

    let title = &attrs.title;
    let extra = &attrs.extra;

    Ok(quote! {
        impl ::wsevent::framework::ResponseModel for #name {
            fn schema() -> ::wsevent::core::ObjectSchema {
                ::wsevent::core::ObjectSchema::new(#title)
                    .extra(::wsevent::core::ExtraPolicy::#extra)
                    #(#fields)*
            }
        }

        impl ::wsevent::core::SchemaType for #name {
            fn field_type() -> ::wsevent::core::FieldType {
                <Self as ::wsevent::framework::ResponseModel>::schema().into_field_type()
            }
        }

        impl ::wsevent::framework::IntoReply for #name {
            fn into_reply(
                self,
            ) -> ::wsevent::framework::HandlerResult<::wsevent::framework::Reply> {
                ::wsevent::framework::IntoReply::into_reply(::wsevent::framework::Model(self))
            }
        }
    })
}

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_model_attrs(attrs: &[Attribute], default_title: &str) -> syn::Result<ModelAttrs> {
    let mut title = None;
    let mut extra = None;
    let mut rename_all = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                if meta.input.peek(syn::Token![=]) {
                    rename_all = Some(RenameRule::parse(&meta.value()?.parse::<LitStr>()?)?);
                } else {
                    meta.parse_nested_meta(|inner| {
                        let value = inner.value()?.parse::<LitStr>()?;
                        if inner.path.is_ident("serialize") {
                            rename_all = Some(RenameRule::parse(&value)?);
                        }
                        Ok(())
                    })?;
                }
            } else if meta.input.peek(syn::Token![=]) {
                meta.value()?.parse::<Expr>()?;
            } else if meta.input.peek(syn::token::Paren) {
                meta.parse_nested_meta(|inner| {
                    if inner.input.peek(syn::Token![=]) {
                        inner.value()?.parse::<Expr>()?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })?;
    }

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("title") {
                title = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("extra") {
                let lit = meta.value()?.parse::<LitStr>()?;
                let variant = match lit.value().as_str() {
                    "allow" => "Allow",
                    "ignore" => "Ignore",
                    "forbid" => "Forbid",
                    _ => {
                        return Err(syn::Error::new(
                            lit.span(),
                            "expected \"allow\", \"ignore\" or \"forbid\"",
                        ));
                    }
                };
                extra = Some(format_ident!("{}", variant));
            } else {
                return Err(meta.error("unknown model argument; expected title or extra"));
            }
            Ok(())
        })?;
    }

    Ok(ModelAttrs {
        title: title.unwrap_or_else(|| default_title.to_string()),
        extra: extra.unwrap_or_else(|| format_ident!("Ignore")),
        rename_all,
    })
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("model") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("default") {
                    out.default = Some(meta.value()?.parse::<Expr>()?);
                    Ok(())
                } else {
                    Err(meta.error("unknown model field argument; expected default"))
                }
            })?;
        } else if attr.path().is_ident("serde") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    if meta.input.peek(syn::Token![=]) {
                        out.rename = Some(meta.value()?.parse::<LitStr>()?.value());
                    } else {
                        meta.parse_nested_meta(|inner| {
                            let value = inner.value()?.parse::<LitStr>()?;
                            if inner.path.is_ident("serialize") {
                                out.rename = Some(value.value());
                            }
                            Ok(())
                        })?;
                    }
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                    out.skip = true;
                } else if meta.input.peek(syn::Token![=]) {
                    meta.value()?.parse::<Expr>()?;
                } else if meta.input.peek(syn::token::Paren) {
                    meta.parse_nested_meta(|inner| {
                        if inner.input.peek(syn::Token![=]) {
                            inner.value()?.parse::<Expr>()?;
                        }
                        Ok(())
                    })?;
                }
                Ok(())
            })?;
        }
    }

    Ok(out)
}
