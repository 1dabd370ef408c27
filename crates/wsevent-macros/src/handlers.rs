//! `#[handlers]` on impl blocks.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    ImplItem, ItemImpl,
    parse::{Parse, ParseStream},
    spanned::Spanned,
};

use crate::event::{EventArgs, HandlerSig, handler_expr, is_event_attr};

const PREFIXES: [&str; 2] = ["on_", "handle_"];

/// Parsed `#[handlers(...)]` arguments.
#[derive(Default)]
pub struct HandlersArgs {
    /// Also register unmarked methods named `on_*` / `handle_*`.
    prefixed: bool,
}

impl Parse for HandlersArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = HandlersArgs::default();
        if input.is_empty() {
            return Ok(args);
        }
        let key: syn::Ident = input.parse()?;
        if key != "prefixed" {
            return Err(syn::Error::new(
                key.span(),
                "unknown handlers argument; expected `prefixed`",
            ));
        }
        args.prefixed = true;
        Ok(args)
    }
}

pub fn expand_handlers(options: HandlersArgs, mut item: ItemImpl) -> syn::Result<TokenStream> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new(
            path.span(),
            "#[handlers] goes on an inherent impl block",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new(
            item.generics.span(),
            "#[handlers] does not support generic endpoint types",
        ));
    }

    let self_ty = (*item.self_ty).clone();
    let endpoint = quote!(Self);
    let mut members = Vec::new();

    for impl_item in &mut item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };

        let mut markers = Vec::new();
        method.attrs.retain(|attr| {
            if is_event_attr(attr) {
                markers.push(attr.clone());
                false
            } else {
                true
            }
        });

        let event_args = match markers.as_slice() {
            [] => {
                let name = method.sig.ident.to_string();
                if !options.prefixed || !PREFIXES.iter().any(|p| name.starts_with(p)) {
                    continue;
                }
                EventArgs::default()
            }
            [marker] => EventArgs::from_attr(marker)?,
            [_, again, ..] => {
                return Err(syn::Error::new_spanned(
                    again,
                    "this method is already an event handler",
                ));
            }
        };

        let sig = HandlerSig::take(&mut method.sig)?;
        members.push(handler_expr(&endpoint, Some(&self_ty), &sig, &event_args));
    }

    Ok(quote! {
        #item

        impl ::wsevent::framework::Members for #self_ty {
            fn members() -> ::std::result::Result<
                ::std::vec::Vec<::wsevent::framework::Handler<Self>>,
                ::wsevent::framework::RegistrationError,
            > {
                ::std::result::Result::Ok(::std::vec![#(#members?),*])
            }
        }
    })
}
