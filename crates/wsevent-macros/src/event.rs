//! Handler generation shared by `#[event]` and `#[handlers]`.
//!
//! Both attributes turn a function signature into an expression of type
//! `Result<Handler<E>, RegistrationError>`:
//!
//! ```rust,ignore
//! {
//!     async fn __invoke(__this: Arc<Chat>, mut __params: Params) -> HandlerResult<Reply> {
//!         let msg: String = __params.take("msg")?;
//!         IntoReply::into_reply(<Chat>::on_echo(&__this, msg).await)
//!     }
//!     Handler::<Self>::builder("on_echo")
//!         .param(Field::of::<String>("msg"))
//!         .method(__invoke)
//! }
//! ```
//!
//! # `#[event(...)]` arguments
//!
//! | Form | Description |
//! |------|-------------|
//! | `"name"` | Explicit event name |
//! | `name = "name"` | Same, spelled out |
//! | `response = Type` | Output schema taken from a `ResponseModel` type |
//!
//! # Parameter attributes `#[field(...)]`
//!
//! | Key | Description |
//! |-----|-------------|
//! | `default = expr` | Makes the parameter optional; `expr` must convert into `serde_json::Value` |

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Attribute, Expr, FnArg, GenericArgument, Ident, ItemFn, LitStr, Pat, PathArguments, Signature,
    Token, Type, Visibility,
    ext::IdentExt,
    parse::{Parse, ParseStream},
    spanned::Spanned,
};

// ============================================================================
// Arguments
// ============================================================================

/// Parsed `#[event(...)]` arguments.
#[derive(Default)]
pub struct EventArgs {
    name: Option<LitStr>,
    response: Option<Type>,
}

impl Parse for EventArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = EventArgs::default();
        while !input.is_empty() {
            if input.peek(LitStr) {
                set_once(&mut args.name, input.parse()?, "event name")?;
            } else {
                let key: Ident = input.parse()?;
                input.parse::<Token![=]>()?;
                match key.to_string().as_str() {
                    "name" => set_once(&mut args.name, input.parse()?, "event name")?,
                    "response" => set_once(&mut args.response, input.parse()?, "response")?,
                    other => {
                        return Err(syn::Error::new(
                            key.span(),
                            format!("unknown event argument `{other}`; expected name or response"),
                        ));
                    }
                }
            }
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(args)
    }
}

impl EventArgs {
    /// Parses the arguments of an `#[event]` attribute found on an item.
    pub fn from_attr(attr: &Attribute) -> syn::Result<Self> {
        match &attr.meta {
            syn::Meta::Path(_) => Ok(Self::default()),
            _ => attr.parse_args(),
        }
    }
}

fn set_once<T: Spanned>(slot: &mut Option<T>, value: T, what: &str) -> syn::Result<()> {
    if slot.is_some() {
        return Err(syn::Error::new(value.span(), format!("{what} given twice")));
    }
    *slot = Some(value);
    Ok(())
}

// ============================================================================
// Signature analysis
// ============================================================================

/// How the handler receives the endpoint instance.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// No receiver: a function handler.
    None,
    /// `&self`
    Ref,
    /// `self: Arc<Self>`
    Arc,
}

struct Param {
    ident: Ident,
    ty: Type,
    default: Option<Expr>,
}

/// A function signature prepared for code generation.
pub struct HandlerSig {
    ident: Ident,
    is_async: bool,
    receiver: Receiver,
    params: Vec<Param>,
}

impl HandlerSig {
    /// Analyzes `sig`, stripping `#[field]` attributes from its inputs.
    pub fn take(sig: &mut Signature) -> syn::Result<Self> {
        if !sig.generics.params.is_empty() {
            return Err(syn::Error::new(
                sig.generics.span(),
                "event handlers cannot be generic",
            ));
        }
        if sig.variadic.is_some() {
            return Err(syn::Error::new(sig.span(), "event handlers cannot be variadic"));
        }

        let mut receiver = Receiver::None;
        let mut params = Vec::new();
        for input in sig.inputs.iter_mut() {
            match input {
                FnArg::Receiver(recv) => receiver = receiver_kind(recv)?,
                FnArg::Typed(typed) => {
                    let default = take_field_default(&mut typed.attrs)?;
                    let Pat::Ident(pat) = typed.pat.as_ref() else {
                        return Err(syn::Error::new(
                            typed.pat.span(),
                            "event handler parameters must be plain identifiers",
                        ));
                    };
                    params.push(Param {
                        ident: pat.ident.clone(),
                        ty: (*typed.ty).clone(),
                        default,
                    });
                }
            }
        }

        Ok(Self {
            ident: sig.ident.clone(),
            is_async: sig.asyncness.is_some(),
            receiver,
            params,
        })
    }

    pub fn receiver(&self) -> Receiver {
        self.receiver
    }
}

fn receiver_kind(recv: &syn::Receiver) -> syn::Result<Receiver> {
    if recv.mutability.is_some() {
        return Err(syn::Error::new(
            recv.span(),
            "event handlers cannot take `&mut self`; sessions share the endpoint instance",
        ));
    }
    if recv.reference.is_some() {
        return Ok(Receiver::Ref);
    }
    if recv.colon_token.is_some() && is_arc_self(&recv.ty) {
        return Ok(Receiver::Arc);
    }
    Err(syn::Error::new(
        recv.span(),
        "event handlers take `&self` or `self: Arc<Self>`",
    ))
}

fn is_arc_self(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    let Some(last) = path.path.segments.last() else {
        return false;
    };
    if last.ident != "Arc" {
        return false;
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return false;
    };
    matches!(
        args.args.first(),
        Some(GenericArgument::Type(Type::Path(inner))) if inner.path.is_ident("Self")
    )
}

fn take_field_default(attrs: &mut Vec<Attribute>) -> syn::Result<Option<Expr>> {
    let mut default = None;
    let mut error = None;
    attrs.retain(|attr| {
        if !attr.path().is_ident("field") {
            return true;
        }
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                default = Some(meta.value()?.parse::<Expr>()?);
                Ok(())
            } else {
                Err(meta.error("unknown field argument; expected `default = ...`"))
            }
        });
        if let Err(err) = parsed {
            error.get_or_insert(err);
        }
        false
    });
    match error {
        Some(err) => Err(err),
        None => Ok(default),
    }
}

/// Whether `attr` is an `#[event]` marker.
pub fn is_event_attr(attr: &Attribute) -> bool {
    attr.path().is_ident("event")
}

// ============================================================================
// Code generation
// ============================================================================

/// Generates the `Result<Handler<endpoint>, RegistrationError>` expression.
///
/// `owner` is the impl type for handlers declared in an impl block.
pub fn handler_expr(
    endpoint: &TokenStream,
    owner: Option<&Type>,
    sig: &HandlerSig,
    args: &EventArgs,
) -> TokenStream {
    let invoke = invoke_fn(owner, sig);
    let declared = sig.ident.unraw().to_string();

    let event = args.name.as_ref().map(|name| quote!(.event(#name)));
    let response = args
        .response
        .as_ref()
        .map(|ty| quote!(.response_model::<#ty>()));
    let params = sig.params.iter().map(|param| {
        let name = param.ident.unraw().to_string();
        let ty = &param.ty;
        match &param.default {
            Some(default) => quote! {
                .param(::wsevent::core::Field::of::<#ty>(#name).with_default(#default))
            },
            None => quote! {
                .param(::wsevent::core::Field::of::<#ty>(#name))
            },
        }
    });

    let finish = match (sig.receiver, sig.is_async) {
        (Receiver::None, true) => format_ident!("function"),
        (Receiver::None, false) => format_ident!("blocking_function"),
        (_, true) => format_ident!("method"),
        (_, false) => format_ident!("blocking_method"),
    };

    quote! {
        {
            #invoke
            ::wsevent::framework::Handler::<#endpoint>::builder(#declared)
                #event
                #(#params)*
                #response
                .#finish(__invoke)
        }
    }
}

fn invoke_fn(owner: Option<&Type>, sig: &HandlerSig) -> TokenStream {
    let ident = &sig.ident;
    let callee = match owner {
        Some(owner) => quote!(<#owner>::#ident),
        None => quote!(#ident),
    };

    let takes = sig.params.iter().map(|param| {
        let ident = &param.ident;
        let name = ident.unraw().to_string();
        let ty = &param.ty;
        quote!(let #ident: #ty = __params.take(#name)?;)
    });
    let args = sig.params.iter().map(|param| &param.ident);
    let call = match sig.receiver {
        Receiver::None => quote!(#callee(#(#args),*)),
        Receiver::Ref => quote!(#callee(&__this, #(#args),*)),
        Receiver::Arc => quote!(#callee(__this, #(#args),*)),
    };
    let call = if sig.is_async {
        quote!(#call.await)
    } else {
        call
    };

    let this = match (sig.receiver, owner) {
        (Receiver::None, _) | (_, None) => None,
        (_, Some(owner)) => Some(quote!(__this: ::std::sync::Arc<#owner>,)),
    };
    let asyncness = sig.is_async.then(|| quote!(async));

    quote! {
        #[allow(unused_mut)]
        #asyncness fn __invoke(
            #this
            mut __params: ::wsevent::framework::Params,
        ) -> ::wsevent::framework::HandlerResult<::wsevent::framework::Reply> {
            #(#takes)*
            ::wsevent::framework::IntoReply::into_reply(#call)
        }
    }
}

// ============================================================================
// #[event] on free functions
// ============================================================================

/// Expands `#[event]` on a free function.
///
/// The function is replaced by a constructor of the same name returning the
/// handler for any endpoint type. The original body moves inside it.
pub fn expand_event(args: EventArgs, mut func: ItemFn) -> syn::Result<TokenStream> {
    if let Some(attr) = func.attrs.iter().find(|attr| is_event_attr(attr)) {
        return Err(syn::Error::new_spanned(
            attr,
            "this function is already an event handler",
        ));
    }

    let sig = HandlerSig::take(&mut func.sig)?;
    if sig.receiver() != Receiver::None {
        return Err(syn::Error::new(
            func.sig.inputs.span(),
            "methods are declared inside a `#[handlers]` impl block",
        ));
    }

    let (docs, attrs): (Vec<_>, Vec<_>) = func
        .attrs
        .drain(..)
        .partition(|attr| attr.path().is_ident("doc"));
    func.attrs = attrs;

    let vis = std::mem::replace(&mut func.vis, Visibility::Inherited);
    let ident = func.sig.ident.clone();
    let endpoint = quote!(__E);
    let handler = handler_expr(&endpoint, None, &sig, &args);

    Ok(quote! {
        #(#docs)*
        #vis fn #ident<__E>() -> ::std::result::Result<
            ::wsevent::framework::Handler<__E>,
            ::wsevent::framework::RegistrationError,
        >
        where
            __E: ::std::marker::Send + ::std::marker::Sync + 'static,
        {
            #func
            #handler
        }
    })
}
