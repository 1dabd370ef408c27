//! Procedural macros for the wsevent framework.
//!
//! This crate provides:
//!
//! - `#[event]` - Declares a free function as an event handler
//! - `#[handlers]` - Collects the event handlers of an impl block into the
//!   endpoint type's `Members`
//! - `#[derive(ResponseModel)]` - Derives an output schema from a struct
//!
//! The generated code refers to the `wsevent` facade crate, which must be a
//! dependency of the crate using these macros.
//!
//! # Declaring handlers
//!
//! ```rust,ignore
//! use wsevent::prelude::*;
//!
//! struct Chat;
//!
//! #[handlers]
//! impl Chat {
//!     /// Answers `{"type": "echo", "msg": "..."}`.
//!     #[event]
//!     async fn on_echo(&self, msg: String) -> Value {
//!         json!({ "msg": msg })
//!     }
//!
//!     #[event("add", response = Sum)]
//!     fn handle_addition(a: i64, #[field(default = 1)] b: i64) -> Sum {
//!         Sum { total: a + b }
//!     }
//! }
//!
//! #[derive(Serialize, ResponseModel)]
//! struct Sum {
//!     total: i64,
//! }
//! ```

mod event;
mod handlers;
mod model;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemImpl, parse_macro_input};

/// Declares a free function as an event handler.
///
/// The function is replaced by a constructor of the same name returning
/// `Result<Handler<E>, RegistrationError>` for any endpoint type `E`, ready
/// to be passed to `HandlerTable::register` or `Registry::register`.
///
/// Async functions are awaited in place; synchronous functions run on the
/// blocking thread pool.
///
/// # Arguments
///
/// - `#[event]` - Event name derived from the function name (`on_` and
///   `handle_` prefixes are stripped)
/// - `#[event("name")]` or `#[event(name = "name")]` - Explicit event name
/// - `#[event(response = Type)]` - Output schema from a `ResponseModel` type
///
/// Parameters may carry `#[field(default = expr)]`.
///
/// # Example
///
/// ```rust,ignore
/// #[event("shout")]
/// async fn loud(msg: String) -> Value {
///     json!({ "msg": msg.to_uppercase() })
/// }
///
/// registry.register(None, loud(), false)?;
/// ```
#[proc_macro_attribute]
pub fn event(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as event::EventArgs);
    let func = parse_macro_input!(item as ItemFn);

    match event::expand_event(args, func) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Collects the event handlers declared in an impl block.
///
/// Methods marked `#[event]` (with the same arguments as the free-function
/// form) become handlers and the block gains an implementation of
/// `Members`. Methods take `&self`, `self: Arc<Self>` or no receiver.
///
/// With `#[handlers(prefixed)]`, unmarked methods whose names start with
/// `on_` or `handle_` are registered as well.
#[proc_macro_attribute]
pub fn handlers(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as handlers::HandlersArgs);
    let item = parse_macro_input!(item as ItemImpl);

    match handlers::expand_handlers(args, item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Derives `ResponseModel`, `SchemaType` and `IntoReply` for a struct.
///
/// The struct must also implement `serde::Serialize`.
///
/// # Attributes
///
/// - `#[model(title = "...")]` - Schema title (default: the struct name)
/// - `#[model(extra = "allow" | "ignore" | "forbid")]` - Unknown key policy
/// - `#[model(default = expr)]` on a field - Field default
#[proc_macro_derive(ResponseModel, attributes(model))]
pub fn derive_response_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match model::derive_response_model(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
