//! Handlers: one event name bound to one callable.
//!
//! A [`Handler`] owns the derived input schema, the output schema and the
//! callable itself. Callables come in two shapes:
//!
//! - **methods** take the endpoint instance (`Arc<E>`) and are bound to a
//!   fresh instance for every session,
//! - **functions** take no receiver and are shared as they are.
//!
//! Handlers are usually generated by the `#[event]` and `#[handlers]`
//! attributes, but can be assembled by hand through [`HandlerBuilder`]:
//!
//! ```rust,ignore
//! use wsevent::prelude::*;
//!
//! let handler = Handler::<ChatEndpoint>::builder("on_echo")
//!     .param(Field::of::<String>("msg"))
//!     .function(|mut params: Params| async move {
//!         let msg: String = params.take("msg")?;
//!         Ok::<_, HandlerError>(json!({ "msg": msg }))
//!     })?;
//! ```

mod params;
mod reply;

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;
use wsevent_core::schema::{input_schema, response_schema};
use wsevent_core::{EventMessage, Field, LocItem, ObjectSchema};

use crate::error::{HandlerError, HandlerPanic, HandlerResult, RegistrationError, RegistrationResult};

pub use params::Params;
pub use reply::{IntoReply, Model, Reply, ResponseModel};

/// Event names taken by the lifecycle hooks.
pub const RESERVED_EVENTS: [&str; 3] = ["connect", "disconnect", "receive"];

/// Prefixes stripped from declared names to derive the event name.
pub const HANDLER_PREFIXES: [&str; 2] = ["on_", "handle_"];

/// The future returned by a type-erased handler.
pub type HandlerFuture = BoxFuture<'static, HandlerResult<Reply>>;

type FunctionFn = Arc<dyn Fn(Params) -> HandlerFuture + Send + Sync>;
type MethodFn<E> = Arc<dyn Fn(Arc<E>, Params) -> HandlerFuture + Send + Sync>;

/// Maps a derived endpoint instance to the ancestor instance it embeds.
pub type Projection<C, P> = Arc<dyn Fn(&Arc<C>) -> Arc<P> + Send + Sync>;

/// Resolves the event name of a handler.
///
/// An explicit name wins. Otherwise a leading `on_` or `handle_` is
/// stripped from the declared name.
pub fn resolve_event_name(declared: &str, explicit: Option<&str>) -> RegistrationResult<String> {
    let name = match explicit {
        Some(name) => name,
        None => HANDLER_PREFIXES
            .iter()
            .find_map(|prefix| declared.strip_prefix(prefix))
            .unwrap_or(declared),
    };

    if name.is_empty() {
        return Err(RegistrationError::EmptyName {
            declared: declared.to_string(),
        });
    }
    if RESERVED_EVENTS.contains(&name) {
        return Err(RegistrationError::Reserved(name.to_string()));
    }
    Ok(name.to_string())
}

/// Where a handler in a table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Declared by the endpoint type itself.
    Member,
    /// Copied from an ancestor's table.
    Inherited,
    /// Attached from outside after the table was built.
    Attached,
}

enum Callable<E> {
    Function(FunctionFn),
    Method(MethodFn<E>),
}

impl<E> Clone for Callable<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Function(f) => Self::Function(Arc::clone(f)),
            Self::Method(f) => Self::Method(Arc::clone(f)),
        }
    }
}

/// An event name bound to a callable together with its schemas.
pub struct Handler<E> {
    event: String,
    declared: String,
    params: Vec<Field>,
    response_model: Option<ObjectSchema>,
    input: Arc<ObjectSchema>,
    output: Arc<ObjectSchema>,
    origin: Origin,
    callable: Callable<E>,
}

impl<E> Clone for Handler<E> {
    fn clone(&self) -> Self {
        Self {
            event: self.event.clone(),
            declared: self.declared.clone(),
            params: self.params.clone(),
            response_model: self.response_model.clone(),
            input: Arc::clone(&self.input),
            output: Arc::clone(&self.output),
            origin: self.origin,
            callable: self.callable.clone(),
        }
    }
}

impl<E> fmt::Debug for Handler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("event", &self.event)
            .field("declared", &self.declared)
            .field("params", &self.params.iter().map(|p| &p.name).collect::<Vec<_>>())
            .field("origin", &self.origin)
            .field("method", &matches!(self.callable, Callable::Method(_)))
            .finish()
    }
}

impl<E: Send + Sync + 'static> Handler<E> {
    /// Starts building a handler for the function or method `declared`.
    pub fn builder(declared: impl Into<String>) -> HandlerBuilder<E> {
        HandlerBuilder::new(declared)
    }

    fn assemble(
        declared: String,
        explicit: Option<&str>,
        params: Vec<Field>,
        response_model: Option<ObjectSchema>,
        callable: Callable<E>,
    ) -> RegistrationResult<Self> {
        let event = resolve_event_name(&declared, explicit)?;
        let input = input_schema(&event, &params)?;
        let output = response_schema(&event, response_model.clone());
        Ok(Self {
            event,
            declared,
            params,
            response_model,
            input: Arc::new(input),
            output: Arc::new(output),
            origin: Origin::Attached,
            callable,
        })
    }

    /// The event this handler answers.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// The function or method name the handler was declared with.
    pub fn declared_name(&self) -> &str {
        &self.declared
    }

    pub fn params(&self) -> &[Field] {
        &self.params
    }

    pub fn input_schema(&self) -> &ObjectSchema {
        &self.input
    }

    pub fn response_schema(&self) -> &ObjectSchema {
        &self.output
    }

    /// Whether an output schema was supplied at registration.
    pub fn has_response_model(&self) -> bool {
        self.response_model.is_some()
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Whether the callable takes the endpoint instance.
    pub fn is_method(&self) -> bool {
        matches!(self.callable, Callable::Method(_))
    }

    pub(crate) fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Re-registers the same callable under another event name.
    ///
    /// The input schema and default output schema are re-derived for the
    /// new name.
    pub fn renamed(self, event: &str) -> RegistrationResult<Self> {
        let origin = self.origin;
        Self::assemble(
            self.declared,
            Some(event),
            self.params,
            self.response_model,
            self.callable,
        )
        .map(|h| h.with_origin(origin))
    }

    /// Lifts this handler into a table of a derived endpoint type.
    ///
    /// Method handlers are called on the ancestor instance returned by
    /// `projection`; function handlers are shared unchanged.
    pub fn project<C>(self, projection: Projection<C, E>) -> Handler<C>
    where
        C: Send + Sync + 'static,
    {
        let callable = match self.callable {
            Callable::Function(f) => Callable::Function(f),
            Callable::Method(f) => Callable::Method(Arc::new(move |instance: Arc<C>, params| {
                f(projection(&instance), params)
            })),
        };
        Handler {
            event: self.event,
            declared: self.declared,
            params: self.params,
            response_model: self.response_model,
            input: self.input,
            output: self.output,
            origin: Origin::Inherited,
            callable,
        }
    }

    /// Binds the handler to a live endpoint instance.
    pub fn bind(&self, instance: &Arc<E>) -> BoundHandler {
        let call: FunctionFn = match &self.callable {
            Callable::Function(f) => Arc::clone(f),
            Callable::Method(f) => {
                let f = Arc::clone(f);
                let instance = Arc::clone(instance);
                Arc::new(move |params| f(Arc::clone(&instance), params))
            }
        };
        BoundHandler {
            event: self.event.clone(),
            input: Arc::clone(&self.input),
            output: Arc::clone(&self.output),
            explicit_output: self.response_model.is_some(),
            call,
        }
    }
}

/// A handler ready to be invoked within one session.
#[derive(Clone)]
pub struct BoundHandler {
    event: String,
    input: Arc<ObjectSchema>,
    output: Arc<ObjectSchema>,
    explicit_output: bool,
    call: FunctionFn,
}

impl fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundHandler")
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

impl BoundHandler {
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Validates `message`, calls the handler and shapes its reply.
    ///
    /// Returns `Ok(None)` when the handler produced nothing to send.
    pub async fn invoke(&self, message: EventMessage) -> HandlerResult<Option<Value>> {
        let mut fields = self.input.validate(message.into_value())?;
        fields.remove(wsevent_core::TYPE_FIELD);

        let reply = AssertUnwindSafe((self.call)(Params::new(fields)))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(HandlerPanic(panic_message(payload.as_ref())).into()))?;

        self.shape(reply)
    }

    /// Validates a reply against the output schema.
    ///
    /// Errors are located under `response`.
    pub fn shape(&self, reply: Reply) -> HandlerResult<Option<Value>> {
        let response = [LocItem::from("response")];
        let shaped = match reply {
            Reply::Empty => return Ok(None),
            Reply::Value(value) => self.output.validate_under(value, &response)?,
            Reply::Model { value, .. } if self.explicit_output => {
                self.output.validate_under(value, &response)?
            }
            Reply::Model { value, schema } => {
                debug!(event = %self.event, model = schema.title(), "shaping reply by its own model");
                let schema = wsevent_core::schema::patch_response_schema(
                    &self.event,
                    ObjectSchema::clone(&schema),
                );
                schema.validate_under(value, &response)?
            }
        };
        Ok(Some(Value::Object(shaped)))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Builder for [`Handler`]s.
///
/// Finishing the builder with one of the callable methods derives the
/// schemas and reports registration errors right away.
pub struct HandlerBuilder<E> {
    declared: String,
    explicit: Option<String>,
    params: Vec<Field>,
    response: Option<ObjectSchema>,
    _endpoint: PhantomData<fn() -> E>,
}

impl<E: Send + Sync + 'static> HandlerBuilder<E> {
    pub fn new(declared: impl Into<String>) -> Self {
        Self {
            declared: declared.into(),
            explicit: None,
            params: Vec::new(),
            response: None,
            _endpoint: PhantomData,
        }
    }

    /// Sets the event name explicitly instead of deriving it.
    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.explicit = Some(event.into());
        self
    }

    /// Declares one parameter.
    pub fn param(mut self, field: Field) -> Self {
        self.params.push(field);
        self
    }

    pub fn params(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.params.extend(fields);
        self
    }

    /// Supplies the output schema.
    pub fn response(mut self, schema: ObjectSchema) -> Self {
        self.response = Some(schema);
        self
    }

    /// Supplies the output schema of a typed model.
    pub fn response_model<T: ResponseModel>(self) -> Self {
        self.response(T::schema())
    }

    fn finish(self, callable: Callable<E>) -> RegistrationResult<Handler<E>> {
        Handler::assemble(
            self.declared,
            self.explicit.as_deref(),
            self.params,
            self.response,
            callable,
        )
    }

    /// Finishes with an async function that takes no receiver.
    pub fn function<F, Fut, R>(self, f: F) -> RegistrationResult<Handler<E>>
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.finish(Callable::Function(Arc::new(move |params| {
            f(params).map(IntoReply::into_reply).boxed()
        })))
    }

    /// Finishes with an async method called on the session's instance.
    pub fn method<F, Fut, R>(self, f: F) -> RegistrationResult<Handler<E>>
    where
        F: Fn(Arc<E>, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoReply + 'static,
    {
        self.finish(Callable::Method(Arc::new(move |instance, params| {
            f(instance, params).map(IntoReply::into_reply).boxed()
        })))
    }

    /// Finishes with a synchronous function.
    ///
    /// Each call runs on the blocking thread pool so that a slow handler
    /// cannot stall other sessions.
    pub fn blocking_function<F, R>(self, f: F) -> RegistrationResult<Handler<E>>
    where
        F: Fn(Params) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        let f = Arc::new(f);
        self.finish(Callable::Function(Arc::new(move |params| {
            let f = Arc::clone(&f);
            run_blocking(move || f(params).into_reply())
        })))
    }

    /// Finishes with a synchronous method, run on the blocking thread pool.
    pub fn blocking_method<F, R>(self, f: F) -> RegistrationResult<Handler<E>>
    where
        F: Fn(Arc<E>, Params) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        let f = Arc::new(f);
        self.finish(Callable::Method(Arc::new(move |instance, params| {
            let f = Arc::clone(&f);
            run_blocking(move || f(instance, params).into_reply())
        })))
    }
}

fn run_blocking<F>(job: F) -> HandlerFuture
where
    F: FnOnce() -> HandlerResult<Reply> + Send + 'static,
{
    async move {
        match tokio::task::spawn_blocking(job).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => {
                Err(HandlerPanic(panic_message(err.into_panic().as_ref())).into())
            }
            Err(err) => Err(HandlerError::internal(err)),
        }
    }
    .boxed()
}

/// Values accepted where a handler is expected.
pub trait IntoHandler<E> {
    fn into_handler(self) -> RegistrationResult<Handler<E>>;
}

impl<E> IntoHandler<E> for Handler<E> {
    fn into_handler(self) -> RegistrationResult<Handler<E>> {
        Ok(self)
    }
}

impl<E> IntoHandler<E> for RegistrationResult<Handler<E>> {
    fn into_handler(self) -> RegistrationResult<Handler<E>> {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use wsevent_core::{ExtraPolicy, ValidationError};

    use super::*;
    use crate::error::Rejection;

    struct Counter {
        hits: AtomicUsize,
    }

    fn echo() -> Handler<()> {
        Handler::builder("on_echo")
            .param(Field::of::<String>("msg"))
            .function(|mut params: Params| async move {
                let msg: String = params.take("msg")?;
                Ok::<_, HandlerError>(json!({ "msg": msg }))
            })
            .unwrap()
    }

    async fn call<E: Send + Sync + 'static>(
        handler: &Handler<E>,
        instance: E,
        message: Value,
    ) -> HandlerResult<Option<Value>> {
        let message = EventMessage::from_value(message).unwrap();
        handler.bind(&Arc::new(instance)).invoke(message).await
    }

    fn validation(err: HandlerError) -> ValidationError {
        match err {
            HandlerError::Validation(v) => v,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn event_names_strip_known_prefixes() {
        assert_eq!(resolve_event_name("on_echo", None).unwrap(), "echo");
        assert_eq!(resolve_event_name("handle_ping", None).unwrap(), "ping");
        assert_eq!(resolve_event_name("status", None).unwrap(), "status");
        assert_eq!(resolve_event_name("on_echo", Some("shout")).unwrap(), "shout");
    }

    #[test]
    fn empty_and_reserved_names_are_rejected() {
        assert!(matches!(
            resolve_event_name("on_", None),
            Err(RegistrationError::EmptyName { .. })
        ));
        assert!(matches!(
            resolve_event_name("handle_", None),
            Err(RegistrationError::EmptyName { .. })
        ));
        assert_eq!(
            resolve_event_name("on_connect", None),
            Err(RegistrationError::Reserved("connect".to_string()))
        );
        assert_eq!(
            resolve_event_name("anything", Some("receive")),
            Err(RegistrationError::Reserved("receive".to_string()))
        );
    }

    #[test]
    fn builder_derives_schemas() {
        let handler = echo();
        assert_eq!(handler.event(), "echo");
        assert_eq!(handler.declared_name(), "on_echo");
        assert_eq!(handler.input_schema().title(), "EventMessage_echo");
        assert_eq!(handler.input_schema().extra_policy(), ExtraPolicy::Forbid);
        assert_eq!(handler.response_schema().extra_policy(), ExtraPolicy::Allow);
        assert!(!handler.has_response_model());
        assert!(!handler.is_method());
    }

    #[test]
    fn type_parameter_is_a_registration_error() {
        let result = Handler::<()>::builder("on_x")
            .param(Field::of::<String>("type"))
            .function(|_: Params| async {});
        assert!(matches!(result, Err(RegistrationError::Schema(_))));
    }

    #[tokio::test]
    async fn invoke_injects_type_into_reply() {
        let out = call(&echo(), (), json!({"type": "echo", "msg": "foobar"}))
            .await
            .unwrap();
        assert_eq!(out, Some(json!({"type": "echo", "msg": "foobar"})));
    }

    #[tokio::test]
    async fn invoke_rejects_bad_input() {
        let err = call(&echo(), (), json!({"type": "echo", "msg": 1}))
            .await
            .unwrap_err();
        assert_eq!(validation(err).errors[0].kind, "type_error.str");

        let err = call(&echo(), (), json!({"type": "echo"})).await.unwrap_err();
        assert_eq!(validation(err).errors[0].msg, "field required");

        let err = call(&echo(), (), json!({"type": "echo", "msg": "x", "y": 1}))
            .await
            .unwrap_err();
        assert_eq!(validation(err).errors[0].kind, "value_error.extra");
    }

    #[tokio::test]
    async fn empty_reply_sends_nothing() {
        let handler = Handler::<()>::builder("quiet")
            .function(|_: Params| async {})
            .unwrap();
        assert_eq!(call(&handler, (), json!({"type": "quiet"})).await.unwrap(), None);
    }

    #[tokio::test]
    async fn non_object_reply_fails_output_validation() {
        let handler = Handler::<()>::builder("return_foo")
            .function(|_: Params| async { json!("foo") })
            .unwrap();
        let err = call(&handler, (), json!({"type": "return_foo"})).await.unwrap_err();
        let v = validation(err);
        assert_eq!(v.errors[0].loc, vec![LocItem::from("response")]);
        assert_eq!(v.errors[0].kind, "type_error.dict");
    }

    #[tokio::test]
    async fn methods_receive_the_bound_instance() {
        let handler = Handler::<Counter>::builder("hit")
            .method(|this: Arc<Counter>, _: Params| async move {
                let hits = this.hits.fetch_add(1, Ordering::SeqCst) + 1;
                json!({ "hits": hits })
            })
            .unwrap();
        assert!(handler.is_method());

        let instance = Arc::new(Counter {
            hits: AtomicUsize::new(0),
        });
        let bound = handler.bind(&instance);
        for expected in 1..=2 {
            let out = bound.invoke(EventMessage::new("hit")).await.unwrap();
            assert_eq!(out, Some(json!({"type": "hit", "hits": expected})));
        }
        assert_eq!(instance.hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn debug_names_the_callable_kind() {
        let method = Handler::<Counter>::builder("on_hit")
            .method(|_: Arc<Counter>, _: Params| async {})
            .unwrap();
        let rendered = format!("{method:?}");
        assert!(rendered.contains("event: \"hit\""));
        assert!(rendered.contains("method: true"));
        assert!(format!("{:?}", echo()).contains("method: false"));
    }

    #[tokio::test]
    async fn blocking_handlers_run_off_the_runtime() {
        let handler = Handler::<()>::builder("with_arg")
            .param(Field::of::<String>("msg"))
            .blocking_function(|mut params: Params| -> HandlerResult<Value> {
                let msg: String = params.take("msg")?;
                Ok(json!({ "reply": msg }))
            })
            .unwrap();
        let out = call(&handler, (), json!({"type": "with_arg", "msg": "foobar"}))
            .await
            .unwrap();
        assert_eq!(out, Some(json!({"type": "with_arg", "reply": "foobar"})));
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let handler = Handler::<()>::builder("boom")
            .function(|_: Params| async {
                if true {
                    panic!("kaboom");
                }
            })
            .unwrap();
        let err = call(&handler, (), json!({"type": "boom"})).await.unwrap_err();
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("kaboom"));

        let blocking = Handler::<()>::builder("boom")
            .blocking_function(|_: Params| -> Value { panic!("blocking kaboom") })
            .unwrap();
        let err = call(&blocking, (), json!({"type": "boom"})).await.unwrap_err();
        assert!(err.to_string().contains("blocking kaboom"));
    }

    #[tokio::test]
    async fn rejections_propagate() {
        let handler = Handler::<()>::builder("deny")
            .function(|_: Params| async {
                Err::<Value, _>(Rejection::forbidden("not allowed"))
            })
            .unwrap();
        let err = call(&handler, (), json!({"type": "deny"})).await.unwrap_err();
        assert!(matches!(err, HandlerError::Rejected(ref r) if r.status_code == 403));
    }

    #[tokio::test]
    async fn declared_response_schema_reports_missing_fields() {
        let model = ObjectSchema::new("WithData")
            .extra(ExtraPolicy::Allow)
            .field(Field::of::<String>("type").with_default("custom_type2"))
            .and_then(|s| s.field(Field::of::<std::collections::HashMap<String, Value>>("data")))
            .and_then(|s| s.field(Field::of::<i64>("extra_val").with_default(42)))
            .unwrap();
        let handler = Handler::<()>::builder("without_data")
            .response(model)
            .function(|_: Params| async { json!({}) })
            .unwrap();
        assert!(handler.has_response_model());

        let err = call(&handler, (), json!({"type": "without_data"})).await.unwrap_err();
        let v = validation(err);
        assert_eq!(v.errors.len(), 1);
        assert_eq!(
            v.errors[0].loc,
            vec![LocItem::from("response"), LocItem::from("data")]
        );
        assert_eq!(v.errors[0].msg, "field required");
    }

    #[tokio::test]
    async fn returned_model_shapes_reply_without_declared_schema() {
        struct Pong;
        impl ResponseModel for Pong {
            fn schema() -> ObjectSchema {
                ObjectSchema::new("Pong")
                    .field(Field::of::<i64>("latency").with_default(0))
                    .unwrap()
            }
        }

        let handler = Handler::<()>::builder("ping")
            .function(|_: Params| async {
                Reply::Model {
                    value: json!({"ignored": true}),
                    schema: Arc::new(Pong::schema()),
                }
            })
            .unwrap();
        let out = call(&handler, (), json!({"type": "ping"})).await.unwrap();
        assert_eq!(out, Some(json!({"type": "ping", "latency": 0})));
    }

    #[test]
    fn renaming_rederives_schemas() {
        let renamed = echo().renamed("shout").unwrap();
        assert_eq!(renamed.event(), "shout");
        assert_eq!(renamed.declared_name(), "on_echo");
        assert_eq!(renamed.input_schema().title(), "EventMessage_shout");
        assert!(echo().renamed("disconnect").is_err());
    }

    #[tokio::test]
    async fn projected_methods_use_the_embedded_instance() {
        struct Child {
            base: Arc<Counter>,
        }

        let parent = Handler::<Counter>::builder("hit")
            .method(|this: Arc<Counter>, _: Params| async move {
                this.hits.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let projected: Handler<Child> = parent.project(Arc::new(|c: &Arc<Child>| Arc::clone(&c.base)));
        assert_eq!(projected.origin(), Origin::Inherited);

        let base = Arc::new(Counter {
            hits: AtomicUsize::new(0),
        });
        let child = Arc::new(Child {
            base: Arc::clone(&base),
        });
        projected
            .bind(&child)
            .invoke(EventMessage::new("hit"))
            .await
            .unwrap();
        assert_eq!(base.hits.load(Ordering::SeqCst), 1);
    }
}
