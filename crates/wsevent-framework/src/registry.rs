//! Handler registries.
//!
//! There are two scopes:
//!
//! - [`HandlerTable`] is the class-level table of an endpoint type. It is
//!   built once at setup from the type's declared [`Members`], optionally
//!   layered on a copy of an ancestor's table, and may be extended through
//!   [`HandlerTable::attach`] / [`HandlerTable::register`].
//! - [`LiveHandlers`] is the per-session dispatch table, derived from a
//!   class-level table by binding method handlers to the session's endpoint
//!   instance. It is immutable for the life of the session.
//!
//! ```rust,ignore
//! let base = HandlerTable::<Base>::new()?;
//! let table = HandlerTable::<Chat>::subclass(&base, Arc::new(|c: &Arc<Chat>| c.base()), true)?;
//!
//! let registry = Registry::new(table);
//! registry.register(Some("shout"), echo(), false)?;
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{Instrument, Level, debug, span, warn};
use wsevent_core::{ErrorDetail, EventMessage, LocItem, TYPE_FIELD, ValidationError};

use crate::error::{HandlerResult, RegistrationError, RegistrationResult};
use crate::handler::{BoundHandler, Handler, IntoHandler, Origin, Projection};

/// Endpoint types that declare their own handlers.
///
/// Implemented by `#[handlers]` on an impl block. The returned list is the
/// type's own members only; inherited handlers come from the ancestor's
/// table passed to [`HandlerTable::subclass`].
pub trait Members: Sized + Send + Sync + 'static {
    fn members() -> RegistrationResult<Vec<Handler<Self>>>;
}

// ============================================================================
// Class-level table
// ============================================================================

/// The class-level event table of endpoint type `E`.
pub struct HandlerTable<E> {
    handlers: BTreeMap<String, Handler<E>>,
}

impl<E> Clone for HandlerTable<E> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<E> Default for HandlerTable<E> {
    fn default() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }
}

impl<E> fmt::Debug for HandlerTable<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("events", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<E: Send + Sync + 'static> HandlerTable<E> {
    /// Creates a table with no handlers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the table of a type from its declared members.
    pub fn new() -> RegistrationResult<Self>
    where
        E: Members,
    {
        Self::empty().declare(E::members()?, false)
    }

    /// Copies an ancestor's table into a table for `E`.
    ///
    /// Method handlers of the ancestor are called on the ancestor instance
    /// returned by `projection`.
    pub fn inherit<P>(parent: &HandlerTable<P>, projection: Projection<E, P>) -> Self
    where
        P: Send + Sync + 'static,
    {
        let handlers = parent
            .handlers
            .iter()
            .map(|(event, handler)| {
                (
                    event.clone(),
                    handler.clone().project(Arc::clone(&projection)),
                )
            })
            .collect();
        Self { handlers }
    }

    /// Copies an ancestor's table and layers `E`'s own members on top.
    ///
    /// With `overwrite` unset, a member claiming an inherited event is a
    /// duplicate registration error.
    pub fn subclass<P>(
        parent: &HandlerTable<P>,
        projection: Projection<E, P>,
        overwrite: bool,
    ) -> RegistrationResult<Self>
    where
        P: Send + Sync + 'static,
        E: Members,
    {
        Self::inherit(parent, projection).declare(E::members()?, overwrite)
    }

    /// Inserts a type's own members.
    ///
    /// Two members claiming the same event are always an error. A member
    /// claiming an event already in the table replaces it only when
    /// `overwrite` is set.
    pub fn declare(mut self, members: Vec<Handler<E>>, overwrite: bool) -> RegistrationResult<Self> {
        let mut own = HashSet::with_capacity(members.len());
        for handler in members {
            if !own.insert(handler.event().to_string()) {
                return Err(RegistrationError::Duplicate(handler.event().to_string()));
            }
            self.insert(handler.with_origin(Origin::Member), overwrite)?;
        }
        Ok(self)
    }

    /// Attaches a prepared handler from outside the type's declaration.
    pub fn attach(&mut self, handler: Handler<E>, overwrite: bool) -> RegistrationResult<()> {
        self.insert(handler.with_origin(Origin::Attached), overwrite)
    }

    /// Registers a handler, optionally under an explicit event name.
    ///
    /// Accepts a [`Handler`] or the `Result` returned by a handler
    /// constructor, so registration errors flow straight through.
    pub fn register(
        &mut self,
        event: Option<&str>,
        handler: impl IntoHandler<E>,
        overwrite: bool,
    ) -> RegistrationResult<()> {
        let handler = handler.into_handler()?;
        let handler = match event {
            Some(event) if event != handler.event() => handler.renamed(event)?,
            _ => handler,
        };
        self.attach(handler, overwrite)
    }

    /// Removes the handler for `event`.
    pub fn remove(&mut self, event: &str) -> Option<Handler<E>> {
        let removed = self.handlers.remove(event);
        if removed.is_some() {
            debug!(event, "handler removed");
        }
        removed
    }

    fn insert(&mut self, handler: Handler<E>, overwrite: bool) -> RegistrationResult<()> {
        let event = handler.event().to_string();
        if let Some(existing) = self.handlers.get(&event) {
            if !overwrite {
                return Err(RegistrationError::Duplicate(event));
            }
            warn!(
                event = %event,
                replaced = existing.declared_name(),
                by = handler.declared_name(),
                "overwriting registered handler"
            );
        }
        self.handlers.insert(event, handler);
        Ok(())
    }

    pub fn get(&self, event: &str) -> Option<&Handler<E>> {
        self.handlers.get(event)
    }

    pub fn contains(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Registered event names, sorted.
    pub fn events(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Handler<E>> {
        self.handlers.values()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Derives the per-session table for `instance`.
    pub fn bind(&self, instance: &Arc<E>) -> LiveHandlers {
        let handlers = self
            .handlers
            .iter()
            .map(|(event, handler)| (event.clone(), handler.bind(instance)))
            .collect();
        LiveHandlers { handlers }
    }
}

// ============================================================================
// Shared registry
// ============================================================================

/// A shareable handle to a class-level table.
///
/// Clones share the same table. Writes are expected during setup; sessions
/// take a snapshot with [`Registry::bind`] when they start, so later writes
/// only affect sessions bound afterwards.
pub struct Registry<E> {
    table: Arc<RwLock<HandlerTable<E>>>,
}

impl<E> Clone for Registry<E> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<E> fmt::Debug for Registry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Registry").field(&*self.table.read()).finish()
    }
}

impl<E: Send + Sync + 'static> Registry<E> {
    pub fn new(table: HandlerTable<E>) -> Self {
        Self {
            table: Arc::new(RwLock::new(table)),
        }
    }

    /// Builds a registry from the type's declared members.
    pub fn from_members() -> RegistrationResult<Self>
    where
        E: Members,
    {
        HandlerTable::new().map(Self::new)
    }

    pub fn attach(&self, handler: Handler<E>, overwrite: bool) -> RegistrationResult<()> {
        self.table.write().attach(handler, overwrite)
    }

    pub fn register(
        &self,
        event: Option<&str>,
        handler: impl IntoHandler<E>,
        overwrite: bool,
    ) -> RegistrationResult<()> {
        self.table.write().register(event, handler, overwrite)
    }

    pub fn remove(&self, event: &str) -> Option<Handler<E>> {
        self.table.write().remove(event)
    }

    pub fn contains(&self, event: &str) -> bool {
        self.table.read().contains(event)
    }

    pub fn events(&self) -> Vec<String> {
        self.table.read().events()
    }

    /// A copy of the current table.
    pub fn snapshot(&self) -> HandlerTable<E> {
        self.table.read().clone()
    }

    pub fn bind(&self, instance: &Arc<E>) -> LiveHandlers {
        self.table.read().bind(instance)
    }
}

impl<E: Send + Sync + 'static> From<HandlerTable<E>> for Registry<E> {
    fn from(table: HandlerTable<E>) -> Self {
        Self::new(table)
    }
}

// ============================================================================
// Per-session table
// ============================================================================

/// The dispatch table of one session.
#[derive(Clone, Default)]
pub struct LiveHandlers {
    handlers: BTreeMap<String, BoundHandler>,
}

impl fmt::Debug for LiveHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveHandlers")
            .field("events", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl LiveHandlers {
    pub fn get(&self, event: &str) -> Option<&BoundHandler> {
        self.handlers.get(event)
    }

    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Routes an envelope to its handler.
    ///
    /// The envelope's `type` must name a registered event; anything else is
    /// a validation error listing the permitted values.
    pub async fn dispatch(&self, message: EventMessage) -> HandlerResult<Option<Value>> {
        let Some(handler) = self.handlers.get(&message.event) else {
            return Err(self.unknown_event(&message.event).into());
        };

        let span = span!(Level::DEBUG, "dispatch", event = %message.event);
        async move {
            debug!("dispatching event");
            let result = handler.invoke(message).await;
            match &result {
                Ok(Some(_)) => debug!("handler replied"),
                Ok(None) => debug!("handler returned no reply"),
                Err(err) => debug!(error = %err, "handler failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    fn unknown_event(&self, given: &str) -> ValidationError {
        let permitted: Vec<Value> = self.handlers.keys().cloned().map(Value::String).collect();
        ValidationError::single(
            "EventMessage",
            ErrorDetail::unexpected_value(&Value::String(given.to_string()), &permitted)
                .at(&[LocItem::from(TYPE_FIELD)]),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use wsevent_core::Field;

    use super::*;
    use crate::error::HandlerError;
    use crate::handler::Params;

    #[derive(Default)]
    struct Base {
        hits: AtomicUsize,
    }

    impl Members for Base {
        fn members() -> RegistrationResult<Vec<Handler<Self>>> {
            Ok(vec![
                Handler::builder("on_hit").method(|this: Arc<Base>, _: Params| async move {
                    let hits = this.hits.fetch_add(1, Ordering::SeqCst) + 1;
                    json!({ "hits": hits })
                })?,
                Handler::builder("on_name").function(|_: Params| async { json!({"name": "base"}) })?,
            ])
        }
    }

    #[derive(Default)]
    struct Child {
        base: Arc<Base>,
    }

    impl Members for Child {
        fn members() -> RegistrationResult<Vec<Handler<Self>>> {
            Ok(vec![
                Handler::builder("on_name").function(|_: Params| async { json!({"name": "child"}) })?,
            ])
        }
    }

    struct Twins;

    impl Members for Twins {
        fn members() -> RegistrationResult<Vec<Handler<Self>>> {
            Ok(vec![
                Handler::builder("on_echo").function(|_: Params| async {})?,
                Handler::builder("handle_echo").function(|_: Params| async {})?,
            ])
        }
    }

    fn child_projection() -> Projection<Child, Base> {
        Arc::new(|c: &Arc<Child>| Arc::clone(&c.base))
    }

    fn standalone<E: Send + Sync + 'static>() -> RegistrationResult<Handler<E>> {
        Handler::builder("on_echo")
            .param(Field::of::<String>("msg"))
            .function(|mut params: Params| async move {
                let msg: String = params.take("msg")?;
                Ok::<_, HandlerError>(json!({ "msg": msg }))
            })
    }

    #[test]
    fn members_populate_the_table() {
        let table = HandlerTable::<Base>::new().unwrap();
        assert_eq!(table.events(), vec!["hit", "name"]);
        assert!(table.iter().all(|h| h.origin() == Origin::Member));
    }

    #[test]
    fn duplicate_own_members_always_fail() {
        assert_eq!(
            HandlerTable::<Twins>::new().unwrap_err(),
            RegistrationError::Duplicate("echo".to_string())
        );
        assert!(
            HandlerTable::<Twins>::empty()
                .declare(Twins::members().unwrap(), true)
                .is_err()
        );
    }

    #[test]
    fn subclass_overrides_inherited_entries_when_allowed() {
        let base = HandlerTable::<Base>::new().unwrap();

        let table = HandlerTable::<Child>::subclass(&base, child_projection(), true).unwrap();
        assert_eq!(table.events(), vec!["hit", "name"]);
        assert_eq!(table.get("hit").unwrap().origin(), Origin::Inherited);
        assert_eq!(table.get("name").unwrap().origin(), Origin::Member);

        let err = HandlerTable::<Child>::subclass(&base, child_projection(), false).unwrap_err();
        assert_eq!(err, RegistrationError::Duplicate("name".to_string()));

        // The parent table is untouched.
        assert_eq!(base.get("name").unwrap().origin(), Origin::Member);
    }

    #[test]
    fn register_and_attach_follow_duplicate_rules() {
        let mut table = HandlerTable::<()>::empty();
        table.register(None, standalone::<()>(), false).unwrap();
        assert!(table.contains("echo"));
        assert_eq!(table.get("echo").unwrap().origin(), Origin::Attached);

        assert_eq!(
            table.register(None, standalone::<()>(), false),
            Err(RegistrationError::Duplicate("echo".to_string()))
        );
        table.register(None, standalone::<()>(), true).unwrap();

        table.register(Some("shout"), standalone::<()>(), false).unwrap();
        assert_eq!(table.events(), vec!["echo", "shout"]);
        assert_eq!(
            table.get("shout").unwrap().input_schema().title(),
            "EventMessage_shout"
        );

        assert_eq!(
            table.register(Some("connect"), standalone::<()>(), false),
            Err(RegistrationError::Reserved("connect".to_string()))
        );
    }

    #[test]
    fn registration_errors_surface_from_register() {
        let mut table = HandlerTable::<()>::empty();
        let bad = Handler::<()>::builder("on_").function(|_: Params| async {});
        assert!(matches!(
            table.register(None, bad, false),
            Err(RegistrationError::EmptyName { .. })
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn remove_drops_the_event() {
        let mut table = HandlerTable::<Base>::new().unwrap();
        assert!(table.remove("name").is_some());
        assert!(table.remove("name").is_none());
        assert_eq!(table.events(), vec!["hit"]);
    }

    #[tokio::test]
    async fn bind_gives_each_instance_its_own_methods() {
        let table = HandlerTable::<Base>::new().unwrap();
        let first = Arc::new(Base::default());
        let second = Arc::new(Base::default());
        let live_first = table.bind(&first);
        let live_second = table.bind(&second);

        live_first.dispatch(EventMessage::new("hit")).await.unwrap();
        live_first.dispatch(EventMessage::new("hit")).await.unwrap();
        let out = live_second.dispatch(EventMessage::new("hit")).await.unwrap();

        assert_eq!(out, Some(json!({"type": "hit", "hits": 1})));
        assert_eq!(first.hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn inherited_methods_run_on_the_projected_instance() {
        let base = HandlerTable::<Base>::new().unwrap();
        let table = HandlerTable::<Child>::subclass(&base, child_projection(), true).unwrap();
        let child = Arc::new(Child::default());
        let live = table.bind(&child);

        let out = live.dispatch(EventMessage::new("name")).await.unwrap();
        assert_eq!(out, Some(json!({"type": "name", "name": "child"})));

        live.dispatch(EventMessage::new("hit")).await.unwrap();
        assert_eq!(child.base.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_events_list_permitted_values() {
        let table = HandlerTable::<Base>::new().unwrap();
        let live = table.bind(&Arc::new(Base::default()));

        let err = live.dispatch(EventMessage::new("nope")).await.unwrap_err();
        let HandlerError::Validation(err) = err else {
            panic!("expected validation error");
        };
        assert_eq!(err.errors[0].loc, vec![LocItem::from("type")]);
        assert_eq!(err.errors[0].msg, "unexpected value; permitted: 'hit', 'name'");
        assert_eq!(
            err.errors[0].ctx,
            Some(
                json!({"given": "nope", "permitted": ["hit", "name"]})
                    .as_object()
                    .cloned()
                    .unwrap()
            )
        );
    }

    #[tokio::test]
    async fn registry_snapshots_on_bind() {
        let registry = Registry::<()>::new(HandlerTable::empty());
        registry.register(None, standalone::<()>(), false).unwrap();
        let live = registry.bind(&Arc::new(()));

        registry.remove("echo");
        assert!(!registry.contains("echo"));
        assert_eq!(live.events().collect::<Vec<_>>(), vec!["echo"]);

        let out = live
            .dispatch(EventMessage::new("echo").with("msg", "hi"))
            .await
            .unwrap();
        assert_eq!(out, Some(json!({"type": "echo", "msg": "hi"})));
    }
}
