use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{ChartError, ChartResult};

pub const DEFAULT_MAX_EVENT_DEPTH: usize = 16;

/// Owner tag for subscriptions registered by the embedding application.
pub const HOST_OWNER: &str = "host";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

type Handler = Rc<dyn Fn(&Value) -> ChartResult<()>>;

struct Subscription {
    id: SubscriptionId,
    event: String,
    owner: String,
    handler: Handler,
}

struct BusInner {
    subscriptions: Vec<Subscription>,
    next_id: u64,
    depth: usize,
    max_depth: usize,
}

/// Synchronous publish/subscribe channel scoped to one facade.
///
/// Handlers run on the emitting call, in registration order, before `emit`
/// returns. Handlers may emit again; nesting deeper than `max_depth` fails
/// with `ReentrancyLimitExceeded`. Clones share the same subscriptions.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_max_depth(DEFAULT_MAX_EVENT_DEPTH)
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                subscriptions: Vec::new(),
                next_id: 0,
                depth: 0,
                max_depth: max_depth.max(1),
            })),
        }
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.inner.borrow().max_depth
    }

    pub fn set_max_depth(&self, max_depth: usize) -> ChartResult<()> {
        if max_depth == 0 {
            return Err(ChartError::InvalidData(
                "event re-entrancy depth must be >= 1".to_owned(),
            ));
        }
        self.inner.borrow_mut().max_depth = max_depth;
        Ok(())
    }

    pub fn on(
        &self,
        event: impl Into<String>,
        handler: impl Fn(&Value) -> ChartResult<()> + 'static,
    ) -> SubscriptionId {
        self.on_owned(HOST_OWNER, event, handler)
    }

    /// Registers a handler tagged with `owner` so it can be removed in bulk.
    pub fn on_owned(
        &self,
        owner: impl Into<String>,
        event: impl Into<String>,
        handler: impl Fn(&Value) -> ChartResult<()> + 'static,
    ) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_id);
        inner.next_id = inner.next_id.wrapping_add(1);
        inner.subscriptions.push(Subscription {
            id,
            event: event.into(),
            owner: owner.into(),
            handler: Rc::new(handler),
        });
        id
    }

    /// Returns `true` when the subscription existed.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.subscriptions.len();
        inner.subscriptions.retain(|sub| sub.id != id);
        let removed = inner.subscriptions.len() != before;
        if !removed {
            debug!(subscription = id.raw(), "unsubscribe of unknown subscription");
        }
        removed
    }

    /// Removes every subscription registered by `owner`; returns the count.
    pub fn off_owner(&self, owner: &str) -> usize {
        let mut inner = self.inner.borrow_mut();
        let before = inner.subscriptions.len();
        inner.subscriptions.retain(|sub| sub.owner != owner);
        before - inner.subscriptions.len()
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().subscriptions.clear();
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.borrow().subscriptions.len()
    }

    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.inner
            .borrow()
            .subscriptions
            .iter()
            .filter(|sub| sub.event == event)
            .count()
    }

    #[must_use]
    pub fn owner_count(&self, owner: &str) -> usize {
        self.inner
            .borrow()
            .subscriptions
            .iter()
            .filter(|sub| sub.owner == owner)
            .count()
    }

    /// Dispatches `payload` to every handler of `event`; returns how many ran.
    ///
    /// The first handler error aborts the dispatch and is returned.
    pub fn emit(&self, event: &str, payload: &Value) -> ChartResult<usize> {
        let handlers: Vec<(SubscriptionId, Handler)> = {
            let mut inner = self.inner.borrow_mut();
            if inner.depth >= inner.max_depth {
                return Err(ChartError::ReentrancyLimitExceeded {
                    event: event.to_owned(),
                    limit: inner.max_depth,
                });
            }
            inner.depth += 1;
            inner
                .subscriptions
                .iter()
                .filter(|sub| sub.event == event)
                .map(|sub| (sub.id, Rc::clone(&sub.handler)))
                .collect()
        };
        let _depth = DepthGuard {
            inner: Rc::clone(&self.inner),
        };

        let mut delivered = 0;
        for (id, handler) in handlers {
            if !self.is_live(id) {
                continue;
            }
            handler(payload)?;
            delivered += 1;
        }
        trace!(event, delivered, "event dispatched");
        Ok(delivered)
    }

    pub fn emit_serialized<T: Serialize>(&self, event: &str, payload: &T) -> ChartResult<usize> {
        let payload = serde_json::to_value(payload).map_err(|e| {
            ChartError::InvalidData(format!("failed to serialize `{event}` payload: {e}"))
        })?;
        self.emit(event, &payload)
    }

    fn is_live(&self, id: SubscriptionId) -> bool {
        self.inner
            .borrow()
            .subscriptions
            .iter()
            .any(|sub| sub.id == id)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventBus")
            .field("subscriptions", &inner.subscriptions.len())
            .field("depth", &inner.depth)
            .field("max_depth", &inner.max_depth)
            .finish()
    }
}

struct DepthGuard {
    inner: Rc<RefCell<BusInner>>,
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.depth = inner.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::{Value, json};

    use super::EventBus;
    use crate::error::ChartError;

    #[test]
    fn handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let seen = Rc::clone(&seen);
            bus.on("node:hover", move |_| {
                seen.borrow_mut().push(label);
                Ok(())
            });
        }

        let delivered = bus.emit("node:hover", &Value::Null).expect("emit");

        assert_eq!(delivered, 3);
        assert_eq!(*seen.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn off_owner_removes_only_that_owner() {
        let bus = EventBus::new();
        bus.on_owned("focus", "node:hover", |_| Ok(()));
        bus.on_owned("focus", "node:out", |_| Ok(()));
        bus.on("node:hover", |_| Ok(()));

        assert_eq!(bus.off_owner("focus"), 2);
        assert_eq!(bus.subscription_count(), 1);
        assert_eq!(bus.handler_count("node:hover"), 1);
    }

    #[test]
    fn unbounded_re_emission_hits_depth_limit() {
        let bus = EventBus::with_max_depth(4);
        let calls = Rc::new(RefCell::new(0_usize));
        let echo = bus.clone();
        let counter = Rc::clone(&calls);
        bus.on("ping", move |payload| {
            *counter.borrow_mut() += 1;
            echo.emit("ping", payload).map(|_| ())
        });

        let err = bus.emit("ping", &json!(1)).expect_err("must hit the limit");

        assert!(matches!(
            err,
            ChartError::ReentrancyLimitExceeded { ref event, limit: 4 } if event == "ping"
        ));
        assert_eq!(*calls.borrow(), 4);
        // Depth unwinds after the failure, so a fresh bounded emit works.
        bus.clear();
        assert_eq!(bus.emit("ping", &json!(1)).expect("emit"), 0);
    }

    #[test]
    fn bounded_re_emission_is_allowed() {
        let bus = EventBus::with_max_depth(3);
        let inner_bus = bus.clone();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        bus.on("outer", move |_| inner_bus.emit("inner", &json!(2)).map(|_| ()));
        bus.on("inner", move |payload| {
            log.borrow_mut().push(payload.clone());
            Ok(())
        });

        bus.emit("outer", &json!(1)).expect("nested emit");

        assert_eq!(*seen.borrow(), vec![json!(2)]);
    }

    #[test]
    fn handler_removed_mid_dispatch_does_not_fire() {
        let bus = EventBus::new();
        let fired = Rc::new(RefCell::new(false));
        let remover = bus.clone();
        let victim_id = Rc::new(RefCell::new(None));
        let victim_slot = Rc::clone(&victim_id);
        bus.on("tick", move |_| {
            if let Some(id) = *victim_slot.borrow() {
                remover.off(id);
            }
            Ok(())
        });
        let flag = Rc::clone(&fired);
        let id = bus.on("tick", move |_| {
            *flag.borrow_mut() = true;
            Ok(())
        });
        *victim_id.borrow_mut() = Some(id);

        assert_eq!(bus.emit("tick", &Value::Null).expect("emit"), 1);
        assert!(!*fired.borrow());
    }

    #[test]
    fn zero_depth_is_rejected() {
        assert!(EventBus::new().set_max_depth(0).is_err());
    }
}
