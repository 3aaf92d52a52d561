//! Publish/subscribe listener registry.
//!
//! An [`Events`] value maps event names to ordered listener lists. Listeners
//! are invoked in registration order, receive the owning registry as their
//! first argument (so they can add or remove listeners mid-fire), and are
//! identified by `Arc` pointer, not by behavior.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Listener callback registered with an [`Events`] registry.
///
/// The `&mut Events` parameter is the registry the listener was fired from,
/// letting a listener unregister itself or a sibling during the fire.
pub type Listener = Arc<dyn Fn(&mut Events, &[Value]) -> Option<Value> + Send + Sync>;

/// Anything that can accept listener registrations.
///
/// This is the capability seam consumed by the options mixin: it needs to
/// register convention-named handlers without caring what the concrete
/// event registry looks like.
pub trait EventSink {
    /// Register `listener` under `name`.
    fn add_listener(&mut self, name: &str, listener: Listener);
}

/// Per-instance event registry.
///
/// Listener lists preserve insertion order and allow the same `Arc` to be
/// registered more than once. Removal matches by `Arc::ptr_eq` and takes the
/// first occurrence only.
#[derive(Default)]
pub struct Events {
    table: HashMap<String, Vec<Listener>>,
}

impl Events {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure as a listener for `name`.
    pub fn on<F>(&mut self, name: impl Into<String>, listener: F) -> &mut Self
    where
        F: Fn(&mut Events, &[Value]) -> Option<Value> + Send + Sync + 'static,
    {
        self.add_event(name, Arc::new(listener))
    }

    /// Append `listener` to the list for `name`, creating it on first use.
    pub fn add_event(&mut self, name: impl Into<String>, listener: Listener) -> &mut Self {
        let name = name.into();
        let listeners = self.table.entry(name.clone()).or_default();
        listeners.push(listener);
        tracing::trace!(event = %name, listeners = listeners.len(), "listener added");
        self
    }

    /// Register every `(name, listener)` pair in `entries`.
    pub fn add_events<I>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = (String, Listener)>,
    {
        for (name, listener) in entries {
            self.add_event(name, listener);
        }
        self
    }

    /// Remove the first occurrence of `listener` from `name`'s list.
    ///
    /// Matches by pointer identity. No-op when the event or the listener is
    /// absent.
    pub fn remove_event(&mut self, name: &str, listener: &Listener) -> &mut Self {
        let Some(listeners) = self.table.get_mut(name) else {
            tracing::debug!(event = name, "remove_event on unknown event");
            return self;
        };
        match listeners.iter().position(|l| Arc::ptr_eq(l, listener)) {
            Some(index) => {
                listeners.remove(index);
                tracing::trace!(event = name, remaining = listeners.len(), "listener removed");
            }
            None => tracing::debug!(event = name, "remove_event on unregistered listener"),
        }
        self
    }

    /// Drop every listener registered for `name`.
    pub fn remove_events(&mut self, name: &str) -> &mut Self {
        if self.table.remove(name).is_some() {
            tracing::trace!(event = name, "event cleared");
        }
        self
    }

    /// Remove every `(name, listener)` pair in `entries`, symmetric to
    /// [`Events::add_events`].
    pub fn remove_event_set<I>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = (String, Listener)>,
    {
        for (name, listener) in entries {
            self.remove_event(&name, &listener);
        }
        self
    }

    /// Drop the whole registry: every event name, every listener.
    pub fn clear(&mut self) -> &mut Self {
        self.table.clear();
        tracing::trace!("all events cleared");
        self
    }

    /// Invoke every listener currently registered for `name`, in
    /// registration order, each with `args`.
    ///
    /// Iterates a snapshot taken at fire time, skipping entries that were
    /// unregistered before their turn. A listener may therefore remove
    /// itself or a not-yet-reached sibling mid-fire without perturbing the
    /// rest of the fire.
    pub fn fire_event(&mut self, name: &str, args: &[Value]) -> &mut Self {
        let snapshot = match self.table.get(name) {
            Some(listeners) => listeners.clone(),
            None => {
                tracing::debug!(event = name, "fire_event with no listeners");
                return self;
            }
        };
        tracing::debug!(event = name, listeners = snapshot.len(), "firing event");
        for listener in snapshot {
            let still_registered = self
                .table
                .get(name)
                .is_some_and(|l| l.iter().any(|x| Arc::ptr_eq(x, &listener)));
            if !still_registered {
                continue;
            }
            listener(self, args);
        }
        self
    }

    /// Fire each named event in order, with no arguments.
    pub fn fire_events<I>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for name in names {
            self.fire_event(name.as_ref(), &[]);
        }
        self
    }

    /// Number of listeners currently registered for `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.table.get(name).map_or(0, Vec::len)
    }

    /// Whether `name` has at least one registered listener.
    pub fn has_listeners(&self, name: &str) -> bool {
        self.listener_count(name) > 0
    }
}

impl EventSink for Events {
    fn add_listener(&mut self, name: &str, listener: Listener) {
        self.add_event(name, listener);
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<_> = self
            .table
            .iter()
            .map(|(name, listeners)| (name.as_str(), listeners.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("Events").field("listeners", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn counting_listener(counter: &Arc<AtomicUsize>) -> Listener {
        let counter = Arc::clone(counter);
        Arc::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        })
    }

    #[test]
    fn adds_an_event() {
        let called = Arc::new(AtomicUsize::new(0));
        let mut events = Events::new();
        events.add_event("event", counting_listener(&called));
        events.fire_event("event", &[]);
        assert_eq!(called.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn adds_multiple_events() {
        let called = Arc::new(AtomicUsize::new(0));
        let listener = counting_listener(&called);
        let mut events = Events::new();
        events.add_events([
            ("event1".to_string(), Arc::clone(&listener)),
            ("event2".to_string(), listener),
        ]);
        events.fire_events(["event1", "event2"]);
        assert_eq!(called.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn removes_a_specific_listener() {
        let called = Arc::new(AtomicUsize::new(0));
        let x = Arc::new(AtomicUsize::new(0));
        let shared = counting_listener(&called);
        let mut events = Events::new();
        events.add_event("event", Arc::clone(&shared));
        events.add_event("event", counting_listener(&x));
        events.remove_event("event", &shared);
        events.fire_event("event", &[]);
        assert_eq!(x.load(Ordering::SeqCst), 1);
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn removes_an_event_and_its_listeners() {
        let called = Arc::new(AtomicUsize::new(0));
        let x = Arc::new(AtomicUsize::new(0));
        let mut events = Events::new();
        events.add_event("event", counting_listener(&called));
        events.add_event("event", counting_listener(&x));
        events.remove_events("event");
        events.fire_event("event", &[]);
        assert_eq!(x.load(Ordering::SeqCst), 0);
        assert_eq!(called.load(Ordering::SeqCst), 0);
        assert!(!events.has_listeners("event"));
    }

    #[test]
    fn removes_all_events() {
        let called = Arc::new(AtomicUsize::new(0));
        let x = Arc::new(AtomicUsize::new(0));
        let mut events = Events::new();
        events.add_event("event1", counting_listener(&called));
        events.add_event("event2", counting_listener(&x));
        events.clear();
        events.fire_events(["event1", "event2"]);
        assert_eq!(x.load(Ordering::SeqCst), 0);
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn removes_events_with_a_mapping() {
        let called = Arc::new(AtomicUsize::new(0));
        let shared = counting_listener(&called);
        let set = || {
            [
                ("event1".to_string(), Arc::clone(&shared)),
                ("event2".to_string(), Arc::clone(&shared)),
            ]
        };

        let mut events = Events::new();
        events
            .add_event("event1", counting_listener(&called))
            .add_events(set());
        events.fire_event("event1", &[]);
        assert_eq!(called.load(Ordering::SeqCst), 2);

        events.remove_event_set(set());
        events.fire_event("event1", &[]);
        assert_eq!(called.load(Ordering::SeqCst), 3);
        events.fire_event("event2", &[]);
        assert_eq!(called.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn listener_can_remove_itself_during_firing() {
        let called = Arc::new(AtomicUsize::new(0));
        let mut events = Events::new();
        events.add_event("event", counting_listener(&called));

        // The listener needs a handle to its own Arc to unregister itself.
        let slot: Arc<Mutex<Option<Listener>>> = Arc::new(Mutex::new(None));
        let self_removing: Listener = {
            let called = Arc::clone(&called);
            let slot = Arc::clone(&slot);
            Arc::new(move |ev, _| {
                called.fetch_add(1, Ordering::SeqCst);
                let me = slot.lock().unwrap().clone().unwrap();
                ev.remove_event("event", &me);
                None
            })
        };
        *slot.lock().unwrap() = Some(Arc::clone(&self_removing));
        events.add_event("event", self_removing);
        events.add_event("event", counting_listener(&called));

        events.fire_event("event", &[]).fire_event("event", &[]);
        assert_eq!(called.load(Ordering::SeqCst), 5);
        assert_eq!(events.listener_count("event"), 2);
    }

    #[test]
    fn listener_removed_before_its_turn_is_not_invoked() {
        let reached = Arc::new(AtomicUsize::new(0));
        let removed = Arc::new(AtomicUsize::new(0));
        let doomed = counting_listener(&removed);
        let doomed_handle = Arc::clone(&doomed);

        let mut events = Events::new();
        events.on("event", move |ev, _| {
            ev.remove_event("event", &doomed_handle);
            None
        });
        events.add_event("event", counting_listener(&reached));
        events.add_event("event", doomed);

        events.fire_event("event", &[]);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
        assert_eq!(removed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn forwards_arguments_positionally() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut events = Events::new();
        {
            let seen = Arc::clone(&seen);
            events.on("event", move |_, args| {
                seen.lock().unwrap().push(args.to_vec());
                None
            });
        }
        events.fire_event("event", &[json!("a"), json!(2)]);
        assert_eq!(*seen.lock().unwrap(), [vec![json!("a"), json!(2)]]);
    }

    #[test]
    fn missing_state_is_tolerated() {
        let called = Arc::new(AtomicUsize::new(0));
        let absent = counting_listener(&called);
        let mut events = Events::new();
        events
            .fire_event("nope", &[])
            .remove_event("nope", &absent)
            .remove_events("nope");
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    proptest! {
        #[test]
        fn fires_in_registration_order(count in 0usize..10) {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut events = Events::new();
            for i in 0..count {
                let log = Arc::clone(&log);
                events.on("event", move |_, _| {
                    log.lock().unwrap().push(i);
                    None
                });
            }
            events.fire_event("event", &[]);
            let fired = log.lock().unwrap().clone();
            prop_assert_eq!(fired, (0..count).collect::<Vec<_>>());
        }
    }
}
