//! Configuration merging with convention-based handler registration.
//!
//! [`Options`] shallow-merges supplied configuration over per-instance
//! defaults. When the host also carries an event registry, keys following
//! the `on` + `CapitalizedName` convention (for example `onComplete`) are
//! registered as listeners for the derived event name (`complete`) in
//! addition to living in the options map.

use crate::events::{EventSink, Listener};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A single configuration entry: either plain data or a callable handler.
///
/// The split is what keeps non-callable values out of the event registry;
/// only [`OptionValue::Handler`] entries are ever registered.
#[derive(Clone)]
pub enum OptionValue {
    /// Plain configuration data.
    Value(Value),
    /// A callable handler, eligible for convention-based registration.
    Handler(Listener),
}

impl OptionValue {
    /// The plain value, if this entry holds one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Handler(_) => None,
        }
    }

    /// The handler, if this entry holds one.
    pub fn as_handler(&self) -> Option<&Listener> {
        match self {
            Self::Value(_) => None,
            Self::Handler(listener) => Some(listener),
        }
    }

    /// Whether this entry is a callable handler.
    pub fn is_handler(&self) -> bool {
        matches!(self, Self::Handler(_))
    }
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

impl PartialEq for OptionValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            // Handlers are opaque callables; identity is the only equality.
            (Self::Handler(a), Self::Handler(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Value> for OptionValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Listener> for OptionValue {
    fn from(listener: Listener) -> Self {
        Self::Handler(listener)
    }
}

/// Option key to entry mapping.
pub type OptionMap = HashMap<String, OptionValue>;

/// Build an [`OptionMap`] of plain values from a JSON object.
///
/// Non-object input yields an empty map.
pub fn option_map_from_json(value: Value) -> OptionMap {
    match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| (key, OptionValue::Value(value)))
            .collect(),
        other => {
            tracing::debug!(?other, "option_map_from_json expects an object");
            OptionMap::new()
        }
    }
}

/// Per-instance configuration store.
///
/// Live values are seeded from the defaults given at construction; each
/// [`Options::set_options`] call shallow-merges on top of them, so keys set
/// by an earlier call survive later calls that do not touch them.
#[derive(Debug, Default)]
pub struct Options {
    defaults: OptionMap,
    values: OptionMap,
}

impl Options {
    /// Create a store with no defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose live values start as a copy of `defaults`.
    pub fn with_defaults(defaults: OptionMap) -> Self {
        Self {
            values: defaults.clone(),
            defaults,
        }
    }

    /// Shallow-merge `config` over the live values.
    pub fn set_options(&mut self, config: OptionMap) -> &mut Self {
        self.merge(config);
        self
    }

    /// Shallow-merge `config`, then register every convention-named handler
    /// in the merged result with `sink`.
    ///
    /// Every key of the form `on` + uppercase letter whose entry is a
    /// [`OptionValue::Handler`] is registered under the derived event name
    /// (`onEvent1` registers for `event1`). Registration covers the whole
    /// merged map on every call and never deduplicates, so repeated calls
    /// accumulate listeners. Handlers also stay in the options map.
    pub fn set_options_with<S: EventSink>(&mut self, config: OptionMap, sink: &mut S) -> &mut Self {
        self.merge(config);
        for (key, entry) in &self.values {
            let Some(event) = handler_event_name(key) else {
                continue;
            };
            match entry {
                OptionValue::Handler(listener) => {
                    tracing::trace!(option = %key, event = %event, "registering option handler");
                    sink.add_listener(&event, Arc::clone(listener));
                }
                OptionValue::Value(_) => {
                    tracing::debug!(option = %key, "handler-named option holds a plain value, skipped");
                }
            }
        }
        self
    }

    /// Current value for `key`, or `None` when absent.
    pub fn get_option(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    /// The defaults this store was constructed with.
    pub fn defaults(&self) -> &OptionMap {
        &self.defaults
    }

    fn merge(&mut self, config: OptionMap) {
        tracing::debug!(keys = config.len(), "merging options");
        self.values.extend(config);
    }
}

/// Derive the event name from a `on` + `CapitalizedName` option key.
///
/// Only the leading letter is lowercased: `onEvent1` becomes `event1`,
/// `onMyEvent` becomes `myEvent`. Keys like `once` or a bare `on` do not
/// match the convention.
fn handler_event_name(key: &str) -> Option<String> {
    let rest = key.strip_prefix("on")?;
    let first = rest.chars().next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    let mut event = first.to_ascii_lowercase().to_string();
    event.push_str(&rest[1..]);
    Some(event)
}
