//! Composable capability mixins for plain Rust types
//!
//! This crate provides three small, independent building blocks that a host
//! type composes by embedding:
//!
//! - [`Chain`] — a private ordered queue of callbacks consumed one per call
//! - [`Events`] — a per-instance publish/subscribe listener registry
//! - [`Options`] — shallow configuration merging over per-instance defaults,
//!   with `onEventName`-convention handlers auto-registered into any
//!   [`EventSink`]
//!
//! All operations are synchronous, run to completion, and tolerate missing
//! state (firing an unknown event or advancing an empty chain is a no-op,
//! not an error). Callback payloads are `serde_json::Value`.
//!
//! ## Usage
//!
//! ```
//! use alloy::{Events, OptionMap, Options, OptionValue};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut events = Events::new();
//! let mut options = Options::with_defaults(OptionMap::from([
//!     ("retries".to_string(), OptionValue::Value(json!(3))),
//!     (
//!         "onComplete".to_string(),
//!         OptionValue::Handler(Arc::new(|_, _| None)),
//!     ),
//! ]));
//!
//! // Merge caller config and wire up convention-named handlers.
//! options.set_options_with(
//!     OptionMap::from([("retries".to_string(), OptionValue::Value(json!(5)))]),
//!     &mut events,
//! );
//!
//! assert_eq!(
//!     options.get_option("retries").and_then(OptionValue::as_value),
//!     Some(&json!(5))
//! );
//! assert_eq!(events.listener_count("complete"), 1);
//! events.fire_event("complete", &[json!("done")]);
//! ```

mod chain;
mod events;
mod options;

pub use chain::{Chain, ChainFn};
pub use events::{EventSink, Events, Listener};
pub use options::{option_map_from_json, OptionMap, OptionValue, Options};
