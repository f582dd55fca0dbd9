//! Signal Capability
//!
//! [`Signal`] is what every readable node has in common: a current value,
//! an accessor that funnels reads through the node's own tracking logic, a
//! write accessor that only sources accept, and coercions of the value to
//! text, numbers and JSON.
//!
//! Coercions are pass-throughs. They read the value the same way [`get`]
//! does (so they subscribe when called inside a computed or effect) and
//! render it through its natural representation.
//!
//! [`get`]: Signal::get

use std::fmt::Display;

use serde::Serialize;

use crate::error::Result;
use crate::graph::{NodeId, NodeKind};

/// A readable reactive value.
pub trait Signal<T> {
    /// The node's id.
    fn id(&self) -> NodeId;

    /// Which kind of node backs this handle.
    fn kind(&self) -> NodeKind;

    /// Read the current value, registering a dependency when a computed or
    /// effect is being evaluated.
    fn get(&self) -> T;

    /// Assign a new value.
    ///
    /// Sources accept the write. Derived nodes reject it with
    /// [`SignalError::InvalidMutation`](crate::SignalError::InvalidMutation)
    /// and are left untouched.
    fn try_set(&self, value: T) -> Result<()>;

    /// The value rendered as text.
    fn to_text(&self) -> String
    where
        T: Display,
    {
        self.get().to_string()
    }

    /// The value as a JSON document.
    fn to_json(&self) -> Result<serde_json::Value>
    where
        T: Serialize,
    {
        Ok(serde_json::to_value(self.get())?)
    }

    /// The value as a number, or `None` if it does not serialize to one.
    fn to_number(&self) -> Option<f64>
    where
        T: Serialize,
    {
        self.to_json().ok()?.as_f64()
    }
}
