//! # Diagram Export
//!
//! Serializable snapshot of a machine's structure, behind the `diagram`
//! feature. The snapshot is deliberately plain data: states, hook presence,
//! the registered events and where the machine currently is. Feed it to
//! `serde_json` for tooling or render it however suits the project.

use serde::Serialize;

/// Structure snapshot produced by
/// [`StateMachine::diagram`](crate::StateMachine::diagram).
#[derive(Debug, Clone, Serialize)]
pub struct Diagram {
    /// Every table row, in table order.
    pub states: Vec<StateView>,
    /// Registered events, empty when the machine has no catalog.
    pub events: Vec<EventView>,
    /// `true` once the machine halted.
    pub halted: bool,
}

/// One state as seen from outside.
#[derive(Debug, Clone, Serialize)]
pub struct StateView {
    /// `Debug` rendering of the state identifier.
    pub id: String,
    pub has_entry: bool,
    pub has_exit: bool,
    /// `true` for the current state. All `false` before `set_initial`.
    pub current: bool,
}

/// One registered event.
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub name: String,
    pub bit: u8,
}
