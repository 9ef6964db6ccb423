//! Slave State Machines
//!
//! A slave FSM is static data: an ordered list of states (by capabilities)
//! and the set of direct transitions between them.
//!
//! States are ordered by power cost. State 0 consumes the least power and
//! the last state the most; the state search below relies on that order.

use core::fmt;

use super::{Capabilities, NodeId, PmError, SlaveKind, StateId};

/// Hardware action executed when a slave moves along an FSM edge
///
/// Implemented by the slave drivers (SRAM retention control, PLL reset,
/// peripheral reset lines, ...). Called only for an exactly matching
/// `from -> to` edge.
pub trait TransitionAction: Sync {
    fn enter_state(
        &self,
        node: NodeId,
        kind: SlaveKind,
        from: StateId,
        to: StateId,
    ) -> Result<(), PmError>;
}

/// Direct transition between two states
#[derive(Clone, Copy)]
pub struct Transition {
    /// Source state
    pub from: StateId,
    /// Destination state
    pub to: StateId,
    /// Wake-up latency (us). For edges into the highest state this is the
    /// cost of leaving `from`.
    pub latency: u32,
    /// Optional hardware action
    pub action: Option<&'static dyn TransitionAction>,
}

impl Transition {
    pub const fn new(from: StateId, to: StateId, latency: u32) -> Self {
        Self {
            from,
            to,
            latency,
            action: None,
        }
    }

    pub const fn with_action(from: StateId, to: StateId, latency: u32, action: &'static dyn TransitionAction) -> Self {
        Self {
            from,
            to,
            latency,
            action: Some(action),
        }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("latency", &self.latency)
            .field("action", &self.action.is_some())
            .finish()
    }
}

/// Slave finite state machine
#[derive(Debug)]
pub struct SlaveFsm {
    /// Capabilities of each state, lowest power first
    pub states: &'static [Capabilities],
    /// Direct transitions (unordered)
    pub transitions: &'static [Transition],
    /// Power consumption of each state, empty if unknown
    pub power_info: &'static [u32],
}

impl SlaveFsm {
    pub const fn new(states: &'static [Capabilities], transitions: &'static [Transition]) -> Self {
        Self {
            states,
            transitions,
            power_info: &[],
        }
    }

    pub const fn with_power_info(
        states: &'static [Capabilities],
        transitions: &'static [Transition],
        power_info: &'static [u32],
    ) -> Self {
        Self {
            states,
            transitions,
            power_info,
        }
    }

    #[inline]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Highest power state
    #[inline]
    pub fn highest_state(&self) -> StateId {
        self.states.len().saturating_sub(1) as StateId
    }

    /// Capabilities of `state`, empty for an unknown state
    #[inline]
    pub fn caps(&self, state: StateId) -> Capabilities {
        self.states
            .get(usize::from(state))
            .copied()
            .unwrap_or(Capabilities::empty())
    }

    #[inline]
    pub fn has_caps(&self, state: StateId, caps: Capabilities) -> bool {
        self.caps(state).offers(caps)
    }

    /// Lowest power state offering all of `caps`
    pub fn state_with_caps(&self, caps: Capabilities) -> Option<StateId> {
        self.states
            .iter()
            .position(|state| state.offers(caps))
            .map(|i| i as StateId)
    }

    /// Latency of the direct transition from `state` to the highest state
    ///
    /// Zero when the table has no such edge.
    pub fn latency_from_state(&self, state: StateId) -> u32 {
        let highest = self.highest_state();
        self.transitions
            .iter()
            .find(|t| t.from == state && t.to == highest)
            .map_or(0, |t| t.latency)
    }

    /// First state at or above `start` that offers `caps` and wakes up
    /// within `max_latency`
    pub fn constrain_by_latency(&self, start: StateId, caps: Capabilities, max_latency: u32) -> Option<StateId> {
        (usize::from(start)..self.states.len())
            .map(|i| i as StateId)
            .find(|&state| self.caps(state).offers(caps) && self.latency_from_state(state) <= max_latency)
    }

    /// Edge for an exact `from -> to` move
    pub fn find_transition(&self, from: StateId, to: StateId) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.from == from && t.to == to)
    }

    /// Power consumption in `state`, if the table has one
    pub fn power_of(&self, state: StateId) -> Option<u32> {
        self.power_info.get(usize::from(state)).copied()
    }

    /// Check that every transition refers to an existing state
    pub fn is_consistent(&self) -> bool {
        let count = self.states.len();
        count > 0
            && count <= usize::from(StateId::MAX) + 1
            && self
                .transitions
                .iter()
                .all(|t| usize::from(t.from) < count && usize::from(t.to) < count)
    }
}
