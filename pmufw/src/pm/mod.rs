//! Power Management (pm)
//!
//! The PM core decides which operating state every slave node should be in,
//! given what the masters currently require from it.
//!
//! ## Slave State Negotiation
//! - **Capabilities**: each FSM state offers a set of capability bits
//!   (access, context retention, wake-up, clock, power)
//! - **Requirements**: each master bound to a slave holds a requirement with
//!   the capabilities it was granted and, optionally, a wake-up latency bound
//! - **Update**: the union of all active requirements selects the lowest
//!   power state offering them; the state is escalated if it cannot wake up
//!   within the strictest latency bound
//!
//! ## Transitions
//! A state change first acquires the power parent and clocks the new state
//! needs, then runs the FSM transition action, and finally releases what
//! the previous state held and the new one doesn't.
//!
//! # Usage
//! ```ignore
//! use pmufw::pm;
//!
//! let slaves = pm::pm_slave_init(&SLAVE_TABLE)?;
//! slaves.set_config(NODE_OCM_BANK_0, SharingPolicy::Shareable, APU_IPI | RPU0_IPI, &masters)?;
//! slaves.request_node(NODE_OCM_BANK_0, APU, Capabilities::ACCESS, &mut platform)?;
//! ```

mod caps;
mod fsm;
mod master;
mod node;
mod registry;
mod request;
mod requirement;
mod slave;

#[cfg(test)]
pub(crate) mod test_support;

pub use caps::*;
pub use fsm::*;
pub use master::*;
pub use node::*;
pub use registry::*;
pub use requirement::*;
pub use slave::*;

use core::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// PM node identifier of a slave
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Identifier of a power island/domain acting as a power parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PowerId(pub u32);

/// Index of a state in a slave's FSM (0 = lowest power)
pub type StateId = u8;

// ============================================================================
// Errors
// ============================================================================

/// Status codes reported back to masters
pub mod status {
    pub const XST_FAILURE: u32 = 1;
    pub const XST_NO_FEATURE: u32 = 19;
    pub const XST_PM_CONFLICT: u32 = 2001;
    pub const XST_PM_NO_ACCESS: u32 = 2002;
    pub const XST_PM_INVALID_NODE: u32 = 2003;
    pub const XST_PM_DOUBLE_REQ: u32 = 2004;
    pub const XST_PM_NODE_USED: u32 = 2007;
}

/// PM errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmError {
    /// The slave structurally cannot provide the feature (a negative answer)
    NoFeature,
    /// No single state satisfies all active requirements
    Conflict,
    /// Non-shareable slave is already used by another master
    NodeUsed,
    /// A power/clock request or transition action failed, or the FSM has
    /// no edge for the required move
    TransitionFailed,
    /// Configuration referenced a master that doesn't exist
    ConfigInvalid,
    /// Unknown node, or the registry isn't populated
    InvalidNode,
    /// The master has no requirement bound to the slave
    NoAccess,
    /// The master already uses the slave
    DoubleRequest,
    /// Status code reported by a platform driver
    Platform(u32),
}

impl PmError {
    /// Firmware status code for the IPI response
    pub const fn code(self) -> u32 {
        match self {
            PmError::NoFeature => status::XST_NO_FEATURE,
            PmError::Conflict => status::XST_PM_CONFLICT,
            PmError::NodeUsed => status::XST_PM_NODE_USED,
            PmError::TransitionFailed | PmError::ConfigInvalid => status::XST_FAILURE,
            PmError::InvalidNode => status::XST_PM_INVALID_NODE,
            PmError::NoAccess => status::XST_PM_NO_ACCESS,
            PmError::DoubleRequest => status::XST_PM_DOUBLE_REQ,
            PmError::Platform(code) => code,
        }
    }
}

impl fmt::Display for PmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PmError::NoFeature => f.write_str("feature not supported"),
            PmError::Conflict => f.write_str("conflicting requirements"),
            PmError::NodeUsed => f.write_str("node used by another master"),
            PmError::TransitionFailed => f.write_str("state transition failed"),
            PmError::ConfigInvalid => f.write_str("invalid configuration"),
            PmError::InvalidNode => f.write_str("invalid node"),
            PmError::NoAccess => f.write_str("no access to node"),
            PmError::DoubleRequest => f.write_str("node already requested"),
            PmError::Platform(code) => write!(f, "platform error {}", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(PmError::Conflict.code(), 2001);
        assert_eq!(PmError::NodeUsed.code(), 2007);
        assert_eq!(PmError::NoFeature.code(), 19);
        assert_eq!(PmError::Platform(42).code(), 42);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(alloc::format!("{}", PmError::Conflict), "conflicting requirements");
        assert_eq!(alloc::format!("{}", PmError::Platform(7)), "platform error 7");
        assert_eq!(alloc::format!("{}", NodeId(12)), "node#12");
    }
}
