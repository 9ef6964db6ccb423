//! PM Node Classes and Platform Hooks
//!
//! The slave catalog is a closed set of node kinds. Operations the rest of
//! the firmware performs on any PM node go through [`PmNode`]; everything
//! that touches hardware outside this crate goes through [`PlatformOps`].

use super::{NodeId, PmError, PowerId};

/// Static kind of a slave node
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlaveKind {
    /// Slave with no kind-specific handling
    #[default]
    Generic = 0,
    /// On-chip memory bank (OCM, TCM, L2)
    Sram = 1,
    /// USB controller
    Usb = 2,
    /// Phase-locked loop
    Pll = 3,
    /// Plain peripheral (UART, SPI, I2C, ...)
    Periph = 4,
    /// DDR controller
    Ddr = 5,
    /// GPU pixel processor
    Gpp = 6,
}

/// Collaborators that switch power and clocks
///
/// All calls are synchronous and must return within bounded time; the PM
/// core never retries a failed call.
pub trait PlatformOps {
    /// Ask the power parent to power up on behalf of `node`
    fn request_power_parent(&mut self, node: NodeId, parent: PowerId) -> Result<(), PmError>;

    /// Drop the power claim `node` holds on its parent
    fn release_power_parent(&mut self, node: NodeId, parent: PowerId);

    /// Tell the power parent the latency margin of `node` changed
    fn update_parent_latency(&mut self, node: NodeId, parent: PowerId, margin: u32) -> Result<(), PmError>;

    /// Wake-up latency of the power parent, `None` if it can't report one
    fn parent_wake_up_latency(&self, parent: PowerId) -> Option<u32>;

    /// Enable the clocks of `node`
    fn request_clock(&mut self, node: NodeId) -> Result<(), PmError>;

    /// Disable the clocks of `node`
    fn release_clock(&mut self, node: NodeId);
}

/// Operations shared by every PM node class
pub trait PmNode {
    fn node_id(&self) -> NodeId;

    /// Time for the node to get back to full capability from where it is
    fn wake_up_latency(&self, ops: &dyn PlatformOps) -> Result<u32, PmError>;

    /// Power consumption in the current state
    fn power_data(&self) -> Result<u32, PmError>;

    /// Drop all users and put the node in its lowest power state
    fn force_down(&mut self, ops: &mut dyn PlatformOps) -> Result<(), PmError>;

    /// Forget the configuration (users and policy)
    fn clear_config(&mut self);
}
