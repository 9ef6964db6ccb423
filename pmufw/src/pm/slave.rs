//! PM Slave Nodes
//!
//! A slave is a hardware block whose state is negotiated between masters:
//! memories, peripherals, PLLs. Its state only changes as the outcome of an
//! update, which aggregates the requirements of all current users.

use alloc::vec::Vec;
use log::{debug, warn};

use super::{
    Capabilities, Master, MasterDirectory, MasterId, NodeId, PlatformOps, PmError, PmNode, PowerId,
    Requirement, RequirementLedger, SlaveFsm, SlaveKind, StateId,
};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SlaveFlags: u8 {
        /// More than one master may use the slave at a time
        const SHAREABLE = 0x01;
    }
}

/// Usage policy set by the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SharingPolicy {
    #[default]
    Exclusive,
    Shareable,
}

/// Who is using a slave, from the point of view of one master
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageStatus {
    /// No master uses the slave
    None = 0,
    /// Only the asking master uses the slave
    SelfOnly = 1,
    /// Only other masters use the slave
    OthersOnly = 2,
    /// The asking master and at least one other master use the slave
    Both = 3,
}

impl UsageStatus {
    const CURRENT_MASTER: u32 = 0x1;
    const OTHER_MASTER: u32 = 0x2;

    fn from_bits(bits: u32) -> Self {
        match bits & (Self::CURRENT_MASTER | Self::OTHER_MASTER) {
            Self::CURRENT_MASTER => UsageStatus::SelfOnly,
            Self::OTHER_MASTER => UsageStatus::OthersOnly,
            0 => UsageStatus::None,
            _ => UsageStatus::Both,
        }
    }
}

/// GIC proxy wake line of a slave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GicWake {
    /// GIC proxy group
    pub group: u8,
    /// Bit in the group
    pub mask: u32,
}

// ============================================================================
// Static Description
// ============================================================================

/// Static description of a slave, the registry is built from these
#[derive(Debug, Clone, Copy)]
pub struct SlaveDesc {
    pub id: NodeId,
    pub name: &'static str,
    pub kind: SlaveKind,
    pub fsm: &'static SlaveFsm,
    /// State the hardware is in after boot
    pub initial_state: StateId,
    pub parent: Option<PowerId>,
    /// Slave has clocks controlled by the PM
    pub clocks: bool,
    pub wake: Option<GicWake>,
}

impl SlaveDesc {
    pub const fn new(id: NodeId, name: &'static str, kind: SlaveKind, fsm: &'static SlaveFsm) -> Self {
        Self {
            id,
            name,
            kind,
            fsm,
            initial_state: 0,
            parent: None,
            clocks: false,
            wake: None,
        }
    }

    pub const fn with_parent(mut self, parent: PowerId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub const fn with_clocks(mut self) -> Self {
        self.clocks = true;
        self
    }

    pub const fn with_wake(mut self, wake: GicWake) -> Self {
        self.wake = Some(wake);
        self
    }

    pub const fn with_state(mut self, state: StateId) -> Self {
        self.initial_state = state;
        self
    }
}

// ============================================================================
// Slave
// ============================================================================

/// Runtime state of a slave node
#[derive(Debug)]
pub struct Slave {
    id: NodeId,
    name: &'static str,
    kind: SlaveKind,
    fsm: &'static SlaveFsm,
    curr_state: StateId,
    /// Slack between the strictest latency bound and the wake-up latency
    /// of the current state, as of the last successful update
    latency_margin: u32,
    flags: SlaveFlags,
    parent: Option<PowerId>,
    clocks: bool,
    wake: Option<GicWake>,
    requirements: RequirementLedger,
}

impl Slave {
    pub fn from_desc(desc: &SlaveDesc) -> Self {
        Self {
            id: desc.id,
            name: desc.name,
            kind: desc.kind,
            fsm: desc.fsm,
            curr_state: desc.initial_state,
            latency_margin: super::MAX_LATENCY,
            flags: SlaveFlags::empty(),
            parent: desc.parent,
            clocks: desc.clocks,
            wake: desc.wake,
            requirements: RequirementLedger::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn kind(&self) -> SlaveKind {
        self.kind
    }

    #[inline]
    pub fn current_state(&self) -> StateId {
        self.curr_state
    }

    #[inline]
    pub fn latency_margin(&self) -> u32 {
        self.latency_margin
    }

    #[inline]
    pub fn flags(&self) -> SlaveFlags {
        self.flags
    }

    #[inline]
    pub fn is_shareable(&self) -> bool {
        self.flags.contains(SlaveFlags::SHAREABLE)
    }

    pub fn requirements(&self) -> &RequirementLedger {
        &self.requirements
    }

    pub fn requirement(&self, master: MasterId) -> Option<&Requirement> {
        self.requirements.get(master)
    }

    pub(crate) fn requirement_mut(&mut self, master: MasterId) -> Option<&mut Requirement> {
        self.requirements.get_mut(master)
    }

    // ------------------------------------------------------------------------
    // Aggregation
    // ------------------------------------------------------------------------

    /// Union of the capabilities granted to all current users
    pub fn max_capabilities(&self) -> Capabilities {
        self.requirements
            .active()
            .fold(Capabilities::empty(), |caps, req| caps | req.caps())
    }

    /// Strictest latency bound set by any master, `MAX_LATENCY` if none
    pub fn min_requested_latency(&self) -> u32 {
        self.requirements
            .iter()
            .filter(|req| req.has_latency())
            .map(Requirement::latency)
            .min()
            .unwrap_or(super::MAX_LATENCY)
    }

    // ------------------------------------------------------------------------
    // State selection
    // ------------------------------------------------------------------------

    /// Check whether some state of the slave offers `caps`
    pub fn check_capabilities(&self, caps: Capabilities) -> Result<(), PmError> {
        self.fsm
            .state_with_caps(caps)
            .map(|_| ())
            .ok_or(PmError::NoFeature)
    }

    /// Lowest power state offering `caps`
    ///
    /// Each master's capabilities are validated when requested, but their
    /// union may still not exist in any single state. That conflict is
    /// between the masters and is reported back to them.
    pub fn state_with_caps(&self, caps: Capabilities) -> Result<StateId, PmError> {
        self.fsm.state_with_caps(caps).ok_or(PmError::Conflict)
    }

    /// Latency of going from `state` to the highest state
    #[inline]
    pub fn latency_from_state(&self, state: StateId) -> u32 {
        self.fsm.latency_from_state(state)
    }

    /// First state from `start` upwards with `caps` that meets `max_latency`
    pub fn constrain_by_latency(
        &self,
        start: StateId,
        caps: Capabilities,
        max_latency: u32,
    ) -> Result<StateId, PmError> {
        self.fsm
            .constrain_by_latency(start, caps, max_latency)
            .ok_or(PmError::Conflict)
    }

    /// Update the slave's state according to the current requirements
    ///
    /// With no capabilities requested the slave goes to state 0, which is
    /// never escalated for latency. Otherwise the lowest state with the
    /// requested capabilities is chosen and, if it can't wake up in time,
    /// the first higher state that can (worst case the highest state).
    pub fn update(&mut self, ops: &mut dyn PlatformOps) -> Result<(), PmError> {
        let caps = self.max_capabilities();
        let mut state: StateId = 0;

        if !caps.is_empty() {
            state = self.state_with_caps(caps).inspect_err(|_| {
                warn!("{}: no state offers {:#x}", self.name, caps.bits());
            })?;
        }

        let min_latency = self.min_requested_latency();
        let mut wake_latency = self.latency_from_state(state);
        if !caps.is_empty() && wake_latency > min_latency {
            state = self
                .constrain_by_latency(state, caps, min_latency)
                .inspect_err(|_| {
                    warn!("{}: no state meets latency {}us", self.name, min_latency);
                })?;
            wake_latency = self.latency_from_state(state);
        }

        let margin = min_latency.saturating_sub(wake_latency);

        if state != self.curr_state {
            self.change_state(ops, state)?;
        } else if !self.fsm.has_caps(state, Capabilities::POWER) {
            // Parent may power down further (or less) with the new margin
            if let Some(parent) = self.parent {
                ops.update_parent_latency(self.id, parent, margin)?;
            }
        }

        self.latency_margin = margin;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// True if moving `from -> to` newly needs `cap`
    fn gains(&self, from: StateId, to: StateId, cap: Capabilities) -> bool {
        !self.fsm.has_caps(from, cap) && self.fsm.has_caps(to, cap)
    }

    /// Acquire the power parent and clocks `next` needs
    ///
    /// Nothing stays acquired on failure: a parent requested here is
    /// released again if the clocks can't be enabled.
    fn prepare_state(&self, ops: &mut dyn PlatformOps, next: StateId) -> Result<(), PmError> {
        let curr = self.curr_state;
        let mut requested = None;

        if let Some(parent) = self.parent {
            if self.gains(curr, next, Capabilities::POWER) {
                #[cfg(feature = "pm-debug")]
                log::trace!("{}: request power parent {:?}", self.name, parent);
                ops.request_power_parent(self.id, parent)?;
                requested = Some(parent);
            }
        }

        if self.clocks && self.gains(curr, next, Capabilities::CLOCK) {
            #[cfg(feature = "pm-debug")]
            log::trace!("{}: request clock", self.name);
            if let Err(e) = ops.request_clock(self.id) {
                if let Some(parent) = requested {
                    ops.release_power_parent(self.id, parent);
                }
                return Err(e);
            }
        }

        Ok(())
    }

    /// Run the FSM transition from the current state to `next`
    fn apply_state(&self, next: StateId) -> Result<(), PmError> {
        // Single-state slaves have no transitions
        if self.fsm.transitions.is_empty() {
            return Ok(());
        }

        match self.fsm.find_transition(self.curr_state, next) {
            Some(transition) => match transition.action {
                Some(action) => action.enter_state(self.id, self.kind, self.curr_state, next),
                None => Ok(()),
            },
            None => Err(PmError::TransitionFailed),
        }
    }

    /// Release what `prev` needed and the current state doesn't
    fn clear_after_state(&self, ops: &mut dyn PlatformOps, prev: StateId) {
        let curr = self.curr_state;

        if self.clocks && self.gains(curr, prev, Capabilities::CLOCK) {
            #[cfg(feature = "pm-debug")]
            log::trace!("{}: release clock", self.name);
            ops.release_clock(self.id);
        }

        if let Some(parent) = self.parent {
            if self.gains(curr, prev, Capabilities::POWER) {
                #[cfg(feature = "pm-debug")]
                log::trace!("{}: release power parent {:?}", self.name, parent);
                ops.release_power_parent(self.id, parent);
            }
        }
    }

    /// Move the slave to `next`
    ///
    /// Only direct FSM edges are taken. On failure the current state is
    /// unchanged and whatever the transition acquired has been released.
    pub fn change_state(&mut self, ops: &mut dyn PlatformOps, next: StateId) -> Result<(), PmError> {
        let prev = self.curr_state;

        if usize::from(next) >= self.fsm.state_count() {
            warn!("{}: no state {}", self.name, next);
            return Err(PmError::TransitionFailed);
        }

        let mut result = self.prepare_state(ops, next);
        if result.is_ok() {
            result = self.apply_state(next);
            if result.is_err() {
                // Still in `prev`: drop what was acquired for `next`
                self.clear_after_state(ops, next);
            }
        }

        match result {
            Ok(()) => {
                if prev != next {
                    self.curr_state = next;
                    self.clear_after_state(ops, prev);
                }
                debug!("{} {}->{}", self.name, prev, self.curr_state);
                Ok(())
            }
            Err(e) => {
                warn!("{} {}->{} failed: {}", self.name, prev, next, e);
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Usage
    // ------------------------------------------------------------------------

    /// OR of the IPI masks of all masters currently using the slave
    pub fn users_mask(&self) -> u32 {
        self.requirements
            .active()
            .fold(0, |mask, req| mask | req.master().ipi_mask)
    }

    /// Usage of the slave as seen by `master`
    pub fn usage_status(&self, master: MasterId) -> UsageStatus {
        let bits = self.requirements.active().fold(0, |bits, req| {
            if req.master().id == master {
                bits | UsageStatus::CURRENT_MASTER
            } else {
                bits | UsageStatus::OTHER_MASTER
            }
        });
        UsageStatus::from_bits(bits)
    }

    /// Capabilities currently granted to `master`
    ///
    /// Empty if the master doesn't use the slave or isn't bound to it.
    pub fn granted_capabilities(&self, master: MasterId) -> Capabilities {
        match self.requirements.get(master) {
            Some(req) if req.is_using() => req.caps(),
            _ => Capabilities::empty(),
        }
    }

    /// Check whether a new master may start using the slave
    ///
    /// Granted if the slave is shareable, or exclusive and unused.
    pub fn verify_request(&self) -> Result<(), PmError> {
        if self.is_shareable() || self.users_mask() == 0 {
            Ok(())
        } else {
            Err(PmError::NodeUsed)
        }
    }

    // ------------------------------------------------------------------------
    // Wake-up
    // ------------------------------------------------------------------------

    /// Check whether the slave can wake up a master
    pub fn has_wake_up_cap(&self) -> Result<(), PmError> {
        if self.wake.is_none() {
            return Err(PmError::NoFeature);
        }
        self.check_capabilities(Capabilities::WAKEUP)
    }

    #[inline]
    pub fn wake(&self) -> Option<GicWake> {
        self.wake
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    /// Set the usage policy and bind the masters in `perms`
    ///
    /// `perms` is the OR of the IPI masks of the masters allowed to use the
    /// slave. All masks are resolved before anything is changed, so an
    /// unknown master leaves the slave as it was.
    pub fn set_config(
        &mut self,
        policy: SharingPolicy,
        perms: u32,
        masters: &dyn MasterDirectory,
    ) -> Result<(), PmError> {
        let mut resolved: Vec<Master> = Vec::with_capacity(perms.count_ones() as usize);
        let mut remaining = perms;

        while remaining != 0 {
            let ipi_mask = 1u32 << remaining.trailing_zeros();
            let master = masters.master_by_ipi_mask(ipi_mask).ok_or_else(|| {
                warn!("{}: no master with IPI mask {:#x}", self.name, ipi_mask);
                PmError::ConfigInvalid
            })?;
            resolved.push(master);
            remaining &= !ipi_mask;
        }

        self.flags
            .set(SlaveFlags::SHAREABLE, policy == SharingPolicy::Shareable);
        for master in resolved {
            self.requirements.bind(master);
        }

        Ok(())
    }
}

impl PmNode for Slave {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn wake_up_latency(&self, ops: &dyn PlatformOps) -> Result<u32, PmError> {
        let latency = self.latency_from_state(self.curr_state);
        let parent = self.parent.ok_or(PmError::NoFeature)?;
        let parent_latency = ops
            .parent_wake_up_latency(parent)
            .ok_or(PmError::NoFeature)?;

        Ok(latency.saturating_add(parent_latency))
    }

    fn power_data(&self) -> Result<u32, PmError> {
        self.fsm.power_of(self.curr_state).ok_or(PmError::NoFeature)
    }

    fn force_down(&mut self, ops: &mut dyn PlatformOps) -> Result<(), PmError> {
        self.requirements
            .iter_mut()
            .filter(|req| req.is_using())
            .for_each(|req| req.clear());

        if self.curr_state != 0 {
            self.change_state(ops, 0)
        } else {
            Ok(())
        }
    }

    fn clear_config(&mut self) {
        self.requirements.detach_all();
        self.flags = SlaveFlags::empty();
    }
}
