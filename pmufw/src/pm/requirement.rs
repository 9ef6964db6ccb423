//! Slave Requirements
//!
//! A requirement binds one master to one slave. It is created when the
//! master is given access to the slave and lives as long as the slave's
//! configuration; requesting and releasing the slave only toggles its flags.

use alloc::vec::Vec;

use super::{Capabilities, Master, MasterId, MAX_LATENCY};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RequirementFlags: u8 {
        /// Master is currently using the slave
        const USING = 0x01;
        /// Master has set a wake-up latency bound
        const SET_LATENCY = 0x02;
    }
}

/// Requirement of one master on one slave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    /// Requesting master
    master: Master,
    /// Usage/status flags
    flags: RequirementFlags,
    /// Currently granted capabilities
    curr_caps: Capabilities,
    /// Wake-up latency bound (us)
    latency: u32,
}

impl Requirement {
    pub const fn new(master: Master) -> Self {
        Self {
            master,
            flags: RequirementFlags::empty(),
            curr_caps: Capabilities::empty(),
            latency: MAX_LATENCY,
        }
    }

    #[inline]
    pub fn master(&self) -> Master {
        self.master
    }

    #[inline]
    pub fn flags(&self) -> RequirementFlags {
        self.flags
    }

    #[inline]
    pub fn is_using(&self) -> bool {
        self.flags.contains(RequirementFlags::USING)
    }

    #[inline]
    pub fn has_latency(&self) -> bool {
        self.flags.contains(RequirementFlags::SET_LATENCY)
    }

    /// Granted capabilities
    #[inline]
    pub fn caps(&self) -> Capabilities {
        self.curr_caps
    }

    #[inline]
    pub fn latency(&self) -> u32 {
        self.latency
    }

    /// Mark the slave as used by the master with `caps`
    pub fn activate(&mut self, caps: Capabilities) {
        self.flags.insert(RequirementFlags::USING);
        self.curr_caps = caps;
    }

    pub fn set_caps(&mut self, caps: Capabilities) {
        self.curr_caps = caps;
    }

    pub fn set_latency(&mut self, latency: u32) {
        self.flags.insert(RequirementFlags::SET_LATENCY);
        self.latency = latency;
    }

    /// Release: the requirement stops contributing to the slave's state
    pub fn clear(&mut self) {
        self.flags
            .remove(RequirementFlags::USING | RequirementFlags::SET_LATENCY);
        self.curr_caps = Capabilities::empty();
        self.latency = MAX_LATENCY;
    }
}

/// All requirements placed on a slave, one per bound master
#[derive(Debug, Clone, Default)]
pub struct RequirementLedger {
    entries: Vec<Requirement>,
}

impl RequirementLedger {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Requirement> {
        self.entries.iter_mut()
    }

    /// Requirements of masters currently using the slave
    pub fn active(&self) -> impl Iterator<Item = &Requirement> {
        self.entries.iter().filter(|r| r.is_using())
    }

    /// Requirement of `master`, `None` if the master isn't bound
    pub fn get(&self, master: MasterId) -> Option<&Requirement> {
        self.entries.iter().find(|r| r.master.id == master)
    }

    pub fn get_mut(&mut self, master: MasterId) -> Option<&mut Requirement> {
        self.entries.iter_mut().find(|r| r.master.id == master)
    }

    /// Bind `master`, reusing its requirement if it already has one
    pub fn bind(&mut self, master: Master) -> &mut Requirement {
        match self.entries.iter().position(|r| r.master.id == master.id) {
            Some(i) => &mut self.entries[i],
            None => {
                self.entries.push(Requirement::new(master));
                let last = self.entries.len() - 1;
                &mut self.entries[last]
            }
        }
    }

    /// Deactivate the requirement of `master` without unbinding it
    pub fn clear(&mut self, master: MasterId) -> bool {
        match self.get_mut(master) {
            Some(req) => {
                req.clear();
                true
            }
            None => false,
        }
    }

    /// Forget all bound masters
    pub fn detach_all(&mut self) {
        self.entries.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const APU: Master = Master::new(MasterId(0), 0x01);
    const RPU0: Master = Master::new(MasterId(1), 0x100);

    #[test]
    fn test_activate_and_clear() {
        let mut req = Requirement::new(APU);
        assert!(!req.is_using());
        assert_eq!(req.latency(), MAX_LATENCY);

        req.activate(Capabilities::ACCESS);
        req.set_latency(40);
        assert!(req.is_using());
        assert!(req.has_latency());
        assert_eq!(req.caps(), Capabilities::ACCESS);

        req.clear();
        assert_eq!(req.flags(), RequirementFlags::empty());
        assert_eq!(req.caps(), Capabilities::empty());
        assert_eq!(req.latency(), MAX_LATENCY);
        assert_eq!(req.master(), APU);
    }

    #[test]
    fn test_bind_reuses_entry() {
        let mut ledger = RequirementLedger::new();
        ledger.bind(APU).activate(Capabilities::POWER);
        ledger.bind(RPU0);
        assert_eq!(ledger.len(), 2);

        // Rebinding keeps the existing requirement and its state
        ledger.bind(APU);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.get(MasterId(0)).is_some_and(|r| r.is_using()));
    }

    #[test]
    fn test_lookup_distinguishes_unbound_from_inactive() {
        let mut ledger = RequirementLedger::new();
        ledger.bind(APU);

        assert!(ledger.get(MasterId(0)).is_some_and(|r| !r.is_using()));
        assert!(ledger.get(MasterId(7)).is_none());
        assert!(!ledger.clear(MasterId(7)));
    }

    #[test]
    fn test_clear_keeps_binding() {
        let mut ledger = RequirementLedger::new();
        ledger.bind(APU).activate(Capabilities::ACCESS);
        ledger.bind(RPU0).activate(Capabilities::POWER);
        assert_eq!(ledger.active().count(), 2);

        assert!(ledger.clear(MasterId(0)));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.active().count(), 1);

        ledger.detach_all();
        assert!(ledger.is_empty());
    }
}
