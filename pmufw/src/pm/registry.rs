//! Slave Registry
//!
//! All slaves known to the firmware, built once at boot from the static
//! slave table and never resized afterwards. Every slave sits behind its
//! own lock; a PM operation holds exactly one of them for its duration.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use log::{info, warn};
use spin::{Mutex, Once};

use super::{
    Capabilities, MasterDirectory, MasterId, NodeId, PlatformOps, PmError, PmNode, SharingPolicy,
    Slave, SlaveDesc, UsageStatus,
};

/// Registry of slave nodes
pub struct SlaveRegistry {
    slaves: Vec<Mutex<Slave>>,
    /// Node id -> index in `slaves`
    index: BTreeMap<NodeId, usize>,
}

impl SlaveRegistry {
    /// Build the registry from the static slave table
    ///
    /// Fails with `ConfigInvalid` on duplicate node ids, empty or
    /// inconsistent FSM tables and out-of-range initial states.
    pub fn new(descs: &[SlaveDesc]) -> Result<Self, PmError> {
        let mut slaves = Vec::with_capacity(descs.len());
        let mut index = BTreeMap::new();

        for desc in descs {
            if !desc.fsm.is_consistent() || usize::from(desc.initial_state) >= desc.fsm.state_count() {
                warn!("PM: bad state table for {}", desc.name);
                return Err(PmError::ConfigInvalid);
            }
            if index.insert(desc.id, slaves.len()).is_some() {
                warn!("PM: duplicate slave {}", desc.id);
                return Err(PmError::ConfigInvalid);
            }
            slaves.push(Mutex::new(Slave::from_desc(desc)));
        }

        Ok(Self { slaves, index })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slaves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slaves.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.index.contains_key(&node)
    }

    /// Node ids in ascending order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.index.keys().copied()
    }

    /// Run `f` with exclusive access to the slave `node`
    pub fn with_slave<R>(&self, node: NodeId, f: impl FnOnce(&mut Slave) -> R) -> Result<R, PmError> {
        let &i = self.index.get(&node).ok_or(PmError::InvalidNode)?;
        let mut slave = self.slaves[i].lock();
        Ok(f(&mut *slave))
    }

    // ------------------------------------------------------------------------
    // Reconciliation and configuration
    // ------------------------------------------------------------------------

    /// Re-evaluate the state of `node` after its requirements changed
    pub fn update(&self, node: NodeId, ops: &mut dyn PlatformOps) -> Result<(), PmError> {
        self.with_slave(node, |slave| slave.update(ops))?
    }

    pub fn set_config(
        &self,
        node: NodeId,
        policy: SharingPolicy,
        perms: u32,
        masters: &dyn MasterDirectory,
    ) -> Result<(), PmError> {
        self.with_slave(node, |slave| slave.set_config(policy, perms, masters))?
    }

    pub fn clear_config(&self, node: NodeId) -> Result<(), PmError> {
        self.with_slave(node, |slave| slave.clear_config())
    }

    /// Clear the configuration of every slave
    pub fn clear_all_configs(&self) {
        for slave in &self.slaves {
            slave.lock().clear_config();
        }
    }

    pub fn force_down(&self, node: NodeId, ops: &mut dyn PlatformOps) -> Result<(), PmError> {
        self.with_slave(node, |slave| slave.force_down(ops))?
    }

    // ------------------------------------------------------------------------
    // Master requests
    // ------------------------------------------------------------------------

    pub fn request_node(
        &self,
        node: NodeId,
        master: MasterId,
        caps: Capabilities,
        ops: &mut dyn PlatformOps,
    ) -> Result<(), PmError> {
        self.with_slave(node, |slave| slave.request(master, caps, ops))?
    }

    pub fn release_node(&self, node: NodeId, master: MasterId, ops: &mut dyn PlatformOps) -> Result<(), PmError> {
        self.with_slave(node, |slave| slave.release(master, ops))?
    }

    pub fn set_requirement(
        &self,
        node: NodeId,
        master: MasterId,
        caps: Capabilities,
        ops: &mut dyn PlatformOps,
    ) -> Result<(), PmError> {
        self.with_slave(node, |slave| slave.set_requirement(master, caps, ops))?
    }

    pub fn set_max_latency(
        &self,
        node: NodeId,
        master: MasterId,
        latency: u32,
        ops: &mut dyn PlatformOps,
    ) -> Result<(), PmError> {
        self.with_slave(node, |slave| slave.set_max_latency(master, latency, ops))?
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn verify_request(&self, node: NodeId) -> Result<(), PmError> {
        self.with_slave(node, |slave| slave.verify_request())?
    }

    pub fn users_mask(&self, node: NodeId) -> Result<u32, PmError> {
        self.with_slave(node, |slave| slave.users_mask())
    }

    pub fn usage_status(&self, node: NodeId, master: MasterId) -> Result<UsageStatus, PmError> {
        self.with_slave(node, |slave| slave.usage_status(master))
    }

    pub fn requirements(&self, node: NodeId, master: MasterId) -> Result<Capabilities, PmError> {
        self.with_slave(node, |slave| slave.granted_capabilities(master))
    }

    pub fn check_capabilities(&self, node: NodeId, caps: Capabilities) -> Result<(), PmError> {
        self.with_slave(node, |slave| slave.check_capabilities(caps))?
    }

    pub fn has_wake_up_cap(&self, node: NodeId) -> Result<(), PmError> {
        self.with_slave(node, |slave| slave.has_wake_up_cap())?
    }

    pub fn wake_up_latency(&self, node: NodeId, ops: &dyn PlatformOps) -> Result<u32, PmError> {
        self.with_slave(node, |slave| slave.wake_up_latency(ops))?
    }

    pub fn power_data(&self, node: NodeId) -> Result<u32, PmError> {
        self.with_slave(node, |slave| slave.power_data())?
    }

    /// Slaves currently used by `master`
    pub fn slaves_used_by(&self, master: MasterId) -> Vec<NodeId> {
        self.slaves
            .iter()
            .filter_map(|slave| {
                let slave = slave.lock();
                slave
                    .requirement(master)
                    .filter(|req| req.is_using())
                    .map(|_| slave.id())
            })
            .collect()
    }
}

// ============================================================================
// Global Registry
// ============================================================================

static SLAVES: Once<SlaveRegistry> = Once::new();

/// Populate the global slave registry (once, at boot)
///
/// A second call leaves the registry untouched and returns it.
pub fn pm_slave_init(descs: &[SlaveDesc]) -> Result<&'static SlaveRegistry, PmError> {
    if let Some(registry) = SLAVES.get() {
        warn!("PM: slave registry already initialized");
        return Ok(registry);
    }

    let registry = SlaveRegistry::new(descs)?;
    let registry = SLAVES.call_once(|| registry);
    info!("PM: {} slaves registered", registry.len());
    Ok(registry)
}

/// The global slave registry
pub fn pm_slaves() -> Result<&'static SlaveRegistry, PmError> {
    SLAVES.get().ok_or(PmError::InvalidNode)
}

/// Re-evaluate the state of `node` (PmUpdateSlave)
pub fn pm_update_slave(node: NodeId, ops: &mut dyn PlatformOps) -> Result<(), PmError> {
    pm_slaves()?.update(node, ops)
}

/// Configure usage policy and permissions of `node`
pub fn pm_slave_set_config(
    node: NodeId,
    policy: SharingPolicy,
    perms: u32,
    masters: &dyn MasterDirectory,
) -> Result<(), PmError> {
    pm_slaves()?.set_config(node, policy, perms, masters)
}

/// Admission check before a master starts using `node`
pub fn pm_slave_verify_request(node: NodeId) -> Result<(), PmError> {
    pm_slaves()?.verify_request(node)
}

pub fn pm_slave_users_mask(node: NodeId) -> Result<u32, PmError> {
    pm_slaves()?.users_mask(node)
}

pub fn pm_slave_usage_status(node: NodeId, master: MasterId) -> Result<UsageStatus, PmError> {
    pm_slaves()?.usage_status(node, master)
}

pub fn pm_slave_requirements(node: NodeId, master: MasterId) -> Result<Capabilities, PmError> {
    pm_slaves()?.requirements(node, master)
}

/// Drop all users of `node` and power it down
pub fn pm_slave_force_down(node: NodeId, ops: &mut dyn PlatformOps) -> Result<(), PmError> {
    pm_slaves()?.force_down(node, ops)
}

pub fn pm_slave_has_wake_up_cap(node: NodeId) -> Result<(), PmError> {
    pm_slaves()?.has_wake_up_cap(node)
}

pub fn pm_slave_wake_up_latency(node: NodeId, ops: &dyn PlatformOps) -> Result<u32, PmError> {
    pm_slaves()?.wake_up_latency(node, ops)
}
