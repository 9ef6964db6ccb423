//! Fakes and tables shared by the PM unit tests

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use super::*;

pub const APU: Master = Master::new(MasterId(0), 0x0000_0001);
pub const RPU0: Master = Master::new(MasterId(1), 0x0000_0100);
pub const RPU1: Master = Master::new(MasterId(2), 0x0000_0200);

pub const PD_LPD: PowerId = PowerId(1);

pub const OFF: Capabilities = Capabilities::empty();
pub const POWERED: Capabilities = Capabilities::POWER;
pub const RUNNING: Capabilities = Capabilities::POWER.union(Capabilities::CLOCK);

/// `{0}`, `{POWER}`, `{POWER, CLOCK}`
pub static THREE_STATES: [Capabilities; 3] = [OFF, POWERED, RUNNING];

pub static THREE_TRANSITIONS: [Transition; 6] = [
    Transition::new(0, 1, 0),
    Transition::new(1, 0, 0),
    Transition::new(0, 2, 100),
    Transition::new(2, 0, 0),
    Transition::new(1, 2, 50),
    Transition::new(2, 1, 0),
];

pub static THREE_FSM: SlaveFsm = SlaveFsm::with_power_info(&THREE_STATES, &THREE_TRANSITIONS, &[0, 3, 12]);

/// Only `off <-> running`, no direct edges through `powered`
pub static SPARSE_TRANSITIONS: [Transition; 2] = [Transition::new(0, 2, 100), Transition::new(2, 0, 0)];

pub static SPARSE_FSM: SlaveFsm = SlaveFsm::new(&THREE_STATES, &SPARSE_TRANSITIONS);

/// Single always-on state
pub static ALWAYS_ON_STATES: [Capabilities; 1] = [RUNNING];
pub static ALWAYS_ON_FSM: SlaveFsm = SlaveFsm::new(&ALWAYS_ON_STATES, &[]);

pub fn masters() -> MasterTable {
    MasterTable::new(&[APU, RPU0, RPU1])
}

/// Three-state slave with a power parent and clocks, every master bound
pub fn three_state_slave(kind: SlaveKind) -> Slave {
    let desc = SlaveDesc::new(NodeId(40), "ocm0", kind, &THREE_FSM)
        .with_parent(PD_LPD)
        .with_clocks();
    let mut slave = Slave::from_desc(&desc);
    slave
        .set_config(SharingPolicy::Shareable, APU.ipi_mask | RPU0.ipi_mask | RPU1.ipi_mask, &masters())
        .expect("test masters resolve");
    slave
}

/// Platform call recorded by [`RecordingOps`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    RequestParent(NodeId),
    ReleaseParent(NodeId),
    UpdateLatency(NodeId, u32),
    RequestClock(NodeId),
    ReleaseClock(NodeId),
}

#[derive(Debug, Default)]
pub struct RecordingOps {
    pub calls: Vec<Call>,
    pub fail_parent: bool,
    pub fail_clock: bool,
    pub parent_latency: Option<u32>,
}

impl RecordingOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, call: fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| call(c)).count()
    }
}

impl PlatformOps for RecordingOps {
    fn request_power_parent(&mut self, node: NodeId, _parent: PowerId) -> Result<(), PmError> {
        self.calls.push(Call::RequestParent(node));
        if self.fail_parent {
            return Err(PmError::Platform(0x55));
        }
        Ok(())
    }

    fn release_power_parent(&mut self, node: NodeId, _parent: PowerId) {
        self.calls.push(Call::ReleaseParent(node));
    }

    fn update_parent_latency(&mut self, node: NodeId, _parent: PowerId, margin: u32) -> Result<(), PmError> {
        self.calls.push(Call::UpdateLatency(node, margin));
        Ok(())
    }

    fn parent_wake_up_latency(&self, _parent: PowerId) -> Option<u32> {
        self.parent_latency
    }

    fn request_clock(&mut self, node: NodeId) -> Result<(), PmError> {
        self.calls.push(Call::RequestClock(node));
        if self.fail_clock {
            return Err(PmError::Platform(0x66));
        }
        Ok(())
    }

    fn release_clock(&mut self, node: NodeId) {
        self.calls.push(Call::ReleaseClock(node));
    }
}

/// Transition action that counts its invocations
pub struct CountingAction {
    hits: AtomicU32,
}

impl CountingAction {
    pub const fn new() -> Self {
        Self {
            hits: AtomicU32::new(0),
        }
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }
}

impl TransitionAction for CountingAction {
    fn enter_state(&self, _node: NodeId, _kind: SlaveKind, _from: StateId, _to: StateId) -> Result<(), PmError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Transition action whose hardware sequence always times out
pub struct FailingAction;

impl TransitionAction for FailingAction {
    fn enter_state(&self, _node: NodeId, _kind: SlaveKind, _from: StateId, _to: StateId) -> Result<(), PmError> {
        Err(PmError::TransitionFailed)
    }
}
