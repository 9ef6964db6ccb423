//! PM Masters
//!
//! Masters are the processing units (APU, RPU cores, ...) that place
//! requirements on slaves. The PM core only needs their identity: a stable
//! id and the one-hot IPI mask used for usage reporting.

use alloc::vec::Vec;

/// Master identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MasterId(pub u8);

/// Master reference held by requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Master {
    /// Master identifier
    pub id: MasterId,
    /// One-hot IPI mask identifying the master
    pub ipi_mask: u32,
}

impl Master {
    pub const fn new(id: MasterId, ipi_mask: u32) -> Self {
        Self { id, ipi_mask }
    }
}

/// Resolves masters from their IPI masks
pub trait MasterDirectory {
    /// Master owning exactly this one-hot IPI mask
    fn master_by_ipi_mask(&self, ipi_mask: u32) -> Option<Master>;
}

/// Fixed table of the masters known to the firmware
#[derive(Debug, Clone, Default)]
pub struct MasterTable {
    masters: Vec<Master>,
}

impl MasterTable {
    pub fn new(masters: &[Master]) -> Self {
        Self {
            masters: masters.to_vec(),
        }
    }

    pub fn by_id(&self, id: MasterId) -> Option<Master> {
        self.masters.iter().copied().find(|m| m.id == id)
    }

    /// OR of the IPI masks of all masters
    pub fn all_ipi_masks(&self) -> u32 {
        self.masters.iter().fold(0, |acc, m| acc | m.ipi_mask)
    }
}

impl MasterDirectory for MasterTable {
    fn master_by_ipi_mask(&self, ipi_mask: u32) -> Option<Master> {
        self.masters.iter().copied().find(|m| m.ipi_mask == ipi_mask)
    }
}
