//! Master Requests
//!
//! Request, release and requirement changes coming from masters. Each
//! operation edits the master's requirement and updates the slave; if the
//! update fails the requirement is put back the way it was.

use log::debug;

use super::{Capabilities, MasterId, PlatformOps, PmError, Requirement, Slave};

impl Slave {
    /// Apply `edit` to the requirement of `master` and update the slave,
    /// restoring the previous requirement if the update fails
    fn update_requirement(
        &mut self,
        master: MasterId,
        ops: &mut dyn PlatformOps,
        edit: impl FnOnce(&mut Requirement),
    ) -> Result<(), PmError> {
        let req = self.requirement_mut(master).ok_or(PmError::NoAccess)?;
        let saved = *req;
        edit(req);

        self.update(ops).inspect_err(|_| {
            if let Some(req) = self.requirement_mut(master) {
                *req = saved;
            }
        })
    }

    /// Start using the slave with `caps`
    pub fn request(
        &mut self,
        master: MasterId,
        caps: Capabilities,
        ops: &mut dyn PlatformOps,
    ) -> Result<(), PmError> {
        let req = self.requirement(master).ok_or(PmError::NoAccess)?;
        if req.is_using() {
            return Err(PmError::DoubleRequest);
        }

        self.verify_request()?;
        self.check_capabilities(caps)?;

        debug!("{}: request {:?} caps {:#x}", self.name(), master, caps.bits());
        self.update_requirement(master, ops, |req| req.activate(caps))
    }

    /// Stop using the slave
    pub fn release(&mut self, master: MasterId, ops: &mut dyn PlatformOps) -> Result<(), PmError> {
        let req = self.requirement(master).ok_or(PmError::NoAccess)?;
        if !req.is_using() {
            return Err(PmError::NoAccess);
        }

        debug!("{}: release {:?}", self.name(), master);
        self.update_requirement(master, ops, Requirement::clear)
    }

    /// Change the capabilities granted to a master already using the slave
    pub fn set_requirement(
        &mut self,
        master: MasterId,
        caps: Capabilities,
        ops: &mut dyn PlatformOps,
    ) -> Result<(), PmError> {
        let req = self.requirement(master).ok_or(PmError::NoAccess)?;
        if !req.is_using() {
            return Err(PmError::NoAccess);
        }

        self.check_capabilities(caps)?;
        self.update_requirement(master, ops, |req| req.set_caps(caps))
    }

    /// Set the wake-up latency bound (us) of a master
    pub fn set_max_latency(
        &mut self,
        master: MasterId,
        latency: u32,
        ops: &mut dyn PlatformOps,
    ) -> Result<(), PmError> {
        self.update_requirement(master, ops, |req| req.set_latency(latency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pm::test_support::*;
    use crate::pm::{SharingPolicy, SlaveKind};

    #[test]
    fn test_request_and_release() {
        let mut slave = three_state_slave(SlaveKind::Sram);
        let mut ops = RecordingOps::new();

        slave.request(APU.id, RUNNING, &mut ops).unwrap();
        assert_eq!(slave.current_state(), 2);
        assert_eq!(slave.request(APU.id, RUNNING, &mut ops), Err(PmError::DoubleRequest));

        slave.release(APU.id, &mut ops).unwrap();
        assert_eq!(slave.current_state(), 0);
        assert_eq!(slave.release(APU.id, &mut ops), Err(PmError::NoAccess));
    }

    #[test]
    fn test_request_unbound_master() {
        let mut slave = three_state_slave(SlaveKind::Sram);
        let mut ops = RecordingOps::new();

        assert_eq!(
            slave.request(MasterId(9), POWERED, &mut ops),
            Err(PmError::NoAccess)
        );
    }

    #[test]
    fn test_request_exclusive_slave_in_use() {
        let mut slave = three_state_slave(SlaveKind::Usb);
        let mut ops = RecordingOps::new();
        slave
            .set_config(SharingPolicy::Exclusive, APU.ipi_mask | RPU0.ipi_mask, &masters())
            .unwrap();

        slave.request(APU.id, POWERED, &mut ops).unwrap();
        assert_eq!(slave.request(RPU0.id, POWERED, &mut ops), Err(PmError::NodeUsed));

        slave.release(APU.id, &mut ops).unwrap();
        slave.request(RPU0.id, POWERED, &mut ops).unwrap();
        assert_eq!(slave.users_mask(), RPU0.ipi_mask);
    }

    #[test]
    fn test_request_unsupported_caps() {
        let mut slave = three_state_slave(SlaveKind::Sram);
        let mut ops = RecordingOps::new();

        assert_eq!(
            slave.request(APU.id, Capabilities::WAKEUP, &mut ops),
            Err(PmError::NoFeature)
        );
        assert!(!slave.requirement(APU.id).unwrap().is_using());
    }

    #[test]
    fn test_failed_update_restores_requirement() {
        let mut slave = three_state_slave(SlaveKind::Sram);
        let mut ops = RecordingOps::new();
        slave.request(APU.id, POWERED, &mut ops).unwrap();

        ops.fail_clock = true;
        assert_eq!(
            slave.set_requirement(APU.id, RUNNING, &mut ops),
            Err(PmError::Platform(0x66))
        );
        assert_eq!(slave.granted_capabilities(APU.id), POWERED);
        assert_eq!(slave.current_state(), 1);
    }

    #[test]
    fn test_failed_request_is_not_recorded() {
        let mut slave = three_state_slave(SlaveKind::Sram);
        let mut ops = RecordingOps::new();
        ops.fail_parent = true;

        assert!(slave.request(APU.id, POWERED, &mut ops).is_err());
        assert_eq!(slave.users_mask(), 0);
    }

    #[test]
    fn test_set_max_latency_escalates() {
        let mut slave = three_state_slave(SlaveKind::Sram);
        let mut ops = RecordingOps::new();

        slave.request(RPU0.id, POWERED, &mut ops).unwrap();
        assert_eq!(slave.current_state(), 1);

        slave.set_max_latency(RPU0.id, 10, &mut ops).unwrap();
        assert_eq!(slave.current_state(), 2);
        assert_eq!(slave.requirement(RPU0.id).unwrap().latency(), 10);
    }

    #[test]
    fn test_set_requirement_needs_usage() {
        let mut slave = three_state_slave(SlaveKind::Sram);
        let mut ops = RecordingOps::new();

        assert_eq!(
            slave.set_requirement(APU.id, POWERED, &mut ops),
            Err(PmError::NoAccess)
        );
    }
}
