//! Slave Capabilities
//!
//! Every FSM state of a slave is described by the capabilities it offers.
//! Masters request capabilities, never states.

/// Wake-up latency in microseconds meaning "no latency requirement"
pub const MAX_LATENCY: u32 = u32::MAX;

bitflags::bitflags! {
    /// Capabilities offered by a slave state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        /// Slave is accessible
        const ACCESS = 0x0000_0001;
        /// Slave retains its context
        const CONTEXT = 0x0000_0002;
        /// Slave can generate wake-up events
        const WAKEUP = 0x0000_0004;
        /// Slave is clocked
        const CLOCK = 0x0000_0008;
        /// Slave is powered
        const POWER = 0x0000_0010;

        // Slave-specific bits above POWER are carried through unchanged
        const _ = !0;
    }
}

impl Capabilities {
    /// True if `self` offers every capability in `required`
    #[inline]
    pub const fn offers(self, required: Capabilities) -> bool {
        self.bits() & required.bits() == required.bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offers_superset() {
        let on = Capabilities::POWER | Capabilities::CLOCK | Capabilities::ACCESS;
        assert!(on.offers(Capabilities::POWER));
        assert!(on.offers(Capabilities::POWER | Capabilities::CLOCK));
        assert!(on.offers(Capabilities::empty()));
        assert!(!on.offers(Capabilities::WAKEUP));
    }

    #[test]
    fn test_slave_specific_bits_retained() {
        let custom = Capabilities::from_bits_retain(0x100);
        let state = Capabilities::POWER | custom;
        assert_eq!(state.bits(), 0x110);
        assert!(state.offers(custom));
        assert!(!Capabilities::POWER.offers(custom));
    }
}
