use std::sync::atomic::{AtomicU8, Ordering};

const SWAP: u8 = 1 << 0;
const AXIS1_ENABLED: u8 = 1 << 1;
const AXIS2_ENABLED: u8 = 1 << 2;

/// User controlled swap and enable configuration applied during mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisPolicy {
    /// Exchange the first and the second stick before anything else.
    pub swap: bool,
    /// Channel 1 (X, Y) follows the stick; otherwise it stays centered.
    pub axis1_enabled: bool,
    /// Channel 2 (Z, RX) follows the stick; otherwise it stays centered.
    pub axis2_enabled: bool,
}

impl Default for AxisPolicy {
    fn default() -> Self {
        Self {
            swap: false,
            axis1_enabled: true,
            axis2_enabled: true,
        }
    }
}

impl AxisPolicy {
    #[inline]
    fn to_bits(self) -> u8 {
        let mut bits = 0;
        if self.swap {
            bits |= SWAP;
        }
        if self.axis1_enabled {
            bits |= AXIS1_ENABLED;
        }
        if self.axis2_enabled {
            bits |= AXIS2_ENABLED;
        }
        bits
    }

    #[inline]
    fn from_bits(bits: u8) -> Self {
        Self {
            swap: bits & SWAP != 0,
            axis1_enabled: bits & AXIS1_ENABLED != 0,
            axis2_enabled: bits & AXIS2_ENABLED != 0,
        }
    }
}

/// Policy cell shared between the controlling thread and the read loop.
///
/// The whole policy lives in a single byte, so every [`load`](Self::load)
/// observes a consistent snapshot.
#[derive(Debug)]
pub struct AtomicAxisPolicy(AtomicU8);

impl Default for AtomicAxisPolicy {
    fn default() -> Self {
        Self::new(AxisPolicy::default())
    }
}

impl AtomicAxisPolicy {
    /// Create a new atomic policy.
    pub fn new(policy: AxisPolicy) -> Self {
        Self(AtomicU8::new(policy.to_bits()))
    }

    /// Load the current policy snapshot.
    #[inline]
    pub fn load(&self) -> AxisPolicy {
        AxisPolicy::from_bits(self.0.load(Ordering::Acquire))
    }

    /// Replace the whole policy.
    #[inline]
    pub fn store(&self, policy: AxisPolicy) {
        self.0.store(policy.to_bits(), Ordering::Release);
    }

    #[inline]
    pub fn set_swap(&self, swap: bool) {
        self.set_flag(SWAP, swap);
    }

    #[inline]
    pub fn set_axis1_enabled(&self, enabled: bool) {
        self.set_flag(AXIS1_ENABLED, enabled);
    }

    #[inline]
    pub fn set_axis2_enabled(&self, enabled: bool) {
        self.set_flag(AXIS2_ENABLED, enabled);
    }

    fn set_flag(&self, flag: u8, value: bool) {
        if value {
            self.0.fetch_or(flag, Ordering::AcqRel);
        } else {
            self.0.fetch_and(!flag, Ordering::AcqRel);
        }
    }
}
