//! Bus-health alert bits reported by the frame source.
//!
//! The bit positions follow the TWAI alert layout so drivers built on that
//! peripheral can forward their raw alert word unchanged.

//==================================================================================ALERT_MASK
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Set of alerts raised since the previous poll.
pub struct AlertMask(pub u32);

impl AlertMask {
    /// No frame waiting for transmission.
    pub const TX_IDLE: Self = Self(0x0000_0001);
    /// Previous transmission succeeded.
    pub const TX_SUCCESS: Self = Self(0x0000_0002);
    /// A frame was received and queued.
    pub const RX_DATA: Self = Self(0x0000_0004);
    /// Both error counters dropped below the warning limit.
    pub const BELOW_ERR_WARN: Self = Self(0x0000_0008);
    /// Controller became error active.
    pub const ERR_ACTIVE: Self = Self(0x0000_0010);
    /// Bus-off recovery has started.
    pub const RECOVERY_IN_PROGRESS: Self = Self(0x0000_0020);
    /// Bus-off recovery completed; the controller is back on the bus.
    pub const BUS_RECOVERED: Self = Self(0x0000_0040);
    /// Arbitration was lost during transmission.
    pub const ARB_LOST: Self = Self(0x0000_0080);
    /// An error counter exceeded the warning limit.
    pub const ABOVE_ERR_WARN: Self = Self(0x0000_0100);
    /// A bus error occurred.
    pub const BUS_ERROR: Self = Self(0x0000_0200);
    /// Transmission failed.
    pub const TX_FAILED: Self = Self(0x0000_0400);
    /// The hardware receive queue was full and a frame was lost.
    pub const RX_QUEUE_FULL: Self = Self(0x0000_0800);
    /// Controller became error passive.
    pub const ERR_PASSIVE: Self = Self(0x0000_1000);
    /// Controller entered the bus-off state.
    pub const BUS_OFF: Self = Self(0x0000_2000);

    /// Empty mask (poll timed out without alerts).
    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw alert word.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` when every bit of `other` is set.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// `true` when at least one bit of `other` is set.
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl core::ops::BitOr for AlertMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for AlertMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl core::ops::BitAnd for AlertMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}
