//! Start-up parameters handed to the frame source and the status snapshot it
//! reports back.
use crate::error::ValidationError;

//==================================================================================BITRATE
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Bus speeds accepted by the configuration layer.
pub enum Bitrate {
    Kbps125,
    Kbps250,
    #[default]
    Kbps500,
    Kbps1000,
}

impl Bitrate {
    /// Every supported bitrate, slowest first.
    pub const ALL: [Bitrate; 4] = [
        Bitrate::Kbps125,
        Bitrate::Kbps250,
        Bitrate::Kbps500,
        Bitrate::Kbps1000,
    ];

    /// Speed in bits per second.
    pub const fn bps(self) -> u32 {
        match self {
            Bitrate::Kbps125 => 125_000,
            Bitrate::Kbps250 => 250_000,
            Bitrate::Kbps500 => 500_000,
            Bitrate::Kbps1000 => 1_000_000,
        }
    }

    /// Map a raw bps value onto a supported bitrate.
    pub const fn from_bps(bps: u32) -> Option<Self> {
        match bps {
            125_000 => Some(Bitrate::Kbps125),
            250_000 => Some(Bitrate::Kbps250),
            500_000 => Some(Bitrate::Kbps500),
            1_000_000 => Some(Bitrate::Kbps1000),
            _ => None,
        }
    }
}

impl TryFrom<u32> for Bitrate {
    type Error = ValidationError;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        Bitrate::from_bps(bps).ok_or(ValidationError::UnsupportedBitrate { bitrate: bps })
    }
}

//==================================================================================BUS_SETTINGS
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Controller operating mode.
pub enum BusMode {
    /// Participates in the bus: acknowledges frames and may transmit.
    #[default]
    Normal,
    /// Receives only; never drives the bus (no ACK, no transmission).
    ListenOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Single coarse hardware acceptance filter. Fine-grained acceptance happens in
/// software; this hint only lets the peripheral discard obvious noise early.
pub struct AcceptanceFilter {
    /// Identifier bits to match.
    pub code: u32,
    /// Bits of `code` that must match (1 = compare, 0 = don't care).
    pub mask: u32,
}

impl AcceptanceFilter {
    /// Let every frame through to the software filter.
    pub const fn accept_all() -> Self {
        Self { code: 0, mask: 0 }
    }
}

impl Default for AcceptanceFilter {
    fn default() -> Self {
        Self::accept_all()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Everything the frame source needs to (re)start.
pub struct BusSettings {
    pub bitrate: Bitrate,
    pub filter: AcceptanceFilter,
    pub mode: BusMode,
}

impl BusSettings {
    pub const fn new(bitrate: Bitrate) -> Self {
        Self {
            bitrate,
            filter: AcceptanceFilter::accept_all(),
            mode: BusMode::Normal,
        }
    }

    pub const fn with_mode(mut self, mode: BusMode) -> Self {
        self.mode = mode;
        self
    }

    pub const fn with_filter(mut self, filter: AcceptanceFilter) -> Self {
        self.filter = filter;
        self
    }
}

//==================================================================================BUS_STATUS
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Controller state as reported by the frame source.
pub enum BusState {
    #[default]
    Stopped,
    Running,
    BusOff,
    Recovering,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Status snapshot of the peripheral.
pub struct BusStatus {
    pub state: BusState,
    /// Frames waiting in the hardware receive queue.
    pub rx_queued: u32,
    /// Frames waiting for transmission.
    pub tx_queued: u32,
    pub tx_error_counter: u32,
    pub rx_error_counter: u32,
    pub tx_failed_count: u32,
    /// Frames lost because the hardware receive queue was full.
    pub rx_missed_count: u32,
    /// Frames lost to controller FIFO overrun.
    pub rx_overrun_count: u32,
    pub arb_lost_count: u32,
    pub bus_error_count: u32,
}
