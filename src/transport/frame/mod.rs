//! In-memory representation of a classic CAN 2.0 frame as delivered by the
//! frame source and handed to the application.
use embedded_can::{ExtendedId, Id, StandardId};

/// Largest 11-bit standard identifier.
pub const MAX_STANDARD_ID: u32 = 0x7FF;
/// Largest 29-bit extended identifier.
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;
/// Classic CAN payload capacity.
pub const MAX_DATA_LEN: usize = 8;

//==================================================================================FRAME
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Raw CAN frame. Copied by value between the ingestion stages.
pub struct Frame {
    /// Identifier, 11 or 29 significant bits depending on `extended`.
    pub id: u32,
    /// `true` for a 29-bit identifier.
    pub extended: bool,
    /// Remote transmission request; `data` carries nothing in that case.
    pub remote: bool,
    /// Data Length Code, 0 to 8.
    pub len: u8,
    /// Payload buffer. Only the first `len` bytes are meaningful.
    pub data: [u8; MAX_DATA_LEN],
}

impl Frame {
    /// Build a data frame. Returns `None` when the identifier does not fit the
    /// format or the payload exceeds eight bytes.
    pub fn new_data(id: u32, extended: bool, payload: &[u8]) -> Option<Self> {
        if id > Self::max_id(extended) || payload.len() > MAX_DATA_LEN {
            return None;
        }
        let mut data = [0u8; MAX_DATA_LEN];
        data[..payload.len()].copy_from_slice(payload);
        Some(Self {
            id,
            extended,
            remote: false,
            len: payload.len() as u8,
            data,
        })
    }

    /// Build a remote request frame with the given DLC.
    pub fn new_remote_request(id: u32, extended: bool, dlc: u8) -> Option<Self> {
        if id > Self::max_id(extended) || dlc as usize > MAX_DATA_LEN {
            return None;
        }
        Some(Self {
            id,
            extended,
            remote: true,
            len: dlc,
            data: [0; MAX_DATA_LEN],
        })
    }

    /// Highest identifier allowed for the given format.
    #[inline]
    pub const fn max_id(extended: bool) -> u32 {
        if extended {
            MAX_EXTENDED_ID
        } else {
            MAX_STANDARD_ID
        }
    }

    /// Valid payload bytes. Empty for remote requests.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..(self.len as usize).min(MAX_DATA_LEN)]
        }
    }
}

//==================================================================================EMBEDDED_CAN
impl embedded_can::Frame for Frame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        let (raw, extended) = split_id(id.into());
        Frame::new_data(raw, extended, data)
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > MAX_DATA_LEN {
            return None;
        }
        let (raw, extended) = split_id(id.into());
        Frame::new_remote_request(raw, extended, dlc as u8)
    }

    fn is_extended(&self) -> bool {
        self.extended
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        // Constructors keep `id` in range; masking guards hand-built frames.
        if self.extended {
            match ExtendedId::new(self.id & MAX_EXTENDED_ID) {
                Some(id) => Id::Extended(id),
                None => Id::Extended(ExtendedId::ZERO),
            }
        } else {
            match StandardId::new((self.id & MAX_STANDARD_ID) as u16) {
                Some(id) => Id::Standard(id),
                None => Id::Standard(StandardId::ZERO),
            }
        }
    }

    fn dlc(&self) -> usize {
        self.len as usize
    }

    fn data(&self) -> &[u8] {
        self.payload()
    }
}

/// Flatten an `embedded_can::Id` into raw value and format flag.
fn split_id(id: Id) -> (u32, bool) {
    match id {
        Id::Standard(id) => (id.as_raw() as u32, false),
        Id::Extended(id) => (id.as_raw(), true),
    }
}
