//! Fixed 32-byte persisted configuration record.
//!
//! ```text
//! [0]       mode (0 = monitoring, 1 = specific)
//! [1]       id count (0-5)
//! [2..22)   five u32 identifiers, little-endian
//! [22]      extended flag (0/1)
//! [23..27)  bitrate u32, little-endian
//! [27..32)  reserved, zero
//! ```
use crate::config::{CanConfig, DEFAULT_BITRATE};
use crate::error::RecordError;
use crate::ingestion::filter::{AcceptedIds, FilterConfig, FilterMode, MAX_ACCEPTED_IDS};
use crate::transport::settings::Bitrate;

/// Size of an encoded record.
pub const RECORD_SIZE: usize = 32;

const MODE_OFFSET: usize = 0;
const COUNT_OFFSET: usize = 1;
const IDS_OFFSET: usize = 2;
const EXTENDED_OFFSET: usize = 22;
const BITRATE_OFFSET: usize = 23;

const MODE_MONITORING: u8 = 0;
const MODE_SPECIFIC: u8 = 1;

//==================================================================================ENCODE
/// Serialize `config` into the fixed layout. Reserved bytes are zero.
pub fn encode(config: &CanConfig) -> [u8; RECORD_SIZE] {
    let mut buffer = [0u8; RECORD_SIZE];
    let filter = &config.filter;

    buffer[MODE_OFFSET] = match filter.mode {
        FilterMode::Monitoring => MODE_MONITORING,
        FilterMode::Specific => MODE_SPECIFIC,
    };
    buffer[COUNT_OFFSET] = filter.ids.len() as u8;

    for (slot, id) in filter.ids.as_slice().iter().enumerate() {
        let offset = IDS_OFFSET + slot * 4;
        buffer[offset..offset + 4].copy_from_slice(&id.to_le_bytes());
    }

    buffer[EXTENDED_OFFSET] = filter.extended as u8;
    buffer[BITRATE_OFFSET..BITRATE_OFFSET + 4].copy_from_slice(&config.bus.bitrate.to_le_bytes());

    buffer
}

//==================================================================================DECODE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Successfully decoded record.
pub struct DecodedRecord {
    pub config: CanConfig,
    /// Bitrate as found in the record, before sanitising.
    pub stored_bitrate: u32,
}

impl DecodedRecord {
    /// The stored bitrate was unsupported and was replaced by the default.
    pub fn bitrate_replaced(&self) -> bool {
        self.config.bus.bitrate != self.stored_bitrate
    }
}

/// Parse a stored blob.
///
/// Structural problems (size, mode byte, ID count, invalid filter) reject the
/// whole record. An unsupported bitrate alone is replaced by
/// [`DEFAULT_BITRATE`] and flagged in the result.
pub fn decode(bytes: &[u8]) -> Result<DecodedRecord, RecordError> {
    let buffer: &[u8; RECORD_SIZE] = bytes
        .try_into()
        .map_err(|_| RecordError::InvalidSize { len: bytes.len() })?;

    let mode = match buffer[MODE_OFFSET] {
        MODE_MONITORING => FilterMode::Monitoring,
        MODE_SPECIFIC => FilterMode::Specific,
        other => return Err(RecordError::InvalidMode(other)),
    };

    let count = buffer[COUNT_OFFSET];
    if count as usize > MAX_ACCEPTED_IDS {
        return Err(RecordError::InvalidIdCount(count));
    }

    let mut ids = AcceptedIds::new();
    for slot in 0..count as usize {
        let offset = IDS_OFFSET + slot * 4;
        ids.push(read_u32_le(buffer, offset))?;
    }

    let filter = FilterConfig {
        mode,
        ids,
        extended: buffer[EXTENDED_OFFSET] == 1,
    };
    filter.validate()?;

    let stored_bitrate = read_u32_le(buffer, BITRATE_OFFSET);
    let bitrate = match Bitrate::from_bps(stored_bitrate) {
        Some(_) => stored_bitrate,
        None => DEFAULT_BITRATE,
    };

    Ok(DecodedRecord {
        config: CanConfig::new(filter, bitrate),
        stored_bitrate,
    })
}

#[inline]
fn read_u32_le(buffer: &[u8; RECORD_SIZE], offset: usize) -> u32 {
    u32::from_le_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ])
}
