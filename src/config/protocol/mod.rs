//! Line-oriented JSON configuration upload over a [`ByteStream`], and the
//! step that pushes the stored configuration to the bus.
//!
//! ## Request
//!
//! One JSON object per line, terminated by `\n` or `\r`:
//!
//! ```text
//! {"mode":"specific","ids":[291,1110],"extended":false,"bitrate":500000}
//! {"mode":"monitoring"}
//! ```
//!
//! `ids` entries are coerced to `u32` (anything else counts as zero); zero
//! entries are skipped and at most five are kept. `extended` defaults to
//! `false`, `bitrate` to 500000.
//!
//! ## Replies
//!
//! ```text
//! {"status":"ok","mode":"specific","active_ids":2,"bitrate":500000}
//! {"status":"error","message":"Missing 'mode' field"}
//! ```
use alloc::string::ToString;

use embassy_time::Duration;
use futures_util::{
    future::{pending, select, Either},
    pin_mut,
};
use serde::Serialize;
use serde_json::Value;

use crate::config::{store::ConfigStore, CanConfig, DEFAULT_BITRATE};
use crate::error::{ApplyError, RequestError};
use crate::ingestion::{
    filter::{AcceptedIds, FilterConfig, FilterMode, MAX_ACCEPTED_IDS},
    IngestionEngine,
};
use crate::transport::{
    settings::{BusMode, BusSettings},
    traits::{
        byte_stream::ByteStream, frame_source::FrameSource,
        persistent_store::PersistentStore, timer::Timer,
    },
};

/// Longest accepted request line, terminator excluded.
pub const MAX_UPLOAD_LINE: usize = 256;

const READ_CHUNK: usize = 32;

//==================================================================================UPLOAD_OUTCOME
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UploadOutcome {
    /// A valid configuration was applied and persisted.
    Received,
    /// The window closed without a valid configuration.
    NotReceived,
}

//==================================================================================LINE_BUFFER
enum Feed {
    Pending,
    Complete,
    Overflow,
}

/// Accumulates bytes up to a terminator. An overlong line is reported once and
/// then discarded up to its terminator.
struct LineBuffer<const N: usize> {
    bytes: heapless::Vec<u8, N>,
    discarding: bool,
}

impl<const N: usize> LineBuffer<N> {
    const fn new() -> Self {
        Self {
            bytes: heapless::Vec::new(),
            discarding: false,
        }
    }

    fn feed(&mut self, byte: u8) -> Feed {
        if byte == b'\n' || byte == b'\r' {
            let complete = !self.discarding && !self.bytes.is_empty();
            self.discarding = false;
            return if complete { Feed::Complete } else { Feed::Pending };
        }
        if self.discarding {
            return Feed::Pending;
        }
        if self.bytes.push(byte).is_err() {
            self.bytes.clear();
            self.discarding = true;
            return Feed::Overflow;
        }
        Feed::Pending
    }

    fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    fn clear(&mut self) {
        self.bytes.clear();
        self.discarding = false;
    }
}

//==================================================================================REPLIES
#[derive(Serialize)]
struct Ack<'a> {
    status: &'a str,
    mode: &'a str,
    active_ids: usize,
    bitrate: u32,
}

#[derive(Serialize)]
struct Nack<'a> {
    status: &'a str,
    message: &'a str,
}

//==================================================================================REQUEST
/// Turn one request line into a configuration candidate. Does not validate
/// bitrate, ID range or duplicates; that is [`ConfigStore::apply`]'s job.
pub fn parse_request(line: &[u8]) -> Result<CanConfig, RequestError> {
    let request: Value = serde_json::from_slice(line).map_err(|_| RequestError::InvalidJson)?;

    let mode = request
        .get("mode")
        .and_then(Value::as_str)
        .ok_or(RequestError::MissingMode)?;

    let (mode, ids) = match mode {
        "monitoring" => (FilterMode::Monitoring, AcceptedIds::new()),
        "specific" => {
            let entries = request
                .get("ids")
                .and_then(Value::as_array)
                .ok_or(RequestError::MissingIds)?;
            let mut ids = AcceptedIds::new();
            for id in entries.iter().map(coerce_id).filter(|&id| id != 0) {
                if ids.len() == MAX_ACCEPTED_IDS {
                    break;
                }
                ids.push(id)?;
            }
            if ids.is_empty() {
                return Err(RequestError::NoValidIds);
            }
            (FilterMode::Specific, ids)
        }
        _ => return Err(RequestError::UnknownMode),
    };

    let extended = request
        .get("extended")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let bitrate = request
        .get("bitrate")
        .and_then(Value::as_u64)
        .and_then(|bitrate| u32::try_from(bitrate).ok())
        .unwrap_or(DEFAULT_BITRATE);

    Ok(CanConfig::new(FilterConfig { mode, ids, extended }, bitrate))
}

/// Numeric entries that fit a `u32` (fractions truncated); everything else
/// becomes zero.
fn coerce_id(value: &Value) -> u32 {
    if let Some(id) = value.as_u64() {
        return u32::try_from(id).unwrap_or(0);
    }
    match value.as_f64() {
        Some(id) if id >= 0.0 && id < 4_294_967_296.0 => id as u32,
        _ => 0,
    }
}

//==================================================================================CONFIG_PROTOCOL
/// Upload session over a byte stream.
pub struct ConfigProtocol<B: ByteStream, const N: usize = MAX_UPLOAD_LINE> {
    stream: B,
    line: LineBuffer<N>,
}

impl<B: ByteStream, const N: usize> ConfigProtocol<B, N> {
    pub fn new(stream: B) -> Self {
        Self {
            stream,
            line: LineBuffer::new(),
        }
    }

    /// Give the stream back.
    pub fn into_inner(self) -> B {
        self.stream
    }

    /// Listen for a configuration during `window`.
    ///
    /// Every complete line gets exactly one reply. The first valid line is
    /// applied, saved and acknowledged, ending the window early with
    /// [`UploadOutcome::Received`]; invalid lines are answered with an error
    /// and the window keeps running. A closed stream just waits for the
    /// window to end. Only stream I/O errors are returned as `Err`.
    pub async fn await_upload<S: PersistentStore, T: Timer>(
        &mut self,
        store: &mut ConfigStore<S>,
        timer: &mut T,
        window: Duration,
    ) -> Result<UploadOutcome, B::Error> {
        self.line.clear();

        #[cfg(feature = "defmt")]
        defmt::info!("Upload window open for {} ms", window.as_millis());

        let collect = self.collect(store);
        let deadline = timer.delay(window);
        pin_mut!(collect);
        pin_mut!(deadline);

        match select(collect, deadline).await {
            Either::Left((result, _)) => result.map(|()| UploadOutcome::Received),
            Either::Right(_) => {
                #[cfg(feature = "defmt")]
                defmt::info!("Upload window closed - keeping stored configuration");

                Ok(UploadOutcome::NotReceived)
            }
        }
    }

    /// Read until a request is accepted.
    async fn collect<S: PersistentStore>(
        &mut self,
        store: &mut ConfigStore<S>,
    ) -> Result<(), B::Error> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let count = self.stream.read(&mut chunk).await?;
            if count == 0 {
                pending::<()>().await;
            }

            for &byte in &chunk[..count] {
                match self.line.feed(byte) {
                    Feed::Pending => {}
                    Feed::Overflow => self.reject(RequestError::LineTooLong).await?,
                    Feed::Complete => {
                        let result = commit(self.line.as_slice(), store);
                        self.line.clear();
                        match result {
                            Ok(()) => {
                                self.acknowledge(store.config()).await?;
                                return Ok(());
                            }
                            Err(error) => self.reject(error).await?,
                        }
                    }
                }
            }
        }
    }

    async fn acknowledge(&mut self, config: &CanConfig) -> Result<(), B::Error> {
        let reply = Ack {
            status: "ok",
            mode: config.filter.mode.as_str(),
            active_ids: config.filter.ids.len(),
            bitrate: config.bus.bitrate,
        };

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Configuration uploaded - mode: {}, ids: {}, bitrate: {}",
            reply.mode,
            reply.active_ids,
            reply.bitrate
        );

        self.reply(&reply).await
    }

    async fn reject(&mut self, error: RequestError) -> Result<(), B::Error> {
        #[cfg(feature = "defmt")]
        defmt::warn!("Configuration rejected: {}", error);

        let message = error.to_string();
        self.reply(&Nack {
            status: "error",
            message: &message,
        })
        .await
    }

    async fn reply<R: Serialize>(&mut self, reply: &R) -> Result<(), B::Error> {
        let mut line = serde_json::to_vec(reply).unwrap_or_default();
        line.push(b'\n');
        self.stream.write_all(&line).await
    }
}

/// Parse, apply and persist one request. A failed save puts the previous
/// configuration back.
fn commit<S: PersistentStore>(
    line: &[u8],
    store: &mut ConfigStore<S>,
) -> Result<(), RequestError> {
    let candidate = parse_request(line)?;
    let previous = *store.config();
    store.apply(candidate)?;

    if store.save().is_err() {
        store.restore(previous);
        return Err(RequestError::Persist);
    }
    Ok(())
}

//==================================================================================APPLY_TO_BUS
/// Restart `source` at the stored bitrate in `mode`, then publish the stored
/// filter to `engine`.
///
/// The hardware acceptance filter is left open; filtering happens in software.
/// A failed restart leaves the source stopped and the engine filter unchanged.
pub fn apply_to_bus<S: PersistentStore, F: FrameSource, const CAP: usize>(
    store: &ConfigStore<S>,
    source: &F,
    engine: &IngestionEngine<CAP>,
    mode: BusMode,
) -> Result<(), ApplyError<F::Error>> {
    let config = store.config();
    let settings = BusSettings::new(config.bus.bitrate()?).with_mode(mode);

    source.stop();
    source.start(&settings).map_err(|error| {
        #[cfg(feature = "defmt")]
        defmt::error!("Bus restart at {} bps failed", config.bus.bitrate);

        ApplyError::BusRestart(error)
    })?;
    engine.set_filter(config.filter)?;

    #[cfg(feature = "defmt")]
    defmt::info!(
        "Configuration applied - bitrate: {}, mode: {}, ids: {}",
        config.bus.bitrate,
        config.filter.mode,
        config.filter.ids.len()
    );

    Ok(())
}
