//! Host walkthrough of the device start-up sequence: load the persisted
//! configuration, open the upload window on stdin/stdout, apply the result to a
//! simulated controller and ingest a few frames through the software filter.
//!
//! ```text
//! echo '{"mode":"specific","ids":[291,1110]}' | cargo run --example upload_session
//! ```
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use can_ingest::transport::{
    alerts::AlertMask,
    settings::{BusMode, BusSettings, BusStatus},
    traits::{
        byte_stream::ByteStream, frame_source::FrameSource, persistent_store::PersistentStore,
        timer::Timer,
    },
    STOP_GRACE,
};
use can_ingest::{apply_to_bus, ConfigProtocol, ConfigStore, Frame, IngestionEngine};
use embassy_time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const UPLOAD_WINDOW: Duration = Duration::from_secs(5);

fn to_std(duration: Duration) -> std::time::Duration {
    std::time::Duration::from_micros(duration.as_micros())
}

//==================================================================================HOST_DOUBLES
struct TokioTimer;

impl Timer for TokioTimer {
    async fn delay(&mut self, duration: Duration) {
        tokio::time::sleep(to_std(duration)).await;
    }
}

/// Stdin/stdout standing in for the serial console.
struct Console {
    input: tokio::io::Stdin,
    output: tokio::io::Stdout,
}

impl ByteStream for Console {
    type Error = std::io::Error;

    async fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> Result<usize, Self::Error> {
        self.input.read(buf).await
    }

    async fn write_all<'a>(&'a mut self, bytes: &'a [u8]) -> Result<(), Self::Error> {
        self.output.write_all(bytes).await?;
        self.output.flush().await
    }
}

#[derive(Default)]
struct RamStore(HashMap<String, Vec<u8>>);

impl PersistentStore for RamStore {
    type Error = std::convert::Infallible;

    fn get_bytes(&self, key: &str, buf: &mut [u8]) -> Option<usize> {
        let value = self.0.get(key)?;
        let len = value.len().min(buf.len());
        buf[..len].copy_from_slice(&value[..len]);
        Some(value.len())
    }

    fn set_bytes(&mut self, key: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        self.0.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Self::Error> {
        self.0.remove(key);
        Ok(())
    }
}

/// Controller replaying a fixed bus capture.
#[derive(Default)]
struct ReplaySource {
    capture: Mutex<VecDeque<Frame>>,
    settings: Mutex<Option<BusSettings>>,
}

impl FrameSource for ReplaySource {
    type Error = ();

    fn start(&self, settings: &BusSettings) -> Result<(), ()> {
        println!("[bus] start {:?}", settings);
        *self.settings.lock().map_err(|_| ())? = Some(*settings);
        Ok(())
    }

    fn stop(&self) {
        if let Ok(mut settings) = self.settings.lock() {
            *settings = None;
        }
    }

    fn is_ready(&self) -> bool {
        self.settings.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    async fn transmit<'a>(&'a self, _frame: &'a Frame, _timeout: Duration) -> Result<(), ()> {
        Ok(())
    }

    async fn receive(&self, timeout: Duration) -> Option<Frame> {
        if let Some(frame) = self.try_receive() {
            return Some(frame);
        }
        tokio::time::sleep(to_std(timeout)).await;
        None
    }

    fn try_receive(&self) -> Option<Frame> {
        self.capture.lock().ok()?.pop_front()
    }

    fn status(&self) -> BusStatus {
        BusStatus::default()
    }

    async fn read_alerts(&self, timeout: Duration) -> AlertMask {
        tokio::time::sleep(to_std(timeout)).await;
        AlertMask::empty()
    }

    fn initiate_recovery(&self) {}
}

//==================================================================================MAIN
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = ConfigStore::new(RamStore::default());
    println!("[config] load: {:?}", store.load());

    let console = Console {
        input: tokio::io::stdin(),
        output: tokio::io::stdout(),
    };
    let mut protocol: ConfigProtocol<_> = ConfigProtocol::new(console);
    let mut timer = TokioTimer;
    let outcome = protocol
        .await_upload(&mut store, &mut timer, UPLOAD_WINDOW)
        .await?;
    println!("[config] upload: {:?}", outcome);
    println!("[config] active: {}", store.summary_json());

    let source = ReplaySource::default();
    let engine: IngestionEngine = IngestionEngine::new();
    apply_to_bus(&store, &source, &engine, BusMode::ListenOnly)
        .map_err(|err| format!("apply failed: {err}"))?;

    if let Ok(mut capture) = source.capture.lock() {
        for id in [0x100, 0x123, 0x456, 0x7DF, 0x123] {
            capture.extend(Frame::new_data(id, false, &[0xAA, 0x55]));
        }
    }

    let runner = engine
        .start(&source, None)
        .map_err(|err| format!("start failed: {err}"))?;
    let driver = async {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        while let Some(frame) = engine.pop() {
            println!("[rx] id={:#05X} data={:02X?}", frame.id, frame.payload());
        }
        engine.stop(&mut TokioTimer, STOP_GRACE).await
    };
    let ((), stopped) = tokio::join!(runner.run(), driver);
    println!(
        "[ingest] {:?}, stats: {:?}",
        stopped,
        engine.statistics_snapshot()
    );

    Ok(())
}
