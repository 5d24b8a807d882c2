//! Configuration upload window over a scripted serial stream.
mod helpers {
    include!("../helpers/mod.rs");
}

use can_ingest::config::{DEFAULT_BITRATE, STORE_KEY};
use can_ingest::ingestion::filter::accept;
use can_ingest::{
    CanConfig, ConfigProtocol, ConfigStore, FilterConfig, FilterMode, LoadOutcome, UploadOutcome,
};
use embassy_time::Duration;
use helpers::{std_frame, MemoryStore, MockTimer, ScriptedStream};
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_millis(300);

#[tokio::test]
/// A valid specific-mode upload is applied, persisted and acknowledged.
async fn upload_specific_configuration() {
    let mut store = ConfigStore::new(MemoryStore::default());
    assert_eq!(store.load(), LoadOutcome::Absent);

    let stream = ScriptedStream::new().then(
        10,
        b"{\"mode\":\"specific\",\"ids\":[291,1110],\"extended\":false,\"bitrate\":500000}\n",
    );
    let mut protocol: ConfigProtocol<_> = ConfigProtocol::new(stream);
    let mut timer = MockTimer;

    let outcome = protocol
        .await_upload(&mut store, &mut timer, Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(outcome, UploadOutcome::Received);

    let filter = store.filter();
    assert_eq!(filter.mode, FilterMode::Specific);
    assert_eq!(filter.ids.as_slice(), &[0x123, 0x456]);
    assert!(!filter.extended);
    assert_eq!(store.bitrate(), 500_000);

    assert_eq!(
        protocol.into_inner().replies(),
        vec![r#"{"status":"ok","mode":"specific","active_ids":2,"bitrate":500000}"#]
    );

    let expected = *store.config();
    let mut reloaded = ConfigStore::new(store.into_inner());
    assert_eq!(reloaded.load(), LoadOutcome::Loaded);
    assert_eq!(reloaded.config(), &expected);
}

#[tokio::test]
/// Without input the window lasts its full length and nothing changes.
async fn upload_window_times_out() {
    let mut store = ConfigStore::new(MemoryStore::default());
    store.load();
    let before = *store.config();

    let mut protocol: ConfigProtocol<_> = ConfigProtocol::new(ScriptedStream::new());
    let mut timer = MockTimer;

    let started = Instant::now();
    let outcome = protocol
        .await_upload(&mut store, &mut timer, WINDOW)
        .await
        .unwrap();

    assert_eq!(outcome, UploadOutcome::NotReceived);
    let elapsed = started.elapsed();
    assert!(elapsed >= helpers::to_std(WINDOW));
    assert!(elapsed < helpers::to_std(WINDOW) + std::time::Duration::from_millis(150));
    assert_eq!(store.config(), &before);
    assert!(store.store().entries.is_empty());
    assert!(protocol.into_inner().written.is_empty());
}

#[tokio::test]
/// A malformed line is answered with an error and the next line is accepted.
async fn upload_recovers_after_malformed_line() {
    let mut store = ConfigStore::new(MemoryStore::default());
    let stream = ScriptedStream::new()
        .then(5, b"{bad json\n")
        .then(5, b"{\"mode\":\"monitoring\",\"bitrate\":250000}\r");
    let mut protocol: ConfigProtocol<_> = ConfigProtocol::new(stream);
    let mut timer = MockTimer;

    let outcome = protocol
        .await_upload(&mut store, &mut timer, WINDOW)
        .await
        .unwrap();

    assert_eq!(outcome, UploadOutcome::Received);
    assert_eq!(store.filter().mode, FilterMode::Monitoring);
    assert_eq!(store.bitrate(), 250_000);
    assert_eq!(
        protocol.into_inner().replies(),
        vec![
            r#"{"status":"error","message":"Invalid JSON"}"#,
            r#"{"status":"ok","mode":"monitoring","active_ids":0,"bitrate":250000}"#,
        ]
    );
}

#[tokio::test]
/// Requests split across reads are reassembled.
async fn upload_reassembles_fragmented_line() {
    let mut store = ConfigStore::new(MemoryStore::default());
    let stream = ScriptedStream::new()
        .then(5, b"{\"mode\":\"spec")
        .then(5, b"ific\",\"ids\":[0,7,0],\"extended\":true")
        .then(5, b",\"bitrate\":1000000}\r\n");
    let mut protocol: ConfigProtocol<_> = ConfigProtocol::new(stream);
    let mut timer = MockTimer;

    let outcome = protocol
        .await_upload(&mut store, &mut timer, WINDOW)
        .await
        .unwrap();

    assert_eq!(outcome, UploadOutcome::Received);
    assert_eq!(store.filter().ids.as_slice(), &[7]);
    assert!(store.filter().extended);
    assert_eq!(store.bitrate(), 1_000_000);
}

#[tokio::test]
/// Invalid candidates are rejected without touching the stored configuration
/// and the window runs to its end.
async fn upload_rejects_invalid_configuration() {
    let mut store = ConfigStore::new(MemoryStore::default());
    let stream = ScriptedStream::new()
        .then(5, b"{\"mode\":\"specific\",\"ids\":[4096]}\n")
        .then(5, b"{\"mode\":\"monitoring\",\"bitrate\":300000}\n")
        .then(5, b"{\"ids\":[1]}\n");
    let mut protocol: ConfigProtocol<_> = ConfigProtocol::new(stream);
    let mut timer = MockTimer;

    let outcome = protocol
        .await_upload(&mut store, &mut timer, WINDOW)
        .await
        .unwrap();

    assert_eq!(outcome, UploadOutcome::NotReceived);
    assert_eq!(store.config(), &CanConfig::default());
    assert!(store.store().entries.is_empty());

    let replies = protocol.into_inner().replies();
    assert_eq!(replies.len(), 3);
    assert!(replies[0].starts_with(r#"{"status":"error","message":"Validation failed: ID 0"#));
    assert!(replies[1].contains("Unsupported bitrate 300000"));
    assert_eq!(
        replies[2],
        r#"{"status":"error","message":"Missing 'mode' field"}"#
    );
}

#[tokio::test]
/// An overlong line is refused once; the following line still counts.
async fn upload_refuses_overlong_line() {
    let mut store = ConfigStore::new(MemoryStore::default());
    let mut long_line = vec![b'x'; 300];
    long_line.push(b'\n');
    let stream = ScriptedStream::new()
        .then(5, &long_line)
        .then(5, b"{\"mode\":\"specific\",\"ids\":[5]}\n");
    let mut protocol: ConfigProtocol<_> = ConfigProtocol::new(stream);
    let mut timer = MockTimer;

    let outcome = protocol
        .await_upload(&mut store, &mut timer, WINDOW)
        .await
        .unwrap();

    assert_eq!(outcome, UploadOutcome::Received);
    assert_eq!(
        protocol.into_inner().replies(),
        vec![
            r#"{"status":"error","message":"Line too long"}"#,
            r#"{"status":"ok","mode":"specific","active_ids":1,"bitrate":500000}"#,
        ]
    );
}

#[tokio::test]
/// A store that refuses the write leaves the previous configuration in effect.
async fn upload_rolls_back_on_persist_failure() {
    let mut store = ConfigStore::new(MemoryStore {
        fail_writes: true,
        ..MemoryStore::default()
    });
    let stream = ScriptedStream::new().then(5, b"{\"mode\":\"specific\",\"ids\":[5]}\n");
    let mut protocol: ConfigProtocol<_> = ConfigProtocol::new(stream);
    let mut timer = MockTimer;

    let outcome = protocol
        .await_upload(&mut store, &mut timer, WINDOW)
        .await
        .unwrap();

    assert_eq!(outcome, UploadOutcome::NotReceived);
    assert_eq!(store.config(), &CanConfig::default());
    assert_eq!(store.bitrate(), DEFAULT_BITRATE);
    assert!(!store.store().entries.contains_key(STORE_KEY));
    assert_eq!(
        protocol.into_inner().replies(),
        vec![r#"{"status":"error","message":"Failed to persist configuration"}"#]
    );
}

#[tokio::test]
/// Three standard IDs at 250 kbps: listed IDs pass the filter, others do not.
async fn upload_scenario_a_accepts_listed_ids() {
    let mut store = ConfigStore::new(MemoryStore::default());
    let stream = ScriptedStream::new().then(
        5,
        b"{\"mode\":\"specific\",\"ids\":[256,512,768],\"extended\":false,\"bitrate\":250000}\n",
    );
    let mut protocol: ConfigProtocol<_> = ConfigProtocol::new(stream);
    let mut timer = MockTimer;

    let outcome = protocol
        .await_upload(&mut store, &mut timer, WINDOW)
        .await
        .unwrap();

    assert_eq!(outcome, UploadOutcome::Received);
    assert_eq!(store.filter().ids.as_slice(), &[256, 512, 768]);
    assert_eq!(store.bitrate(), 250_000);
    assert!(accept(&std_frame(256), store.filter()));
    assert!(!accept(&std_frame(999), store.filter()));
}

#[tokio::test]
/// A standard ID above 0x7FF is refused and the previous configuration stays.
async fn upload_scenario_b_rejects_out_of_range_id() {
    let mut store = ConfigStore::new(MemoryStore::default());
    let prior = CanConfig::new(FilterConfig::specific(&[0x10], false).unwrap(), 125_000);
    store.apply(prior).unwrap();
    store.save().unwrap();
    let stored = store.store().entries.get(STORE_KEY).cloned();

    let stream = ScriptedStream::new().then(
        5,
        b"{\"mode\":\"specific\",\"ids\":[2048],\"extended\":false}\n",
    );
    let mut protocol: ConfigProtocol<_> = ConfigProtocol::new(stream);
    let mut timer = MockTimer;

    let outcome = protocol
        .await_upload(&mut store, &mut timer, WINDOW)
        .await
        .unwrap();

    assert_eq!(outcome, UploadOutcome::NotReceived);
    assert_eq!(store.config(), &prior);
    assert_eq!(store.store().entries.get(STORE_KEY).cloned(), stored);

    let replies = protocol.into_inner().replies();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with(r#"{"status":"error","message":"Validation failed"#));
}
