//! Ingestion engine driven end to end against the in-memory controller.
mod helpers {
    include!("../helpers/mod.rs");
}

use std::sync::atomic::Ordering;
use std::sync::Mutex;

use can_ingest::error::{IngestionError, ResourceError};
use can_ingest::ingestion::{FrameCallback, HeadroomProbe};
use can_ingest::transport::STOP_GRACE;
use can_ingest::{
    FilterConfig, FilterMode, Frame, IngestionEngine, StopOutcome, TaskState,
};
use embassy_time::Duration;
use helpers::{std_frame, wait_until, MockFrameSource, MockTimer};
use static_cell::StaticCell;

static ENGINE: StaticCell<IngestionEngine> = StaticCell::new();

#[tokio::test]
/// Accepted frames come out in arrival order; overflow drops the newest and is
/// counted.
async fn ingestion_preserves_order_and_counts_overflow() {
    let source = MockFrameSource::ready();
    source.push_frames((1..=20).map(std_frame));

    let engine: IngestionEngine = IngestionEngine::new();
    let runner = engine.start(&source, None).expect("start must succeed");
    let mut timer = MockTimer;

    let driver = async {
        wait_until(|| source.pending_frames() == 0).await;

        assert_eq!(engine.queued_count(), engine.capacity());
        assert_eq!(engine.statistics_snapshot().frames_dropped, 4);

        let ids: Vec<u32> = std::iter::from_fn(|| engine.pop()).map(|f| f.id).collect();
        assert_eq!(ids, (1..=16).collect::<Vec<_>>());
        assert_eq!(engine.queued_count(), 0);

        engine.stop(&mut timer, STOP_GRACE).await
    };

    let ((), outcome) = tokio::join!(runner.run(), driver);
    assert_eq!(outcome, StopOutcome::Stopped);
    assert_eq!(engine.state(), TaskState::Stopped);
    assert_eq!(engine.statistics().frames_dropped(), 4);

    engine.reset_statistics();
    assert_eq!(engine.statistics_snapshot().frames_dropped, 0);
}

#[tokio::test]
/// Frames already waiting in the controller are drained in one burst after a
/// single blocking receive.
async fn ingestion_drains_bursts_without_blocking() {
    let source = MockFrameSource::ready();
    source.push_frames((0x10..0x1A).map(std_frame));

    let engine: IngestionEngine = IngestionEngine::new();
    let runner = engine.start(&source, None).unwrap();
    let mut timer = MockTimer;

    let driver = async {
        wait_until(|| engine.queued_count() == 10).await;
        engine.stop(&mut timer, STOP_GRACE).await
    };

    let ((), outcome) = tokio::join!(runner.run(), driver);
    assert_eq!(outcome, StopOutcome::Stopped);
    assert_eq!(source.received_blocking.load(Ordering::SeqCst), 1);
    assert_eq!(source.received_burst.load(Ordering::SeqCst), 9);
}

#[tokio::test]
/// The callback sees every accepted frame and nothing else.
async fn ingestion_invokes_callback_for_accepted_frames() {
    let source = MockFrameSource::ready();
    let seen = Mutex::new(Vec::new());
    let on_frame: &FrameCallback<'_> = &|frame: &Frame| seen.lock().unwrap().push(frame.id);

    let engine: IngestionEngine = IngestionEngine::new();
    engine
        .set_filter(FilterConfig::specific(&[0x123, 0x456], false).unwrap())
        .unwrap();
    source.push_frames([0x100, 0x123, 0x200, 0x456, 0x123].map(std_frame));
    source.push_frames([Frame::new_data(0x123, true, &[1]).unwrap()]);

    let runner = engine.start(&source, Some(on_frame)).unwrap();
    let mut timer = MockTimer;

    let driver = async {
        wait_until(|| source.pending_frames() == 0).await;
        let queued = engine.queued_count();
        let outcome = engine.stop(&mut timer, STOP_GRACE).await;
        (queued, outcome)
    };

    let ((), (queued, outcome)) = tokio::join!(runner.run(), driver);
    assert_eq!(outcome, StopOutcome::Stopped);
    assert_eq!(queued, 3);
    assert_eq!(*seen.lock().unwrap(), vec![0x123, 0x456, 0x123]);
}

#[tokio::test]
/// A filter published while running applies to the following frames.
async fn ingestion_picks_up_filter_changes() {
    let source = MockFrameSource::ready();
    let engine: IngestionEngine = IngestionEngine::new();
    let runner = engine.start(&source, None).unwrap();
    let mut timer = MockTimer;

    let driver = async {
        engine.set_accepted_ids(&[0x100], false).unwrap();
        engine.set_filter_mode(FilterMode::Specific).unwrap();
        source.push_frames([0x100, 0x200].map(std_frame));
        wait_until(|| source.pending_frames() == 0).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(engine.pop().map(|f| f.id), Some(0x100));
        assert_eq!(engine.pop(), None);

        engine.set_filter_mode(FilterMode::Monitoring).unwrap();
        source.push_frames([std_frame(0x200)]);
        wait_until(|| engine.queued_count() == 1).await;
        assert_eq!(engine.pop().map(|f| f.id), Some(0x200));

        engine.stop(&mut timer, STOP_GRACE).await
    };

    let ((), outcome) = tokio::join!(runner.run(), driver);
    assert_eq!(outcome, StopOutcome::Stopped);
}

#[tokio::test]
/// Invalid filters are refused and the published one is kept.
async fn ingestion_rejects_invalid_filter() {
    let engine: IngestionEngine = IngestionEngine::new();
    assert!(engine.set_filter_mode(FilterMode::Specific).is_err());
    assert!(engine.set_accepted_ids(&[1, 2, 3, 4, 5, 6], false).is_err());
    assert_eq!(engine.filter(), FilterConfig::monitoring());

    engine
        .set_filter(FilterConfig::specific(&[0x100], false).unwrap())
        .unwrap();
    assert!(engine.set_accepted_ids(&[0x800], false).is_err());
    assert_eq!(engine.filter().ids.as_slice(), &[0x100]);

    engine.set_accepted_ids(&[0x800], true).unwrap();
    let filter = engine.filter();
    assert_eq!(filter.mode, FilterMode::Specific);
    assert_eq!(filter.ids.as_slice(), &[0x800]);
    assert!(filter.extended);
}

#[tokio::test]
/// Starting needs a ready source and a free runner slot.
async fn ingestion_start_errors() {
    let engine: IngestionEngine = IngestionEngine::new();

    let idle = MockFrameSource::default();
    assert!(matches!(
        engine.start(&idle, None),
        Err(IngestionError::Init)
    ));
    assert_eq!(engine.state(), TaskState::Stopped);

    let source = MockFrameSource::ready();
    let runner = engine.start(&source, None).unwrap();
    assert!(matches!(
        engine.start(&source, None),
        Err(IngestionError::Resource(ResourceError::RunnerActive))
    ));
    drop(runner);
}

#[tokio::test]
/// A runner that never observes the stop request yields `TimedOut` and keeps
/// its slot until it goes away.
async fn ingestion_stop_timeout_and_restart() {
    let source = MockFrameSource::ready();
    let engine: IngestionEngine = IngestionEngine::new();
    let mut timer = MockTimer;

    assert_eq!(
        engine.stop(&mut timer, STOP_GRACE).await,
        StopOutcome::AlreadyStopped
    );

    let stalled = engine.start(&source, None).unwrap();
    assert_eq!(
        engine.stop(&mut timer, Duration::from_millis(20)).await,
        StopOutcome::TimedOut
    );
    assert_eq!(engine.state(), TaskState::Stopped);
    assert!(matches!(
        engine.start(&source, None),
        Err(IngestionError::Resource(ResourceError::RunnerActive))
    ));

    drop(stalled);
    let runner = engine.start(&source, None).unwrap();
    let driver = async {
        tokio::time::sleep(std::time::Duration::from_millis(15)).await;
        engine.stop(&mut timer, STOP_GRACE).await
    };
    let ((), outcome) = tokio::join!(runner.run(), driver);
    assert_eq!(outcome, StopOutcome::Stopped);
}

#[tokio::test]
/// Stopping discards whatever the application did not pop.
async fn ingestion_stop_releases_queue() {
    let source = MockFrameSource::ready();
    source.push_frames((1..=5).map(std_frame));

    let engine: IngestionEngine = IngestionEngine::new();
    let runner = engine.start(&source, None).unwrap();
    let mut timer = MockTimer;

    let driver = async {
        wait_until(|| engine.queued_count() == 5).await;
        engine.stop(&mut timer, STOP_GRACE).await
    };
    let ((), outcome) = tokio::join!(runner.run(), driver);

    assert_eq!(outcome, StopOutcome::Stopped);
    assert_eq!(engine.queued_count(), 0);
    assert_eq!(engine.pop(), None);

    let _runner = engine.start(&source, None).unwrap();
    assert_eq!(engine.queued_count(), 0);
}

#[tokio::test]
/// The headroom probe is sampled periodically and its value published.
async fn ingestion_samples_headroom() {
    let source = MockFrameSource::ready();
    let engine: IngestionEngine = IngestionEngine::new();
    let probe: &HeadroomProbe<'_> = &|| 2048;

    assert_eq!(engine.headroom(), None);
    let runner = engine
        .start(&source, None)
        .unwrap()
        .with_receive_timeout(Duration::from_micros(200))
        .with_headroom_probe(probe);
    let mut timer = MockTimer;

    let driver = async {
        wait_until(|| engine.headroom().is_some()).await;
        engine.stop(&mut timer, STOP_GRACE).await
    };
    let ((), outcome) = tokio::join!(runner.run(), driver);

    assert_eq!(outcome, StopOutcome::Stopped);
    assert_eq!(engine.headroom(), Some(2048));
}

#[tokio::test]
/// Engine kept in static storage, runner fed by a local source and a callback
/// borrowing a local counter.
async fn ingestion_runs_from_static_engine() {
    let engine: &'static IngestionEngine = ENGINE.init(IngestionEngine::new());
    let source = MockFrameSource::ready();
    source.push_frames((0x20..0x24).map(std_frame));

    let accepted = Mutex::new(0usize);
    let on_frame: &FrameCallback<'_> = &|_: &Frame| *accepted.lock().unwrap() += 1;

    let runner = engine.start(&source, Some(on_frame)).unwrap();
    let mut timer = MockTimer;

    let driver = async {
        wait_until(|| engine.queued_count() == 4).await;
        let ids: Vec<u32> = std::iter::from_fn(|| engine.pop()).map(|f| f.id).collect();
        let outcome = engine.stop(&mut timer, STOP_GRACE).await;
        (ids, outcome)
    };

    let ((), (ids, outcome)) = tokio::join!(runner.run(), driver);
    assert_eq!(outcome, StopOutcome::Stopped);
    assert_eq!(ids, vec![0x20, 0x21, 0x22, 0x23]);
    assert_eq!(*accepted.lock().unwrap(), 4);
}
