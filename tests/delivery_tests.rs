//! Delivery ordering and backpressure tests.

use rocketcap::device::{CaptureCallbacks, CaptureSession, RocketCapture};
use rocketcap::element::{HardwareMedium, Pad, Stage, StageCategory};
use rocketcap::elements::StreamId;
use rocketcap::elements::testing::{packet, packetize};
use rocketcap::registry::{MemoryRegistry, StageFactory};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn session(callbacks: CaptureCallbacks) -> CaptureSession {
    let input = HardwareMedium::standard(1);
    let output = HardwareMedium::standard(2);

    let registry = MemoryRegistry::new();
    registry.register(
        Stage::hardware("Crossbar", StageCategory::Crossbar)
            .with_pad(Pad::output("Out").with_medium(input)),
    );
    registry.register(
        Stage::hardware("Encoder", StageCategory::Encoder)
            .with_pad(Pad::input("In").with_medium(output))
            .with_pad(Pad::output("TS")),
    );
    let factory = StageFactory::new();
    let device = Stage::hardware("Device", StageCategory::Device)
        .with_pad(Pad::input("In").with_medium(input))
        .with_pad(Pad::output("Out").with_medium(output));

    RocketCapture::new(&registry, &factory)
        .setup(device, callbacks)
        .unwrap()
}

/// Samples reach the callback in submission order.
#[test]
fn test_sequential_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut session = {
        let seen = Arc::clone(&seen);
        session(CaptureCallbacks::video(move |s| {
            seen.lock().unwrap().push((s.metadata().sequence, s.as_bytes()[0]));
        }))
    };

    for i in 0..100u8 {
        let ts = packetize(StreamId::VIDEO.value(), i & 0x0F, &[i; 32]);
        session.push(&ts).unwrap();
    }
    session.stop().unwrap();

    let seen = seen.lock().unwrap();
    let expected: Vec<(u64, u8)> = (0..100u8).map(|i| (u64::from(i), i)).collect();
    assert_eq!(*seen, expected);
}

/// `push` returns only once its callbacks have returned.
#[test]
fn test_push_waits_for_callback() {
    let finished = Arc::new(AtomicU64::new(0));
    let session = {
        let finished = Arc::clone(&finished);
        session(CaptureCallbacks::video(move |_| {
            thread::sleep(Duration::from_millis(5));
            finished.fetch_add(1, Ordering::SeqCst);
        }))
    };

    let mut ts = packetize(StreamId::VIDEO.value(), 0, &[1; 10]);
    ts.extend(packetize(StreamId::VIDEO.value(), 1, &[2; 10]));
    ts.extend(packetize(StreamId::VIDEO.value(), 2, &[3; 10]));

    let delivered = session.push(&ts).unwrap();
    assert_eq!(delivered, 2);
    assert_eq!(finished.load(Ordering::SeqCst), 2);
}

/// Concurrent pushes never run two callbacks at once.
#[test]
fn test_concurrent_push_never_overlaps() {
    let in_callback = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicU64::new(0));
    let order = Arc::new(Mutex::new(Vec::new()));

    let session = {
        let in_callback = Arc::clone(&in_callback);
        let overlaps = Arc::clone(&overlaps);
        let order = Arc::clone(&order);
        session(CaptureCallbacks::video(move |s| {
            if in_callback.swap(true, Ordering::SeqCst) {
                overlaps.fetch_add(1, Ordering::SeqCst);
            }
            let tag = s.as_bytes();
            order.lock().unwrap().push((tag[0], tag[1], tag[2]));
            thread::sleep(Duration::from_micros(50));
            in_callback.store(false, Ordering::SeqCst);
        }))
    };

    thread::scope(|scope| {
        for t in 0..4u8 {
            let session = &session;
            scope.spawn(move || {
                for round in 0..5u8 {
                    // Ten single-packet units; all but the last complete within this push
                    let mut ts = Vec::new();
                    for i in 0..10u8 {
                        let payload = [t, round, i];
                        ts.extend_from_slice(&packet(StreamId::VIDEO.value(), true, i, &payload));
                    }
                    session.push(&ts).unwrap();
                }
            });
        }
    });

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);

    let order = order.lock().unwrap();
    assert!(order.len() >= 4 * 5 * 9);
    // Units of one push stay in stream order
    for pair in order.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if (a.0, a.1) == (b.0, b.1) {
            assert!(a.2 < b.2, "out of order: {a:?} then {b:?}");
        }
    }
}
