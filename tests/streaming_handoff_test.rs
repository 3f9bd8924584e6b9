//! Stress test for the streaming hand-off contract: the consumer never sees
//! a partially written payload, and every produced payload is eventually
//! consumed or explicitly marked failed.

use std::{
    thread,
    time::{Duration, Instant},
};

use boxstream::{
    error::StreamingError,
    resources::texture::PixelData,
    streaming::{PayloadOutcome, RefreshRequest, StreamingCoordinator, TextureDecoder},
};

const REQUESTS: usize = 200;
const PAYLOAD_BYTES: usize = 32 * 32 * 4;

/// Fills the whole buffer with one byte derived from the target instance,
/// slowly enough that a torn hand-off would be observable, and fails every
/// seventh request.
struct StressDecoder;

impl TextureDecoder for StressDecoder {
    fn decode(&self, request: &RefreshRequest) -> Result<PixelData, StreamingError> {
        if request.instance % 7 == 3 {
            return Err(StreamingError {
                instance: request.instance,
                reason: "synthetic decode failure".into(),
            });
        }
        let value = request.instance as u8;
        let mut pixels = Vec::with_capacity(PAYLOAD_BYTES);
        for _ in 0..PAYLOAD_BYTES {
            pixels.push(value);
            if pixels.len() % 1024 == 0 {
                thread::yield_now();
            }
        }
        Ok(PixelData {
            pixels,
            width: 32,
            height: 32,
        })
    }
}

#[test]
fn every_payload_is_consumed_or_marked_failed_and_never_torn() {
    let coordinator = StreamingCoordinator::spawn(StressDecoder);

    // Producer side: submit requests from a second thread while the
    // consumer polls, so submissions and hand-offs interleave.
    let submitter = {
        let coordinator = &coordinator;
        thread::scope(|scope| {
            let handle = scope.spawn(move || {
                for instance in 0..REQUESTS {
                    coordinator.request(RefreshRequest {
                        instance,
                        path: format!("box{instance}.png"),
                    });
                    if instance % 16 == 0 {
                        thread::yield_now();
                    }
                }
            });

            // Consumer side: poll the way the render thread does, one
            // outcome at a time, until everything is accounted for.
            let mut seen = vec![false; REQUESTS];
            let mut consumed = 0usize;
            let mut failed = 0usize;
            let deadline = Instant::now() + Duration::from_secs(30);
            while consumed + failed < REQUESTS {
                assert!(Instant::now() < deadline, "payloads lost: {consumed} consumed, {failed} failed");
                match coordinator.poll() {
                    Some(PayloadOutcome::Ready(payload)) => {
                        assert!(!seen[payload.instance], "duplicate payload");
                        seen[payload.instance] = true;
                        consumed += 1;
                        // All-or-nothing visibility: the buffer is complete
                        // and uniform, never a partial write.
                        assert_eq!(payload.pixels.byte_len(), PAYLOAD_BYTES);
                        let expected = payload.instance as u8;
                        assert!(
                            payload.pixels.pixels.iter().all(|b| *b == expected),
                            "torn payload for instance {}",
                            payload.instance
                        );
                    }
                    Some(PayloadOutcome::Failed(err)) => {
                        assert!(!seen[err.instance], "duplicate payload");
                        seen[err.instance] = true;
                        failed += 1;
                        assert_eq!(err.instance % 7, 3);
                    }
                    None => thread::yield_now(),
                }
            }
            handle.join().unwrap();
            (consumed, failed)
        })
    };

    let (consumed, failed) = submitter;
    let expected_failures = (0..REQUESTS).filter(|i| i % 7 == 3).count();
    assert_eq!(failed, expected_failures);
    assert_eq!(consumed, REQUESTS - expected_failures);

    let stats = coordinator.stats();
    assert_eq!(stats.produced, REQUESTS);
    assert_eq!(stats.consumed, consumed);
    assert_eq!(stats.failed, failed);
    assert_eq!(coordinator.pending_requests(), 0);
}

#[test]
fn drop_stops_the_worker_without_hanging() {
    let coordinator = StreamingCoordinator::spawn(StressDecoder);
    coordinator.request(RefreshRequest {
        instance: 1,
        path: "box1.png".into(),
    });
    // Dropping while work may still be in flight must join cleanly.
    drop(coordinator);
}
