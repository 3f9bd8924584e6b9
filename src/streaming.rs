//! Background texture streaming and the render-thread hand-off protocol.
//!
//! Neither the GPU device nor any GPU object may be touched from a second
//! thread, but pixel decoding is pure CPU work. The worker spawned here
//! decodes replacement textures and passes the finished bytes to the render
//! thread through a mutex-protected hand-off region; the render thread polls
//! once per frame and performs the actual texture creation and swap.
//!
//! Lock discipline: the mutex is held only to move a request or a finished
//! payload in or out of the hand-off queues. Decoding itself always happens
//! with the lock released, so the render thread's poll can never stall
//! behind file I/O.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Condvar, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
};

use crate::{
    error::StreamingError,
    resources::texture::{self, PixelData},
};

/// How often the render thread asks for a refresh, in frames.
pub const REFRESH_INTERVAL_FRAMES: u64 = 30;
/// Only instances within this distance of the eye are refreshed.
pub const REFRESH_RADIUS: f32 = 60.0;

/// Asks the worker to prepare replacement pixels for one scene instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub instance: usize,
    pub path: String,
}

/// A decoded pixel buffer plus the identity of the instance it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TexturePayload {
    pub instance: usize,
    pub pixels: PixelData,
}

/// What the worker produced for one request. Failures travel through the
/// same queue so no request is ever silently lost.
#[derive(Debug)]
pub enum PayloadOutcome {
    Ready(TexturePayload),
    Failed(StreamingError),
}

/// Seam between the worker loop and the actual pixel source. Production
/// code uses [`FileTextureDecoder`]; tests inject synthetic decoders.
pub trait TextureDecoder: Send + 'static {
    fn decode(&self, request: &RefreshRequest) -> Result<PixelData, StreamingError>;
}

/// Decodes image files from the `assets/` directory.
pub struct FileTextureDecoder;

impl TextureDecoder for FileTextureDecoder {
    fn decode(&self, request: &RefreshRequest) -> Result<PixelData, StreamingError> {
        texture::decode_image(&request.path).map_err(|err| StreamingError {
            instance: request.instance,
            reason: err.to_string(),
        })
    }
}

/// The shared hand-off region. Both queues live under one mutex; every
/// access is a short push or pop.
#[derive(Debug, Default)]
struct Handoff {
    requests: VecDeque<RefreshRequest>,
    ready: VecDeque<PayloadOutcome>,
}

#[derive(Debug, Default)]
struct Shared {
    handoff: Mutex<Handoff>,
    work_available: Condvar,
    stop: AtomicBool,
    produced: AtomicUsize,
    consumed: AtomicUsize,
    failed: AtomicUsize,
}

/// Counters for observing the producer/consumer contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingStats {
    /// Outcomes pushed by the worker, successful or not.
    pub produced: usize,
    /// Ready payloads taken by the render thread.
    pub consumed: usize,
    /// Failed payloads taken and skipped by the render thread.
    pub failed: usize,
}

/// Owns the streaming worker thread and the hand-off region.
///
/// The worker runs until [`shutdown`](Self::shutdown) (also called on drop)
/// sets the cooperative stop flag, which is checked on every iteration.
#[derive(Debug)]
pub struct StreamingCoordinator {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl StreamingCoordinator {
    /// Start the worker thread with the given pixel source.
    pub fn spawn<D: TextureDecoder>(decoder: D) -> Self {
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || worker_loop(worker_shared, decoder));
        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Queue a refresh request for the worker. Render thread side; the lock
    /// is held only for the push.
    pub fn request(&self, request: RefreshRequest) {
        let mut handoff = self.shared.handoff.lock().unwrap();
        handoff.requests.push_back(request);
        drop(handoff);
        self.shared.work_available.notify_one();
    }

    /// Take at most one finished outcome. Render thread side, called once
    /// per frame; never blocks beyond the brief queue pop.
    pub fn poll(&self) -> Option<PayloadOutcome> {
        let outcome = self.shared.handoff.lock().unwrap().ready.pop_front();
        match &outcome {
            Some(PayloadOutcome::Ready(_)) => {
                self.shared.consumed.fetch_add(1, Ordering::Relaxed);
            }
            Some(PayloadOutcome::Failed(_)) => {
                self.shared.failed.fetch_add(1, Ordering::Relaxed);
            }
            None => (),
        }
        outcome
    }

    pub fn pending_requests(&self) -> usize {
        self.shared.handoff.lock().unwrap().requests.len()
    }

    pub fn stats(&self) -> StreamingStats {
        StreamingStats {
            produced: self.shared.produced.load(Ordering::Acquire),
            consumed: self.shared.consumed.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
        }
    }

    /// Signal the worker to stop and wait for it to finish its current
    /// iteration. Idempotent.
    pub fn shutdown(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        self.shared.work_available.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("texture streaming worker panicked");
            }
        }
    }
}

impl Drop for StreamingCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<D: TextureDecoder>(shared: Arc<Shared>, decoder: D) {
    log::debug!("texture streaming worker started");
    loop {
        let request = {
            let mut handoff = shared.handoff.lock().unwrap();
            loop {
                if shared.stop.load(Ordering::Acquire) {
                    log::debug!("texture streaming worker stopping");
                    return;
                }
                if let Some(request) = handoff.requests.pop_front() {
                    break request;
                }
                handoff = shared.work_available.wait(handoff).unwrap();
            }
        };

        // Lock released: decoding may block on I/O without holding up the
        // render thread's poll.
        let outcome = match decoder.decode(&request) {
            Ok(pixels) => PayloadOutcome::Ready(TexturePayload {
                instance: request.instance,
                pixels,
            }),
            Err(err) => {
                log::warn!("{err}");
                PayloadOutcome::Failed(err)
            }
        };

        // Counted under the lock so a consumer that saw the outcome also
        // sees the updated counter.
        let mut handoff = shared.handoff.lock().unwrap();
        shared.produced.fetch_add(1, Ordering::Release);
        handoff.ready.push_back(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    struct FnDecoder<F>(F);

    impl<F> TextureDecoder for FnDecoder<F>
    where
        F: Fn(&RefreshRequest) -> Result<PixelData, StreamingError> + Send + 'static,
    {
        fn decode(&self, request: &RefreshRequest) -> Result<PixelData, StreamingError> {
            (self.0)(request)
        }
    }

    fn solid_pixels(value: u8) -> PixelData {
        PixelData {
            pixels: vec![value; 16 * 16 * 4],
            width: 16,
            height: 16,
        }
    }

    fn drain_one(coordinator: &StreamingCoordinator) -> PayloadOutcome {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(outcome) = coordinator.poll() {
                return outcome;
            }
            assert!(Instant::now() < deadline, "no payload within deadline");
            thread::yield_now();
        }
    }

    #[test]
    fn decoded_payload_reaches_the_consumer() {
        let coordinator = StreamingCoordinator::spawn(FnDecoder(|request: &RefreshRequest| {
            Ok(solid_pixels(request.instance as u8))
        }));
        coordinator.request(RefreshRequest {
            instance: 7,
            path: "box7.png".into(),
        });

        match drain_one(&coordinator) {
            PayloadOutcome::Ready(payload) => {
                assert_eq!(payload.instance, 7);
                assert_eq!(payload.pixels, solid_pixels(7));
            }
            PayloadOutcome::Failed(err) => panic!("unexpected failure: {err}"),
        }
        assert_eq!(
            coordinator.stats(),
            StreamingStats {
                produced: 1,
                consumed: 1,
                failed: 0
            }
        );
    }

    #[test]
    fn failed_decode_is_marked_and_worker_continues() {
        let coordinator = StreamingCoordinator::spawn(FnDecoder(|request: &RefreshRequest| {
            if request.instance == 0 {
                Err(StreamingError {
                    instance: request.instance,
                    reason: "synthetic decode failure".into(),
                })
            } else {
                Ok(solid_pixels(request.instance as u8))
            }
        }));
        coordinator.request(RefreshRequest {
            instance: 0,
            path: "bad.png".into(),
        });
        coordinator.request(RefreshRequest {
            instance: 1,
            path: "good.png".into(),
        });

        assert!(matches!(
            drain_one(&coordinator),
            PayloadOutcome::Failed(StreamingError { instance: 0, .. })
        ));
        // The worker survived the failure and produced the next payload.
        match drain_one(&coordinator) {
            PayloadOutcome::Ready(payload) => assert_eq!(payload.instance, 1),
            PayloadOutcome::Failed(err) => panic!("unexpected failure: {err}"),
        }
        let stats = coordinator.stats();
        assert_eq!(stats.consumed, 1);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn shutdown_joins_the_worker() {
        let mut coordinator =
            StreamingCoordinator::spawn(FnDecoder(|_: &RefreshRequest| Ok(solid_pixels(0))));
        coordinator.shutdown();
        assert!(coordinator.worker.is_none());
        // Idempotent.
        coordinator.shutdown();
    }
}
