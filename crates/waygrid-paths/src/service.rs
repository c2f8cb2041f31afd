//! Threaded front-end: one worker thread owns a [`PathFinder`] and serves
//! requests from any thread through a single-consumer channel.
//!
//! The worker is the only consumer, so searches never overlap and run in
//! the order their requests entered the channel. Callbacks run on the
//! worker thread.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use waygrid_core::Vec2;

use crate::error::ServiceError;
use crate::search::PathFinder;

/// Completion callback for [`PathService`]; runs on the worker thread.
pub type SendPathCallback = Box<dyn FnOnce(Vec<Vec2>, bool) + Send>;

struct Job {
    start: Vec2,
    end: Vec2,
    callback: SendPathCallback,
}

/// Cloneable submission handle for a running [`PathService`].
#[derive(Clone)]
pub struct PathRequester {
    tx: Sender<Job>,
}

impl PathRequester {
    /// Queue a request. Fails only if the worker has died; the callback is
    /// then dropped without firing.
    pub fn request_path<F>(&self, start: Vec2, end: Vec2, callback: F) -> Result<(), ServiceError>
    where
        F: FnOnce(Vec<Vec2>, bool) + Send + 'static,
    {
        self.tx
            .send(Job {
                start,
                end,
                callback: Box::new(callback),
            })
            .map_err(|_| ServiceError::Closed)
    }
}

/// Owner of the worker thread. Dropping it drains the queue and joins.
pub struct PathService {
    requester: PathRequester,
    worker: Option<JoinHandle<u64>>,
}

impl PathService {
    /// Move `finder` onto a new worker thread.
    pub fn spawn(finder: PathFinder) -> Result<Self, ServiceError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let worker = thread::Builder::new()
            .name("waygrid-paths".into())
            .spawn(move || serve(finder, rx))?;
        Ok(Self {
            requester: PathRequester { tx },
            worker: Some(worker),
        })
    }

    /// A handle other threads can submit through.
    ///
    /// Outstanding handles keep the worker alive after the service is
    /// dropped, until they are dropped too.
    pub fn requester(&self) -> PathRequester {
        self.requester.clone()
    }

    /// Queue a request from the owning thread.
    pub fn request_path<F>(&self, start: Vec2, end: Vec2, callback: F) -> Result<(), ServiceError>
    where
        F: FnOnce(Vec<Vec2>, bool) + Send + 'static,
    {
        self.requester.request_path(start, end, callback)
    }

    /// Stop accepting requests, wait for every queued one to be delivered,
    /// and return how many the worker served.
    pub fn shutdown(mut self) -> Result<u64, ServiceError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<u64, ServiceError> {
        // Swap in a sender whose receiver is already gone, closing ours.
        let (closed, _) = crossbeam_channel::bounded(0);
        drop(std::mem::replace(&mut self.requester.tx, closed));
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| ServiceError::Closed),
            None => Ok(0),
        }
    }
}

impl Drop for PathService {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("path worker ended abnormally: {e}");
        }
    }
}

fn serve(mut finder: PathFinder, rx: Receiver<Job>) -> u64 {
    let mut served = 0u64;
    log::debug!("path worker started");
    for job in rx.iter() {
        let result = finder.find_path(job.start, job.end);
        served += 1;
        log::debug!(
            "path request #{served} {} -> {}: success={} waypoints={} ({} waiting)",
            job.start,
            job.end,
            result.success,
            result.waypoints.len(),
            rx.len()
        );
        (job.callback)(result.waypoints, result.success);
    }
    log::debug!("path worker stopped after {served} requests");
    served
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::grid::SpatialGrid;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    fn open_finder() -> PathFinder {
        let cfg = GridConfig::new(Vec2::new(5.0, 5.0), 0.5);
        PathFinder::new(Arc::new(
            SpatialGrid::build(&cfg, &|_: Vec2, _: f64| false).unwrap(),
        ))
    }

    #[test]
    fn serves_requests_in_submission_order() {
        let service = PathService::spawn(open_finder()).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        // Straight runs along the bottom row.
        let ends = [-1.0, 0.0, 2.0];
        for (i, x) in ends.into_iter().enumerate() {
            let tx = tx.clone();
            let end = Vec2::new(x, -2.0);
            service
                .request_path(Vec2::new(-2.0, -2.0), end, move |wps, ok| {
                    tx.send((i, wps.len(), ok)).unwrap();
                })
                .unwrap();
        }
        assert_eq!(service.shutdown().unwrap(), 3);
        drop(tx);
        let got: Vec<(usize, usize, bool)> = rx.iter().collect();
        assert_eq!(got, vec![(0, 2, true), (1, 2, true), (2, 2, true)]);
    }

    #[test]
    fn concurrent_callers_each_get_exactly_one_callback() {
        let service = PathService::spawn(open_finder()).unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = crossbeam_channel::unbounded();
        let barrier = Arc::new(Barrier::new(3));

        let handles: Vec<_> = (0..3usize)
            .map(|i| {
                let requester = service.requester();
                let barrier = Arc::clone(&barrier);
                let active = Arc::clone(&active);
                let tx = tx.clone();
                thread::spawn(move || {
                    barrier.wait();
                    requester
                        .request_path(Vec2::new(-2.0, -2.0), Vec2::new(2.0, 2.0), move |wps, ok| {
                            // Callbacks never overlap.
                            assert_eq!(active.fetch_add(1, Ordering::SeqCst), 0);
                            tx.send((i, wps.len(), ok)).unwrap();
                            active.fetch_sub(1, Ordering::SeqCst);
                        })
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(service.shutdown().unwrap(), 3);
        drop(tx);

        let mut got: Vec<(usize, usize, bool)> = rx.iter().collect();
        assert_eq!(got.len(), 3);
        got.sort();
        assert_eq!(got, vec![(0, 2, true), (1, 2, true), (2, 2, true)]);
    }

    #[test]
    fn drop_drains_the_queue() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let service = PathService::spawn(open_finder()).unwrap();
            for _ in 0..5 {
                let count = Arc::clone(&count);
                service
                    .request_path(Vec2::ZERO, Vec2::new(2.0, 2.0), move |_, ok| {
                        assert!(ok);
                        count.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
            }
        }
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn shutdown_waits_for_outstanding_requesters() {
        let service = PathService::spawn(open_finder()).unwrap();
        let requester = service.requester();
        let (tx, rx) = crossbeam_channel::unbounded();
        service
            .request_path(Vec2::ZERO, Vec2::ZERO, {
                let tx = tx.clone();
                move |wps, ok| tx.send((0, wps.len(), ok)).unwrap()
            })
            .unwrap();
        let late = thread::spawn(move || {
            requester
                .request_path(Vec2::ZERO, Vec2::new(2.0, 0.0), move |wps, ok| {
                    tx.send((1, wps.len(), ok)).unwrap();
                })
                .unwrap();
        });
        assert_eq!(service.shutdown().unwrap(), 2);
        late.join().unwrap();

        let mut got: Vec<(usize, usize, bool)> = rx.iter().collect();
        got.sort();
        assert_eq!(got, vec![(0, 1, true), (1, 2, true)]);
    }
}
