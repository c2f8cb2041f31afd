//! Single-flight path request queue driven by the host's tick.
//!
//! [`RequestScheduler`] runs at most one search at a time and serves
//! requests strictly in submission order. Every request's callback fires
//! exactly once, with either a path or `success = false`.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use waygrid_core::Vec2;

use crate::search::{PathFinder, PathResult};

/// Completion callback: `(waypoints, success)`.
pub type PathCallback = Box<dyn FnOnce(Vec<Vec2>, bool)>;

/// When a finished search reports back to its caller.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Delivery {
    /// The callback fires as soon as the search finishes, inside the call
    /// that started it.
    #[default]
    Immediate,
    /// The callback fires on the next [`RequestScheduler::tick`]; the next
    /// queued request starts right after.
    NextTick,
}

/// A queued path request.
pub struct PathRequest {
    pub start: Vec2,
    pub end: Vec2,
    callback: PathCallback,
}

impl fmt::Debug for PathRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathRequest")
            .field("start", &self.start)
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}

/// A request whose search has finished but whose callback has not fired.
struct InFlight {
    callback: PathCallback,
    result: PathResult,
}

/// State shared between a [`RequestScheduler`] and its handles.
///
/// No `RefCell` borrow is held while a callback runs, so callbacks may
/// submit new requests.
struct Shared {
    delivery: Delivery,
    finder: RefCell<PathFinder>,
    queue: RefCell<VecDeque<PathRequest>>,
    current: RefCell<Option<InFlight>>,
    completed: Cell<u64>,
    /// Set while the queue is being served; nested submissions only enqueue.
    draining: Cell<bool>,
}

/// Clears the `draining` flag on scope exit, even if a callback panics.
struct Draining<'a>(&'a Cell<bool>);

impl<'a> Draining<'a> {
    /// `None` when an outer call is already serving the queue.
    fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for Draining<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Shared {
    fn request_path(&self, request: PathRequest) {
        let (start, end) = (request.start, request.end);
        let waiting = {
            let mut queue = self.queue.borrow_mut();
            queue.push_back(request);
            queue.len()
        };
        log::debug!("queued path request {start} -> {end} ({waiting} waiting)");
        self.try_process_next();
    }

    fn try_process_next(&self) {
        let Some(_draining) = Draining::enter(&self.draining) else {
            return;
        };
        while self.current.borrow().is_none() {
            let next = self.queue.borrow_mut().pop_front();
            let Some(request) = next else {
                return;
            };
            let result = self
                .finder
                .borrow_mut()
                .find_path(request.start, request.end);
            let done = InFlight {
                callback: request.callback,
                result,
            };
            match self.delivery {
                Delivery::Immediate => self.on_search_complete(done),
                Delivery::NextTick => *self.current.borrow_mut() = Some(done),
            }
        }
    }

    fn on_search_complete(&self, done: InFlight) {
        let InFlight { callback, result } = done;
        let completed = self.completed.get() + 1;
        self.completed.set(completed);
        log::debug!(
            "path request #{completed} finished: success={} waypoints={} ({} waiting)",
            result.success,
            result.waypoints.len(),
            self.queue.borrow().len()
        );
        callback(result.waypoints, result.success);
    }
}

/// FIFO queue of path requests in front of one [`PathFinder`].
///
/// Requests may also be submitted through a [`SchedulerHandle`], including
/// from inside a completion callback; they join the back of the queue.
pub struct RequestScheduler {
    shared: Rc<Shared>,
}

impl RequestScheduler {
    pub fn new(finder: PathFinder) -> Self {
        Self::with_delivery(finder, Delivery::default())
    }

    pub fn with_delivery(finder: PathFinder, delivery: Delivery) -> Self {
        Self {
            shared: Rc::new(Shared {
                delivery,
                finder: RefCell::new(finder),
                queue: RefCell::new(VecDeque::new()),
                current: RefCell::new(None),
                completed: Cell::new(0),
                draining: Cell::new(false),
            }),
        }
    }

    /// A cloneable submission handle. It does not keep the scheduler alive.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Queue a path request and start it if nothing is running.
    pub fn request_path<F>(&self, start: Vec2, end: Vec2, callback: F)
    where
        F: FnOnce(Vec<Vec2>, bool) + 'static,
    {
        self.shared.request_path(PathRequest {
            start,
            end,
            callback: Box::new(callback),
        });
    }

    /// Advance one scheduling quantum: deliver the finished request, if any,
    /// and start the next one. Returns whether a callback fired.
    ///
    /// A no-op under [`Delivery::Immediate`], where nothing is ever left
    /// waiting for a tick, and when called from inside a callback.
    pub fn tick(&self) -> bool {
        let shared = &self.shared;
        {
            let Some(_draining) = Draining::enter(&shared.draining) else {
                return false;
            };
            let done = shared.current.borrow_mut().take();
            let Some(done) = done else {
                return false;
            };
            shared.on_search_complete(done);
        }
        shared.try_process_next();
        true
    }

    /// Tick until every queued request has been delivered. Returns the
    /// number of callbacks fired.
    pub fn run_until_idle(&self) -> usize {
        let mut fired = 0;
        while self.tick() {
            fired += 1;
        }
        fired
    }

    /// Whether a request has been started and not yet delivered.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.shared.current.borrow().is_some()
    }

    /// Requests waiting behind the current one.
    #[inline]
    pub fn pending(&self) -> usize {
        self.shared.queue.borrow().len()
    }

    /// Callbacks fired so far.
    #[inline]
    pub fn completed(&self) -> u64 {
        self.shared.completed.get()
    }

    #[inline]
    pub fn delivery(&self) -> Delivery {
        self.shared.delivery
    }
}

/// Submits requests to a [`RequestScheduler`] from code that cannot borrow
/// it, such as a completion callback.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Weak<Shared>,
}

impl SchedulerHandle {
    /// Queue a request. Returns `false`, dropping the callback unfired, if
    /// the scheduler is gone.
    pub fn request_path<F>(&self, start: Vec2, end: Vec2, callback: F) -> bool
    where
        F: FnOnce(Vec<Vec2>, bool) + 'static,
    {
        let Some(shared) = self.shared.upgrade() else {
            log::debug!("path request {start} -> {end} dropped: scheduler is gone");
            return false;
        };
        shared.request_path(PathRequest {
            start,
            end,
            callback: Box::new(callback),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::grid::SpatialGrid;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    type Log = Rc<RefCell<Vec<(usize, usize, bool)>>>;

    /// 5×5 open grid except for a full wall at column x = 2.
    fn finder(walled: bool) -> PathFinder {
        let cfg = GridConfig::new(Vec2::new(5.0, 5.0), 0.5);
        let wall = move |c: Vec2, _: f64| walled && (c.x - 0.0).abs() < 0.25;
        PathFinder::new(Arc::new(SpatialGrid::build(&cfg, &wall).unwrap()))
    }

    fn record(log: &Log, id: usize) -> impl FnOnce(Vec<Vec2>, bool) + 'static {
        let log = Rc::clone(log);
        move |waypoints, success| log.borrow_mut().push((id, waypoints.len(), success))
    }

    #[test]
    fn immediate_delivery_fires_inside_request() {
        let sched = RequestScheduler::new(finder(false));
        let log: Log = Rc::default();
        sched.request_path(Vec2::new(-2.0, -2.0), Vec2::new(2.0, 2.0), record(&log, 0));
        assert_eq!(*log.borrow(), vec![(0, 2, true)]);
        assert!(!sched.is_busy());
        assert_eq!(sched.pending(), 0);
        assert!(!sched.tick());
    }

    #[test]
    fn next_tick_defers_each_callback_by_one_tick() {
        let sched = RequestScheduler::with_delivery(finder(false), Delivery::NextTick);
        let log: Log = Rc::default();
        sched.request_path(Vec2::new(-2.0, -2.0), Vec2::new(2.0, 2.0), record(&log, 0));
        sched.request_path(Vec2::new(-2.0, 2.0), Vec2::new(2.0, 2.0), record(&log, 1));
        sched.request_path(Vec2::new(2.0, 2.0), Vec2::new(2.0, 2.0), record(&log, 2));

        assert!(log.borrow().is_empty());
        assert!(sched.is_busy());
        assert_eq!(sched.pending(), 2);

        assert!(sched.tick());
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(sched.pending(), 1);

        assert_eq!(sched.run_until_idle(), 2);
        assert_eq!(
            *log.borrow(),
            vec![(0, 2, true), (1, 2, true), (2, 1, true)]
        );
        assert_eq!(sched.completed(), 3);
        assert!(!sched.is_busy());
        assert!(!sched.tick());
    }

    #[test]
    fn failures_are_delivered_in_order_too() {
        let sched = RequestScheduler::with_delivery(finder(true), Delivery::NextTick);
        let log: Log = Rc::default();
        sched.request_path(Vec2::new(-2.0, 0.0), Vec2::new(2.0, 0.0), record(&log, 0));
        sched.request_path(Vec2::new(-2.0, -2.0), Vec2::new(-2.0, 2.0), record(&log, 1));
        sched.request_path(Vec2::new(2.0, 2.0), Vec2::new(-2.0, -2.0), record(&log, 2));
        sched.run_until_idle();
        assert_eq!(
            *log.borrow(),
            vec![(0, 0, false), (1, 2, true), (2, 0, false)]
        );
    }

    #[test]
    fn request_after_idle_restarts_processing() {
        let sched = RequestScheduler::with_delivery(finder(false), Delivery::NextTick);
        let log: Log = Rc::default();
        sched.request_path(Vec2::ZERO, Vec2::ZERO, record(&log, 0));
        sched.run_until_idle();
        sched.request_path(Vec2::ZERO, Vec2::new(2.0, 0.0), record(&log, 1));
        assert!(sched.is_busy());
        sched.run_until_idle();
        assert_eq!(*log.borrow(), vec![(0, 1, true), (1, 2, true)]);
    }

    #[test]
    fn callback_can_queue_follow_ups_immediately() {
        let sched = RequestScheduler::new(finder(false));
        let handle = sched.handle();
        let log: Log = Rc::default();

        let (h, l) = (handle.clone(), Rc::clone(&log));
        sched.request_path(Vec2::new(-2.0, -2.0), Vec2::new(2.0, 2.0), move |wps, ok| {
            l.borrow_mut().push((0, wps.len(), ok));
            let (h2, l2) = (h.clone(), Rc::clone(&l));
            assert!(h.request_path(Vec2::ZERO, Vec2::new(2.0, 0.0), move |wps, ok| {
                l2.borrow_mut().push((1, wps.len(), ok));
                assert!(h2.request_path(Vec2::ZERO, Vec2::ZERO, record(&l2, 3)));
            }));
            assert!(h.request_path(Vec2::new(2.0, 2.0), Vec2::ZERO, record(&l, 2)));
        });

        assert_eq!(
            *log.borrow(),
            vec![(0, 2, true), (1, 2, true), (2, 2, true), (3, 1, true)]
        );
        assert_eq!(sched.completed(), 4);
        assert!(!sched.is_busy());
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn follow_ups_queue_behind_waiting_requests() {
        let sched = RequestScheduler::with_delivery(finder(false), Delivery::NextTick);
        let handle = sched.handle();
        let log: Log = Rc::default();

        let l = Rc::clone(&log);
        sched.request_path(Vec2::new(-2.0, -2.0), Vec2::new(2.0, 2.0), move |wps, ok| {
            l.borrow_mut().push((0, wps.len(), ok));
            assert!(handle.request_path(Vec2::ZERO, Vec2::ZERO, record(&l, 2)));
        });
        sched.request_path(Vec2::ZERO, Vec2::new(2.0, 0.0), record(&log, 1));

        assert!(sched.tick());
        assert_eq!(sched.pending(), 1);
        assert_eq!(sched.run_until_idle(), 2);
        assert_eq!(
            *log.borrow(),
            vec![(0, 2, true), (1, 2, true), (2, 1, true)]
        );
    }

    #[test]
    fn handle_outliving_scheduler_rejects_requests() {
        let sched = RequestScheduler::new(finder(false));
        let handle = sched.handle();
        drop(sched);
        let log: Log = Rc::default();
        assert!(!handle.request_path(Vec2::ZERO, Vec2::ZERO, record(&log, 0)));
        assert!(log.borrow().is_empty());
    }
}
