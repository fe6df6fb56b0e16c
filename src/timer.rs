use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::{debug, trace};

pub type TimerCallback = Box<dyn FnMut()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntervalId(pub u64);

/// Source of repeating timers. Callbacks run on the thread that owns the
/// host, one at a time.
pub trait TimerHost {
    fn set_interval(&self, period_ms: u32, callback: TimerCallback) -> IntervalId;
    fn clear_interval(&self, id: IntervalId);
}

struct Interval {
    period_ms: u64,
    next_due: u64,
    // Taken out while the callback runs.
    callback: Option<TimerCallback>,
}

#[derive(Default)]
struct ClockState {
    now: u64,
    next_id: u64,
    intervals: BTreeMap<IntervalId, Interval>,
}

/// Deterministic timer host driven by explicit calls to [`VirtualClock::advance`].
#[derive(Default)]
pub struct VirtualClock {
    state: RefCell<ClockState>,
}

impl VirtualClock {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn now(&self) -> u64 {
        self.state.borrow().now
    }

    pub fn active_intervals(&self) -> usize {
        self.state.borrow().intervals.len()
    }

    pub fn advance(&self, delta_ms: u64) -> usize {
        let target = self.now().saturating_add(delta_ms);
        self.advance_to(target)
    }

    /// Fires every interval that falls due up to and including `target`, in
    /// due-time order, and returns the number of callbacks run.
    pub fn advance_to(&self, target: u64) -> usize {
        let mut fired = 0;
        loop {
            let (id, mut callback) = {
                let mut state = self.state.borrow_mut();
                let due = state
                    .intervals
                    .iter()
                    .filter(|(_, interval)| interval.next_due <= target)
                    .min_by_key(|(id, interval)| (interval.next_due, **id))
                    .map(|(id, interval)| (*id, interval.next_due));
                let Some((id, due)) = due else {
                    break;
                };
                state.now = state.now.max(due);
                let Some(callback) = state
                    .intervals
                    .get_mut(&id)
                    .and_then(|interval| interval.callback.take())
                else {
                    break;
                };
                (id, callback)
            };

            trace!("interval {} fired at {} ms", id.0, self.now());
            callback();
            fired += 1;

            let mut state = self.state.borrow_mut();
            if let Some(interval) = state.intervals.get_mut(&id) {
                interval.callback = Some(callback);
                interval.next_due += interval.period_ms;
            }
        }

        let mut state = self.state.borrow_mut();
        state.now = state.now.max(target);
        fired
    }
}

impl TimerHost for VirtualClock {
    fn set_interval(&self, period_ms: u32, callback: TimerCallback) -> IntervalId {
        let mut state = self.state.borrow_mut();
        let id = IntervalId(state.next_id);
        state.next_id += 1;
        let period_ms = u64::from(period_ms.max(1));
        let next_due = state.now + period_ms;
        state.intervals.insert(
            id,
            Interval {
                period_ms,
                next_due,
                callback: Some(callback),
            },
        );
        debug!("armed interval {} every {period_ms} ms", id.0);
        id
    }

    fn clear_interval(&self, id: IntervalId) {
        if self.state.borrow_mut().intervals.remove(&id).is_some() {
            debug!("cleared interval {}", id.0);
        }
    }
}

/// Owns an armed interval and clears it exactly once when dropped.
pub struct IntervalGuard {
    host: Rc<dyn TimerHost>,
    id: Option<IntervalId>,
}

impl IntervalGuard {
    pub fn arm(host: Rc<dyn TimerHost>, period_ms: u32, callback: TimerCallback) -> Self {
        let id = host.set_interval(period_ms, callback);
        Self { host, id: Some(id) }
    }

    pub fn id(&self) -> Option<IntervalId> {
        self.id
    }

    pub fn cancel(&mut self) {
        if let Some(id) = self.id.take() {
            self.host.clear_interval(id);
        }
    }
}

impl Drop for IntervalGuard {
    fn drop(&mut self) {
        self.cancel();
    }
}
