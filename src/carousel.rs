use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::timer::{IntervalGuard, TimerHost};

/// Time each quote stays on screen.
pub const ROTATION_INTERVAL_MS: u32 = 6000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteEntry {
    pub text: String,
    pub author: String,
}

impl QuoteEntry {
    pub fn new(text: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
        }
    }
}

/// Entrance animation for a content block, handed to whatever animates the
/// page. `key` changes whenever the block should replay the animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub key: usize,
    pub from_opacity: f32,
    pub to_opacity: f32,
    pub from_offset_y: f32,
    pub exit_offset_y: f32,
    pub duration_ms: u32,
    pub delay_ms: u32,
}

impl Transition {
    /// Fade in while rising 20 px over one second.
    pub fn fade_rise(key: usize) -> Self {
        Self {
            key,
            from_opacity: 0.0,
            to_opacity: 1.0,
            from_offset_y: 20.0,
            exit_offset_y: -20.0,
            duration_ms: 1000,
            delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, delay_ms: u32) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// Fixed, ordered quote list shown one entry at a time.
#[derive(Debug, Clone)]
pub struct QuoteCarousel {
    quotes: Rc<[QuoteEntry]>,
    interval_ms: u32,
}

impl QuoteCarousel {
    pub fn new(quotes: Vec<QuoteEntry>) -> Self {
        Self {
            quotes: quotes.into(),
            interval_ms: ROTATION_INTERVAL_MS,
        }
    }

    pub fn with_interval(mut self, interval_ms: u32) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn quotes(&self) -> &[QuoteEntry] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Starts rotating at index 0. An empty list never arms a timer.
    pub fn mount(&self, host: Rc<dyn TimerHost>) -> MountedCarousel {
        let index = Rc::new(Cell::new(0));
        let observers: Rc<RefCell<Vec<Observer>>> = Rc::new(RefCell::new(Vec::new()));

        let guard = if self.quotes.is_empty() {
            debug!("quote list is empty; rotation not armed");
            None
        } else {
            let len = self.quotes.len();
            let tick_index = Rc::clone(&index);
            let tick_observers = Rc::clone(&observers);
            let callback = Box::new(move || {
                let next = (tick_index.get() + 1) % len;
                tick_index.set(next);
                for observer in tick_observers.borrow_mut().iter_mut() {
                    observer(next);
                }
            });
            info!(
                "quote rotation armed: {len} quotes every {} ms",
                self.interval_ms
            );
            Some(IntervalGuard::arm(host, self.interval_ms, callback))
        };

        MountedCarousel {
            quotes: Rc::clone(&self.quotes),
            index,
            observers,
            guard,
        }
    }
}

type Observer = Box<dyn FnMut(usize)>;

/// A live carousel. Dropping it cancels the rotation.
pub struct MountedCarousel {
    quotes: Rc<[QuoteEntry]>,
    index: Rc<Cell<usize>>,
    observers: Rc<RefCell<Vec<Observer>>>,
    guard: Option<IntervalGuard>,
}

impl MountedCarousel {
    pub fn index(&self) -> usize {
        self.index.get()
    }

    pub fn current(&self) -> Option<&QuoteEntry> {
        self.quotes.get(self.index.get())
    }

    pub fn is_armed(&self) -> bool {
        self.guard.is_some()
    }

    pub fn transition(&self) -> Transition {
        Transition::fade_rise(self.index.get())
    }

    /// Registers a callback run with the new index after every rotation.
    /// Must not be called from inside an observer.
    pub fn on_rotate(&self, observer: impl FnMut(usize) + 'static) {
        self.observers.borrow_mut().push(Box::new(observer));
    }

    /// Stops the rotation. Equivalent to dropping the carousel.
    pub fn unmount(self) {}
}

impl Drop for MountedCarousel {
    fn drop(&mut self) {
        if self.guard.take().is_some() {
            debug!("quote rotation cancelled at index {}", self.index.get());
        }
    }
}
