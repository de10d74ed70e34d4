// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The discrete-event [`Engine`].
//!
//! Events are stored in a time-ordered queue. Events scheduled for the same
//! time are delivered in the order in which they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

use vturn_track::entity::{Entity, toplevel};
use vturn_track::tracker::stdout_tracker;
use vturn_track::{Tracker, set_time, trace};

use crate::sim_error;
use crate::traits::Handler;
use crate::types::SimResult;

struct Scheduled<E> {
    time_ns: u64,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.time_ns == other.time_ns && self.seq == other.seq
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so that the `BinaryHeap` pops the earliest event first
        (other.time_ns, other.seq).cmp(&(self.time_ns, self.seq))
    }
}

pub struct Engine<E> {
    toplevel: Rc<Entity>,
    tracker: Tracker,
    queue: BinaryHeap<Scheduled<E>>,
    current_ns: u64,
    next_seq: u64,
    num_processed: u64,
}

impl<E> Engine<E> {
    /// Create a standalone engine.
    pub fn new(tracker: &Tracker) -> Self {
        let toplevel = toplevel(tracker, "top");
        Self {
            toplevel,
            tracker: tracker.clone(),
            queue: BinaryHeap::new(),
            current_ns: 0,
            next_seq: 0,
            num_processed: 0,
        }
    }

    /// Schedule an event `delay_ns` after the current time.
    pub fn schedule_in(&mut self, delay_ns: u64, event: E) {
        let time_ns = self.current_ns + delay_ns;
        self.push(time_ns, event);
    }

    /// Schedule an event at an absolute time.
    ///
    /// Returns an error if the time is already in the past.
    pub fn schedule_at(&mut self, time_ns: u64, event: E) -> SimResult {
        if time_ns < self.current_ns {
            return sim_error!(format!(
                "Cannot schedule an event at {time_ns}ns, time is already {}ns",
                self.current_ns
            ));
        }
        self.push(time_ns, event);
        Ok(())
    }

    fn push(&mut self, time_ns: u64, event: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled {
            time_ns,
            seq,
            event,
        });
    }

    /// Run until there are no events left or the handler returns an error.
    pub fn run<H: Handler<E>>(&mut self, handler: &mut H) -> SimResult {
        self.run_while(handler, |_| true)
    }

    /// Run all events up to and including `end_ns` and then advance time to
    /// `end_ns`. Later events are left in the queue.
    pub fn run_until<H: Handler<E>>(&mut self, end_ns: u64, handler: &mut H) -> SimResult {
        if end_ns < self.current_ns {
            return sim_error!(format!(
                "Cannot run until {end_ns}ns, time is already {}ns",
                self.current_ns
            ));
        }
        self.run_while(handler, |time_ns| time_ns <= end_ns)?;
        self.advance_to(end_ns);
        Ok(())
    }

    fn run_while<H, F>(&mut self, handler: &mut H, keep_going: F) -> SimResult
    where
        H: Handler<E>,
        F: Fn(u64) -> bool,
    {
        trace!(self.toplevel ; "Run with {} events pending", self.queue.len());
        while let Some(next) = self.queue.peek() {
            if !keep_going(next.time_ns) {
                break;
            }
            let Some(scheduled) = self.queue.pop() else {
                break;
            };
            self.advance_to(scheduled.time_ns);
            self.num_processed += 1;
            handler.handle(self, scheduled.event)?;
        }
        Ok(())
    }

    fn advance_to(&mut self, time_ns: u64) {
        if time_ns != self.current_ns {
            self.current_ns = time_ns;
            set_time!(self.toplevel ; time_ns);
        }
    }

    #[must_use]
    pub fn time_now_ns(&self) -> u64 {
        self.current_ns
    }

    /// Number of events still waiting to be processed.
    #[must_use]
    pub fn num_pending(&self) -> usize {
        self.queue.len()
    }

    /// Number of events handled so far.
    #[must_use]
    pub fn num_processed(&self) -> u64 {
        self.num_processed
    }

    #[must_use]
    pub fn top(&self) -> &Rc<Entity> {
        &self.toplevel
    }

    #[must_use]
    pub fn tracker(&self) -> Tracker {
        self.tracker.clone()
    }
}

/// Create a default engine that sends [`Track`](vturn_track::Track) events to
/// stdout.
///
/// This is provided to keep documentation examples simple with fewer
/// concepts to have to consider at once.
impl<E> Default for Engine<E> {
    fn default() -> Self {
        let tracker = stdout_tracker(log::Level::Info);
        Self::new(&tracker)
    }
}

impl<E> Drop for Engine<E> {
    fn drop(&mut self) {
        // The tracker can be using a buffered writer and so it needs to be shut down
        // cleanly to ensure that it is flushed properly.
        self.tracker.shutdown();
    }
}
