// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Capture _log_ and _trace_ events in memory so tests can assert on them.

use std::cell::RefCell;
use std::fmt;

use regex::Regex;

use crate::Id;
use crate::id::IdCounter;
use crate::tracker::{Event, Track};

/// A tracker that enables every entity and keeps every event as text.
pub struct TestTracker {
    ids: IdCounter,
    events: RefCell<Vec<String>>,
}

impl TestTracker {
    /// The first [`Id`] handed out is `first_id`.
    #[must_use]
    pub fn new(first_id: u64) -> Self {
        Self {
            ids: IdCounter::starting_at(first_id),
            events: RefCell::new(Vec::new()),
        }
    }

    fn record(&self, event: Event) {
        let line = event.to_string();
        println!("{line}");
        self.events.borrow_mut().push(line);
    }

    /// The events recorded since the last check.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    fn take_events(&self) -> Vec<String> {
        self.events.take()
    }
}

impl Track for TestTracker {
    fn unique_id(&self) -> Id {
        self.ids.next_id()
    }

    fn is_entity_enabled(&self, _: Id, _: log::Level) -> bool {
        true
    }

    fn add_entity(&self, _: Id, _: &str) {}

    fn enter(&self, by: Id, obj: Id) {
        self.record(Event::Enter { by, obj });
    }

    fn exit(&self, by: Id, obj: Id) {
        self.record(Event::Exit { by, obj });
    }

    fn create(&self, by: Id, obj: Id, num_bytes: usize, name: &str) {
        self.record(Event::Create {
            by,
            obj,
            num_bytes,
            name,
        });
    }

    fn destroy(&self, by: Id, obj: Id) {
        self.record(Event::Destroy { by, obj });
    }

    fn log(&self, by: Id, level: log::Level, msg: fmt::Arguments) {
        self.record(Event::Log { by, level, msg });
    }

    fn time(&self, by: Id, time_ns: u64) {
        self.record(Event::Time { by, time_ns });
    }

    fn shutdown(&self) {}
}

/// Create a [`TestTracker`] and the same tracker as a [`Tracker`](crate::Tracker).
///
/// ```
/// use vturn_track::test_helpers::check_and_clear;
///
/// let (test_tracker, tracker) = vturn_track::test_init!(10);
/// let top = vturn_track::entity::toplevel(&tracker, "top");
/// check_and_clear(&test_tracker, &["0: created 10 top, 0B"]);
/// ```
#[macro_export]
macro_rules! test_init {
    ($first_id:expr) => {{
        let test_tracker = std::rc::Rc::new($crate::test_helpers::TestTracker::new($first_id));
        let tracker: $crate::Tracker = test_tracker.clone();
        (test_tracker, tracker)
    }};
}

/// Assert that the events since the last check match `expected` one for one,
/// then forget them.
///
/// Each entry of `expected` is a regular expression.
pub fn check_and_clear(tracker: &TestTracker, expected: &[&str]) {
    let events = tracker.take_events();
    assert_eq!(
        events.len(),
        expected.len(),
        "Expected {expected:?}, got {events:?}"
    );
    for (pattern, event) in expected.iter().zip(&events) {
        let re = Regex::new(pattern).unwrap();
        assert!(re.is_match(event), "{event:?} does not match {pattern:?}");
    }
}

/// Assert that at least one event since the last check matches `expected`,
/// then forget them all.
pub fn check_any_and_clear(tracker: &TestTracker, expected: &str) {
    let events = tracker.take_events();
    let re = Regex::new(expected).unwrap();
    assert!(
        events.iter().any(|event| re.is_match(event)),
        "No event matches {expected:?} in {events:?}"
    );
}
