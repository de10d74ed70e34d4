// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::fmt;

use crate::Id;
use crate::id::IdCounter;
use crate::tracker::{Track, Tracker};

/// Sends every event to several [`Tracker`]s.
///
/// Each tracker applies its own levels, so the console and a log file can
/// be filtered differently. IDs are allocated here so that all trackers see
/// the same ones.
#[derive(Default)]
pub struct MultiTracker {
    ids: IdCounter,
    trackers: Vec<Tracker>,
}

impl MultiTracker {
    /// Add a new tracker
    pub fn add_tracker(&mut self, tracker: Tracker) {
        self.trackers.push(tracker);
    }

    fn enabled(&self, id: Id, level: log::Level) -> impl Iterator<Item = &Tracker> {
        self.trackers
            .iter()
            .filter(move |tracker| tracker.is_entity_enabled(id, level))
    }
}

impl Track for MultiTracker {
    fn unique_id(&self) -> Id {
        self.ids.next_id()
    }

    fn is_entity_enabled(&self, id: Id, level: log::Level) -> bool {
        self.enabled(id, level).next().is_some()
    }

    fn add_entity(&self, id: Id, entity_name: &str) {
        self.trackers
            .iter()
            .for_each(|tracker| tracker.add_entity(id, entity_name));
    }

    fn enter(&self, by: Id, obj: Id) {
        self.enabled(by, log::Level::Trace)
            .for_each(|tracker| tracker.enter(by, obj));
    }

    fn exit(&self, by: Id, obj: Id) {
        self.enabled(by, log::Level::Trace)
            .for_each(|tracker| tracker.exit(by, obj));
    }

    fn create(&self, by: Id, obj: Id, num_bytes: usize, name: &str) {
        self.enabled(by, log::Level::Trace)
            .for_each(|tracker| tracker.create(by, obj, num_bytes, name));
    }

    fn destroy(&self, by: Id, obj: Id) {
        self.enabled(by, log::Level::Trace)
            .for_each(|tracker| tracker.destroy(by, obj));
    }

    fn log(&self, by: Id, level: log::Level, msg: fmt::Arguments) {
        self.enabled(by, level)
            .for_each(|tracker| tracker.log(by, level, msg));
    }

    // Every tracker needs the time to stay in step, whatever its level.
    fn time(&self, by: Id, time_ns: u64) {
        self.trackers
            .iter()
            .for_each(|tracker| tracker.time(by, time_ns));
    }

    fn shutdown(&self) {
        self.trackers.iter().for_each(|tracker| tracker.shutdown());
    }
}
