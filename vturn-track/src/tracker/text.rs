// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::Write;

use crate::id::IdCounter;
use crate::tracker::{EntityLevels, Event, Track};
use crate::{Id, Writer};

/// Writes one line per event to a [`Writer`].
///
/// Time events are only written when the time actually moves forward.
pub struct TextTracker {
    ids: IdCounter,
    levels: EntityLevels,
    last_time_ns: Cell<Option<u64>>,
    writer: RefCell<Writer>,
}

impl TextTracker {
    /// Create a tracker that applies `levels` and writes to `writer`.
    pub fn new(levels: EntityLevels, writer: Writer) -> Self {
        Self {
            ids: IdCounter::default(),
            levels,
            last_time_ns: Cell::new(None),
            writer: RefCell::new(writer),
        }
    }

    fn write(&self, event: Event) {
        // Losing trace output is not a reason to stop the simulation
        let _ = writeln!(self.writer.borrow_mut(), "{event}");
    }
}

impl Track for TextTracker {
    fn unique_id(&self) -> Id {
        self.ids.next_id()
    }

    fn is_entity_enabled(&self, id: Id, level: log::Level) -> bool {
        self.levels.is_enabled(id, level)
    }

    fn add_entity(&self, id: Id, entity_name: &str) {
        self.levels.register(id, entity_name);
    }

    fn enter(&self, by: Id, obj: Id) {
        self.write(Event::Enter { by, obj });
    }

    fn exit(&self, by: Id, obj: Id) {
        self.write(Event::Exit { by, obj });
    }

    fn create(&self, by: Id, obj: Id, num_bytes: usize, name: &str) {
        self.write(Event::Create {
            by,
            obj,
            num_bytes,
            name,
        });
    }

    fn destroy(&self, by: Id, obj: Id) {
        self.write(Event::Destroy { by, obj });
    }

    fn log(&self, by: Id, level: log::Level, msg: fmt::Arguments) {
        self.write(Event::Log { by, level, msg });
    }

    fn time(&self, by: Id, time_ns: u64) {
        if self.last_time_ns.get().is_some_and(|last| time_ns <= last) {
            return;
        }
        self.last_time_ns.set(Some(time_ns));
        self.write(Event::Time { by, time_ns });
    }

    fn shutdown(&self) {
        let _ = self.writer.borrow_mut().flush();
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    /// A writer whose contents can still be read after it is boxed.
    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Shared {
        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.borrow())
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[test]
    fn time_only_moves_forward() {
        let out = Shared::default();
        let tracker = TextTracker::new(EntityLevels::new(log::Level::Trace), Box::new(out.clone()));
        tracker.time(Id(2), 0);
        tracker.time(Id(2), 1000);
        tracker.time(Id(2), 1000);
        tracker.time(Id(2), 500);
        tracker.time(Id(2), 9000);
        assert_eq!(out.lines(), ["2: time 0ns", "2: time 1000ns", "2: time 9000ns"]);
    }

    #[test]
    fn levels_follow_entity_names() {
        let mut levels = EntityLevels::new(log::Level::Error);
        levels.add_filter("agg_0_1", log::Level::Debug).unwrap();
        let tracker = TextTracker::new(levels, Box::new(Shared::default()));

        let agg = tracker.unique_id();
        tracker.add_entity(agg, "top::net::agg_0_1");
        let core = tracker.unique_id();
        tracker.add_entity(core, "top::net::core_0_1");

        assert!(tracker.is_entity_enabled(agg, log::Level::Debug));
        assert!(!tracker.is_entity_enabled(agg, log::Level::Trace));
        assert!(!tracker.is_entity_enabled(core, log::Level::Warn));
    }
}
