// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The [`Track`] interface and the trackers that implement it.

/// Include the /dev/null tracker.
pub mod dev_null;
/// Include the multi-tracker.
pub mod multi_tracker;
/// Include the text-based tracker.
pub mod text;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub use dev_null::DevNullTracker;
pub use multi_tracker::MultiTracker;
use regex::Regex;
pub use text::TextTracker;

use crate::Id;

/// Error used to return configuration errors
#[derive(Debug)]
pub struct TrackConfigError(pub String);

impl fmt::Display for TrackConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tracker config error: {}", self.0)
    }
}

impl std::error::Error for TrackConfigError {}

/// Receives the _log_ and _trace_ events of every entity.
///
/// Callers go through the macros in this crate, which check
/// [`is_entity_enabled`](Track::is_entity_enabled) before building an event.
pub trait Track {
    /// Allocate a new global ID
    fn unique_id(&self) -> Id;

    /// Whether events of `level` from entity `id` should be recorded.
    fn is_entity_enabled(&self, id: Id, level: log::Level) -> bool;

    /// Called once for every entity so that per-name filters can be applied.
    fn add_entity(&self, id: Id, entity_name: &str);

    /// A packet arrived at a switch or server.
    fn enter(&self, enter_into: Id, enter_obj: Id);

    /// A packet left a device.
    fn exit(&self, exit_from: Id, exit_obj: Id);

    /// An entity or packet was created.
    fn create(&self, created_by: Id, created_obj: Id, num_bytes: usize, name: &str);

    /// An entity or packet was destroyed.
    fn destroy(&self, destroyed_by: Id, destroyed_obj: Id);

    /// A log message.
    fn log(&self, msg_by: Id, level: log::Level, msg: fmt::Arguments);

    /// Simulation time moved on to `time_ns`.
    fn time(&self, set_by: Id, time_ns: u64);

    /// Flush any buffered output.
    fn shutdown(&self);
}

/// The type of a [`Tracker`] that is shared across entities.
pub type Tracker = Rc<dyn Track>;

/// One _log_ or _trace_ event as written by the text-based trackers.
#[allow(missing_docs)]
pub enum Event<'a> {
    Enter { by: Id, obj: Id },
    Exit { by: Id, obj: Id },
    Create {
        by: Id,
        obj: Id,
        num_bytes: usize,
        name: &'a str,
    },
    Destroy { by: Id, obj: Id },
    Log {
        by: Id,
        level: log::Level,
        msg: fmt::Arguments<'a>,
    },
    Time { by: Id, time_ns: u64 },
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Enter { by, obj } => write!(f, "{by}: {obj} in"),
            Event::Exit { by, obj } => write!(f, "{by}: {obj} out"),
            Event::Create {
                by,
                obj,
                num_bytes,
                name,
            } => write!(f, "{by}: created {obj} {name}, {num_bytes}B"),
            Event::Destroy { by, obj } => write!(f, "{by}: destroyed {obj}"),
            Event::Log { by, level, msg } => write!(f, "{by}:{level}: {msg}"),
            Event::Time { by, time_ns } => write!(f, "{by}: time {time_ns}ns"),
        }
    }
}

/// Create a [`Tracker`] that prints all track events to `stdout`.
#[must_use]
pub fn stdout_tracker(level: log::Level) -> Tracker {
    let writer = Box::new(std::io::BufWriter::new(std::io::stdout()));
    Rc::new(TextTracker::new(EntityLevels::new(level), writer))
}

/// Create a [`Tracker`] that suppresses all track events.
#[must_use]
pub fn dev_null_tracker() -> Tracker {
    Rc::new(DevNullTracker)
}

/// Decides the level each entity logs at.
///
/// Entities whose full name matches a filter get that filter's level, all
/// others get the default. Only entities that differ from the default are
/// stored.
pub struct EntityLevels {
    default_level: log::Level,
    filters: Vec<(Regex, log::Level)>,
    overrides: RefCell<HashMap<Id, log::Level>>,
}

impl EntityLevels {
    /// Every entity logs at `default_level` until a filter is added.
    #[must_use]
    pub fn new(default_level: log::Level) -> Self {
        Self {
            default_level,
            filters: Vec::new(),
            overrides: RefCell::new(HashMap::new()),
        }
    }

    /// Give entities whose full name matches `regex_str` the level `level`.
    ///
    /// When several filters match the first one added is used.
    ///
    /// ```rust
    /// use vturn_track::tracker::EntityLevels;
    /// let mut levels = EntityLevels::new(log::Level::Warn);
    /// levels.add_filter(r"core_\d_\d$", log::Level::Trace).unwrap();
    /// ```
    pub fn add_filter(&mut self, regex_str: &str, level: log::Level) -> Result<(), TrackConfigError> {
        let regex = Regex::new(regex_str)
            .map_err(|e| TrackConfigError(format!("Failed to parse regex {regex_str}:\n{e}\n")))?;
        self.filters.push((regex, level));
        Ok(())
    }

    fn level_for(&self, entity_name: &str) -> log::Level {
        self.filters
            .iter()
            .find(|(regex, _)| regex.is_match(entity_name))
            .map_or(self.default_level, |(_, level)| *level)
    }

    /// Remember the level of a newly created entity.
    pub fn register(&self, id: Id, entity_name: &str) {
        let level = self.level_for(entity_name);
        if level != self.default_level {
            self.overrides.borrow_mut().insert(id, level);
        }
    }

    /// Whether entity `id` logs at `level`.
    #[must_use]
    pub fn is_enabled(&self, id: Id, level: log::Level) -> bool {
        let entity_level = self
            .overrides
            .borrow()
            .get(&id)
            .copied()
            .unwrap_or(self.default_level);
        level <= entity_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: [&str; 4] = [
        "top",
        "top::net",
        "top::net::core_0_0",
        "top::net::edge_1_0::port2",
    ];

    fn levels_of(levels: &EntityLevels) -> Vec<log::Level> {
        NAMES.iter().map(|name| levels.level_for(name)).collect()
    }

    #[test]
    fn default_only() {
        let levels = EntityLevels::new(log::Level::Error);
        assert_eq!(levels_of(&levels), vec![log::Level::Error; 4]);
    }

    #[test]
    fn core_filter() {
        let mut levels = EntityLevels::new(log::Level::Error);
        levels.add_filter("core", log::Level::Trace).unwrap();
        assert_eq!(
            levels_of(&levels),
            [
                log::Level::Error,
                log::Level::Error,
                log::Level::Trace,
                log::Level::Error
            ]
        );
    }

    #[test]
    fn earlier_filter_takes_priority() {
        let mut levels = EntityLevels::new(log::Level::Error);
        levels.add_filter("port", log::Level::Info).unwrap();
        levels.add_filter("^top::net", log::Level::Debug).unwrap();
        assert_eq!(
            levels_of(&levels),
            [
                log::Level::Error,
                log::Level::Debug,
                log::Level::Debug,
                log::Level::Info
            ]
        );
    }

    #[test]
    fn invalid_regex() {
        let mut levels = EntityLevels::new(log::Level::Error);
        assert!(levels.add_filter("agg_[", log::Level::Trace).is_err());
    }

    #[test]
    fn registered_entities_use_their_level() {
        let mut levels = EntityLevels::new(log::Level::Warn);
        levels.add_filter("core", log::Level::Trace).unwrap();
        levels.register(Id(7), "top::net::core_0_0");
        levels.register(Id(8), "top::net::edge_0_0");

        assert!(levels.is_enabled(Id(7), log::Level::Trace));
        assert!(!levels.is_enabled(Id(8), log::Level::Info));
        assert!(levels.is_enabled(Id(8), log::Level::Warn));
        // Never registered
        assert!(levels.is_enabled(Id(9), log::Level::Error));
    }

    #[test]
    fn event_text() {
        let create = Event::Create {
            by: Id(3),
            obj: Id(40),
            num_bytes: 1000,
            name: "packet 40",
        };
        assert_eq!(create.to_string(), "3: created 40 packet 40, 1000B");
        assert_eq!(
            Event::Time {
                by: Id(2),
                time_ns: 9000
            }
            .to_string(),
            "2: time 9000ns"
        );
    }
}
